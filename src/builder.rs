// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron construction from a validated configuration
//!
//! Receptor ids are assigned in declaration order: walking the compartments
//! as listed and each compartment's `receptors` array in order, the `n`-th
//! receptor met gets `ReceptorId(n)`.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use dendra_config::{load_config, validate_config, ConfigError, DendraConfig};
use dendra_neural::{
    CompartmentId, CompartmentalNeuron, CompartmentalParameters, DendraError, ReceptorId,
};

/// Errors raised while turning a configuration into a neuron
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    Neural {
        context: String,
        #[source]
        source: DendraError,
    },
}

trait NeuralContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, BuildError>;
}

impl<T> NeuralContext<T> for Result<T, DendraError> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, BuildError> {
        self.map_err(|source| BuildError::Neural {
            context: context(),
            source,
        })
    }
}

/// Build and initialize a neuron from `config`
pub fn build_neuron(config: &DendraConfig) -> Result<CompartmentalNeuron, BuildError> {
    validate_config(config)?;

    let params = CompartmentalParameters {
        v_th: config.neuron.v_th,
        spike_compartment: config.neuron.spike_compartment.map(CompartmentId),
    };
    let mut neuron = CompartmentalNeuron::new(
        config.simulation.dt_ms,
        config.simulation.buffer_slots,
        params,
    )
    .context(|| "creating neuron".to_string())?;

    for compartment in &config.neuron.compartments {
        let index = CompartmentId(compartment.index);
        neuron
            .add_compartment(index, compartment.parent.map(CompartmentId), &compartment.params)
            .context(|| format!("adding compartment {}", compartment.index))?;
    }

    for compartment in &config.neuron.compartments {
        let index = CompartmentId(compartment.index);
        let mut local: Vec<ReceptorId> = Vec::with_capacity(compartment.receptors.len());
        for (slot, receptor) in compartment.receptors.iter().enumerate() {
            let context = || {
                format!(
                    "attaching receptor {} ({}) to compartment {}",
                    slot, receptor.receptor_type, compartment.index
                )
            };
            let id = match receptor.share_buffer.and_then(|shared| local.get(shared)) {
                Some(&shared) => neuron
                    .add_receptor_with_buffer(index, &receptor.receptor_type, &receptor.params, shared)
                    .context(context)?,
                None => neuron
                    .add_receptor(index, &receptor.receptor_type, &receptor.params)
                    .context(context)?,
            };
            local.push(id);
        }
    }

    neuron.init().context(|| "initializing neuron".to_string())?;

    info!(
        target: "dendra-builder",
        "Built neuron: {} compartments, {} receptors, dt={} ms",
        neuron.tree().len(),
        neuron.receptor_count(),
        config.simulation.dt_ms
    );
    Ok(neuron)
}

/// Load a configuration (file, environment, CLI) and build its neuron
pub fn load_neuron(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> Result<(DendraConfig, CompartmentalNeuron), BuildError> {
    let config = load_config(config_path, cli_args)?;
    let neuron = build_neuron(&config)?;
    Ok((config, neuron))
}
