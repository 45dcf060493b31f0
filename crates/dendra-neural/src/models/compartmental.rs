// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compartmental Neuron
//!
//! Adapter between a host simulator and a [`CompTree`].
//!
//! ## Slice Update
//!
//! ```text
//! for lag in from..to:
//!     tree.construct_matrix(lag); tree.solve_matrix()
//!     spike if v_prev < v_th <= v          (detection compartment)
//! advance every ring buffer by `to`
//! ```
//!
//! ## Recordables
//!
//! | Name                 | Value                                   |
//! |----------------------|-----------------------------------------|
//! | `v_comp{index}`      | voltage of compartment `index` (mV)     |
//! | `g_{TYPE}{receptor}` | conductance of receptor `receptor` (µS) |
//! | `i_{TYPE}{receptor}` | current of receptor `receptor` (nA)     |
//!
//! `TYPE` is the configuration name of the receptor (`AMPA`, `GABA`, `NMDA`,
//! `AMPA_NMDA`); receptors are numbered in attachment order.

use tracing::{debug, trace};

use super::traits::{ModelParameters, NeuronModel};
use crate::compartment::CompartmentParams;
use crate::synapse::{Receptor, ReceptorParams, ReceptorType};
use crate::tree::CompTree;
use crate::types::{BufferHandle, CompartmentId, DendraError, ReceptorId, Result};

/// Default spike threshold (mV)
pub const DEFAULT_V_TH: f64 = -55.0;

/// Neuron-level parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompartmentalParameters {
    /// Spike threshold (mV)
    pub v_th: f64,
    /// Compartment watched for spikes (defaults to the root)
    pub spike_compartment: Option<CompartmentId>,
}

impl Default for CompartmentalParameters {
    fn default() -> Self {
        Self {
            v_th: DEFAULT_V_TH,
            spike_compartment: None,
        }
    }
}

impl ModelParameters for CompartmentalParameters {
    fn validate(&self) -> Result<()> {
        if !self.v_th.is_finite() {
            return Err(DendraError::InvalidParameter {
                name: "v_th",
                value: self.v_th,
                reason: "must be finite",
            });
        }
        Ok(())
    }

    fn parameter_count() -> usize {
        2
    }
}

#[derive(Debug, Clone, Copy)]
struct ReceptorEntry {
    compartment: CompartmentId,
    buffer: BufferHandle,
    synapse: usize,
    kind: ReceptorType,
}

/// Multi-compartment neuron driven by buffered events
#[derive(Debug, Clone)]
pub struct CompartmentalNeuron {
    tree: CompTree,
    params: CompartmentalParameters,
    receptors: Vec<ReceptorEntry>,
    detection: Option<CompartmentId>,
    v_prev: f64,
    step_count: u64,
}

impl CompartmentalNeuron {
    pub fn new(dt: f64, buffer_slots: usize, params: CompartmentalParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            tree: CompTree::new(dt, buffer_slots)?,
            params,
            receptors: Vec::new(),
            detection: None,
            v_prev: f64::NAN,
            step_count: 0,
        })
    }

    pub fn add_compartment(
        &mut self,
        index: CompartmentId,
        parent: Option<CompartmentId>,
        params: &CompartmentParams,
    ) -> Result<()> {
        self.tree.add_compartment(index, parent, params)
    }

    /// Attach a receptor with its own spike buffer
    pub fn add_receptor(
        &mut self,
        compartment: CompartmentId,
        type_name: &str,
        params: &ReceptorParams,
    ) -> Result<ReceptorId> {
        let kind: ReceptorType = type_name.parse()?;
        let comp = self.tree.compartment_mut(compartment)?;
        Receptor::build(kind, params)?;
        let buffer = comp.add_spike_buffer();
        let synapse = comp.add_receptor(kind, buffer, params)?;
        Ok(self.register(compartment, buffer, synapse, kind))
    }

    /// Attach a receptor fed by the spike buffer of `shared`
    ///
    /// Both receptors must sit on the same compartment.
    pub fn add_receptor_with_buffer(
        &mut self,
        compartment: CompartmentId,
        type_name: &str,
        params: &ReceptorParams,
        shared: ReceptorId,
    ) -> Result<ReceptorId> {
        let kind: ReceptorType = type_name.parse()?;
        let entry = self.entry(shared)?;
        if entry.compartment != compartment {
            return Err(DendraError::BufferNotFound {
                compartment,
                handle: entry.buffer,
            });
        }
        let synapse = self
            .tree
            .compartment_mut(compartment)?
            .add_receptor(kind, entry.buffer, params)?;
        Ok(self.register(compartment, entry.buffer, synapse, kind))
    }

    /// Reset the tree and the spike detector
    pub fn init(&mut self) -> Result<()> {
        self.tree.init()?;
        let detection = match self.params.spike_compartment {
            Some(index) => self.tree.compartment(index)?.index(),
            None => self.tree.root().ok_or(DendraError::EmptyTree)?.index(),
        };
        self.detection = Some(detection);
        self.v_prev = self.tree.voltage(detection)?;
        self.step_count = 0;
        debug!(
            target: "dendra-neural",
            "[NEURON] Initialized: {} compartments, {} receptors, detecting on {}",
            self.tree.len(),
            self.receptors.len(),
            detection
        );
        Ok(())
    }

    /// Change the resolution; call `init` before the next update
    pub fn set_resolution(&mut self, dt: f64) -> Result<()> {
        self.tree.set_resolution(dt)?;
        self.detection = None;
        Ok(())
    }

    /// Schedule a spike of `weight × multiplicity` on `receptor`
    pub fn handle_spike(
        &mut self,
        receptor: ReceptorId,
        delivery_offset: usize,
        weight: f64,
        multiplicity: u32,
    ) -> Result<()> {
        let entry = self.entry(receptor)?;
        self.tree.compartment_mut(entry.compartment)?.handle_spike(
            entry.buffer,
            delivery_offset,
            weight * f64::from(multiplicity),
        )
    }

    /// Schedule an injected current (nA) on `compartment`
    pub fn handle_current(
        &mut self,
        compartment: CompartmentId,
        delivery_offset: usize,
        current: f64,
    ) -> Result<()> {
        self.tree
            .compartment_mut(compartment)?
            .handle_current(delivery_offset, current)
    }

    /// Simulate the lags `from..to`, then advance the buffers by `to`
    pub fn update(&mut self, from: usize, to: usize) -> Result<Vec<u64>> {
        let detection = self.detection.ok_or(DendraError::NotInitialized)?;
        if from > to {
            return Err(DendraError::InvalidParameter {
                name: "from",
                value: from as f64,
                reason: "slice start is after its end",
            });
        }
        if to > self.tree.buffer_slots() {
            return Err(DendraError::DeliveryOutOfRange {
                offset: to,
                slots: self.tree.buffer_slots(),
            });
        }

        let mut spikes = Vec::new();
        for lag in from..to {
            self.tree.step(lag)?;

            let v = self.tree.voltage(detection)?;
            if self.v_prev < self.params.v_th && v >= self.params.v_th {
                spikes.push(self.step_count);
                trace!(
                    target: "dendra-neural",
                    "[NEURON] Spike at step {} (v={:.3} mV)",
                    self.step_count,
                    v
                );
            }
            self.v_prev = v;
            self.step_count += 1;
        }

        self.tree.advance_buffers(to);
        Ok(spikes)
    }

    pub fn voltage(&self, index: CompartmentId) -> Result<f64> {
        self.tree.voltage(index)
    }

    /// Voltages in compartment insertion order
    pub fn voltages(&self) -> Vec<f64> {
        self.tree.voltages()
    }

    /// Names accepted by [`Self::get_recordable`]
    pub fn recordables(&self) -> Vec<String> {
        let voltages = self.tree.iter().map(|c| format!("v_comp{}", c.index().0));
        let receptors = self.receptors.iter().enumerate().flat_map(|(id, entry)| {
            let name = entry.kind.as_str();
            [format!("g_{}{}", name, id), format!("i_{}{}", name, id)]
        });
        voltages.chain(receptors).collect()
    }

    /// Read one recordable by name; `None` when the name matches nothing
    pub fn get_recordable(&self, name: &str) -> Option<f64> {
        let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
        let number: u32 = name[prefix.len()..].parse().ok()?;

        if prefix == "v_comp" {
            return self.tree.voltage(CompartmentId(number)).ok();
        }

        let quantity = prefix.get(..2)?;
        let type_name = prefix.get(2..)?;
        let entry = self.receptors.get(number as usize)?;
        if type_name != entry.kind.as_str() {
            return None;
        }
        let compartment = self.tree.compartment(entry.compartment).ok()?;
        let receptor = &compartment.currents().get(entry.synapse)?.receptor;
        match quantity {
            "g_" => Some(receptor.conductance()),
            "i_" => Some(receptor.current(compartment.v())),
            _ => None,
        }
    }

    pub fn receptor_count(&self) -> usize {
        self.receptors.len()
    }

    /// Compartment a receptor is attached to
    pub fn receptor_compartment(&self, receptor: ReceptorId) -> Result<CompartmentId> {
        self.entry(receptor).map(|entry| entry.compartment)
    }

    /// Steps simulated since the last `init`
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn tree(&self) -> &CompTree {
        &self.tree
    }

    fn register(
        &mut self,
        compartment: CompartmentId,
        buffer: BufferHandle,
        synapse: usize,
        kind: ReceptorType,
    ) -> ReceptorId {
        let id = ReceptorId(self.receptors.len() as u32);
        self.receptors.push(ReceptorEntry {
            compartment,
            buffer,
            synapse,
            kind,
        });
        debug!(
            target: "dendra-neural",
            "[NEURON] Attached {} {} on {} ({})",
            kind,
            id,
            compartment,
            buffer
        );
        id
    }

    fn entry(&self, receptor: ReceptorId) -> Result<ReceptorEntry> {
        self.receptors
            .get(receptor.0 as usize)
            .copied()
            .ok_or(DendraError::ReceptorNotFound(receptor))
    }
}

impl NeuronModel for CompartmentalNeuron {
    type Parameters = CompartmentalParameters;

    fn model_name(&self) -> &'static str {
        "Compartmental"
    }

    fn parameters(&self) -> &CompartmentalParameters {
        &self.params
    }

    fn membrane_potential(&self) -> f64 {
        self.detection
            .and_then(|index| self.tree.voltage(index).ok())
            .unwrap_or(f64::NAN)
    }

    fn update(&mut self, from: usize, to: usize) -> Result<Vec<u64>> {
        CompartmentalNeuron::update(self, from, to)
    }
}
