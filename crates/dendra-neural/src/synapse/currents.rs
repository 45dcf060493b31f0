// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Compartment current aggregator
//!
//! Holds every receptor attached to one compartment and sums their
//! linearizations each step. Iteration follows attachment order so that the
//! floating-point sum is reproducible.

use super::receptor::{Receptor, ReceptorParams, ReceptorType};
use crate::types::{BufferHandle, DendraError, Linearization, Result};

/// A receptor and the spike buffer that feeds it
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedSynapse {
    pub receptor: Receptor,
    pub buffer: BufferHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompartmentCurrents {
    synapses: Vec<AttachedSynapse>,
}

impl CompartmentCurrents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a receptor by configuration type name; returns its local index
    pub fn add_synapse(
        &mut self,
        type_name: &str,
        buffer: BufferHandle,
        params: &ReceptorParams,
        dt: f64,
    ) -> Result<usize> {
        self.add_receptor(type_name.parse()?, buffer, params, dt)
    }

    /// Attach a receptor of `kind`; returns its local index
    pub fn add_receptor(
        &mut self,
        kind: ReceptorType,
        buffer: BufferHandle,
        params: &ReceptorParams,
        dt: f64,
    ) -> Result<usize> {
        let mut receptor = Receptor::build(kind, params)?;
        receptor.init(dt);
        self.synapses.push(AttachedSynapse { receptor, buffer });
        Ok(self.synapses.len() - 1)
    }

    pub fn init(&mut self, dt: f64) {
        for synapse in &mut self.synapses {
            synapse.receptor.init(dt);
        }
    }

    /// Advance every receptor one step and sum the linearizations at `v`
    ///
    /// `spike_inputs[k]` holds this step's amplitude of spike buffer `k`. A
    /// receptor bound to a buffer outside `spike_inputs` fails the whole step
    /// before any receptor state changes.
    pub fn f_numstep(&mut self, v: f64, spike_inputs: &[f64]) -> Result<Linearization> {
        if let Some(unbound) = self
            .synapses
            .iter()
            .find(|synapse| synapse.buffer.0 >= spike_inputs.len())
        {
            return Err(DendraError::UnboundSpikeBuffer(unbound.buffer));
        }

        let mut total = Linearization::ZERO;
        for synapse in &mut self.synapses {
            synapse.receptor.update(spike_inputs[synapse.buffer.0]);
            total += synapse.receptor.f_numstep(v);
        }
        Ok(total)
    }

    pub fn get(&self, index: usize) -> Option<&AttachedSynapse> {
        self.synapses.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttachedSynapse> {
        self.synapses.iter()
    }

    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }
}
