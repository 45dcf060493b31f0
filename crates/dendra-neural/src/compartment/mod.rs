// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compartment
//!
//! One node of the compartment tree and its row of the per-step linear system.
//!
//! ## Discretization
//!
//! ```text
//! C dV/dt = -g_L (V - E_L) - g_c (V - V_parent) - Σ g_c,child (V - V_child)
//!           + I_syn + I_intrinsic + I_inj
//!
//! Implicit in time, linearized in voltage (gi = EType + synapses):
//!     gg = C/dt + g_L + g_c + Σ g_c,child + gi.g
//!     ff = C/dt × V + g_L × E_L + gi.i + I_inj
//!     hh = -g_c                    (coupling to the parent, 0 on the root)
//! ```
//!
//! ## Elimination
//!
//! ```text
//! gather_input(g, y):  xx += g;  yy += y           (once per child)
//! io():                gg -= xx; ff -= yy
//!                      → (hh² / gg, ff × hh / gg)  (seen by the parent)
//! calc_v(v_parent):    V = (ff - v_parent × hh) / gg
//! ```

pub mod etype;

pub use etype::{ChannelParams, EType};

use crate::models::traits::ModelParameters;
use crate::synapse::{CompartmentCurrents, ReceptorParams, ReceptorType};
use crate::types::{
    BufferHandle, CompartmentId, DendraError, Linearization, Result, RingBuffer,
};

/// Electrical parameters of one compartment
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompartmentParams {
    /// Capacitance (nF)
    pub ca: f64,
    /// Coupling conductance to the parent (µS, unused on the root)
    pub gc: f64,
    /// Leak conductance (µS)
    pub gl: f64,
    /// Leak reversal potential (mV)
    pub el: f64,
    /// Voltage after `init` (mV, defaults to `el`)
    pub v_init: Option<f64>,
    pub gbar_na: f64,
    pub e_na: f64,
    pub gbar_k: f64,
    pub e_k: f64,
}

impl Default for CompartmentParams {
    fn default() -> Self {
        let channels = ChannelParams::default();
        Self {
            ca: 1.0,
            gc: 0.01,
            gl: 0.1,
            el: -70.0,
            v_init: None,
            gbar_na: channels.gbar_na,
            e_na: channels.e_na,
            gbar_k: channels.gbar_k,
            e_k: channels.e_k,
        }
    }
}

impl CompartmentParams {
    /// Passive compartment with the given electrical values
    pub fn passive(ca: f64, gc: f64, gl: f64, el: f64) -> Self {
        Self {
            ca,
            gc,
            gl,
            el,
            ..Self::default()
        }
    }

    pub fn channels(&self) -> ChannelParams {
        ChannelParams {
            gbar_na: self.gbar_na,
            e_na: self.e_na,
            gbar_k: self.gbar_k,
            e_k: self.e_k,
        }
    }
}

impl ModelParameters for CompartmentParams {
    fn validate(&self) -> Result<()> {
        let positive = [("ca", self.ca)];
        let non_negative = [
            ("gc", self.gc),
            ("gl", self.gl),
            ("gbar_na", self.gbar_na),
            ("gbar_k", self.gbar_k),
        ];
        let finite = [("el", self.el), ("e_na", self.e_na), ("e_k", self.e_k)];

        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DendraError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite and > 0",
                });
            }
        }
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DendraError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite and >= 0",
                });
            }
        }
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(DendraError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        if let Some(v_init) = self.v_init {
            if !v_init.is_finite() {
                return Err(DendraError::InvalidParameter {
                    name: "v_init",
                    value: v_init,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }

    fn parameter_count() -> usize {
        9
    }
}

/// One node of the compartment tree
#[derive(Debug, Clone)]
pub struct Compartment {
    index: CompartmentId,
    parent_index: Option<CompartmentId>,

    ca: f64,
    gc: f64,
    gl: f64,
    el: f64,
    v_init: f64,
    v: f64,

    // Sum of the children's coupling conductances, set by the tree
    children_gc: f64,
    dt: f64,

    etype: EType,
    currents: CompartmentCurrents,
    current_buffer: RingBuffer,
    spike_buffers: Vec<RingBuffer>,
    spike_inputs: Vec<f64>,
    buffer_slots: usize,

    ff: f64,
    gg: f64,
    hh: f64,
    xx: f64,
    yy: f64,
}

impl Compartment {
    pub(crate) fn new(
        index: CompartmentId,
        parent_index: Option<CompartmentId>,
        params: &CompartmentParams,
        dt: f64,
        buffer_slots: usize,
    ) -> Result<Self> {
        params.validate()?;
        let v_init = params.v_init.unwrap_or(params.el);
        let mut etype = EType::new(params.channels());
        etype.init(v_init);

        Ok(Self {
            index,
            parent_index,
            ca: params.ca,
            gc: params.gc,
            gl: params.gl,
            el: params.el,
            v_init,
            v: v_init,
            children_gc: 0.0,
            dt,
            etype,
            currents: CompartmentCurrents::new(),
            current_buffer: RingBuffer::new(buffer_slots),
            spike_buffers: Vec::new(),
            spike_inputs: Vec::new(),
            buffer_slots,
            ff: 0.0,
            gg: 0.0,
            hh: 0.0,
            xx: 0.0,
            yy: 0.0,
        })
    }

    pub fn index(&self) -> CompartmentId {
        self.index
    }

    pub fn parent_index(&self) -> Option<CompartmentId> {
        self.parent_index
    }

    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    /// Membrane voltage (mV)
    #[inline]
    pub fn v(&self) -> f64 {
        self.v
    }

    pub fn ca(&self) -> f64 {
        self.ca
    }

    pub fn gc(&self) -> f64 {
        self.gc
    }

    pub fn gl(&self) -> f64 {
        self.gl
    }

    pub fn el(&self) -> f64 {
        self.el
    }

    pub fn etype(&self) -> &EType {
        &self.etype
    }

    pub fn currents(&self) -> &CompartmentCurrents {
        &self.currents
    }

    /// Diagonal term of the current step (after `io`, includes the children)
    pub fn diagonal(&self) -> f64 {
        self.gg
    }

    /// `(ff, gg, hh)` of the current step
    pub fn matrix_element(&self) -> (f64, f64, f64) {
        (self.ff, self.gg, self.hh)
    }

    /// Allocate a new spike buffer owned by this compartment
    pub fn add_spike_buffer(&mut self) -> BufferHandle {
        self.spike_buffers.push(RingBuffer::new(self.buffer_slots));
        self.spike_inputs.push(0.0);
        BufferHandle(self.spike_buffers.len() - 1)
    }

    pub fn spike_buffer_count(&self) -> usize {
        self.spike_buffers.len()
    }

    /// Attach a synapse fed by `buffer`; returns its local index
    pub fn add_synapse(
        &mut self,
        type_name: &str,
        buffer: BufferHandle,
        params: &ReceptorParams,
    ) -> Result<usize> {
        self.add_receptor(type_name.parse()?, buffer, params)
    }

    pub fn add_receptor(
        &mut self,
        kind: ReceptorType,
        buffer: BufferHandle,
        params: &ReceptorParams,
    ) -> Result<usize> {
        self.check_buffer(buffer)?;
        self.currents.add_receptor(kind, buffer, params, self.dt)
    }

    /// Attach a synapse with a fresh spike buffer
    pub fn add_synapse_with_buffer(
        &mut self,
        type_name: &str,
        params: &ReceptorParams,
    ) -> Result<(BufferHandle, usize)> {
        let kind: ReceptorType = type_name.parse()?;
        // Validate before allocating so a rejected synapse leaves no buffer behind
        crate::synapse::Receptor::build(kind, params)?;
        let buffer = self.add_spike_buffer();
        let synapse = self.add_receptor(kind, buffer, params)?;
        Ok((buffer, synapse))
    }

    /// Record a spike amplitude `offset` steps ahead
    pub fn handle_spike(&mut self, buffer: BufferHandle, offset: usize, amplitude: f64) -> Result<()> {
        self.check_buffer(buffer)?;
        self.spike_buffers[buffer.0].add_value(offset, amplitude)
    }

    /// Record an injected current (nA) `offset` steps ahead
    pub fn handle_current(&mut self, offset: usize, current: f64) -> Result<()> {
        self.current_buffer.add_value(offset, current)
    }

    pub(crate) fn init(&mut self, dt: f64, children_gc: f64) {
        self.dt = dt;
        self.children_gc = children_gc;
        self.v = self.v_init;
        self.etype.init(self.v_init);
        self.currents.init(dt);
        self.current_buffer.clear();
        self.spike_buffers.iter_mut().for_each(RingBuffer::clear);
        self.spike_inputs.iter_mut().for_each(|x| *x = 0.0);
        self.ff = 0.0;
        self.gg = 0.0;
        self.hh = 0.0;
        self.xx = 0.0;
        self.yy = 0.0;
    }

    /// Build this compartment's row of the linear system for `lag`
    pub fn construct_matrix_element(&mut self, lag: usize) -> Result<()> {
        for (input, buffer) in self.spike_inputs.iter_mut().zip(self.spike_buffers.iter_mut()) {
            *input = buffer.get_value(lag);
        }
        let injected = self.current_buffer.get_value(lag);

        let synaptic = self
            .currents
            .f_numstep(self.v, &self.spike_inputs)
            .map_err(|err| match err {
                DendraError::UnboundSpikeBuffer(handle) => DendraError::BufferNotFound {
                    compartment: self.index,
                    handle,
                },
                other => other,
            })?;
        let gi: Linearization = self.etype.f_numstep(self.v, self.dt) + synaptic;

        let capacitive = self.ca / self.dt;
        let coupling = if self.is_root() { 0.0 } else { self.gc };

        self.gg = capacitive + self.gl + coupling + self.children_gc + gi.g;
        self.ff = capacitive * self.v + self.gl * self.el + gi.i + injected;
        self.hh = -coupling;
        self.xx = 0.0;
        self.yy = 0.0;
        Ok(())
    }

    #[inline]
    pub fn gather_input(&mut self, (g, y): (f64, f64)) {
        self.xx += g;
        self.yy += y;
    }

    #[inline]
    pub fn io(&mut self) -> (f64, f64) {
        self.gg -= self.xx;
        self.ff -= self.yy;
        (self.hh * self.hh / self.gg, self.ff * self.hh / self.gg)
    }

    #[inline]
    pub fn calc_v(&mut self, v_parent: f64) -> f64 {
        self.xx = 0.0;
        self.yy = 0.0;
        self.v = (self.ff - v_parent * self.hh) / self.gg;
        self.v
    }

    pub(crate) fn advance_buffers(&mut self, steps: usize) {
        self.current_buffer.advance(steps);
        for buffer in &mut self.spike_buffers {
            buffer.advance(steps);
        }
    }

    fn check_buffer(&self, buffer: BufferHandle) -> Result<()> {
        if buffer.0 < self.spike_buffers.len() {
            Ok(())
        } else {
            Err(DendraError::BufferNotFound {
                compartment: self.index,
                handle: buffer,
            })
        }
    }
}
