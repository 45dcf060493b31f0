// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Conductance windows
//!
//! The time course of a synaptic conductance after a spike.
//!
//! ```text
//! Exponential:
//!     g(t+dt) = g(t) × exp(-dt/τ) + s
//!
//! Double exponential:
//!     g_r(t+dt) = g_r(t) × exp(-dt/τ_r) - s × norm
//!     g_d(t+dt) = g_d(t) × exp(-dt/τ_d) + s × norm
//!     g = g_r + g_d
//!
//!     t_peak = τ_r τ_d / (τ_d - τ_r) × ln(τ_d / τ_r)
//!     norm   = 1 / (exp(-t_peak/τ_d) - exp(-t_peak/τ_r))
//! ```
//!
//! `s` is the spike amplitude (weight × multiplicity) buffered for the step.
//! Propagators depend on `dt` and are recomputed by `init`.

use crate::types::{DendraError, Result};

fn check_tau(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DendraError::InvalidTimeConstant { name, value })
    }
}

/// Single exponential decay
#[derive(Debug, Clone, PartialEq)]
pub struct ExpCond {
    tau: f64,
    prop: f64,
    g: f64,
}

impl ExpCond {
    pub fn new(tau: f64) -> Result<Self> {
        let tau = check_tau("tau", tau)?;
        Ok(Self {
            tau,
            prop: 1.0,
            g: 0.0,
        })
    }

    pub fn init(&mut self, dt: f64) {
        self.prop = (-dt / self.tau).exp();
        self.g = 0.0;
    }

    #[inline]
    pub fn update(&mut self, spike: f64) {
        self.g = self.g * self.prop + spike;
    }

    #[inline]
    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }
}

/// Rise/decay window normalized to a unit peak
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleExpCond {
    tau_r: f64,
    tau_d: f64,
    norm: f64,
    prop_r: f64,
    prop_d: f64,
    g_r: f64,
    g_d: f64,
}

impl DoubleExpCond {
    pub fn new(tau_r: f64, tau_d: f64) -> Result<Self> {
        let tau_r = check_tau("tau_r", tau_r)?;
        let tau_d = check_tau("tau_d", tau_d)?;
        if tau_r == tau_d {
            return Err(DendraError::DegenerateTimeConstants(tau_r));
        }

        let t_peak = peak_time(tau_r, tau_d);
        let norm = 1.0 / ((-t_peak / tau_d).exp() - (-t_peak / tau_r).exp());

        Ok(Self {
            tau_r,
            tau_d,
            norm,
            prop_r: 1.0,
            prop_d: 1.0,
            g_r: 0.0,
            g_d: 0.0,
        })
    }

    pub fn init(&mut self, dt: f64) {
        self.prop_r = (-dt / self.tau_r).exp();
        self.prop_d = (-dt / self.tau_d).exp();
        self.g_r = 0.0;
        self.g_d = 0.0;
    }

    #[inline]
    pub fn update(&mut self, spike: f64) {
        self.g_r *= self.prop_r;
        self.g_d *= self.prop_d;
        let s = spike * self.norm;
        self.g_r -= s;
        self.g_d += s;
    }

    #[inline]
    pub fn g(&self) -> f64 {
        self.g_r + self.g_d
    }

    /// Time (ms) after a spike at which the conductance peaks
    pub fn time_to_peak(&self) -> f64 {
        peak_time(self.tau_r, self.tau_d)
    }

    pub fn normalization(&self) -> f64 {
        self.norm
    }

    pub fn tau_r(&self) -> f64 {
        self.tau_r
    }

    pub fn tau_d(&self) -> f64 {
        self.tau_d
    }
}

fn peak_time(tau_r: f64, tau_d: f64) -> f64 {
    tau_r * tau_d / (tau_d - tau_r) * (tau_d / tau_r).ln()
}

/// Conductance window variants
#[derive(Debug, Clone, PartialEq)]
pub enum ConductanceWindow {
    Exponential(ExpCond),
    DoubleExponential(DoubleExpCond),
}

impl ConductanceWindow {
    /// Double exponential window, or a single exponential with `tau_d` when
    /// `single_exponential` is set
    pub fn from_time_constants(tau_r: f64, tau_d: f64, single_exponential: bool) -> Result<Self> {
        if single_exponential {
            Ok(Self::Exponential(ExpCond::new(tau_d)?))
        } else {
            Ok(Self::DoubleExponential(DoubleExpCond::new(tau_r, tau_d)?))
        }
    }

    pub fn init(&mut self, dt: f64) {
        match self {
            Self::Exponential(window) => window.init(dt),
            Self::DoubleExponential(window) => window.init(dt),
        }
    }

    #[inline]
    pub fn update(&mut self, spike: f64) {
        match self {
            Self::Exponential(window) => window.update(spike),
            Self::DoubleExponential(window) => window.update(spike),
        }
    }

    #[inline]
    pub fn g(&self) -> f64 {
        match self {
            Self::Exponential(window) => window.g(),
            Self::DoubleExponential(window) => window.g(),
        }
    }
}
