// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Intrinsic Channel Currents (EType)
//!
//! Hodgkin-Huxley sodium and potassium channels with temperature-corrected
//! rates (q10 factor 1/3.21).
//!
//! ```text
//! g_Na = gbar_Na × m³ × h        g_K = gbar_K × n
//!
//! Gate update (exponential integrator):
//!     x(t+dt) = x(t) × exp(-dt/τ_x(v)) + (1 - exp(-dt/τ_x(v))) × x_inf(v)
//!
//! Contribution (driving-force linearization per channel):
//!     g += g_ch / 2
//!     i += g_ch × (E_ch - v / 2)
//! ```
//!
//! A channel whose maximal conductance is below `CHANNEL_EPSILON` is skipped,
//! so a compartment with both maxima at zero is purely passive.

use crate::types::Linearization;

const CHANNEL_EPSILON: f64 = 1e-9;
const Q10_INV: f64 = 1.0 / 3.21;

/// Intrinsic channel parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    /// Maximal sodium conductance (µS)
    pub gbar_na: f64,
    /// Sodium reversal potential (mV)
    pub e_na: f64,
    /// Maximal potassium conductance (µS)
    pub gbar_k: f64,
    /// Potassium reversal potential (mV)
    pub e_k: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            gbar_na: 0.0,
            e_na: 50.0,
            gbar_k: 0.0,
            e_k: -85.0,
        }
    }
}

/// Intrinsic current of one compartment
#[derive(Debug, Clone, PartialEq)]
pub struct EType {
    params: ChannelParams,
    m_na: f64,
    h_na: f64,
    n_k: f64,
}

impl EType {
    pub fn new(params: ChannelParams) -> Self {
        Self {
            params,
            m_na: 0.0,
            h_na: 0.0,
            n_k: 0.0,
        }
    }

    /// Put every gate at its steady state for `v`
    pub fn init(&mut self, v: f64) {
        let (m_inf, _) = na_m_kinetics(v);
        let (h_inf, _) = na_h_kinetics(v);
        let (n_inf, _) = k_n_kinetics(v);
        self.m_na = m_inf;
        self.h_na = h_inf;
        self.n_k = n_inf;
    }

    pub fn is_passive(&self) -> bool {
        self.params.gbar_na <= CHANNEL_EPSILON && self.params.gbar_k <= CHANNEL_EPSILON
    }

    /// Advance the gates one step and linearize the channel currents at `v`
    pub fn f_numstep(&mut self, v: f64, dt: f64) -> Linearization {
        let mut total = Linearization::ZERO;

        if self.params.gbar_na > CHANNEL_EPSILON {
            let (m_inf, tau_m) = na_m_kinetics(v);
            let (h_inf, tau_h) = na_h_kinetics(v);
            self.m_na = relax(self.m_na, m_inf, tau_m, dt);
            self.h_na = relax(self.h_na, h_inf, tau_h, dt);

            let g_na = self.params.gbar_na * self.m_na.powi(3) * self.h_na;
            total += Linearization::midpoint(g_na, self.params.e_na - v, -1.0, v);
        }

        if self.params.gbar_k > CHANNEL_EPSILON {
            let (n_inf, tau_n) = k_n_kinetics(v);
            self.n_k = relax(self.n_k, n_inf, tau_n, dt);

            let g_k = self.params.gbar_k * self.n_k;
            total += Linearization::midpoint(g_k, self.params.e_k - v, -1.0, v);
        }

        total
    }

    pub fn params(&self) -> &ChannelParams {
        &self.params
    }

    /// Gate values `(m_Na, h_Na, n_K)`
    pub fn gates(&self) -> (f64, f64, f64) {
        (self.m_na, self.h_na, self.n_k)
    }
}

#[inline]
fn relax(x: f64, x_inf: f64, tau: f64, dt: f64) -> f64 {
    let p = (-dt / tau).exp();
    x * p + (1.0 - p) * x_inf
}

/// `x / (exp(x / y) - 1)` with its limit `y` at `x = 0`
#[inline]
fn vtrap(x: f64, y: f64) -> f64 {
    let ratio = x / y;
    if ratio.abs() < 1e-6 {
        y * (1.0 - ratio / 2.0)
    } else {
        x / ratio.exp_m1()
    }
}

fn gate(alpha: f64, beta: f64) -> (f64, f64) {
    let sum = alpha + beta;
    (alpha / sum, Q10_INV / sum)
}

fn na_m_kinetics(v: f64) -> (f64, f64) {
    let alpha = 0.182 * vtrap(-(v + 35.013), 9.0);
    let beta = 0.124 * vtrap(v + 35.013, 9.0);
    gate(alpha, beta)
}

fn na_h_kinetics(v: f64) -> (f64, f64) {
    let alpha = 0.024 * vtrap(-(v + 50.013), 5.0);
    let beta = 0.0091 * vtrap(v + 75.013, 5.0);
    let (_, tau) = gate(alpha, beta);
    let h_inf = 1.0 / (1.0 + ((v + 65.0) / 6.2).exp());
    (h_inf, tau)
}

fn k_n_kinetics(v: f64) -> (f64, f64) {
    let alpha = 0.02 * vtrap(-(v - 25.0), 9.0);
    let beta = 0.002 * vtrap(v - 25.0, 9.0);
    gate(alpha, beta)
}
