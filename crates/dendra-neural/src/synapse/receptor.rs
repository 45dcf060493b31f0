// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Receptor Models
//!
//! A synapse pairs one conductance window with one voltage dependence.
//! Receptors are the fixed set of named pairings:
//!
//! | Type        | Window                 | Voltage dependence | E_rev  |
//! |-------------|------------------------|--------------------|--------|
//! | `AMPA`      | 0.2 / 3.0 ms           | driving force      | 0 mV   |
//! | `GABA`      | 0.2 / 10.0 ms          | driving force      | -80 mV |
//! | `NMDA`      | 0.2 / 43.0 ms          | NMDA block         | 0 mV   |
//! | `AMPA_NMDA` | AMPA + ratio × NMDA    | both               |        |
//!
//! ## Numerical step
//!
//! ```text
//! update(s):     advance window by one step, fold in spike amplitude s
//! f_numstep(v):  g = -g_aux f'(v) / 2
//!                i =  g_aux (f(v) - f'(v) v / 2)
//! ```

use core::fmt;
use core::str::FromStr;

use super::voltage::VoltageDependence;
use super::window::ConductanceWindow;
use crate::types::{DendraError, Linearization, Result};

pub const DEFAULT_TAU_R: f64 = 0.2;
pub const DEFAULT_TAU_D_AMPA: f64 = 3.0;
pub const DEFAULT_TAU_D_GABA: f64 = 10.0;
pub const DEFAULT_TAU_D_NMDA: f64 = 43.0;
pub const DEFAULT_E_AMPA: f64 = 0.0;
pub const DEFAULT_E_GABA: f64 = -80.0;
pub const DEFAULT_E_NMDA: f64 = 0.0;
pub const DEFAULT_NMDA_RATIO: f64 = 2.0;

/// Receptor type (matches the configuration strings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReceptorType {
    #[cfg_attr(feature = "serde", serde(rename = "AMPA"))]
    Ampa,
    #[cfg_attr(feature = "serde", serde(rename = "GABA"))]
    Gaba,
    #[cfg_attr(feature = "serde", serde(rename = "NMDA"))]
    Nmda,
    #[cfg_attr(feature = "serde", serde(rename = "AMPA_NMDA"))]
    AmpaNmda,
}

impl ReceptorType {
    pub const ALL: [ReceptorType; 4] = [Self::Ampa, Self::Gaba, Self::Nmda, Self::AmpaNmda];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ampa => "AMPA",
            Self::Gaba => "GABA",
            Self::Nmda => "NMDA",
            Self::AmpaNmda => "AMPA_NMDA",
        }
    }
}

impl fmt::Display for ReceptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceptorType {
    type Err = DendraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DendraError::UnknownReceptorType(s.to_string()))
    }
}

/// Receptor parameters
///
/// Unset values fall back to the defaults of the receptor type. For
/// `AMPA_NMDA`, `e_rev`/`tau_r`/`tau_d` describe the AMPA part and the
/// `*_nmda` fields the NMDA part; other types ignore the `*_nmda` fields.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReceptorParams {
    /// Reversal potential (mV)
    pub e_rev: Option<f64>,
    /// Rise time constant (ms)
    pub tau_r: Option<f64>,
    /// Decay time constant (ms)
    pub tau_d: Option<f64>,
    /// Use a single exponential window with `tau_d`
    pub single_exponential: bool,
    pub e_rev_nmda: Option<f64>,
    pub tau_r_nmda: Option<f64>,
    pub tau_d_nmda: Option<f64>,
    /// Scale of the NMDA part relative to the AMPA part
    pub nmda_ratio: Option<f64>,
}

/// One conductance window driven through one voltage dependence
#[derive(Debug, Clone, PartialEq)]
pub struct Synapse {
    window: ConductanceWindow,
    voltage: VoltageDependence,
}

impl Synapse {
    pub fn new(window: ConductanceWindow, voltage: VoltageDependence) -> Self {
        Self { window, voltage }
    }

    pub fn init(&mut self, dt: f64) {
        self.window.init(dt);
    }

    #[inline]
    pub fn update(&mut self, spike: f64) {
        self.window.update(spike);
    }

    #[inline]
    pub fn f_numstep(&self, v: f64) -> Linearization {
        Linearization::midpoint(
            self.window.g(),
            self.voltage.f(v),
            self.voltage.df_dv(v),
            v,
        )
    }

    /// Present conductance (µS)
    #[inline]
    pub fn conductance(&self) -> f64 {
        self.window.g()
    }

    /// Present current `g_aux · f(v)` (nA)
    #[inline]
    pub fn current(&self, v: f64) -> f64 {
        self.window.g() * self.voltage.f(v)
    }

    pub fn window(&self) -> &ConductanceWindow {
        &self.window
    }

    pub fn voltage_dependence(&self) -> &VoltageDependence {
        &self.voltage
    }
}

/// Receptor attached to a compartment
#[derive(Debug, Clone, PartialEq)]
pub enum Receptor {
    Ampa(Synapse),
    Gaba(Synapse),
    Nmda(Synapse),
    AmpaNmda {
        ampa: Synapse,
        nmda: Synapse,
        nmda_ratio: f64,
    },
}

impl Receptor {
    /// Build a receptor of `kind`, validating its time constants
    pub fn build(kind: ReceptorType, params: &ReceptorParams) -> Result<Self> {
        let receptor = match kind {
            ReceptorType::Ampa => Self::Ampa(driving_force_synapse(
                params.e_rev.unwrap_or(DEFAULT_E_AMPA),
                params.tau_r.unwrap_or(DEFAULT_TAU_R),
                params.tau_d.unwrap_or(DEFAULT_TAU_D_AMPA),
                params.single_exponential,
            )?),
            ReceptorType::Gaba => Self::Gaba(driving_force_synapse(
                params.e_rev.unwrap_or(DEFAULT_E_GABA),
                params.tau_r.unwrap_or(DEFAULT_TAU_R),
                params.tau_d.unwrap_or(DEFAULT_TAU_D_GABA),
                params.single_exponential,
            )?),
            ReceptorType::Nmda => Self::Nmda(nmda_synapse(
                params.e_rev.unwrap_or(DEFAULT_E_NMDA),
                params.tau_r.unwrap_or(DEFAULT_TAU_R),
                params.tau_d.unwrap_or(DEFAULT_TAU_D_NMDA),
                params.single_exponential,
            )?),
            ReceptorType::AmpaNmda => {
                let nmda_ratio = params.nmda_ratio.unwrap_or(DEFAULT_NMDA_RATIO);
                if !nmda_ratio.is_finite() || nmda_ratio < 0.0 {
                    return Err(DendraError::InvalidParameter {
                        name: "nmda_ratio",
                        value: nmda_ratio,
                        reason: "must be finite and >= 0",
                    });
                }
                Self::AmpaNmda {
                    ampa: driving_force_synapse(
                        params.e_rev.unwrap_or(DEFAULT_E_AMPA),
                        params.tau_r.unwrap_or(DEFAULT_TAU_R),
                        params.tau_d.unwrap_or(DEFAULT_TAU_D_AMPA),
                        params.single_exponential,
                    )?,
                    nmda: nmda_synapse(
                        params.e_rev_nmda.unwrap_or(DEFAULT_E_NMDA),
                        params.tau_r_nmda.unwrap_or(DEFAULT_TAU_R),
                        params.tau_d_nmda.unwrap_or(DEFAULT_TAU_D_NMDA),
                        params.single_exponential,
                    )?,
                    nmda_ratio,
                }
            }
        };
        Ok(receptor)
    }

    /// Build from a configuration type string
    pub fn from_type_name(type_name: &str, params: &ReceptorParams) -> Result<Self> {
        Self::build(type_name.parse()?, params)
    }

    pub fn kind(&self) -> ReceptorType {
        match self {
            Self::Ampa(_) => ReceptorType::Ampa,
            Self::Gaba(_) => ReceptorType::Gaba,
            Self::Nmda(_) => ReceptorType::Nmda,
            Self::AmpaNmda { .. } => ReceptorType::AmpaNmda,
        }
    }

    /// Reset conductance state and recompute propagators for `dt`
    pub fn init(&mut self, dt: f64) {
        match self {
            Self::Ampa(syn) | Self::Gaba(syn) | Self::Nmda(syn) => syn.init(dt),
            Self::AmpaNmda { ampa, nmda, .. } => {
                ampa.init(dt);
                nmda.init(dt);
            }
        }
    }

    #[inline]
    pub fn update(&mut self, spike: f64) {
        match self {
            Self::Ampa(syn) | Self::Gaba(syn) | Self::Nmda(syn) => syn.update(spike),
            Self::AmpaNmda { ampa, nmda, .. } => {
                ampa.update(spike);
                nmda.update(spike);
            }
        }
    }

    #[inline]
    pub fn f_numstep(&self, v: f64) -> Linearization {
        match self {
            Self::Ampa(syn) | Self::Gaba(syn) | Self::Nmda(syn) => syn.f_numstep(v),
            Self::AmpaNmda {
                ampa,
                nmda,
                nmda_ratio,
            } => ampa.f_numstep(v) + nmda.f_numstep(v) * *nmda_ratio,
        }
    }

    /// Total conductance (µS)
    pub fn conductance(&self) -> f64 {
        match self {
            Self::Ampa(syn) | Self::Gaba(syn) | Self::Nmda(syn) => syn.conductance(),
            Self::AmpaNmda {
                ampa,
                nmda,
                nmda_ratio,
            } => ampa.conductance() + nmda.conductance() * nmda_ratio,
        }
    }

    /// Total current at `v` (nA)
    pub fn current(&self, v: f64) -> f64 {
        match self {
            Self::Ampa(syn) | Self::Gaba(syn) | Self::Nmda(syn) => syn.current(v),
            Self::AmpaNmda {
                ampa,
                nmda,
                nmda_ratio,
            } => ampa.current(v) + nmda.current(v) * nmda_ratio,
        }
    }
}

fn driving_force_synapse(
    e_rev: f64,
    tau_r: f64,
    tau_d: f64,
    single_exponential: bool,
) -> Result<Synapse> {
    Ok(Synapse::new(
        ConductanceWindow::from_time_constants(tau_r, tau_d, single_exponential)?,
        VoltageDependence::DrivingForce { e_rev },
    ))
}

fn nmda_synapse(e_rev: f64, tau_r: f64, tau_d: f64, single_exponential: bool) -> Result<Synapse> {
    Ok(Synapse::new(
        ConductanceWindow::from_time_constants(tau_r, tau_d, single_exponential)?,
        VoltageDependence::NmdaBlock { e_rev },
    ))
}
