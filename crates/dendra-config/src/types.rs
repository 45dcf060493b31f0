// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `dendra.toml`. Every section falls back to its defaults when omitted.

use std::collections::BTreeMap;

use dendra_neural::{CompartmentParams, ReceptorParams};
use serde::{Deserialize, Serialize};

/// Keys of a table that no field claimed; reported by validation
pub type UnknownKeys = BTreeMap<String, toml::Value>;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DendraConfig {
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
    pub neuron: NeuronConfig,
}

/// Time stepping and event buffering
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Integration step (ms)
    pub dt_ms: f64,
    /// Ring buffer horizon in steps; also the longest slice `update` accepts
    pub buffer_slots: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            buffer_slots: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Neuron description: threshold, detection site and the compartment tree
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeuronConfig {
    /// Spike threshold (mV)
    pub v_th: f64,
    /// Compartment watched for spikes (root when omitted)
    pub spike_compartment: Option<u32>,
    /// Compartments in declaration order; parents must come first
    pub compartments: Vec<CompartmentConfig>,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        Self {
            v_th: -55.0,
            spike_compartment: None,
            compartments: vec![CompartmentConfig::default()],
        }
    }
}

/// One compartment of the tree
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompartmentConfig {
    pub index: u32,
    /// Parent index; exactly one compartment omits it (the root)
    pub parent: Option<u32>,
    #[serde(flatten)]
    pub params: CompartmentParams,
    pub receptors: Vec<ReceptorConfig>,
    /// Must stay the last flattened field so it only sees leftover keys
    #[serde(flatten)]
    pub unknown: UnknownKeys,
}

/// A receptor attached to the enclosing compartment
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReceptorConfig {
    /// `AMPA`, `GABA`, `NMDA` or `AMPA_NMDA`
    #[serde(rename = "type")]
    pub receptor_type: String,
    /// Position of an earlier receptor on the same compartment whose spike
    /// buffer this receptor reads
    #[serde(default)]
    pub share_buffer: Option<usize>,
    #[serde(flatten)]
    pub params: ReceptorParams,
    #[serde(flatten)]
    pub unknown: UnknownKeys,
}

impl ReceptorConfig {
    pub fn new(receptor_type: impl Into<String>) -> Self {
        Self {
            receptor_type: receptor_type.into(),
            share_buffer: None,
            params: ReceptorParams::default(),
            unknown: UnknownKeys::new(),
        }
    }
}
