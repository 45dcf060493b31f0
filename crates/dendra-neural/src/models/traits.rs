// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Neuron Model Traits
//!
//! Interfaces shared by neuron models and their parameter structures.

use crate::types::Result;

/// Behaviour a host needs from a neuron model
pub trait NeuronModel: Send {
    /// Model-specific parameters
    type Parameters: ModelParameters;

    /// Human-readable model name for logging/debugging
    fn model_name(&self) -> &'static str;

    fn parameters(&self) -> &Self::Parameters;

    /// Voltage (mV) used for spike detection
    fn membrane_potential(&self) -> f64;

    /// Simulate the steps `from..to` of the current slice
    ///
    /// # Returns
    ///
    /// Global step numbers at which the neuron emitted a spike
    fn update(&mut self, from: usize, to: usize) -> Result<Vec<u64>>;
}

/// Trait for model-specific parameter structures
pub trait ModelParameters: Clone + Send + Sync + 'static {
    /// Validate that parameters are within acceptable ranges
    fn validate(&self) -> Result<()>;

    /// Get the number of parameters (for memory estimation)
    fn parameter_count() -> usize;
}
