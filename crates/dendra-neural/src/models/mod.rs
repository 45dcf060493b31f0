// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Neuron Models
//!
//! Host-facing neuron models built on the compartment tree.
//!
//! A model owns its tree, routes events (spikes and injected currents) into
//! the compartments' ring buffers, steps the tree over a slice of lags and
//! reports the steps at which it spiked.

pub mod compartmental;
pub mod traits;

// Re-export core types
pub use compartmental::{CompartmentalNeuron, CompartmentalParameters};
pub use traits::{ModelParameters, NeuronModel};
