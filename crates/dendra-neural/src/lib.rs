// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Dendra Neural Computation
//!
//! Multi-compartment neuron solver:
//! - **Types**: identifiers, errors, ring buffers, `(g, i)` linearizations
//! - **Synapse**: conductance windows, voltage dependences, receptors, aggregator
//! - **Compartment**: one node of the tree and its intrinsic channels
//! - **Tree**: arena of compartments and the `O(n)` implicit tree solve
//! - **Models**: the host-facing compartmental neuron
//!
//! ## Quick Start
//!
//! ```
//! use dendra_neural::{
//!     CompartmentId, CompartmentParams, CompartmentalNeuron, CompartmentalParameters,
//!     ReceptorParams,
//! };
//!
//! let mut neuron = CompartmentalNeuron::new(0.1, 100, CompartmentalParameters::default())?;
//! neuron.add_compartment(CompartmentId(0), None, &CompartmentParams::default())?;
//! neuron.add_compartment(CompartmentId(1), Some(CompartmentId(0)), &CompartmentParams::default())?;
//! let ampa = neuron.add_receptor(CompartmentId(1), "AMPA", &ReceptorParams::default())?;
//! neuron.init()?;
//!
//! neuron.handle_spike(ampa, 0, 0.01, 1)?;
//! let spikes = neuron.update(0, 100)?;
//! assert!(spikes.is_empty());
//! # Ok::<(), dendra_neural::DendraError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compartment;
pub mod models;
pub mod synapse;
pub mod tree;
pub mod types;

pub use compartment::{ChannelParams, Compartment, CompartmentParams, EType};
pub use models::{CompartmentalNeuron, CompartmentalParameters, ModelParameters, NeuronModel};
pub use synapse::{CompartmentCurrents, Receptor, ReceptorParams, ReceptorType};
pub use tree::CompTree;
pub use types::{
    BufferHandle, CompartmentId, DendraError, Error, Linearization, ReceptorId, Result, RingBuffer,
};
