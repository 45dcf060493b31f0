// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # dendra - multi-compartment neuron solver
//!
//! Umbrella crate over the dendra workspace. It re-exports the solver, the
//! configuration loader and the logging setup, and adds [`builder`] to turn a
//! configuration into a ready-to-run neuron.
//!
//! ## Quick Start
//!
//! ```rust
//! use dendra::prelude::*;
//!
//! let config = dendra::config::parse_config(
//!     r#"
//!     [simulation]
//!     dt_ms = 0.1
//!
//!     [[neuron.compartments]]
//!     index = 0
//!     gbar_na = 12.0
//!     gbar_k = 3.6
//!     gl = 0.03
//!
//!     [[neuron.compartments]]
//!     index = 1
//!     parent = 0
//!     receptors = [{ type = "AMPA" }]
//!     "#,
//! )?;
//!
//! let mut neuron = build_neuron(&config)?;
//! neuron.handle_spike(ReceptorId(0), 5, 0.05, 1)?;
//! let spikes = neuron.update(0, 100)?;
//! assert!(spikes.iter().all(|&lag| lag < 100));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crates
//!
//! ```text
//! dendra-neural         compartment tree, Hines solve, receptors, neuron adapter
//! dendra-config         TOML neuron descriptions, env/CLI overrides, validation
//! dendra-observability  tracing subscriber setup with per-crate debug flags
//! ```
//!
//! ## Feature Flags
//!
//! - **`file-logging`**: per-run log folders (forwards to `dendra-observability`)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use dendra_config as config;
pub use dendra_neural as neural;
pub use dendra_observability as observability;

pub mod builder;

pub use builder::{build_neuron, load_neuron, BuildError};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::builder::{build_neuron, load_neuron, BuildError};
    pub use dendra_config::{DendraConfig, ReceptorConfig};
    pub use dendra_neural::{
        CompTree, CompartmentId, CompartmentParams, CompartmentalNeuron, CompartmentalParameters,
        DendraError, ModelParameters, NeuronModel, ReceptorId, ReceptorParams, ReceptorType,
    };
}
