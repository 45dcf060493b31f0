// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Synaptic current module
//!
//! Conductance windows, voltage dependences, the receptor pairings built from
//! them, and the per-compartment aggregator.

pub mod currents;
pub mod receptor;
pub mod voltage;
pub mod window;

pub use currents::{AttachedSynapse, CompartmentCurrents};
pub use receptor::{Receptor, ReceptorParams, ReceptorType, Synapse};
pub use voltage::VoltageDependence;
pub use window::{ConductanceWindow, DoubleExpCond, ExpCond};
