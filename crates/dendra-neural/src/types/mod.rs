// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Neural Types Module
//!
//! Core type definitions shared by the synapse, compartment and tree modules.

pub mod error;
pub mod ids;
pub mod linearization;
pub mod ring_buffer;

// Re-export commonly used types
pub use error::{DendraError, Error, Result};
pub use ids::{BufferHandle, CompartmentId, ReceptorId};
pub use linearization::Linearization;
pub use ring_buffer::RingBuffer;

// Note: ReceptorType is in crate::synapse module (shared with the aggregator)
// Import it here for convenience
pub use crate::synapse::ReceptorType;
