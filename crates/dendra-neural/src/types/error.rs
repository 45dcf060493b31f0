// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for compartmental model operations
//!
//! Three families share one enum:
//! - configuration errors (topology, receptor types, parameters)
//! - usage-order errors (solving before the tree is ready)
//! - numerical errors (a degenerate diagonal during the tree solve)

use super::ids::{BufferHandle, CompartmentId, ReceptorId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DendraError {
    #[error("{0} already exists in the tree")]
    DuplicateCompartment(CompartmentId),

    #[error("parent {parent} of {child} has not been added")]
    MissingParent {
        child: CompartmentId,
        parent: CompartmentId,
    },

    #[error("tree already has root {existing}; {rejected} declares no parent")]
    MultipleRoots {
        existing: CompartmentId,
        rejected: CompartmentId,
    },

    #[error("{0} not found")]
    CompartmentNotFound(CompartmentId),

    #[error("tree has no compartments")]
    EmptyTree,

    #[error("malformed topology: {reached} of {total} compartments reachable from the root")]
    MalformedTopology { reached: usize, total: usize },

    #[error("unknown receptor type '{0}' (expected AMPA, GABA, NMDA or AMPA_NMDA)")]
    UnknownReceptorType(String),

    #[error("invalid time constant {name} = {value} ms (must be finite and > 0)")]
    InvalidTimeConstant { name: &'static str, value: f64 },

    #[error("rise and decay time constants must differ (both {0} ms)")]
    DegenerateTimeConstants(f64),

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid resolution {0} ms (must be finite and > 0)")]
    InvalidResolution(f64),

    #[error("{0} not found")]
    ReceptorNotFound(ReceptorId),

    #[error("{handle} does not exist on {compartment}")]
    BufferNotFound {
        compartment: CompartmentId,
        handle: BufferHandle,
    },

    #[error("no spike input for {0}")]
    UnboundSpikeBuffer(BufferHandle),

    #[error("delivery offset {offset} exceeds ring buffer of {slots} slots")]
    DeliveryOutOfRange { offset: usize, slots: usize },

    #[error("tree not initialized: call init() after the last add_compartment")]
    NotInitialized,

    #[error("solve_matrix called without construct_matrix for this step")]
    MatrixNotConstructed,

    #[error("degenerate diagonal gg = {gg} at {compartment}")]
    DegenerateDiagonal { compartment: CompartmentId, gg: f64 },
}

pub type Result<T> = core::result::Result<T, DendraError>;
pub type Error = DendraError;
