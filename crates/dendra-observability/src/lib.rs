// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # dendra-observability
//!
//! Logging setup shared by the dendra crates, with per-crate debug flags.
//!
//! Library crates only emit `tracing` events under their crate name as the
//! target (`dendra-neural`, `dendra-builder`). Binaries and tests pick the subscriber
//! here.
//!
//! ## Features
//! - `file-logging`: per-run log folders with one file per crate (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;
pub mod settings;

// Re-export commonly used items
pub use cli::*;
pub use init::*;
pub use settings::*;

/// Known dendra tracing targets for debug flags
///
/// `EnvFilter` matches targets by prefix, so no entry may be a prefix of
/// another; the umbrella crate logs as `dendra-builder`, never bare `dendra`.
pub const KNOWN_CRATES: &[&str] = &["dendra-builder", "dendra-neural", "dendra-config"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_crates_are_not_prefixes_of_each_other() {
        for a in KNOWN_CRATES {
            for b in KNOWN_CRATES {
                if a != b {
                    assert!(!b.starts_with(a), "{} is a prefix of {}", a, b);
                }
            }
        }
    }
}
