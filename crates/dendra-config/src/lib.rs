// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dendra Configuration System
//!
//! Type-safe configuration for compartmental neuron simulations:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//! - Validation that reports every problem at once
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dendra_config::{load_config, DendraConfig};
//!
//! // Load configuration with automatic file discovery and overrides
//! let config: DendraConfig = load_config(None, None).expect("Failed to load config");
//!
//! println!("dt: {} ms", config.simulation.dt_ms);
//! println!("compartments: {}", config.neuron.compartments.len());
//! ```
//!
//! ## File Layout
//!
//! ```toml
//! [simulation]
//! dt_ms = 0.025
//! buffer_slots = 100
//!
//! [logging]
//! level = "info"
//!
//! [neuron]
//! v_th = -55.0
//!
//! [[neuron.compartments]]
//! index = 0
//! ca = 2.0
//! gl = 0.1
//! gbar_na = 12.0
//! gbar_k = 3.6
//!
//! [[neuron.compartments]]
//! index = 1
//! parent = 0
//! gc = 0.05
//! receptors = [{ type = "AMPA_NMDA", nmda_ratio = 1.5 }]
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, parse_config,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_json() {
        let config = DendraConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: DendraConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_toml_error_maps_to_parse_error() {
        let err = parse_config("[simulation\ndt_ms = 0.1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
