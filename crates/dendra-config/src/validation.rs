// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module checks that configuration values are within valid ranges and
//! that the compartment list describes a single rooted tree. Every problem
//! found is reported, not only the first.

use std::collections::{HashMap, HashSet};

use dendra_neural::{ModelParameters, Receptor, ReceptorType};

use crate::{ConfigError, ConfigResult, DendraConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    DuplicateIndex { index: u32 },
    UndeclaredParent { index: u32, parent: u32 },
    MultipleRoots { first: u32, second: u32 },
    UnknownReceptorType { field: String, value: String },
    UnknownKey { field: String, key: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::DuplicateIndex { index } => {
                write!(f, "Compartment index {} is declared more than once", index)
            }
            Self::UndeclaredParent { index, parent } => {
                write!(
                    f,
                    "Compartment {} names parent {} which is not declared before it",
                    index, parent
                )
            }
            Self::MultipleRoots { first, second } => {
                write!(
                    f,
                    "Compartments {} and {} both have no parent (only one root allowed)",
                    first, second
                )
            }
            Self::UnknownReceptorType { field, value } => {
                write!(
                    f,
                    "Unknown receptor type '{}' at {} (expected AMPA, GABA, NMDA or AMPA_NMDA)",
                    value, field
                )
            }
            Self::UnknownKey { field, key } => {
                write!(f, "Unknown key '{}' in {}", key, field)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive time step and a non-empty event buffer
/// - A known log level
/// - A single rooted tree with parents declared before their children
/// - Valid electrical parameters
/// - Known receptor types with valid time constants
/// - No unrecognized keys in compartment or receptor tables
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &DendraConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

/// Every validation problem of `config`, in discovery order
pub fn collect_errors(config: &DendraConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_simulation(config, &mut errors);
    validate_logging(config, &mut errors);
    validate_topology(config, &mut errors);
    validate_compartments(config, &mut errors);
    errors
}

fn validate_simulation(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let dt = config.simulation.dt_ms;
    if !(dt.is_finite() && dt > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.dt_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if config.simulation.buffer_slots == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.buffer_slots".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if !config.neuron.v_th.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "neuron.v_th".to_string(),
            reason: "must be finite".to_string(),
        });
    }
}

fn validate_logging(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }
}

/// Parents must be declared earlier, which also rules out cycles
fn validate_topology(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let compartments = &config.neuron.compartments;
    if compartments.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "neuron.compartments".to_string(),
        });
        return;
    }

    let mut declared = HashSet::new();
    let mut root: Option<u32> = None;
    for compartment in compartments {
        match compartment.parent {
            None => match root {
                Some(first) => errors.push(ConfigValidationError::MultipleRoots {
                    first,
                    second: compartment.index,
                }),
                None => root = Some(compartment.index),
            },
            Some(parent) if !declared.contains(&parent) => {
                errors.push(ConfigValidationError::UndeclaredParent {
                    index: compartment.index,
                    parent,
                });
            }
            Some(_) => {}
        }
        if !declared.insert(compartment.index) {
            errors.push(ConfigValidationError::DuplicateIndex {
                index: compartment.index,
            });
        }
    }

    if root.is_none() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "neuron.compartments (root without parent)".to_string(),
        });
    }
    if let Some(spike) = config.neuron.spike_compartment {
        if !declared.contains(&spike) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "neuron.spike_compartment".to_string(),
                reason: format!("compartment {} is not declared", spike),
            });
        }
    }
}

fn validate_compartments(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut seen: HashMap<u32, usize> = HashMap::new();
    for (position, compartment) in config.neuron.compartments.iter().enumerate() {
        let field = format!("neuron.compartments[{}]", position);
        if seen.insert(compartment.index, position).is_some() {
            // Reported by the topology check
            continue;
        }

        report_unknown_keys(&field, compartment.unknown.keys(), errors);

        if let Err(e) = compartment.params.validate() {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.clone(),
                reason: e.to_string(),
            });
        }

        for (slot, receptor) in compartment.receptors.iter().enumerate() {
            let receptor_field = format!("{}.receptors[{}]", field, slot);
            report_unknown_keys(&receptor_field, receptor.unknown.keys(), errors);
            let kind: ReceptorType = match receptor.receptor_type.parse() {
                Ok(kind) => kind,
                Err(_) => {
                    errors.push(ConfigValidationError::UnknownReceptorType {
                        field: receptor_field,
                        value: receptor.receptor_type.clone(),
                    });
                    continue;
                }
            };
            if let Err(e) = Receptor::build(kind, &receptor.params) {
                errors.push(ConfigValidationError::InvalidValue {
                    field: receptor_field.clone(),
                    reason: e.to_string(),
                });
            }
            if let Some(shared) = receptor.share_buffer {
                if shared >= slot {
                    errors.push(ConfigValidationError::InvalidValue {
                        field: format!("{}.share_buffer", receptor_field),
                        reason: format!("must name an earlier receptor (got {})", shared),
                    });
                }
            }
        }
    }
}

fn report_unknown_keys<'a>(
    field: &str,
    keys: impl Iterator<Item = &'a String>,
    errors: &mut Vec<ConfigValidationError>,
) {
    errors.extend(keys.map(|key| ConfigValidationError::UnknownKey {
        field: field.to_string(),
        key: key.clone(),
    }));
}
