// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! The merged result is validated before it is returned.

use crate::{validate_config, ConfigError, ConfigResult, DendraConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "dendra.toml";

/// Ancestor directories searched above the working directory
const SEARCH_DEPTH: usize = 5;

/// Find the dendra configuration file
///
/// Search order:
/// 1. `DENDRA_CONFIG_PATH` environment variable
/// 2. Current working directory: `./dendra.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("DENDRA_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by DENDRA_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.extend(
            cwd.ancestors()
                .take(SEARCH_DEPTH + 1)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(found) = search_paths.iter().find(|path| path.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet DENDRA_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Parse a configuration from TOML text without overrides or validation
pub fn parse_config(content: &str) -> ConfigResult<DendraConfig> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Returns
///
/// Complete `DendraConfig` with all overrides applied
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, has an
/// unparsable override, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<DendraConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    debug!(target: "dendra-config", "Loading configuration from {}", config_file.display());
    let content = fs::read_to_string(&config_file)?;
    let mut config = parse_config(&content)?;

    // Apply overrides in order
    apply_environment_overrides(&mut config)?;

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `DENDRA_DT_MS` -> `simulation.dt_ms`
/// - `DENDRA_BUFFER_SLOTS` -> `simulation.buffer_slots`
/// - `DENDRA_LOG_LEVEL` -> `logging.level`
/// - `DENDRA_V_TH` -> `neuron.v_th`
pub fn apply_environment_overrides(config: &mut DendraConfig) -> ConfigResult<()> {
    if let Ok(value) = env::var("DENDRA_DT_MS") {
        config.simulation.dt_ms = parse_value("DENDRA_DT_MS", &value)?;
    }
    if let Ok(value) = env::var("DENDRA_BUFFER_SLOTS") {
        config.simulation.buffer_slots = parse_value("DENDRA_BUFFER_SLOTS", &value)?;
    }
    if let Ok(value) = env::var("DENDRA_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("DENDRA_V_TH") {
        config.neuron.v_th = parse_value("DENDRA_V_TH", &value)?;
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"dt_ms": "0.025", "v_th": "-50"}`)
///
/// Recognized keys: `dt_ms`, `buffer_slots`, `log_level`, `v_th`, `spike_compartment`.
pub fn apply_cli_overrides(
    config: &mut DendraConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("dt_ms") {
        config.simulation.dt_ms = parse_value("dt_ms", value)?;
    }
    if let Some(value) = cli_args.get("buffer_slots") {
        config.simulation.buffer_slots = parse_value("buffer_slots", value)?;
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("v_th") {
        config.neuron.v_th = parse_value("v_th", value)?;
    }
    if let Some(value) = cli_args.get("spike_compartment") {
        config.neuron.spike_compartment = Some(parse_value("spike_compartment", value)?);
    }
    Ok(())
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue(format!("{} = '{}' could not be parsed", name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: &[&str] = &[
        "DENDRA_DT_MS",
        "DENDRA_BUFFER_SLOTS",
        "DENDRA_LOG_LEVEL",
        "DENDRA_V_TH",
    ];

    fn clear_overrides() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("DENDRA_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("DENDRA_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        env::set_var("DENDRA_CONFIG_PATH", dir.path().join("absent.toml"));
        let result = find_config_file();
        env::remove_var("DENDRA_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "dt_ms = 0.025").unwrap();
        writeln!(file, "[[neuron.compartments]]").unwrap();
        writeln!(file, "index = 0").unwrap();
        writeln!(file, "[[neuron.compartments]]").unwrap();
        writeln!(file, "index = 1").unwrap();
        writeln!(file, "parent = 0").unwrap();
        writeln!(file, "receptors = [{{ type = \"GABA\" }}]").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.simulation.dt_ms, 0.025);
        assert_eq!(config.simulation.buffer_slots, 100);
        assert_eq!(config.neuron.compartments.len(), 2);
        assert_eq!(config.neuron.compartments[1].receptors[0].receptor_type, "GABA");
    }

    #[test]
    fn test_load_rejects_invalid_tree() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &config_path,
            "[[neuron.compartments]]\nindex = 0\n[[neuron.compartments]]\nindex = 1\n",
        )
        .unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = DendraConfig::default();

        env::set_var("DENDRA_DT_MS", "0.05");
        env::set_var("DENDRA_V_TH", "-50");
        env::set_var("DENDRA_LOG_LEVEL", "debug");

        let result = apply_environment_overrides(&mut config);
        clear_overrides();

        result.unwrap();
        assert_eq!(config.simulation.dt_ms, 0.05);
        assert_eq!(config.neuron.v_th, -50.0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unparsable_override_is_an_error() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = DendraConfig::default();

        env::set_var("DENDRA_BUFFER_SLOTS", "many");
        let result = apply_environment_overrides(&mut config);
        clear_overrides();

        assert!(matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("DENDRA_BUFFER_SLOTS")));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = DendraConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("buffer_slots".to_string(), "250".to_string());
        cli_args.insert("spike_compartment".to_string(), "0".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.simulation.buffer_slots, 250);
        assert_eq!(config.neuron.spike_compartment, Some(0));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        // CLI overrides take precedence over environment variables
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "dt_ms = 0.1").unwrap();
        writeln!(file, "buffer_slots = 40").unwrap();

        env::set_var("DENDRA_DT_MS", "0.05");
        env::set_var("DENDRA_BUFFER_SLOTS", "80");

        let mut cli_args = HashMap::new();
        cli_args.insert("dt_ms".to_string(), "0.01".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));
        clear_overrides();
        let config = config.unwrap();

        // CLI wins for dt, env wins for buffer slots (no CLI override)
        assert_eq!(config.simulation.dt_ms, 0.01);
        assert_eq!(config.simulation.buffer_slots, 80);
    }
}
