// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for dendra
//!
//! Console output is always available. With the `file-logging` feature each
//! run also gets a timestamped folder with one file per crate and a combined
//! file, and old run folders are pruned by age and count.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::settings::LoggingSettings;

/// Build the `EnvFilter` for the given flags and default level
pub fn build_env_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(default_level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter directives: {}", directives))
}

/// Filter that passes only `crate_name`'s events, at debug and above
pub fn crate_only_filter(crate_name: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(format!("{}=debug,off", crate_name))
        .with_context(|| format!("Invalid crate name for a log filter: {}", crate_name))
}

/// Install a console-only subscriber
///
/// # Errors
///
/// Fails if the level is not a valid filter directive or a global subscriber
/// is already installed.
pub fn init_console_logging(debug_flags: &CrateDebugFlags, settings: &LoggingSettings) -> Result<()> {
    let env_filter = build_env_filter(debug_flags, &settings.level)?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter);

    Registry::default()
        .with(console_layer)
        .try_init()
        .context("Failed to install the global tracing subscriber")
}

#[cfg(feature = "file-logging")]
pub use file::{init_logging, LoggingGuard};

#[cfg(feature = "file-logging")]
mod file {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use tracing_appender::rolling;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, Registry};

    use super::{build_env_filter, crate_only_filter};
    use crate::cli::CrateDebugFlags;
    use crate::settings::LoggingSettings;

    const RUN_PREFIX: &str = "run_";
    const RUN_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Keeps the file writers alive; logs are flushed when it is dropped
    pub struct LoggingGuard {
        _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
        log_dir: PathBuf,
    }

    impl LoggingGuard {
        /// Get the run folder of this process
        pub fn log_dir(&self) -> &Path {
            &self.log_dir
        }
    }

    /// Initialize logging with file output and console output
    ///
    /// Creates a timestamped folder structure:
    /// ```text
    /// ./logs/
    ///   └── run_20250101_120000/
    ///       ├── dendra-builder.log
    ///       ├── dendra-neural.log
    ///       ├── dendra-config.log
    ///       └── combined.log
    /// ```
    pub fn init_logging(
        debug_flags: &CrateDebugFlags,
        settings: &LoggingSettings,
    ) -> Result<LoggingGuard> {
        let timestamp = Utc::now().format(RUN_FORMAT);
        let run_folder = settings.log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
        std::fs::create_dir_all(&run_folder)
            .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

        cleanup_old_logs(
            &settings.log_dir,
            &run_folder,
            settings.retention_days,
            settings.retention_runs,
        )?;

        let env_filter = build_env_filter(debug_flags, &settings.level)?;
        let mut layers = Vec::new();
        let mut file_guards = Vec::new();

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter.clone())
            .boxed();
        layers.push(console_layer);

        for crate_name in crate::KNOWN_CRATES {
            let file_appender = rolling::daily(&run_folder, format!("{}.log", crate_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guards.push(guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(crate_only_filter(crate_name)?)
                .boxed();
            layers.push(file_layer);
        }

        let combined_appender = rolling::daily(&run_folder, "combined.log");
        let (combined_non_blocking, combined_guard) = tracing_appender::non_blocking(combined_appender);
        file_guards.push(combined_guard);

        let combined_layer = tracing_subscriber::fmt::layer()
            .with_writer(combined_non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter)
            .boxed();
        layers.push(combined_layer);

        Registry::default()
            .with(layers)
            .try_init()
            .context("Failed to install the global tracing subscriber")?;

        Ok(LoggingGuard {
            _file_guards: file_guards,
            log_dir: run_folder,
        })
    }

    fn parse_run_folder(name: &str) -> Option<DateTime<Utc>> {
        let stamp = name.strip_prefix(RUN_PREFIX)?;
        let naive = NaiveDateTime::parse_from_str(stamp, RUN_FORMAT).ok()?;
        Some(Utc.from_utc_datetime(&naive))
    }

    /// Remove run folders older than `retention_days`, then all but the newest
    /// `retention_runs`
    ///
    /// `current_run` is never removed and does not count toward the limit.
    pub(crate) fn cleanup_old_logs(
        base_log_dir: &Path,
        current_run: &Path,
        retention_days: u64,
        retention_runs: usize,
    ) -> Result<()> {
        if !base_log_dir.exists() {
            return Ok(());
        }

        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);

        let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
        for entry in std::fs::read_dir(base_log_dir)? {
            let path = entry?.path();
            if !path.is_dir() || path == current_run {
                continue;
            }
            let stamp = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_run_folder);
            if let Some(stamp) = stamp {
                runs.push((path, stamp));
            }
        }

        // Oldest first
        runs.sort_by_key(|(_, stamp)| *stamp);

        let expired = runs.iter().filter(|(_, stamp)| *stamp < cutoff).count();
        let excess = runs.len().saturating_sub(retention_runs);
        for (path, _) in runs.iter().take(expired.max(excess)) {
            if let Err(e) = std::fs::remove_dir_all(path) {
                eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                );
            }
        }

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_cleanup_keeps_newest_runs() {
            let dir = tempfile::tempdir().unwrap();
            let now = Utc::now();
            let names: Vec<String> = (0..4)
                .map(|hours| {
                    let stamp = now - chrono::Duration::hours(hours);
                    format!("{}{}", RUN_PREFIX, stamp.format(RUN_FORMAT))
                })
                .collect();
            for name in &names {
                std::fs::create_dir_all(dir.path().join(name)).unwrap();
            }
            std::fs::create_dir_all(dir.path().join("run_19990101_000000")).unwrap();
            std::fs::create_dir_all(dir.path().join("notes")).unwrap();

            let current = dir.path().join("run_21000101_000000");
            std::fs::create_dir_all(&current).unwrap();

            cleanup_old_logs(dir.path(), &current, 30, 2).unwrap();

            assert!(dir.path().join(&names[0]).exists());
            assert!(dir.path().join(&names[1]).exists());
            assert!(!dir.path().join(&names[2]).exists());
            assert!(!dir.path().join(&names[3]).exists());
            assert!(!dir.path().join("run_19990101_000000").exists());
            assert!(dir.path().join("notes").exists());
            assert!(current.exists());
        }

        #[test]
        fn test_cleanup_never_removes_the_current_run() {
            let dir = tempfile::tempdir().unwrap();
            let current = dir
                .path()
                .join(format!("{}{}", RUN_PREFIX, Utc::now().format(RUN_FORMAT)));
            let older = dir.path().join("run_20200101_000000");
            std::fs::create_dir_all(&current).unwrap();
            std::fs::create_dir_all(&older).unwrap();

            cleanup_old_logs(dir.path(), &current, 30, 0).unwrap();

            assert!(current.exists());
            assert!(!older.exists());
        }

        #[test]
        fn test_run_folder_names() {
            assert!(parse_run_folder("run_20250101_120000").is_some());
            assert!(parse_run_folder("run_2025").is_none());
            assert!(parse_run_folder("other").is_none());
        }
    }
}
