// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Run a configured neuron from the command line.
//!
//! Loads `dendra.toml` (or `--config <path>`), injects a constant current into
//! one compartment and prints the detected spike times and final voltages.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};

use dendra::config::load_config;
use dendra::neural::CompartmentId;
use dendra::observability::{debug_flags_help, init_console_logging, parse_debug_flags, LoggingSettings};
use dendra::build_neuron;

struct RunArgs {
    config: Option<PathBuf>,
    slices: usize,
    current: f64,
    compartment: Option<u32>,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: dendra_run [--config <path>] [--slices <n>] [--current <nA>] \
         [--compartment <index>] [--set key=value]...\n\n\
         Defaults:\n\
         - config: $DENDRA_CONFIG_PATH or ./dendra.toml\n\
         - slices: 10 (each slice is buffer_slots steps)\n\
         - current: 0.0 nA into the root compartment\n\n\
         Override keys: dt_ms, buffer_slots, log_level, v_th, spike_compartment\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn next_value(args: &mut impl Iterator<Item = String>) -> String {
    args.next().unwrap_or_else(|| usage_and_exit())
}

fn parse_args() -> Result<RunArgs> {
    let mut run = RunArgs {
        config: None,
        slices: 10,
        current: 0.0,
        compartment: None,
        overrides: HashMap::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => run.config = Some(PathBuf::from(next_value(&mut args))),
            "--slices" => {
                let v = next_value(&mut args);
                run.slices = v.parse().with_context(|| format!("Invalid --slices: {v}"))?;
            }
            "--current" => {
                let v = next_value(&mut args);
                run.current = v.parse().with_context(|| format!("Invalid --current: {v}"))?;
            }
            "--compartment" => {
                let v = next_value(&mut args);
                run.compartment =
                    Some(v.parse().with_context(|| format!("Invalid --compartment: {v}"))?);
            }
            "--set" => {
                let v = next_value(&mut args);
                let Some((key, value)) = v.split_once('=') else {
                    bail!("Expected key=value after --set, got: {v}");
                };
                run.overrides.insert(key.trim().to_string(), value.trim().to_string());
            }
            "-h" | "--help" => usage_and_exit(),
            // Consumed by parse_debug_flags
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    Ok(run)
}

fn run() -> Result<()> {
    let args = parse_args()?;
    let debug_flags = parse_debug_flags();

    let config = load_config(args.config.as_deref(), Some(&args.overrides))
        .context("Failed to load configuration")?;

    init_console_logging(&debug_flags, &LoggingSettings::with_level(&config.logging.level))?;

    let mut neuron = build_neuron(&config)?;
    let target = match args.compartment {
        Some(index) => CompartmentId(index),
        None => neuron
            .tree()
            .root()
            .map(|root| root.index())
            .context("Neuron has no root compartment")?,
    };

    let slice_len = config.simulation.buffer_slots;
    let dt = config.simulation.dt_ms;
    let mut spikes = Vec::new();
    for _ in 0..args.slices {
        if args.current != 0.0 {
            for lag in 0..slice_len {
                neuron.handle_current(target, lag, args.current)?;
            }
        }
        spikes.extend(neuron.update(0, slice_len)?);
    }

    let duration = neuron.step_count() as f64 * dt;
    println!("Simulated {:.3} ms ({} steps, dt={} ms)", duration, neuron.step_count(), dt);
    println!("Spikes: {}", spikes.len());
    for step in &spikes {
        println!("  t = {:.3} ms (step {})", *step as f64 * dt, step);
    }
    println!("Final voltages:");
    for compartment in neuron.tree().iter() {
        println!("  {:>4}: {:.4} mV", compartment.index().0, compartment.v());
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
