// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the compartment tree solve through the public API

use dendra_neural::synapse::{DoubleExpCond, VoltageDependence};
use dendra_neural::{
    CompTree, CompartmentId, CompartmentParams, CompartmentalNeuron, CompartmentalParameters,
    DendraError, Receptor, ReceptorParams, ReceptorType,
};

const DT: f64 = 0.1;

fn id(n: u32) -> CompartmentId {
    CompartmentId(n)
}

/// Soma with two dendritic branches of depth three
fn dendritic_tree() -> CompTree {
    let mut tree = CompTree::new(DT, 100).unwrap();
    let soma = CompartmentParams::passive(2.0, 0.0, 0.2, -70.0);
    let dend = CompartmentParams::passive(0.5, 0.05, 0.02, -70.0);
    tree.add_compartment(id(0), None, &soma).unwrap();
    tree.add_compartment(id(1), Some(id(0)), &dend).unwrap();
    tree.add_compartment(id(2), Some(id(1)), &dend).unwrap();
    tree.add_compartment(id(3), Some(id(2)), &dend).unwrap();
    tree.add_compartment(id(4), Some(id(0)), &dend).unwrap();
    tree.add_compartment(id(5), Some(id(4)), &dend).unwrap();
    tree.add_compartment(id(6), Some(id(5)), &dend).unwrap();
    tree.init().unwrap();
    tree
}

#[test]
fn test_topology_invariant_holds_after_init() {
    let tree = dendritic_tree();
    let mut roots = 0;
    for compartment in tree.iter() {
        match compartment.parent_index() {
            None => roots += 1,
            Some(parent) => {
                assert!(tree.children_of(parent).unwrap().contains(&compartment.index()));
            }
        }
    }
    assert_eq!(roots, 1);
    assert_eq!(tree.leaves(), vec![id(3), id(6)]);
}

#[test]
fn test_resting_tree_stays_at_rest() {
    let mut tree = dendritic_tree();
    for lag in 0..100 {
        tree.step(lag).unwrap();
    }
    for v in tree.voltages() {
        assert!((v + 70.0).abs() < 1e-9);
    }
}

#[test]
fn test_distal_input_attenuates_toward_soma() {
    let mut tree = dendritic_tree();
    for lag in 0..50 {
        tree.compartment_mut(id(3)).unwrap().handle_current(lag, 0.5).unwrap();
        tree.step(lag).unwrap();
    }
    let v: Vec<f64> = tree.voltages();
    // Injected branch: monotone decay toward the soma, then into the other branch
    assert!(v[3] > v[2] && v[2] > v[1] && v[1] > v[0]);
    assert!(v[0] > v[4] && v[4] > v[5] && v[5] > v[6]);
    assert!(v[6] > -70.0);
}

#[test]
fn test_solution_is_independent_of_insertion_order() {
    // Same tree, branches added in a different order
    let mut reordered = CompTree::new(DT, 100).unwrap();
    let soma = CompartmentParams::passive(2.0, 0.0, 0.2, -70.0);
    let dend = CompartmentParams::passive(0.5, 0.05, 0.02, -70.0);
    reordered.add_compartment(id(0), None, &soma).unwrap();
    reordered.add_compartment(id(4), Some(id(0)), &dend).unwrap();
    reordered.add_compartment(id(1), Some(id(0)), &dend).unwrap();
    reordered.add_compartment(id(5), Some(id(4)), &dend).unwrap();
    reordered.add_compartment(id(2), Some(id(1)), &dend).unwrap();
    reordered.add_compartment(id(6), Some(id(5)), &dend).unwrap();
    reordered.add_compartment(id(3), Some(id(2)), &dend).unwrap();
    reordered.init().unwrap();

    let mut tree = dendritic_tree();
    for lag in 0..20 {
        tree.compartment_mut(id(2)).unwrap().handle_current(lag, 1.0).unwrap();
        reordered.compartment_mut(id(2)).unwrap().handle_current(lag, 1.0).unwrap();
        tree.step(lag).unwrap();
        reordered.step(lag).unwrap();
    }
    for n in 0..7 {
        let a = tree.voltage(id(n)).unwrap();
        let b = reordered.voltage(id(n)).unwrap();
        assert!((a - b).abs() < 1e-10, "compartment {}: {} vs {}", n, a, b);
    }
}

#[test]
fn test_reinit_restores_initial_state() {
    let mut tree = dendritic_tree();
    tree.compartment_mut(id(6)).unwrap().handle_current(0, 3.0).unwrap();
    tree.compartment_mut(id(6)).unwrap().handle_current(7, 3.0).unwrap();
    tree.step(0).unwrap();
    assert!(tree.voltage(id(6)).unwrap() > -70.0);

    tree.init().unwrap();
    for lag in 0..10 {
        tree.step(lag).unwrap();
    }
    // Pending events were dropped by init
    for v in tree.voltages() {
        assert!((v + 70.0).abs() < 1e-9);
    }
}

#[test]
fn test_double_exponential_peaks_at_one() {
    let mut window = DoubleExpCond::new(0.2, 3.0).unwrap();
    let dt = 0.001;
    window.init(dt);
    window.update(1.0);

    // trace[k] is the conductance k steps after the spike
    let mut trace = vec![window.g()];
    for _ in 0..10_000 {
        window.update(0.0);
        trace.push(window.g());
    }
    let (peak_step, peak) = trace
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |best, (k, g)| if g > best.1 { (k, g) } else { best });

    let expected_step = (window.time_to_peak() / dt).round() as usize;
    assert!(
        peak_step.abs_diff(expected_step) <= 1,
        "peak at step {}, expected {}",
        peak_step,
        expected_step
    );
    assert!((trace[expected_step] - 1.0).abs() < 1e-6, "g = {}", trace[expected_step]);
    assert!((peak - 1.0).abs() < 1e-6, "peak = {}", peak);
}

/// Steady-state (child, root) voltages with `current` nA injected into the child
fn two_compartment_steady_state(gc: f64, current: f64) -> (f64, f64) {
    let mut tree = CompTree::new(DT, 100).unwrap();
    tree.add_compartment(id(0), None, &CompartmentParams::passive(1.0, 0.0, 0.1, -70.0))
        .unwrap();
    tree.add_compartment(id(1), Some(id(0)), &CompartmentParams::passive(1.0, gc, 0.1, -70.0))
        .unwrap();
    tree.init().unwrap();

    // Slowest time constant is ca/gl = 10 ms; 300 ms is well past steady state
    for _ in 0..30 {
        for lag in 0..100 {
            tree.compartment_mut(id(1)).unwrap().handle_current(lag, current).unwrap();
            tree.step(lag).unwrap();
        }
        tree.advance_buffers(100);
    }
    (tree.voltage(id(1)).unwrap(), tree.voltage(id(0)).unwrap())
}

#[test]
fn test_coupling_pulls_child_and_root_together() {
    let current = 1.0;
    let mut previous_gap = f64::INFINITY;
    for gc in [0.01, 0.1, 1.0] {
        let (child, root) = two_compartment_steady_state(gc, current);
        assert!(child > root, "gc={}: child {} <= root {}", gc, child, root);
        assert!(root > -70.0, "gc={}: root did not depolarize", gc);

        // Subtracting the two steady-state equations: gap = I / (gl + 2 gc)
        let gl = 0.1;
        let expected_gap = current / (gl + 2.0 * gc);
        let gap = child - root;
        assert!(
            (gap - expected_gap).abs() < 1e-6,
            "gc={}: gap {} vs {}",
            gc,
            gap,
            expected_gap
        );
        assert!(gap < previous_gap, "gap did not shrink at gc={}", gc);
        previous_gap = gap;
    }
}

#[test]
fn test_nmda_derivative_matches_finite_difference() {
    let nmda = VoltageDependence::NmdaBlock { e_rev: 0.0 };
    let h = 1e-5;
    let mut v = -90.0;
    while v <= 50.0 {
        let numeric = (nmda.f(v + h) - nmda.f(v - h)) / (2.0 * h);
        assert!((numeric - nmda.df_dv(v)).abs() < 1e-6, "v = {}", v);
        v += 2.5;
    }
}

#[test]
fn test_ampa_nmda_with_zero_ratio_is_ampa() {
    let params = ReceptorParams {
        nmda_ratio: Some(0.0),
        ..Default::default()
    };
    let mut combined = Receptor::build(ReceptorType::AmpaNmda, &params).unwrap();
    let mut ampa = Receptor::build(ReceptorType::Ampa, &ReceptorParams::default()).unwrap();
    combined.init(DT);
    ampa.init(DT);

    for step in 0..200 {
        let spike = if step % 37 == 0 { 0.8 } else { 0.0 };
        combined.update(spike);
        ampa.update(spike);
        let v = -70.0 + 0.5 * step as f64;
        assert_eq!(combined.f_numstep(v), ampa.f_numstep(v));
    }
}

#[test]
fn test_neuron_detects_threshold_crossing_on_soma() {
    let mut neuron = CompartmentalNeuron::new(DT, 100, CompartmentalParameters::default()).unwrap();
    let soma = CompartmentParams {
        gbar_na: 12.0,
        gbar_k: 3.6,
        ..CompartmentParams::passive(1.0, 0.0, 0.03, -70.0)
    };
    neuron.add_compartment(id(0), None, &soma).unwrap();
    neuron
        .add_compartment(id(1), Some(id(0)), &CompartmentParams::default())
        .unwrap();
    let ampa = neuron.add_receptor(id(1), "AMPA", &ReceptorParams::default()).unwrap();
    neuron.init().unwrap();

    let v0 = neuron.voltage(id(0)).unwrap();
    neuron.handle_spike(ampa, 0, 0.001, 1).unwrap();
    neuron.update(0, 100).unwrap();
    // A tiny synaptic input keeps the soma near its resting state
    assert!((neuron.voltage(id(0)).unwrap() - v0).abs() < 1.0);

    let mut spikes = Vec::new();
    for _ in 0..10 {
        for offset in 0..100 {
            neuron.handle_current(id(0), offset, 2.0).unwrap();
        }
        spikes.extend(neuron.update(0, 100).unwrap());
    }
    assert!(!spikes.is_empty());
    assert!(spikes.windows(2).all(|w| w[0] < w[1]));
    assert!(spikes.iter().all(|&s| s >= 100 && s < 1100));
}

#[test]
fn test_configuration_errors_are_reported() {
    let mut neuron = CompartmentalNeuron::new(DT, 10, CompartmentalParameters::default()).unwrap();
    assert_eq!(neuron.init(), Err(DendraError::EmptyTree));

    neuron
        .add_compartment(id(0), None, &CompartmentParams::default())
        .unwrap();
    let bad_tau = ReceptorParams {
        tau_d: Some(0.0),
        ..Default::default()
    };
    assert!(matches!(
        neuron.add_receptor(id(0), "GABA", &bad_tau),
        Err(DendraError::InvalidTimeConstant { .. })
    ));
    assert_eq!(neuron.receptor_count(), 0);
    assert!(matches!(
        CompartmentalNeuron::new(-1.0, 10, CompartmentalParameters::default()),
        Err(DendraError::InvalidResolution(_))
    ));
}
