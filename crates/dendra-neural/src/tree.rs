// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compartment Tree
//!
//! Arena of compartments linked by index, solved each step with a single
//! Gaussian elimination pass over the tree (Hines ordering).
//!
//! ## Step Order
//!
//! ```text
//! construct_matrix(lag)   every compartment builds (ff, gg, hh)
//! solve_matrix()
//!   downsweep             post-order: (g, y) = c.io(); parent.gather_input((g, y))
//!   root                  root.io(); root.calc_v(0)
//!   upsweep               pre-order:  c.calc_v(parent.v)
//! ```
//!
//! The traversal lists are built once by [`CompTree::init`] and reused for
//! every step, so a step is `O(n)` with no allocation.
//!
//! ## Lifecycle
//!
//! ```text
//! add_compartment ──▶ Unbuilt ──init()──▶ Ready ──construct_matrix──▶ Constructed
//!                        ▲                  ▲                              │
//!                        │                  └────────solve_matrix──────────┘
//!          add_compartment / set_resolution
//! ```

use std::fmt;

use ahash::AHashMap;
use tracing::{debug, trace, warn};

use crate::compartment::{Compartment, CompartmentParams};
use crate::types::{CompartmentId, DendraError, Result};

/// Smallest diagonal magnitude accepted during elimination
pub const DIAGONAL_EPSILON: f64 = 1e-12;

/// Default number of ring buffer slots per compartment
pub const DEFAULT_BUFFER_SLOTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreePhase {
    /// Topology changed since the last `init`
    Unbuilt,
    /// Initialized; the next call must be `construct_matrix`
    Ready,
    /// Matrix built for the current step; `solve_matrix` may run
    Constructed,
}

#[derive(Debug, Clone)]
pub struct CompTree {
    compartments: Vec<Compartment>,
    positions: AHashMap<CompartmentId, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    root: Option<usize>,
    leaves: Vec<usize>,
    pre_order: Vec<usize>,
    post_order: Vec<usize>,
    dt: f64,
    buffer_slots: usize,
    phase: TreePhase,
}

impl CompTree {
    /// Create an empty tree stepping with resolution `dt` (ms)
    pub fn new(dt: f64, buffer_slots: usize) -> Result<Self> {
        check_resolution(dt)?;
        Ok(Self {
            compartments: Vec::new(),
            positions: AHashMap::new(),
            parents: Vec::new(),
            children: Vec::new(),
            root: None,
            leaves: Vec::new(),
            pre_order: Vec::new(),
            post_order: Vec::new(),
            dt,
            buffer_slots: buffer_slots.max(1),
            phase: TreePhase::Unbuilt,
        })
    }

    /// Add a compartment; the parent must already be in the tree
    pub fn add_compartment(
        &mut self,
        index: CompartmentId,
        parent: Option<CompartmentId>,
        params: &CompartmentParams,
    ) -> Result<()> {
        if self.positions.contains_key(&index) {
            return Err(DendraError::DuplicateCompartment(index));
        }

        let parent_position = match parent {
            None => {
                if let Some(root) = self.root {
                    return Err(DendraError::MultipleRoots {
                        existing: self.compartments[root].index(),
                        rejected: index,
                    });
                }
                None
            }
            Some(parent_index) => match self.positions.get(&parent_index) {
                Some(&position) => Some(position),
                None => {
                    return Err(DendraError::MissingParent {
                        child: index,
                        parent: parent_index,
                    })
                }
            },
        };

        let compartment = Compartment::new(index, parent, params, self.dt, self.buffer_slots)?;

        let position = self.compartments.len();
        self.compartments.push(compartment);
        self.positions.insert(index, position);
        self.parents.push(parent_position);
        if parent_position.is_none() {
            self.root = Some(position);
        }

        self.phase = TreePhase::Unbuilt;
        debug!(
            target: "dendra-neural",
            "[TREE] Added {} (parent: {:?})",
            index,
            parent.map(|p| p.0)
        );
        Ok(())
    }

    /// Rebuild the derived indexes and reset every compartment to its initial state
    pub fn init(&mut self) -> Result<()> {
        let root = self.root.ok_or(DendraError::EmptyTree)?;
        let total = self.compartments.len();

        self.children = vec![Vec::new(); total];
        for (position, parent) in self.parents.iter().enumerate() {
            if let Some(parent) = parent {
                self.children[*parent].push(position);
            }
        }

        // Iterative DFS; children pushed in reverse so they pop in insertion order
        self.pre_order.clear();
        let mut stack = vec![root];
        let mut visited = vec![false; total];
        while let Some(position) = stack.pop() {
            if std::mem::replace(&mut visited[position], true) {
                continue;
            }
            self.pre_order.push(position);
            stack.extend(self.children[position].iter().rev().copied());
        }
        if self.pre_order.len() != total {
            return Err(DendraError::MalformedTopology {
                reached: self.pre_order.len(),
                total,
            });
        }
        self.post_order = self.pre_order.iter().rev().copied().collect();

        self.leaves = (0..total).filter(|&p| self.children[p].is_empty()).collect();

        for position in 0..total {
            let children_gc: f64 = self.children[position]
                .iter()
                .map(|&child| self.compartments[child].gc())
                .sum();
            self.compartments[position].init(self.dt, children_gc);
        }

        self.phase = TreePhase::Ready;
        debug!(
            target: "dendra-neural",
            "[TREE] Initialized {} compartments ({} leaves, dt={} ms)",
            total,
            self.leaves.len(),
            self.dt
        );
        Ok(())
    }

    /// Build every compartment's row of the linear system for `lag`
    pub fn construct_matrix(&mut self, lag: usize) -> Result<()> {
        if self.phase == TreePhase::Unbuilt {
            return Err(DendraError::NotInitialized);
        }
        if lag >= self.buffer_slots {
            return Err(DendraError::DeliveryOutOfRange {
                offset: lag,
                slots: self.buffer_slots,
            });
        }
        for compartment in &mut self.compartments {
            compartment.construct_matrix_element(lag)?;
        }
        self.phase = TreePhase::Constructed;
        Ok(())
    }

    /// Solve the constructed system; every compartment's voltage is updated
    pub fn solve_matrix(&mut self) -> Result<()> {
        match self.phase {
            TreePhase::Unbuilt => return Err(DendraError::NotInitialized),
            TreePhase::Ready => return Err(DendraError::MatrixNotConstructed),
            TreePhase::Constructed => {}
        }
        // A failed solve leaves a half-eliminated system; it must be rebuilt
        self.phase = TreePhase::Ready;

        let Some(root) = self.root else {
            return Err(DendraError::EmptyTree);
        };

        for &position in &self.post_order {
            let Some(parent) = self.parents[position] else {
                continue;
            };
            let contribution = self.compartments[position].io();
            self.check_diagonal(position)?;
            self.compartments[parent].gather_input(contribution);
        }

        self.compartments[root].io();
        self.check_diagonal(root)?;
        self.compartments[root].calc_v(0.0);

        for &position in self.pre_order.iter().skip(1) {
            if let Some(parent) = self.parents[position] {
                let v_parent = self.compartments[parent].v();
                self.compartments[position].calc_v(v_parent);
            }
        }

        trace!(
            target: "dendra-neural",
            "[TREE] Solved step: root v={:.4} mV",
            self.compartments[root].v()
        );
        Ok(())
    }

    /// One full step: construct then solve
    pub fn step(&mut self, lag: usize) -> Result<()> {
        self.construct_matrix(lag)?;
        self.solve_matrix()
    }

    /// Change the resolution; takes effect at the next `init`
    pub fn set_resolution(&mut self, dt: f64) -> Result<()> {
        check_resolution(dt)?;
        self.dt = dt;
        self.phase = TreePhase::Unbuilt;
        Ok(())
    }

    pub fn resolution(&self) -> f64 {
        self.dt
    }

    pub fn buffer_slots(&self) -> usize {
        self.buffer_slots
    }

    pub fn is_initialized(&self) -> bool {
        self.phase != TreePhase::Unbuilt
    }

    /// Voltage (mV) of the compartment with `index`
    pub fn voltage(&self, index: CompartmentId) -> Result<f64> {
        self.compartment(index).map(Compartment::v)
    }

    /// Voltages in insertion order
    pub fn voltages(&self) -> Vec<f64> {
        self.compartments.iter().map(Compartment::v).collect()
    }

    pub fn root(&self) -> Option<&Compartment> {
        self.root.map(|position| &self.compartments[position])
    }

    /// Leaf compartments (valid after `init`)
    pub fn leaves(&self) -> Vec<CompartmentId> {
        self.leaves
            .iter()
            .map(|&position| self.compartments[position].index())
            .collect()
    }

    /// Children of `index` in insertion order (valid after `init`)
    pub fn children_of(&self, index: CompartmentId) -> Result<Vec<CompartmentId>> {
        let position = self.position(index)?;
        Ok(self
            .children
            .get(position)
            .map(|children| {
                children
                    .iter()
                    .map(|&child| self.compartments[child].index())
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn compartment(&self, index: CompartmentId) -> Result<&Compartment> {
        let position = self.position(index)?;
        Ok(&self.compartments[position])
    }

    pub fn compartment_mut(&mut self, index: CompartmentId) -> Result<&mut Compartment> {
        let position = self.position(index)?;
        Ok(&mut self.compartments[position])
    }

    pub fn contains(&self, index: CompartmentId) -> bool {
        self.positions.contains_key(&index)
    }

    /// Compartments in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Compartment> {
        self.compartments.iter()
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    /// Move every ring buffer origin forward by `steps` slots
    pub fn advance_buffers(&mut self, steps: usize) {
        for compartment in &mut self.compartments {
            compartment.advance_buffers(steps);
        }
    }

    fn position(&self, index: CompartmentId) -> Result<usize> {
        self.positions
            .get(&index)
            .copied()
            .ok_or(DendraError::CompartmentNotFound(index))
    }

    fn check_diagonal(&self, position: usize) -> Result<()> {
        let compartment = &self.compartments[position];
        let gg = compartment.diagonal();
        if gg.is_finite() && gg.abs() >= DIAGONAL_EPSILON {
            return Ok(());
        }
        warn!(
            target: "dendra-neural",
            "[TREE] Degenerate diagonal gg={} at {}",
            gg,
            compartment.index()
        );
        Err(DendraError::DegenerateDiagonal {
            compartment: compartment.index(),
            gg,
        })
    }
}

impl fmt::Display for CompTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CompTree ({} compartments, dt={} ms)", self.len(), self.dt)?;
        for (position, compartment) in self.compartments.iter().enumerate() {
            match compartment.parent_index() {
                Some(parent) => write!(f, "  {} <- parent {}", compartment.index().0, parent.0)?,
                None => write!(f, "  {} (root)", compartment.index().0)?,
            }
            if let Some(children) = self.children.get(position).filter(|c| !c.is_empty()) {
                let names: Vec<String> = children
                    .iter()
                    .map(|&child| self.compartments[child].index().0.to_string())
                    .collect();
                write!(f, " -> children [{}]", names.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn check_resolution(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(DendraError::InvalidResolution(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.1;

    fn id(n: u32) -> CompartmentId {
        CompartmentId(n)
    }

    fn passive() -> CompartmentParams {
        CompartmentParams::passive(1.0, 0.1, 0.1, -70.0)
    }

    /// 0 ─┬─ 1 ── 3
    ///    └─ 2
    fn branched_tree() -> CompTree {
        let mut tree = CompTree::new(DT, 16).unwrap();
        tree.add_compartment(id(0), None, &passive()).unwrap();
        tree.add_compartment(id(1), Some(id(0)), &passive()).unwrap();
        tree.add_compartment(id(2), Some(id(0)), &passive()).unwrap();
        tree.add_compartment(id(3), Some(id(1)), &passive()).unwrap();
        tree.init().unwrap();
        tree
    }

    #[test]
    fn test_topology_errors() {
        let mut tree = CompTree::new(DT, 16).unwrap();
        assert_eq!(tree.init(), Err(DendraError::EmptyTree));
        assert_eq!(
            tree.add_compartment(id(1), Some(id(0)), &passive()),
            Err(DendraError::MissingParent {
                child: id(1),
                parent: id(0)
            })
        );

        tree.add_compartment(id(0), None, &passive()).unwrap();
        assert_eq!(
            tree.add_compartment(id(0), None, &passive()),
            Err(DendraError::DuplicateCompartment(id(0)))
        );
        assert_eq!(
            tree.add_compartment(id(5), None, &passive()),
            Err(DendraError::MultipleRoots {
                existing: id(0),
                rejected: id(5)
            })
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_derived_indexes() {
        let tree = branched_tree();
        assert_eq!(tree.root().map(Compartment::index), Some(id(0)));
        assert_eq!(tree.children_of(id(0)).unwrap(), vec![id(1), id(2)]);
        assert_eq!(tree.children_of(id(1)).unwrap(), vec![id(3)]);
        assert_eq!(tree.leaves(), vec![id(2), id(3)]);
        assert_eq!(tree.pre_order, vec![0, 1, 3, 2]);
        assert_eq!(tree.post_order, vec![2, 3, 1, 0]);
    }

    #[test]
    fn test_every_non_root_has_parent_in_tree() {
        let tree = branched_tree();
        for compartment in tree.iter() {
            match compartment.parent_index() {
                Some(parent) => assert!(tree.contains(parent)),
                None => assert_eq!(compartment.index(), id(0)),
            }
        }
    }

    #[test]
    fn test_usage_order_errors() {
        let mut tree = CompTree::new(DT, 16).unwrap();
        tree.add_compartment(id(0), None, &passive()).unwrap();
        assert_eq!(tree.construct_matrix(0), Err(DendraError::NotInitialized));
        assert_eq!(tree.solve_matrix(), Err(DendraError::NotInitialized));

        tree.init().unwrap();
        assert_eq!(tree.solve_matrix(), Err(DendraError::MatrixNotConstructed));
        tree.step(0).unwrap();
        // Each solve consumes the constructed matrix
        assert_eq!(tree.solve_matrix(), Err(DendraError::MatrixNotConstructed));
        assert_eq!(
            tree.construct_matrix(16),
            Err(DendraError::DeliveryOutOfRange {
                offset: 16,
                slots: 16
            })
        );

        tree.add_compartment(id(1), Some(id(0)), &passive()).unwrap();
        assert_eq!(tree.construct_matrix(0), Err(DendraError::NotInitialized));

        tree.init().unwrap();
        tree.set_resolution(0.05).unwrap();
        assert_eq!(tree.step(0), Err(DendraError::NotInitialized));
        assert_eq!(tree.set_resolution(0.0), Err(DendraError::InvalidResolution(0.0)));
    }

    #[test]
    fn test_rest_is_fixed_point() {
        let mut tree = branched_tree();
        for lag in 0..10 {
            tree.step(lag).unwrap();
        }
        for v in tree.voltages() {
            assert!((v - -70.0).abs() < 1e-9, "v = {}", v);
        }
    }

    #[test]
    fn test_single_compartment_closed_form() {
        let (ca, gl, el, current) = (2.0, 0.3, -65.0, 0.5);
        let mut tree = CompTree::new(DT, 16).unwrap();
        let params = CompartmentParams {
            v_init: Some(-60.0),
            ..CompartmentParams::passive(ca, 0.1, gl, el)
        };
        tree.add_compartment(id(0), None, &params).unwrap();
        tree.init().unwrap();

        let mut v = -60.0;
        for lag in 0..5 {
            tree.compartment_mut(id(0)).unwrap().handle_current(lag, current).unwrap();
            tree.step(lag).unwrap();
            v = (ca / DT * v + gl * el + current) / (ca / DT + gl);
            assert!((tree.voltage(id(0)).unwrap() - v).abs() < 1e-10);
        }
    }

    #[test]
    fn test_two_compartments_relax_in_order() {
        let mut tree = CompTree::new(DT, 16).unwrap();
        tree.add_compartment(id(0), None, &passive()).unwrap();
        let child = CompartmentParams {
            v_init: Some(-40.0),
            ..passive()
        };
        tree.add_compartment(id(1), Some(id(0)), &child).unwrap();
        tree.init().unwrap();

        tree.step(0).unwrap();
        let root = tree.voltage(id(0)).unwrap();
        let leaf = tree.voltage(id(1)).unwrap();
        assert!(root > -70.0 && root < leaf && leaf < -40.0);

        for _ in 0..1600 {
            tree.step(0).unwrap();
        }
        for v in tree.voltages() {
            assert!((v - -70.0).abs() < 1e-3, "v = {}", v);
        }
    }

    #[test]
    fn test_tree_solve_matches_dense_solve() {
        let mut tree = branched_tree();
        tree.compartment_mut(id(3)).unwrap().handle_current(0, 2.0).unwrap();
        tree.construct_matrix(0).unwrap();

        // Assemble the dense system before elimination mutates the rows
        let n = tree.len();
        let mut a = vec![vec![0.0; n]; n];
        let mut b = vec![0.0; n];
        for (row, compartment) in tree.iter().enumerate() {
            let (ff, gg, hh) = compartment.matrix_element();
            a[row][row] = gg;
            b[row] = ff;
            if let Some(parent) = tree.parents[row] {
                a[row][parent] = hh;
                a[parent][row] = hh;
            }
        }
        tree.solve_matrix().unwrap();

        let v = tree.voltages();
        for row in 0..n {
            let lhs: f64 = (0..n).map(|col| a[row][col] * v[col]).sum();
            assert!((lhs - b[row]).abs() < 1e-9, "row {} residual {}", row, lhs - b[row]);
        }
        assert!(v[3] > v[1] && v[1] > v[0] && v[0] > v[2]);
    }

    #[test]
    fn test_degenerate_diagonal_reported() {
        let mut tree = CompTree::new(DT, 16).unwrap();
        tree.add_compartment(id(0), None, &passive()).unwrap();
        tree.init().unwrap();
        tree.construct_matrix(0).unwrap();
        // Cancel the root diagonal exactly
        tree.compartments[0].gather_input((1.0 / DT + 0.1, 0.0));
        match tree.solve_matrix() {
            Err(DendraError::DegenerateDiagonal { compartment, .. }) => {
                assert_eq!(compartment, id(0))
            }
            other => panic!("expected degenerate diagonal, got {:?}", other),
        }
    }

    #[test]
    fn test_display_lists_links() {
        let tree = branched_tree();
        let text = tree.to_string();
        assert!(text.contains("0 (root) -> children [1, 2]"));
        assert!(text.contains("3 <- parent 1"));
    }
}
