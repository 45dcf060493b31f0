// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Affine current approximation `(g, i)`
//!
//! Every current source hands the tree solver its current as
//! `I(v') ≈ i - g·v'` around the present voltage, so that the per-step
//! system stays linear in the new voltages.

use core::ops::{Add, AddAssign, Mul};

/// Linearized current: conductance term `g` and current term `i`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Linearization {
    /// Added to the matrix diagonal (µS)
    pub g: f64,
    /// Added to the right-hand side (nA)
    pub i: f64,
}

impl Linearization {
    pub const ZERO: Self = Self { g: 0.0, i: 0.0 };

    #[inline]
    pub fn new(g: f64, i: f64) -> Self {
        Self { g, i }
    }

    /// Midpoint linearization of `g_aux · f(v)` around `v`
    ///
    /// ```text
    /// g = -g_aux · f'(v) / 2
    /// i =  g_aux · (f(v) - f'(v) · v / 2)
    /// ```
    #[inline]
    pub fn midpoint(g_aux: f64, f: f64, df_dv: f64, v: f64) -> Self {
        Self {
            g: -g_aux * df_dv / 2.0,
            i: g_aux * (f - df_dv * v / 2.0),
        }
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.g, self.i)
    }
}

impl Add for Linearization {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            g: self.g + rhs.g,
            i: self.i + rhs.i,
        }
    }
}

impl AddAssign for Linearization {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.g += rhs.g;
        self.i += rhs.i;
    }
}

impl Mul<f64> for Linearization {
    type Output = Self;

    #[inline]
    fn mul(self, factor: f64) -> Self {
        Self {
            g: self.g * factor,
            i: self.i * factor,
        }
    }
}
