// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Voltage dependence of synaptic currents
//!
//! ```text
//! Driving force:  f(v) = E - v
//! NMDA block:     f(v) = (E - v) / (1 + 0.3 × exp(-0.1 v))
//! ```

/// Voltage dependence variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoltageDependence {
    /// Linear difference-of-potential current
    DrivingForce { e_rev: f64 },
    /// Magnesium block released at depolarized potentials
    NmdaBlock { e_rev: f64 },
}

impl VoltageDependence {
    #[inline]
    pub fn f(&self, v: f64) -> f64 {
        match *self {
            Self::DrivingForce { e_rev } => e_rev - v,
            Self::NmdaBlock { e_rev } => (e_rev - v) / mg_block(v),
        }
    }

    #[inline]
    pub fn df_dv(&self, v: f64) -> f64 {
        match *self {
            Self::DrivingForce { .. } => -1.0,
            Self::NmdaBlock { e_rev } => {
                let block = mg_block(v);
                0.03 * (e_rev - v) * (-0.1 * v).exp() / (block * block) - 1.0 / block
            }
        }
    }

    pub fn e_rev(&self) -> f64 {
        match *self {
            Self::DrivingForce { e_rev } | Self::NmdaBlock { e_rev } => e_rev,
        }
    }
}

#[inline]
fn mg_block(v: f64) -> f64 {
    1.0 + 0.3 * (-0.1 * v).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driving_force() {
        let vd = VoltageDependence::DrivingForce { e_rev: -80.0 };
        assert_eq!(vd.f(-70.0), -10.0);
        assert_eq!(vd.df_dv(-70.0), -1.0);
    }

    #[test]
    fn test_nmda_derivative_matches_finite_difference() {
        let vd = VoltageDependence::NmdaBlock { e_rev: 0.0 };
        let h = 1e-5;
        let mut v = -80.0;
        while v <= 40.0 {
            let numeric = (vd.f(v + h) - vd.f(v - h)) / (2.0 * h);
            let analytic = vd.df_dv(v);
            assert!(
                (numeric - analytic).abs() < 1e-6,
                "v = {}: numeric {} vs analytic {}",
                v,
                numeric,
                analytic
            );
            v += 0.5;
        }
    }

    #[test]
    fn test_nmda_block_released_when_depolarized() {
        let vd = VoltageDependence::NmdaBlock { e_rev: 0.0 };
        let free = VoltageDependence::DrivingForce { e_rev: 0.0 };
        // Strong block at rest, weak block near 0 mV
        let ratio_rest = vd.f(-70.0) / free.f(-70.0);
        let ratio_depol = vd.f(-10.0) / free.f(-10.0);
        assert!(ratio_rest < 0.01);
        assert!(ratio_depol > 0.4);
    }
}
