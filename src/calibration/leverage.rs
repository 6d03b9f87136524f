//! Leverage grid for SLV calibration
//!
//! Multiplicative leverage factor L(S, t) on the same grid as the target
//! Dupire surface, initialized to 1.0 and adjusted in place by the
//! calibration loop. After every update each node is finite and inside the
//! configured [min_leverage, max_leverage] band.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::models::local_vol::find_bracket;
use crate::models::{GridVol, LocalVol};

use super::surface::DupireSurface;

/// Leverage surface L(S, t), same shape as the Dupire target grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageGrid {
    /// Ascending time axis
    pub times: Vec<f64>,
    /// Ascending spot axis
    pub spots: Vec<f64>,
    /// Leverage values, shape (times, spots)
    pub l: Array2<f64>,
}

impl LeverageGrid {
    /// Flat unit leverage on the target surface's axes.
    pub fn ones_like(target: &DupireSurface) -> Self {
        Self {
            times: target.times.clone(),
            spots: target.spots.clone(),
            l: Array2::ones((target.num_times(), target.num_spots())),
        }
    }

    pub fn num_times(&self) -> usize {
        self.times.len()
    }

    pub fn num_spots(&self) -> usize {
        self.spots.len()
    }

    /// Bilinear interpolation with clamped extrapolation.
    pub fn interpolate(&self, spot: f64, time: f64) -> f64 {
        if self.times.is_empty() || self.spots.is_empty() {
            return 1.0;
        }
        let (ti_lo, ti_hi, t_frac) = find_bracket(&self.times, time);
        let (si_lo, si_hi, s_frac) = find_bracket(&self.spots, spot);

        let v00 = self.l[[ti_lo, si_lo]];
        let v01 = self.l[[ti_lo, si_hi]];
        let v10 = self.l[[ti_hi, si_lo]];
        let v11 = self.l[[ti_hi, si_hi]];

        let v0 = v00 * (1.0 - s_frac) + v01 * s_frac;
        let v1 = v10 * (1.0 - s_frac) + v11 * s_frac;
        v0 * (1.0 - t_frac) + v1 * t_frac
    }

    /// Grid local-vol function σ(S, t) = base_vol * L(S, t), for feeding the
    /// leverage surface back into the SLV pricer.
    pub fn to_local_vol(&self, base_vol: f64) -> LocalVol {
        LocalVol::Grid(GridVol::new(
            self.times.clone(),
            self.spots.clone(),
            self.l.mapv(|l| base_vol * l),
        ))
    }

    /// Largest node value
    pub fn max_value(&self) -> f64 {
        self.l.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest node value
    pub fn min_value(&self) -> f64 {
        self.l.iter().cloned().fold(f64::INFINITY, f64::min)
    }
}
