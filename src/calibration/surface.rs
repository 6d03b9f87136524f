//! Dupire local-volatility target surface
//!
//! Rectangular (time, spot) grid of target local volatilities. The surface
//! is read-only during calibration; lookups between nodes use bilinear
//! interpolation with clamped extrapolation at the boundary.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::{PricerError, PricerResult};
use crate::models::local_vol::find_bracket;

/// Target local-volatility surface on an ordered rectangular grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DupireSurface {
    /// Ascending time axis
    pub times: Vec<f64>,
    /// Ascending spot axis
    pub spots: Vec<f64>,
    /// Target local volatility, shape (times, spots)
    pub sigma: Array2<f64>,
}

impl DupireSurface {
    /// Build a surface, validating the grid shape and axis ordering.
    pub fn new(times: Vec<f64>, spots: Vec<f64>, sigma: Array2<f64>) -> PricerResult<Self> {
        if times.is_empty() || spots.is_empty() {
            return Err(PricerError::invalid_input("surface axes must be non-empty"));
        }
        if sigma.dim() != (times.len(), spots.len()) {
            return Err(PricerError::invalid_input(format!(
                "sigma shape {:?} does not match axes ({}, {})",
                sigma.dim(),
                times.len(),
                spots.len()
            )));
        }
        if !is_ascending(&times) || !is_ascending(&spots) {
            return Err(PricerError::invalid_input("surface axes must be ascending"));
        }
        Ok(Self {
            times,
            spots,
            sigma,
        })
    }

    pub fn num_times(&self) -> usize {
        self.times.len()
    }

    pub fn num_spots(&self) -> usize {
        self.spots.len()
    }

    /// Target volatility at grid node (ti, si)
    pub fn at(&self, ti: usize, si: usize) -> f64 {
        self.sigma[[ti, si]]
    }

    /// Bilinear interpolation with clamped extrapolation beyond the grid.
    pub fn bilinear(&self, spot: f64, time: f64) -> f64 {
        let (ti_lo, ti_hi, t_frac) = find_bracket(&self.times, time);
        let (si_lo, si_hi, s_frac) = find_bracket(&self.spots, spot);

        let v00 = self.sigma[[ti_lo, si_lo]];
        let v01 = self.sigma[[ti_lo, si_hi]];
        let v10 = self.sigma[[ti_hi, si_lo]];
        let v11 = self.sigma[[ti_hi, si_hi]];

        let v0 = v00 * (1.0 - s_frac) + v01 * s_frac;
        let v1 = v10 * (1.0 - s_frac) + v11 * s_frac;
        v0 * (1.0 - t_frac) + v1 * t_frac
    }

    /// Synthetic test surface: flat base vol with a put skew in log-moneyness
    /// and a mild upward term structure, floored at 5%.
    pub fn synthetic(spot_ref: f64, base_vol: f64) -> Self {
        let times: Vec<f64> = vec![0.25, 0.5, 1.0, 1.5, 2.0];
        let spots: Vec<f64> = vec![0.5, 0.75, 1.0, 1.25, 1.5]
            .into_iter()
            .map(|m| m * spot_ref)
            .collect();

        let mut sigma = Array2::zeros((times.len(), spots.len()));
        for (ti, &t) in times.iter().enumerate() {
            for (si, &s) in spots.iter().enumerate() {
                let moneyness = (s / spot_ref).ln();
                let skew = -0.1 * moneyness;
                let term = 0.02 * t.sqrt();
                sigma[[ti, si]] = (base_vol + skew + term).max(0.05);
            }
        }
        Self {
            times,
            spots,
            sigma,
        }
    }
}

fn is_ascending(axis: &[f64]) -> bool {
    axis.windows(2).all(|w| w[0] < w[1])
}
