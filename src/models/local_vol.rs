//! Local volatility functions
//!
//! A local volatility is a pure mapping (spot, time) → non-negative vol.
//! Three variants are supported:
//! - CEV: constant-elasticity-of-variance, `α * (S/Sref)^(β-1)`
//! - Smile: CEV base tilted by log-moneyness and a term-structure factor
//! - Grid: bilinear interpolation of a precomputed surface, typically built
//!   from a calibrated leverage grid
//!
//! Modeled as a tagged variant rather than a trait object so the simulation
//! inner loop stays monomorphic and branch-predictable.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Constant-elasticity-of-variance local vol: `α * (S/Sref)^(β-1)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CevVol {
    /// Volatility scale at the reference spot
    pub alpha: f64,
    /// Elasticity exponent (β = 1 recovers constant vol)
    pub beta: f64,
    /// Reference spot
    pub s_ref: f64,
}

impl Default for CevVol {
    fn default() -> Self {
        Self {
            alpha: 0.20,
            beta: 1.0,
            s_ref: 100.0,
        }
    }
}

impl CevVol {
    pub fn vol(&self, spot: f64, _time: f64) -> f64 {
        let ratio = if self.s_ref > 0.0 {
            spot / self.s_ref
        } else {
            1.0
        };
        self.alpha * ratio.max(1e-12).powf(self.beta - 1.0)
    }
}

/// Skewed/smiled local vol: CEV base tilted by log-moneyness and scaled by a
/// term-structure factor, floored at `sigma_min`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmileVol {
    pub alpha: f64,
    pub beta: f64,
    /// Log-moneyness tilt
    pub eta: f64,
    /// Term-structure slope
    pub zeta: f64,
    pub s_ref: f64,
    /// Volatility floor
    pub sigma_min: f64,
}

impl Default for SmileVol {
    fn default() -> Self {
        Self {
            alpha: 0.20,
            beta: 1.0,
            eta: 0.15,
            zeta: 0.20,
            s_ref: 100.0,
            sigma_min: 0.01,
        }
    }
}

impl SmileVol {
    pub fn vol(&self, spot: f64, time: f64) -> f64 {
        let (x, ratio) = if self.s_ref > 0.0 {
            (
                (spot.max(1e-12) / self.s_ref).ln(),
                (spot / self.s_ref).max(1e-12),
            )
        } else {
            (0.0, 1.0)
        };
        let cev = self.alpha * ratio.powf(self.beta - 1.0);
        let smile = 1.0 + self.eta * x;
        let term = (1.0 + self.zeta * time).max(1e-12).sqrt();
        ((cev * smile).abs() * term).max(self.sigma_min)
    }
}

/// Grid-interpolated local vol with clamped extrapolation beyond the axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridVol {
    /// Ascending time axis
    pub times: Vec<f64>,
    /// Ascending spot axis
    pub spots: Vec<f64>,
    /// Volatility values, shape (times, spots)
    pub vols: Array2<f64>,
}

impl GridVol {
    pub fn new(times: Vec<f64>, spots: Vec<f64>, vols: Array2<f64>) -> Self {
        Self { times, spots, vols }
    }

    pub fn vol(&self, spot: f64, time: f64) -> f64 {
        if self.times.is_empty() || self.spots.is_empty() {
            return 0.0;
        }
        let (ti_lo, ti_hi, t_frac) = find_bracket(&self.times, time);
        let (si_lo, si_hi, s_frac) = find_bracket(&self.spots, spot);

        let v00 = self.vols[[ti_lo, si_lo]];
        let v01 = self.vols[[ti_lo, si_hi]];
        let v10 = self.vols[[ti_hi, si_lo]];
        let v11 = self.vols[[ti_hi, si_hi]];

        let v0 = v00 * (1.0 - s_frac) + v01 * s_frac;
        let v1 = v10 * (1.0 - s_frac) + v11 * s_frac;
        (v0 * (1.0 - t_frac) + v1 * t_frac).max(0.0)
    }
}

/// Bracketing indices and interpolation weight for `value` on an ascending
/// axis, clamping outside the grid.
pub(crate) fn find_bracket(axis: &[f64], value: f64) -> (usize, usize, f64) {
    if axis.is_empty() {
        return (0, 0, 0.0);
    }
    if value <= axis[0] {
        return (0, 0, 0.0);
    }
    let last = axis.len() - 1;
    if value >= axis[last] {
        return (last, last, 0.0);
    }
    for i in 0..last {
        if value >= axis[i] && value <= axis[i + 1] {
            let frac = (value - axis[i]) / (axis[i + 1] - axis[i]);
            return (i, i + 1, frac);
        }
    }
    (last, last, 0.0)
}

/// Local volatility function, polymorphic over a single capability:
/// evaluate σ(S, t).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LocalVol {
    Cev(CevVol),
    Smile(SmileVol),
    Grid(GridVol),
}

impl LocalVol {
    /// Constant volatility, expressed as CEV with β = 1
    pub fn constant(sigma: f64) -> Self {
        LocalVol::Cev(CevVol {
            alpha: sigma,
            beta: 1.0,
            s_ref: 100.0,
        })
    }

    /// Evaluate the volatility at (spot, time). Always non-negative.
    pub fn vol(&self, spot: f64, time: f64) -> f64 {
        match self {
            LocalVol::Cev(cev) => cev.vol(spot, time),
            LocalVol::Smile(smile) => smile.vol(spot, time),
            LocalVol::Grid(grid) => grid.vol(spot, time),
        }
    }
}
