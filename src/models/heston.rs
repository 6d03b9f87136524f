//! Heston Stochastic Volatility Model
//!
//! The Heston model assumes variance follows a mean-reverting square-root
//! process:
//!
//! dS = r * S * dt + √v * S * dW_S
//! dv = κ(θ - v) * dt + ξ * √v * dW_v
//!
//! where:
//! - v: instantaneous variance
//! - κ: mean reversion speed
//! - θ: long-term variance
//! - ξ: volatility of volatility (vol-of-vol)
//! - ρ: correlation between spot and variance Brownians
//!
//! This module holds the parameter set and the two interchangeable variance
//! discretizations used by the SLV pricer: full-truncation Euler and the
//! Andersen Quadratic-Exponential (QE) scheme. QE matches the first two
//! conditional moments of the CIR transition density and stays accurate at
//! large time steps where Euler would bias the variance toward its floor.

use serde::{Deserialize, Serialize};

use crate::core::{PricerError, PricerResult};

/// Heston model parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HestonParams {
    /// Mean reversion speed (κ)
    pub kappa: f64,
    /// Long-term variance (θ)
    pub theta: f64,
    /// Volatility of volatility (ξ)
    pub xi: f64,
    /// Correlation between spot and variance (ρ)
    pub rho: f64,
    /// Initial variance (v0)
    pub v0: f64,
}

impl HestonParams {
    pub fn new(kappa: f64, theta: f64, xi: f64, rho: f64, v0: f64) -> Self {
        Self {
            kappa,
            theta,
            xi,
            rho,
            v0,
        }
    }

    /// Typical parameters for an equity index
    pub fn typical_equity() -> Self {
        Self {
            kappa: 1.5,  // Mean reversion
            theta: 0.04, // 20% long-term vol
            xi: 0.5,     // Vol-of-vol
            rho: -0.7,   // Negative correlation (leverage effect)
            v0: 0.04,    // 20% initial vol
        }
    }

    /// Check Feller condition: 2κθ > ξ² (variance stays strictly positive)
    pub fn feller_condition(&self) -> bool {
        2.0 * self.kappa * self.theta > self.xi * self.xi
    }

    /// Validate parameters
    pub fn validate(&self) -> PricerResult<()> {
        if self.kappa <= 0.0 {
            return Err(PricerError::invalid_input("kappa must be positive"));
        }
        if self.theta <= 0.0 {
            return Err(PricerError::invalid_input("theta must be positive"));
        }
        if self.xi < 0.0 {
            return Err(PricerError::invalid_input("xi must be non-negative"));
        }
        if !(-1.0..=1.0).contains(&self.rho) {
            return Err(PricerError::invalid_input("rho must be in [-1, 1]"));
        }
        if self.v0 <= 0.0 {
            return Err(PricerError::invalid_input("v0 must be positive"));
        }
        Ok(())
    }

    /// Long-term volatility
    pub fn long_term_vol(&self) -> f64 {
        self.theta.sqrt()
    }

    /// Initial volatility
    pub fn initial_vol(&self) -> f64 {
        self.v0.sqrt()
    }

    /// One full-truncation Euler step of the variance process.
    ///
    /// v' = max(0, v + κ(θ - v⁺)dt + ξ √v⁺ z √dt)
    pub fn step_truncated_euler(&self, v: f64, dt: f64, z: f64) -> f64 {
        let v_plus = v.max(0.0);
        let v_next =
            v + self.kappa * (self.theta - v_plus) * dt + self.xi * v_plus.sqrt() * z * dt.sqrt();
        v_next.max(0.0)
    }
}

impl Default for HestonParams {
    fn default() -> Self {
        Self::typical_equity()
    }
}

/// Precomputed Andersen QE step for a fixed time increment.
///
/// Reference: Andersen (2008), "Simple and efficient simulation of the Heston
/// stochastic volatility model". The conditional mean and variance of the CIR
/// transition are matched, then the next variance is sampled from either a
/// quadratic form (ψ < 1.5) or an exponential tail (ψ ≥ 1.5).
#[derive(Debug, Clone, Copy)]
pub struct QeStep {
    kappa: f64,
    theta: f64,
    xi2: f64,
    exp_kdt: f64,
}

/// Branching threshold on ψ = s²/m² between the quadratic and exponential
/// sampling regimes.
pub const QE_PSI_CRITICAL: f64 = 1.5;

impl QeStep {
    pub fn new(params: &HestonParams, dt: f64) -> Self {
        Self {
            kappa: params.kappa,
            theta: params.theta,
            xi2: params.xi * params.xi,
            exp_kdt: (-params.kappa * dt).exp(),
        }
    }

    /// Conditional mean and variance of v(t+dt) given v(t) = v.
    fn conditional_moments(&self, v: f64) -> (f64, f64) {
        let e = self.exp_kdt;
        let m = self.theta + (v - self.theta) * e;
        let s2 = v * self.xi2 * e * (1.0 - e) / self.kappa
            + self.theta * self.xi2 * 0.5 / self.kappa * (1.0 - e) * (1.0 - e);
        (m, s2)
    }

    /// Advance the variance one step.
    ///
    /// `u` is a uniform in (0, 1) for the exponential-tail branch, `z` a
    /// standard normal for the quadratic branch. The result is non-negative
    /// for any input.
    pub fn advance(&self, v: f64, u: f64, z: f64) -> f64 {
        let (m, s2) = self.conditional_moments(v.max(0.0));
        if m <= 0.0 {
            return 0.0;
        }
        let psi = s2 / (m * m);
        if psi < QE_PSI_CRITICAL {
            let inv_psi = 2.0 / psi;
            let b2 = inv_psi - 1.0 + inv_psi.sqrt() * (inv_psi - 1.0).sqrt();
            let a = m / (1.0 + b2);
            let quad = b2.sqrt() + z;
            a * quad * quad
        } else {
            let p = (psi - 1.0) / (psi + 1.0);
            let beta = (1.0 - p) / m;
            if u > p {
                -((1.0 - u) / (1.0 - p)).ln() / beta
            } else {
                0.0
            }
        }
    }
}
