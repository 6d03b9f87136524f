//! Volatility models
//!
//! Implements:
//! - Black-Scholes (analytic baseline, control-variate oracle)
//! - Heston stochastic variance (parameters + Euler/QE discretizations)
//! - Local volatility functions (CEV, smile, calibrated grid)

pub mod black_scholes;
pub mod heston;
pub mod local_vol;

pub use heston::*;
pub use local_vol::*;
