//! Monte Carlo pricing engines
//!
//! - `gbm`: terminal-spot simulation under constant-volatility GBM with
//!   antithetic, control-variate and quasi-Monte Carlo variance reduction
//!   plus simulation Greeks
//! - `slv`: joint (spot, variance) simulation under Heston dynamics with a
//!   local-volatility overlay

pub mod gbm;
pub mod slv;

pub use gbm::*;
pub use slv::*;
