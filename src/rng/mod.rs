//! Random stream providers for Monte Carlo simulation
//!
//! Three variate sources:
//! - `pseudo`: seeded ChaCha8 stream for sequential simulation
//! - `halton`: shifted Halton low-discrepancy points (quasi-Monte Carlo)
//! - `hash`: stateless variates keyed by (seed, path, step) for lock-free
//!   parallel path generation

pub mod halton;
pub mod hash;
pub mod pseudo;

pub use halton::*;
pub use hash::*;
pub use pseudo::*;
