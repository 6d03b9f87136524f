//! Core data types for the pricing toolkit
//!
//! Defines fundamental types:
//! - OptionType: call/put payoff logic
//! - Greeks: analytic sensitivities
//! - McResult: Monte Carlo estimate with standard error
//! - PricerError: error taxonomy

pub mod error;
pub mod greeks;
pub mod option;
pub mod stats;

pub use error::*;
pub use greeks::*;
pub use option::*;
pub use stats::*;
