//! Dupire/leverage calibration
//!
//! - `surface`: read-only target local-volatility grid
//! - `leverage`: mutable leverage grid L(S, t)
//! - `calibrate`: damped fixed-point loop matching the model-implied local
//!   volatility to the target at every node

pub mod calibrate;
pub mod leverage;
pub mod surface;

pub use calibrate::*;
pub use leverage::*;
pub use surface::*;
