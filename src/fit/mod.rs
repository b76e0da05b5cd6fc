//! Curve fitting and uncertainty estimation.
//!
//! Responsibilities:
//!
//! - fit the sigmoid by Levenberg–Marquardt (`fitter`)
//! - derive the confidence band and Tmix bounds from the fit (`confidence`)

pub mod confidence;
pub mod fitter;

pub use confidence::*;
pub use fitter::*;
