//! Transition model implementation.
//!
//! The model is implemented as small, pure functions so that fitting and
//! confidence code can stay simple.

pub mod sigmoid;

pub use sigmoid::*;
