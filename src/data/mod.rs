//! Count data: aggregation of annotated counts and synthetic generation.

pub mod counts;
pub mod synthetic;

pub use counts::*;
pub use synthetic::*;
