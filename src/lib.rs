//! `tmix-curves` library crate.
//!
//! The binary (`tmix`) is a thin wrapper around this library so that:
//!
//! - the aggregation/fit/confidence pipeline is testable without spawning processes
//! - modules are reusable from other front ends (notebooks, batch drivers)
//!
//! Data flow: counts → `data::aggregate` → `fit::fit_sigmoid` →
//! `fit::estimate_band` / `fit::transition_midpoint` → `overlay::SeriesOverlay`.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod overlay;
pub mod plot;
pub mod report;
