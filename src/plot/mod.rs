//! Plot rendering for fitted experiments.
//!
//! - `ascii`: fixed-size terminal plot
//! - `svg`: publication-style overlay figure via Plotters
//!
//! Both take an explicit `PlotStyle`.

pub mod ascii;
pub mod style;
pub mod svg;

pub use ascii::{render_ascii_overlay, render_ascii_run};
pub use style::{PlotStyle, Rgb};
pub use svg::render_svg_overlay;
