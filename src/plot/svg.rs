//! SVG overlay figure rendered with Plotters.
//!
//! One figure per overlay: every experiment gets its fitted curve, its observed
//! points and (optionally) a shaded confidence band, all in the experiment's
//! palette color. Layout and colors come from the `PlotStyle` passed in.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::ExperimentRun;
use crate::error::AppError;
use crate::models::sigmoid_many;
use crate::overlay::SeriesOverlay;
use crate::plot::{PlotStyle, Rgb};

/// Samples per fitted curve.
const CURVE_SAMPLES: usize = 200;

/// Write the overlay figure to `path`.
pub fn render_svg_overlay(path: &Path, overlay: &SeriesOverlay, style: &PlotStyle) -> Result<(), AppError> {
    let (t_min, t_max) = overlay
        .temperature_range()
        .filter(|(lo, hi)| hi > lo)
        .ok_or_else(|| AppError::new(3, "Nothing to plot: overlay has no temperature extent."))?;
    let (y_min, y_max) = overlay.value_range().filter(|(lo, hi)| hi > lo).unwrap_or((0.0, 100.0));
    let y_pad = 0.05 * (y_max - y_min);

    let root = SVGBackend::new(path, (style.width_px, style.height_px)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let font = (style.font_family.as_str(), f64::from(style.font_size)).into_font();

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(t_min..t_max, (y_min - y_pad)..(y_max + y_pad))
        .map_err(draw_error)?;

    let mut mesh = chart.configure_mesh();
    if !style.show_grid {
        mesh.disable_mesh();
    }
    mesh.x_desc(style.x_label.as_str())
        .y_desc(style.y_label.as_str())
        .label_style(font.clone())
        .axis_desc_style(font.clone())
        .draw()
        .map_err(draw_error)?;

    let band_color = to_plotters(style.band_color).mix(style.band_opacity);
    let line_width = style.line_width.max(1);

    for (idx, run) in overlay.iter().enumerate() {
        let color = to_plotters(style.color_for(idx));

        if style.show_band && run.band.len() >= 2 {
            chart
                .draw_series(std::iter::once(Polygon::new(band_outline(run), band_color.filled())))
                .map_err(draw_error)?;
        }

        chart
            .draw_series(LineSeries::new(
                sample_curve(run, t_min, t_max),
                color.stroke_width(line_width),
            ))
            .map_err(draw_error)?
            .label(format!("{} (Tmix {:.2})", run.label, run.midpoint.temperature))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(line_width)));

        chart
            .draw_series(
                run.series
                    .points()
                    .iter()
                    .map(|p| Circle::new((p.temperature, p.percentage), style.marker_size, color.filled())),
            )
            .map_err(draw_error)?;
    }

    if !overlay.is_empty() {
        chart
            .configure_series_labels()
            .label_font(font)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_error)?;
    }

    root.present().map_err(draw_error)?;
    Ok(())
}

fn to_plotters(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn draw_error<E: std::fmt::Display>(err: E) -> AppError {
    AppError::new(2, format!("Failed to render SVG plot: {err}"))
}

/// Upper envelope left to right, then the lower envelope back.
fn band_outline(run: &ExperimentRun) -> Vec<(f64, f64)> {
    let upper = run.band.points.iter().map(|b| (b.temperature, b.upper));
    let lower = run.band.points.iter().rev().map(|b| (b.temperature, b.lower));
    upper.chain(lower).collect()
}

fn sample_curve(run: &ExperimentRun, t_min: f64, t_max: f64) -> Vec<(f64, f64)> {
    let temps: Vec<f64> = (0..CURVE_SAMPLES)
        .map(|i| t_min + (t_max - t_min) * i as f64 / (CURVE_SAMPLES - 1) as f64)
        .collect();
    let values = sigmoid_many(&temps, &run.fit.params);
    temps.into_iter().zip(values).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::ExperimentInput;
    use crate::domain::{PercentageSeries, RunConfig};
    use crate::overlay::run_all;

    #[test]
    fn writes_svg_with_axis_labels_and_legend() {
        let series = PercentageSeries::from_pairs(
            &[30.0, 40.0, 46.0, 52.0, 60.0],
            &[2.0, 20.0, 50.0, 80.0, 98.0],
        )
        .unwrap();
        let outcome = run_all(
            vec![("exp1".to_string(), ExperimentInput::Series(series))],
            &RunConfig::default(),
        );
        assert!(outcome.failures.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.svg");
        render_svg_overlay(&path, &outcome.overlay, &PlotStyle::default()).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Percent of Vacuoles with Domains"));
        assert!(svg.contains("exp1"));
    }

    #[test]
    fn empty_overlay_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_svg_overlay(&dir.path().join("x.svg"), &SeriesOverlay::new(), &PlotStyle::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
