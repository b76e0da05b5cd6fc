//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output (handy for golden tests).
//!
//! Plot elements:
//! - fitted curves: `-` line
//! - confidence band envelopes: `.`
//! - observed points: one glyph per experiment (`PlotStyle::ascii_markers`)

use crate::domain::ExperimentRun;
use crate::overlay::SeriesOverlay;
use crate::plot::PlotStyle;

/// Render every experiment of an overlay on shared axes, followed by a legend.
pub fn render_ascii_overlay(overlay: &SeriesOverlay, style: &PlotStyle) -> String {
    render_runs(overlay.runs(), overlay.temperature_range(), overlay.value_range(), style)
}

/// Render a single experiment.
pub fn render_ascii_run(run: &ExperimentRun, style: &PlotStyle) -> String {
    let overlay: SeriesOverlay = std::iter::once(run.clone()).collect();
    render_ascii_overlay(&overlay, style)
}

fn render_runs(
    runs: &[ExperimentRun],
    t_range: Option<(f64, f64)>,
    value_range: Option<(f64, f64)>,
    style: &PlotStyle,
) -> String {
    let width = style.ascii_width.max(10);
    let height = style.ascii_height.max(5);

    let (t_min, t_max) = t_range.filter(|(lo, hi)| hi > lo).unwrap_or((0.0, 100.0));
    let (y_min, y_max) = value_range.filter(|(lo, hi)| hi > lo).unwrap_or((0.0, 100.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curves first so the band only fills blank cells and points overlay both.
    for run in runs {
        let curve = sample_curve(run, t_min, t_max, width);
        draw_curve(&mut grid, &curve, t_min, t_max, y_min, y_max, '-');
    }

    if style.show_band {
        for run in runs {
            let upper: Vec<(f64, f64)> = run.band.points.iter().map(|b| (b.temperature, b.upper)).collect();
            let lower: Vec<(f64, f64)> = run.band.points.iter().map(|b| (b.temperature, b.lower)).collect();
            draw_curve(&mut grid, &upper, t_min, t_max, y_min, y_max, '.');
            draw_curve(&mut grid, &lower, t_min, t_max, y_min, y_max, '.');
        }
    }

    for (idx, run) in runs.iter().enumerate() {
        let marker = style.marker_for(idx);
        for p in run.series.points() {
            let x = map_x(p.temperature, t_min, t_max, width);
            let y = map_y(p.percentage, y_min, y_max, height);
            grid[y][x] = marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: T=[{t_min:.1}, {t_max:.1}] | %PS=[{y_min:.1}, {y_max:.1}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    for (idx, run) in runs.iter().enumerate() {
        out.push_str(&format!(
            "{} {}: Tmix={:.2}\n",
            style.marker_for(idx),
            run.label,
            run.midpoint.temperature
        ));
    }

    out
}

fn sample_curve(run: &ExperimentRun, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let t = t_min + u * (t_max - t_min);
            (t, run.fit.params.eval(t))
        })
        .collect()
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y_max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None if grid[yy][x] == ' ' => grid[yy][x] = ch,
            None => {}
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConfidenceBand, FitDiagnostics, FitResult, PercentageSeries, SigmoidParams, Termination,
        TransitionMidpoint,
    };

    fn step_run(label: &str) -> ExperimentRun {
        let params = SigmoidParams::new(35.0, 0.01, 100.0);
        ExperimentRun {
            label: label.to_string(),
            series: PercentageSeries::from_pairs(&[30.0, 40.0], &[100.0, 0.0]).unwrap(),
            fit: FitResult {
                params,
                covariance: [[0.0; 3]; 3],
                diagnostics: FitDiagnostics {
                    sse: 0.0,
                    rmse: 0.0,
                    n_observations: 2,
                    iterations: 0,
                    termination: Termination::Objective,
                },
            },
            band: ConfidenceBand::default(),
            midpoint: TransitionMidpoint {
                temperature: 35.0,
                std_error: 0.0,
                lower: None,
                upper: None,
            },
        }
    }

    fn small_style() -> PlotStyle {
        PlotStyle {
            ascii_width: 11,
            ascii_height: 5,
            ..PlotStyle::default()
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let txt = render_ascii_run(&step_run("exp1"), &small_style());
        let expected = concat!(
            "Plot: T=[30.0, 40.0] | %PS=[-5.0, 105.0]\n",
            "o----      \n",
            "     -     \n",
            "     -     \n",
            "      -    \n",
            "      ----o\n",
            "o exp1: Tmix=35.00\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn overlay_uses_one_marker_per_experiment() {
        let overlay: SeriesOverlay = vec![step_run("a"), step_run("b")].into_iter().collect();
        let txt = render_ascii_overlay(&overlay, &small_style());

        // Second experiment draws over the first at identical coordinates.
        let rows: Vec<&str> = txt.lines().collect();
        assert!(rows[1].starts_with('x'));
        assert!(txt.ends_with("o a: Tmix=35.00\nx b: Tmix=35.00\n"));
    }

    #[test]
    fn empty_overlay_renders_blank_grid() {
        let txt = render_ascii_overlay(&SeriesOverlay::new(), &small_style());
        assert_eq!(txt.lines().count(), 6);
        assert!(txt.lines().skip(1).all(|l| l.trim().is_empty()));
    }
}
