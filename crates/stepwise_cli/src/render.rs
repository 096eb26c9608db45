//! Turns a comparison into a chart and draws it with plotters.

use crate::settings::Settings;
use anyhow::{anyhow, Result};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use stepwise_core::comparison::{run_comparison, Comparison};
use stepwise_core::deviation::{samples, Deviation, RelativeDeviation};
use stepwise_core::solvers::Method;
use stepwise_core::traits::ReferenceSolution;

pub const FIGURE_SIZE: (u32, u32) = (1200, 800);
const REFERENCE_SAMPLES: usize = 666;

/// One polyline of the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub method: Method,
    /// Legend entry; only the first branch of a method carries one.
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
}

/// Everything needed to draw a figure, independent of the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    pub title: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub y_desc: &'static str,
    /// The "true value" curve (or the zero line in deviation mode).
    pub reference: Option<Vec<(f64, f64)>>,
    pub series: Vec<Series>,
}

/// Samples `reference` on `[x_min, x_max)` at evenly spaced points.
pub fn reference_curve<R>(reference: &R, x_min: f64, x_max: f64) -> Vec<(f64, f64)>
where
    R: ReferenceSolution<f64> + ?Sized,
{
    let width = x_max - x_min;
    if width <= 0.0 {
        return Vec::new();
    }
    let dx = width / REFERENCE_SAMPLES as f64;
    (0..REFERENCE_SAMPLES)
        .map(|i| x_min + dx * i as f64)
        .map(|x| (x, reference.value(x)))
        .collect()
}

fn legend_label(method: Method, comparison: &Comparison) -> String {
    let deviations: Vec<&Deviation> = comparison
        .runs
        .iter()
        .filter(|run| run.method == method)
        .filter_map(|run| run.output.as_ref().ok())
        .filter_map(|output| output.deviation.as_ref())
        .filter_map(|scored| scored.as_ref().ok())
        .collect();
    if deviations.is_empty() {
        return method.label().to_string();
    }

    let absolute = deviations.iter().map(|d| d.absolute).fold(0.0, f64::max);
    let mut relative = Some(0.0_f64);
    for deviation in &deviations {
        relative = match (&deviation.relative, relative) {
            (RelativeDeviation::Defined { value }, Some(worst)) => Some(worst.max(*value)),
            _ => None,
        };
    }
    match relative {
        Some(rel) => format!("{} (abs {:.3e}, rel {:.3e})", method.label(), absolute, rel),
        None => format!("{} (abs {:.3e}, rel undefined)", method.label(), absolute),
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let span = hi - lo;
    if span <= f64::EPSILON * hi.abs().max(1.0) {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - 0.05 * span, hi + 0.05 * span)
}

/// Builds the figure for a finished comparison.
///
/// In deviation mode each series shows `traced - reference` and the y range
/// fits the data; otherwise the traced values are drawn against the
/// configured y range.
pub fn build_plot<R>(
    comparison: &Comparison,
    reference: Option<&R>,
    settings: &Settings,
    delta: bool,
) -> Plot
where
    R: ReferenceSolution<f64> + ?Sized,
{
    let [x_min, x_max] = settings.x_range;
    let mut series = Vec::new();
    let mut labelled: Vec<Method> = Vec::new();

    for run in &comparison.runs {
        let Ok(output) = &run.output else {
            continue;
        };
        let points = match (delta, reference) {
            (true, Some(reference)) => samples(&output.trajectory.points, reference)
                .into_iter()
                .map(|s| (s.x, s.signed))
                .collect(),
            _ => output
                .trajectory
                .points
                .iter()
                .map(|p| (p.x, p.y))
                .collect(),
        };
        let label = if labelled.contains(&run.method) {
            None
        } else {
            labelled.push(run.method);
            Some(legend_label(run.method, comparison))
        };
        series.push(Series {
            method: run.method,
            label,
            points,
        });
    }

    let title = format!(
        "[{:.3}; {:.3}] range with {:.6} precision",
        x_min, x_max, comparison.step
    );

    if delta {
        let y_range = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));
        Plot {
            title: format!("{title}, deviation from true value"),
            x_range: (x_min, x_max),
            y_range,
            y_desc: "y - y_true",
            reference: reference.map(|_| vec![(x_min, 0.0), (x_max, 0.0)]),
            series,
        }
    } else {
        Plot {
            title,
            x_range: (x_min, x_max),
            y_range: (settings.y_range[0], settings.y_range[1]),
            y_desc: "y",
            reference: reference.map(|r| reference_curve(r, x_min, x_max)),
            series,
        }
    }
}

fn plot_error<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("plotting failed: {err}")
}

/// Keeps diverging values within a few chart heights so the line still
/// leaves the frame without producing absurd pixel coordinates.
fn clamp_to_view(points: &[(f64, f64)], y_range: (f64, f64)) -> Vec<(f64, f64)> {
    let span = (y_range.1 - y_range.0).abs().max(f64::EPSILON);
    let (lo, hi) = (y_range.0 - 10.0 * span, y_range.1 + 10.0 * span);
    points.iter().map(|&(x, y)| (x, y.clamp(lo, hi))).collect()
}

fn draw_on<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, plot: &Plot) -> Result<()> {
    root.fill(&WHITE).map_err(plot_error)?;

    let (x0, x1) = plot.x_range;
    let x1 = if x1 > x0 { x1 } else { x0 + 1.0 };
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, plot.y_range.0..plot.y_range.1)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc(plot.y_desc)
        .draw()
        .map_err(plot_error)?;

    if let Some(curve) = &plot.reference {
        chart
            .draw_series(DashedLineSeries::new(
                curve.iter().copied(),
                4,
                6,
                GREEN.stroke_width(3),
            ))
            .map_err(plot_error)?
            .label("true value")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.stroke_width(3)));
    }

    for series in &plot.series {
        let index = Method::ALL
            .iter()
            .position(|m| *m == series.method)
            .unwrap_or(0);
        let color = Palette99::pick(index).to_rgba();
        let drawn = chart
            .draw_series(LineSeries::new(
                clamp_to_view(&series.points, plot.y_range),
                color.stroke_width(2),
            ))
            .map_err(plot_error)?;
        if let Some(label) = &series.label {
            drawn
                .label(label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Writes `plot` to `out`; `.svg` selects the vector backend, anything else
/// goes through the bitmap backend.
pub fn draw(plot: &Plot, out: &Path) -> Result<()> {
    let is_svg = out
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        draw_on(SVGBackend::new(out, FIGURE_SIZE).into_drawing_area(), plot)?;
    } else {
        draw_on(BitMapBackend::new(out, FIGURE_SIZE).into_drawing_area(), plot)?;
    }
    info!("wrote {}", out.display());
    Ok(())
}

/// Runs the comparison described by `settings` and draws it to `out`.
pub fn render(settings: &Settings, step: f64, delta: bool, out: &Path) -> Result<Comparison> {
    let field = settings.field()?;
    let reference = settings.reference()?;
    let config = settings.comparison(step)?;
    let comparison = run_comparison(&field, reference.as_ref(), &config)?;
    let plot = build_plot(&comparison, reference.as_ref(), settings, delta);
    draw(&plot, out)?;
    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(x: f64) -> f64 {
        1.0 / (x * x + 1.0).sqrt()
    }

    fn comparison(settings: &Settings, step: f64) -> Comparison {
        let field = settings.field().expect("field");
        let reference = settings.reference().expect("reference");
        run_comparison(&field, reference.as_ref(), &settings.comparison(step).expect("config"))
            .expect("comparison")
    }

    #[test]
    fn reference_curve_samples_half_open_range() {
        let curve = reference_curve(&solution, 0.0, 8.0);
        assert_eq!(curve.len(), 666);
        assert_eq!(curve[0], (0.0, 1.0));
        assert!(curve[665].0 < 8.0);
        assert!(reference_curve(&solution, 1.0, 1.0).is_empty());
    }

    #[test]
    fn plot_labels_each_method_once() {
        let settings = Settings {
            x_range: [-8.0, 8.0],
            ..Settings::default()
        };
        let comparison = comparison(&settings, 0.1);
        let plot = build_plot(&comparison, Some(&solution), &settings, false);

        assert_eq!(plot.title, "[-8.000; 8.000] range with 0.100000 precision");
        assert_eq!(plot.series.len(), 6);
        let labelled = plot.series.iter().filter(|s| s.label.is_some()).count();
        assert_eq!(labelled, 3);
        let euler_label = plot.series[0].label.as_deref().expect("euler label");
        assert!(euler_label.starts_with("euler (abs "));
        assert_eq!(plot.reference.as_ref().map(Vec::len), Some(666));
        assert_eq!(plot.y_range, (-0.1, 2.0));
    }

    #[test]
    fn delta_plot_shows_signed_deviation() {
        let settings = Settings {
            x_range: [0.0, 2.0],
            methods: vec![Method::RungeKutta4],
            ..Settings::default()
        };
        let comparison = comparison(&settings, 0.5);
        let plot = build_plot(&comparison, Some(&solution), &settings, true);

        assert!(plot.title.ends_with("deviation from true value"));
        let series = &plot.series[0];
        assert_eq!(series.points[0], (0.0, 0.0));
        assert!(series.points.iter().all(|p| p.1.abs() < 0.1));
        assert!(plot.y_range.0 <= plot.y_range.1);
        assert_eq!(plot.reference, Some(vec![(0.0, 0.0), (2.0, 0.0)]));
    }

    #[test]
    fn padded_range_handles_flat_and_empty_data() {
        assert_eq!(padded_range([2.0, 2.0].into_iter()), (1.0, 3.0));
        assert_eq!(padded_range([f64::NAN].into_iter()), (-1.0, 1.0));
        let (lo, hi) = padded_range([0.0, 10.0].into_iter());
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn clamp_keeps_x_and_bounds_y() {
        let clamped = clamp_to_view(&[(1.0, 1e300), (2.0, 0.5)], (0.0, 1.0));
        assert_eq!(clamped, vec![(1.0, 11.0), (2.0, 0.5)]);
    }
}
