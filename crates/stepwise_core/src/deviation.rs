//! Scores traced points against a closed-form reference solution.

use crate::error::TraceError;
use crate::point::Point;
use crate::traits::ReferenceSolution;
use serde::{Deserialize, Serialize};

/// Deviation of a single traced point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleDeviation {
    pub x: f64,
    /// `traced - reference`.
    pub signed: f64,
    pub absolute: f64,
    /// `None` where the reference value is exactly zero.
    pub relative: Option<f64>,
}

/// Worst-case relative deviation, or the samples where it is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelativeDeviation {
    Defined { value: f64 },
    Undefined { at: Vec<f64> },
}

/// Worst-case deviation over a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub absolute: f64,
    pub relative: RelativeDeviation,
}

impl Deviation {
    /// The worst relative deviation, or `UndefinedRelativeDeviation` listing
    /// every x where the reference vanished.
    pub fn relative(&self) -> Result<f64, TraceError> {
        match &self.relative {
            RelativeDeviation::Defined { value } => Ok(*value),
            RelativeDeviation::Undefined { at } => {
                Err(TraceError::UndefinedRelativeDeviation { at: at.clone() })
            }
        }
    }
}

/// Per-point deviations, in trajectory order.
pub fn samples<R>(points: &[Point], reference: &R) -> Vec<SampleDeviation>
where
    R: ReferenceSolution<f64> + ?Sized,
{
    points
        .iter()
        .map(|p| {
            let expected = reference.value(p.x);
            let signed = p.y - expected;
            let absolute = signed.abs();
            let relative = if expected == 0.0 {
                None
            } else {
                Some(absolute / expected.abs())
            };
            SampleDeviation {
                x: p.x,
                signed,
                absolute,
                relative,
            }
        })
        .collect()
}

/// Maximum that keeps NaN instead of skipping it.
fn worst(acc: f64, value: f64) -> f64 {
    if value.is_nan() || value > acc {
        value
    } else {
        acc
    }
}

/// Worst absolute and relative deviation of `points` from `reference`.
///
/// Fails with `NonFiniteReference` when the reference is NaN or infinite at
/// any sampled x. A non-finite traced value makes the maxima non-finite too.
pub fn deviation<R>(points: &[Point], reference: &R) -> Result<Deviation, TraceError>
where
    R: ReferenceSolution<f64> + ?Sized,
{
    if points.is_empty() {
        return Err(TraceError::EmptyTrajectory);
    }

    let non_finite: Vec<f64> = points
        .iter()
        .filter(|p| !reference.value(p.x).is_finite())
        .map(|p| p.x)
        .collect();
    if !non_finite.is_empty() {
        return Err(TraceError::NonFiniteReference { at: non_finite });
    }

    let per_point = samples(points, reference);
    let absolute = per_point.iter().map(|s| s.absolute).fold(0.0_f64, worst);

    let undefined: Vec<f64> = per_point
        .iter()
        .filter(|s| s.relative.is_none())
        .map(|s| s.x)
        .collect();

    let relative = if undefined.is_empty() {
        RelativeDeviation::Defined {
            value: per_point
                .iter()
                .filter_map(|s| s.relative)
                .fold(0.0_f64, worst),
        }
    } else {
        RelativeDeviation::Undefined { at: undefined }
    };

    Ok(Deviation { absolute, relative })
}
