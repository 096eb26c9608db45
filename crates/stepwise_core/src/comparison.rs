//! Runs several steppers over the same initial value problem and scores them.
//!
//! All settings arrive through [`ComparisonConfig`]; nothing here reads
//! process-wide state.

use crate::deviation::{deviation, Deviation};
use crate::error::TraceError;
use crate::point::Point;
use crate::region::Region;
use crate::solvers::Method;
use crate::traits::{ReferenceSolution, VectorField};
use crate::trajectory::{trace, Direction, TraceLimits, Trajectory};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub initial: Point,
    /// Step magnitude; its sign is ignored, direction comes from the region.
    pub step: f64,
    pub region: Region,
    pub methods: Vec<Method>,
    #[serde(default)]
    pub limits: TraceLimits,
}

impl ComparisonConfig {
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.step == 0.0 || !self.step.is_finite() {
            return Err(TraceError::InvalidStep(self.step));
        }
        if !self.initial.is_finite() {
            return Err(TraceError::NonFiniteInitial {
                x: self.initial.x,
                y: self.initial.y,
            });
        }
        if self.methods.is_empty() {
            return Err(TraceError::EmptyMethodList);
        }
        Ok(())
    }

    /// Branches that reach into the region from the initial point: forward
    /// when the region extends right of it, backward when it extends left.
    pub fn directions(&self) -> Vec<Direction> {
        let mut directions = Vec::with_capacity(2);
        if self.region.x.max() > self.initial.x {
            directions.push(Direction::Forward);
        }
        if self.region.x.min() < self.initial.x {
            directions.push(Direction::Backward);
        }
        directions
    }
}

/// A traced branch and, when a reference was supplied, its deviation or the
/// reason it could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub trajectory: Trajectory,
    pub deviation: Option<Result<Deviation, TraceError>>,
}

/// Outcome of one (method, direction) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub method: Method,
    pub direction: Direction,
    pub output: Result<RunOutput, TraceError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub step: f64,
    pub runs: Vec<Run>,
}

impl Comparison {
    pub fn run(&self, method: Method, direction: Direction) -> Option<&Run> {
        self.runs
            .iter()
            .find(|run| run.method == method && run.direction == direction)
    }
}

/// Traces every selected method in every applicable direction.
///
/// Configuration errors are returned up front. Each pair is then evaluated
/// independently, in parallel, and keeps its own result.
pub fn run_comparison<F, R>(
    field: &F,
    reference: Option<&R>,
    config: &ComparisonConfig,
) -> Result<Comparison, TraceError>
where
    F: VectorField<f64> + Sync + ?Sized,
    R: ReferenceSolution<f64> + Sync + ?Sized,
{
    config.validate()?;

    let mut methods: Vec<Method> = Vec::with_capacity(config.methods.len());
    for method in &config.methods {
        if !methods.contains(method) {
            methods.push(*method);
        }
    }
    let directions = config.directions();
    if directions.is_empty() {
        warn!(
            "region [{}; {}] does not extend beyond x0 = {}; nothing to trace",
            config.region.x.min(),
            config.region.x.max(),
            config.initial.x
        );
    }

    let jobs: Vec<(Method, Direction)> = methods
        .iter()
        .flat_map(|&method| directions.iter().map(move |&direction| (method, direction)))
        .collect();

    info!(
        "tracing {} runs with step {} from ({}, {})",
        jobs.len(),
        config.step.abs(),
        config.initial.x,
        config.initial.y
    );

    let predicate = config.region.predicate();
    let runs = jobs
        .into_par_iter()
        .map(|(method, direction)| {
            let output = trace(
                method.stepper::<f64, F>(),
                field,
                config.initial,
                predicate,
                direction.signed(config.step),
                config.limits,
            )
            .map(|trajectory| {
                let deviation = reference.map(|r| deviation(&trajectory.points, r));
                if let Some(Err(err)) = &deviation {
                    warn!("{method} {direction:?}: deviation unavailable: {err}");
                }
                debug!(
                    "{} {:?}: {} points, {:?}",
                    method,
                    direction,
                    trajectory.len(),
                    trajectory.termination
                );
                RunOutput {
                    trajectory,
                    deviation,
                }
            });
            Run {
                method,
                direction,
                output,
            }
        })
        .collect();

    Ok(Comparison {
        step: config.step.abs(),
        runs,
    })
}
