//! Trajectory engine: drives a stepper from an initial point until the
//! continuation predicate fails or the state becomes non-finite.

use crate::error::TraceError;
use crate::point::Point;
use crate::traits::{Scalar, VectorField};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Bounds on a single trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLimits {
    pub max_steps: usize,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
        }
    }
}

/// Why a trace stopped advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The predicate rejected the current point.
    LeftRegion,
    /// The stepper produced a non-finite point.
    Diverged,
    /// A step did not change x (distance below floating-point resolution).
    Stalled,
    /// `TraceLimits::max_steps` was reached.
    StepLimit,
}

/// Traversal direction along the independent variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Signed step of the given magnitude.
    pub fn signed<T: Scalar>(self, step: T) -> T {
        match self {
            Direction::Forward => step.abs(),
            Direction::Backward => -step.abs(),
        }
    }
}

/// Ordered points visited by a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory<T = f64> {
    pub points: Vec<Point<T>>,
    pub termination: Termination,
}

impl<T: Scalar> Trajectory<T> {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A trace in progress, advanced a bounded number of steps at a time.
///
/// [`trace`] runs one to completion; front ends that draw while integrating
/// drive it in batches instead.
#[derive(Debug, Clone)]
pub struct Tracer<T = f64> {
    current: Point<T>,
    distance: T,
    limits: TraceLimits,
    steps: usize,
    points: Vec<Point<T>>,
    termination: Option<Termination>,
}

impl<T: Scalar> Tracer<T> {
    pub fn new(initial: Point<T>, distance: T, limits: TraceLimits) -> Result<Self, TraceError> {
        if distance.is_zero() || !distance.is_finite() {
            return Err(TraceError::InvalidStep(distance.to_f64().unwrap_or(f64::NAN)));
        }
        Ok(Self {
            current: initial,
            distance,
            limits,
            steps: 0,
            points: Vec::new(),
            termination: None,
        })
    }

    pub fn points(&self) -> &[Point<T>] {
        &self.points
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_done(&self) -> bool {
        self.termination.is_some()
    }

    /// Performs at most `batch` steps. Returns the termination once reached;
    /// further calls are no-ops.
    pub fn advance<F, S, P>(
        &mut self,
        stepper: S,
        field: &F,
        predicate: P,
        batch: usize,
    ) -> Option<Termination>
    where
        F: VectorField<T> + ?Sized,
        S: Fn(&F, Point<T>, T) -> Point<T>,
        P: Fn(Point<T>) -> bool,
    {
        for _ in 0..batch {
            if self.termination.is_some() {
                break;
            }
            if !self.current.is_finite() {
                self.finish(Termination::Diverged);
                break;
            }
            if !predicate(self.current) {
                self.finish(Termination::LeftRegion);
                break;
            }
            if self.steps >= self.limits.max_steps {
                self.finish(Termination::StepLimit);
                break;
            }

            self.points.push(self.current);
            let next = stepper(field, self.current, self.distance);
            self.steps += 1;

            if next.x == self.current.x {
                self.finish(Termination::Stalled);
                break;
            }
            self.current = next;
        }
        self.termination
    }

    fn finish(&mut self, termination: Termination) {
        match termination {
            Termination::LeftRegion | Termination::StepLimit => self.points.push(self.current),
            Termination::Diverged | Termination::Stalled => {}
        }

        let steps = self.steps;
        match termination {
            Termination::LeftRegion => {
                debug!("trace left region after {steps} steps ({} points)", self.points.len())
            }
            Termination::Diverged => warn!("trace diverged after {steps} steps"),
            Termination::Stalled => {
                warn!("trace stalled after {steps} steps: step too small to advance x")
            }
            Termination::StepLimit => warn!("trace hit the step limit of {}", self.limits.max_steps),
        }
        self.termination = Some(termination);
    }
}

/// Repeatedly applies `stepper` from `initial`.
///
/// While the current point is finite and `predicate` accepts it, the point is
/// recorded and advanced by `distance`. The point that ends the loop is
/// appended once more when it is finite, so the result reaches just past the
/// region boundary. This also holds when the very first point is rejected:
/// the result is then `[initial]`. Non-finite points are never recorded.
pub fn trace<T, F, S, P>(
    stepper: S,
    field: &F,
    initial: Point<T>,
    predicate: P,
    distance: T,
    limits: TraceLimits,
) -> Result<Trajectory<T>, TraceError>
where
    T: Scalar,
    F: VectorField<T> + ?Sized,
    S: Fn(&F, Point<T>, T) -> Point<T>,
    P: Fn(Point<T>) -> bool,
{
    let mut tracer = Tracer::new(initial, distance, limits)?;
    let termination = loop {
        if let Some(termination) = tracer.advance(&stepper, field, &predicate, usize::MAX) {
            break termination;
        }
    };
    Ok(Trajectory {
        points: tracer.points,
        termination,
    })
}

/// Traces forward with `distance` and backward with `-distance` from the same
/// initial point. Returns `(forward, backward)`.
pub fn trace_both<T, F, S, P>(
    stepper: S,
    field: &F,
    initial: Point<T>,
    predicate: P,
    distance: T,
    limits: TraceLimits,
) -> Result<(Trajectory<T>, Trajectory<T>), TraceError>
where
    T: Scalar,
    F: VectorField<T> + ?Sized,
    S: Fn(&F, Point<T>, T) -> Point<T>,
    P: Fn(Point<T>) -> bool,
{
    let forward = trace(&stepper, field, initial, &predicate, distance, limits)?;
    let backward = trace(&stepper, field, initial, &predicate, -distance, limits)?;
    Ok((forward, backward))
}
