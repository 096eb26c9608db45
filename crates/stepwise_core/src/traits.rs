use crate::point::Point;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the steppers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + Send + Sync + 'static {
    /// Converts an `f64` literal (typically a tableau coefficient).
    /// A value the type cannot represent becomes NaN, which the trajectory
    /// engine then treats as divergence.
    fn lit(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::nan)
    }
}

impl<T: Float + FromPrimitive + Debug + Send + Sync + 'static> Scalar for T {}

/// Right-hand side of a scalar ODE dy/dx = f(x, y).
///
/// Implementations must be pure: the same point always yields the same slope.
/// Non-finite results are allowed and propagate into the stepped point.
pub trait VectorField<T: Scalar> {
    fn slope(&self, point: Point<T>) -> T;
}

impl<T: Scalar, F> VectorField<T> for F
where
    F: Fn(Point<T>) -> T,
{
    fn slope(&self, point: Point<T>) -> T {
        self(point)
    }
}

/// Closed-form solution y(x) used to score traced curves.
pub trait ReferenceSolution<T: Scalar> {
    fn value(&self, x: T) -> T;
}

impl<T: Scalar, F> ReferenceSolution<T> for F
where
    F: Fn(T) -> T,
{
    fn value(&self, x: T) -> T {
        self(x)
    }
}
