pub mod comparison;
pub mod deviation;
pub mod equation_engine;
pub mod error;
pub mod point;
pub mod region;
pub mod solvers;
pub mod trajectory;
/// The `stepwise_core` crate traces solution curves of a scalar ODE
/// dy/dx = f(x, y) with fixed-step explicit integrators and scores them
/// against a closed-form reference.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `VectorField` (the ODE right-hand side),
///   `ReferenceSolution` (analytic y(x)).
/// - **Solvers**: Euler, Heun, RK4, RK4 3/8-rule and a six-stage RK5, plus the `Method` enumeration.
/// - **Trajectory**: drives a stepper through a bounding `Region` in either direction.
/// - **Deviation**: worst-case absolute and relative error against the reference.
/// - **Equation Engine**: parses text expressions into fields and reference solutions.
/// - **Comparison**: runs every selected method/direction pair in parallel.
pub mod traits;

pub use error::{ExpressionError, TraceError};
pub use point::Point;
