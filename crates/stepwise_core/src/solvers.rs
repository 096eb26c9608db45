//! Fixed-step explicit integrators for a scalar ODE dy/dx = f(x, y).
//!
//! Every stepper is a pure function `(field, point, distance) -> point`. The
//! returned point always has `x = point.x + distance`; direction is carried
//! entirely by the sign of `distance`. Non-finite slopes are not trapped here,
//! they propagate into the returned point.

use crate::error::TraceError;
use crate::point::Point;
use crate::traits::{Scalar, VectorField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature shared by all steppers.
pub type Stepper<F, T = f64> = fn(&F, Point<T>, T) -> Point<T>;

/// Explicit Euler: one stage, first order.
pub fn euler<T: Scalar, F: VectorField<T> + ?Sized>(
    field: &F,
    point: Point<T>,
    dist: T,
) -> Point<T> {
    point.offset(dist, field.slope(point) * dist)
}

/// Heun's method: slope at the point averaged with the slope at the Euler
/// predicted endpoint.
pub fn heun<T: Scalar, F: VectorField<T> + ?Sized>(
    field: &F,
    point: Point<T>,
    dist: T,
) -> Point<T> {
    let half = T::lit(0.5);

    let fr = field.slope(point);
    let predicted = dist * fr;
    let fe = field.slope(point.offset(dist, predicted));

    point.offset(dist, half * dist * (fr + fe))
}

/// Classical Runge-Kutta 4th order, weights 1-2-2-1 over 6.
pub fn runge_kutta_4<T: Scalar, F: VectorField<T> + ?Sized>(
    field: &F,
    point: Point<T>,
    dist: T,
) -> Point<T> {
    let half_dist = dist * T::lit(1.0 / 2.0);
    let sixth = T::lit(1.0 / 6.0);

    let k1 = field.slope(point);
    let k2 = field.slope(point.offset(half_dist, half_dist * k1));
    let k3 = field.slope(point.offset(half_dist, half_dist * k2));
    let k4 = field.slope(point.offset(dist, dist * k3));

    point.offset(dist, dist * (k1 + k2 + k2 + k3 + k3 + k4) * sixth)
}

/// Runge-Kutta 3/8 rule: stages at 1/3, 2/3 and the full step, weights 1-3-3-1 over 8.
pub fn runge_kutta_4_38<T: Scalar, F: VectorField<T> + ?Sized>(
    field: &F,
    point: Point<T>,
    dist: T,
) -> Point<T> {
    let third_dist = dist * T::lit(1.0 / 3.0);
    let three = T::lit(3.0);
    let eighth = T::lit(1.0 / 8.0);

    let k1 = field.slope(point);
    let k2 = field.slope(point.offset(third_dist, third_dist * k1));
    let k3 = field.slope(point.offset(third_dist + third_dist, -third_dist * k1 + dist * k2));
    let k4 = field.slope(point.offset(dist, dist * (k1 - k2 + k3)));

    point.offset(dist, dist * (k1 + k2 * three + k3 * three + k4) * eighth)
}

/// Stage rows of the fifth-order tableau: (offset c_i, coefficients a_ij).
const RK5_STAGES: [(f64, &[f64]); 5] = [
    (1.0 / 3.0, &[1.0 / 3.0]),
    (2.0 / 5.0, &[4.0 / 25.0, 6.0 / 25.0]),
    (1.0, &[1.0 / 4.0, -3.0, 15.0 / 4.0]),
    (2.0 / 3.0, &[2.0 / 27.0, 10.0 / 9.0, -50.0 / 81.0, 8.0 / 81.0]),
    (4.0 / 5.0, &[2.0 / 25.0, 12.0 / 25.0, 2.0 / 15.0, 8.0 / 75.0]),
];

/// Final weights for stages 0, 2, 4 and 5. Stages 1 and 3 carry zero weight.
const RK5_WEIGHTS: [(usize, f64); 4] = [
    (0, 23.0 / 192.0),
    (2, 125.0 / 192.0),
    (4, -27.0 / 64.0),
    (5, 125.0 / 192.0),
];

/// Six-stage fifth-order Runge-Kutta.
pub fn runge_kutta_5<T: Scalar, F: VectorField<T> + ?Sized>(
    field: &F,
    point: Point<T>,
    dist: T,
) -> Point<T> {
    let mut ks = [T::zero(); RK5_STAGES.len() + 1];
    ks[0] = field.slope(point);

    for (stage, (offset, coeffs)) in RK5_STAGES.iter().enumerate() {
        let combined = ks
            .iter()
            .zip(coeffs.iter())
            .fold(T::zero(), |acc, (&k, &c)| acc + k * T::lit(c));
        let at = point.offset(T::lit(*offset) * dist, combined * dist);
        ks[stage + 1] = field.slope(at);
    }

    let increment = RK5_WEIGHTS
        .iter()
        .fold(T::zero(), |acc, &(stage, w)| acc + ks[stage] * T::lit(w));

    point.offset(dist, increment * dist)
}

/// The closed set of available steppers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "euler")]
    Euler,
    #[serde(rename = "heun")]
    Heun,
    #[serde(rename = "runge_kutta_4")]
    RungeKutta4,
    #[serde(rename = "runge_kutta_4_38")]
    RungeKutta38,
    #[serde(rename = "runge_kutta_5")]
    RungeKutta5,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Euler,
        Method::Heun,
        Method::RungeKutta4,
        Method::RungeKutta38,
        Method::RungeKutta5,
    ];

    /// Stable identifier.
    pub fn name(self) -> &'static str {
        match self {
            Method::Euler => "euler",
            Method::Heun => "heun",
            Method::RungeKutta4 => "runge_kutta_4",
            Method::RungeKutta38 => "runge_kutta_4_38",
            Method::RungeKutta5 => "runge_kutta_5",
        }
    }

    /// Human-readable label used in legends and tables.
    pub fn label(self) -> &'static str {
        match self {
            Method::Euler => "euler",
            Method::Heun => "heun",
            Method::RungeKutta4 => "runge kutta 4",
            Method::RungeKutta38 => "runge kutta 4 38",
            Method::RungeKutta5 => "runge kutta 5",
        }
    }

    /// Field evaluations per step.
    pub fn stages(self) -> usize {
        match self {
            Method::Euler => 1,
            Method::Heun => 2,
            Method::RungeKutta4 | Method::RungeKutta38 => 4,
            Method::RungeKutta5 => 6,
        }
    }

    /// Order of global accuracy.
    pub fn order(self) -> usize {
        match self {
            Method::Euler => 1,
            Method::Heun => 2,
            Method::RungeKutta4 | Method::RungeKutta38 => 4,
            Method::RungeKutta5 => 5,
        }
    }

    /// Resolves the variant to its step function.
    pub fn stepper<T: Scalar, F: VectorField<T> + ?Sized>(self) -> Stepper<F, T> {
        match self {
            Method::Euler => euler::<T, F>,
            Method::Heun => heun::<T, F>,
            Method::RungeKutta4 => runge_kutta_4::<T, F>,
            Method::RungeKutta38 => runge_kutta_4_38::<T, F>,
            Method::RungeKutta5 => runge_kutta_5::<T, F>,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = TraceError;

    /// Accepts the snake-case name as well as space separated labels
    /// such as "runge kutta 4".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .to_ascii_lowercase();

        Method::ALL
            .into_iter()
            .find(|method| method.name() == normalized)
            .ok_or_else(|| TraceError::UnknownMethod(s.to_string()))
    }
}
