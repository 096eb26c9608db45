use crate::error::TraceError;
use crate::point::Point;
use serde::{Deserialize, Serialize};

/// Closed interval `[min, max]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    min: f64,
    max: f64,
}

impl Interval {
    /// Builds an interval, rejecting NaN, infinite or inverted bounds.
    /// `min == max` is accepted.
    pub fn new(min: f64, max: f64) -> Result<Self, TraceError> {
        Self::on_axis('x', min, max)
    }

    pub(crate) fn on_axis(axis: char, min: f64, max: f64) -> Result<Self, TraceError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(TraceError::MalformedRange { axis, min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bounding region used as the continuation predicate of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegion")]
pub struct Region {
    pub x: Interval,
    pub y: Option<Interval>,
}

#[derive(Deserialize)]
struct RawInterval {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawRegion {
    x: RawInterval,
    #[serde(default)]
    y: Option<RawInterval>,
}

impl TryFrom<RawRegion> for Region {
    type Error = TraceError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        let region = Region::new(raw.x.min, raw.x.max)?;
        match raw.y {
            Some(y) => region.with_y(y.min, y.max),
            None => Ok(region),
        }
    }
}

impl Region {
    /// Region bounded only along the independent variable.
    pub fn new(x_min: f64, x_max: f64) -> Result<Self, TraceError> {
        Ok(Self {
            x: Interval::on_axis('x', x_min, x_max)?,
            y: None,
        })
    }

    /// Adds bounds on the dependent variable.
    pub fn with_y(mut self, y_min: f64, y_max: f64) -> Result<Self, TraceError> {
        self.y = Some(Interval::on_axis('y', y_min, y_max)?);
        Ok(self)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.x.contains(point.x) && self.y.map_or(true, |y| y.contains(point.y))
    }

    /// The region as a predicate closure.
    pub fn predicate(self) -> impl Fn(Point) -> bool + Copy {
        move |point| self.contains(point)
    }
}
