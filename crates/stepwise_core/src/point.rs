use crate::traits::Scalar;
use serde::{Deserialize, Serialize};

/// A point on the (x, y) plane: independent variable and state value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<T = f64> {
    pub x: T,
    pub y: T,
}

impl<T: Scalar> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns a new point shifted by (dx, dy).
    pub fn offset(self, dx: T, dy: T) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[cfg(test)]
mod tests {
    use super::Point;

    #[test]
    fn offset_leaves_original_untouched() {
        let p = Point::new(1.0, 2.0);
        let q = p.offset(0.5, -1.0);
        assert_eq!(p, Point::new(1.0, 2.0));
        assert_eq!(q, Point::new(1.5, 1.0));
    }

    #[test]
    fn is_finite_checks_both_coordinates() {
        assert!(Point::new(0.0, 1.0).is_finite());
        assert!(!Point::new(f64::NAN, 1.0).is_finite());
        assert!(!Point::new(0.0, f64::INFINITY).is_finite());
    }
}
