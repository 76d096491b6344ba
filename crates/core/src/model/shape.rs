use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Point, ShapeName};

/// Minimum number of target points for a traceable shape.
pub const MIN_SHAPE_POINTS: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShapeError {
    #[error("shape '{name}' has {len} points, needs at least {MIN_SHAPE_POINTS}")]
    TooFewPoints { name: ShapeName, len: usize },
}

/// An ordered sequence of target points a user must reach in order.
///
/// Shapes are immutable after construction and shared read-only between all
/// sessions tracing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    name: ShapeName,
    points: Vec<Point>,
}

impl Shape {
    /// Build a shape from its ordered target points.
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::TooFewPoints` if fewer than two points are given.
    pub fn new(name: ShapeName, points: Vec<Point>) -> Result<Self, ShapeError> {
        if points.len() < MIN_SHAPE_POINTS {
            return Err(ShapeError::TooFewPoints {
                name,
                len: points.len(),
            });
        }
        Ok(Self { name, points })
    }

    #[must_use]
    pub fn name(&self) -> &ShapeName {
        &self.name
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of target points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The target at the given position, if any.
    #[must_use]
    pub fn target(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ShapeName {
        ShapeName::new(s).unwrap()
    }

    #[test]
    fn shape_requires_two_points() {
        let err = Shape::new(name("dot"), vec![Point::new(1, 1)]).unwrap_err();
        assert!(matches!(err, ShapeError::TooFewPoints { len: 1, .. }));
    }

    #[test]
    fn shape_preserves_point_order() {
        let points = vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)];
        let shape = Shape::new(name("corner"), points.clone()).unwrap();
        assert_eq!(shape.points(), points.as_slice());
        assert_eq!(shape.len(), 3);
        assert_eq!(shape.target(2), Some(Point::new(10, 10)));
        assert_eq!(shape.target(3), None);
    }
}
