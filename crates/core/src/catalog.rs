use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{Point, Shape, ShapeError, ShapeName};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("unknown shape: {0}")]
    UnknownShape(ShapeName),
    #[error("duplicate shape name: {0}")]
    DuplicateShape(ShapeName),
    #[error("catalog must contain at least one shape")]
    Empty,
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Static registry of named shapes, loaded once at process start and shared
/// read-only by every session.
///
/// Names are kept in sorted order so that iteration (and random selection
/// over `names()` with a seeded rng) is deterministic.
#[derive(Debug, Clone)]
pub struct ShapeCatalog {
    shapes: HashMap<ShapeName, Arc<Shape>>,
    names: Vec<ShapeName>,
}

impl ShapeCatalog {
    /// Build a catalog from a list of shapes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Empty` for an empty list and
    /// `CatalogError::DuplicateShape` if two shapes share a name.
    pub fn from_shapes(shapes: Vec<Shape>) -> Result<Self, CatalogError> {
        if shapes.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut map = HashMap::with_capacity(shapes.len());
        let mut names = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let name = shape.name().clone();
            if map.insert(name.clone(), Arc::new(shape)).is_some() {
                return Err(CatalogError::DuplicateShape(name));
            }
            names.push(name);
        }
        names.sort();

        Ok(Self { shapes: map, names })
    }

    /// The shipped shape set, drawn in a 640x480 frame.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in definitions are malformed, which is a
    /// programming error caught by tests.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_shapes(builtin_shapes().expect("built-in shapes should be valid"))
            .expect("built-in catalog should be valid")
    }

    /// Look up a shape by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownShape` if the name is not registered.
    pub fn get(&self, name: &ShapeName) -> Result<Arc<Shape>, CatalogError> {
        self.shapes
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownShape(name.clone()))
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> &[ShapeName] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn builtin_shapes() -> Result<Vec<Shape>, CatalogError> {
    fn shape(name: &str, points: &[(i32, i32)]) -> Result<Shape, CatalogError> {
        let name = ShapeName::new(name).expect("built-in names are non-empty");
        let points = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Ok(Shape::new(name, points)?)
    }

    Ok(vec![
        shape("square", &[(200, 120), (440, 120), (440, 360), (200, 360)])?,
        shape("triangle", &[(320, 100), (520, 380), (120, 380)])?,
        shape("diamond", &[(320, 80), (500, 240), (320, 400), (140, 240)])?,
        // five-stroke star order: the pen crosses itself, targets do not repeat
        shape(
            "star",
            &[(320, 80), (440, 400), (120, 200), (520, 200), (200, 400)],
        )?,
        shape(
            "zigzag",
            &[(120, 140), (220, 340), (320, 140), (420, 340), (520, 140)],
        )?,
    ])
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ShapeName {
        ShapeName::new(s).unwrap()
    }

    #[test]
    fn builtin_catalog_has_all_shapes() {
        let catalog = ShapeCatalog::builtin();
        assert_eq!(catalog.len(), 5);
        for n in ["diamond", "square", "star", "triangle", "zigzag"] {
            assert!(catalog.get(&name(n)).is_ok(), "missing {n}");
        }
    }

    #[test]
    fn names_are_sorted() {
        let catalog = ShapeCatalog::builtin();
        let names: Vec<&str> = catalog.names().iter().map(ShapeName::as_str).collect();
        assert_eq!(names, ["diamond", "square", "star", "triangle", "zigzag"]);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let catalog = ShapeCatalog::builtin();
        let err = catalog.get(&name("hexagon")).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownShape(n) if n.as_str() == "hexagon"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let a = Shape::new(name("dup"), vec![Point::new(0, 0), Point::new(1, 1)]).unwrap();
        let b = Shape::new(name("dup"), vec![Point::new(2, 2), Point::new(3, 3)]).unwrap();
        let err = ShapeCatalog::from_shapes(vec![a, b]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateShape(n) if n.as_str() == "dup"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(
            ShapeCatalog::from_shapes(Vec::new()),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn builtin_points_fit_the_frame() {
        let catalog = ShapeCatalog::builtin();
        for n in catalog.names() {
            let shape = catalog.get(n).unwrap();
            for p in shape.points() {
                assert!((0..640).contains(&p.x), "{n}: x out of frame: {p}");
                assert!((0..480).contains(&p.y), "{n}: y out of frame: {p}");
            }
        }
    }
}
