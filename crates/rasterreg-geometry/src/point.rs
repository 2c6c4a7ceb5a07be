use rasterreg_image::ImageSize;

use crate::error::GeometryError;

/// Minimum number of control point pairs required to estimate a homography.
pub const MIN_PAIRS: usize = 4;

/// Fractional offset from the image border used for the default point layout.
const DEFAULT_OFFSET: f64 = 0.3;

/// A 2d point in source image pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2D {
    /// Horizontal coordinate in pixels.
    pub x: f64,
    /// Vertical coordinate in pixels.
    pub y: f64,
}

impl Point2D {
    /// Create a new point from its coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Which image of a correspondence a point belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointSide {
    /// The fixed reference image.
    Reference,
    /// The image being registered onto the reference.
    Moving,
}

impl std::fmt::Display for PointSide {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PointSide::Reference => write!(f, "reference"),
            PointSide::Moving => write!(f, "moving"),
        }
    }
}

/// A pair of corresponding points between the reference and the moving image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlPointPair {
    /// The point in the reference image.
    pub reference: Point2D,
    /// The corresponding point in the moving image.
    pub moving: Point2D,
}

impl ControlPointPair {
    /// Create a new pair from its two points.
    pub fn new(reference: Point2D, moving: Point2D) -> Self {
        Self { reference, moving }
    }
}

/// An ordered set of control point pairs.
///
/// The order is meaningful for display and serialization only; the homography
/// estimation is invariant to it. Pairs are addressed with 0-based indices in
/// the API and numbered 1..N in user-facing output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlPointSet {
    pairs: Vec<ControlPointPair>,
}

impl ControlPointSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set from a list of pairs.
    pub fn from_pairs(pairs: Vec<ControlPointPair>) -> Self {
        Self { pairs }
    }

    /// Create the default layout of four pairs placed at fixed fractional
    /// offsets within each image's own bounds.
    ///
    /// The layout is deterministic and not feature-aware: one point near each
    /// corner, inset by 30% of the width and height.
    pub fn default_for(reference: ImageSize, moving: ImageSize) -> Self {
        let fractions = [
            (DEFAULT_OFFSET, DEFAULT_OFFSET),
            (1.0 - DEFAULT_OFFSET, DEFAULT_OFFSET),
            (DEFAULT_OFFSET, 1.0 - DEFAULT_OFFSET),
            (1.0 - DEFAULT_OFFSET, 1.0 - DEFAULT_OFFSET),
        ];

        let pairs = fractions
            .iter()
            .map(|&(fx, fy)| {
                ControlPointPair::new(
                    Point2D::new(fx * reference.width as f64, fy * reference.height as f64),
                    Point2D::new(fx * moving.width as f64, fy * moving.height as f64),
                )
            })
            .collect();

        Self { pairs }
    }

    /// Number of pairs in the set.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the set contains no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The pairs in order.
    pub fn pairs(&self) -> &[ControlPointPair] {
        &self.pairs
    }

    /// Append a pair to the set.
    pub fn push(&mut self, pair: ControlPointPair) {
        self.pairs.push(pair);
    }

    /// Remove all pairs from the set.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Move one point of one pair to a new position.
    ///
    /// # Arguments
    ///
    /// * `index` - 0-based index of the pair to mutate.
    /// * `side` - Which point of the pair to move.
    /// * `point` - The new position.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of bounds.
    pub fn update(
        &mut self,
        index: usize,
        side: PointSide,
        point: Point2D,
    ) -> Result<(), GeometryError> {
        let len = self.pairs.len();
        let pair = self
            .pairs
            .get_mut(index)
            .ok_or(GeometryError::PairIndexOutOfBounds { index, len })?;

        match side {
            PointSide::Reference => pair.reference = point,
            PointSide::Moving => pair.moving = point,
        }

        Ok(())
    }

    /// The reference-image points in order.
    pub fn reference_points(&self) -> Vec<Point2D> {
        self.pairs.iter().map(|p| p.reference).collect()
    }

    /// The moving-image points in order.
    pub fn moving_points(&self) -> Vec<Point2D> {
        self.pairs.iter().map(|p| p.moving).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let reference = ImageSize {
            width: 100,
            height: 200,
        };
        let moving = ImageSize {
            width: 50,
            height: 80,
        };

        let set = ControlPointSet::default_for(reference, moving);
        assert_eq!(set.len(), MIN_PAIRS);

        let first = set.pairs()[0];
        assert_eq!(first.reference, Point2D::new(30.0, 60.0));
        assert_eq!(first.moving, Point2D::new(15.0, 24.0));

        let last = set.pairs()[3];
        assert_eq!(last.reference, Point2D::new(70.0, 140.0));
        assert_eq!(last.moving, Point2D::new(35.0, 56.0));
    }

    #[test]
    fn update_point() -> Result<(), GeometryError> {
        let size = ImageSize {
            width: 10,
            height: 10,
        };
        let mut set = ControlPointSet::default_for(size, size);

        set.update(2, PointSide::Moving, Point2D::new(1.5, 2.5))?;
        assert_eq!(set.pairs()[2].moving, Point2D::new(1.5, 2.5));

        let err = set.update(4, PointSide::Reference, Point2D::new(0.0, 0.0));
        assert_eq!(
            err,
            Err(GeometryError::PairIndexOutOfBounds { index: 4, len: 4 })
        );

        Ok(())
    }
}
