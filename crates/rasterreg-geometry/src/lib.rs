#![deny(missing_docs)]
//! Control point types and planar homography estimation.

/// control point pair and set types.
pub mod point;

/// homography type and direct linear transform estimation.
pub mod homography;

/// Error types for the geometry module.
pub mod error;

pub use crate::error::GeometryError;
pub use crate::homography::{estimate_homography, Homography};
pub use crate::point::{ControlPointPair, ControlPointSet, Point2D, PointSide, MIN_PAIRS};
