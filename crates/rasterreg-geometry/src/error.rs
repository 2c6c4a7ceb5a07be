use crate::point::PointSide;

/// An error type for the geometry module.
///
/// Point indices in error messages are 1-based, matching the pair numbering
/// shown to users and written to control point files.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// Error when fewer control point pairs are given than required.
    #[error("At least {min} control point pairs are required, got {got}")]
    NotEnoughPoints {
        /// Number of pairs in the set.
        got: usize,
        /// Minimum number of pairs required.
        min: usize,
    },

    /// Error when a pair index is out of bounds.
    #[error("Pair index {index} is out of bounds (set has {len} pairs)")]
    PairIndexOutOfBounds {
        /// The offending pair index.
        index: usize,
        /// Number of pairs in the set.
        len: usize,
    },

    /// Error when two control points in one image coincide.
    #[error("Points {first} and {second} in the {side} image coincide")]
    CoincidentPoints {
        /// Which image the points belong to.
        side: PointSide,
        /// 1-based index of the first point.
        first: usize,
        /// 1-based index of the second point.
        second: usize,
    },

    /// Error when three control points in one image are collinear.
    #[error("Points {first}, {second} and {third} in the {side} image are collinear")]
    CollinearPoints {
        /// Which image the points belong to.
        side: PointSide,
        /// 1-based index of the first point.
        first: usize,
        /// 1-based index of the second point.
        second: usize,
        /// 1-based index of the third point.
        third: usize,
    },

    /// Error when the correspondence system does not determine a unique homography.
    #[error("Control point correspondences do not determine a unique transform")]
    RankDeficient,

    /// Error when a transform cannot be inverted.
    #[error("Transform is singular and cannot be inverted")]
    SingularTransform,
}
