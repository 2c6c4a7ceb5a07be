use std::path::PathBuf;

use rasterreg_geometry::GeometryError;
use rasterreg_image::{ImageError, ImageSize};
use rasterreg_io::IoError;

use crate::ledger::LedgerError;

/// An error type for registration sessions and batch jobs.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// Error when an operation requires a reference image.
    #[error("No reference image is loaded")]
    NoReference,

    /// Error when an operation requires a moving image.
    #[error("No moving image is loaded")]
    NoMovingImage,

    /// Error when an operation requires a previously computed transform.
    #[error("No transform has been computed yet")]
    NoTransform,

    /// Error when a batch source does not match the session moving image size.
    #[error("Image {path} has size {got} but the session moving image is {expected}")]
    DimensionMismatch {
        /// The offending source file.
        path: PathBuf,
        /// Size of the offending image.
        got: ImageSize,
        /// Size of the session's moving image.
        expected: ImageSize,
    },

    /// Error when destination files already exist and overwriting was not
    /// allowed.
    #[error("{} destination file(s) already exist", .0.len())]
    DestinationExists(Vec<PathBuf>),

    /// A geometry failure from estimation or warping.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// An image buffer failure.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// A file input/output failure.
    #[error(transparent)]
    Io(#[from] IoError),

    /// A control point ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
