#![deny(missing_docs)]
//! Image container types for generating and manipulating 8-bit rasters.

/// image representation for raster registration purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{DynImage, Gray8, Image, ImageDtype, ImageSize, Rgb8, Rgba8};
