//! Control-point raster image registration toolkit.
//!
//! Aligns a moving raster image onto a reference raster through a planar
//! perspective transform estimated from user-supplied control point pairs,
//! and provides alphascale conversion and merging of transparency-weighted
//! rasters.

#[doc(inline)]
pub use rasterreg_geometry as geometry;

#[doc(inline)]
pub use rasterreg_image as image;

#[doc(inline)]
pub use rasterreg_imgproc as imgproc;

#[doc(inline)]
pub use rasterreg_io as io;

#[doc(inline)]
pub use rasterreg_session as session;
