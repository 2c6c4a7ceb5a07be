mod bilinear;
mod nearest;

pub(crate) use bilinear::bilinear_interpolation;
pub(crate) use nearest::nearest_neighbor_interpolation;

use rasterreg_image::{Image, ImageDtype};

/// Interpolation mode for resampling operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    Bilinear,
    /// Nearest neighbor interpolation
    Nearest,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated pixel values.
pub fn interpolate_pixel<T, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
    interpolation: InterpolationMode,
) -> [T; C]
where
    T: ImageDtype,
{
    match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v),
        InterpolationMode::Nearest => nearest_neighbor_interpolation(image, u, v),
    }
}
