use rasterreg_geometry::{GeometryError, Homography};
use rasterreg_image::{Image, ImageDtype};

use crate::interpolation::{interpolate_pixel, InterpolationMode};
use crate::parallel;

/// Applies a perspective transformation to an image.
///
/// For each destination pixel the corresponding source coordinate is found
/// through the inverse transform and sampled with the requested interpolation.
/// Destination pixels that map outside the source bounds are set to
/// `background`, so the output never contains uninitialized pixels.
///
/// * `src` - The input image with shape (height, width, channels).
/// * `dst` - The output image; its size defines the output canvas.
/// * `transform` - The perspective transform mapping src onto dst.
/// * `interpolation` - The interpolation mode to use.
/// * `background` - The pixel value for unmapped destination pixels.
///
/// # Errors
///
/// Fails with [`GeometryError::SingularTransform`] if the transform cannot be
/// inverted. The input image is never mutated.
///
/// # Example
///
/// ```
/// use rasterreg_image::{Image, ImageSize};
/// use rasterreg_imgproc::interpolation::InterpolationMode;
/// use rasterreg_imgproc::warp::warp_perspective;
/// use rasterreg_geometry::Homography;
///
/// let src = Image::<u8, 1>::new(
///   ImageSize {
///     width: 4,
///     height: 5,
///   },
///   vec![0u8; 4 * 5]
/// ).unwrap();
///
/// let mut dst = Image::<u8, 1>::from_size_val(
///   ImageSize {
///     width: 2,
///     height: 3,
///   },
///   0
/// ).unwrap();
///
/// warp_perspective(&src, &mut dst, &Homography::identity(), InterpolationMode::Bilinear, [0]).unwrap();
///
/// assert_eq!(dst.size().width, 2);
/// assert_eq!(dst.size().height, 3);
/// ```
pub fn warp_perspective<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    transform: &Homography,
    interpolation: InterpolationMode,
    background: [T; C],
) -> Result<(), GeometryError>
where
    T: ImageDtype,
{
    let inv = transform.inverse()?;
    let m = *inv.as_matrix();

    let (src_cols, src_rows) = (src.cols() as f64, src.rows() as f64);

    parallel::par_iter_rows_indexed(dst, |x, y, dst_pixel| {
        let (x, y) = (x as f64, y as f64);
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        let u = (m[0][0] * x + m[0][1] * y + m[0][2]) / w;
        let v = (m[1][0] * x + m[1][1] * y + m[1][2]) / w;

        if u >= 0.0 && u < src_cols && v >= 0.0 && v < src_rows {
            let pixel = interpolate_pixel(src, u as f32, v as f32, interpolation);
            dst_pixel.copy_from_slice(&pixel);
        } else {
            dst_pixel.copy_from_slice(&background);
        }
    });

    Ok(())
}
