use rasterreg_image::Image;

/// Places a source image onto a destination canvas, anchored at the top-left
/// corner.
///
/// The source keeps its intrinsic resolution: rows and columns beyond the
/// canvas are dropped, and canvas area not covered by the source is filled
/// with `background`. This is the canvas normalization step that runs before
/// a perspective warp, so that the reference image's own detail is never
/// resampled.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image; its size defines the canvas.
/// * `background` - The pixel value for canvas area outside the source.
///
/// # Example
///
/// ```
/// use rasterreg_image::{Image, ImageSize};
/// use rasterreg_imgproc::canvas::normalize_canvas;
///
/// let src = Image::<u8, 1>::new(
///     ImageSize { width: 1, height: 1 },
///     vec![7],
/// ).unwrap();
///
/// let mut dst = Image::<u8, 1>::from_size_val(
///     ImageSize { width: 2, height: 2 },
///     0,
/// ).unwrap();
///
/// normalize_canvas(&src, &mut dst, [0]);
/// assert_eq!(dst.as_slice(), &[7, 0, 0, 0]);
/// ```
pub fn normalize_canvas<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    background: [T; C],
) where
    T: Copy,
{
    let copy_cols = src.width().min(dst.width());
    let copy_rows = src.height().min(dst.height());

    let src_stride = src.width() * C;
    let dst_stride = dst.width() * C;

    let src_data = src.as_slice();
    let dst_data = dst.as_slice_mut();

    dst_data
        .chunks_exact_mut(C)
        .for_each(|pixel| pixel.copy_from_slice(&background));

    for (src_row, dst_row) in src_data
        .chunks_exact(src_stride)
        .zip(dst_data.chunks_exact_mut(dst_stride))
        .take(copy_rows)
    {
        dst_row[..copy_cols * C].copy_from_slice(&src_row[..copy_cols * C]);
    }
}
