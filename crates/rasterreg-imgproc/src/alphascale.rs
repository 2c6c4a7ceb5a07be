use rayon::prelude::*;

use rasterreg_image::{Gray8, ImageError, ImageSize, Rgb8, Rgba8};

use crate::color::gray_from_rgb;
use crate::parallel;

/// An error type for the alphascale module.
#[derive(thiserror::Error, Debug)]
pub enum AlphascaleError {
    /// Error when a merge is requested with no input images.
    #[error("No input images to merge")]
    EmptyMergeSet,

    /// Error when the images of a merge set do not share one size.
    #[error("Image {index} has size {got} but expected {expected}")]
    DimensionMismatch {
        /// 0-based index of the offending image.
        index: usize,
        /// Size of the offending image.
        got: ImageSize,
        /// Size shared by the rest of the merge set.
        expected: ImageSize,
    },

    /// Error when creating an image.
    #[error("Failed to create image. {0}")]
    Image(#[from] ImageError),
}

/// Convert a grayscale image to an alphascale image with a given RGB color.
///
/// Every output pixel carries the tint in its RGB channels and the grayscale
/// sample verbatim in its alpha channel (0 = fully transparent, 255 = fully
/// opaque). The map is pure and lossless: the input is exactly recoverable
/// from the output alpha channel.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output RGBA image, same size as the input.
/// * `tint` - The alphascale color as RGB channels.
///
/// # Errors
///
/// Returns an error if the input and output sizes differ.
pub fn alphascale_from_gray(
    src: &Gray8,
    dst: &mut Rgba8,
    tint: [u8; 3],
) -> Result<(), AlphascaleError> {
    if src.size() != dst.size() {
        return Err(AlphascaleError::Image(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        )));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = tint[0];
        dst_pixel[1] = tint[1];
        dst_pixel[2] = tint[2];
        dst_pixel[3] = src_pixel[0];
    });

    Ok(())
}

/// Convert an RGB image to an alphascale image with a given RGB color.
///
/// The input is first reduced to grayscale with [`gray_from_rgb`] and then
/// converted like [`alphascale_from_gray`]: the output carries the tint in
/// its RGB channels and the reduced luminance in its alpha channel.
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output RGBA image, same size as the input.
/// * `tint` - The alphascale color as RGB channels.
///
/// # Errors
///
/// Returns an error if the input and output sizes differ.
pub fn alphascale_from_rgb(
    src: &Rgb8,
    dst: &mut Rgba8,
    tint: [u8; 3],
) -> Result<(), AlphascaleError> {
    let mut gray = Gray8::from_size_val(src.size(), 0)?;
    gray_from_rgb(src, &mut gray)?;
    alphascale_from_gray(&gray, dst, tint)
}

/// Merge multiple alphascale images into a single alphascale image.
///
/// The alpha at each pixel is the maximum alpha at that pixel across the
/// inputs. The color at each pixel is the alpha-weighted average across all
/// inputs, computed as one sum over the whole set so no intermediate rounding
/// accumulates:
///
/// color = sum(color_i * alpha_i) / sum(alpha_i)
///
/// Where the alpha sum is zero the pixel is fully transparent and all
/// channels are set to zero.
///
/// # Arguments
///
/// * `srcs` - The alphascale images to merge, all of one size.
/// * `dst` - The output RGBA image, same size as the inputs.
///
/// # Errors
///
/// Returns an error if the set is empty or the sizes do not match; images are
/// never resized implicitly.
pub fn merge_alphascale(srcs: &[Rgba8], dst: &mut Rgba8) -> Result<(), AlphascaleError> {
    let first = srcs.first().ok_or(AlphascaleError::EmptyMergeSet)?;
    let expected = first.size();

    for (index, src) in srcs.iter().enumerate() {
        if src.size() != expected {
            return Err(AlphascaleError::DimensionMismatch {
                index,
                got: src.size(),
                expected,
            });
        }
    }

    if dst.size() != expected {
        return Err(AlphascaleError::Image(ImageError::InvalidImageSize(
            dst.width(),
            dst.height(),
            expected.width,
            expected.height,
        )));
    }

    let cols = expected.width;
    let src_slices: Vec<&[u8]> = srcs.iter().map(|s| s.as_slice()).collect();

    dst.as_slice_mut()
        .par_chunks_exact_mut(4 * cols)
        .enumerate()
        .for_each(|(y, dst_row)| {
            dst_row
                .chunks_exact_mut(4)
                .enumerate()
                .for_each(|(x, dst_pixel)| {
                    let base = (y * cols + x) * 4;

                    let mut alpha_sum = 0u64;
                    let mut alpha_max = 0u8;
                    let mut weighted = [0u64; 3];

                    for src in &src_slices {
                        let pixel = &src[base..base + 4];
                        let alpha = pixel[3];
                        alpha_sum += alpha as u64;
                        alpha_max = alpha_max.max(alpha);
                        for (acc, &c) in weighted.iter_mut().zip(&pixel[..3]) {
                            *acc += c as u64 * alpha as u64;
                        }
                    }

                    if alpha_sum == 0 {
                        dst_pixel.fill(0);
                        return;
                    }

                    for (d, &num) in dst_pixel[..3].iter_mut().zip(&weighted) {
                        // round to nearest, exact in integer arithmetic
                        *d = ((2 * num + alpha_sum) / (2 * alpha_sum)) as u8;
                    }
                    dst_pixel[3] = alpha_max;
                });
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterreg_image::{Image, ImageSize};

    #[test]
    fn alphascale_roundtrip() -> Result<(), AlphascaleError> {
        let gray = Gray8::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0, 64, 128, 255],
        )?;

        let mut rgba = Rgba8::from_size_val(gray.size(), 0)?;
        alphascale_from_gray(&gray, &mut rgba, [10, 200, 30])?;

        let alpha: Vec<u8> = rgba.as_slice().chunks_exact(4).map(|p| p[3]).collect();
        assert_eq!(alpha, gray.as_slice());

        for pixel in rgba.as_slice().chunks_exact(4) {
            assert_eq!(&pixel[..3], &[10, 200, 30]);
        }

        Ok(())
    }

    #[test]
    fn alphascale_size_mismatch() -> Result<(), AlphascaleError> {
        let gray = Gray8::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            0,
        )?;
        let mut rgba = Rgba8::from_size_val(
            ImageSize {
                width: 3,
                height: 2,
            },
            0,
        )?;

        assert!(alphascale_from_gray(&gray, &mut rgba, [0, 0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn alphascale_from_rgb_reduces_luminance() -> Result<(), AlphascaleError> {
        let rgb = Rgb8::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![255, 255, 255, 255, 0, 0],
        )?;

        let mut rgba = Rgba8::from_size_val(rgb.size(), 0)?;
        alphascale_from_rgb(&rgb, &mut rgba, [0, 128, 255])?;

        // white is fully opaque; pure red carries its BT.709 weight
        assert_eq!(rgba.as_slice(), &[0, 128, 255, 255, 0, 128, 255, 54]);

        Ok(())
    }

    #[test]
    fn merge_weighted_colors() -> Result<(), AlphascaleError> {
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let blue = Rgba8::new(size, vec![0, 0, 255, 128])?;
        let red = Rgba8::new(size, vec![255, 0, 0, 255])?;

        let mut merged = Rgba8::from_size_val(size, 0)?;
        merge_alphascale(&[blue, red], &mut merged)?;

        // weighted sum over both inputs, rounded once per channel
        let r = ((0u64 * 128 + 255 * 255) as f64 / (128 + 255) as f64).round() as u8;
        let b = ((255u64 * 128 + 0 * 255) as f64 / (128 + 255) as f64).round() as u8;
        assert_eq!(merged.as_slice(), &[r, 0, b, 255]);

        Ok(())
    }

    #[test]
    fn merge_single_image_unchanged() -> Result<(), AlphascaleError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let image = Rgba8::new(size, vec![10, 20, 30, 200, 40, 50, 60, 1])?;

        let mut merged = Rgba8::from_size_val(size, 0)?;
        merge_alphascale(std::slice::from_ref(&image), &mut merged)?;

        assert_eq!(merged.as_slice(), image.as_slice());
        Ok(())
    }

    #[test]
    fn merge_zero_alpha_is_transparent_black() -> Result<(), AlphascaleError> {
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let a = Rgba8::new(size, vec![255, 0, 0, 0])?;
        let b = Rgba8::new(size, vec![0, 255, 0, 0])?;

        let mut merged = Rgba8::from_size_val(size, 1)?;
        merge_alphascale(&[a, b], &mut merged)?;

        assert_eq!(merged.as_slice(), &[0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn merge_three_way_single_sum() -> Result<(), AlphascaleError> {
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let imgs = [
            Rgba8::new(size, vec![100, 0, 0, 50])?,
            Rgba8::new(size, vec![0, 100, 0, 100])?,
            Rgba8::new(size, vec![0, 0, 100, 150])?,
        ];

        let mut merged = Rgba8::from_size_val(size, 0)?;
        merge_alphascale(&imgs, &mut merged)?;

        let sum = (50 + 100 + 150) as f64;
        let expected = [
            ((100.0 * 50.0) / sum).round() as u8,
            ((100.0 * 100.0) / sum).round() as u8,
            ((100.0 * 150.0) / sum).round() as u8,
            150,
        ];
        assert_eq!(merged.as_slice(), &expected);

        Ok(())
    }

    #[test]
    fn merge_dimension_mismatch() -> Result<(), AlphascaleError> {
        let a = Rgba8::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            0,
        )?;
        let b = Rgba8::from_size_val(
            ImageSize {
                width: 3,
                height: 2,
            },
            0,
        )?;
        let mut merged = Rgba8::from_size_val(a.size(), 0)?;

        let err = merge_alphascale(&[a, b], &mut merged);
        assert!(matches!(
            err,
            Err(AlphascaleError::DimensionMismatch { index: 1, .. })
        ));

        Ok(())
    }

    #[test]
    fn merge_empty_set() -> Result<(), AlphascaleError> {
        let mut merged = Rgba8::from_size_val(
            ImageSize {
                width: 1,
                height: 1,
            },
            0,
        )?;
        assert!(matches!(
            merge_alphascale(&[], &mut merged),
            Err(AlphascaleError::EmptyMergeSet)
        ));
        Ok(())
    }
}
