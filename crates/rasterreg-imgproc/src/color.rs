use rasterreg_image::{Gray8, ImageError, Rgb8};

use crate::parallel;

/// Define the RGB weights for the grayscale conversion (ITU-R BT.709).
const RW: f32 = 0.2126;
const GW: f32 = 0.7152;
const BW: f32 = 0.0722;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.2126 * R + 0.7152 * G + 0.0722 * B
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use rasterreg_image::{Image, ImageSize};
/// use rasterreg_imgproc::color::gray_from_rgb;
///
/// let image = Image::<u8, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0u8; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// gray_from_rgb(&image, &mut gray).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// ```
pub fn gray_from_rgb(src: &Rgb8, dst: &mut Gray8) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let y = RW * src_pixel[0] as f32 + GW * src_pixel[1] as f32 + BW * src_pixel[2] as f32;
        dst_pixel[0] = y.round().clamp(0.0, 255.0) as u8;
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterreg_image::{Image, ImageSize};

    #[test]
    fn gray_weights() -> Result<(), ImageError> {
        let src = Image::<u8, 3>::new(
            ImageSize {
                width: 4,
                height: 1,
            },
            vec![255, 255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255],
        )?;
        let mut gray = Gray8::from_size_val(src.size(), 0)?;

        gray_from_rgb(&src, &mut gray)?;
        // white, then each primary weighted by its BT.709 coefficient
        assert_eq!(gray.as_slice(), &[255, 54, 182, 18]);

        Ok(())
    }

    #[test]
    fn gray_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            0,
        )?;
        let mut gray = Gray8::from_size_val(
            ImageSize {
                width: 3,
                height: 2,
            },
            0,
        )?;

        assert!(gray_from_rgb(&src, &mut gray).is_err());
        Ok(())
    }
}
