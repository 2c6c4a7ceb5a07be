use std::path::Path;

use rasterreg_image::DynImage;

use crate::error::IoError;
use crate::{jpeg, png, tiff};

/// The image file formats handled by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
}

fn format_from_extension(file_path: &Path) -> Result<ImageFormat, IoError> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| IoError::InvalidFileExtension(file_path.to_path_buf()))?;

    if ext.eq_ignore_ascii_case("png") {
        Ok(ImageFormat::Png)
    } else if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
        Ok(ImageFormat::Jpeg)
    } else if ext.eq_ignore_ascii_case("tiff") || ext.eq_ignore_ascii_case("tif") {
        Ok(ImageFormat::Tiff)
    } else {
        Err(IoError::InvalidFileExtension(file_path.to_path_buf()))
    }
}

/// Reads an image from the given file path, resolving the channel count from
/// the file.
///
/// The format is dispatched on the file extension; PNG, JPEG and TIFF are
/// supported with 8 bits per channel.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// The decoded image as a [`DynImage`].
pub fn read_image_any(file_path: impl AsRef<Path>) -> Result<DynImage, IoError> {
    let file_path = file_path.as_ref();

    match format_from_extension(file_path)? {
        ImageFormat::Png => png::read_image_png_any(file_path),
        ImageFormat::Jpeg => jpeg::read_image_jpeg_any(file_path),
        ImageFormat::Tiff => tiff::read_image_tiff_any(file_path),
    }
}

/// Writes an image to the given file path, dispatching on the file extension.
///
/// Images with an alpha channel can only be written to formats that store
/// one; saving an RGBA image to a JPEG path fails with
/// [`IoError::UnsupportedAlphaFormat`] before anything is written.
///
/// # Arguments
///
/// * `file_path` - The destination path; its extension selects the format.
/// * `image` - The image to write.
pub fn write_image_any(file_path: impl AsRef<Path>, image: &DynImage) -> Result<(), IoError> {
    let file_path = file_path.as_ref();
    let format = format_from_extension(file_path)?;

    if image.has_alpha() && format == ImageFormat::Jpeg {
        return Err(IoError::UnsupportedAlphaFormat(file_path.to_path_buf()));
    }

    match (format, image) {
        (ImageFormat::Png, DynImage::Gray8(img)) => png::write_image_png_gray8(file_path, img),
        (ImageFormat::Png, DynImage::Rgb8(img)) => png::write_image_png_rgb8(file_path, img),
        (ImageFormat::Png, DynImage::Rgba8(img)) => png::write_image_png_rgba8(file_path, img),
        (ImageFormat::Jpeg, DynImage::Gray8(img)) => {
            jpeg::write_image_jpeg_gray8(file_path, img, 100)
        }
        (ImageFormat::Jpeg, DynImage::Rgb8(img)) => {
            jpeg::write_image_jpeg_rgb8(file_path, img, 100)
        }
        (ImageFormat::Jpeg, DynImage::Rgba8(_)) => {
            Err(IoError::UnsupportedAlphaFormat(file_path.to_path_buf()))
        }
        (ImageFormat::Tiff, DynImage::Gray8(img)) => tiff::write_image_tiff_mono8(file_path, img),
        (ImageFormat::Tiff, DynImage::Rgb8(img)) => tiff::write_image_tiff_rgb8(file_path, img),
        (ImageFormat::Tiff, DynImage::Rgba8(img)) => tiff::write_image_tiff_rgba8(file_path, img),
    }
}
