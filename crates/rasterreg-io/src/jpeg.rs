use std::{fs, path::Path};

use jpeg_encoder::{ColorType, Encoder};

use rasterreg_image::{DynImage, Gray8, Image, ImageSize, Rgb8};

use crate::error::IoError;

/// Writes the given JPEG _(rgb8)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG image.
/// - `image` - The image containing the JPEG image data.
/// - `quality` - The quality of the JPEG encoding, range from 0 (lowest) to 100 (highest)
pub fn write_image_jpeg_rgb8(
    file_path: impl AsRef<Path>,
    image: &Rgb8,
    quality: u8,
) -> Result<(), IoError> {
    write_image_jpeg_imp(file_path, image.as_slice(), image.size(), ColorType::Rgb, quality)
}

/// Writes the given JPEG _(grayscale)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG image.
/// - `image` - The image containing the JPEG image data.
/// - `quality` - The quality of the JPEG encoding, range from 0 (lowest) to 100 (highest)
pub fn write_image_jpeg_gray8(
    file_path: impl AsRef<Path>,
    image: &Gray8,
    quality: u8,
) -> Result<(), IoError> {
    write_image_jpeg_imp(file_path, image.as_slice(), image.size(), ColorType::Luma, quality)
}

fn write_image_jpeg_imp(
    file_path: impl AsRef<Path>,
    image_data: &[u8],
    image_size: ImageSize,
    color_type: ColorType,
    quality: u8,
) -> Result<(), IoError> {
    let encoder = Encoder::new_file(file_path, quality)?;
    encoder.encode(
        image_data,
        image_size.width as u16,
        image_size.height as u16,
        color_type,
    )?;
    Ok(())
}

/// Read a JPEG image with three channels _(rgb8)_.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG file.
///
/// # Returns
///
/// A RGB image with three channels _(rgb8)_.
pub fn read_image_jpeg_rgb8(file_path: impl AsRef<Path>) -> Result<Rgb8, IoError> {
    read_image_jpeg_impl(file_path)
}

/// Reads a JPEG file with a single channel _(mono8)_
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG file.
///
/// # Returns
///
/// A grayscale image with a single channel _(mono8)_.
pub fn read_image_jpeg_mono8(file_path: impl AsRef<Path>) -> Result<Gray8, IoError> {
    read_image_jpeg_impl(file_path)
}

/// Read a JPEG image with the channel count resolved from the file.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG file.
///
/// # Returns
///
/// The decoded image as a [`DynImage`].
pub fn read_image_jpeg_any(file_path: impl AsRef<Path>) -> Result<DynImage, IoError> {
    let (img_data, image_size) = decode_jpeg_file(file_path)?;

    let pixels = image_size.width * image_size.height;
    let components = if pixels > 0 { img_data.len() / pixels } else { 0 };

    match components {
        1 => Ok(DynImage::Gray8(Image::new(image_size, img_data)?)),
        3 => Ok(DynImage::Rgb8(Image::new(image_size, img_data)?)),
        other => Err(IoError::UnsupportedImageFormat(format!(
            "jpeg with {other} components"
        ))),
    }
}

fn read_image_jpeg_impl<const N: usize>(
    file_path: impl AsRef<Path>,
) -> Result<Image<u8, N>, IoError> {
    let (img_data, image_size) = decode_jpeg_file(file_path)?;
    Ok(Image::new(image_size, img_data)?)
}

fn decode_jpeg_file(file_path: impl AsRef<Path>) -> Result<(Vec<u8>, ImageSize), IoError> {
    let file_path = file_path.as_ref().to_owned();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    if file_path.extension().map_or(true, |ext| {
        !ext.eq_ignore_ascii_case("jpg") && !ext.eq_ignore_ascii_case("jpeg")
    }) {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let jpeg_data = fs::read(file_path)?;
    let mut decoder = zune_jpeg::JpegDecoder::new(jpeg_data);
    decoder.decode_headers()?;

    let image_info = decoder.info().ok_or_else(|| {
        IoError::JpegDecodingError(zune_jpeg::errors::DecodeErrors::Format(String::from(
            "Failed to find image info from its metadata",
        )))
    })?;

    let image_size = ImageSize {
        width: image_info.width as usize,
        height: image_info.height as usize,
    };

    let img_data = decoder.decode()?;

    Ok((img_data, image_size))
}
