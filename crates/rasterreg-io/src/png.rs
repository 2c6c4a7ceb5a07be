use std::{fs, fs::File, path::Path};

use png::{BitDepth, ColorType, Decoder, Encoder};

use rasterreg_image::{DynImage, Gray8, Image, ImageSize, Rgb8, Rgba8};

use crate::error::IoError;

/// Read a PNG image with a single channel (mono8).
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A grayscale image with a single channel (mono8).
pub fn read_image_png_mono8(file_path: impl AsRef<Path>) -> Result<Gray8, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;
    check_color_type(color_type, ColorType::Grayscale)?;
    Ok(Image::new(size, buf)?)
}

/// Read a PNG image with three channels (rgb8).
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A RGB image with three channels (rgb8).
pub fn read_image_png_rgb8(file_path: impl AsRef<Path>) -> Result<Rgb8, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;
    check_color_type(color_type, ColorType::Rgb)?;
    Ok(Image::new(size, buf)?)
}

/// Read a PNG image with four channels (rgba8).
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A RGBA image with four channels (rgba8).
pub fn read_image_png_rgba8(file_path: impl AsRef<Path>) -> Result<Rgba8, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;
    check_color_type(color_type, ColorType::Rgba)?;
    Ok(Image::new(size, buf)?)
}

/// Read a PNG image with the channel count resolved from the file.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// The decoded image as a [`DynImage`].
pub fn read_image_png_any(file_path: impl AsRef<Path>) -> Result<DynImage, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;

    match color_type {
        ColorType::Grayscale => Ok(DynImage::Gray8(Image::new(size, buf)?)),
        ColorType::Rgb => Ok(DynImage::Rgb8(Image::new(size, buf)?)),
        ColorType::Rgba => Ok(DynImage::Rgba8(Image::new(size, buf)?)),
        _ => Err(IoError::UnsupportedImageFormat(format!(
            "png color type {color_type:?}"
        ))),
    }
}

fn check_color_type(got: ColorType, expected: ColorType) -> Result<(), IoError> {
    if got != expected {
        return Err(IoError::PngDecodeError(format!(
            "expected png color type {expected:?}, got {got:?}"
        )));
    }
    Ok(())
}

// utility function to read the png file
fn read_png_impl(file_path: impl AsRef<Path>) -> Result<(Vec<u8>, ImageSize, ColorType), IoError> {
    // verify the file exists
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    // verify the file extension
    if file_path
        .extension()
        .map_or(true, |ext| !ext.eq_ignore_ascii_case("png"))
    {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let file = fs::File::open(file_path)?;
    let mut reader = Decoder::new(file)
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    if info.bit_depth != BitDepth::Eight {
        return Err(IoError::PngDecodeError(format!(
            "expected 8-bit png, got {:?}",
            info.bit_depth
        )));
    }

    buf.truncate(info.buffer_size());

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };

    Ok((buf, size, info.color_type))
}

/// Writes the given PNG _(grayscale 8-bit)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image containing the PNG image data.
pub fn write_image_png_gray8(file_path: impl AsRef<Path>, image: &Gray8) -> Result<(), IoError> {
    write_png_impl(
        file_path,
        image.as_slice(),
        image.size(),
        ColorType::Grayscale,
    )
}

/// Writes the given PNG _(rgb8)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image containing the PNG image data.
pub fn write_image_png_rgb8(file_path: impl AsRef<Path>, image: &Rgb8) -> Result<(), IoError> {
    write_png_impl(file_path, image.as_slice(), image.size(), ColorType::Rgb)
}

/// Writes the given PNG _(rgba8)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image containing the PNG image data.
pub fn write_image_png_rgba8(file_path: impl AsRef<Path>, image: &Rgba8) -> Result<(), IoError> {
    write_png_impl(file_path, image.as_slice(), image.size(), ColorType::Rgba)
}

fn write_png_impl(
    file_path: impl AsRef<Path>,
    image_data: &[u8],
    image_size: ImageSize,
    color_type: ColorType,
) -> Result<(), IoError> {
    let file = File::create(file_path)?;

    let mut encoder = Encoder::new(file, image_size.width as u32, image_size.height as u32);
    encoder.set_color(color_type);
    encoder.set_depth(BitDepth::Eight);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .write_image_data(image_data)
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    Ok(())
}
