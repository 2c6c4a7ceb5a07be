use std::{fs, path::Path};

use tiff::{
    decoder::DecodingResult,
    encoder::{colortype, TiffEncoder},
};

use rasterreg_image::{DynImage, Gray8, Image, ImageSize, Rgb8, Rgba8};

use crate::error::IoError;

/// Read a TIFF image and return it as a grayscale image.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
///
/// # Returns
///
/// The Gray8 typed image.
pub fn read_image_tiff_mono8(file_path: impl AsRef<Path>) -> Result<Gray8, IoError> {
    match read_image_tiff_any(file_path)? {
        DynImage::Gray8(img) => Ok(img),
        other => Err(unexpected_channels(other.num_channels())),
    }
}

/// Read a TIFF image and return it as an RGB8 image.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
///
/// # Returns
///
/// The Rgb8 typed image.
pub fn read_image_tiff_rgb8(file_path: impl AsRef<Path>) -> Result<Rgb8, IoError> {
    match read_image_tiff_any(file_path)? {
        DynImage::Rgb8(img) => Ok(img),
        other => Err(unexpected_channels(other.num_channels())),
    }
}

/// Read a TIFF image and return it as an RGBA8 image.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
///
/// # Returns
///
/// The Rgba8 typed image.
pub fn read_image_tiff_rgba8(file_path: impl AsRef<Path>) -> Result<Rgba8, IoError> {
    match read_image_tiff_any(file_path)? {
        DynImage::Rgba8(img) => Ok(img),
        other => Err(unexpected_channels(other.num_channels())),
    }
}

/// Read a TIFF image with the channel count resolved from the file.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
///
/// # Returns
///
/// The decoded image as a [`DynImage`].
pub fn read_image_tiff_any(file_path: impl AsRef<Path>) -> Result<DynImage, IoError> {
    let (result, size, colortype) = read_image_tiff_impl(file_path)?;

    let data = match result {
        DecodingResult::U8(data) => data,
        _ => {
            return Err(IoError::TiffError(tiff::TiffError::UnsupportedError(
                tiff::TiffUnsupportedError::UnknownInterpretation,
            )))
        }
    };

    match colortype {
        tiff::ColorType::Gray(8) => Ok(DynImage::Gray8(Image::new(size, data)?)),
        tiff::ColorType::RGB(8) => Ok(DynImage::Rgb8(Image::new(size, data)?)),
        tiff::ColorType::RGBA(8) => Ok(DynImage::Rgba8(Image::new(size, data)?)),
        other => Err(IoError::UnsupportedImageFormat(format!(
            "tiff color type {other:?}"
        ))),
    }
}

fn unexpected_channels(got: usize) -> IoError {
    IoError::UnsupportedImageFormat(format!("tiff with {got} channels"))
}

fn read_image_tiff_impl(
    file_path: impl AsRef<Path>,
) -> Result<(DecodingResult, ImageSize, tiff::ColorType), IoError> {
    let file_path = file_path.as_ref().to_owned();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    if file_path.extension().map_or(true, |ext| {
        !ext.eq_ignore_ascii_case("tiff") && !ext.eq_ignore_ascii_case("tif")
    }) {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let tiff_data = fs::File::open(file_path)?;
    let mut decoder = tiff::decoder::Decoder::new(tiff_data)?;

    let colortype = decoder.colortype()?;
    let result = decoder.read_image()?;
    let (width, height) = decoder.dimensions()?;

    let size = ImageSize {
        width: width as usize,
        height: height as usize,
    };

    Ok((result, size, colortype))
}

/// Write a TIFF image with a mono8 color type.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
/// * `image` - The Gray8 image to write.
pub fn write_image_tiff_mono8(file_path: impl AsRef<Path>, image: &Gray8) -> Result<(), IoError> {
    write_image_tiff_impl::<colortype::Gray8>(file_path, image.as_slice(), image.size())
}

/// Write a TIFF image with a RGB8 color type.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
/// * `image` - The Rgb8 image to write.
pub fn write_image_tiff_rgb8(file_path: impl AsRef<Path>, image: &Rgb8) -> Result<(), IoError> {
    write_image_tiff_impl::<colortype::RGB8>(file_path, image.as_slice(), image.size())
}

/// Write a TIFF image with a RGBA8 color type.
///
/// # Arguments
///
/// * `file_path` - The path to the TIFF image.
/// * `image` - The Rgba8 image to write.
pub fn write_image_tiff_rgba8(file_path: impl AsRef<Path>, image: &Rgba8) -> Result<(), IoError> {
    write_image_tiff_impl::<colortype::RGBA8>(file_path, image.as_slice(), image.size())
}

fn write_image_tiff_impl<C>(
    file_path: impl AsRef<Path>,
    image_data: &[u8],
    image_size: ImageSize,
) -> Result<(), IoError>
where
    C: tiff::encoder::colortype::ColorType<Inner = u8>,
{
    let file = fs::File::create(file_path)?;

    let mut encoder = TiffEncoder::new(file)?;
    encoder.write_image::<C>(
        image_size.width as u32,
        image_size.height as u32,
        image_data,
    )?;
    Ok(())
}
