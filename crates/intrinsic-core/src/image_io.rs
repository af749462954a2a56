//! Image I/O for the decomposition pipeline
//!
//! Loading decodes any format the `image` crate was built with and converts to
//! linear-light f32. Saving rescales dynamic range over the valid pixels,
//! applies the sRGB transfer curve and quantizes to 8 bits.
//!
//! # sRGB
//! The transfer functions follow IEC 61966-2-1 (the piecewise curve, not the
//! 2.2 gamma approximation).

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use intrinsic_common::{
    Dimensions, LinearGrayImage, LinearRgbImage, ProcessingError, ValidityMask,
};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during image I/O operations
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image file: {0}")]
    ReadError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Failed to write image file: {0}")]
    WriteError(String),

    #[error("Invalid raster: {0}")]
    InvalidRaster(#[from] ProcessingError),
}

/// Load an 8-bit RGB image, detecting the format from the extension and
/// falling back to content sniffing
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage, ImageError> {
    let path = path.as_ref();

    let data = fs::read(path)
        .map_err(|e| ImageError::ReadError(format!("{}: {e}", path.display())))?;

    let decoded = match ImageFormat::from_path(path) {
        Ok(format) => image::load_from_memory_with_format(&data, format),
        Err(_) => image::load_from_memory(&data),
    }
    .map_err(|e| ImageError::DecodeError(format!("{}: {e}", path.display())))?;

    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessingError::EmptyImage(Dimensions::new(width, height)).into());
    }

    Ok(rgb)
}

/// Load a pixel-validity mask: nonzero luma marks a valid pixel
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<ValidityMask, ImageError> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| ImageError::DecodeError(format!("mask {}: {e}", path.display())))?;
    Ok(ValidityMask::from_gray(&img.to_luma8()))
}

/// sRGB-encoded value in [0, 1] to linear light
#[must_use]
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear-light value to sRGB encoding. Negative input maps to 0.
#[must_use]
pub fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.0031308 {
        (v * 12.92).max(0.0)
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert an 8-bit raster to linear f32, decoding sRGB when `is_srgb` is set
#[must_use]
pub fn to_linear_rgb(image: &RgbImage, is_srgb: bool) -> LinearRgbImage {
    let (width, height) = image.dimensions();
    let data = image
        .as_raw()
        .iter()
        .map(|&b| {
            let v = f32::from(b) / 255.0;
            if is_srgb {
                srgb_to_linear(v)
            } else {
                v
            }
        })
        .collect();

    // Length is width * height * 3 by construction
    LinearRgbImage::from_raw(width, height, data)
        .unwrap_or_else(|| LinearRgbImage::new(width, height))
}

/// Persist a linear RGB raster as an 8-bit image
///
/// When `rescale` is set the raster is divided by its maximum over the valid
/// pixels of `mask` (all pixels when no mask is given). When `srgb` is set the
/// sRGB transfer curve is applied before quantization.
pub fn save_rgb<P: AsRef<Path>>(
    path: P,
    raster: &LinearRgbImage,
    mask: Option<&ValidityMask>,
    rescale: bool,
    srgb: bool,
) -> Result<(), ImageError> {
    let (width, height) = raster.dimensions();
    let dimensions = Dimensions::new(width, height);
    let bytes = encode_channels(raster.as_raw(), 3, dimensions, mask, rescale, srgb)?;
    let img = RgbImage::from_raw(width, height, bytes).ok_or_else(|| {
        ImageError::EncodeError(format!("buffer does not fit {width}x{height} RGB"))
    })?;
    save_encoded(&DynamicImage::ImageRgb8(img), path.as_ref())
}

/// Persist a linear single-channel raster as an 8-bit grayscale image
///
/// Same rescale and sRGB semantics as [`save_rgb`].
pub fn save_gray<P: AsRef<Path>>(
    path: P,
    raster: &LinearGrayImage,
    mask: Option<&ValidityMask>,
    rescale: bool,
    srgb: bool,
) -> Result<(), ImageError> {
    let (width, height) = raster.dimensions();
    let dimensions = Dimensions::new(width, height);
    let bytes = encode_channels(raster.as_raw(), 1, dimensions, mask, rescale, srgb)?;
    let img = GrayImage::from_raw(width, height, bytes).ok_or_else(|| {
        ImageError::EncodeError(format!("buffer does not fit {width}x{height} gray"))
    })?;
    save_encoded(&DynamicImage::ImageLuma8(img), path.as_ref())
}

/// Rescale, gamma-encode and quantize interleaved channel data
fn encode_channels(
    data: &[f32],
    channels: usize,
    dimensions: Dimensions,
    mask: Option<&ValidityMask>,
    rescale: bool,
    srgb: bool,
) -> Result<Vec<u8>, ImageError> {
    if let Some(mask) = mask {
        mask.ensure_matches(dimensions)?;
    }

    let scale = if rescale {
        rescale_factor(data, channels, mask)
    } else {
        1.0
    };

    Ok(data
        .iter()
        .map(|&v| {
            let v = v * scale;
            let v = if srgb { linear_to_srgb(v) } else { v };
            // NaN saturates to 0 in the cast
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect())
}

/// Reciprocal of the largest finite channel value over valid pixels, or 1.0
/// when there is nothing positive to normalize by
fn rescale_factor(data: &[f32], channels: usize, mask: Option<&ValidityMask>) -> f32 {
    let max = data
        .chunks_exact(channels)
        .enumerate()
        .filter(|(idx, _)| {
            mask.map_or(true, |m| m.flags().get(*idx).copied().unwrap_or(false))
        })
        .flat_map(|(_, px)| px.iter().copied())
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max);

    if max > 0.0 {
        1.0 / max
    } else {
        1.0
    }
}

/// Write an encoded image, picking the container from the extension
fn save_encoded(image: &DynamicImage, path: &Path) -> Result<(), ImageError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let result = match extension.as_str() {
        "png" => image.save_with_format(path, ImageFormat::Png),
        "jpg" | "jpeg" => image.save_with_format(path, ImageFormat::Jpeg),
        _ => image.save(path),
    };

    result.map_err(|e| ImageError::WriteError(format!("{}: {e}", path.display())))
}
