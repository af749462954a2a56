/// Common raster types and utilities for intrinsic image decomposition
use image::{GrayImage, ImageBuffer, Luma, Rgb};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("Empty image ({0})")]
    EmptyImage(Dimensions),

    #[error("No valid pixels in mask")]
    EmptyMask,

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Linear-light RGB raster, one f32 per channel
pub type LinearRgbImage = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// Single-channel linear raster (shading, intensity)
pub type LinearGrayImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Raster dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn max_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel-validity mask
///
/// Pixels flagged invalid are excluded from normalization and from the
/// dynamic-range rescale applied when outputs are written. Stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    dimensions: Dimensions,
    valid: Vec<bool>,
}

impl ValidityMask {
    /// Mask with every pixel valid
    #[must_use]
    pub fn full(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            valid: vec![true; dimensions.pixel_count()],
        }
    }

    /// Build a mask from a grayscale image: nonzero pixels are valid
    #[must_use]
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            dimensions: Dimensions::new(width, height),
            valid: image.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }

    /// Build a mask from raw row-major flags
    pub fn from_flags(dimensions: Dimensions, valid: Vec<bool>) -> Result<Self> {
        if valid.len() != dimensions.pixel_count() {
            return Err(ProcessingError::Other(format!(
                "mask has {} flags for a {} raster",
                valid.len(),
                dimensions
            )));
        }
        Ok(Self { dimensions, valid })
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    #[must_use]
    pub fn is_valid(&self, x: u32, y: u32) -> bool {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return false;
        }
        let idx = y as usize * self.dimensions.width as usize + x as usize;
        self.valid.get(idx).copied().unwrap_or(false)
    }

    /// Flags in row-major order
    #[must_use]
    pub fn flags(&self) -> &[bool] {
        &self.valid
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Fail unless the mask matches the given raster dimensions
    pub fn ensure_matches(&self, dimensions: Dimensions) -> Result<()> {
        if self.dimensions != dimensions {
            return Err(ProcessingError::DimensionMismatch {
                expected: dimensions,
                actual: self.dimensions,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mask_is_all_valid() {
        let mask = ValidityMask::full(Dimensions::new(4, 3));
        assert_eq!(mask.valid_count(), 12);
        assert!(mask.is_valid(3, 2));
        assert!(!mask.is_valid(4, 2));
    }

    #[test]
    fn test_mask_from_gray_uses_nonzero() {
        let mut gray = GrayImage::new(2, 2);
        gray.put_pixel(1, 0, Luma([255]));
        gray.put_pixel(0, 1, Luma([1]));

        let mask = ValidityMask::from_gray(&gray);
        assert_eq!(mask.valid_count(), 2);
        assert!(!mask.is_valid(0, 0));
        assert!(mask.is_valid(1, 0));
        assert!(mask.is_valid(0, 1));
    }

    #[test]
    fn test_mask_dimension_check() {
        let mask = ValidityMask::full(Dimensions::new(2, 2));
        assert!(mask.ensure_matches(Dimensions::new(2, 2)).is_ok());
        assert!(matches!(
            mask.ensure_matches(Dimensions::new(3, 2)),
            Err(ProcessingError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_from_flags_rejects_wrong_length() {
        let result = ValidityMask::from_flags(Dimensions::new(2, 2), vec![true; 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_messages_name_dimensions() {
        let mismatch = ProcessingError::DimensionMismatch {
            expected: Dimensions::new(4, 3),
            actual: Dimensions::new(2, 2),
        };
        assert_eq!(
            mismatch.to_string(),
            "Dimension mismatch: expected 4x3, got 2x2"
        );
        assert_eq!(
            ProcessingError::EmptyImage(Dimensions::new(0, 5)).to_string(),
            "Empty image (0x5)"
        );
        assert_eq!(ProcessingError::EmptyMask.to_string(), "No valid pixels in mask");
    }

    #[test]
    fn test_dimensions_display() {
        let dims = Dimensions::new(640, 480);
        assert_eq!(dims.to_string(), "640x480");
        assert_eq!(dims.max_side(), 640);
        assert!(!dims.is_empty());
        assert!(Dimensions::new(0, 10).is_empty());
    }
}
