//! Decoded solver input

use crate::image_io::{self, ImageError};
use intrinsic_common::{Dimensions, LinearRgbImage, ValidityMask};
use std::path::{Path, PathBuf};
use tracing::debug;

/// An image ready for decomposition
#[derive(Debug, Clone)]
pub struct IntrinsicInput {
    /// Where the image was loaded from
    pub path: PathBuf,

    /// Linear-light RGB raster
    pub image: LinearRgbImage,

    /// Pixels considered for normalization and output rescaling
    pub mask: ValidityMask,

    /// Human reflectance judgements, passed through to solvers that use them
    pub judgements: Option<serde_json::Value>,
}

impl IntrinsicInput {
    /// Load an image plus optional mask and judgement file
    ///
    /// Without a mask every pixel is valid. A mask whose dimensions differ
    /// from the image is rejected.
    pub fn from_file(
        path: &Path,
        is_srgb: bool,
        mask_path: Option<&Path>,
        judgements_path: Option<&Path>,
    ) -> Result<Self, ImageError> {
        let rgb = image_io::load_image(path)?;
        let (width, height) = rgb.dimensions();
        let dimensions = Dimensions::new(width, height);
        let image = image_io::to_linear_rgb(&rgb, is_srgb);

        let mask = match mask_path {
            Some(mask_path) => {
                let mask = image_io::load_mask(mask_path)?;
                mask.ensure_matches(dimensions)?;
                mask
            }
            None => ValidityMask::full(dimensions),
        };

        let judgements = judgements_path.map(load_judgements).transpose()?;

        debug!(
            "Loaded {} ({}, {} valid pixels)",
            path.display(),
            dimensions,
            mask.valid_count()
        );

        Ok(Self {
            path: path.to_path_buf(),
            image,
            mask,
            judgements,
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.image.dimensions();
        Dimensions::new(width, height)
    }
}

fn load_judgements(path: &Path) -> Result<serde_json::Value, ImageError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ImageError::ReadError(format!("judgements {}: {e}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| ImageError::DecodeError(format!("judgements {}: {e}", path.display())))
}
