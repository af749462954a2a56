//! Baseline envelope-Retinex solver
//!
//! Shading is estimated as a smooth upper envelope of pixel intensity: start
//! from the intensity itself and repeatedly replace it by
//! `max(intensity, blur(shading))`. Reflectance is what remains after dividing
//! the image by that shading. The result is rescaled so mean shading over the
//! valid pixels hits `abs_shading_gray_point`.

use crate::input::IntrinsicInput;
use crate::params::SolverParameters;
use crate::solver::{Decomposition, DecompositionMetadata, Solver, SolverError};
use image::{Luma, Rgb};
use imageproc::filter::gaussian_blur_f32;
use intrinsic_common::{LinearGrayImage, LinearRgbImage, ProcessingError};
use std::time::Instant;
use tracing::debug;

/// Smallest blur sigma in pixels
const MIN_SIGMA_PX: f32 = 0.5;

/// Envelope-Retinex decomposition
#[derive(Debug, Clone, Copy, Default)]
pub struct RetinexSolver;

impl RetinexSolver {
    pub const NAME: &'static str = "retinex-envelope";

    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Solver for RetinexSolver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn solve(
        &self,
        input: &IntrinsicInput,
        params: &SolverParameters,
    ) -> Result<Decomposition, SolverError> {
        let start = Instant::now();
        let dimensions = input.dimensions();
        if dimensions.is_empty() {
            return Err(ProcessingError::EmptyImage(dimensions).into());
        }
        input.mask.ensure_matches(dimensions)?;
        if input.mask.valid_count() == 0 {
            return Err(ProcessingError::EmptyMask.into());
        }

        let floor = params.min_intensity;
        let intensity = LinearGrayImage::from_fn(dimensions.width, dimensions.height, |x, y| {
            let [r, g, b] = input.image.get_pixel(x, y).0;
            Luma([((r + g + b) / 3.0).max(floor)])
        });

        let sigma = (params.shading_blur_sigma * dimensions.max_side() as f32).max(MIN_SIGMA_PX);
        let mut shading = intensity.clone();

        for iteration in 1..=params.n_iters {
            let blurred = gaussian_blur_f32(&shading, sigma);
            let mut max_change = 0.0f32;

            for ((s, b), i) in shading
                .pixels_mut()
                .zip(blurred.pixels())
                .zip(intensity.pixels())
            {
                let next = b.0[0].max(i.0[0]);
                max_change = max_change.max((next - s.0[0]).abs());
                s.0[0] = next;
            }

            if params.logging {
                debug!(
                    "[{}] envelope iteration {}/{}: max change {:.6}",
                    input.path.display(),
                    iteration,
                    params.n_iters,
                    max_change
                );
            }
        }

        // Mean shading over valid pixels drives the absolute scale
        let flags = input.mask.flags();
        let (sum, count) = shading
            .pixels()
            .zip(flags)
            .filter(|(_, valid)| **valid)
            .fold((0.0f64, 0usize), |(sum, count), (p, _)| {
                (sum + f64::from(p.0[0]), count + 1)
            });
        let mean = (sum / count as f64) as f32;
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SolverError::NotConverged(format!(
                "mean shading is {mean} over {count} valid pixels"
            )));
        }

        let scale = params.abs_shading_gray_point / mean;
        for p in shading.pixels_mut() {
            p.0[0] *= scale;
        }

        let reflectance = LinearRgbImage::from_fn(dimensions.width, dimensions.height, |x, y| {
            let s = shading.get_pixel(x, y).0[0];
            let [r, g, b] = input.image.get_pixel(x, y).0;
            Rgb([r / s, g / s, b / s])
        });

        let shading_range = shading
            .pixels()
            .zip(flags)
            .filter(|(_, valid)| **valid)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (p, _)| {
                (lo.min(p.0[0]), hi.max(p.0[0]))
            });

        if reflectance.as_raw().iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NotConverged(
                "reflectance contains non-finite values".to_string(),
            ));
        }

        Ok(Decomposition {
            reflectance,
            shading,
            metadata: DecompositionMetadata {
                solver: Self::NAME.to_string(),
                iterations: params.n_iters,
                shading_range,
                dimensions,
                elapsed: start.elapsed(),
            },
        })
    }
}
