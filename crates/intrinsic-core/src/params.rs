//! Solver parameters
//!
//! Parameters come either from a file (`.yaml`/`.yml` as YAML, anything else
//! as JSON) or from [`SolverParameters::default`]. Unknown keys are rejected so
//! a typo in a parameters file fails the run instead of silently using a
//! default.

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Tunables for the decomposition solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverParameters {
    /// Number of envelope-refinement iterations
    pub n_iters: u32,

    /// Shading blur sigma as a fraction of the larger image side
    pub shading_blur_sigma: f32,

    /// Target mean shading over valid pixels
    pub abs_shading_gray_point: f32,

    /// Intensity floor, keeps the reflectance division finite
    pub min_intensity: f32,

    /// Per-iteration diagnostic logging
    pub logging: bool,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            n_iters: 10,
            shading_blur_sigma: 0.05,
            abs_shading_gray_point: 0.5,
            min_intensity: 1e-4,
            logging: false,
        }
    }
}

impl SolverParameters {
    /// Parse and validate a parameters file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| BatchError::ParametersIo {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let params: SolverParameters = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&contents).map_err(|e| e.to_string())
        }
        .map_err(|reason| BatchError::ParametersMalformed {
            path: path.to_path_buf(),
            reason,
        })?;

        params.validate()?;
        debug!("Loaded solver parameters from {}: {:?}", path.display(), params);
        Ok(params)
    }

    /// Resolve the run configuration: the file when given, defaults otherwise.
    /// Logging is forced on for every run.
    pub fn resolve(path: Option<&Path>) -> Result<Self, BatchError> {
        let mut params = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        params.logging = true;
        Ok(params)
    }

    /// Reject values the solver cannot work with
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.n_iters == 0 {
            return Err(BatchError::InvalidParameter {
                name: "n_iters",
                reason: "must be at least 1".to_string(),
            });
        }
        Self::positive("shading_blur_sigma", self.shading_blur_sigma)?;
        Self::positive("abs_shading_gray_point", self.abs_shading_gray_point)?;
        Self::positive("min_intensity", self.min_intensity)?;
        Ok(())
    }

    fn positive(name: &'static str, value: f32) -> Result<(), BatchError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(BatchError::InvalidParameter {
                name,
                reason: format!("must be a positive finite number, got {value}"),
            })
        }
    }
}
