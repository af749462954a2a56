//! Decomposition solver interface
//!
//! The batch layer treats the solver as an opaque, possibly long-running call:
//! one [`IntrinsicInput`] and one [`SolverParameters`] in, one
//! [`Decomposition`] out. Anything implementing [`Solver`] can be dropped into
//! the pipeline without touching orchestration.

use crate::input::IntrinsicInput;
use crate::params::SolverParameters;
use intrinsic_common::{Dimensions, LinearGrayImage, LinearRgbImage, ProcessingError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a solver
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ProcessingError),

    #[error("Solver did not converge: {0}")]
    NotConverged(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

/// Auxiliary information about a decomposition
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionMetadata {
    /// Name of the solver that produced the decomposition
    pub solver: String,

    /// Iterations actually run
    pub iterations: u32,

    /// Minimum and maximum shading over valid pixels
    pub shading_range: (f32, f32),

    /// Raster size
    pub dimensions: Dimensions,

    /// Wall time spent inside the solver
    pub elapsed: Duration,
}

/// Result of decomposing one image: `image ≈ reflectance × shading`
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub reflectance: LinearRgbImage,
    pub shading: LinearGrayImage,
    pub metadata: DecompositionMetadata,
}

/// Intrinsic image decomposition backend
pub trait Solver: Send + Sync {
    /// Solver name (used in logs and reports)
    fn name(&self) -> &str;

    /// Decompose one image. May run for a long, input-size-dependent time.
    fn solve(
        &self,
        input: &IntrinsicInput,
        params: &SolverParameters,
    ) -> Result<Decomposition, SolverError>;
}
