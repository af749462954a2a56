//! Per-image pipeline: load → solve → persist

use crate::error::JobError;
use crate::image_io::{save_gray, save_rgb};
use crate::input::IntrinsicInput;
use crate::job::ImageJob;
use crate::params::SolverParameters;
use crate::solver::{DecompositionMetadata, Solver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Files written by a successful job
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    pub reflectance: PathBuf,
    pub shading: PathBuf,
    pub metadata: DecompositionMetadata,
}

/// Anything the worker pool can run a job through
pub trait JobProcessor: Send + Sync {
    fn process(&self, job: &ImageJob) -> Result<JobOutput, JobError>;
}

/// The decomposition pipeline shared read-only by every worker
pub struct ImagePipeline {
    solver: Arc<dyn Solver>,
    params: Arc<SolverParameters>,
    is_srgb: bool,
}

impl ImagePipeline {
    /// Build a pipeline around a solver. Inputs are treated as sRGB.
    pub fn new(solver: Arc<dyn Solver>, params: SolverParameters) -> Self {
        Self {
            solver,
            params: Arc::new(params),
            is_srgb: true,
        }
    }

    #[must_use]
    pub fn params(&self) -> &SolverParameters {
        &self.params
    }

    #[must_use]
    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }
}

impl JobProcessor for ImagePipeline {
    fn process(&self, job: &ImageJob) -> Result<JobOutput, JobError> {
        let start_time = Instant::now();
        let file_name = job
            .input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        let input =
            IntrinsicInput::from_file(&job.input, self.is_srgb, None, None).map_err(JobError::Load)?;

        debug!("[FILE {}] Solving with {}", file_name, self.solver.name());
        let decomposition = self.solver.solve(&input, &self.params)?;
        debug!(
            "[FILE {}] Solver finished in {:.2}s",
            file_name,
            decomposition.metadata.elapsed.as_secs_f64()
        );

        // A failed job leaves no outputs behind
        if let Err(source) = save_rgb(
            &job.reflectance,
            &decomposition.reflectance,
            Some(&input.mask),
            true,
            self.is_srgb,
        ) {
            remove_partial_output(&job.reflectance, file_name);
            return Err(JobError::Write {
                path: job.reflectance.clone(),
                source,
            });
        }

        if let Err(source) = save_gray(
            &job.shading,
            &decomposition.shading,
            Some(&input.mask),
            true,
            self.is_srgb,
        ) {
            remove_partial_output(&job.shading, file_name);
            remove_partial_output(&job.reflectance, file_name);
            return Err(JobError::Write {
                path: job.shading.clone(),
                source,
            });
        }

        debug!(
            "[FILE {}] Pipeline completed in {:.2}s",
            file_name,
            start_time.elapsed().as_secs_f64()
        );

        Ok(JobOutput {
            reflectance: job.reflectance.clone(),
            shading: job.shading.clone(),
            metadata: decomposition.metadata,
        })
    }
}

/// Delete a file a failed write may have left behind
///
/// Only regular files are touched; a missing path is not an error.
fn remove_partial_output(path: &Path, file_name: &str) {
    if !path.is_file() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        warn!(
            "[FILE {}] Could not remove {}: {}",
            file_name,
            path.display(),
            e
        );
    }
}
