//! Error types for batch decomposition

use crate::image_io::ImageError;
use crate::solver::SolverError;
use std::path::PathBuf;
use thiserror::Error;

/// Startup-class failures. Any of these aborts the run before a job executes.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to read image list {}: {source}", .path.display())]
    ImageList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read parameters file {}: {source}", .path.display())]
    ParametersIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed parameters file {}: {reason}", .path.display())]
    ParametersMalformed { path: PathBuf, reason: String },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Per-job failures. Contained at the worker boundary and recorded in the
/// job's result; they never reach sibling jobs.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to load input: {0}")]
    Load(#[source] ImageError),

    #[error("Solver failed: {0}")]
    Solve(#[from] SolverError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error(
        "{} is already used by the job for {}",
        .path.display(),
        .owner.display()
    )]
    OutputCollision { path: PathBuf, owner: PathBuf },

    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("Job cancelled before it started")]
    Cancelled,
}

impl JobError {
    /// Short machine-readable kind, used in JSON reports
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Load(_) => "load",
            JobError::Solve(_) => "solve",
            JobError::Write { .. } => "write",
            JobError::OutputCollision { .. } => "collision",
            JobError::Panicked(_) => "panic",
            JobError::Cancelled => "cancelled",
        }
    }
}
