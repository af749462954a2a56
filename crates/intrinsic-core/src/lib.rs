//! Intrinsic Core - Batch intrinsic image decomposition
//!
//! Splits each image of a list into a reflectance map and a shading map,
//! running the per-image pipeline across a bounded pool of worker threads and
//! accounting for every job as it completes.

pub mod batch;
pub mod error;
pub mod executor;
pub mod image_io;
pub mod input;
pub mod job;
pub mod ledger;
pub mod params;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod retinex;
pub mod solver;

pub use batch::{log_result, run_batch};
pub use error::{BatchError, JobError};
pub use executor::{
    default_worker_count, BatchStream, CancelFlag, JobResult, WorkerEvent, WorkerPool,
    MAX_WORKERS,
};
pub use image_io::ImageError;
pub use input::IntrinsicInput;
pub use job::{enumerate_jobs, find_output_collisions, ImageJob, OutputCollision};
pub use ledger::{JobLedger, JobStatus};
pub use params::SolverParameters;
pub use pipeline::{ImagePipeline, JobOutput, JobProcessor};
pub use progress::{Progress, ProgressTracker};
pub use report::{result_json, BatchReport, FailedJob, SucceededJob};
pub use retinex::RetinexSolver;
pub use solver::{Decomposition, DecompositionMetadata, Solver, SolverError};
