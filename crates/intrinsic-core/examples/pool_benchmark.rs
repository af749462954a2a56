//! Worker pool scaling benchmark
//!
//! Decomposes a set of synthetic images with 1, 2 and the default number of
//! workers and reports the speedup over the sequential run.
//!
//! Run with: cargo run --release --package intrinsic-core --example pool_benchmark

use image::{Rgb, RgbImage};
use intrinsic_core::{
    run_batch, ImageJob, ImagePipeline, ProgressTracker, RetinexSolver, SolverParameters,
    WorkerPool,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const IMAGE_COUNT: usize = 16;
const IMAGE_SIDE: u32 = 384;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let dir = tempfile::TempDir::new()?;
    let inputs = write_inputs(dir.path())?;

    println!("\n=== Worker Pool Benchmark ===");
    println!("Images: {} ({}x{})", inputs.len(), IMAGE_SIDE, IMAGE_SIDE);
    println!();

    let mut worker_counts = vec![1, 2, intrinsic_core::default_worker_count()];
    worker_counts.sort_unstable();
    worker_counts.dedup();

    let mut baseline = None;
    for workers in worker_counts {
        let elapsed = run(&inputs, workers)?;
        let base = *baseline.get_or_insert(elapsed);
        println!(
            "Workers {}: {:.2}s ({:.3}s per image, {:.2}x speedup)",
            workers,
            elapsed.as_secs_f64(),
            elapsed.as_secs_f64() / inputs.len() as f64,
            base.as_secs_f64() / elapsed.as_secs_f64()
        );
    }

    Ok(())
}

fn write_inputs(dir: &Path) -> Result<Vec<ImageJob>, image::ImageError> {
    (0..IMAGE_COUNT)
        .map(|i| {
            let path = dir.join(format!("synthetic_{i:02}.png"));
            RgbImage::from_fn(IMAGE_SIDE, IMAGE_SIDE, |x, y| {
                let shade = ((x + y + i as u32 * 13) % 256) as u8;
                Rgb([shade, (x % 200) as u8, (y % 150) as u8])
            })
            .save(&path)?;
            Ok(ImageJob::new(i, path))
        })
        .collect()
}

fn run(jobs: &[ImageJob], workers: usize) -> Result<Duration, intrinsic_core::BatchError> {
    let pipeline = Arc::new(ImagePipeline::new(
        Arc::new(RetinexSolver::new()),
        SolverParameters::default(),
    ));
    let pool = WorkerPool::new().with_workers(workers);
    let mut tracker = ProgressTracker::hidden(jobs.len());

    let report = run_batch(&pool, jobs.to_vec(), pipeline, &mut tracker, |_, _| {})?;
    if !report.all_succeeded() {
        eprintln!("{} images failed", report.failed().len());
    }
    Ok(report.elapsed())
}
