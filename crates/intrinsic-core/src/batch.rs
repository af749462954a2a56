//! Batch coordinator
//!
//! Runs on the calling thread: submits every job to the pool, then consumes
//! worker events as they arrive, feeding the ledger, the progress tracker and
//! the report. Returns once every job has a terminal result.

use crate::error::{BatchError, JobError};
use crate::executor::{JobResult, WorkerEvent, WorkerPool};
use crate::job::{find_output_collisions, ImageJob, OutputCollision};
use crate::ledger::{JobLedger, JobStatus};
use crate::pipeline::JobProcessor;
use crate::progress::{Progress, ProgressTracker};
use crate::report::BatchReport;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Run `jobs` to completion
///
/// Jobs whose files clash with an earlier job fail up front with
/// [`JobError::OutputCollision`] and never reach the pool. `on_result` is
/// called once per job, in completion order, with the progress bar suspended
/// so it can print freely.
pub fn run_batch<P, F>(
    pool: &WorkerPool,
    jobs: Vec<ImageJob>,
    processor: Arc<P>,
    tracker: &mut ProgressTracker,
    mut on_result: F,
) -> Result<BatchReport, BatchError>
where
    P: JobProcessor + ?Sized + 'static,
    F: FnMut(&JobResult, Progress),
{
    let total = jobs.len();
    let mut ledger = JobLedger::new(total);
    let mut report = BatchReport::new(total);
    let start_time = Instant::now();

    let mut collisions: HashMap<usize, OutputCollision> = find_output_collisions(&jobs)
        .into_iter()
        .map(|c| (c.index, c))
        .collect();
    let (rejected, runnable): (Vec<_>, Vec<_>) = jobs
        .into_iter()
        .partition(|job| collisions.contains_key(&job.index));

    for job in rejected {
        let Some(collision) = collisions.remove(&job.index) else {
            continue;
        };
        let result = JobResult {
            job,
            result: Err(JobError::OutputCollision {
                path: collision.path,
                owner: collision.owner,
            }),
            processing_time: Duration::ZERO,
            worker: None,
        };
        settle(result, &mut ledger, tracker, &mut report, &mut on_result);
    }

    let stream = pool.execute(runnable, processor)?;

    while let Some(event) = stream.recv() {
        match event {
            WorkerEvent::Started { index, .. } => {
                if let Err(e) = ledger.advance(index, JobStatus::Running) {
                    warn!("{}", e);
                }
            }
            WorkerEvent::Finished(result) => {
                settle(result, &mut ledger, tracker, &mut report, &mut on_result);
            }
        }
    }

    stream.join();
    tracker.finish();

    if !ledger.all_terminal() {
        warn!(
            "{} of {} jobs never reached a terminal state",
            total - ledger.count(JobStatus::Completed) - ledger.count(JobStatus::Failed),
            total
        );
    }

    report.finish(start_time.elapsed());
    Ok(report)
}

/// Move one finished job into its terminal state everywhere it is tracked
fn settle<F>(
    result: JobResult,
    ledger: &mut JobLedger,
    tracker: &mut ProgressTracker,
    report: &mut BatchReport,
    on_result: &mut F,
) where
    F: FnMut(&JobResult, Progress),
{
    let status = if result.is_success() {
        JobStatus::Completed
    } else {
        JobStatus::Failed
    };
    if let Err(e) = ledger.advance(result.job.index, status) {
        warn!("{}", e);
    }

    let progress = tracker.observe(result.is_success());
    tracker.suspend(|| on_result(&result, progress));
    report.record(result);
}

/// Default per-job log line: `✓ [n/N] path - 1.23s` or `✗ ... FAILED: why`
pub fn log_result(result: &JobResult, progress: Progress) {
    match &result.result {
        Ok(_) => info!(
            "✓ [{}/{}] {} - {:.2}s",
            progress.completed,
            progress.total,
            result.job.input.display(),
            result.processing_time.as_secs_f64()
        ),
        Err(error) => warn!(
            "✗ [{}/{}] {} - FAILED: {}",
            progress.completed,
            progress.total,
            result.job.input.display(),
            error
        ),
    }
}
