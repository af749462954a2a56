//! Bounded worker pool
//!
//! Jobs go onto a queue up front; each worker thread pulls the next job when
//! it goes idle and reports back over an event channel. Events arrive in
//! completion order, which is not submission order.
//!
//! # Isolation
//!
//! Workers share nothing mutable: the processor is behind an `Arc` and only
//! borrowed immutably, and results travel by message. Every job runs inside
//! `catch_unwind`, so a panicking job becomes a failed result instead of
//! taking its worker down.

use crate::error::{BatchError, JobError};
use crate::job::ImageJob;
use crate::pipeline::{JobOutput, JobProcessor};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Hard cap on worker threads
pub const MAX_WORKERS: usize = 4;

/// `min(MAX_WORKERS, host CPUs)`, at least one
#[must_use]
pub fn default_worker_count() -> usize {
    MAX_WORKERS.min(num_cpus::get()).max(1)
}

/// Outcome of one job
#[derive(Debug)]
pub struct JobResult {
    /// The job this result belongs to
    pub job: ImageJob,

    /// Written outputs, or why the job failed
    pub result: Result<JobOutput, JobError>,

    /// Wall time for this job
    pub processing_time: Duration,

    /// Worker that ran the job, `None` when it was rejected before dispatch
    pub worker: Option<usize>,
}

impl JobResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Message from a worker to the coordinator
#[derive(Debug)]
pub enum WorkerEvent {
    /// A worker picked up a job
    Started { index: usize, worker: usize },

    /// A job reached a terminal state
    Finished(JobResult),
}

/// Shared cancellation flag, checked by workers between jobs
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed-size pool of worker threads
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    cancel: CancelFlag,
}

impl WorkerPool {
    /// Pool sized to [`default_worker_count`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: default_worker_count(),
            cancel: CancelFlag::default(),
        }
    }

    /// Request a smaller pool. Clamped to `1..=default_worker_count()`.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, default_worker_count());
        self
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Handle for cancelling the jobs that have not started yet
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Start running `jobs` through `processor`
    ///
    /// Returns immediately with a stream of worker events. Every job yields
    /// exactly one [`WorkerEvent::Finished`]; the stream ends after the last.
    pub fn execute<P>(
        &self,
        jobs: Vec<ImageJob>,
        processor: Arc<P>,
    ) -> Result<BatchStream, BatchError>
    where
        P: JobProcessor + ?Sized + 'static,
    {
        let total = jobs.len();
        let (job_tx, job_rx) = unbounded::<ImageJob>();
        let (event_tx, event_rx) = unbounded::<WorkerEvent>();

        let unqueued = queue_jobs(jobs, &job_tx);
        drop(job_tx);
        for job in unqueued {
            warn!("Job {} could not be queued: {}", job.index, job.input.display());
            let result = JobResult {
                job,
                result: Err(JobError::Cancelled),
                processing_time: Duration::ZERO,
                worker: None,
            };
            // `event_rx` is still held here, so the event channel is connected
            if let Err(e) = event_tx.send(WorkerEvent::Finished(result)) {
                warn!("Dropped result for job {}", job_index(&e.0));
            }
        }

        let spawn_count = self.workers.min(total);
        info!("=== Worker Pool Started ===");
        info!("Total jobs: {}", total);
        info!("Workers: {} (cap {})", spawn_count, self.workers);

        let mut handles = Vec::with_capacity(spawn_count);
        for worker in 0..spawn_count {
            let job_rx = job_rx.clone();
            let event_tx = event_tx.clone();
            let processor = Arc::clone(&processor);
            let cancel = self.cancel.clone();

            let spawned = thread::Builder::new()
                .name(format!("intrinsic-worker-{worker}"))
                .spawn(move || worker_loop(worker, &job_rx, &event_tx, &*processor, &cancel));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Drain whatever the already-running workers would pick up
                    self.cancel.cancel();
                    return Err(BatchError::WorkerSpawn(e));
                }
            }
        }

        Ok(BatchStream {
            events: event_rx,
            handles,
            total,
            workers: spawn_count,
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Push every job onto the queue, in order
///
/// Returns the jobs that could not be queued because every receiver is gone,
/// starting with the one whose send failed.
fn queue_jobs(jobs: Vec<ImageJob>, queue: &Sender<ImageJob>) -> Vec<ImageJob> {
    let mut jobs = jobs.into_iter();
    for job in jobs.by_ref() {
        if let Err(rejected) = queue.send(job) {
            let mut unqueued = vec![rejected.into_inner()];
            unqueued.extend(jobs);
            return unqueued;
        }
    }
    Vec::new()
}

fn job_index(event: &WorkerEvent) -> usize {
    match event {
        WorkerEvent::Started { index, .. } => *index,
        WorkerEvent::Finished(result) => result.job.index,
    }
}

fn worker_loop<P>(
    worker: usize,
    jobs: &Receiver<ImageJob>,
    events: &Sender<WorkerEvent>,
    processor: &P,
    cancel: &CancelFlag,
) where
    P: JobProcessor + ?Sized,
{
    for job in jobs.iter() {
        let start_time = Instant::now();

        let result = if cancel.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            let started = WorkerEvent::Started {
                index: job.index,
                worker,
            };
            if events.send(started).is_err() {
                break;
            }
            debug!("[worker {}] job {}: {}", worker, job.index, job.input.display());
            run_isolated(processor, &job)
        };

        let finished = WorkerEvent::Finished(JobResult {
            job,
            result,
            processing_time: start_time.elapsed(),
            worker: Some(worker),
        });
        if events.send(finished).is_err() {
            // Coordinator is gone, nobody is listening for the rest
            break;
        }
    }
}

/// Run one job, turning a panic into a failed result
fn run_isolated<P>(processor: &P, job: &ImageJob) -> Result<JobOutput, JobError>
where
    P: JobProcessor + ?Sized,
{
    panic::catch_unwind(AssertUnwindSafe(|| processor.process(job)))
        .unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Events from a running pool, in completion order
pub struct BatchStream {
    events: Receiver<WorkerEvent>,
    handles: Vec<JoinHandle<()>>,
    total: usize,
    workers: usize,
}

impl BatchStream {
    /// Number of jobs submitted
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of worker threads actually spawned
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Block until the next event; `None` once every worker has exited
    pub fn recv(&self) -> Option<WorkerEvent> {
        self.events.recv().ok()
    }

    /// Wait for every worker thread to exit
    pub fn join(self) {
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!("Worker thread {} terminated abnormally", name);
            }
        }
    }
}

impl Iterator for BatchStream {
    type Item = WorkerEvent;

    fn next(&mut self) -> Option<WorkerEvent> {
        self.recv()
    }
}
