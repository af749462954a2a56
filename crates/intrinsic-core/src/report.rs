//! Final batch accounting
//!
//! Results are recorded in completion order and sorted by submission index
//! when the batch finishes, so nothing downstream depends on which job
//! happened to finish first.

use crate::executor::JobResult;
use crate::job::ImageJob;
use crate::pipeline::JobOutput;
use serde::Serialize;
use std::time::Duration;

/// A job that wrote both outputs
#[derive(Debug, Clone, Serialize)]
pub struct SucceededJob {
    pub job: ImageJob,
    pub output: JobOutput,
    pub processing_time: Duration,
}

/// A job that ended in an error
#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub job: ImageJob,
    pub kind: &'static str,
    pub error: String,
    pub processing_time: Duration,
}

/// Succeeded/failed breakdown of a finished batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    total: usize,
    succeeded: Vec<SucceededJob>,
    failed: Vec<FailedJob>,
    elapsed: Duration,
}

impl BatchReport {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Record one job result, in any order
    pub fn record(&mut self, result: JobResult) {
        let JobResult {
            job,
            result,
            processing_time,
            ..
        } = result;

        match result {
            Ok(output) => self.succeeded.push(SucceededJob {
                job,
                output,
                processing_time,
            }),
            Err(error) => self.failed.push(FailedJob {
                job,
                kind: error.kind(),
                error: error.to_string(),
                processing_time,
            }),
        }
    }

    /// Seal the report with the batch wall time
    pub fn finish(&mut self, elapsed: Duration) {
        self.succeeded.sort_by_key(|s| s.job.index);
        self.failed.sort_by_key(|f| f.job.index);
        self.elapsed = elapsed;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn succeeded(&self) -> &[SucceededJob] {
        &self.succeeded
    }

    #[must_use]
    pub fn failed(&self) -> &[FailedJob] {
        &self.failed
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Every submitted job has a recorded outcome
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.succeeded.len() + self.failed.len() == self.total
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.is_complete()
    }

    /// Succeeded jobs per second of wall time
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.succeeded.len() as f64 / secs
        } else {
            0.0
        }
    }

    /// Summary object, the last line of the JSONL output
    #[must_use]
    pub fn summary_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "summary",
            "total_files": self.total,
            "completed": self.succeeded.len(),
            "failed": self.failed.len(),
            "total_time_s": self.elapsed.as_secs_f64(),
            "throughput_files_per_sec": self.throughput(),
        })
    }
}

/// JSON line for one finished job, written as soon as the job completes
#[must_use]
pub fn result_json(result: &JobResult) -> serde_json::Value {
    let job = &result.job;
    match &result.result {
        Ok(output) => serde_json::json!({
            "type": "success",
            "index": job.index,
            "file": job.input.display().to_string(),
            "reflectance": output.reflectance.display().to_string(),
            "shading": output.shading.display().to_string(),
            "solver": output.metadata.solver,
            "iterations": output.metadata.iterations,
            "processing_time_ms": result.processing_time.as_millis(),
        }),
        Err(error) => serde_json::json!({
            "type": "error",
            "index": job.index,
            "file": job.input.display().to_string(),
            "kind": error.kind(),
            "error": error.to_string(),
            "processing_time_ms": result.processing_time.as_millis(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::solver::DecompositionMetadata;
    use intrinsic_common::Dimensions;

    fn success(index: usize, name: &str) -> JobResult {
        let job = ImageJob::new(index, name);
        JobResult {
            result: Ok(JobOutput {
                reflectance: job.reflectance.clone(),
                shading: job.shading.clone(),
                metadata: DecompositionMetadata {
                    solver: "test".to_string(),
                    iterations: 1,
                    shading_range: (0.1, 0.9),
                    dimensions: Dimensions::new(2, 2),
                    elapsed: Duration::from_millis(3),
                },
            }),
            job,
            processing_time: Duration::from_millis(5),
            worker: Some(0),
        }
    }

    fn failure(index: usize, name: &str) -> JobResult {
        JobResult {
            job: ImageJob::new(index, name),
            result: Err(JobError::Panicked("boom".to_string())),
            processing_time: Duration::from_millis(1),
            worker: Some(1),
        }
    }

    #[test]
    fn test_sorted_by_submission_index() {
        let mut report = BatchReport::new(4);
        report.record(success(3, "d.png"));
        report.record(failure(2, "c.png"));
        report.record(success(0, "a.png"));
        report.record(failure(1, "b.png"));
        report.finish(Duration::from_secs(2));

        let succeeded: Vec<_> = report.succeeded().iter().map(|s| s.job.index).collect();
        let failed: Vec<_> = report.failed().iter().map(|f| f.job.index).collect();
        assert_eq!(succeeded, vec![0, 3]);
        assert_eq!(failed, vec![1, 2]);
        assert!(report.is_complete());
        assert!(!report.all_succeeded());
        assert!((report.throughput() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_failure_keeps_kind_and_message() {
        let mut report = BatchReport::new(1);
        report.record(failure(0, "a.png"));
        report.finish(Duration::ZERO);

        let failed = &report.failed()[0];
        assert_eq!(failed.kind, "panic");
        assert!(failed.error.contains("boom"));
        assert_eq!(report.throughput(), 0.0);
    }

    #[test]
    fn test_incomplete_report() {
        let mut report = BatchReport::new(2);
        report.record(success(0, "a.png"));
        assert!(!report.is_complete());
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_result_json_lines() {
        let ok = result_json(&success(0, "a.png"));
        assert_eq!(ok["type"], "success");
        assert_eq!(ok["index"], 0);
        assert_eq!(ok["reflectance"], "a-r.png");
        assert_eq!(ok["shading"], "a-s.png");

        let err = result_json(&failure(1, "b.png"));
        assert_eq!(err["type"], "error");
        assert_eq!(err["kind"], "panic");
        assert!(err["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn test_summary_json_counts() {
        let mut report = BatchReport::new(2);
        report.record(failure(1, "b.png"));
        report.record(success(0, "a.png"));
        report.finish(Duration::from_millis(500));

        let summary = report.summary_json();
        assert_eq!(summary["type"], "summary");
        assert_eq!(summary["total_files"], 2);
        assert_eq!(summary["completed"], 1);
        assert_eq!(summary["failed"], 1);
    }
}
