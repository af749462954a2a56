//! Property-Based Tests
//!
//! Batch accounting must not depend on the order in which jobs finish.

use intrinsic_common::Dimensions;
use intrinsic_core::{
    BatchReport, DecompositionMetadata, ImageJob, JobError, JobLedger, JobOutput, JobResult,
    JobStatus, ProgressTracker,
};
use proptest::prelude::*;
use std::time::Duration;

fn result_for(index: usize, success: bool) -> JobResult {
    let job = ImageJob::new(index, format!("img{index}.png"));
    let result = if success {
        Ok(JobOutput {
            reflectance: job.reflectance.clone(),
            shading: job.shading.clone(),
            metadata: DecompositionMetadata {
                solver: "property".to_string(),
                iterations: 1,
                shading_range: (0.5, 0.5),
                dimensions: Dimensions::new(1, 1),
                elapsed: Duration::ZERO,
            },
        })
    } else {
        Err(JobError::Panicked(format!("job {index}")))
    };

    JobResult {
        job,
        result,
        processing_time: Duration::from_millis(index as u64),
        worker: Some(index % 4),
    }
}

/// Outcomes per job plus a completion order over them
fn outcomes_and_order() -> impl Strategy<Value = (Vec<bool>, Vec<usize>)> {
    prop::collection::vec(any::<bool>(), 0..40).prop_flat_map(|outcomes| {
        let order: Vec<usize> = (0..outcomes.len()).collect();
        (Just(outcomes), Just(order).prop_shuffle())
    })
}

fn report_in_order(outcomes: &[bool], order: &[usize]) -> BatchReport {
    let mut report = BatchReport::new(outcomes.len());
    for &index in order {
        report.record(result_for(index, outcomes[index]));
    }
    report.finish(Duration::from_secs(1));
    report
}

/// Property: the report is identical for any completion order
#[test]
fn proptest_report_independent_of_completion_order() {
    proptest!(|((outcomes, order) in outcomes_and_order())| {
        let submission: Vec<usize> = (0..outcomes.len()).collect();
        let expected = report_in_order(&outcomes, &submission);
        let shuffled = report_in_order(&outcomes, &order);

        let ids = |r: &BatchReport| -> (Vec<usize>, Vec<usize>) {
            (
                r.succeeded().iter().map(|s| s.job.index).collect(),
                r.failed().iter().map(|f| f.job.index).collect(),
            )
        };

        prop_assert_eq!(ids(&expected), ids(&shuffled));
        prop_assert!(shuffled.is_complete());
        prop_assert_eq!(
            shuffled.succeeded().len(),
            outcomes.iter().filter(|ok| **ok).count()
        );
    });
}

/// Property: progress and ledger end in the same place for any order
#[test]
fn proptest_progress_and_ledger_reach_total() {
    proptest!(|((outcomes, order) in outcomes_and_order())| {
        let mut tracker = ProgressTracker::hidden(outcomes.len());
        let mut ledger = JobLedger::new(outcomes.len());
        let mut last = 0;

        for &index in &order {
            ledger.advance(index, JobStatus::Running).unwrap();
            let status = if outcomes[index] { JobStatus::Completed } else { JobStatus::Failed };
            ledger.advance(index, status).unwrap();

            let progress = tracker.observe(outcomes[index]);
            prop_assert!(progress.completed > last);
            prop_assert!(progress.completed <= progress.total);
            last = progress.completed;
        }

        prop_assert!(tracker.is_finished());
        prop_assert!(ledger.all_terminal());
        prop_assert_eq!(ledger.count(JobStatus::Completed), tracker.succeeded());
        prop_assert_eq!(ledger.count(JobStatus::Failed), tracker.failed());
    });
}
