//! Per-job lifecycle tracking
//!
//! Each job moves Pending → Running → {Completed, Failed}. Completed and
//! Failed are terminal. The ledger is owned by the coordinating thread and
//! fed from worker events, so it never needs a lock.

use serde::Serialize;
use thiserror::Error;

/// Lifecycle state of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self → next` is a legal transition
    #[must_use]
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                // A job cancelled before it started fails without running
                | (JobStatus::Pending, JobStatus::Failed)
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown job index {0}")]
    UnknownJob(usize),

    #[error("Illegal transition for job {index}: {from:?} -> {to:?}")]
    IllegalTransition {
        index: usize,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Status table indexed by job submission index
#[derive(Debug, Clone)]
pub struct JobLedger {
    statuses: Vec<JobStatus>,
}

impl JobLedger {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            statuses: vec![JobStatus::Pending; total],
        }
    }

    pub fn advance(&mut self, index: usize, next: JobStatus) -> Result<(), LedgerError> {
        let current = self
            .statuses
            .get_mut(index)
            .ok_or(LedgerError::UnknownJob(index))?;

        if !current.can_advance_to(next) {
            return Err(LedgerError::IllegalTransition {
                index,
                from: *current,
                to: next,
            });
        }

        *current = next;
        Ok(())
    }

    #[must_use]
    pub fn status(&self, index: usize) -> Option<JobStatus> {
        self.statuses.get(index).copied()
    }

    #[must_use]
    pub fn count(&self, status: JobStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }

    /// True once every job reached a terminal state
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.statuses.iter().all(|s| s.is_terminal())
    }
}
