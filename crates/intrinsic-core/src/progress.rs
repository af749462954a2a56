//! Completion progress
//!
//! Counts completions, not submissions, against a fixed total. Success and
//! failure both advance the count by one, in whatever order they arrive.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}";

/// Snapshot of progress after an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Monotonic completed/total counter with an optional terminal progress bar
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Tracker that draws a progress bar on stderr
    #[must_use]
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self::with_bar(total, bar)
    }

    /// Tracker that counts without drawing anything
    #[must_use]
    pub fn hidden(total: usize) -> Self {
        Self::with_bar(total, ProgressBar::hidden())
    }

    fn with_bar(total: usize, bar: ProgressBar) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            failed: 0,
            bar,
        }
    }

    /// Record one finished job
    ///
    /// Observations past the total are ignored; the count never exceeds it.
    pub fn observe(&mut self, succeeded: bool) -> Progress {
        if self.completed >= self.total {
            warn!(
                "Ignoring completion beyond total ({}/{})",
                self.completed, self.total
            );
            return self.progress();
        }

        self.completed += 1;
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.bar.set_message(format!("{} failed", self.failed));
        }
        self.bar.inc(1);
        self.progress()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }

    /// Run `f` with the bar hidden so log lines do not interleave with it
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// Leave the final count on screen
    pub fn finish(&self) {
        self.bar.finish();
    }
}
