//! Progress reporting infrastructure
//!
//! To avoid corrupted terminal output, nothing else should write to stdout
//! or stderr while a report is being displayed. Please use logs for debug
//! messages.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::borrow::Cow;

/// CLI progress report of the ongoing corpus scan
#[derive(Clone, Debug, Default)]
pub struct ProgressReport(MultiProgress);
//
impl ProgressReport {
    /// Prepare to report progress on the cli
    pub fn new() -> Self {
        Self::default()
    }

    /// Start reporting on a counter whose final value is not known up front
    ///
    /// The corpus row count is unbounded by design, so counters display a
    /// running total and throughput rather than a completion percentage.
    pub fn add_counter(&self, what: impl Into<Cow<'static, str>>) -> ProgressCounter {
        let bar = ProgressBar::new_spinner()
            .with_prefix(what.into())
            .with_style(
                ProgressStyle::with_template("{prefix} {human_pos} ({per_sec})")
                    .expect("the template above should be a valid indicatif style"),
            );
        self.0.add(bar.clone());
        ProgressCounter { bar }
    }
}

/// Running counter for one pipeline quantity
#[derive(Clone, Debug)]
pub struct ProgressCounter {
    /// Progress bar for this specific quantity
    bar: ProgressBar,
}
//
impl ProgressCounter {
    /// Record that a certain amount of progress has been made
    pub fn inc(&self, amount: u64) {
        self.bar.inc(amount);
    }

    /// Stop displaying the counter once its quantity is complete
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
