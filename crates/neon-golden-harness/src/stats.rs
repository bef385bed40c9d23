//! Batch accumulator.

use serde::{Deserialize, Serialize};

/// Aggregate counters for one batch invocation.
///
/// Owned by the driver and threaded through the engine by `&mut`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub passed: usize,
    pub failed: usize,
    pub ignored: usize,
    /// Labels of ignored fixtures, in resolution order.
    pub ignored_files: Vec<String>,
    /// Labels of failed fixture modes, in resolution order.
    pub failed_files: Vec<String>,
}

impl RunStats {
    pub fn record_pass(&mut self) {
        self.passed += 1;
    }

    pub fn record_failure(&mut self, label: impl Into<String>) {
        self.failed += 1;
        self.failed_files.push(label.into());
    }

    pub fn record_ignored(&mut self, label: impl Into<String>) {
        self.ignored += 1;
        self.ignored_files.push(label.into());
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
