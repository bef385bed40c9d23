//! Report generation for golden-test batches.

use serde::{Deserialize, Serialize};

use crate::stats::RunStats;

/// A batch report: where it ran, when, and how it went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    /// File or directory the batch ran against.
    pub target: String,
    /// Build mode labels evaluated for building fixtures.
    pub modes: Vec<String>,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub stats: RunStats,
}

impl RunReport {
    #[must_use]
    pub fn new(target: impl Into<String>, modes: Vec<String>, stats: RunStats) -> Self {
        Self {
            title: String::from("Neon Golden Test Report"),
            target: target.into(),
            modes,
            timestamp: crate::structured_log::now_utc(),
            stats,
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Target: `{}`\n", self.target));
        out.push_str(&format!("- Modes: {}\n", self.modes.join(", ")));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Passed: {}\n", self.stats.passed));
        out.push_str(&format!("- Ignored: {}\n", self.stats.ignored));
        out.push_str(&format!("- Failed: {}\n", self.stats.failed));

        if !self.stats.failed_files.is_empty() {
            out.push_str("\n## Failed\n\n");
            for label in &self.stats.failed_files {
                out.push_str(&format!("- {label}\n"));
            }
        }
        if !self.stats.ignored_files.is_empty() {
            out.push_str("\n## Ignored (no record)\n\n");
            for label in &self.stats.ignored_files {
                out.push_str(&format!("- {label}\n"));
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
