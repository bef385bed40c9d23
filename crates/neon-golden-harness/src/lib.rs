//! Golden-file test harness for the Neon compiler.
//!
//! This crate provides:
//! - Execution engine: build each fixture, run it, compare against its record
//! - Recorder: capture actual toolchain behavior into records
//! - Crash detection: a signal-terminated compiler is always a distinct failure
//! - Console and structured JSONL logging, plus markdown/JSON batch reports

#![forbid(unsafe_code)]

pub mod config;
pub mod console;
pub mod diff;
pub mod engine;
pub mod error;
pub mod process;
pub mod recorder;
pub mod report;
pub mod stats;
pub mod structured_log;
pub mod walk;

pub use config::{BuildMode, HarnessConfig, Palette};
pub use engine::{Engine, Failure, Mismatch, ModeResult, Verdict};
pub use error::HarnessError;
pub use recorder::{RecordOutcome, Recorder};
pub use report::RunReport;
pub use stats::RunStats;
