//! Fatal harness errors.
//!
//! Fixture mismatches are not errors: they are counted in [`crate::RunStats`]
//! and the batch continues. The variants here abort the batch.

use std::path::PathBuf;

use neon_golden_record::RecordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("record {}: {source}", path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: RecordError,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("target and output cannot be the same ({})", .0.display())]
    SameTargetAndOutput(PathBuf),
    #[error("{} does not exist", .0.display())]
    MissingTarget(PathBuf),
    #[error("{} is not a `.{extension}` fixture", path.display())]
    NotAFixture { path: PathBuf, extension: String },
    #[error("updating input requires a single fixture file, got {}", .0.display())]
    InputRequiresFile(PathBuf),
    #[error("structured log: {0}")]
    Log(#[source] std::io::Error),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn record(path: impl Into<PathBuf>, source: RecordError) -> Self {
        Self::Record {
            path: path.into(),
            source,
        }
    }
}
