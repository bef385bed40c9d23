//! Record loading and persistence errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// The record exists but does not follow the layout. The fixture store is corrupt.
    #[error("malformed record at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },
    #[error("failed to replace record: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl RecordError {
    pub(crate) fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            message: message.into(),
        }
    }
}
