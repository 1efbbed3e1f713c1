use std::path::PathBuf;

use cloudldb_config::ConfigError;
use cloudldb_object_storage::StorageError;

use crate::process::ProcessError;

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Failures that abort an invocation without a partial result.
///
/// Domain misses and signal-terminated processes are not errors; they are
/// reported through the response envelopes.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("Invalid invocation event: {0}")]
    InvalidEvent(String),
    #[error("Table number {0} does not fit the six digit table file name")]
    TableNumberOutOfRange(u64),
    #[error("Failed to prepare staging area at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Merge executable produced malformed output ({source}): {stdout}")]
    MalformedOutput {
        stdout: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Merge executable reported table number {0}, which has no table file name")]
    MergeTableOutOfRange(u64),
}

impl HandlerError {
    /// True for errors caused by the caller's event rather than by the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HandlerError::InvalidEvent(_) | HandlerError::TableNumberOutOfRange(_)
        )
    }
}
