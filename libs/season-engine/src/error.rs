use fox_api::PluginError;

use crate::codec::CodecError;

/// Errors from the pure partitioning logic.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("timestamp {0} is outside the representable calendar range")]
    InvalidTimestamp(u64),
}

/// Failure scoped to a single partition. Collected in the report; never stops
/// the other partitions of the run.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("storage {op}: {source}")]
    Storage { op: &'static str, source: PluginError },

    #[error("storage {op}: timed out")]
    Timeout { op: &'static str },

    #[error("payload width mismatch: configured {expected}, artifact has {found}")]
    FormatMismatch { expected: usize, found: usize },

    #[error("decode: {0}")]
    Decode(CodecError),

    #[error("encode: {0}")]
    Encode(CodecError),
}

impl PartitionError {
    /// Decoding failures keep the width disagreement as its own variant.
    pub(crate) fn from_decode(e: CodecError) -> Self {
        match e {
            CodecError::FormatMismatch { expected, found } => Self::FormatMismatch { expected, found },
            other => Self::Decode(other),
        }
    }

    /// Whether the next scheduled run could reasonably succeed without
    /// anyone touching the data.
    pub fn is_transient(&self) -> bool {
        match self {
            PartitionError::Timeout { .. } => true,
            PartitionError::Storage { source, .. } => source.kind().is_transient(),
            _ => false,
        }
    }
}

/// Failure that aborts the whole run before any write happens.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("fetch messages: {0}")]
    Fetch(PluginError),

    #[error("list partitions: {0}")]
    List(PluginError),

    #[error("list partitions: timed out")]
    ListTimeout,

    #[error("partitioning: {0}")]
    Partitioning(#[from] EngineError),

    #[error("partition worker: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Failure of a bucket backup; the first one aborts the download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("storage {op} ({name}): {source}")]
    Storage { op: &'static str, name: String, source: PluginError },

    #[error("object {0} vanished between list and fetch")]
    Missing(String),

    #[error("local io ({path}): {source}")]
    Io { path: String, source: std::io::Error },
}
