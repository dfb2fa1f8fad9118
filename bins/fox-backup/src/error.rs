#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("storage: {0}")]
    Storage(#[from] fox_api::PluginError),

    #[error("{0}")]
    Sync(#[from] season_engine::SyncError),

    #[error("download: {0}")]
    Download(#[from] season_engine::DownloadError),

    /// The run went through, but some partitions were not brought up to date.
    #[error("{failed} of {total} partitions failed")]
    PartitionsFailed { failed: usize, total: usize },
}

impl BackupError {
    pub fn config(context: &'static str, detail: impl Into<String>) -> Self {
        Self::Config { context, detail: detail.into() }
    }

    /// 2 = partial failure, 1 = the run did not happen.
    pub fn exit_code(&self) -> i32 {
        match self {
            BackupError::PartitionsFailed { .. } => 2,
            _ => 1,
        }
    }
}
