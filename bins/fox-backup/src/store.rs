use std::sync::Arc;

use fox_api::PartitionStore;
use storage_file::FileStore;
use storage_memory::MemoryStore;
use storage_s3::S3Store;

use crate::config::StorageConfig;
use crate::error::BackupError;

/// Open the configured bucket.
pub async fn open(cfg: &StorageConfig) -> Result<Arc<dyn PartitionStore>, BackupError> {
    let store: Arc<dyn PartitionStore> = match cfg {
        StorageConfig::S3(s3) => {
            let store = S3Store::new(s3).await?;
            tracing::info!(backend = "s3", bucket = %s3.bucket, endpoint = ?s3.endpoint, "opened store");
            Arc::new(store)
        }
        StorageConfig::File(file) => {
            tracing::info!(backend = "file", dir = %file.dir, "opened store");
            Arc::new(FileStore::from(file))
        }
        StorageConfig::Memory => {
            tracing::warn!(backend = "memory", "store is not persistent, results are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
