use std::path::{Path, PathBuf};

use fox_api::PartitionStore;

use crate::error::DownloadError;
use crate::partition::PartitionNaming;

/// Copy every archived partition of the bucket into `out_dir`, byte for byte.
///
/// The directory is emptied first. Objects whose names are not partition
/// names are left alone. The first failure aborts the backup.
pub async fn download_all(
    store: &dyn PartitionStore,
    naming: &PartitionNaming,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, DownloadError> {
    clean_dir(out_dir).await?;

    let mut names: Vec<String> = store
        .list()
        .await
        .map_err(|source| DownloadError::Storage { op: "list", name: String::new(), source })?
        .into_iter()
        .filter(|n| naming.parse(n).is_some())
        .collect();
    names.sort();
    tracing::info!(objects = names.len(), dir = %out_dir.display(), "downloading partitions");

    let mut written = Vec::with_capacity(names.len());
    for name in names {
        let bytes = store
            .fetch(&name)
            .await
            .map_err(|source| DownloadError::Storage { op: "fetch", name: name.clone(), source })?
            .ok_or_else(|| DownloadError::Missing(name.clone()))?;

        let path = out_dir.join(&name);
        tokio::fs::write(&path, &bytes).await.map_err(|source| io_err(&path, source))?;
        tracing::info!(object = %name, bytes = bytes.len(), "downloaded");
        written.push(path);
    }
    Ok(written)
}

async fn clean_dir(dir: &Path) -> Result<(), DownloadError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(dir, e)),
    }
    tokio::fs::create_dir_all(dir).await.map_err(|e| io_err(dir, e))
}

fn io_err(path: &Path, source: std::io::Error) -> DownloadError {
    DownloadError::Io { path: path.display().to_string(), source }
}

#[cfg(test)]
mod tests {
    use storage_memory::{MemoryStore, StoreOp};

    use super::*;
    use crate::partition::SeasonLocale;

    fn naming() -> PartitionNaming {
        PartitionNaming::new(SeasonLocale::French, "fxa")
    }

    #[tokio::test]
    async fn copies_only_partition_objects() {
        let store = MemoryStore::with_objects([
            ("Hiver-2023.fxa".to_string(), vec![1, 2, 3]),
            ("Automne-2023.fxa".to_string(), vec![4]),
            ("readme.md".to_string(), vec![9]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("backup");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("stale.fxa"), b"old").unwrap();

        let written = download_all(&store, &naming(), &out).await.unwrap();

        assert_eq!(written, vec![out.join("Automne-2023.fxa"), out.join("Hiver-2023.fxa")]);
        assert_eq!(std::fs::read(out.join("Hiver-2023.fxa")).unwrap(), vec![1, 2, 3]);
        assert!(!out.join("stale.fxa").exists());
        assert!(!out.join("readme.md").exists());
    }

    #[tokio::test]
    async fn fetch_failure_aborts() {
        let store = MemoryStore::with_objects([("Hiver-2023.fxa".to_string(), vec![1])]);
        store.fail_on(StoreOp::Fetch, "Hiver-2023.fxa").await;
        let dir = tempfile::tempdir().unwrap();

        let err = download_all(&store, &naming(), dir.path()).await.unwrap_err();
        assert!(matches!(err, DownloadError::Storage { op: "fetch", .. }));
    }
}
