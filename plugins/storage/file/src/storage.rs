use std::future::Future;
use std::io::ErrorKind as IoKind;
use std::path::PathBuf;
use std::pin::Pin;

use fox_api::{PartitionStore, PluginError};

/// Suffix of in-progress writes; never reported by `list`.
const PARTIAL_SUFFIX: &str = ".partial";

// ════════════════════════════════════════════════════════════════
//  FileStore
// ════════════════════════════════════════════════════════════════

/// Directory used as a flat bucket. Object names map to file names directly.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Путь к объекту. Имена с разделителями пути не принимаются.
    fn object_path(&self, name: &str) -> Result<PathBuf, PluginError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(PluginError::config(format!("invalid object name '{name}'")));
        }
        Ok(self.dir.join(name))
    }

    async fn do_list(&self) -> Result<Vec<String>, PluginError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(d) => d,
            // A bucket that was never written to is empty.
            Err(e) if e.kind() == IoKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PluginError::io(format!("read_dir {}: {e}", self.dir.display()))),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PluginError::io(format!("read_dir {}: {e}", self.dir.display())))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else { continue };
            if name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    async fn do_fetch(&self, name: &str) -> Result<Option<Vec<u8>>, PluginError> {
        let path = self.object_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == IoKind::NotFound => Ok(None),
            Err(e) => Err(PluginError::io(format!("read {}: {e}", path.display()))),
        }
    }

    /// Write to a sibling temp file, then rename over the target so readers
    /// never see a half-written object.
    async fn do_put(&self, name: &str, bytes: Vec<u8>) -> Result<(), PluginError> {
        let path = self.object_path(name)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PluginError::io(format!("mkdir {}: {e}", self.dir.display())))?;

        let tmp = self.dir.join(format!("{name}{PARTIAL_SUFFIX}"));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| PluginError::io(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| PluginError::io(format!("rename {}: {e}", path.display())))?;

        tracing::debug!(object = name, bytes = bytes.len(), "file store put");
        Ok(())
    }

    async fn do_delete(&self, name: &str) -> Result<(), PluginError> {
        let path = self.object_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoKind::NotFound => Ok(()),
            Err(e) => Err(PluginError::io(format!("remove {}: {e}", path.display()))),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  PartitionStore impl
// ════════════════════════════════════════════════════════════════

impl PartitionStore for FileStore {
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PluginError>> + Send + '_>> {
        Box::pin(self.do_list())
    }

    fn fetch<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, PluginError>> + Send + 'a>>
    {
        Box::pin(self.do_fetch(name))
    }

    fn put<'a>(&'a self, name: &'a str, bytes: Vec<u8>)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>
    {
        Box::pin(self.do_put(name, bytes))
    }

    fn delete<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>
    {
        Box::pin(self.do_delete(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("not-yet"));
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.fetch("Hiver-2024.hdf5").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_fetch_overwrite_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("bucket"));

        store.put("Été-2024.hdf5", vec![1, 2, 3]).await.unwrap();
        store.put("Été-2024.hdf5", vec![4]).await.unwrap();
        store.put("Hiver-2024.hdf5", vec![]).await.unwrap();

        assert_eq!(store.list().await.unwrap(), ["Hiver-2024.hdf5", "Été-2024.hdf5"]);
        assert_eq!(store.fetch("Été-2024.hdf5").await.unwrap(), Some(vec![4]));

        store.delete("Été-2024.hdf5").await.unwrap();
        store.delete("Été-2024.hdf5").await.unwrap();
        assert_eq!(store.list().await.unwrap(), ["Hiver-2024.hdf5"]);
    }

    #[tokio::test]
    async fn list_skips_directories_and_partial_writes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("Hiver-2023.hdf5.partial"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let store = FileStore::new(tmp.path());
        assert_eq!(store.list().await.unwrap(), ["notes.txt"]);
    }

    #[tokio::test]
    async fn path_like_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        for name in ["../escape", "a/b", "", ".."] {
            let err = store.put(name, vec![1]).await.unwrap_err();
            assert_eq!(err.kind(), fox_api::ErrorKind::Config, "{name}");
        }
    }
}
