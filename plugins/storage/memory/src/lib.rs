use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use fox_api::{PartitionStore, PluginError};

// ═══════════════════════════════════════════════════════════════
//  Fault injection
// ═══════════════════════════════════════════════════════════════

/// Operation of the store, used to arm failures and read the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Fetch,
    Put,
    Delete,
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

/// In-memory bucket. Для dry-run запусков и тестов, где не нужна
/// настоящая persistence.
///
/// Every mutating call is journaled so callers can check what was touched,
/// and any operation can be armed to fail for a given object name.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    failing: RwLock<HashSet<(StoreOp, String)>>,
    journal: RwLock<Vec<(StoreOp, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            objects: RwLock::new(objects.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Make `op` on `name` fail with an io error. `List` ignores the name.
    pub async fn fail_on(&self, op: StoreOp, name: &str) {
        self.failing.write().await.insert((op, name.to_string()));
    }

    pub async fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Mutating operations (put/delete) in call order.
    pub async fn journal(&self) -> Vec<(StoreOp, String)> {
        self.journal.read().await.clone()
    }

    async fn check(&self, op: StoreOp, name: &str) -> Result<(), PluginError> {
        let failing = self.failing.read().await;
        let armed = match op {
            StoreOp::List => failing.iter().any(|(o, _)| *o == StoreOp::List),
            _ => failing.contains(&(op, name.to_string())),
        };
        if armed {
            Err(PluginError::io(format!("injected {op:?} failure for '{name}'")))
        } else {
            Ok(())
        }
    }
}

impl PartitionStore for MemoryStore {
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PluginError>> + Send + '_>> {
        Box::pin(async move {
            self.check(StoreOp::List, "").await?;
            Ok(self.names().await)
        })
    }

    fn fetch<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, PluginError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.check(StoreOp::Fetch, name).await?;
            Ok(self.object(name).await)
        })
    }

    fn put<'a>(&'a self, name: &'a str, bytes: Vec<u8>)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.check(StoreOp::Put, name).await?;
            self.objects.write().await.insert(name.to_string(), bytes);
            self.journal.write().await.push((StoreOp::Put, name.to_string()));
            tracing::debug!(object = %name, "stored in memory");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.check(StoreOp::Delete, name).await?;
            self.objects.write().await.remove(name);
            self.journal.write().await.push((StoreOp::Delete, name.to_string()));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_fetch_delete() {
        let store = MemoryStore::new();
        store.put("a", vec![1, 2]).await.unwrap();
        assert_eq!(store.fetch("a").await.unwrap(), Some(vec![1, 2]));
        store.delete("a").await.unwrap();
        assert_eq!(store.fetch("a").await.unwrap(), None);
        // Missing objects delete cleanly.
        store.delete("a").await.unwrap();
        assert_eq!(
            store.journal().await,
            vec![
                (StoreOp::Put, "a".to_string()),
                (StoreOp::Delete, "a".to_string()),
                (StoreOp::Delete, "a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn armed_failures_only_hit_their_object() {
        let store = MemoryStore::with_objects([("a".to_string(), vec![1]), ("b".to_string(), vec![2])]);
        store.fail_on(StoreOp::Fetch, "a").await;
        assert!(store.fetch("a").await.is_err());
        assert_eq!(store.fetch("b").await.unwrap(), Some(vec![2]));

        store.fail_on(StoreOp::List, "").await;
        assert!(store.list().await.is_err());
    }
}
