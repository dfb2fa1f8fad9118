use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use fox_api::{MessageSource, PartitionStore, PluginError, Record};

use crate::codec::RecordCodec;
use crate::error::{PartitionError, SyncError};
use crate::merge::{merge, MergeMode, MergeResult};
use crate::partition::{classify, PartitionKey, PartitionNaming};

// ════════════════════════════════════════════════════════════════
//  Options
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: MergeMode,
    /// Partitions processed at the same time.
    pub max_concurrency: usize,
    /// Upper bound for every single storage call.
    pub op_timeout: Duration,
    /// Merge and report, but never delete or upload.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: MergeMode::default(),
            max_concurrency: 4,
            op_timeout: Duration::from_secs(60),
            dry_run: false,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Report
// ════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum PartitionStatus {
    /// Old artifact replaced by the merged one.
    Written,
    /// Nothing new; storage untouched.
    Skipped,
    /// Would have been written (dry run).
    DryRun,
    Failed(PartitionError),
}

impl PartitionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PartitionStatus::Written => "written",
            PartitionStatus::Skipped => "skipped",
            PartitionStatus::DryRun => "dry-run",
            PartitionStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct PartitionOutcome {
    pub key: PartitionKey,
    pub object: String,
    /// Records of this partition in the fetched set.
    pub fetched: usize,
    /// Records decoded from the previous artifact.
    pub historic: usize,
    /// Records after merge.
    pub merged: usize,
    /// `new_count` of the merge.
    pub added: i64,
    pub status: PartitionStatus,
}

impl PartitionOutcome {
    fn new(key: PartitionKey, object: String, fetched: usize) -> Self {
        Self {
            key,
            object,
            fetched,
            historic: 0,
            merged: 0,
            added: 0,
            status: PartitionStatus::Skipped,
        }
    }

    fn log(&self) {
        match &self.status {
            PartitionStatus::Failed(e) => tracing::error!(
                partition = %self.key,
                object = %self.object,
                fetched = self.fetched,
                transient = e.is_transient(),
                error = %e,
                "partition failed"
            ),
            status => tracing::info!(
                partition = %self.key,
                object = %self.object,
                fetched = self.fetched,
                historic = self.historic,
                merged = self.merged,
                added = self.added,
                status = status.label(),
                "partition synced"
            ),
        }
    }
}

/// Result of one completed run, ordered by partition key.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub partitions: Vec<PartitionOutcome>,
}

impl SyncReport {
    fn count(&self, f: impl Fn(&PartitionStatus) -> bool) -> usize {
        self.partitions.iter().filter(|p| f(&p.status)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, PartitionStatus::Written))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, PartitionStatus::Skipped | PartitionStatus::DryRun))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, PartitionStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PartitionKey, &PartitionError)> {
        self.partitions.iter().filter_map(|p| match &p.status {
            PartitionStatus::Failed(e) => Some((&p.key, e)),
            _ => None,
        })
    }

    pub fn outcome(&self, key: &PartitionKey) -> Option<&PartitionOutcome> {
        self.partitions.iter().find(|p| p.key == *key)
    }
}

// ════════════════════════════════════════════════════════════════
//  Orchestrator
// ════════════════════════════════════════════════════════════════

/// fetch → classify → list → per-partition (fetch historic → decode →
/// merge → delete old → upload new).
///
/// Partitions run in parallel on a bounded pool. Inside one partition the
/// steps are strictly sequential, and there is exactly one task per key.
pub struct SyncOrchestrator {
    source: Arc<dyn MessageSource>,
    worker: Arc<PartitionWorker>,
}

struct PartitionWorker {
    store: Arc<dyn PartitionStore>,
    codec: RecordCodec,
    naming: PartitionNaming,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn MessageSource>,
        store: Arc<dyn PartitionStore>,
        codec: RecordCodec,
        naming: PartitionNaming,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            worker: Arc::new(PartitionWorker { store, codec, naming, options }),
        }
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let options = &self.worker.options;

        // --- Fetch: all or nothing ---
        let fetched = self.source.fetch_all().await.map_err(SyncError::Fetch)?;
        let total = fetched.len();
        tracing::info!(messages = total, "fetched messages");

        let groups = classify(fetched)?;

        // --- Discover archived partitions ---
        let names = match tokio::time::timeout(options.op_timeout, self.worker.store.list()).await {
            Ok(listed) => listed.map_err(SyncError::List)?,
            Err(_) => return Err(SyncError::ListTimeout),
        };
        let archived: HashSet<PartitionKey> =
            names.iter().filter_map(|n| self.worker.naming.parse(n)).collect();
        tracing::info!(
            partitions = groups.len(),
            archived = archived.len(),
            mode = ?options.mode,
            dry_run = options.dry_run,
            "merging partitions"
        );

        // --- One task per partition, bounded ---
        let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (key, incoming) in groups {
            let worker = self.worker.clone();
            let permits = permits.clone();
            let exists = archived.contains(&key);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                worker.sync_partition(key, incoming, exists).await
            });
        }

        // Drain everything even if a worker panicked: finished writes stay,
        // and in-flight partitions are not cut between delete and upload.
        let mut partitions = Vec::new();
        let mut panicked = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => partitions.push(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "partition worker crashed");
                    panicked.get_or_insert(e);
                }
            }
        }
        if let Some(e) = panicked {
            return Err(SyncError::Worker(e));
        }
        partitions.sort_by_key(|p| p.key);

        let report = SyncReport { fetched: total, partitions };
        tracing::info!(
            fetched = report.fetched,
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync complete"
        );
        Ok(report)
    }
}

impl PartitionWorker {
    async fn sync_partition(&self, key: PartitionKey, incoming: Vec<Record>, exists: bool) -> PartitionOutcome {
        let object = self.naming.object_name(&key);
        let mut outcome = PartitionOutcome::new(key, object, incoming.len());
        let status = match self.try_sync(&incoming, exists, &mut outcome).await {
            Ok(status) => status,
            Err(e) => PartitionStatus::Failed(e),
        };
        outcome.status = status;
        outcome.log();
        outcome
    }

    async fn try_sync(
        &self,
        incoming: &[Record],
        exists: bool,
        outcome: &mut PartitionOutcome,
    ) -> Result<PartitionStatus, PartitionError> {
        let object = outcome.object.clone();

        // A broken artifact aborts this partition: merging against empty
        // history would re-upload records the archive already holds.
        let historic = if exists {
            match self.bounded("fetch", self.store.fetch(&object)).await? {
                Some(bytes) => self.codec.decode(&bytes).map_err(PartitionError::from_decode)?,
                None => {
                    tracing::warn!(partition = %outcome.key, object = %object, "listed artifact is gone, treating as first sync");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        outcome.historic = historic.len();

        let MergeResult { merged, new_count } = merge(incoming, &historic, self.options.mode);
        outcome.merged = merged.len();
        outcome.added = new_count;

        if new_count <= 0 {
            return Ok(PartitionStatus::Skipped);
        }
        if self.options.dry_run {
            return Ok(PartitionStatus::DryRun);
        }

        let bytes = self.codec.encode(&merged).map_err(PartitionError::Encode)?;
        if exists {
            self.bounded("delete", self.store.delete(&object)).await?;
        }
        self.bounded("put", self.store.put(&object, bytes)).await?;
        Ok(PartitionStatus::Written)
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, PluginError>>,
    ) -> Result<T, PartitionError> {
        match tokio::time::timeout(self.options.op_timeout, fut).await {
            Ok(r) => r.map_err(|source| PartitionError::Storage { op, source }),
            Err(_) => Err(PartitionError::Timeout { op }),
        }
    }
}
