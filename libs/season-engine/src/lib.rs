//! Seasonal partition-merge-dedup engine.
//!
//! Fresh telemetry is split into season/year partitions, each partition is
//! merged with its archived artifact and deduplicated by identity key, and
//! only partitions that gained records are written back.

pub mod codec;
pub mod download;
pub mod error;
pub mod merge;
pub mod partition;
pub mod sync;

pub use codec::{CodecError, RecordCodec};
pub use download::download_all;
pub use error::{DownloadError, EngineError, PartitionError, SyncError};
pub use merge::{merge, MergeMode, MergeResult};
pub use partition::{classify, partition_key_of, season_of, PartitionKey, PartitionNaming, Season, SeasonLocale};
pub use sync::{PartitionOutcome, PartitionStatus, SyncOptions, SyncOrchestrator, SyncReport};
