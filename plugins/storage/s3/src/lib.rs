//! S3-compatible [`fox_api::PartitionStore`].
//!
//! Reads can optionally go through an HTTP content gateway: the object is
//! resolved to a content id with `HeadObject` and downloaded from the
//! gateway instead of the bucket.

mod config;
mod storage;

pub use config::S3StoreConfig;
pub use storage::S3Store;
