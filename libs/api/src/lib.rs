use std::future::Future;
use std::pin::Pin;

mod error;
mod types;

pub use error::{ErrorKind, PluginError};
pub use types::{secs_from_ms, Record};

// ════════════════════════════════════════════════════════════════
//  Collaborator traits
// ════════════════════════════════════════════════════════════════

/// Origin of fresh telemetry. One call drains everything the remote side
/// currently holds for the device.
///
/// A failure here is fatal for the whole run: the engine never attempts
/// partial partition updates without a complete fetched set.
pub trait MessageSource: Send + Sync {
    /// Fetch all available records, following pagination to the end.
    fn fetch_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, PluginError>> + Send + '_>>;
}

/// Object store holding one artifact per partition.
///
/// The trait speaks in object names; mapping names to partition keys is the
/// engine's business. Objects are always replaced whole, never appended.
pub trait PartitionStore: Send + Sync {
    /// Names of all objects currently in the bucket (unfiltered).
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PluginError>> + Send + '_>>;

    /// Read one object. `Ok(None)` means it does not exist.
    fn fetch<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, PluginError>> + Send + 'a>>;

    /// Create or overwrite an object.
    fn put<'a>(&'a self, name: &'a str, bytes: Vec<u8>)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>;

    /// Remove an object. Removing a missing object is not an error.
    fn delete<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>;
}
