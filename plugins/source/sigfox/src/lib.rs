//! Sigfox API v2 message source.
//!
//! Fetches every message of one device with HTTP basic auth, following
//! `paging.next` links, and turns the hex payloads into fixed-width
//! [`fox_api::Record`]s. A run can also be captured to JSON and replayed
//! later without network access.

mod config;
mod message;
mod source;

pub use config::{FetchMode, SigfoxConfig};
pub use message::{EpochMs, RawMessage};
pub use source::{read_capture, write_capture, SigfoxSource};
