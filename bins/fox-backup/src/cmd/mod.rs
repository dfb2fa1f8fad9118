pub mod download;
pub mod sync;
