use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use season_engine::codec::{DEFAULT_DATASET, DEFAULT_PAYLOAD_WIDTH};
use season_engine::{MergeMode, PartitionNaming, RecordCodec, SeasonLocale, SyncOptions};
use source_sigfox::SigfoxConfig;
use storage_file::FileStoreConfig;
use storage_s3::S3StoreConfig;

use crate::error::BackupError;

/// Env var holding the whole TOML config, base64-encoded. Wins over the file.
pub const INLINE_CONFIG_ENV: &str = "FOX_BACKUP_CONF";

#[derive(Parser)]
#[command(name = "fox-backup", about = "Сезонный архив телеметрии Sigfox")]
pub struct Cli {
    /// Путь к TOML конфиг файлу
    #[arg(long, global = true, default_value = "config.toml", env = "FOX_BACKUP_CONFIG")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch new messages and merge them into the seasonal archive
    Sync(SyncArgs),
    /// Copy every archived season into a local directory
    Download(DownloadArgs),
}

#[derive(Args, Clone, Debug)]
pub struct SyncArgs {
    /// Read messages from a capture file instead of the API
    #[arg(long, conflicts_with = "capture")]
    pub replay: Option<PathBuf>,

    /// Save the fetched raw messages to this file
    #[arg(long)]
    pub capture: Option<PathBuf>,

    /// Merge and report without touching the bucket
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DownloadArgs {
    /// Output directory, emptied before the download
    #[arg(long, default_value = "downloads_backup")]
    pub out: PathBuf,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Needed by `sync` only.
    #[serde(default)]
    pub sigfox: Option<SigfoxConfig>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    S3(S3StoreConfig),
    File(FileStoreConfig),
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Bytes per payload: 4 (deployed devices) or 8.
    #[serde(default = "default_payload_width")]
    pub payload_width: usize,
    /// Not `hdf5`: the artifact layout is native, and legacy HDF5 seasons must
    /// stay out of the partition listing.
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub locale: SeasonLocale,
    /// Fixed for the life of a bucket; switching it does not migrate anything.
    #[serde(default)]
    pub merge_mode: MergeMode,
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
}

fn default_dataset() -> String {
    DEFAULT_DATASET.into()
}
fn default_payload_width() -> usize {
    DEFAULT_PAYLOAD_WIDTH
}
fn default_extension() -> String {
    "fxa".into()
}
fn default_max_concurrency() -> usize {
    4
}
fn default_op_timeout_secs() -> u64 {
    60
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            payload_width: default_payload_width(),
            extension: default_extension(),
            locale: SeasonLocale::default(),
            merge_mode: MergeMode::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            op_timeout_secs: default_op_timeout_secs(),
        }
    }
}

impl ArchiveConfig {
    pub fn codec(&self) -> RecordCodec {
        RecordCodec::new(&self.dataset, self.payload_width)
    }

    pub fn naming(&self) -> PartitionNaming {
        PartitionNaming::new(self.locale, &self.extension)
    }
}

impl SyncConfig {
    pub fn options(&self, mode: MergeMode, dry_run: bool) -> SyncOptions {
        SyncOptions {
            mode,
            max_concurrency: self.max_concurrency,
            op_timeout: Duration::from_secs(self.op_timeout_secs),
            dry_run,
        }
    }
}

impl AppConfig {
    /// `FOX_BACKUP_CONF` if set, otherwise the file at `path`.
    pub fn load(path: &str) -> Result<Self, BackupError> {
        Self::load_from(path, std::env::var(INLINE_CONFIG_ENV).ok())
    }

    fn load_from(path: &str, inline: Option<String>) -> Result<Self, BackupError> {
        let config = match inline {
            Some(encoded) => {
                let content = decode_inline(&encoded)?;
                tracing::info!(source = INLINE_CONFIG_ENV, "loaded config");
                Self::parse(&content, INLINE_CONFIG_ENV)?
            }
            None => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| BackupError::config("read", format!("'{path}': {e}")))?;
                tracing::info!(config = %path, "loaded config");
                Self::parse(&content, path)?
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str, origin: &str) -> Result<Self, BackupError> {
        toml::from_str(content).map_err(|e| BackupError::config("parse", format!("'{origin}': {e}")))
    }

    fn validate(&self) -> Result<(), BackupError> {
        if !matches!(self.archive.payload_width, 4 | 8) {
            return Err(BackupError::config(
                "archive",
                format!("payload_width must be 4 or 8, got {}", self.archive.payload_width),
            ));
        }
        if self.archive.dataset.is_empty() || self.archive.extension.is_empty() {
            return Err(BackupError::config("archive", "dataset and extension must not be empty"));
        }
        if self.sync.max_concurrency == 0 {
            return Err(BackupError::config("sync", "max_concurrency must be at least 1"));
        }
        if self.sync.op_timeout_secs == 0 {
            return Err(BackupError::config("sync", "op_timeout_secs must be at least 1"));
        }
        if let Some(sigfox) = &self.sigfox {
            if sigfox.device_id.is_empty() {
                return Err(BackupError::config("sigfox", "device_id is empty"));
            }
        }
        Ok(())
    }
}

fn decode_inline(encoded: &str) -> Result<String, BackupError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| BackupError::config("decode", format!("{INLINE_CONFIG_ENV}: {e}")))?;
    String::from_utf8(bytes).map_err(|e| BackupError::config("decode", format!("{INLINE_CONFIG_ENV}: {e}")))
}
