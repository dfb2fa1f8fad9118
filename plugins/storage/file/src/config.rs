// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// `[storage] backend = "file"`: one file per object under `dir`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FileStoreConfig {
    pub dir: String,
}
