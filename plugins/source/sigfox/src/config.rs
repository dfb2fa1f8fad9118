use std::time::Duration;

use serde::Deserialize;

// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// Доступ к Sigfox API v2 для одного устройства.
#[derive(Debug, Clone, Deserialize)]
pub struct SigfoxConfig {
    pub login: String,
    pub password: String,
    pub device_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Пауза между страницами (rate limit API).
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

fn default_endpoint() -> String {
    "https://api.sigfox.com/v2".into()
}

fn default_page_delay_ms() -> u64 {
    1000
}

impl SigfoxConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// First page of the device message listing.
    pub fn messages_url(&self) -> String {
        format!("{}/devices/{}/messages", self.endpoint.trim_end_matches('/'), self.device_id)
    }
}

/// Where messages come from for one run.
#[derive(Debug, Clone, Default)]
pub enum FetchMode {
    /// Walk the API; optionally keep the raw messages for later replay.
    #[default]
    Live,
    LiveWithCapture(std::path::PathBuf),
    /// Skip the network and read a previous capture.
    Replay(std::path::PathBuf),
}
