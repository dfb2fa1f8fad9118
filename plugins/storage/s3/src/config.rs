// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// `[storage] backend = "s3"`: S3-compatible bucket with static credentials.
#[derive(Clone, serde::Deserialize)]
pub struct S3StoreConfig {
    /// Custom endpoint (MinIO, Filebase, ...). Empty means AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    #[serde(default = "default_true")]
    pub force_path_style: bool,
    /// Бэкапы качаются через HTTP-шлюз по CID из метаданных объекта,
    /// а не через GetObject.
    #[serde(default)]
    pub content_gateway: Option<String>,
}

fn default_region() -> String {
    "us-east-1".into()
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for S3StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("bucket", &self.bucket)
            .field("force_path_style", &self.force_path_style)
            .field("content_gateway", &self.content_gateway)
            .finish()
    }
}
