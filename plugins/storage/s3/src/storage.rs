use std::future::Future;
use std::pin::Pin;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use fox_api::{PartitionStore, PluginError};

use crate::config::S3StoreConfig;

/// Object metadata key holding the content id served by the gateway.
const CID_METADATA: &str = "cid";

// ════════════════════════════════════════════════════════════════
//  S3Store
// ════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    gateway: Option<Gateway>,
}

#[derive(Clone)]
struct Gateway {
    base: String,
    http: reqwest::Client,
}

fn backend_err<E>(op: &str, e: E) -> PluginError
where
    E: std::error::Error,
{
    PluginError::io(format!("s3 {op}: {}", DisplayErrorContext(e)))
}

impl S3Store {
    pub async fn new(cfg: &S3StoreConfig) -> Result<Self, PluginError> {
        if cfg.bucket.trim().is_empty() {
            return Err(PluginError::config("s3 bucket is empty"));
        }

        let creds = Credentials::new(
            cfg.access_key_id.clone(),
            cfg.secret_access_key.clone(),
            None,
            None,
            "fox_backup_static",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(creds);
        if let Some(endpoint) = cfg.endpoint.as_deref().filter(|e| !e.is_empty()) {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_cfg = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(cfg.force_path_style)
            .build();

        let gateway = cfg.content_gateway.as_deref().filter(|g| !g.is_empty()).map(|base| Gateway {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        });

        tracing::debug!(bucket = %cfg.bucket, gateway = gateway.is_some(), "s3 store ready");
        Ok(Self { client: Client::from_conf(s3_cfg), bucket: cfg.bucket.clone(), gateway })
    }

    async fn do_list(&self) -> Result<Vec<String>, PluginError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(t) = token.take() {
                req = req.continuation_token(t);
            }
            let resp = req.send().await.map_err(|e| backend_err("list_objects_v2", e))?;

            keys.extend(resp.contents().iter().filter_map(|obj| obj.key().map(str::to_string)));

            if resp.is_truncated().unwrap_or(false) {
                token = resp.next_continuation_token().map(str::to_string);
                if token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(keys)
    }

    async fn do_fetch(&self, name: &str) -> Result<Option<Vec<u8>>, PluginError> {
        match &self.gateway {
            Some(gateway) => self.fetch_via_gateway(gateway, name).await,
            None => self.fetch_object(name).await,
        }
    }

    async fn fetch_object(&self, name: &str) -> Result<Option<Vec<u8>>, PluginError> {
        let resp = match self.client.get_object().bucket(&self.bucket).key(name).send().await {
            Ok(r) => r,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => return Ok(None),
            Err(e) => return Err(backend_err("get_object", e)),
        };
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| PluginError::io(format!("s3 get_object body: {e}")))?
            .into_bytes();
        Ok(Some(data.to_vec()))
    }

    /// HEAD the object for its `cid`, then download `{gateway}/{cid}`.
    async fn fetch_via_gateway(&self, gateway: &Gateway, name: &str) -> Result<Option<Vec<u8>>, PluginError> {
        let head = match self.client.head_object().bucket(&self.bucket).key(name).send().await {
            Ok(h) => h,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => return Ok(None),
            Err(e) => return Err(backend_err("head_object", e)),
        };
        let cid = head
            .metadata()
            .and_then(|m| m.get(CID_METADATA))
            .ok_or_else(|| PluginError::format_err(format!("object {name} has no '{CID_METADATA}' metadata")))?;

        let url = gateway.url(cid);
        let resp = gateway
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PluginError::io(format!("GET {url}: {e}")))?;
        let body = resp.bytes().await.map_err(|e| PluginError::io(format!("GET {url}: {e}")))?;
        Ok(Some(body.to_vec()))
    }

    async fn do_put(&self, name: &str, bytes: Vec<u8>) -> Result<(), PluginError> {
        let len = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| backend_err("put_object", e))?;
        tracing::debug!(object = name, bytes = len, "s3 put");
        Ok(())
    }

    async fn do_delete(&self, name: &str) -> Result<(), PluginError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| backend_err("delete_object", e))?;
        Ok(())
    }
}

impl Gateway {
    fn url(&self, cid: &str) -> String {
        format!("{}/{}", self.base, cid)
    }
}

// ════════════════════════════════════════════════════════════════
//  PartitionStore impl
// ════════════════════════════════════════════════════════════════

impl PartitionStore for S3Store {
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PluginError>> + Send + '_>> {
        Box::pin(self.do_list())
    }

    fn fetch<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, PluginError>> + Send + 'a>>
    {
        Box::pin(self.do_fetch(name))
    }

    fn put<'a>(&'a self, name: &'a str, bytes: Vec<u8>)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>
    {
        Box::pin(self.do_put(name, bytes))
    }

    fn delete<'a>(&'a self, name: &'a str)
        -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>
    {
        Box::pin(self.do_delete(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_url_joins_without_double_slash() {
        let gw = Gateway { base: "https://ipfs.filebase.io/ipfs".into(), http: reqwest::Client::new() };
        assert_eq!(gw.url("QmXyz"), "https://ipfs.filebase.io/ipfs/QmXyz");
    }

    #[test]
    fn config_defaults() {
        let cfg: S3StoreConfig = toml::from_str(
            r#"
            access_key_id = "AK"
            secret_access_key = "SK"
            bucket = "fox"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.region, "us-east-1");
        assert!(cfg.force_path_style);
        assert!(cfg.endpoint.is_none());
        assert!(cfg.content_gateway.is_none());
        assert!(!format!("{cfg:?}").contains("SK"));
    }
}
