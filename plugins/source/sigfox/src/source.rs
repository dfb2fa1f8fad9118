use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use fox_api::{MessageSource, PluginError, Record};

use crate::config::{FetchMode, SigfoxConfig};
use crate::message::{Page, RawMessage};

/// Reads every message of one device from the Sigfox API v2.
pub struct SigfoxSource {
    config: SigfoxConfig,
    payload_width: usize,
    mode: FetchMode,
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl SigfoxSource {
    pub fn new(config: SigfoxConfig, payload_width: usize, mode: FetchMode, cancel: CancellationToken) -> Self {
        Self {
            config,
            payload_width,
            mode,
            client: reqwest::Client::new(),
            cancel,
        }
    }

    /// Walk `paging.next` until the last page, pausing between requests.
    ///
    /// Cancellation is honoured at page boundaries only; a page already in
    /// flight completes or fails on its own.
    async fn fetch_pages(&self) -> Result<Vec<RawMessage>, PluginError> {
        let mut messages = Vec::new();
        let mut url = self.config.messages_url();
        let mut pages = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PluginError::io("fetch cancelled"));
            }

            let page = self.fetch_page(&url).await?;
            pages += 1;
            tracing::debug!(page = pages, messages = page.data.len(), "sigfox page");
            messages.extend(page.data);

            let Some(next) = page.paging.next else { break };
            url = next;

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(PluginError::io("fetch cancelled")),
                _ = tokio::time::sleep(self.config.page_delay()) => {}
            }
        }

        tracing::info!(pages, messages = messages.len(), device = %self.config.device_id, "sigfox fetch complete");
        Ok(messages)
    }

    async fn fetch_page(&self, url: &str) -> Result<Page, PluginError> {
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.config.login, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| PluginError::io(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = format!("GET {url}: HTTP {status}: {body}");
            // 401/403 will not fix themselves on the next run.
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                PluginError::config(err)
            } else {
                PluginError::io(err)
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| PluginError::io(format!("GET {url}: {e}")))?;
        serde_json::from_slice(&body).map_err(|e| PluginError::format_err(format!("GET {url}: {e}")))
    }

    fn to_records(&self, messages: &[RawMessage]) -> Result<Vec<Record>, PluginError> {
        messages.iter().map(|m| m.to_record(self.payload_width)).collect()
    }
}

/// Load a capture written by a previous live run.
pub async fn read_capture(path: &Path) -> Result<Vec<RawMessage>, PluginError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| PluginError::io(format!("read capture {}: {e}", path.display())))?;
    serde_json::from_slice(&raw)
        .map_err(|e| PluginError::format_err(format!("parse capture {}: {e}", path.display())))
}

/// Save the raw messages of a live run so the same input can be replayed.
pub async fn write_capture(path: &Path, messages: &[RawMessage]) -> Result<(), PluginError> {
    let json = serde_json::to_vec_pretty(messages)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| PluginError::io(format!("write capture {}: {e}", path.display())))
}

impl MessageSource for SigfoxSource {
    fn fetch_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, PluginError>> + Send + '_>> {
        Box::pin(async move {
            let messages = match &self.mode {
                FetchMode::Replay(path) => {
                    let messages = read_capture(path).await?;
                    tracing::info!(messages = messages.len(), path = %path.display(), "replaying captured messages");
                    messages
                }
                FetchMode::Live => self.fetch_pages().await?,
                FetchMode::LiveWithCapture(path) => {
                    let messages = self.fetch_pages().await?;
                    // A failed capture must not cost the run its data.
                    if let Err(e) = write_capture(path, &messages).await {
                        tracing::warn!(error = %e, "capture not written");
                    }
                    messages
                }
            };
            self.to_records(&messages)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use serde::Deserialize;

    use super::*;

    const AUTH: &str = "Basic bG9naW46c2VjcmV0"; // login:secret

    #[derive(Clone)]
    struct Api {
        base: Arc<std::sync::OnceLock<String>>,
        hits: Arc<AtomicUsize>,
        /// Arrival time of every request, in order.
        arrivals: Arc<Mutex<Vec<Instant>>>,
    }

    #[derive(Deserialize)]
    struct PageQuery {
        page: Option<u32>,
    }

    async fn messages(State(api): State<Api>, Query(q): Query<PageQuery>, headers: HeaderMap) -> axum::response::Response {
        api.arrivals.lock().unwrap().push(Instant::now());
        api.hits.fetch_add(1, Ordering::SeqCst);
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(AUTH) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let base = api.base.get().cloned().unwrap_or_default();
        let body = match q.page.unwrap_or(0) {
            0 => serde_json::json!({
                "data": [
                    {"time": 1700000100000u64, "data": "0102", "seqNumber": 2, "lqi": 1},
                    {"time": 1700000000000u64, "data": "0a0b0c0d", "seqNumber": 1, "lqi": 2}
                ],
                "paging": {"next": format!("{base}/devices/DEV1/messages?page=1")}
            }),
            _ => serde_json::json!({
                "data": [{"time": "1690000000500", "data": "ff", "seqNumber": 0, "lqi": 0}],
                "paging": {}
            }),
        };
        axum::Json(body).into_response()
    }

    async fn serve() -> (String, Api) {
        let api = Api { base: Arc::default(), hits: Arc::default(), arrivals: Arc::default() };
        let app = Router::new()
            .route("/devices/DEV1/messages", get(messages))
            .with_state(api.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        api.base.set(base.clone()).unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (base, api)
    }

    fn config(endpoint: &str, password: &str) -> SigfoxConfig {
        SigfoxConfig {
            login: "login".into(),
            password: password.into(),
            device_id: "DEV1".into(),
            endpoint: endpoint.into(),
            page_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn follows_pagination_with_basic_auth() {
        let (base, api) = serve().await;
        let source = SigfoxSource::new(config(&base, "secret"), 4, FetchMode::Live, CancellationToken::new());

        let records = source.fetch_all().await.unwrap();

        assert_eq!(api.hits.load(Ordering::SeqCst), 2);
        assert_eq!(
            records,
            vec![
                Record::new(1_700_000_100, vec![0, 0, 1, 2], 2, 1),
                Record::new(1_700_000_000, vec![0x0a, 0x0b, 0x0c, 0x0d], 1, 2),
                Record::new(1_690_000_000, vec![0, 0, 0, 0xff], 0, 0),
            ]
        );
    }

    #[tokio::test]
    async fn pages_are_spaced_by_the_configured_delay() {
        let (base, api) = serve().await;
        let mut cfg = config(&base, "secret");
        cfg.page_delay_ms = 200;
        let source = SigfoxSource::new(cfg, 4, FetchMode::Live, CancellationToken::new());

        source.fetch_all().await.unwrap();

        let arrivals = api.arrivals.lock().unwrap().clone();
        assert_eq!(arrivals.len(), 2);
        assert!(arrivals[1] - arrivals[0] >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn cancelling_between_pages_skips_the_next_page() {
        let (base, api) = serve().await;
        let mut cfg = config(&base, "secret");
        cfg.page_delay_ms = 30_000;
        let cancel = CancellationToken::new();
        let source = SigfoxSource::new(cfg, 4, FetchMode::Live, cancel.clone());

        let hits = api.hits.clone();
        tokio::spawn(async move {
            while hits.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            // Let the first page land so the source is inside the delay.
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(5), source.fetch_all())
            .await
            .expect("cancellation must cut the page delay short");
        assert_eq!(result.unwrap_err().kind(), fox_api::ErrorKind::Io);
        assert_eq!(api.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_credentials_are_a_config_error() {
        let (base, _api) = serve().await;
        let source = SigfoxSource::new(config(&base, "wrong"), 4, FetchMode::Live, CancellationToken::new());

        let err = source.fetch_all().await.unwrap_err();
        assert_eq!(err.kind(), fox_api::ErrorKind::Config);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_first_page() {
        let (base, api) = serve().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = SigfoxSource::new(config(&base, "secret"), 4, FetchMode::Live, cancel);

        assert!(source.fetch_all().await.is_err());
        assert_eq!(api.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn capture_then_replay_yields_the_same_records() {
        let (base, api) = serve().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");

        let live = SigfoxSource::new(
            config(&base, "secret"),
            4,
            FetchMode::LiveWithCapture(path.clone()),
            CancellationToken::new(),
        );
        let fetched = live.fetch_all().await.unwrap();

        // Replay never touches the network, even with a dead endpoint.
        let replay = SigfoxSource::new(
            config("http://127.0.0.1:1", "secret"),
            4,
            FetchMode::Replay(path),
            CancellationToken::new(),
        );
        assert_eq!(replay.fetch_all().await.unwrap(), fetched);
        assert_eq!(api.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_capture_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SigfoxSource::new(
            config("http://127.0.0.1:1", "secret"),
            4,
            FetchMode::Replay(dir.path().join("nope.json")),
            CancellationToken::new(),
        );
        assert_eq!(source.fetch_all().await.unwrap_err().kind(), fox_api::ErrorKind::Io);
    }
}
