use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use season_engine::SyncOrchestrator;
use source_sigfox::{FetchMode, SigfoxSource};

use crate::config::{AppConfig, SyncArgs};
use crate::error::BackupError;

pub async fn run(args: SyncArgs, config: AppConfig) -> Result<(), BackupError> {
    tracing::info!(dry_run = args.dry_run, "fox-backup sync starting");

    let sigfox = config
        .sigfox
        .clone()
        .ok_or_else(|| BackupError::config("sigfox", "missing [sigfox] section"))?;

    // Ctrl+C stops paging at the next page boundary; partitions already in
    // flight are left to finish.
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping fetch");
            signal_token.cancel();
        }
    });

    let mode = match (args.replay, args.capture) {
        (Some(path), _) => FetchMode::Replay(path),
        (None, Some(path)) => FetchMode::LiveWithCapture(path),
        (None, None) => FetchMode::Live,
    };
    tracing::info!(device = %sigfox.device_id, mode = ?mode, "message source");

    let source = Arc::new(SigfoxSource::new(sigfox, config.archive.payload_width, mode, token));
    let store = crate::store::open(&config.storage).await?;

    let orchestrator = SyncOrchestrator::new(
        source,
        store,
        config.archive.codec(),
        config.archive.naming(),
        config.sync.options(config.archive.merge_mode, args.dry_run),
    );
    let report = orchestrator.run().await?;

    let failed = report.failed();
    if failed > 0 {
        let retryable = report.failures().filter(|(_, e)| e.is_transient()).count();
        tracing::warn!(failed, retryable, "some partitions were not updated");
        return Err(BackupError::PartitionsFailed { failed, total: report.partitions.len() });
    }
    Ok(())
}
