use crate::config::{AppConfig, DownloadArgs};
use crate::error::BackupError;

pub async fn run(args: DownloadArgs, config: AppConfig) -> Result<(), BackupError> {
    tracing::info!(out = %args.out.display(), "fox-backup download starting");

    let store = crate::store::open(&config.storage).await?;
    let naming = config.archive.naming();
    let files = season_engine::download_all(store.as_ref(), &naming, &args.out).await?;

    tracing::info!(files = files.len(), out = %args.out.display(), "download complete");
    Ok(())
}
