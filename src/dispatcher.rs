use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::engine::{self, EngineConfig, EngineError};
use crate::model::{DownloadOutcome, DownloadRequest, UiEvent};

/// Drives one download request to its terminal outcome.
///
/// Spawned once per accepted request. Every engine error is absorbed here;
/// the only thing that leaves the task is the final `UiEvent::Finished`.
pub async fn run_request(
    request: DownloadRequest,
    downloads_dir: PathBuf,
    tx: UnboundedSender<UiEvent>,
) {
    let outcome = match drive(&request, &downloads_dir, &tx).await {
        Ok(title) => {
            info!(title = %title, "download complete");
            DownloadOutcome::success(title)
        }
        Err(err) => {
            error!(url = %request.url, error = %err, "download failed");
            DownloadOutcome::failure(err.to_string())
        }
    };
    let _ = tx.send(UiEvent::Finished(outcome));
}

async fn drive(
    request: &DownloadRequest,
    downloads_dir: &Path,
    tx: &UnboundedSender<UiEvent>,
) -> Result<String, EngineError> {
    let bin = engine::locate_ytdlp()?;

    // Resolve the title first so the UI can show what is being fetched.
    let meta = engine::resolve_metadata(&bin, &request.url).await?;
    let title = meta.title.clone();
    let _ = tx.send(UiEvent::Metadata(meta));

    let config = EngineConfig::for_request(request.format, downloads_dir);
    let progress_tx = tx.clone();
    engine::run_download(&bin, &request.url, &config, move |fraction| {
        let _ = progress_tx.send(UiEvent::Progress(fraction));
    })
    .await?;

    Ok(title)
}
