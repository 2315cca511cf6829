//! Single-shot capture: one frame over HTTP, saved as a file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::api::DeviceApi;

/// `capture_<unix millis>.jpg`
pub fn capture_file_name(timestamp_ms: i64) -> String {
    format!("capture_{}.jpg", timestamp_ms)
}

/// Fetch one frame and write it into `dir`. Nothing is written unless the
/// device returned the whole image.
pub async fn capture_to_dir(api: &DeviceApi, dir: &Path) -> Result<PathBuf> {
    let jpeg = api.capture().await.context("capture failed")?;

    let name = capture_file_name(chrono::Utc::now().timestamp_millis());
    let path = store(dir, &name, &jpeg).await?;

    info!(path = %path.display(), bytes = jpeg.len(), "capture saved");
    Ok(path)
}

/// Write through `<name>.part` and rename into place; a failed write or
/// rename removes the partial file.
async fn store(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    let partial = dir.join(format!("{}.part", name));

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create capture dir {}", dir.display()))?;
    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e).with_context(|| format!("write {}", partial.display()));
    }
    if let Err(e) = tokio::fs::rename(&partial, &path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e).with_context(|| format!("save {}", path.display()));
    }
    Ok(path)
}
