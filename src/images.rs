//! Cover image downloads.
//!
//! Images are stored exactly as served; no decoding or re-encoding happens.
//! The file is named after the article headline (see [`image_path`]).

use crate::browser::static_page::DESKTOP_USER_AGENT;
use crate::retry::RetryPolicy;
use crate::utils::{MAX_FILENAME_LEN, sanitize_filename};
use reqwest::Client;
use reqwest::header::USER_AGENT;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, instrument};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the cover image of `title` is stored inside `images_dir`.
pub fn image_path(images_dir: &Path, title: &str) -> PathBuf {
    let stem = sanitize_filename(title, MAX_FILENAME_LEN);
    let stem = if stem.is_empty() { "image".to_string() } else { stem };
    images_dir.join(format!("{stem}.jpg"))
}

async fn fetch_image(client: &Client, url: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let bytes = client
        .get(url)
        .header(USER_AGENT, DESKTOP_USER_AGENT)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    if bytes.is_empty() {
        return Err("empty image body".into());
    }
    Ok(bytes.to_vec())
}

/// Write `bytes` to `path`, creating parent directories as needed.
pub async fn save_image(bytes: &[u8], path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes).await?;
    Ok(())
}

/// Download `url` into `path`, retrying per `policy`.
///
/// Returns `false` (after logging) if the download or the write failed.
#[instrument(level = "info", skip(client, path, policy), fields(path = %path.display()))]
pub async fn download_image(
    client: &Client,
    url: &str,
    path: &Path,
    policy: &RetryPolicy,
) -> bool {
    let fetched = policy
        .run_or("image download", None, || async move {
            fetch_image(client, url).await.map(Some)
        })
        .await;
    let Some(bytes) = fetched else {
        error!("Failed to download image");
        return false;
    };

    match save_image(&bytes, path).await {
        Ok(()) => {
            info!(bytes = bytes.len(), "Image saved");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to save image");
            false
        }
    }
}
