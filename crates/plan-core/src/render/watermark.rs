use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::Watermark;
use crate::error::ResourceLoadError;

/// Where the watermark image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WatermarkSource {
    Url(String),
    Path(PathBuf),
}

impl WatermarkSource {
    /// `http://` and `https://` values are URLs, anything else a file path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            WatermarkSource::Url(trimmed.to_string())
        } else {
            WatermarkSource::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for WatermarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkSource::Url(url) => f.write_str(url),
            WatermarkSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch and decode the watermark. Failures are logged and yield `None`;
/// documents are then rendered without one.
pub async fn load_watermark(source: &WatermarkSource) -> Option<Watermark> {
    match try_load_watermark(source).await {
        Ok(watermark) => Some(watermark),
        Err(err) => {
            tracing::warn!(%source, error = %err, "watermark unavailable, rendering without it");
            None
        }
    }
}

pub async fn try_load_watermark(source: &WatermarkSource) -> Result<Watermark, ResourceLoadError> {
    let bytes = match source {
        WatermarkSource::Url(url) => fetch(url).await?,
        WatermarkSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| ResourceLoadError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };
    let image = image::load_from_memory(&bytes)?.to_rgba8();
    tracing::debug!(%source, width = image.width(), height = image.height(), "loaded watermark");
    Ok(Watermark::new(image))
}

async fn fetch(url: &str) -> Result<Vec<u8>, ResourceLoadError> {
    let http_err = |source: reqwest::Error| ResourceLoadError::Http {
        url: url.to_string(),
        source,
    };
    let response = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(http_err)?;
    let bytes = response.bytes().await.map_err(http_err)?;
    Ok(bytes.to_vec())
}
