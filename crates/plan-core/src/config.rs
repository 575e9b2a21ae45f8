//! Application configuration.
//!
//! Read from `study-plan.toml` in the working directory unless a path is given.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::render::pdf::{HeadingLine, default_heading_lines};
use crate::render::{PdfLayout, PdfRenderer, WatermarkSource};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "study-plan.toml";

/// Quiet period before a preview render starts.
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub plan: PlanDefaults,
}

/// `[catalog]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON or CSV chapter list.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/sample_catalog.json")
}

/// `[export]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// TrueType/OpenType font for PDF text. Without one, the bundled DejaVu Sans is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// URL or file path of the watermark image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,

    #[serde(default = "default_heading_lines")]
    pub heading_lines: Vec<HeadingLine>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            font_path: None,
            watermark: None,
            heading_lines: default_heading_lines(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ExportConfig {
    pub fn watermark_source(&self) -> Option<WatermarkSource> {
        self.watermark
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(WatermarkSource::parse)
    }

    /// PDF renderer for this config. A font that fails to load is logged and the bundled one kept.
    pub fn pdf_renderer(&self) -> PdfRenderer {
        let layout = PdfLayout {
            heading_lines: self.heading_lines.clone(),
            ..PdfLayout::default()
        };
        let renderer = PdfRenderer::new(layout);
        let Some(path) = &self.font_path else {
            return renderer;
        };
        match renderer.clone().with_font_file(path) {
            Ok(with_font) => with_font,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not load pdf font");
                renderer
            }
        }
    }
}

/// `[preview]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Where preview PDFs are written. Defaults to a directory under the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            directory: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("study-plan-preview"))
    }
}

/// `[http]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_addr")]
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> String {
    "127.0.0.1:8080".into()
}

/// `[plan]` section: initial values for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDefaults {
    #[serde(default)]
    pub participant_name: String,

    #[serde(default = "default_pages_per_day")]
    pub pages_per_day: u32,
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self {
            participant_name: String::new(),
            pages_per_day: default_pages_per_day(),
        }
    }
}

fn default_pages_per_day() -> u32 {
    1
}

/// Load `study-plan.toml` from the working directory. Returns defaults if it does not exist.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_or_default(Path::new(CONFIG_FILE_NAME))
}

/// Like [`load_config_from`], but a missing file yields defaults.
pub fn load_config_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    load_config_from(path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write a default config file to `path`.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(&AppConfig::default())?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(?path, "created default config file");
    Ok(())
}
