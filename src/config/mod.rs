//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::OcrBackend;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// OCR settings
    pub ocr: OcrSettings,
    /// Upload settings
    pub upload: UploadSettings,
    /// Annotated export settings
    pub export: ExportSettings,
    /// Eligibility log storage
    pub storage: StorageSettings,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Local user id recorded with every eligibility log entry
    pub user_id: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// OCR backend to use
    pub backend: OcrBackend,
    /// Recognition language (tesseract code, e.g. "eng")
    pub language: String,
    /// Path or name of the tesseract executable
    pub tesseract_path: PathBuf,
    /// Tesseract page segmentation mode
    pub page_segmentation_mode: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            language: "eng".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            page_segmentation_mode: 3,
        }
    }
}

/// Upload-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Advertised maximum upload size in MB (warned, not enforced)
    pub max_size_mb: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self { max_size_mb: 10 }
    }
}

/// Annotated image export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// TTF/OTF font for rendered values (system fonts are tried when unset)
    pub font_path: Option<PathBuf>,
    /// Text height in pixels
    pub font_size: f32,
    /// X position for fields without a recorded position
    pub fallback_x: f32,
    /// Y position of the first field without a recorded position
    pub fallback_y: f32,
    /// Vertical step per field index for fallback positions
    pub fallback_row_step: f32,
    /// Background patch width
    pub patch_width: u32,
    /// Background patch height
    pub patch_height: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 16.0,
            fallback_x: 200.0,
            fallback_y: 100.0,
            fallback_row_step: 40.0,
            patch_width: 300,
            patch_height: 22,
        }
    }
}

/// Eligibility log storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database path (defaults to the data directory)
    pub database_path: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
