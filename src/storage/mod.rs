//! Storage Layer
//!
//! Handles persistence of the eligibility log (SQLite) and saved field drafts.

pub mod database;
pub mod drafts;

pub use database::{Database, EligibilityLog, LogStore};

use anyhow::Result;
use std::path::PathBuf;

use crate::config::StorageSettings;

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "formassist", "FormAssist")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "formassist", "FormAssist")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Directory holding session preview copies
pub fn get_preview_dir() -> Result<PathBuf> {
    let dir = get_data_dir()?.join("previews");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Eligibility log location: the configured path or `<data_dir>/form-assist.db`
pub fn get_database_path(settings: &StorageSettings) -> Result<PathBuf> {
    match &settings.database_path {
        Some(path) => Ok(path.clone()),
        None => Ok(get_data_dir()?.join("form-assist.db")),
    }
}
