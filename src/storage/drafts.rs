//! Field draft storage
//!
//! A draft is the reviewed field list of one scanned form, saved between
//! the `scan` and `fill` steps when they run as separate commands.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::forms::FormField;

/// Saved field list with the document it was detected from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDraft {
    /// Source document the fields were detected in
    pub source: Option<PathBuf>,
    /// Recognized text
    #[serde(default)]
    pub extracted_text: String,
    /// Detected or edited fields
    pub fields: Vec<FormField>,
}

/// Load a draft from file
pub fn load_draft(path: &Path) -> Result<FormDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft {:?}", path))?;
    let draft: FormDraft = serde_json::from_str(&content)
        .with_context(|| format!("Invalid draft {:?}", path))?;
    Ok(draft)
}

/// Save a draft to file
pub fn save_draft(draft: &FormDraft, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(draft)?;
    std::fs::write(path, content)?;
    Ok(())
}
