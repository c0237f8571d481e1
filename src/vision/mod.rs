//! Vision/OCR Layer
//!
//! Wraps the external OCR engine that turns an uploaded form into text.
//! The engine is a black box: a file goes in, recognized text and optional
//! word-level bounding boxes come out.
//! Supported backends:
//! - Tesseract CLI (TSV output)

pub mod tesseract;
pub mod upload;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use tesseract::TesseractOcr;
pub use upload::{validate_upload, UploadError, UploadKind};

use crate::config::OcrSettings;

/// OCR backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Tesseract command-line tool
    #[default]
    Tesseract,
}

/// Axis-aligned word box in source image pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Build from a left/top/width/height quadruple
    pub fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            x0: left,
            y0: top,
            x1: left + width,
            y1: top + height,
        }
    }
}

/// Single recognized word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    /// Recognized text
    pub text: String,
    /// Word bounds
    pub bbox: BoundingBox,
    /// Recognition confidence (0.0 - 100.0)
    pub confidence: f32,
}

/// Full recognition output for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Plain text, one recognized line per line
    pub text: String,
    /// Word-level boxes, in reading order (may be empty)
    pub words: Vec<OcrWord>,
}

impl Recognition {
    /// Recognition result with text only
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            words: Vec::new(),
        }
    }

    /// Word boxes, or `None` when the engine did not report any
    pub fn word_boxes(&self) -> Option<&[OcrWord]> {
        if self.words.is_empty() {
            None
        } else {
            Some(&self.words)
        }
    }
}

/// External OCR engine
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Recognize text in an image or PDF file
    async fn recognize(&self, path: &Path, language: &str) -> Result<Recognition>;
}

/// Build the engine selected in the configuration
pub fn create_engine(settings: &OcrSettings) -> Box<dyn OcrEngine> {
    match settings.backend {
        OcrBackend::Tesseract => Box::new(TesseractOcr::new(
            settings.tesseract_path.clone(),
            settings.page_segmentation_mode,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_ltwh() {
        let bbox = BoundingBox::from_ltwh(10.0, 20.0, 30.0, 5.0);
        assert_eq!(bbox.x1, 40.0);
        assert_eq!(bbox.y1, 25.0);
    }

    #[test]
    fn test_word_boxes_absent_when_empty() {
        let recognition = Recognition::from_text("Name:");
        assert!(recognition.word_boxes().is_none());
    }

    #[test]
    fn test_backend_serializes_snake_case() {
        let toml_str = toml::to_string(&crate::config::OcrSettings::default()).unwrap();
        assert!(toml_str.contains("backend = \"tesseract\""));
    }
}
