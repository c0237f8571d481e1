//! Tesseract CLI backend
//!
//! Runs `tesseract <file> stdout -l <lang> --psm <n> tsv` and rebuilds both
//! the plain text (one line per recognized line) and word boxes from the TSV.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

use super::{BoundingBox, OcrEngine, OcrWord, Recognition};

/// TSV row level for single words
const WORD_LEVEL: u32 = 5;

/// Tesseract command-line engine
pub struct TesseractOcr {
    /// Executable to run
    binary: PathBuf,
    /// Page segmentation mode passed as `--psm`
    psm: u32,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, psm: u32) -> Self {
        Self {
            binary: binary.into(),
            psm,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, path: &Path, language: &str) -> Result<Recognition> {
        let start = Instant::now();

        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .await
            .with_context(|| format!("failed to run {:?} (is it installed?)", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }

        let recognition = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        info!(
            "Recognized {} words in {:?} ({:?})",
            recognition.words.len(),
            path,
            start.elapsed()
        );
        Ok(recognition)
    }
}

/// Rebuild text and word boxes from tesseract TSV output.
///
/// Words are joined with spaces inside a line; lines are separated by `\n`
/// in the order tesseract emits them.
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut words = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut current_line: Option<(u32, u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: u32 = cols[0].parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }

        let confidence: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || confidence < 0.0 {
            continue;
        }

        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        match lines.last_mut() {
            Some(line) if current_line == Some(key) => {
                line.push(' ');
                line.push_str(text);
            }
            _ => {
                lines.push(text.to_string());
                current_line = Some(key);
            }
        }

        let coord = |idx: usize| cols[idx].parse::<f32>().unwrap_or(0.0);
        words.push(OcrWord {
            text: text.to_string(),
            bbox: BoundingBox::from_ltwh(coord(6), coord(7), coord(8), coord(9)),
            confidence,
        });
    }

    debug!("Parsed {} lines, {} words from TSV", lines.len(), words.len());

    Recognition {
        text: lines.join("\n"),
        words,
    }
}
