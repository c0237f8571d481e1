//! Upload validation
//!
//! Only images (JPEG, PNG, WEBP) and PDF documents are accepted. Files are
//! identified by their leading bytes, with the extension as a fallback for
//! truncated or unreadable headers.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Bytes needed to sniff every supported format
const SNIFF_LEN: usize = 12;

/// Accepted upload types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Jpeg,
    Png,
    Webp,
    Pdf,
}

impl UploadKind {
    /// Identify a file from its magic bytes
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(UploadKind::Jpeg)
        } else if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(UploadKind::Png)
        } else if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
            Some(UploadKind::Webp)
        } else if header.starts_with(b"%PDF-") {
            Some(UploadKind::Pdf)
        } else {
            None
        }
    }

    /// Guess from the file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(UploadKind::Jpeg),
            "png" => Some(UploadKind::Png),
            "webp" => Some(UploadKind::Webp),
            "pdf" => Some(UploadKind::Pdf),
            _ => None,
        }
    }

    /// Canonical MIME type
    pub fn mime(&self) -> &'static str {
        match self {
            UploadKind::Jpeg => "image/jpeg",
            UploadKind::Png => "image/png",
            UploadKind::Webp => "image/webp",
            UploadKind::Pdf => "application/pdf",
        }
    }

    /// Preferred file extension
    pub fn extension(&self) -> &'static str {
        match self {
            UploadKind::Jpeg => "jpg",
            UploadKind::Png => "png",
            UploadKind::Webp => "webp",
            UploadKind::Pdf => "pdf",
        }
    }

    /// Whether the `image` crate can decode this kind for annotation
    pub fn is_raster(&self) -> bool {
        !matches!(self, UploadKind::Pdf)
    }
}

/// Reasons an upload is refused before any processing
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file type: {0} (expected JPG, PNG, WEBP or PDF)")]
    InvalidFileType(String),

    #[error("cannot read upload {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Check that `path` is a supported upload and return its kind.
///
/// Oversized files are only warned about; the limit is advisory.
pub fn validate_upload(path: &Path, max_size_mb: u64) -> Result<UploadKind, UploadError> {
    let unreadable = |source| UploadError::Unreadable {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;
    let size = file.metadata().map_err(unreadable)?.len();

    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .map_err(unreadable)?;

    let kind = UploadKind::sniff(&header)
        .or_else(|| UploadKind::from_extension(path))
        .ok_or_else(|| UploadError::InvalidFileType(path.display().to_string()))?;

    if size > max_size_mb * 1024 * 1024 {
        warn!(
            "Upload {:?} is {} bytes, larger than the advertised {} MB limit",
            path, size, max_size_mb
        );
    }

    debug!("Accepted upload {:?} as {}", path, kind.mime());
    Ok(kind)
}
