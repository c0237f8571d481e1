//! Filled form export
//!
//! Renders filled values back onto the scanned image, or falls back to a
//! plain `Label: value` text dump when there is no raster image to draw on.

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::field::FormField;
use crate::config::ExportSettings;

/// File name of the annotated image
pub const PNG_FILE_NAME: &str = "filled-form.png";
/// File name of the text dump
pub const TEXT_FILE_NAME: &str = "filled-form.txt";

/// Fonts tried when none is configured
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no usable font found (set export.font_path)")]
    FontUnavailable,

    #[error("invalid font file {0}")]
    InvalidFont(PathBuf),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Layout and colors for rendered values
#[derive(Debug, Clone)]
pub struct AnnotationStyle {
    pub font_size: f32,
    pub fallback_x: f32,
    pub fallback_y: f32,
    pub fallback_row_step: f32,
    pub patch_width: u32,
    pub patch_height: u32,
    pub text_color: Rgba<u8>,
    pub background: Rgba<u8>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for AnnotationStyle {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            font_size: settings.font_size,
            fallback_x: settings.fallback_x,
            fallback_y: settings.fallback_y,
            fallback_row_step: settings.fallback_row_step,
            patch_width: settings.patch_width.max(1),
            patch_height: settings.patch_height.max(1),
            text_color: Rgba([0, 0, 0, 255]),
            background: Rgba([255, 255, 255, 255]),
        }
    }
}

impl AnnotationStyle {
    /// Where a field's value goes: its recorded position, or a fallback
    /// row derived from its index in the list
    pub fn fill_position(&self, field: &FormField, index: usize) -> (i32, i32) {
        let (x, y) = field.position().unwrap_or((
            self.fallback_x,
            self.fallback_y + index as f32 * self.fallback_row_step,
        ));
        (x.round() as i32, y.round() as i32)
    }
}

/// Draws filled values onto a copy of the source image
pub struct Annotator {
    font: FontVec,
    style: AnnotationStyle,
}

impl Annotator {
    pub fn new(font: FontVec, style: AnnotationStyle) -> Self {
        Self { font, style }
    }

    /// Build from export settings, loading the configured or a system font
    pub fn from_settings(settings: &ExportSettings) -> Result<Self, ExportError> {
        let font = load_font(settings.font_path.as_deref())?;
        Ok(Self::new(font, AnnotationStyle::from(settings)))
    }

    /// Draw every non-empty value onto a copy of `source`
    pub fn render(&self, source: &DynamicImage, fields: &[FormField]) -> RgbaImage {
        let mut canvas = source.to_rgba8();
        let scale = PxScale::from(self.style.font_size);

        for (index, field) in fields.iter().enumerate() {
            if field.value.is_empty() {
                continue;
            }

            let (x, y) = self.style.fill_position(field, index);
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(x - 2, y - 2).of_size(self.style.patch_width, self.style.patch_height),
                self.style.background,
            );
            draw_text_mut(&mut canvas, self.style.text_color, x, y, scale, &self.font, &field.value);
            debug!("Drew {:?} at ({}, {})", field.label, x, y);
        }

        canvas
    }

    /// Render and encode as PNG
    pub fn render_png(&self, source: &DynamicImage, fields: &[FormField]) -> Result<Vec<u8>, ExportError> {
        let canvas = self.render(source, fields);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Load a font from `path`, or the first readable system font
pub fn load_font(path: Option<&Path>) -> Result<FontVec, ExportError> {
    if let Some(path) = path {
        let data = std::fs::read(path)?;
        return FontVec::try_from_vec(data).map_err(|_| ExportError::InvalidFont(path.to_path_buf()));
    }

    SYSTEM_FONTS
        .iter()
        .filter_map(|candidate| std::fs::read(candidate).ok())
        .find_map(|data| FontVec::try_from_vec(data).ok())
        .ok_or(ExportError::FontUnavailable)
}

/// `Label: value` lines in field order
pub fn render_text(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}\n", f.label, f.value))
        .collect()
}

/// Downloadable result of a session
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Png(Vec<u8>),
    Text(String),
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Png(_) => PNG_FILE_NAME,
            Artifact::Text(_) => TEXT_FILE_NAME,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Artifact::Png(bytes) => bytes,
            Artifact::Text(text) => text.as_bytes(),
        }
    }

    /// Write into `dir` under the artifact's file name
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.bytes())?;
        info!("Wrote {:?} ({} bytes)", path, self.bytes().len());
        Ok(path)
    }
}

/// Annotated PNG when both an image and an annotator are available,
/// otherwise the text dump
pub fn export_artifact(
    fields: &[FormField],
    source: Option<&DynamicImage>,
    annotator: Option<&Annotator>,
) -> Result<Artifact, ExportError> {
    match (source, annotator) {
        (Some(image), Some(annotator)) => Ok(Artifact::Png(annotator.render_png(image, fields)?)),
        _ => Ok(Artifact::Text(render_text(fields))),
    }
}
