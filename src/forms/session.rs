//! Form review/fill session
//!
//! One upload-to-download cycle as an explicit state machine:
//!
//! ```text
//! upload --recognized--> review --continue--> fill --submit--> complete
//!   ^                      |  ^                 |                  |
//!   +-------reset----------+  +------back-------+                  |
//!   +-------------------------------reset--------------------------+
//! ```
//!
//! The session exclusively owns its field list; every transition goes through
//! a named method that checks the current step first.

use anyhow::{Context, Result};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::detection::detect_fields;
use super::field::FormField;
use crate::eligibility::ServiceType;
use crate::storage::{EligibilityLog, LogStore};
use crate::vision::{Recognition, UploadKind};

/// Result string recorded for a completed form
pub const FORM_COMPLETED_RESULT: &str = "Form completed successfully";

/// Lifecycle step of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStep {
    #[default]
    Upload,
    Review,
    Fill,
    Complete,
}

impl FormStep {
    pub fn name(&self) -> &'static str {
        match self {
            FormStep::Upload => "upload",
            FormStep::Review => "review",
            FormStep::Fill => "fill",
            FormStep::Complete => "complete",
        }
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from session transitions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while in the {from} step")]
    InvalidTransition { from: FormStep, action: &'static str },

    #[error("another operation is already in progress")]
    Busy,

    #[error("no document selected")]
    NoDocument,

    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("field index {index} out of range ({len} fields)")]
    FieldOutOfRange { index: usize, len: usize },

    #[error("failed to save form data: {0:#}")]
    Persistence(anyhow::Error),
}

/// The uploaded document
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub kind: UploadKind,
}

/// Private copy of an upload used for preview and annotation.
///
/// The copy is deleted when the handle is released or dropped, so a reset,
/// a replacement upload or an abandoned session never leaves it behind.
#[derive(Debug)]
pub struct PreviewResource {
    path: PathBuf,
}

impl PreviewResource {
    /// Copy `source` into `dir` under a fresh name
    pub fn create(source: &Path, dir: &Path, kind: UploadKind) -> Result<Self> {
        let path = dir.join(format!("{}.{}", uuid::Uuid::new_v4(), kind.extension()));
        std::fs::copy(source, &path)
            .with_context(|| format!("Failed to create preview of {:?}", source))?;
        debug!("Created preview {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the preview now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PreviewResource {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released preview {:?}", self.path),
            Err(e) => warn!("Failed to release preview {:?}: {}", self.path, e),
        }
    }
}

/// In-memory state of one form filling cycle
#[derive(Debug, Default)]
pub struct FormSession {
    step: FormStep,
    document: Option<SourceDocument>,
    extracted_text: String,
    fields: Vec<FormField>,
    preview: Option<PreviewResource>,
    recognizing: bool,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn document(&self) -> Option<&SourceDocument> {
        self.document.as_ref()
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.preview.as_ref().map(|p| p.path())
    }

    /// Whether a recognition is in flight
    pub fn is_busy(&self) -> bool {
        self.recognizing
    }

    /// Labels of required fields that are still empty
    pub fn missing_required(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_missing())
            .map(|f| f.label.clone())
            .collect()
    }

    fn expect_step(&self, allowed: &[FormStep], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.step,
                action,
            })
        }
    }

    /// Select the document to process, replacing any earlier selection
    pub fn select_file(
        &mut self,
        document: SourceDocument,
        preview: Option<PreviewResource>,
    ) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Upload], "select a file")?;
        if self.recognizing {
            return Err(SessionError::Busy);
        }

        info!("Selected {:?} ({})", document.path, document.kind.mime());
        self.document = Some(document);
        // Assigning drops (and releases) the previous preview
        self.preview = preview;
        Ok(())
    }

    /// Mark a recognition as started
    pub fn begin_recognition(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Upload], "start recognition")?;
        if self.recognizing {
            return Err(SessionError::Busy);
        }
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        self.recognizing = true;
        Ok(())
    }

    /// Store recognized text, detect fields and move to review.
    ///
    /// Returns the number of detected fields.
    pub fn complete_recognition(&mut self, recognition: Recognition) -> Result<usize, SessionError> {
        self.expect_step(&[FormStep::Upload], "finish recognition")?;
        if !self.recognizing {
            return Err(SessionError::InvalidTransition {
                from: self.step,
                action: "finish a recognition that was not started",
            });
        }

        self.fields = detect_fields(&recognition.text, recognition.word_boxes());
        self.extracted_text = recognition.text;
        self.recognizing = false;
        self.step = FormStep::Review;

        info!("Detected {} form fields", self.fields.len());
        Ok(self.fields.len())
    }

    /// Abandon a failed recognition; the session stays in upload
    pub fn fail_recognition(&mut self) {
        self.recognizing = false;
    }

    /// Enter review with a previously saved field list
    pub fn resume(
        &mut self,
        document: Option<SourceDocument>,
        extracted_text: String,
        fields: Vec<FormField>,
    ) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Upload], "resume a draft")?;
        if self.recognizing {
            return Err(SessionError::Busy);
        }

        if document.is_some() {
            self.document = document;
        }
        self.extracted_text = extracted_text;
        self.fields = fields;
        self.step = FormStep::Review;
        Ok(())
    }

    pub fn continue_to_fill(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Review], "continue to fill")?;
        self.step = FormStep::Fill;
        Ok(())
    }

    /// Go back to review, keeping edits
    pub fn back_to_review(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Fill], "go back to review")?;
        self.step = FormStep::Review;
        Ok(())
    }

    /// Replace the value of one field
    pub fn update_field(&mut self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Fill], "edit fields")?;
        let len = self.fields.len();
        let field = self
            .fields
            .get_mut(index)
            .ok_or(SessionError::FieldOutOfRange { index, len })?;
        field.value = value.into();
        Ok(())
    }

    /// Validate required fields, record the form and complete the session.
    ///
    /// On any error the session stays in fill.
    pub fn submit(&mut self, store: &dyn LogStore, user_id: &str) -> Result<i64, SessionError> {
        self.expect_step(&[FormStep::Fill], "submit")?;

        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(SessionError::MissingRequired(missing));
        }

        let record = EligibilityLog {
            user_id: user_id.to_string(),
            service_type: ServiceType::FormFiller,
            input_data: json!({ "fields": self.fields }),
            result: FORM_COMPLETED_RESULT.to_string(),
        };
        let id = store.insert(&record).map_err(SessionError::Persistence)?;

        self.step = FormStep::Complete;
        info!("Form submitted ({} fields, log id {})", self.fields.len(), id);
        Ok(id)
    }

    /// Discard everything and return to upload, releasing the preview
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.expect_step(&[FormStep::Upload, FormStep::Review, FormStep::Complete], "reset")?;
        if self.recognizing {
            return Err(SessionError::Busy);
        }

        if let Some(preview) = self.preview.take() {
            preview.release();
        }
        *self = Self::default();
        debug!("Session reset");
        Ok(())
    }
}
