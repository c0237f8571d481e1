//! Application Coordinator
//!
//! Wires the OCR engine, the form session, the exporter and the eligibility
//! log together, and turns every outcome into user-facing notices.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::{AppConfig, ExportSettings};
use crate::eligibility::EligibilityCheck;
use crate::forms::{
    export_artifact, Annotator, FormField, FormSession, FormStep, PreviewResource, SessionError,
    SourceDocument,
};
use crate::shared::Notice;
use crate::storage::{self, Database, LogStore};
use crate::vision::{self, validate_upload, OcrEngine, UploadError, UploadKind};

/// Main application coordinator
pub struct FormAssistApp {
    /// Loaded configuration
    config: AppConfig,
    /// External OCR engine
    ocr: Box<dyn OcrEngine>,
    /// Eligibility log
    store: Box<dyn LogStore>,
    /// Current form filling session
    session: FormSession,
    /// Where preview copies of uploads are kept
    preview_dir: PathBuf,
}

impl FormAssistApp {
    /// Create a coordinator from explicit collaborators
    pub fn new(
        config: AppConfig,
        ocr: Box<dyn OcrEngine>,
        store: Box<dyn LogStore>,
        preview_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            ocr,
            store,
            session: FormSession::new(),
            preview_dir,
        }
    }

    /// Create a coordinator using the configured OCR backend and database
    pub fn open(config: AppConfig) -> Result<Self> {
        let db_path = storage::get_database_path(&config.storage)?;
        let store = Database::open(&db_path)?;
        let ocr = vision::create_engine(&config.ocr);
        let preview_dir = storage::get_preview_dir()?;

        info!("Using {} OCR, log at {:?}", ocr.name(), db_path);
        Ok(Self::new(config, ocr, Box::new(store), preview_dir))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        &self.config.general.user_id
    }

    pub fn session(&self) -> &FormSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut FormSession {
        &mut self.session
    }

    /// Validate, preview and recognize an uploaded form.
    ///
    /// On success the session moves to review; on failure it stays in upload.
    pub async fn upload(&mut self, path: &Path) -> Vec<Notice> {
        // Reject before copying a preview that would be thrown away
        if self.session.is_busy() {
            return vec![Notice::from(&SessionError::Busy)];
        }

        let kind = match validate_upload(path, self.config.upload.max_size_mb) {
            Ok(kind) => kind,
            Err(UploadError::InvalidFileType(_)) => return vec![Notice::invalid_file_type()],
            Err(e) => return vec![Notice::error("Error", e.to_string())],
        };

        let preview = match PreviewResource::create(path, &self.preview_dir, kind) {
            Ok(preview) => Some(preview),
            Err(e) => {
                warn!("Continuing without preview: {:#}", e);
                None
            }
        };

        let document = SourceDocument {
            path: path.to_path_buf(),
            kind,
        };
        if let Err(e) = self.session.select_file(document, preview) {
            return vec![Notice::from(&e)];
        }
        if let Err(e) = self.session.begin_recognition() {
            return vec![Notice::from(&e)];
        }

        let mut notices = vec![Notice::processing_started()];
        let input = self.session.preview_path().unwrap_or(path).to_path_buf();

        match self.ocr.recognize(&input, &self.config.ocr.language).await {
            Ok(recognition) => match self.session.complete_recognition(recognition) {
                Ok(count) => notices.push(Notice::text_extracted(count)),
                Err(e) => notices.push(Notice::from(&e)),
            },
            Err(e) => {
                error!("OCR error: {:#}", e);
                self.session.fail_recognition();
                notices.push(Notice::processing_failed());
            }
        }

        notices
    }

    /// Enter the fill step, applying `values` to fields by label
    /// (case-insensitive). Returns the labels that matched no field.
    pub fn fill(&mut self, values: &[(String, String)]) -> Result<Vec<String>> {
        if self.session.step() == FormStep::Review {
            self.session.continue_to_fill()?;
        }

        let mut unknown = Vec::new();
        for (label, value) in values {
            let index = self
                .session
                .fields()
                .iter()
                .position(|f| f.label.eq_ignore_ascii_case(label));
            match index {
                Some(index) => self.session.update_field(index, value.clone())?,
                None => unknown.push(label.clone()),
            }
        }
        Ok(unknown)
    }

    /// Leave fill for another review pass; entered values are kept
    pub fn back_to_review(&mut self) -> Result<()> {
        self.session.back_to_review()?;
        Ok(())
    }

    /// Submit the filled form to the log
    pub fn submit(&mut self) -> Notice {
        let user_id = self.config.general.user_id.clone();
        match self.session.submit(self.store.as_ref(), &user_id) {
            Ok(_) => Notice::form_completed(),
            Err(e) => {
                error!("Error saving form: {}", e);
                Notice::from(&e)
            }
        }
    }

    /// Write the filled form into `out_dir`; only available once complete
    pub fn download(&self, out_dir: &Path) -> Result<PathBuf> {
        if self.session.step() != FormStep::Complete {
            bail!("form is not complete (current step: {})", self.session.step());
        }

        let source = self.session.document().map(|doc| {
            let path = self.session.preview_path().unwrap_or(doc.path.as_path());
            (path, doc.kind)
        });
        export_fields(self.session.fields(), source, &self.config.export, out_dir)
    }

    /// Evaluate an eligibility check and record it
    pub fn run_check(&self, check: &dyn EligibilityCheck) -> Vec<Notice> {
        let log = check.to_log(self.user_id());
        let mut notices = vec![Notice::eligibility_checked(log.result.clone())];

        if let Err(e) = self.store.insert(&log) {
            error!("Failed to record {} check: {:#}", log.service_type, e);
            notices.push(Notice::error("Error", "Failed to save eligibility result"));
        }
        notices
    }

    /// Discard the current session
    pub fn reset(&mut self) -> Result<()> {
        self.session.reset()?;
        Ok(())
    }
}

/// Export `fields` as an annotated PNG when the source is a raster image and
/// a font is available, otherwise as a text dump.
pub fn export_fields(
    fields: &[FormField],
    source: Option<(&Path, UploadKind)>,
    settings: &ExportSettings,
    out_dir: &Path,
) -> Result<PathBuf> {
    let image = match source {
        Some((path, kind)) if kind.is_raster() => Some(
            image::open(path).with_context(|| format!("Failed to load source image {:?}", path))?,
        ),
        _ => None,
    };

    let annotator = match image {
        Some(_) => match Annotator::from_settings(settings) {
            Ok(annotator) => Some(annotator),
            Err(e) => {
                warn!("Falling back to text export: {}", e);
                None
            }
        },
        None => None,
    };

    let artifact = export_artifact(fields, image.as_ref(), annotator.as_ref())?;
    Ok(artifact.write_to(out_dir)?)
}
