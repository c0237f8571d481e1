//! Notice types reported back to the user

use std::fmt;

use crate::forms::SessionError;

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress or neutral information
    Info,
    /// An action completed
    Success,
    /// An action failed; nothing was changed
    Error,
}

/// A transient notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short headline
    pub title: String,
    /// Detail line
    pub description: String,
    /// Presentation hint
    pub severity: Severity,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Severity::Info)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Severity::Success)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Severity::Error)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn invalid_file_type() -> Self {
        Self::error(
            "Invalid file type",
            "Please upload an image (JPG, PNG, WEBP) or PDF file",
        )
    }

    pub fn processing_started() -> Self {
        Self::info("Processing document", "Extracting text from your form...")
    }

    pub fn text_extracted(field_count: usize) -> Self {
        Self::success(
            "Text extracted successfully",
            format!("Found {} form fields", field_count),
        )
    }

    pub fn processing_failed() -> Self {
        Self::error("Processing failed", "Unable to extract text from the document")
    }

    pub fn missing_required(labels: &[String]) -> Self {
        Self::error(
            "Missing required fields",
            format!("Please fill all required fields: {}", labels.join(", ")),
        )
    }

    pub fn form_completed() -> Self {
        Self::success("Form completed", "Your form has been filled successfully")
    }

    pub fn save_failed() -> Self {
        Self::error("Error", "Failed to save form data")
    }

    pub fn eligibility_checked(result: impl Into<String>) -> Self {
        Self::success("Eligibility Checked", result)
    }

    pub fn downloaded(file_name: &str) -> Self {
        Self::success("Downloaded", format!("Filled form saved as {}", file_name))
    }

    pub fn export_failed() -> Self {
        Self::error("Error", "Failed to generate filled form")
    }
}

impl From<&SessionError> for Notice {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::MissingRequired(labels) => Notice::missing_required(labels),
            SessionError::Persistence(_) => Notice::save_failed(),
            other => Notice::error("Error", other.to_string()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.severity {
            Severity::Info => "..",
            Severity::Success => "ok",
            Severity::Error => "!!",
        };
        write!(f, "[{}] {}: {}", marker, self.title, self.description)
    }
}
