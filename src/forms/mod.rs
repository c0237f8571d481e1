//! Form Filling
//!
//! Detects fillable fields in recognized text, walks the user through
//! review and fill, and exports the filled result.

pub mod detection;
pub mod export;
pub mod field;
pub mod session;

pub use detection::detect_fields;
pub use export::{export_artifact, Annotator};
pub use field::FormField;
pub use session::{FormSession, FormStep, PreviewResource, SessionError, SourceDocument};
