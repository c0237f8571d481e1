//! User-facing notifications
//!
//! Every outcome of a user action (upload, submission, check, download) is
//! reported as a transient notice; the front end decides how to show it.

pub mod messages;

pub use messages::Notice;
