//! Error handling for animation export
//!
//! Every error carries a stable code and, where the artist can act on it,
//! recovery suggestions for the presentation shell.

use std::path::PathBuf;

use thiserror::Error;

use crate::host::HostError;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// User input that violates an invariant.
///
/// Always reported through a blocking, non-fatal dialog. The operation that
/// produced it made no state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    // Export preconditions, checked in this order
    #[error("No export prefix is set")]
    MissingPrefix,

    #[error("No objects are configured for export")]
    NoExportObjects,

    #[error("None of the configured export objects exist in the scene")]
    NoExistingExportObjects,

    #[error("No export folders are configured")]
    NoExportFolders,

    #[error("None of the configured export folders exist on disk")]
    NoExistingExportFolders,

    #[error("Animation '{name}' has no usable name or frame range")]
    IncompleteEntry { name: String },

    // Setter rules
    #[error("Invalid prefix '{candidate}': {reason}")]
    InvalidPrefix { candidate: String, reason: String },

    #[error("Invalid animation name '{candidate}': {reason}")]
    InvalidName { candidate: String, reason: String },

    #[error("An animation named '{candidate}' already exists")]
    DuplicateName { candidate: String },

    #[error("Invalid frame range: start {start} must be before end {end}")]
    InvertedRange { start: i32, end: i32 },

    #[error("Nothing is selected")]
    NothingSelected,

    #[error("Export folder '{path}' is already configured")]
    DuplicateFolder { path: String },
}

/// Main error type for export operations
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// An edit referenced a layer or object the scene no longer has.
    #[error("Stale reference: '{name}' no longer exists in the scene")]
    StaleReference { name: String },

    /// Only produced by strict decoding; `load` recovers these locally.
    #[error("Could not decode stored data under '{key}': {reason}")]
    PersistenceDecode { key: String, reason: String },

    #[error("Export to {} failed: {source}", .path.display())]
    ExportInvocation {
        path: PathBuf,
        #[source]
        source: HostError,
    },

    #[error("An export is already in progress")]
    ReentrantExport,

    #[error("Animation not found: {name}")]
    EntryNotFound { name: String },

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExportError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::Validation(failure) => match failure {
                ValidationFailure::MissingPrefix => "MISSING_PREFIX",
                ValidationFailure::NoExportObjects => "NO_EXPORT_OBJECTS",
                ValidationFailure::NoExistingExportObjects => "NO_EXISTING_EXPORT_OBJECTS",
                ValidationFailure::NoExportFolders => "NO_EXPORT_FOLDERS",
                ValidationFailure::NoExistingExportFolders => "NO_EXISTING_EXPORT_FOLDERS",
                ValidationFailure::IncompleteEntry { .. } => "INCOMPLETE_ENTRY",
                ValidationFailure::InvalidPrefix { .. } => "INVALID_PREFIX",
                ValidationFailure::InvalidName { .. } => "INVALID_NAME",
                ValidationFailure::DuplicateName { .. } => "DUPLICATE_NAME",
                ValidationFailure::InvertedRange { .. } => "INVERTED_RANGE",
                ValidationFailure::NothingSelected => "NOTHING_SELECTED",
                ValidationFailure::DuplicateFolder { .. } => "DUPLICATE_FOLDER",
            },
            ExportError::StaleReference { .. } => "STALE_REFERENCE",
            ExportError::PersistenceDecode { .. } => "PERSISTENCE_DECODE",
            ExportError::ExportInvocation { .. } => "EXPORT_INVOCATION",
            ExportError::ReentrantExport => "REENTRANT_EXPORT",
            ExportError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            ExportError::Host(_) => "HOST_ERROR",
            ExportError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by the artist without restarting
    /// the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExportError::Validation(_)
                | ExportError::StaleReference { .. }
                | ExportError::PersistenceDecode { .. }
                | ExportError::ReentrantExport
                | ExportError::EntryNotFound { .. }
        )
    }

    /// Returns true for failures the shell should show as a plain dialog.
    pub fn is_validation(&self) -> bool {
        matches!(self, ExportError::Validation(_))
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ExportError::Validation(ValidationFailure::MissingPrefix) => {
                vec!["Enter a prefix between 3 and 29 characters"]
            }
            ExportError::Validation(ValidationFailure::NoExportObjects)
            | ExportError::Validation(ValidationFailure::NothingSelected) => vec![
                "Select the rig root or meshes in the scene",
                "Use the selection to set the export objects",
            ],
            ExportError::Validation(ValidationFailure::NoExistingExportObjects) => vec![
                "The configured objects may have been renamed or deleted",
                "Replace the export objects with the current selection",
            ],
            ExportError::Validation(ValidationFailure::NoExportFolders) => {
                vec!["Add at least one export folder"]
            }
            ExportError::Validation(ValidationFailure::NoExistingExportFolders) => vec![
                "Create the export folder on disk",
                "Check the project root is set correctly",
            ],
            ExportError::Validation(ValidationFailure::DuplicateName { .. }) => {
                vec!["Animation names must be unique, ignoring case and spaces"]
            }
            ExportError::Validation(ValidationFailure::InvertedRange { .. }) => {
                vec!["The start frame must be lower than the end frame"]
            }
            ExportError::ReentrantExport => {
                vec!["Wait for the current export to finish before starting another"]
            }
            ExportError::ExportInvocation { .. } => vec![
                "Check the export plugin is loaded",
                "Check the destination file is not open in another program",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            ExportError::Validation(failure) => failure.to_string(),
            ExportError::ExportInvocation { path, .. } => {
                format!(
                    "Exporting to '{}' failed. The scene has been restored.",
                    path.display()
                )
            }
            ExportError::ReentrantExport => {
                "An export is still running. Try again once it has finished.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
