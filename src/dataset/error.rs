use std::path::PathBuf;

use crate::config::ConfigError;
use crate::metadata::MetadataError;
use crate::notifications::{ids, NotificationError};
use crate::nwb::SourceError;
use crate::remote::RemoteError;

/// Errors that can occur while converting a dataset or one of its sessions
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error extracting or writing metadata
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),

    /// Error reading a source file
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error resolving the run configuration
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Error talking to a remote archive
    #[error("Remote archive error: {0}")]
    RemoteError(#[from] RemoteError),

    /// A notification could not be built
    #[error(transparent)]
    NotificationError(#[from] NotificationError),

    /// The input paths resolved to no NWB files
    #[error("No .nwb files found in: {}", format_paths(.0))]
    NoSourceFiles(Vec<PathBuf>),

    /// A source file has no session identifier
    #[error("Source file {0} has no session identifier; every output path depends on it")]
    MissingSessionId(PathBuf),

    /// More than one source file belongs to a session
    #[error(
        "Session '{session_id}' has {count} source files; \
         converting multiple files per session is not yet implemented"
    )]
    MultipleFilesPerSession {
        /// Session label
        session_id: String,
        /// Number of files
        count: usize,
    },

    /// Symlink creation failed even though the filesystem supports links
    #[error("Could not symlink {} -> {}: {source}", .link.display(), .target.display())]
    SymlinkFailed {
        /// Link location
        link: PathBuf,
        /// Link target
        target: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A remote source was selected but no archive client is attached
    #[error("No archive client available to fetch {0}")]
    NoArchiveClient(String),

    /// Sessions whose labels sanitize to the same output path
    #[error("{} map to the same label '{label}'", .identifiers.join(", "))]
    LabelCollision {
        /// Sanitized label, e.g. `sub-m1/ses-s+1`
        label: String,
        /// Raw identifiers that collide
        identifiers: Vec<String>,
    },

    /// Session metadata was needed but extraction did not succeed
    #[error("Metadata for session '{0}' has not been extracted")]
    MetadataNotExtracted(String),
}

impl ConversionError {
    /// Catalog identifier of the notification this error becomes when caught.
    pub fn notification_identifier(&self) -> &'static str {
        match self {
            ConversionError::MetadataError(e) => e.notification_identifier(),
            ConversionError::MultipleFilesPerSession { .. } => ids::MULTIPLE_FILES_PER_SESSION,
            ConversionError::MissingSessionId(_) => ids::INVALID_SESSION_ID,
            ConversionError::LabelCollision { .. } => ids::LABEL_COLLISION,
            ConversionError::RemoteError(_) | ConversionError::NoArchiveClient(_) => {
                ids::DANDISET_ACCESS_ERROR
            }
            _ => ids::INTERNAL_ERROR,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
