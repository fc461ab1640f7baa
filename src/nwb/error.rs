use std::path::PathBuf;

/// Errors raised while reading source recordings
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error while opening a source file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No recording is registered for this path
    #[error("Source file not found: {0}")]
    NotFound(PathBuf),

    /// The file is not a readable NWB file
    #[error("Invalid NWB file {path}: {message}")]
    InvalidFile {
        /// Offending file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// The reader cannot open this kind of location
    #[error("Unsupported source location: {0}")]
    UnsupportedLocation(String),

    /// The crate was built without a reader for this format
    #[error("No NWB reader available: {0}")]
    ReaderUnavailable(String),
}
