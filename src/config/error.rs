use std::path::PathBuf;

/// Errors that can occur while resolving a run configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while preparing directories or report files
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The existing dataset_description.json is not valid JSON
    #[error("Invalid dataset_description.json: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The BIDS directory path points at a file
    #[error("BIDS directory is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Non-empty directory that does not look like a BIDS dataset
    #[error(
        "Directory {0} is not empty and has no dataset_description.json; \
         refusing to write a BIDS dataset into it"
    )]
    NonBidsDirectory(PathBuf),

    /// dataset_description.json without BIDSVersion
    #[error("dataset_description.json in {0} does not declare a BIDSVersion")]
    MissingBidsVersion(PathBuf),

    /// The additional metadata file does not exist
    #[error("Additional metadata file does not exist: {0}")]
    MissingAdditionalMetadata(PathBuf),
}
