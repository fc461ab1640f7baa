use std::path::PathBuf;

use crate::notifications::ids;

/// Errors that can occur during metadata extraction and serialization
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// I/O error reading or writing a sidecar
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV/TSV error
    #[error("TSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A notification could not be built
    #[error(transparent)]
    Notification(#[from] crate::notifications::NotificationError),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Extraction was asked to combine recordings
    #[error("Extracting metadata from {0} files of one session is not yet implemented")]
    MultipleRecordings(usize),

    /// Extraction was given nothing to extract from
    #[error("No source recordings given")]
    NoRecordings,

    /// The subject has no identifier
    #[error("Source file {0} has no subject identifier")]
    MissingSubjectId(PathBuf),

    /// Both extracellular and intracellular electrodes are present
    #[error(
        "Source file {0} contains both extracellular and intracellular electrodes; \
         mixed-modality conversion is not yet implemented"
    )]
    AmbiguousModality(PathBuf),

    /// Two interval tables share a name
    #[error("Interval table name '{0}' is used more than once")]
    DuplicateIntervalTable(String),

    /// A source table already carries the synthesized `nwb_table` column
    #[error("Interval table '{table}' has a column named 'nwb_table', which is reserved")]
    ReservedColumnName {
        /// Offending table
        table: String,
    },

    /// The user supplied a GeneratedBy entry for this tool that does not match it
    #[error("GeneratedBy already contains a conflicting entry for '{0}'")]
    ConflictingGeneratedBy(String),

    /// dataset_description is missing a required field
    #[error("dataset_description is missing required field '{0}'")]
    MissingDescriptionField(String),
}

impl MetadataError {
    /// Catalog identifier of the notification this error becomes when caught.
    pub fn notification_identifier(&self) -> &'static str {
        match self {
            MetadataError::MissingSubjectId(_) => ids::MISSING_PARTICIPANT_ID,
            MetadataError::AmbiguousModality(_) => ids::AMBIGUOUS_MODALITY,
            MetadataError::DuplicateIntervalTable(_) | MetadataError::ReservedColumnName { .. } => {
                ids::INVALID_INTERVAL_TABLES
            }
            MetadataError::MultipleRecordings(_) => ids::MULTIPLE_FILES_PER_SESSION,
            _ => ids::INTERNAL_ERROR,
        }
    }
}
