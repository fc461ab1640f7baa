//! Static catalog of every issue the converter knows how to report.
//!
//! Each entry is addressed by a stable identifier (see [`ids`]) and is turned
//! into a concrete [`Notification`](super::Notification) with
//! [`Notification::from_definition`](super::Notification::from_definition).

use super::{Category, DataStandard, Severity};

/// Immutable template for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationDefinition {
    /// Stable identifier used to look the template up
    pub identifier: &'static str,
    /// Short human-readable title
    pub title: &'static str,
    /// Why this is a problem
    pub reason: &'static str,
    /// How to fix it
    pub solution: &'static str,
    /// Example values that would pass
    pub examples: &'static [&'static str],
    /// Metadata field the issue refers to
    pub field: Option<&'static str>,
    /// Standards whose rules are involved
    pub data_standards: &'static [DataStandard],
    /// Kind of issue
    pub category: Category,
    /// How bad it is
    pub severity: Severity,
}

/// Catalog identifiers.
pub mod ids {
    /// The NWB subject has no identifier.
    pub const MISSING_PARTICIPANT_ID: &str = "MissingParticipantID";
    /// The participant identifier has characters BIDS labels may not contain.
    pub const INVALID_PARTICIPANT_ID: &str = "InvalidParticipantID";
    /// No species on the NWB subject.
    pub const MISSING_PARTICIPANT_SPECIES: &str = "MissingParticipantSpecies";
    /// Species is neither a Latin binomial nor a taxonomy URL.
    pub const INVALID_PARTICIPANT_SPECIES: &str = "InvalidParticipantSpecies";
    /// No sex on the NWB subject.
    pub const MISSING_PARTICIPANT_SEX: &str = "MissingParticipantSex";
    /// Sex could not be mapped to an accepted spelling.
    pub const INVALID_PARTICIPANT_SEX: &str = "InvalidParticipantSex";
    /// Sex was a recognizable variant and has been corrected.
    pub const NONSTANDARD_PARTICIPANT_SEX: &str = "NonstandardParticipantSex";
    /// The session identifier has characters BIDS labels may not contain.
    pub const INVALID_SESSION_ID: &str = "InvalidSessionID";
    /// An interval table has an empty description.
    pub const MISSING_INTERVAL_TABLE_DESCRIPTION: &str = "MissingIntervalTableDescription";
    /// An event column has an empty description.
    pub const MISSING_EVENT_COLUMN_DESCRIPTION: &str = "MissingEventColumnDescription";
    /// No electrode has any coordinate.
    pub const MISSING_ELECTRODE_COORDINATES: &str = "MissingElectrodeCoordinates";
    /// No dataset description was supplied.
    pub const MISSING_DATASET_DESCRIPTION: &str = "MissingDatasetDescription";
    /// Interval tables collide by name or with the synthesized column.
    pub const INVALID_INTERVAL_TABLES: &str = "InvalidIntervalTables";
    /// More than one file shares a session identifier.
    pub const MULTIPLE_FILES_PER_SESSION: &str = "MultipleFilesPerSession";
    /// Both extracellular and intracellular electrodes are present.
    pub const AMBIGUOUS_MODALITY: &str = "AmbiguousModality";
    /// Distinct identifiers sanitize to the same BIDS label.
    pub const LABEL_COLLISION: &str = "LabelCollision";
    /// A remote dandiset could not be listed or read.
    pub const DANDISET_ACCESS_ERROR: &str = "DandisetAccessError";
    /// Anything else that went wrong inside the converter.
    pub const INTERNAL_ERROR: &str = "InternalError";
}

const BIDS: &[DataStandard] = &[DataStandard::Bids];
const NWB: &[DataStandard] = &[DataStandard::Nwb];
const NWB_BIDS: &[DataStandard] = &[DataStandard::Nwb, DataStandard::Bids];

/// Every known notification.
pub static DEFINITIONS: &[NotificationDefinition] = &[
    NotificationDefinition {
        identifier: ids::MISSING_PARTICIPANT_ID,
        title: "Missing participant identifier",
        reason: "The NWB file has no subject identifier. Every BIDS path is built from the \
                 participant label, so this session cannot be converted.",
        solution: "Set `subject_id` on the NWB Subject object.",
        examples: &["mouse001", "R12"],
        field: Some("participant_id"),
        data_standards: NWB_BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Critical,
    },
    NotificationDefinition {
        identifier: ids::INVALID_PARTICIPANT_ID,
        title: "Invalid participant identifier",
        reason: "The participant identifier contains characters outside [A-Za-z0-9], \
                 which BIDS does not allow in labels.",
        solution: "Rename the subject in the NWB file or run with `--sanitization-level critical`.",
        examples: &["mouse001"],
        field: Some("participant_id"),
        data_standards: BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::MISSING_PARTICIPANT_SPECIES,
        title: "Missing participant species",
        reason: "Species is required for archival of animal and human data; the \
                 participants table will contain `n/a`.",
        solution: "Set `species` on the NWB Subject object.",
        examples: &["Mus musculus", "http://purl.obolibrary.org/obo/NCBITaxon_10090"],
        field: Some("species"),
        data_standards: NWB_BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Critical,
    },
    NotificationDefinition {
        identifier: ids::INVALID_PARTICIPANT_SPECIES,
        title: "Invalid participant species",
        reason: "Species should be a Latin binomial or an NCBI taxonomy URL.",
        solution: "Replace common names with the Latin binomial.",
        examples: &["Mus musculus", "Rattus norvegicus", "Homo sapiens"],
        field: Some("species"),
        data_standards: NWB_BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::MISSING_PARTICIPANT_SEX,
        title: "Missing participant sex",
        reason: "Sex is required for archival; the participants table will contain `n/a`.",
        solution: "Set `sex` on the NWB Subject object (M, F, U or O).",
        examples: &["M", "F", "U", "O"],
        field: Some("sex"),
        data_standards: NWB_BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Critical,
    },
    NotificationDefinition {
        identifier: ids::INVALID_PARTICIPANT_SEX,
        title: "Invalid participant sex",
        reason: "The value is not one of the accepted spellings and was written unchanged.",
        solution: "Use one of the accepted spellings.",
        examples: &["male", "female", "other", "n/a"],
        field: Some("sex"),
        data_standards: NWB_BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::NONSTANDARD_PARTICIPANT_SEX,
        title: "Nonstandard participant sex",
        reason: "The value was a recognizable variant of an accepted spelling and has \
                 been corrected in the output.",
        solution: "Use one of the accepted spellings in the NWB file.",
        examples: &["M", "F", "U", "O"],
        field: Some("sex"),
        data_standards: NWB,
        category: Category::StyleSuggestion,
        severity: Severity::Warning,
    },
    NotificationDefinition {
        identifier: ids::INVALID_SESSION_ID,
        title: "Invalid session identifier",
        reason: "The session identifier contains characters outside [A-Za-z0-9], which \
                 BIDS does not allow in labels.",
        solution: "Rename the session in the NWB file or run with `--sanitization-level critical`.",
        examples: &["20240131", "day1"],
        field: Some("session_id"),
        data_standards: BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::MISSING_INTERVAL_TABLE_DESCRIPTION,
        title: "Missing interval table description",
        reason: "The events sidecar documents each source table; an empty description \
                 leaves the `nwb_table` levels undocumented.",
        solution: "Provide a description when creating the TimeIntervals table.",
        examples: &[],
        field: Some("nwb_table"),
        data_standards: NWB,
        category: Category::StyleSuggestion,
        severity: Severity::Hint,
    },
    NotificationDefinition {
        identifier: ids::MISSING_EVENT_COLUMN_DESCRIPTION,
        title: "Missing event column description",
        reason: "An interval table column has no description, so the events sidecar \
                 cannot document it.",
        solution: "Describe the column in the NWB file or in the additional metadata file.",
        examples: &[],
        field: None,
        data_standards: NWB_BIDS,
        category: Category::StyleSuggestion,
        severity: Severity::Info,
    },
    NotificationDefinition {
        identifier: ids::MISSING_ELECTRODE_COORDINATES,
        title: "Missing electrode coordinates",
        reason: "No electrode has x, y or z coordinates; the electrodes table will \
                 contain `n/a` for all positions.",
        solution: "Add electrode coordinates to the NWB electrodes table.",
        examples: &[],
        field: Some("x"),
        data_standards: NWB_BIDS,
        category: Category::StyleSuggestion,
        severity: Severity::Info,
    },
    NotificationDefinition {
        identifier: ids::MISSING_DATASET_DESCRIPTION,
        title: "Missing dataset description",
        reason: "No additional metadata was supplied, so `dataset_description.json` only \
                 carries the BIDS version.",
        solution: "Pass an additional metadata file with a `dataset_description` section.",
        examples: &[],
        field: Some("dataset_description"),
        data_standards: BIDS,
        category: Category::StyleSuggestion,
        severity: Severity::Info,
    },
    NotificationDefinition {
        identifier: ids::INVALID_INTERVAL_TABLES,
        title: "Invalid interval tables",
        reason: "Interval tables share a name or already contain the reserved `nwb_table` \
                 column, so events cannot be assembled unambiguously.",
        solution: "Give every TimeIntervals table a unique name and rename `nwb_table` columns.",
        examples: &[],
        field: Some("nwb_table"),
        data_standards: NWB,
        category: Category::SchemaInvalidation,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::MULTIPLE_FILES_PER_SESSION,
        title: "Multiple files per session",
        reason: "Merging more than one NWB file into a single session is not implemented.",
        solution: "Give each NWB file a distinct `session_id`.",
        examples: &[],
        field: Some("session_id"),
        data_standards: NWB_BIDS,
        category: Category::InternalError,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::AMBIGUOUS_MODALITY,
        title: "Ambiguous electrode modality",
        reason: "The file holds both extracellular and intracellular electrodes; \
                 converting both at once is not implemented.",
        solution: "Split the recording into one file per modality.",
        examples: &[],
        field: None,
        data_standards: NWB,
        category: Category::InternalError,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::LABEL_COLLISION,
        title: "Label collision",
        reason: "Different identifiers map to the same BIDS label, so their outputs would \
                 overwrite each other. The affected sessions were not converted.",
        solution: "Make the identifiers differ in their letters and digits, or run with \
                   `--sanitization-level none`.",
        examples: &["day1 / day2"],
        field: Some("session_id"),
        data_standards: BIDS,
        category: Category::SchemaInvalidation,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::DANDISET_ACCESS_ERROR,
        title: "Dandiset could not be accessed",
        reason: "Listing or reading the remote dandiset failed.",
        solution: "Check the dandiset identifier, version, and network access.",
        examples: &["000003"],
        field: None,
        data_standards: &[DataStandard::Dandi],
        category: Category::InternalError,
        severity: Severity::Error,
    },
    NotificationDefinition {
        identifier: ids::INTERNAL_ERROR,
        title: "Internal error",
        reason: "An unexpected error occurred during conversion.",
        solution: "Please report this issue together with the notifications dump.",
        examples: &[],
        field: None,
        data_standards: &[],
        category: Category::InternalError,
        severity: Severity::Error,
    },
];

/// Look up a definition by identifier.
pub fn lookup(identifier: &str) -> Option<&'static NotificationDefinition> {
    DEFINITIONS.iter().find(|d| d.identifier == identifier)
}
