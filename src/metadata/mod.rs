//! # Metadata Entities
//!
//! Each BIDS entity is extracted from the in-memory view of one NWB file and
//! knows how to serialize itself to its TSV + JSON sidecar pair.
//!
//! ## Extraction contract
//!
//! Every extractor takes the recordings of one session:
//!
//! - it returns `Ok(None)` when the entity is absent from the source (no
//!   electrode table, no interval tables, ...);
//! - it fails with [`MetadataError::MultipleRecordings`] when given more than
//!   one recording, since cross-file aggregation is not implemented;
//! - it fails with [`MetadataError::AmbiguousModality`] when a file carries
//!   both extracellular and intracellular electrodes.
//!
//! Cosmetic problems never fail extraction; they are recorded as
//! notifications on the entity and surface through
//! [`CollectNotifications`](crate::notifications::CollectNotifications).
//!
//! ## Entities
//!
//! 1. [`Participant`]: one row of `participants.tsv`
//! 2. [`ProbeTable`], [`ChannelTable`], [`ElectrodeTable`]: per-session
//!    hardware tables tagged with their [`Modality`]
//! 3. [`Events`]: all interval tables merged into `events.tsv`
//! 4. [`DatasetDescription`]: `dataset_description.json`
//! 5. [`SessionMetadata`]: the per-session aggregate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::nwb::SourceRecording;

mod additional;
mod channel;
mod dataset_description;
mod electrode;
mod error;
mod events;
mod participant;
mod probe;
mod session_metadata;
mod sidecar;


pub use additional::{AdditionalMetadata, ADDITIONAL_METADATA_FILE};
pub use channel::{bids_units, Channel, ChannelTable};
pub use dataset_description::{
    DatasetDescription, GeneratedBy, DATASET_DESCRIPTION_FILE, TOOL_NAME,
};
pub use electrode::{Electrode, ElectrodeTable};
pub use error::MetadataError;
pub use events::{EventRow, Events, NWB_TABLE_COLUMN};
pub use participant::{
    derive_participant_id, is_valid_species, normalize_sex, participants_schema, Participant,
    SexValue, ACCEPTED_SEX_VALUES, PARTICIPANTS_JSON, PARTICIPANTS_TSV, PARTICIPANT_COLUMNS,
    PARTICIPANT_PREFIX,
};
pub use probe::{Probe, ProbeTable};
pub use session_metadata::{
    sessions_schema, SessionMetadata, ACQ_TIME_COLUMN, SESSION_ID_COLUMN, SESSION_PREFIX,
};
pub use sidecar::{
    float_cell, format_cell, text_cell, ColumnDescription, SidecarSchema, TabularData,
    TabularSidecar, NA,
};

/// Electrophysiology modality; also the name of the session's data directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Extracellular electrophysiology
    #[default]
    Ecephys,
    /// Intracellular electrophysiology
    Icephys,
}

impl Modality {
    /// Directory and file suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Ecephys => "ecephys",
            Modality::Icephys => "icephys",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ecephys" => Ok(Modality::Ecephys),
            "icephys" => Ok(Modality::Icephys),
            _ => Err(format!(
                "Unknown modality '{}'. Valid options: ecephys, icephys",
                s
            )),
        }
    }
}

/// Modality of a recording, `None` when it has no electrodes of either kind.
pub fn resolve_modality(recording: &SourceRecording) -> Result<Option<Modality>, MetadataError> {
    match (recording.has_ecephys(), recording.has_icephys()) {
        (true, true) => Err(MetadataError::AmbiguousModality(
            recording.location.display_path(),
        )),
        (true, false) => Ok(Some(Modality::Ecephys)),
        (false, true) => Ok(Some(Modality::Icephys)),
        (false, false) => Ok(None),
    }
}

/// The only recording of a session; extraction does not merge files.
pub(crate) fn single_recording(
    recordings: &[Arc<SourceRecording>],
) -> Result<&SourceRecording, MetadataError> {
    match recordings {
        [] => Err(MetadataError::NoRecordings),
        [recording] => Ok(recording),
        many => Err(MetadataError::MultipleRecordings(many.len())),
    }
}
