use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use super::sidecar::{ColumnDescription, SidecarSchema};
use super::{single_recording, MetadataError};
use crate::notifications::{ids, CollectNotifications, Notification};
use crate::nwb::SourceRecording;
use crate::sanitization::is_valid_label;

/// BIDS subject entity prefix
pub const PARTICIPANT_PREFIX: &str = "sub-";

/// Dataset-level participants table
pub const PARTICIPANTS_TSV: &str = "participants.tsv";

/// Dataset-level participants sidecar
pub const PARTICIPANTS_JSON: &str = "participants.json";

/// Columns that lead the participants table, in this order
pub const PARTICIPANT_COLUMNS: [&str; 4] = ["participant_id", "species", "sex", "strain"];

/// Sex spellings accepted by BIDS verbatim
pub const ACCEPTED_SEX_VALUES: &[&str] = &[
    "male", "m", "M", "MALE", "Male", "female", "f", "F", "FEMALE", "Female", "other", "o", "O",
    "OTHER", "Other", "n/a",
];

static LATIN_BINOMIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][a-z]+ [a-z]+").expect("binomial regex must compile")
});

static TAXONOMY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(www\.)?(ncbi\.nlm\.nih\.gov/Taxonomy/Browser/wwwtax\.cgi\?id=\d+|identifiers\.org/taxonomy:\d+)$",
    )
    .expect("taxonomy regex must compile")
});

/// Outcome of checking a sex value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SexValue {
    /// Already a BIDS spelling
    Accepted(String),
    /// Rewritten to a BIDS spelling
    Corrected {
        /// As found in the source
        original: String,
        /// As written to the output
        corrected: String,
    },
    /// Not recognised; kept as found
    Invalid(String),
}

impl SexValue {
    /// The value written to the output
    pub fn value(&self) -> &str {
        match self {
            SexValue::Accepted(v) | SexValue::Invalid(v) => v,
            SexValue::Corrected { corrected, .. } => corrected,
        }
    }
}

/// Check a raw sex value against the BIDS spellings.
pub fn normalize_sex(raw: &str) -> SexValue {
    if ACCEPTED_SEX_VALUES.contains(&raw) {
        return SexValue::Accepted(raw.to_string());
    }
    let corrected = match raw.trim().to_lowercase().as_str() {
        "male" | "m" => "male",
        "female" | "f" => "female",
        "other" | "o" => "other",
        "u" | "unknown" | "n/a" | "na" => "n/a",
        _ => return SexValue::Invalid(raw.to_string()),
    };
    SexValue::Corrected {
        original: raw.to_string(),
        corrected: corrected.to_string(),
    }
}

/// True for a Latin binomial or a taxonomy URL.
pub fn is_valid_species(species: &str) -> bool {
    LATIN_BINOMIAL.is_match(species) || TAXONOMY_URL.is_match(species)
}

/// Participant label from an NWB subject id: trimmed, without `sub-`, `_` as `-`.
pub fn derive_participant_id(subject_id: &str) -> String {
    let trimmed = subject_id.trim();
    trimmed
        .strip_prefix(PARTICIPANT_PREFIX)
        .unwrap_or(trimmed)
        .replace('_', "-")
}

/// One row of participants.tsv
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Label without the `sub-` prefix
    pub participant_id: String,
    /// Species
    pub species: Option<String>,
    /// Sex
    pub sex: Option<String>,
    /// Strain
    pub strain: Option<String>,
    /// Additional columns
    pub extra: Map<String, Value>,
    notifications: Vec<Notification>,
}

impl Participant {
    /// Participant with only an identifier
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            species: None,
            sex: None,
            strain: None,
            extra: Map::new(),
            notifications: Vec::new(),
        }
    }

    /// Extract and validate the participant of a session.
    ///
    /// Missing species or sex are reported as critical notifications and the
    /// participant is still built; only a missing subject identifier fails.
    pub fn from_source(recordings: &[Arc<SourceRecording>]) -> Result<Self, MetadataError> {
        let recording = single_recording(recordings)?;
        let source = recording.location.display_path();
        let subject = recording.subject.clone().unwrap_or_default();

        let subject_id = subject
            .subject_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MetadataError::MissingSubjectId(source.clone()))?;

        let mut participant = Participant::new(derive_participant_id(subject_id));
        participant.strain = subject.strain.filter(|s| !s.trim().is_empty());

        if !is_valid_label(&participant.participant_id) {
            participant.notify(
                ids::INVALID_PARTICIPANT_ID,
                &source,
                format!("Found participant label '{}'.", participant.participant_id),
            )?;
        }

        match subject.species.filter(|s| !s.trim().is_empty()) {
            None => participant.notify(ids::MISSING_PARTICIPANT_SPECIES, &source, "")?,
            Some(species) => {
                if !is_valid_species(&species) {
                    participant.notify(
                        ids::INVALID_PARTICIPANT_SPECIES,
                        &source,
                        format!("Found species '{}'.", species),
                    )?;
                }
                participant.species = Some(species);
            }
        }

        match subject.sex.filter(|s| !s.trim().is_empty()) {
            None => participant.notify(ids::MISSING_PARTICIPANT_SEX, &source, "")?,
            Some(sex) => {
                let checked = normalize_sex(&sex);
                match &checked {
                    SexValue::Accepted(_) => {}
                    SexValue::Corrected {
                        original,
                        corrected,
                    } => participant.notify(
                        ids::NONSTANDARD_PARTICIPANT_SEX,
                        &source,
                        format!("Rewrote '{}' as '{}'.", original, corrected),
                    )?,
                    SexValue::Invalid(value) => participant.notify(
                        ids::INVALID_PARTICIPANT_SEX,
                        &source,
                        format!("Found sex '{}'.", value),
                    )?,
                }
                participant.sex = Some(checked.value().to_string());
            }
        }

        Ok(participant)
    }

    fn notify(
        &mut self,
        identifier: &str,
        source: &Path,
        detail: impl AsRef<str>,
    ) -> Result<(), MetadataError> {
        let notification =
            Notification::from_definition(identifier, [source], [PARTICIPANTS_TSV])?
                .with_detail(detail);
        self.notifications.push(notification);
        Ok(())
    }

    /// Flat record, null fields dropped, ready for table assembly
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(
            "participant_id".to_string(),
            Value::String(self.participant_id.clone()),
        );
        for (key, value) in [
            ("species", &self.species),
            ("sex", &self.sex),
            ("strain", &self.strain),
        ] {
            if let Some(value) = value {
                record.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        for (key, value) in &self.extra {
            if !value.is_null() && !record.contains_key(key) {
                record.insert(key.clone(), value.clone());
            }
        }
        record
    }
}

impl CollectNotifications for Participant {
    fn collect_notifications(&self) -> Vec<Notification> {
        self.notifications.clone()
    }
}

/// Documentation of the participants table columns
pub fn participants_schema() -> SidecarSchema {
    SidecarSchema::new()
        .with(
            "participant_id",
            ColumnDescription::new("Unique participant label.").with_long_name("Participant ID"),
        )
        .with(
            "species",
            ColumnDescription::new(
                "The binomial species name from the NCBI Taxonomy, or its taxonomy URL.",
            )
            .with_long_name("Species"),
        )
        .with(
            "sex",
            ColumnDescription::new("Sex of the participant.")
                .with_long_name("Sex")
                .with_level("male", "Male")
                .with_level("female", "Female")
                .with_level("other", "Other")
                .with_level("n/a", "Not available"),
        )
        .with(
            "strain",
            ColumnDescription::new("Strain or genotype of the participant.")
                .with_long_name("Strain"),
        )
}
