use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ColumnDescription, DatasetDescription, MetadataError};

/// File name looked for inside source directories
pub const ADDITIONAL_METADATA_FILE: &str = "additional_metadata.json";

#[derive(Debug, Deserialize)]
struct RawAdditionalMetadata {
    #[serde(default)]
    dataset_description: Option<Value>,
    #[serde(default)]
    events: BTreeMap<String, ColumnDescription>,
}

/// Metadata the NWB files do not carry, supplied by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdditionalMetadata {
    /// Fields for dataset_description.json
    pub dataset_description: Option<DatasetDescription>,
    /// Per-column documentation merged into events.json
    pub events: BTreeMap<String, ColumnDescription>,
}

impl AdditionalMetadata {
    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let raw: RawAdditionalMetadata = serde_json::from_str(json)?;
        let dataset_description = raw
            .dataset_description
            .map(DatasetDescription::from_value)
            .transpose()?;
        Ok(Self {
            dataset_description,
            events: raw.events,
        })
    }

    /// First `additional_metadata.json` found directly inside one of `directories`.
    pub fn discover<'a>(directories: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
        directories
            .into_iter()
            .map(|dir| dir.join(ADDITIONAL_METADATA_FILE))
            .find(|candidate| candidate.is_file())
    }
}
