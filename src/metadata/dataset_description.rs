use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use super::MetadataError;
use crate::config::BIDS_VERSION;
use crate::notifications::{CollectNotifications, Notification};

/// File name of the dataset description
pub const DATASET_DESCRIPTION_FILE: &str = "dataset_description.json";

/// Name under which this tool records itself in `GeneratedBy`
pub const TOOL_NAME: &str = "nwb2bids";

fn default_bids_version() -> String {
    BIDS_VERSION.to_string()
}

fn default_dataset_type() -> String {
    "raw".to_string()
}

/// Provenance entry of `GeneratedBy`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneratedBy {
    /// Pipeline name
    pub name: String,
    /// Pipeline version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source code location
    #[serde(
        rename = "CodeURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub code_url: Option<String>,
}

impl GeneratedBy {
    /// Entry describing this build of the tool
    pub fn this_tool() -> Self {
        Self {
            name: TOOL_NAME.to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            description: Some("Conversion of NWB files into a BIDS dataset.".to_string()),
            code_url: None,
        }
    }
}

/// dataset_description.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetDescription {
    /// Dataset name
    pub name: String,
    /// BIDS version the dataset follows
    #[serde(rename = "BIDSVersion", default = "default_bids_version")]
    pub bids_version: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `raw` or `derivative`
    #[serde(default = "default_dataset_type")]
    pub dataset_type: String,
    /// Authors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    /// License identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Provenance
    #[serde(default)]
    pub generated_by: Vec<GeneratedBy>,
    /// Any other fields, written through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetDescription {
    /// Description with only a name; `GeneratedBy` already names this tool
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bids_version: default_bids_version(),
            description: None,
            dataset_type: default_dataset_type(),
            authors: None,
            license: None,
            generated_by: vec![GeneratedBy::this_tool()],
            extra: Map::new(),
        }
    }

    /// Parse user-supplied fields and record this tool's provenance.
    pub fn from_value(value: Value) -> Result<Self, MetadataError> {
        if value.get("Name").and_then(Value::as_str).is_none() {
            return Err(MetadataError::MissingDescriptionField("Name".to_string()));
        }
        let mut description: Self = serde_json::from_value(value)?;
        description.ensure_generated_by()?;
        Ok(description)
    }

    /// Append this tool to `GeneratedBy` unless an identical entry exists.
    ///
    /// A different entry under the same name is a conflict, since the
    /// output must name exactly one version of this tool.
    pub fn ensure_generated_by(&mut self) -> Result<(), MetadataError> {
        let own = GeneratedBy::this_tool();
        let existing: Vec<&GeneratedBy> = self
            .generated_by
            .iter()
            .filter(|entry| entry.name == own.name)
            .collect();
        match existing.as_slice() {
            [] => {
                self.generated_by.push(own);
                Ok(())
            }
            [entry] if entry.version == own.version => Ok(()),
            _ => Err(MetadataError::ConflictingGeneratedBy(own.name)),
        }
    }

    /// Write as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<(), MetadataError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl CollectNotifications for DatasetDescription {
    fn collect_notifications(&self) -> Vec<Notification> {
        Vec::new()
    }
}
