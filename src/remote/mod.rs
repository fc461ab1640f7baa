//! # Remote Archives
//!
//! Sessions can come from a remote archive instead of the local filesystem.
//! An [`ArchiveClient`] lists the NWB assets of a dataset, turns each asset's
//! archive-side metadata into a lightweight [`SourceRecording`] (subject and
//! session only, no electrode data), and downloads the asset when the session
//! is materialised.
//!
//! With the `dandi` feature, `DandiApiClient` talks to the DANDI REST API.

#[cfg(feature = "dandi")]
mod dandi;
mod error;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[cfg(feature = "dandi")]
pub use dandi::{DandiApiClient, DANDI_API_URL};
pub use error::RemoteError;

use crate::nwb::{SourceLocation, SourceRecording, Subject, NWB_EXTENSION};

/// Version used when none is requested
pub const DEFAULT_VERSION: &str = "draft";

/// One NWB asset of a remote dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Dataset identifier (e.g. `000003`)
    pub dandiset_id: String,
    /// Dataset version (`draft` or a published version)
    pub version: String,
    /// Archive-side asset identifier
    pub asset_id: String,
    /// Path inside the dataset
    pub path: String,
    /// Size in bytes, when reported
    pub size: Option<u64>,
    /// Content download URL
    pub download_url: String,
}

impl RemoteAsset {
    /// Location under which recordings of this asset are cached
    pub fn location(&self) -> SourceLocation {
        SourceLocation::Remote {
            asset_id: self.asset_id.clone(),
            path: self.path.clone(),
            url: self.download_url.clone(),
        }
    }

    /// Whether the asset is an NWB file
    pub fn is_nwb(&self) -> bool {
        Path::new(&self.path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(NWB_EXTENSION))
    }
}

/// Client of a remote archive holding NWB assets.
pub trait ArchiveClient: Send + Sync {
    /// NWB assets of a dataset version, in archive order.
    fn list_assets(&self, dandiset_id: &str, version: &str) -> Result<Vec<RemoteAsset>, RemoteError>;

    /// Metadata view of one asset, built without downloading it.
    fn load_recording(&self, asset: &RemoteAsset) -> Result<SourceRecording, RemoteError>;

    /// Download the content behind `location` to `destination`; returns bytes written.
    fn download(&self, location: &SourceLocation, destination: &Path) -> Result<u64, RemoteError>;
}

/// Build a [`SourceRecording`] from an asset's archive metadata document.
///
/// Reads the `Participant` entry of `wasAttributedTo` and the `Session` entry
/// of `wasGeneratedBy`. Absent entries leave the fields empty; the entity
/// extractors report them.
pub fn recording_from_asset_metadata(
    asset: &RemoteAsset,
    metadata: &Value,
) -> Result<SourceRecording, RemoteError> {
    if !metadata.is_object() {
        return Err(RemoteError::InvalidAsset(format!(
            "metadata of asset {} is not an object",
            asset.asset_id
        )));
    }

    let mut recording = SourceRecording::new(asset.location());
    recording.identifier = Some(asset.asset_id.clone());

    if let Some(participant) = find_by_schema_key(metadata, "wasAttributedTo", "Participant") {
        recording.subject = Some(Subject {
            subject_id: string_field(participant, "identifier"),
            species: named_field(participant, "species"),
            strain: named_field(participant, "strain"),
            sex: named_field(participant, "sex"),
            date_of_birth: string_field(participant, "dateOfBirth"),
            age: participant
                .get("age")
                .and_then(|age| age.get("value"))
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    if let Some(session) = find_by_schema_key(metadata, "wasGeneratedBy", "Session") {
        recording.session_id = string_field(session, "identifier");
        recording.session_description = string_field(session, "description");
        recording.session_start_time = string_field(session, "startDate");
    }

    Ok(recording)
}

fn find_by_schema_key<'a>(metadata: &'a Value, list: &str, schema_key: &str) -> Option<&'a Value> {
    metadata
        .get(list)?
        .as_array()?
        .iter()
        .find(|entry| entry.get("schemaKey").and_then(Value::as_str) == Some(schema_key))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Archive metadata nests controlled terms as `{"name": ..., "identifier": ...}`.
fn named_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        nested => string_field(nested, "name"),
    }
}
