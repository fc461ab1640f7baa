use serde_json::{Map, Value};
use std::sync::Arc;

use super::sidecar::{text_cell, ColumnDescription, SidecarSchema, TabularData, TabularSidecar};
use super::{resolve_modality, single_recording, MetadataError, Modality};
use crate::notifications::{CollectNotifications, Notification};
use crate::nwb::{Device, SourceRecording};

/// One row of probes.tsv
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Probe {
    /// Device name
    pub probe_name: String,
    /// Probe type
    pub probe_type: Option<String>,
    /// Manufacturer
    pub manufacturer: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Additional columns
    pub extra: Map<String, Value>,
}

impl From<&Device> for Probe {
    fn from(device: &Device) -> Self {
        Self {
            probe_name: device.name.clone(),
            manufacturer: device.manufacturer.clone(),
            description: device.description.clone(),
            ..Default::default()
        }
    }
}

/// Probes of one session
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTable {
    /// Modality the probes record
    pub modality: Modality,
    /// Rows in device order
    pub probes: Vec<Probe>,
}

impl ProbeTable {
    /// Probes referenced by the session's electrodes, or every device if
    /// no electrode names one.
    pub fn from_source(recordings: &[Arc<SourceRecording>]) -> Result<Option<Self>, MetadataError> {
        let recording = single_recording(recordings)?;
        let Some(modality) = resolve_modality(recording)? else {
            return Ok(None);
        };

        let referenced: Vec<&str> = match modality {
            Modality::Ecephys => recording
                .electrodes
                .iter()
                .flatten()
                .filter_map(|row| row.device_name.as_deref())
                .collect(),
            Modality::Icephys => recording
                .icephys_electrodes
                .iter()
                .filter_map(|e| e.device_name.as_deref())
                .collect(),
        };

        let mut probes: Vec<Probe> = Vec::new();
        if referenced.is_empty() {
            probes.extend(recording.devices.iter().map(Probe::from));
        } else {
            for name in referenced {
                if probes.iter().any(|p| p.probe_name == name) {
                    continue;
                }
                probes.push(
                    recording
                        .device(name)
                        .map(Probe::from)
                        .unwrap_or_else(|| Probe {
                            probe_name: name.to_string(),
                            ..Default::default()
                        }),
                );
            }
        }

        if probes.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { modality, probes }))
    }
}

impl TabularSidecar for ProbeTable {
    fn tabular(&self) -> TabularData {
        let records: Vec<Map<String, Value>> = self
            .probes
            .iter()
            .map(|probe| {
                let mut record = Map::new();
                record.insert("probe_name".into(), Value::String(probe.probe_name.clone()));
                record.insert("type".into(), text_cell(probe.probe_type.as_deref()));
                record.insert("manufacturer".into(), text_cell(probe.manufacturer.as_deref()));
                record.insert("description".into(), text_cell(probe.description.as_deref()));
                for (key, value) in &probe.extra {
                    record.entry(key.clone()).or_insert_with(|| value.clone());
                }
                record
            })
            .collect();
        TabularData::from_records(&records, &["probe_name", "type"], &["manufacturer", "description"])
    }

    fn schema(&self) -> SidecarSchema {
        SidecarSchema::new()
            .with(
                "probe_name",
                ColumnDescription::new("A unique identifier of the probe.")
                    .with_long_name("Probe name"),
            )
            .with(
                "type",
                ColumnDescription::new("The type of the probe.").with_long_name("Probe type"),
            )
            .with(
                "manufacturer",
                ColumnDescription::new("The manufacturer of the probe."),
            )
            .with(
                "description",
                ColumnDescription::new("Free-text description of the probe."),
            )
    }
}

impl CollectNotifications for ProbeTable {
    fn collect_notifications(&self) -> Vec<Notification> {
        Vec::new()
    }
}
