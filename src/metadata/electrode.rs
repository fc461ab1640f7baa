use serde_json::{Map, Value};
use std::sync::Arc;

use super::sidecar::{
    float_cell, text_cell, ColumnDescription, SidecarSchema, TabularData, TabularSidecar,
};
use super::{resolve_modality, single_recording, MetadataError, Modality};
use crate::notifications::{ids, CollectNotifications, Notification};
use crate::nwb::SourceRecording;

const OHMS_PER_KILOHM: f64 = 1000.0;

/// One row of electrodes.tsv
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Electrode {
    /// Electrode name (the NWB electrode id)
    pub name: String,
    /// Probe the electrode belongs to
    pub probe_name: Option<String>,
    /// Coordinate in micrometers
    pub x: Option<f64>,
    /// Coordinate in micrometers
    pub y: Option<f64>,
    /// Coordinate in micrometers
    pub z: Option<f64>,
    /// Impedance in kOhm
    pub impedance: Option<f64>,
    /// Brain region
    pub location: Option<String>,
    /// Additional columns
    pub extra: Map<String, Value>,
}

/// Electrodes of one session
#[derive(Debug, Clone, PartialEq)]
pub struct ElectrodeTable {
    /// Modality of the electrodes
    pub modality: Modality,
    /// Rows in source order
    pub electrodes: Vec<Electrode>,
    notifications: Vec<Notification>,
}

impl ElectrodeTable {
    /// Table from already-normalized rows
    pub fn new(modality: Modality, electrodes: Vec<Electrode>) -> Self {
        Self {
            modality,
            electrodes,
            notifications: Vec::new(),
        }
    }

    /// Extract electrodes, converting impedance from ohms to kilohms.
    pub fn from_source(recordings: &[Arc<SourceRecording>]) -> Result<Option<Self>, MetadataError> {
        let recording = single_recording(recordings)?;
        let Some(modality) = resolve_modality(recording)? else {
            return Ok(None);
        };

        let electrodes: Vec<Electrode> = match modality {
            Modality::Ecephys => recording
                .electrodes
                .iter()
                .flatten()
                .map(|row| Electrode {
                    name: row.id.to_string(),
                    probe_name: row.device_name.clone().or_else(|| row.group_name.clone()),
                    x: row.x.filter(|v| v.is_finite()),
                    y: row.y.filter(|v| v.is_finite()),
                    z: row.z.filter(|v| v.is_finite()),
                    impedance: row
                        .imp
                        .filter(|v| v.is_finite())
                        .map(|ohms| ohms / OHMS_PER_KILOHM),
                    location: row.location.clone(),
                    extra: row.extra.clone(),
                })
                .collect(),
            Modality::Icephys => recording
                .icephys_electrodes
                .iter()
                .map(|e| Electrode {
                    name: e.name.clone(),
                    probe_name: e.device_name.clone(),
                    location: e.location.clone(),
                    ..Default::default()
                })
                .collect(),
        };

        let mut table = Self::new(modality, electrodes);
        if modality == Modality::Ecephys {
            let missing = table
                .electrodes
                .iter()
                .filter(|e| e.x.is_none() || e.y.is_none() || e.z.is_none())
                .count();
            if missing > 0 {
                let notification = Notification::from_definition(
                    ids::MISSING_ELECTRODE_COORDINATES,
                    [recording.location.display_path()],
                    Vec::<std::path::PathBuf>::new(),
                )?
                .with_detail(format!(
                    "{} of {} electrodes have no complete x/y/z coordinates.",
                    missing,
                    table.electrodes.len()
                ));
                table.notifications.push(notification);
            }
        }
        Ok(Some(table))
    }

    fn required_columns(&self) -> &'static [&'static str] {
        match self.modality {
            Modality::Ecephys => &["name", "probe_name", "x", "y", "z"],
            Modality::Icephys => &["name", "probe_name"],
        }
    }
}

impl TabularSidecar for ElectrodeTable {
    fn tabular(&self) -> TabularData {
        let records: Vec<Map<String, Value>> = self
            .electrodes
            .iter()
            .map(|electrode| {
                let mut record = Map::new();
                record.insert("name".into(), Value::String(electrode.name.clone()));
                record.insert("probe_name".into(), text_cell(electrode.probe_name.as_deref()));
                record.insert("x".into(), float_cell(electrode.x));
                record.insert("y".into(), float_cell(electrode.y));
                record.insert("z".into(), float_cell(electrode.z));
                record.insert("impedance".into(), float_cell(electrode.impedance));
                record.insert("location".into(), text_cell(electrode.location.as_deref()));
                for (key, value) in &electrode.extra {
                    record.entry(key.clone()).or_insert_with(|| value.clone());
                }
                record
            })
            .collect();
        TabularData::from_records(&records, self.required_columns(), &["impedance", "location"])
    }

    fn schema(&self) -> SidecarSchema {
        SidecarSchema::new()
            .with(
                "name",
                ColumnDescription::new("Name of the electrode contact point.")
                    .with_long_name("Electrode name"),
            )
            .with(
                "probe_name",
                ColumnDescription::new("Name of the probe the electrode belongs to."),
            )
            .with(
                "x",
                ColumnDescription::new("Recorded position along the x-axis.").with_units("um"),
            )
            .with(
                "y",
                ColumnDescription::new("Recorded position along the y-axis.").with_units("um"),
            )
            .with(
                "z",
                ColumnDescription::new("Recorded position along the z-axis.").with_units("um"),
            )
            .with(
                "impedance",
                ColumnDescription::new("Impedance of the electrode.").with_units("kOhm"),
            )
            .with(
                "location",
                ColumnDescription::new("Brain region the electrode is located in."),
            )
    }
}

impl CollectNotifications for ElectrodeTable {
    fn collect_notifications(&self) -> Vec<Notification> {
        self.notifications.clone()
    }
}
