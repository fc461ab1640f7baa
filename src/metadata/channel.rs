use serde_json::{Map, Value};
use std::sync::Arc;

use super::sidecar::{
    float_cell, text_cell, ColumnDescription, SidecarSchema, TabularData, TabularSidecar,
};
use super::{resolve_modality, single_recording, MetadataError, Modality};
use crate::notifications::{CollectNotifications, Notification};
use crate::nwb::{SeriesKind, SourceRecording, TimeSeriesInfo};

/// Channel type for extracellular voltage
const EXTRACELLULAR_TYPE: &str = "EXT";

/// One row of channels.tsv
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    /// Channel name
    pub name: String,
    /// Electrode the channel records from
    pub electrode_name: Option<String>,
    /// Channel type
    pub channel_type: Option<String>,
    /// Physical unit
    pub units: Option<String>,
    /// Sampling frequency in Hz
    pub sampling_frequency: Option<f64>,
    /// Multiplier from stored values to `units`
    pub gain: Option<f64>,
    /// Hardware filtering
    pub filtering: Option<String>,
    /// Sampling time shift in seconds
    pub inter_sample_shift: Option<f64>,
    /// Probe contact identifiers
    pub contact_ids: Option<String>,
}

/// Channels of one session
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    /// Modality of the channels
    pub modality: Modality,
    /// Rows in source order
    pub channels: Vec<Channel>,
}

/// BIDS spelling of an NWB unit.
pub fn bids_units(unit: &str) -> String {
    match unit.trim().to_lowercase().as_str() {
        "volts" | "volt" | "v" => "V".to_string(),
        "millivolts" | "mv" => "mV".to_string(),
        "microvolts" | "uv" => "uV".to_string(),
        "amperes" | "ampere" | "amps" | "a" => "A".to_string(),
        "picoamperes" | "pa" => "pA".to_string(),
        _ => unit.trim().to_string(),
    }
}

impl ChannelTable {
    /// One channel per extracellular electrode, or one per patch-clamp series.
    pub fn from_source(recordings: &[Arc<SourceRecording>]) -> Result<Option<Self>, MetadataError> {
        let recording = single_recording(recordings)?;
        let Some(modality) = resolve_modality(recording)? else {
            return Ok(None);
        };

        let channels: Vec<Channel> = match modality {
            Modality::Ecephys => recording
                .electrodes
                .iter()
                .flatten()
                .map(|row| {
                    let series = recording.electrical_series().find(|s| {
                        matches!(&s.kind, SeriesKind::Electrical { electrodes } if electrodes.contains(&row.id))
                    });
                    let mut channel = Channel {
                        name: row
                            .channel_name
                            .clone()
                            .unwrap_or_else(|| format!("ch{}", row.id)),
                        electrode_name: Some(row.id.to_string()),
                        channel_type: Some(EXTRACELLULAR_TYPE.to_string()),
                        filtering: row.filtering.clone(),
                        inter_sample_shift: row.inter_sample_shift,
                        contact_ids: row.contact_ids.clone(),
                        ..Default::default()
                    };
                    if let Some(series) = series {
                        apply_series(&mut channel, series);
                    }
                    channel
                })
                .collect(),
            Modality::Icephys => recording
                .patch_clamp_series()
                .map(|series| {
                    let electrode = match &series.kind {
                        SeriesKind::PatchClamp { electrode } if !electrode.is_empty() => {
                            Some(electrode.clone())
                        }
                        _ => None,
                    };
                    let mut channel = Channel {
                        name: series.name.clone(),
                        electrode_name: electrode,
                        ..Default::default()
                    };
                    apply_series(&mut channel, series);
                    channel.channel_type = channel.units.as_deref().map(|units| {
                        let kind = if units.ends_with('A') { "IM" } else { "VM" };
                        kind.to_string()
                    });
                    channel
                })
                .collect(),
        };

        if channels.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { modality, channels }))
    }
}

fn apply_series(channel: &mut Channel, series: &TimeSeriesInfo) {
    channel.units = series.unit.as_deref().map(bids_units);
    channel.sampling_frequency = series.sampling_frequency();
    channel.gain = Some(series.conversion);
}

impl TabularSidecar for ChannelTable {
    fn tabular(&self) -> TabularData {
        let records: Vec<Map<String, Value>> = self
            .channels
            .iter()
            .map(|channel| {
                let mut record = Map::new();
                record.insert("name".into(), Value::String(channel.name.clone()));
                record.insert("electrode_name".into(), text_cell(channel.electrode_name.as_deref()));
                record.insert("type".into(), text_cell(channel.channel_type.as_deref()));
                record.insert("units".into(), text_cell(channel.units.as_deref()));
                record.insert("sampling_frequency".into(), float_cell(channel.sampling_frequency));
                record.insert("gain".into(), float_cell(channel.gain));
                record.insert("filtering".into(), text_cell(channel.filtering.as_deref()));
                record.insert("inter_sample_shift".into(), float_cell(channel.inter_sample_shift));
                record.insert("contact_ids".into(), text_cell(channel.contact_ids.as_deref()));
                record
            })
            .collect();
        TabularData::from_records(
            &records,
            &["name", "electrode_name", "type", "units", "sampling_frequency", "gain"],
            &["filtering", "inter_sample_shift", "contact_ids"],
        )
    }

    fn schema(&self) -> SidecarSchema {
        SidecarSchema::new()
            .with(
                "name",
                ColumnDescription::new("Label of the channel.").with_long_name("Channel name"),
            )
            .with(
                "electrode_name",
                ColumnDescription::new("Name of the electrode the channel records from."),
            )
            .with("type", ColumnDescription::new("Type of the channel."))
            .with(
                "units",
                ColumnDescription::new("Physical unit of the recorded values."),
            )
            .with(
                "sampling_frequency",
                ColumnDescription::new("Sampling rate of the channel.").with_units("Hz"),
            )
            .with(
                "gain",
                ColumnDescription::new("Multiplier converting stored values to the channel units."),
            )
            .with("filtering", ColumnDescription::new("Hardware filtering applied."))
            .with(
                "inter_sample_shift",
                ColumnDescription::new("Time shift between samples of this channel.")
                    .with_units("s"),
            )
            .with(
                "contact_ids",
                ColumnDescription::new("Identifiers of the probe contacts."),
            )
    }
}

impl CollectNotifications for ChannelTable {
    fn collect_notifications(&self) -> Vec<Notification> {
        Vec::new()
    }
}
