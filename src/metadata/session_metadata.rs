use std::path::PathBuf;
use std::sync::Arc;

use super::sidecar::{ColumnDescription, SidecarSchema};
use super::{
    resolve_modality, single_recording, ChannelTable, ElectrodeTable, Events, MetadataError,
    Modality, Participant, ProbeTable,
};
use crate::notifications::{ids, CollectNotifications, Notification};
use crate::nwb::SourceRecording;
use crate::sanitization::is_valid_label;

/// BIDS session entity prefix
pub const SESSION_PREFIX: &str = "ses-";

/// Column of the sessions table holding the session label
pub const SESSION_ID_COLUMN: &str = "session_id";

/// Column of the sessions table holding the session start
pub const ACQ_TIME_COLUMN: &str = "acq_time";

/// Documentation of the per-participant sessions table columns
pub fn sessions_schema() -> SidecarSchema {
    SidecarSchema::new()
        .with(
            SESSION_ID_COLUMN,
            ColumnDescription::new("Session label.").with_long_name("Session ID"),
        )
        .with(
            ACQ_TIME_COLUMN,
            ColumnDescription::new("Acquisition start of the session.")
                .with_long_name("Acquisition time"),
        )
}

/// Everything extracted for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetadata {
    /// Session label as found in the source
    pub session_id: String,
    /// The session's subject
    pub participant: Participant,
    /// Merged interval tables
    pub events: Option<Events>,
    /// Probes
    pub probe_table: Option<ProbeTable>,
    /// Channels
    pub channel_table: Option<ChannelTable>,
    /// Electrodes
    pub electrode_table: Option<ElectrodeTable>,
    /// Session start (ISO 8601)
    pub session_start_time: Option<String>,
    notifications: Vec<Notification>,
}

impl SessionMetadata {
    /// Run every entity extractor against the session's recordings.
    pub fn from_source(
        session_id: &str,
        recordings: &[Arc<SourceRecording>],
    ) -> Result<Self, MetadataError> {
        let recording = single_recording(recordings)?;
        resolve_modality(recording)?;

        let mut notifications = Vec::new();
        if !is_valid_label(session_id) {
            notifications.push(
                Notification::from_definition(
                    ids::INVALID_SESSION_ID,
                    [recording.location.display_path()],
                    Vec::<PathBuf>::new(),
                )?
                .with_detail(format!("Found session label '{}'.", session_id)),
            );
        }

        Ok(Self {
            session_id: session_id.to_string(),
            participant: Participant::from_source(recordings)?,
            events: Events::from_source(recordings)?,
            probe_table: ProbeTable::from_source(recordings)?,
            channel_table: ChannelTable::from_source(recordings)?,
            electrode_table: ElectrodeTable::from_source(recordings)?,
            session_start_time: recording.session_start_time.clone(),
            notifications,
        })
    }

    /// Modality detected from the electrode data, if any
    pub fn modality(&self) -> Option<Modality> {
        self.electrode_table
            .as_ref()
            .map(|t| t.modality)
            .or_else(|| self.channel_table.as_ref().map(|t| t.modality))
            .or_else(|| self.probe_table.as_ref().map(|t| t.modality))
    }

    /// Session start formatted for the `acq_time` column.
    pub fn acq_time(&self) -> Option<String> {
        let raw = self.session_start_time.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match chrono::DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Err(_) => raw.to_string(),
        })
    }
}

impl CollectNotifications for SessionMetadata {
    fn collect_notifications(&self) -> Vec<Notification> {
        let mut all = self.notifications.clone();
        all.extend(self.participant.collect_notifications());
        all.extend(self.events.collect_notifications());
        all.extend(self.probe_table.collect_notifications());
        all.extend(self.channel_table.collect_notifications());
        all.extend(self.electrode_table.collect_notifications());
        all
    }
}
