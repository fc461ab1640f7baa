//! # Session Conversion
//!
//! A [`SessionConverter`] owns the source files of one session and moves
//! through two states:
//!
//! 1. **unextracted**: only the session id and source locations are known;
//! 2. **extracted**: [`SessionConverter::extract_session_metadata`] has run
//!    every entity extractor and holds a [`SessionMetadata`].
//!
//! [`SessionConverter::convert_to_bids_session`] extracts on demand, then
//! writes the session's part of the BIDS tree:
//!
//! ```text
//! sub-<P>/ses-<S>/<modality>/
//!   sub-<P>_ses-<S>_<modality>.nwb
//!   sub-<P>_ses-<S>_probes.tsv / .json
//!   sub-<P>_ses-<S>_channels.tsv / .json
//!   sub-<P>_ses-<S>_electrodes.tsv / .json
//!   sub-<P>_ses-<S>_events.tsv / .json
//! ```
//!
//! Sidecar pairs are only written for entities present in the source.

mod transfer;

#[cfg(test)]
mod tests;

pub use transfer::transfer_file;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::FileMode;
use crate::context::RunContext;
use crate::dataset::ConversionError;
use crate::metadata::{
    AdditionalMetadata, MetadataError, Modality, SessionMetadata, TabularSidecar, PARTICIPANT_PREFIX,
    SESSION_PREFIX,
};
use crate::notifications::{CollectNotifications, Notification};
use crate::nwb::{SourceLocation, SourceRecording};
use crate::remote::ArchiveClient;

/// Files written for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// `sub-<P>/ses-<S>/<modality>` directory
    pub directory: PathBuf,
    /// The transferred data file
    pub data_file: PathBuf,
    /// Sidecar files, TSV before JSON, in write order
    pub sidecars: Vec<PathBuf>,
}

/// Converts the source files of one session
pub struct SessionConverter {
    session_id: String,
    sources: Vec<SourceLocation>,
    context: Arc<RunContext>,
    archive: Option<Arc<dyn ArchiveClient>>,
    additional: Option<Arc<AdditionalMetadata>>,
    metadata: Option<SessionMetadata>,
    notifications: Vec<Notification>,
}

impl std::fmt::Debug for SessionConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConverter")
            .field("session_id", &self.session_id)
            .field("sources", &self.sources)
            .field("remote", &self.archive.is_some())
            .field("extracted", &self.metadata.is_some())
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

impl SessionConverter {
    /// Converter for `session_id` over `sources`; nothing is read yet.
    pub fn new(
        session_id: impl Into<String>,
        sources: Vec<SourceLocation>,
        context: Arc<RunContext>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            sources,
            context,
            archive: None,
            additional: None,
            metadata: None,
            notifications: Vec::new(),
        }
    }

    /// Fetch remote sources through `archive`
    pub fn with_archive(mut self, archive: Arc<dyn ArchiveClient>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Merge user-supplied event column documentation
    pub fn with_additional_metadata(mut self, additional: Arc<AdditionalMetadata>) -> Self {
        self.additional = Some(additional);
        self
    }

    /// Session label as found in the source
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Source files bound to this session
    pub fn sources(&self) -> &[SourceLocation] {
        &self.sources
    }

    /// Extracted metadata, if extraction has run
    pub fn metadata(&self) -> Option<&SessionMetadata> {
        self.metadata.as_ref()
    }

    /// Whether metadata has been extracted
    pub fn is_extracted(&self) -> bool {
        self.metadata.is_some()
    }

    /// Sanitized participant label, once extracted
    pub fn participant_label(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .map(|m| self.context.sanitize(&m.participant.participant_id))
    }

    /// Sanitized session label
    pub fn session_label(&self) -> String {
        self.context.sanitize(&self.session_id)
    }

    /// Sanitized `(participant, session)` labels used for paths.
    ///
    /// Fails when extraction has not run or when either label sanitizes to
    /// nothing.
    pub fn labels(&self) -> Result<(String, String), ConversionError> {
        let metadata = self
            .metadata
            .as_ref()
            .ok_or_else(|| ConversionError::MetadataNotExtracted(self.session_id.clone()))?;
        let source = self
            .sources
            .first()
            .map(SourceLocation::display_path)
            .unwrap_or_default();

        let participant = self.context.sanitize(&metadata.participant.participant_id);
        if participant.is_empty() {
            return Err(MetadataError::MissingSubjectId(source).into());
        }
        let session = self.session_label();
        if session.is_empty() {
            return Err(ConversionError::MissingSessionId(source));
        }
        Ok((participant, session))
    }

    pub(crate) fn push_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Run every entity extractor against this session's sources.
    ///
    /// Calling it again re-extracts.
    pub fn extract_session_metadata(&mut self) -> Result<&SessionMetadata, ConversionError> {
        let recordings = self
            .sources
            .iter()
            .map(|location| self.context.load_recording(location))
            .collect::<Result<Vec<Arc<SourceRecording>>, _>>()?;

        let mut metadata = SessionMetadata::from_source(&self.session_id, &recordings)?;
        if let Some(additional) = &self.additional {
            metadata.events = metadata
                .events
                .map(|events| events.with_overrides(&additional.events));
        }

        log::debug!(
            "Extracted session '{}' (participant '{}')",
            self.session_id,
            metadata.participant.participant_id
        );
        Ok(self.metadata.insert(metadata))
    }

    /// Write this session's directory, sidecars, and data file.
    ///
    /// `file_mode` overrides the configured transfer mode.
    pub fn convert_to_bids_session(
        &mut self,
        file_mode: Option<FileMode>,
    ) -> Result<SessionOutcome, ConversionError> {
        let source = match self.sources.as_slice() {
            [source] => source.clone(),
            sources => {
                return Err(ConversionError::MultipleFilesPerSession {
                    session_id: self.session_id.clone(),
                    count: sources.len(),
                })
            }
        };
        if self.metadata.is_none() {
            self.extract_session_metadata()?;
        }
        let (participant, session) = self.labels()?;
        let metadata = self
            .metadata
            .as_ref()
            .ok_or_else(|| ConversionError::MetadataNotExtracted(self.session_id.clone()))?;
        let modality = metadata
            .modality()
            .unwrap_or(self.context.config().default_modality());

        let directory = self
            .context
            .config()
            .bids_directory()
            .join(format!("{}{}", PARTICIPANT_PREFIX, participant))
            .join(format!("{}{}", SESSION_PREFIX, session))
            .join(modality.as_str());
        fs::create_dir_all(&directory)?;

        let prefix = format!(
            "{}{}_{}{}",
            PARTICIPANT_PREFIX, participant, SESSION_PREFIX, session
        );
        let mut writer = SidecarWriter {
            directory: &directory,
            prefix: &prefix,
            written: Vec::new(),
        };
        if let Some(probes) = &metadata.probe_table {
            writer.write("probes", probes)?;
        }
        if let Some(channels) = &metadata.channel_table {
            writer.write("channels", channels)?;
        }
        if let Some(electrodes) = &metadata.electrode_table {
            writer.write("electrodes", electrodes)?;
        }
        if let Some(events) = &metadata.events {
            writer.write("events", events)?;
        }
        let sidecars = writer.written;

        let data_file = directory.join(data_file_name(&prefix, modality, &source));
        self.place_data_file(&source, &data_file, file_mode)?;

        log::info!(
            "Converted session {}{} of {}{} ({} sidecars)",
            SESSION_PREFIX,
            session,
            PARTICIPANT_PREFIX,
            participant,
            sidecars.len()
        );
        Ok(SessionOutcome {
            directory,
            data_file,
            sidecars,
        })
    }

    fn place_data_file(
        &self,
        source: &SourceLocation,
        destination: &std::path::Path,
        file_mode: Option<FileMode>,
    ) -> Result<(), ConversionError> {
        match source {
            SourceLocation::Local(path) => {
                let mode = self.context.resolve_file_mode(file_mode);
                transfer_file(path, destination, mode)
            }
            SourceLocation::Remote { .. } => {
                let archive = self
                    .archive
                    .as_ref()
                    .ok_or_else(|| ConversionError::NoArchiveClient(source.to_string()))?;
                if fs::symlink_metadata(destination).is_ok() {
                    fs::remove_file(destination)?;
                }
                archive.download(source, destination)?;
                Ok(())
            }
        }
    }
}

impl CollectNotifications for SessionConverter {
    fn collect_notifications(&self) -> Vec<Notification> {
        let mut all = self.notifications.clone();
        all.extend(self.metadata.collect_notifications());
        all
    }
}

fn data_file_name(prefix: &str, modality: Modality, source: &SourceLocation) -> String {
    format!("{}_{}.{}", prefix, modality, source.extension())
}

struct SidecarWriter<'a> {
    directory: &'a std::path::Path,
    prefix: &'a str,
    written: Vec<PathBuf>,
}

impl SidecarWriter<'_> {
    fn write(&mut self, suffix: &str, table: &impl TabularSidecar) -> Result<(), ConversionError> {
        let stem = format!("{}_{}", self.prefix, suffix);
        let tsv = self.directory.join(format!("{}.tsv", stem));
        let json = self.directory.join(format!("{}.json", stem));
        table.write_pair(&tsv, &json)?;
        self.written.push(tsv);
        self.written.push(json);
        Ok(())
    }
}
