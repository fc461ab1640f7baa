//! # Dataset Conversion
//!
//! [`DatasetConverter`] turns a set of NWB sources into one BIDS dataset:
//!
//! ```text
//! <bids_directory>/
//! ├── dataset_description.json
//! ├── participants.tsv / participants.json
//! └── sub-<P>/
//!     ├── sub-<P>_sessions.tsv / sub-<P>_sessions.json
//!     └── ses-<S>/<modality>/...        # written by SessionConverter
//! ```
//!
//! ## Lifecycle
//!
//! 1. Construction groups sources by session id, one [`SessionConverter`] per
//!    session ([`DatasetConverter::from_nwb_paths`] or
//!    [`DatasetConverter::from_remote_dandiset`]).
//! 2. [`DatasetConverter::extract_metadata`] extracts every session; a failing
//!    session becomes a notification and the others continue.
//! 3. [`DatasetConverter::convert_to_bids_dataset`] writes the dataset-level
//!    files, then each session. Failures are caught as notifications and
//!    whatever was already written stays on disk.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nwb2bids::config::RunConfig;
//! use nwb2bids::context::RunContext;
//! use nwb2bids::dataset::DatasetConverter;
//! use nwb2bids::nwb::default_reader;
//!
//! let config = RunConfig::builder("bids_output").build()?;
//! let context = RunContext::new(config, default_reader()).shared();
//!
//! let mut converter = DatasetConverter::from_nwb_paths(&["recordings/"], context)?;
//! converter.extract_metadata();
//! let stats = converter.convert_to_bids_dataset();
//! println!("{}", stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod stats;


pub use error::ConversionError;
pub use stats::ConversionStats;

use serde_json::{Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::context::RunContext;
use crate::metadata::{
    participants_schema, sessions_schema, AdditionalMetadata, TabularData,
    ACQ_TIME_COLUMN, DATASET_DESCRIPTION_FILE, PARTICIPANTS_JSON, PARTICIPANTS_TSV,
    PARTICIPANT_COLUMNS, PARTICIPANT_PREFIX, SESSION_ID_COLUMN, SESSION_PREFIX,
};
use crate::notifications::{
    ids, sort_notifications, CollectNotifications, Notification, NotificationError,
};
use crate::nwb::{SourceLocation, NWB_EXTENSION};
use crate::remote::{ArchiveClient, RemoteError};
use crate::session::SessionConverter;

/// Converts a whole dataset, one session at a time
pub struct DatasetConverter {
    context: Arc<RunContext>,
    sessions: Vec<SessionConverter>,
    additional: Option<Arc<AdditionalMetadata>>,
    extracted: bool,
    rejected: BTreeSet<String>,
    notifications: Vec<Notification>,
}

impl std::fmt::Debug for DatasetConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetConverter")
            .field("bids_directory", &self.context.config().bids_directory())
            .field("sessions", &self.sessions)
            .field("additional_metadata", &self.additional.is_some())
            .field("extracted", &self.extracted)
            .field("rejected", &self.rejected)
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

impl DatasetConverter {
    /// Group sources by session id.
    ///
    /// Directories are searched recursively for `.nwb` files; files are taken
    /// as given. Fails when nothing is found or a file has no session id.
    pub fn from_nwb_paths<P: AsRef<Path>>(
        paths: &[P],
        context: Arc<RunContext>,
    ) -> Result<Self, ConversionError> {
        let files = discover_nwb_files(paths);
        if files.is_empty() {
            return Err(ConversionError::NoSourceFiles(
                paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            ));
        }
        log::info!("Found {} NWB files", files.len());

        let mut grouped: BTreeMap<String, Vec<SourceLocation>> = BTreeMap::new();
        for file in files {
            let location = SourceLocation::Local(file);
            let session_id = context
                .read_session_id(&location)?
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| ConversionError::MissingSessionId(location.display_path()))?;
            grouped.entry(session_id).or_default().push(location);
        }

        let additional = match context.config().additional_metadata_file_path() {
            Some(path) => Some(path.to_path_buf()),
            None => AdditionalMetadata::discover(
                paths.iter().map(|p| p.as_ref()).filter(|p| p.is_dir()),
            ),
        }
        .map(|path| {
            log::info!("Using additional metadata from {}", path.display());
            AdditionalMetadata::from_file(&path).map(Arc::new)
        })
        .transpose()?;

        Ok(Self::from_groups(grouped, context, additional, None))
    }

    /// Group the NWB assets of a remote dataset by session id.
    ///
    /// Listing or metadata failures do not propagate: they become a
    /// notification and the converter has no sessions.
    pub fn from_remote_dandiset(
        dandiset_id: &str,
        version: &str,
        client: Arc<dyn ArchiveClient>,
        context: Arc<RunContext>,
    ) -> Self {
        let additional = match context.config().additional_metadata_file_path() {
            Some(path) => match AdditionalMetadata::from_file(path) {
                Ok(additional) => Some(Arc::new(additional)),
                Err(e) => {
                    log::warn!(
                        "Ignoring additional metadata {}: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            None => None,
        };

        match list_remote_sessions(dandiset_id, version, client.as_ref(), &context) {
            Ok(grouped) => {
                log::info!(
                    "Dandiset {}/{}: {} sessions",
                    dandiset_id,
                    version,
                    grouped.len()
                );
                Self::from_groups(grouped, context, additional, Some(client))
            }
            Err(e) => {
                log::error!("Could not access dandiset {}: {}", dandiset_id, e);
                let mut converter = Self::from_groups(BTreeMap::new(), context, additional, None);
                let error = ConversionError::from(e);
                if let Some(notification) = error_notification(
                    &error,
                    Vec::<PathBuf>::new(),
                    Vec::<PathBuf>::new(),
                    &format!("Dandiset {} ({})", dandiset_id, version),
                ) {
                    converter.notifications.push(notification);
                }
                converter
            }
        }
    }

    fn from_groups(
        grouped: BTreeMap<String, Vec<SourceLocation>>,
        context: Arc<RunContext>,
        additional: Option<Arc<AdditionalMetadata>>,
        archive: Option<Arc<dyn ArchiveClient>>,
    ) -> Self {
        let sessions = grouped
            .into_iter()
            .map(|(session_id, sources)| {
                let mut session = SessionConverter::new(session_id, sources, Arc::clone(&context));
                if let Some(archive) = &archive {
                    session = session.with_archive(Arc::clone(archive));
                }
                if let Some(additional) = &additional {
                    session = session.with_additional_metadata(Arc::clone(additional));
                }
                session
            })
            .collect();

        Self {
            context,
            sessions,
            additional,
            extracted: false,
            rejected: BTreeSet::new(),
            notifications: Vec::new(),
        }
    }

    /// Session converters, ordered by session id
    pub fn sessions(&self) -> &[SessionConverter] {
        &self.sessions
    }

    /// Look up a session converter by its source session id
    pub fn session(&self, session_id: &str) -> Option<&SessionConverter> {
        self.sessions.iter().find(|s| s.session_id() == session_id)
    }

    /// The run's shared context
    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    /// Additional metadata in effect, if any
    pub fn additional_metadata(&self) -> Option<&AdditionalMetadata> {
        self.additional.as_deref()
    }

    /// Extract every session not yet extracted.
    ///
    /// A failing session is recorded as a notification on that session.
    /// Sessions whose sanitized labels are empty or collide with another
    /// session's are rejected afterwards and will not be converted.
    pub fn extract_metadata(&mut self) {
        for session in &mut self.sessions {
            if session.is_extracted() || self.rejected.contains(session.session_id()) {
                continue;
            }
            let extracted = session.extract_session_metadata().map(|_| ());
            if let Err(e) = extracted {
                log::warn!("Session '{}' failed extraction: {}", session.session_id(), e);
                let sources: Vec<PathBuf> =
                    session.sources().iter().map(|s| s.display_path()).collect();
                if let Some(notification) = error_notification(
                    &e,
                    sources,
                    Vec::<PathBuf>::new(),
                    &format!("Extracting session '{}'", session.session_id()),
                ) {
                    session.push_notification(notification);
                }
            }
        }
        self.reject_label_conflicts();
        self.extracted = true;
    }

    /// Session ids rejected because of their labels
    pub fn rejected_sessions(&self) -> impl Iterator<Item = &str> {
        self.rejected.iter().map(String::as_str)
    }

    fn is_rejected(&self, session: &SessionConverter) -> bool {
        self.rejected.contains(session.session_id())
    }

    /// Reject sessions that would write to an empty or shared path.
    ///
    /// Two sessions collide when their `(participant, session)` labels match;
    /// two participants collide when distinct participant ids share a label.
    fn reject_label_conflicts(&mut self) {
        let mut failures: BTreeMap<usize, ConversionError> = BTreeMap::new();
        let mut claims: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        let mut participants: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (index, session) in self.sessions.iter().enumerate() {
            let Some(metadata) = session.metadata() else {
                continue;
            };
            if self.is_rejected(session) {
                continue;
            }
            match session.labels() {
                Ok((participant, label)) => {
                    participants
                        .entry(participant.clone())
                        .or_default()
                        .insert(metadata.participant.participant_id.clone());
                    claims.entry((participant, label)).or_default().push(index);
                }
                Err(e) => {
                    failures.insert(index, e);
                }
            }
        }

        for ((participant, label), indices) in &claims {
            let raw = participants.get(participant).filter(|raw| raw.len() > 1);
            for &index in indices {
                let error = match raw {
                    Some(raw) => ConversionError::LabelCollision {
                        label: format!("{}{}", PARTICIPANT_PREFIX, participant),
                        identifiers: raw.iter().cloned().collect(),
                    },
                    None if indices.len() > 1 => ConversionError::LabelCollision {
                        label: format!(
                            "{}{}/{}{}",
                            PARTICIPANT_PREFIX, participant, SESSION_PREFIX, label
                        ),
                        identifiers: indices
                            .iter()
                            .map(|&i| self.sessions[i].session_id().to_string())
                            .collect(),
                    },
                    None => continue,
                };
                failures.entry(index).or_insert(error);
            }
        }

        for (index, error) in failures {
            let session = &mut self.sessions[index];
            log::warn!("Rejecting session '{}': {}", session.session_id(), error);
            let sources: Vec<PathBuf> =
                session.sources().iter().map(|s| s.display_path()).collect();
            if let Some(notification) = error_notification(
                &error,
                sources,
                Vec::<PathBuf>::new(),
                &format!("Session '{}'", session.session_id()),
            ) {
                session.push_notification(notification);
            }
            self.rejected.insert(session.session_id().to_string());
        }
    }

    /// Write the dataset-level files, then every extracted session.
    ///
    /// Runs [`DatasetConverter::extract_metadata`] first if it has not run.
    /// Sessions whose extraction failed are skipped.
    pub fn convert_to_bids_dataset(&mut self) -> ConversionStats {
        if !self.extracted {
            self.extract_metadata();
        }

        let mut stats = ConversionStats {
            sessions_total: self.sessions.len(),
            ..Default::default()
        };

        if let Err(e) = self.write_dataset_files(&mut stats) {
            log::error!("Writing dataset files failed: {}", e);
            let target = self.context.config().bids_directory().to_path_buf();
            if let Some(notification) =
                error_notification(&e, Vec::<PathBuf>::new(), [target], "Writing dataset files")
            {
                self.notifications.push(notification);
            }
        }

        for session in &mut self.sessions {
            if !session.is_extracted() || self.rejected.contains(session.session_id()) {
                stats.sessions_failed += 1;
                continue;
            }
            match session.convert_to_bids_session(None) {
                Ok(outcome) => {
                    stats.sessions_converted += 1;
                    stats.sidecars_written += outcome.sidecars.len();
                }
                Err(e) => {
                    log::warn!("Session '{}' failed conversion: {}", session.session_id(), e);
                    stats.sessions_failed += 1;
                    let sources: Vec<PathBuf> =
                        session.sources().iter().map(|s| s.display_path()).collect();
                    if let Some(notification) = error_notification(
                        &e,
                        sources,
                        Vec::<PathBuf>::new(),
                        &format!("Converting session '{}'", session.session_id()),
                    ) {
                        session.push_notification(notification);
                    }
                }
            }
        }

        log::info!("{}", stats);
        stats
    }

    fn write_dataset_files(&mut self, stats: &mut ConversionStats) -> Result<(), ConversionError> {
        let bids_directory = self.context.config().bids_directory().to_path_buf();
        fs::create_dir_all(&bids_directory)?;

        self.write_dataset_description(&bids_directory)?;

        let participants = self.participants_table();
        if !participants.is_empty() {
            participants.write_tsv(&bids_directory.join(PARTICIPANTS_TSV))?;
            participants_schema()
                .restricted_to(&participants.columns)
                .write(&bids_directory.join(PARTICIPANTS_JSON))?;
            stats.participants_written = participants.len();
            stats.sidecars_written += 2;
        }

        for (participant, table) in self.sessions_tables() {
            let directory = bids_directory.join(format!("{}{}", PARTICIPANT_PREFIX, participant));
            fs::create_dir_all(&directory)?;
            let stem = format!("{}{}_sessions", PARTICIPANT_PREFIX, participant);
            table.write_tsv(&directory.join(format!("{}.tsv", stem)))?;
            sessions_schema()
                .restricted_to(&table.columns)
                .write(&directory.join(format!("{}.json", stem)))?;
            stats.sidecars_written += 2;
        }
        Ok(())
    }

    fn write_dataset_description(&mut self, bids_directory: &Path) -> Result<(), ConversionError> {
        let path = bids_directory.join(DATASET_DESCRIPTION_FILE);
        if let Some(description) = self
            .additional
            .as_ref()
            .and_then(|a| a.dataset_description.as_ref())
        {
            description.write(&path)?;
            log::debug!("Wrote {}", path.display());
            return Ok(());
        }

        if !has_dataset_name(&path) {
            self.notifications.push(Notification::from_definition(
                ids::MISSING_DATASET_DESCRIPTION,
                Vec::<PathBuf>::new(),
                [path],
            )?);
        }
        Ok(())
    }

    /// participants.tsv rows: deduplicated, sanitized, `sub-` prefixed.
    fn participants_table(&self) -> TabularData {
        let mut records: Vec<Map<String, Value>> = Vec::new();
        for metadata in self
            .sessions
            .iter()
            .filter(|s| !self.is_rejected(s))
            .filter_map(SessionConverter::metadata)
        {
            let mut record = metadata.participant.to_record();
            if let Some(Value::String(id)) = record.get_mut(PARTICIPANT_COLUMNS[0]) {
                *id = format!("{}{}", PARTICIPANT_PREFIX, self.context.sanitize(id));
            }
            if !records.contains(&record) {
                records.push(record);
            }
        }

        TabularData::from_records(&records, &[], &PARTICIPANT_COLUMNS)
    }

    /// One sessions table per sanitized participant label.
    fn sessions_tables(&self) -> BTreeMap<String, TabularData> {
        let mut by_participant: BTreeMap<String, Vec<(String, Option<String>)>> = BTreeMap::new();
        for session in self.sessions.iter().filter(|s| !self.is_rejected(s)) {
            let (Some(participant), Some(metadata)) = (session.participant_label(), session.metadata())
            else {
                continue;
            };
            by_participant
                .entry(participant)
                .or_default()
                .push((session.session_label(), metadata.acq_time()));
        }

        by_participant
            .into_iter()
            .map(|(participant, sessions)| {
                let with_acq_time = sessions.iter().any(|(_, acq)| acq.is_some());
                let mut columns = vec![SESSION_ID_COLUMN];
                if with_acq_time {
                    columns.push(ACQ_TIME_COLUMN);
                }
                let mut table = TabularData::new(columns);
                for (label, acq_time) in sessions {
                    let mut row = vec![Value::String(format!("{}{}", SESSION_PREFIX, label))];
                    if with_acq_time {
                        row.push(acq_time.map(Value::String).unwrap_or(Value::Null));
                    }
                    table.push_row(row);
                }
                (participant, table)
            })
            .collect()
    }

    /// Every notification of the run, in canonical order
    pub fn notifications(&self) -> Vec<Notification> {
        let mut all = self.collect_notifications();
        sort_notifications(&mut all);
        all
    }
}

impl CollectNotifications for DatasetConverter {
    fn collect_notifications(&self) -> Vec<Notification> {
        let mut all = self.sessions.collect_notifications();
        all.extend(self.notifications.iter().cloned());
        all
    }
}

/// Source files under `paths`, sorted; directories are searched recursively.
pub fn discover_nwb_files<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths.iter().map(|p| p.as_ref()) {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            log::warn!("Skipping unreadable entry: {}", e);
                            None
                        }
                    })
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path())
                    .filter(|p| {
                        p.extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case(NWB_EXTENSION))
                    }),
            );
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            log::warn!("{} does not exist", path.display());
        }
    }
    files.sort();
    files.dedup();
    files
}

fn list_remote_sessions(
    dandiset_id: &str,
    version: &str,
    client: &dyn ArchiveClient,
    context: &RunContext,
) -> Result<BTreeMap<String, Vec<SourceLocation>>, RemoteError> {
    let mut grouped: BTreeMap<String, Vec<SourceLocation>> = BTreeMap::new();
    for asset in client.list_assets(dandiset_id, version)? {
        let recording = client.load_recording(&asset)?;
        let session_id = recording
            .session_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                RemoteError::InvalidAsset(format!("asset {} has no session identifier", asset.path))
            })?;
        let recording = context.insert_recording(recording);
        grouped
            .entry(session_id)
            .or_default()
            .push(recording.location.clone());
    }
    Ok(grouped)
}

/// Whether an existing dataset_description.json already names the dataset
fn has_dataset_name(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<Value>(&content).ok())
        .is_some_and(|value| value.get("Name").and_then(Value::as_str).is_some())
}

/// Turn a caught error into its catalog notification, with the error chain
/// (and a backtrace when one was captured) appended to the reason.
fn error_notification<S, T>(
    error: &ConversionError,
    sources: S,
    targets: T,
    context: &str,
) -> Option<Notification>
where
    S: IntoIterator,
    S::Item: Into<PathBuf>,
    T: IntoIterator,
    T::Item: Into<PathBuf>,
{
    let mut detail = format!("{}: {}", context, error);
    let mut cause = error.source();
    while let Some(e) = cause {
        detail.push_str(&format!("\n  caused by: {}", e));
        cause = e.source();
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        detail.push_str(&format!("\n\n{}", backtrace));
    }

    let built: Result<Notification, NotificationError> =
        Notification::from_definition(error.notification_identifier(), sources, targets);
    match built {
        Ok(notification) => Some(notification.with_detail(detail)),
        Err(e) => {
            log::error!("{} ({})", detail, e);
            None
        }
    }
}
