use super::*;
use crate::config::RunConfig;
use crate::metadata::{ColumnDescription, TabularData};
use crate::notifications::ids;
use crate::nwb::{
    Device, ElectrodeRow, InMemoryReader, IntervalColumn, IntervalTable, SeriesKind, Subject,
    TimeSeriesInfo,
};
use crate::remote::{RemoteAsset, RemoteError};
use crate::sanitization::SanitizationLevel;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::tempdir;

fn recording_at(path: &Path, session_id: &str) -> SourceRecording {
    let mut recording = SourceRecording::new(path.to_path_buf());
    recording.session_id = Some(session_id.to_string());
    recording.subject = Some(Subject {
        subject_id: Some("123".to_string()),
        species: Some("Mus musculus".to_string()),
        sex: Some("male".to_string()),
        ..Default::default()
    });
    recording
}

fn write_source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"HDF5 payload").unwrap();
    path
}

fn context(root: &Path, reader: InMemoryReader) -> Arc<RunContext> {
    context_at(root, reader, SanitizationLevel::None)
}

fn context_at(root: &Path, reader: InMemoryReader, level: SanitizationLevel) -> Arc<RunContext> {
    let config = RunConfig::builder(root.join("bids"))
        .cache_directory(root.join("cache"))
        .file_mode(FileMode::Copy)
        .sanitization_level(level)
        .build()
        .unwrap();
    RunContext::new(config, Box::new(reader)).shared()
}

#[test]
fn test_extraction_is_lazy_and_repeatable() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let reader = InMemoryReader::new().with_recording(recording_at(&source, "456"));
    let ctx = context(dir.path(), reader);

    let mut session = SessionConverter::new("456", vec![source.into()], Arc::clone(&ctx));
    assert!(!session.is_extracted());
    assert!(session.participant_label().is_none());

    session.extract_session_metadata().unwrap();
    session.extract_session_metadata().unwrap();
    assert!(session.is_extracted());
    assert_eq!(session.participant_label().as_deref(), Some("123"));
    assert_eq!(ctx.cached_recordings(), 1);
}

#[test]
fn test_minimal_session_layout() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let reader = InMemoryReader::new().with_recording(recording_at(&source, "456"));
    let ctx = context(dir.path(), reader);

    let mut session = SessionConverter::new("456", vec![source.clone().into()], ctx);
    let outcome = session.convert_to_bids_session(None).unwrap();

    let expected_dir = dir.path().join("bids/sub-123/ses-456/ecephys");
    assert_eq!(outcome.directory, expected_dir);
    assert_eq!(
        outcome.data_file,
        expected_dir.join("sub-123_ses-456_ecephys.nwb")
    );
    assert!(outcome.sidecars.is_empty());
    assert_eq!(fs::read(&outcome.data_file).unwrap(), b"HDF5 payload");
    assert!(source.exists());

    let entries: Vec<_> = fs::read_dir(&expected_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_sidecars_written_for_present_entities() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let mut recording = recording_at(&source, "456");
    recording.devices = vec![Device::new("probe0")];
    recording.electrodes = Some(vec![ElectrodeRow {
        x: Some(1.0),
        y: Some(2.0),
        z: Some(3.0),
        device_name: Some("probe0".to_string()),
        ..ElectrodeRow::new(0)
    }]);
    let mut series = TimeSeriesInfo::new(
        "ElectricalSeries",
        SeriesKind::Electrical { electrodes: vec![0] },
    );
    series.rate = Some(1000.0);
    series.unit = Some("volts".to_string());
    recording.time_series.push(series);
    recording.trials = Some(
        IntervalTable::new("trials")
            .with_description("Trials")
            .with_column(IntervalColumn::from_f64("start_time", &[0.0]))
            .with_column(IntervalColumn::from_f64("stop_time", &[1.0]))
            .with_column(IntervalColumn::new("stim", vec![serde_json::json!("A")])),
    );
    let ctx = context(dir.path(), InMemoryReader::new().with_recording(recording));

    let mut overrides = BTreeMap::new();
    overrides.insert(
        "stim".to_string(),
        ColumnDescription::new("Stimulus identity"),
    );
    let additional = Arc::new(AdditionalMetadata {
        dataset_description: None,
        events: overrides,
    });

    let mut session =
        SessionConverter::new("456", vec![source.into()], ctx).with_additional_metadata(additional);
    let outcome = session.convert_to_bids_session(None).unwrap();

    let names: Vec<String> = outcome
        .sidecars
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "sub-123_ses-456_probes.tsv",
            "sub-123_ses-456_probes.json",
            "sub-123_ses-456_channels.tsv",
            "sub-123_ses-456_channels.json",
            "sub-123_ses-456_electrodes.tsv",
            "sub-123_ses-456_electrodes.json",
            "sub-123_ses-456_events.tsv",
            "sub-123_ses-456_events.json",
        ]
    );

    let events = TabularData::read_tsv(&outcome.directory.join("sub-123_ses-456_events.tsv")).unwrap();
    assert_eq!(events.columns, vec!["onset", "duration", "nwb_table", "stim"]);

    let sidecar: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(outcome.directory.join("sub-123_ses-456_events.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(sidecar["stim"]["Description"], "Stimulus identity");

    let undocumented = session
        .collect_notifications()
        .into_iter()
        .filter(|n| n.identifier() == Some(ids::MISSING_EVENT_COLUMN_DESCRIPTION))
        .count();
    assert_eq!(undocumented, 0);
}

#[test]
fn test_multiple_files_per_session_fails_before_extraction() {
    let dir = tempdir().unwrap();
    let a = write_source(dir.path(), "a.nwb");
    let b = write_source(dir.path(), "b.nwb");
    let reader = InMemoryReader::new()
        .with_recording(recording_at(&a, "A"))
        .with_recording(recording_at(&b, "A"));
    let ctx = context(dir.path(), reader);

    let mut session = SessionConverter::new("A", vec![a.into(), b.into()], ctx);
    let err = session.convert_to_bids_session(None).unwrap_err();
    assert!(matches!(
        err,
        ConversionError::MultipleFilesPerSession { count: 2, .. }
    ));
    assert!(!session.is_extracted());
    assert_eq!(err.notification_identifier(), ids::MULTIPLE_FILES_PER_SESSION);
}

#[test]
fn test_move_mode_relocates_source() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let reader = InMemoryReader::new().with_recording(recording_at(&source, "456"));
    let ctx = context(dir.path(), reader);

    let mut session = SessionConverter::new("456", vec![source.clone().into()], ctx);
    let outcome = session
        .convert_to_bids_session(Some(FileMode::Move))
        .unwrap();
    assert!(!source.exists());
    assert_eq!(fs::read(&outcome.data_file).unwrap(), b"HDF5 payload");
}

#[cfg(unix)]
#[test]
fn test_symlink_mode_links_to_source() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let reader = InMemoryReader::new().with_recording(recording_at(&source, "456"));
    let ctx = context(dir.path(), reader);

    let mut session = SessionConverter::new("456", vec![source.clone().into()], ctx);
    let outcome = session
        .convert_to_bids_session(Some(FileMode::Symlink))
        .unwrap();
    let meta = fs::symlink_metadata(&outcome.data_file).unwrap();
    assert!(meta.file_type().is_symlink());
    assert_eq!(
        fs::read_link(&outcome.data_file).unwrap(),
        fs::canonicalize(&source).unwrap()
    );

    // A re-run replaces the link
    session
        .convert_to_bids_session(Some(FileMode::Copy))
        .unwrap();
    let meta = fs::symlink_metadata(&outcome.data_file).unwrap();
    assert!(meta.file_type().is_file());
}

#[test]
fn test_transfer_file_replaces_existing_destination() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let destination = dir.path().join("out.nwb");
    fs::write(&destination, b"stale").unwrap();

    transfer_file(&source, &destination, FileMode::Copy).unwrap();
    assert_eq!(fs::read(&destination).unwrap(), b"HDF5 payload");

    // Same file in place is left alone
    transfer_file(&destination, &destination, FileMode::Move).unwrap();
    assert!(destination.exists());
}

#[test]
fn test_sanitized_labels_in_paths() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let mut recording = recording_at(&source, "day 1/run_2");
    if let Some(subject) = recording.subject.as_mut() {
        subject.subject_id = Some("mouse#7".to_string());
    }
    let ctx = context_at(
        dir.path(),
        InMemoryReader::new().with_recording(recording),
        SanitizationLevel::Critical,
    );

    let mut session = SessionConverter::new("day 1/run_2", vec![source.into()], ctx);
    let outcome = session.convert_to_bids_session(None).unwrap();
    assert!(outcome
        .data_file
        .ends_with("sub-mouse+7/ses-day+1+run+2/ecephys/sub-mouse+7_ses-day+1+run+2_ecephys.nwb"));
    assert_eq!(session.session_label(), "day+1+run+2");
}

struct StubArchive;

impl ArchiveClient for StubArchive {
    fn list_assets(&self, _: &str, _: &str) -> Result<Vec<RemoteAsset>, RemoteError> {
        Ok(Vec::new())
    }

    fn load_recording(&self, _: &RemoteAsset) -> Result<SourceRecording, RemoteError> {
        Err(RemoteError::Http("offline".to_string()))
    }

    fn download(&self, _: &SourceLocation, destination: &Path) -> Result<u64, RemoteError> {
        fs::write(destination, b"remote bytes")?;
        Ok(12)
    }
}

#[test]
fn test_remote_source_is_downloaded() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), InMemoryReader::new());
    let location = SourceLocation::Remote {
        asset_id: "abc".to_string(),
        path: "sub-1/sub-1_ses-2.nwb".to_string(),
        url: "https://example.org/abc".to_string(),
    };
    let mut recording = SourceRecording::new(location.clone());
    recording.session_id = Some("2".to_string());
    recording.subject = Some(Subject {
        subject_id: Some("1".to_string()),
        ..Default::default()
    });
    ctx.insert_recording(recording);

    let mut without_client = SessionConverter::new("2", vec![location.clone()], Arc::clone(&ctx));
    assert!(matches!(
        without_client.convert_to_bids_session(None),
        Err(ConversionError::NoArchiveClient(_))
    ));

    let mut session =
        SessionConverter::new("2", vec![location], ctx).with_archive(Arc::new(StubArchive));
    let outcome = session.convert_to_bids_session(None).unwrap();
    assert!(outcome.data_file.ends_with("sub-1/ses-2/ecephys/sub-1_ses-2_ecephys.nwb"));
    assert_eq!(fs::read(&outcome.data_file).unwrap(), b"remote bytes");
}

#[cfg(unix)]
#[test]
fn test_symlink_failure_names_link_and_target() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let link = dir.path().join("missing").join("link.nwb");

    let err = transfer_file(&source, &link, FileMode::Symlink).unwrap_err();
    match &err {
        ConversionError::SymlinkFailed { link: failed, target, source: io } => {
            assert_eq!(failed, &link);
            assert_eq!(target, &fs::canonicalize(&source).unwrap());
            assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected SymlinkFailed, got {:?}", other),
    }
    assert_eq!(err.notification_identifier(), ids::INTERNAL_ERROR);
    assert!(fs::symlink_metadata(&link).is_err());
}

#[test]
fn test_labels_require_extraction() {
    let dir = tempdir().unwrap();
    let source = write_source(dir.path(), "a.nwb");
    let reader = InMemoryReader::new().with_recording(recording_at(&source, "456"));
    let session = SessionConverter::new("456", vec![source.into()], context(dir.path(), reader));

    assert!(matches!(
        session.labels(),
        Err(ConversionError::MetadataNotExtracted(_))
    ));
}

#[test]
fn test_labels_sanitized_to_nothing_are_rejected() {
    let dir = tempdir().unwrap();
    let first = write_source(dir.path(), "a.nwb");
    let second = write_source(dir.path(), "b.nwb");
    let mut blank_subject = recording_at(&first, "day1");
    if let Some(subject) = blank_subject.subject.as_mut() {
        subject.subject_id = Some("___".to_string());
    }
    let reader = InMemoryReader::new()
        .with_recording(blank_subject)
        .with_recording(recording_at(&second, "+-+"));
    let ctx = context_at(dir.path(), reader, SanitizationLevel::Critical);

    let mut subject = SessionConverter::new("day1", vec![first.into()], ctx.clone());
    subject.extract_session_metadata().unwrap();
    assert!(matches!(
        subject.labels(),
        Err(ConversionError::MetadataError(MetadataError::MissingSubjectId(_)))
    ));
    assert!(matches!(
        subject.convert_to_bids_session(None),
        Err(ConversionError::MetadataError(MetadataError::MissingSubjectId(_)))
    ));

    let mut session = SessionConverter::new("+-+", vec![second.into()], ctx);
    session.extract_session_metadata().unwrap();
    assert!(matches!(session.labels(), Err(ConversionError::MissingSessionId(_))));
    assert!(!dir.path().join("bids/sub-123").exists());
}
