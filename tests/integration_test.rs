//! End-to-end conversions through the public API.

use nwb2bids::config::{FileMode, RunConfig};
use nwb2bids::context::RunContext;
use nwb2bids::dataset::DatasetConverter;
use nwb2bids::metadata::{TabularData, NWB_TABLE_COLUMN};
use nwb2bids::notifications::{ids, NotificationReport, Severity};
use nwb2bids::nwb::{
    ElectrodeRow, IcephysElectrode, InMemoryReader, IntervalColumn, IntervalTable,
    SourceLocation, SourceRecording, Subject,
};
use nwb2bids::remote::{ArchiveClient, RemoteAsset, RemoteError};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn mouse_recording(path: &Path, subject_id: &str, session_id: &str) -> SourceRecording {
    let mut recording = SourceRecording::new(path.to_path_buf());
    recording.session_id = Some(session_id.to_string());
    recording.subject = Some(Subject {
        subject_id: Some(subject_id.to_string()),
        species: Some("Mus musculus".to_string()),
        sex: Some("male".to_string()),
        ..Default::default()
    });
    recording
}

/// Source directory with NWB placeholders backed by an in-memory reader
struct Workspace {
    dir: TempDir,
    reader: InMemoryReader,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sources")).unwrap();
        Self {
            dir,
            reader: InMemoryReader::new(),
        }
    }

    fn sources(&self) -> PathBuf {
        self.dir.path().join("sources")
    }

    fn bids(&self) -> PathBuf {
        self.dir.path().join("bids")
    }

    fn add(&mut self, name: &str, build: impl FnOnce(&Path) -> SourceRecording) -> PathBuf {
        let path = self.sources().join(name);
        fs::write(&path, b"placeholder nwb content").unwrap();
        self.reader.insert(build(&path));
        path
    }

    fn context(&self, file_mode: FileMode) -> Arc<RunContext> {
        let config = RunConfig::builder(self.bids())
            .cache_directory(self.dir.path().join("cache"))
            .file_mode(file_mode)
            .build()
            .unwrap();
        RunContext::new(config, Box::new(self.reader.clone())).shared()
    }

    fn converter(&self, file_mode: FileMode) -> DatasetConverter {
        DatasetConverter::from_nwb_paths(&[self.sources()], self.context(file_mode)).unwrap()
    }
}

fn relative_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| !e.file_type().is_dir())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_minimal_dataset_round_trip() {
    let mut ws = Workspace::new();
    ws.add("recording.nwb", |p| mouse_recording(p, "123", "456"));

    let mut converter = ws.converter(FileMode::Copy);
    converter.extract_metadata();
    let stats = converter.convert_to_bids_dataset();

    assert_eq!(stats.sessions_total, 1);
    assert_eq!(stats.sessions_converted, 1);
    assert_eq!(stats.sessions_failed, 0);
    assert_eq!(stats.participants_written, 1);
    assert_eq!(stats.sidecars_written, 4);

    assert_eq!(
        relative_files(&ws.bids()),
        vec![
            "dataset_description.json",
            "participants.json",
            "participants.tsv",
            "sub-123/ses-456/ecephys/sub-123_ses-456_ecephys.nwb",
            "sub-123/sub-123_sessions.json",
            "sub-123/sub-123_sessions.tsv",
        ]
    );

    let participants = TabularData::read_tsv(&ws.bids().join("participants.tsv")).unwrap();
    assert_eq!(participants.columns, vec!["participant_id", "species", "sex"]);
    assert_eq!(
        participants.rows,
        vec![vec![
            Value::from("sub-123"),
            Value::from("Mus musculus"),
            Value::from("male"),
        ]]
    );

    let sessions = TabularData::read_tsv(&ws.bids().join("sub-123/sub-123_sessions.tsv")).unwrap();
    assert_eq!(sessions.columns, vec!["session_id"]);
    assert_eq!(sessions.rows, vec![vec![Value::from("ses-456")]]);

    let copied =
        fs::read(ws.bids().join("sub-123/ses-456/ecephys/sub-123_ses-456_ecephys.nwb")).unwrap();
    assert_eq!(copied, b"placeholder nwb content");
    assert!(ws.sources().join("recording.nwb").is_file());

    let notifications = converter.notifications();
    assert!(notifications
        .iter()
        .any(|n| n.identifier() == Some(ids::MISSING_DATASET_DESCRIPTION)));
    assert!(!NotificationReport::new(notifications).has_critical());
}

#[test]
fn test_full_session_writes_every_sidecar() {
    let mut ws = Workspace::new();
    ws.add("full.nwb", |p| {
        let mut r = mouse_recording(p, "7", "1");
        let mut electrode = ElectrodeRow::new(0);
        electrode.x = Some(1.0);
        electrode.y = Some(2.0);
        electrode.z = Some(3.0);
        electrode.location = Some("CA1".to_string());
        electrode.group_name = Some("shank0".to_string());
        electrode.device_name = Some("probe0".to_string());
        r.electrodes = Some(vec![electrode]);
        r.devices = vec![nwb2bids::nwb::Device::new("probe0")];
        r.trials = Some(
            IntervalTable::new("trials")
                .with_description("Behavioral trials")
                .with_column(IntervalColumn::from_f64("start_time", &[2.0, 0.5]))
                .with_column(IntervalColumn::from_f64("stop_time", &[3.0, 1.5])),
        );
        r
    });

    let mut converter = ws.converter(FileMode::Copy);
    let stats = converter.convert_to_bids_dataset();
    assert_eq!(stats.sessions_converted, 1);

    let ecephys = ws.bids().join("sub-7/ses-1/ecephys");
    for suffix in ["probes", "channels", "electrodes", "events"] {
        assert!(
            ecephys.join(format!("sub-7_ses-1_{}.tsv", suffix)).is_file(),
            "missing {} table",
            suffix
        );
        assert!(
            ecephys.join(format!("sub-7_ses-1_{}.json", suffix)).is_file(),
            "missing {} sidecar",
            suffix
        );
    }

    let events = TabularData::read_tsv(&ecephys.join("sub-7_ses-1_events.tsv")).unwrap();
    assert_eq!(&events.columns[..3], &["onset", "duration", NWB_TABLE_COLUMN]);
    assert_eq!(
        events.column("onset").unwrap(),
        vec![&Value::from("0.5"), &Value::from("2.0")]
    );
}

#[test]
fn test_sessions_grouped_across_files() {
    let mut ws = Workspace::new();
    ws.add("a1.nwb", |p| mouse_recording(p, "1", "A"));
    ws.add("a2.nwb", |p| mouse_recording(p, "1", "A"));
    ws.add("b.nwb", |p| mouse_recording(p, "2", "B"));

    let mut converter = ws.converter(FileMode::Copy);
    let ids: Vec<&str> = converter.sessions().iter().map(|s| s.session_id()).collect();
    assert_eq!(ids, vec!["A", "B"]);

    let stats = converter.convert_to_bids_dataset();
    assert_eq!(stats.sessions_total, 2);
    assert_eq!(stats.sessions_converted, 1);
    assert_eq!(stats.sessions_failed, 1);
    assert!(ws.bids().join("sub-2/ses-B/ecephys/sub-2_ses-B_ecephys.nwb").is_file());
}

#[test]
fn test_ambiguous_modality_is_reported_and_skipped() {
    let mut ws = Workspace::new();
    ws.add("both.nwb", |p| {
        let mut r = mouse_recording(p, "1", "1");
        r.electrodes = Some(vec![ElectrodeRow::new(0)]);
        r.icephys_electrodes = vec![IcephysElectrode {
            name: "patch".to_string(),
            ..Default::default()
        }];
        r
    });

    let mut converter = ws.converter(FileMode::Copy);
    let stats = converter.convert_to_bids_dataset();
    assert_eq!(stats.sessions_converted, 0);
    assert_eq!(stats.sessions_failed, 1);
    assert!(!ws.bids().join("sub-1").exists());

    let notifications = converter.notifications();
    let ambiguous = notifications
        .iter()
        .find(|n| n.identifier() == Some(ids::AMBIGUOUS_MODALITY))
        .unwrap();
    assert_eq!(ambiguous.severity(), Severity::Error);
    assert_eq!(
        ambiguous.source_file_paths(),
        &[ws.sources().join("both.nwb")]
    );
}

#[test]
fn test_reserved_event_column_fails_session() {
    let mut ws = Workspace::new();
    ws.add("reserved.nwb", |p| {
        let mut r = mouse_recording(p, "1", "1");
        r.trials = Some(
            IntervalTable::new("trials")
                .with_column(IntervalColumn::from_f64("start_time", &[0.0]))
                .with_column(IntervalColumn::from_f64("stop_time", &[1.0]))
                .with_column(IntervalColumn::new(NWB_TABLE_COLUMN, vec![json!("x")])),
        );
        r
    });

    let mut converter = ws.converter(FileMode::Copy);
    let stats = converter.convert_to_bids_dataset();
    assert_eq!(stats.sessions_failed, 1);
    assert!(converter
        .notifications()
        .iter()
        .any(|n| n.identifier() == Some(ids::INVALID_INTERVAL_TABLES)));
}

#[test]
fn test_report_files_written() {
    let mut ws = Workspace::new();
    ws.add("recording.nwb", |p| {
        let mut r = mouse_recording(p, "1", "1");
        r.subject.as_mut().unwrap().species = Some("mouse".to_string());
        r
    });

    let context = ws.context(FileMode::Copy);
    let config = context.config().clone();
    let mut converter = DatasetConverter::from_nwb_paths(&[ws.sources()], context).unwrap();
    converter.convert_to_bids_dataset();

    let report = NotificationReport::new(converter.notifications());
    report
        .write_files(
            &config.notifications_file_path(),
            &config.notifications_json_file_path(),
        )
        .unwrap();

    let text = fs::read_to_string(config.notifications_file_path()).unwrap();
    assert!(text.contains("mouse"));
    let json: Value =
        serde_json::from_str(&fs::read_to_string(config.notifications_json_file_path()).unwrap())
            .unwrap();
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["identifier"] == ids::INVALID_PARTICIPANT_SPECIES));
}

#[test]
fn test_move_mode_removes_source() {
    let mut ws = Workspace::new();
    let source = ws.add("recording.nwb", |p| mouse_recording(p, "1", "1"));

    let mut converter = ws.converter(FileMode::Move);
    converter.extract_metadata();
    let stats = converter.convert_to_bids_dataset();

    assert_eq!(stats.sessions_converted, 1);
    assert!(!source.exists());
    assert!(ws.bids().join("sub-1/ses-1/ecephys/sub-1_ses-1_ecephys.nwb").is_file());
}

#[cfg(unix)]
#[test]
fn test_symlink_mode_links_source() {
    let mut ws = Workspace::new();
    let source = ws.add("recording.nwb", |p| mouse_recording(p, "1", "1"));

    let mut converter = ws.converter(FileMode::Symlink);
    converter.convert_to_bids_dataset();

    let data_file = ws.bids().join("sub-1/ses-1/ecephys/sub-1_ses-1_ecephys.nwb");
    let metadata = fs::symlink_metadata(&data_file).unwrap();
    assert!(metadata.file_type().is_symlink());
    assert_eq!(
        fs::canonicalize(&data_file).unwrap(),
        fs::canonicalize(&source).unwrap()
    );
}

/// Archive that is never reachable
struct OfflineArchive;

impl ArchiveClient for OfflineArchive {
    fn list_assets(&self, dandiset_id: &str, _version: &str) -> Result<Vec<RemoteAsset>, RemoteError> {
        Err(RemoteError::Status {
            url: format!("https://archive.invalid/dandisets/{}/", dandiset_id),
            status: 404,
        })
    }

    fn load_recording(&self, asset: &RemoteAsset) -> Result<SourceRecording, RemoteError> {
        Err(RemoteError::InvalidAsset(asset.asset_id.clone()))
    }

    fn download(&self, location: &SourceLocation, _destination: &Path) -> Result<u64, RemoteError> {
        Err(RemoteError::NotRemote(location.to_string()))
    }
}

#[test]
fn test_unreachable_dandiset_yields_notification() {
    let ws = Workspace::new();
    let mut converter = DatasetConverter::from_remote_dandiset(
        "000000",
        "draft",
        Arc::new(OfflineArchive),
        ws.context(FileMode::Copy),
    );
    assert!(converter.sessions().is_empty());

    let access: Vec<_> = converter
        .notifications()
        .into_iter()
        .filter(|n| n.identifier() == Some(ids::DANDISET_ACCESS_ERROR))
        .collect();
    assert_eq!(access.len(), 1);
    assert!(access[0].reason().contains("000000"));

    let stats = converter.convert_to_bids_dataset();
    assert_eq!(stats.sessions_total, 0);
    assert_eq!(stats.sessions_converted, 0);
}
