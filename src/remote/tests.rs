use super::*;
use serde_json::json;

fn asset(path: &str) -> RemoteAsset {
    RemoteAsset {
        dandiset_id: "000003".to_string(),
        version: DEFAULT_VERSION.to_string(),
        asset_id: "7f3e-41ac".to_string(),
        path: path.to_string(),
        size: Some(1024),
        download_url: "https://example.org/assets/7f3e-41ac/download/".to_string(),
    }
}

#[test]
fn test_asset_location_is_remote() {
    let asset = asset("sub-YutaMouse20/sub-YutaMouse20_ses-1.nwb");
    match asset.location() {
        SourceLocation::Remote { asset_id, path, url } => {
            assert_eq!(asset_id, "7f3e-41ac");
            assert_eq!(path, "sub-YutaMouse20/sub-YutaMouse20_ses-1.nwb");
            assert_eq!(url, asset.download_url);
        }
        other => panic!("expected remote location, got {:?}", other),
    }
    assert_eq!(asset.location().extension(), "nwb");
}

#[test]
fn test_is_nwb_filters_by_extension() {
    assert!(asset("a/b.nwb").is_nwb());
    assert!(asset("a/b.NWB").is_nwb());
    assert!(!asset("dataset_description.json").is_nwb());
    assert!(!asset("README").is_nwb());
}

#[test]
fn test_recording_from_asset_metadata() {
    let metadata = json!({
        "schemaKey": "Asset",
        "wasAttributedTo": [{
            "schemaKey": "Participant",
            "identifier": "YutaMouse20",
            "species": {"name": "Mus musculus - House mouse"},
            "sex": {"name": "Male", "identifier": "http://purl.obolibrary.org/obo/PATO_0000384"},
            "age": {"value": "P90D"}
        }],
        "wasGeneratedBy": [
            {"schemaKey": "Activity", "name": "Metadata extraction"},
            {"schemaKey": "Session", "identifier": "1", "startDate": "2017-06-16T15:21:42-04:00"}
        ]
    });

    let recording = recording_from_asset_metadata(&asset("x.nwb"), &metadata).unwrap();
    let subject = recording.subject.as_ref().unwrap();
    assert_eq!(subject.subject_id.as_deref(), Some("YutaMouse20"));
    assert_eq!(subject.species.as_deref(), Some("Mus musculus - House mouse"));
    assert_eq!(subject.sex.as_deref(), Some("Male"));
    assert_eq!(subject.age.as_deref(), Some("P90D"));
    assert_eq!(subject.strain, None);
    assert_eq!(recording.session_id.as_deref(), Some("1"));
    assert_eq!(
        recording.session_start_time.as_deref(),
        Some("2017-06-16T15:21:42-04:00")
    );
    assert_eq!(recording.identifier.as_deref(), Some("7f3e-41ac"));
    assert!(!recording.has_ecephys());
}

#[test]
fn test_recording_without_participant_or_session() {
    let recording = recording_from_asset_metadata(&asset("x.nwb"), &json!({})).unwrap();
    assert!(recording.subject.is_none());
    assert!(recording.session_id.is_none());
}

#[test]
fn test_non_object_metadata_is_rejected() {
    let err = recording_from_asset_metadata(&asset("x.nwb"), &json!([1, 2])).unwrap_err();
    assert!(matches!(err, RemoteError::InvalidAsset(_)));
}
