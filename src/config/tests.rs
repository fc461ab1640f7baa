use super::*;
use tempfile::tempdir;

#[test]
fn test_build_bootstraps_empty_directory() {
    let dir = tempdir().unwrap();
    let bids = dir.path().join("bids");
    let cache = dir.path().join("cache");

    let config = RunConfig::builder(&bids)
        .cache_directory(&cache)
        .run_id("run-1")
        .build()
        .unwrap();

    let description: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(bids.join(DATASET_DESCRIPTION_FILE)).unwrap())
            .unwrap();
    assert_eq!(description["BIDSVersion"], BIDS_VERSION);

    assert_eq!(config.run_directory(), cache.join("runs").join("run-1"));
    assert!(config.sanitization_file_path().is_file());
    assert!(config.notifications_file_path().is_file());
    assert!(config.notifications_json_file_path().is_file());
}

#[test]
fn test_existing_bids_directory_is_accepted() {
    let dir = tempdir().unwrap();
    let bids = dir.path().join("bids");
    fs::create_dir_all(bids.join("sub-1")).unwrap();
    fs::write(
        bids.join(DATASET_DESCRIPTION_FILE),
        r#"{"Name": "x", "BIDSVersion": "1.9.0"}"#,
    )
    .unwrap();

    let config = RunConfig::builder(&bids)
        .cache_directory(dir.path().join("cache"))
        .build();
    assert!(config.is_ok());
}

#[test]
fn test_non_bids_directory_rejected() {
    let dir = tempdir().unwrap();
    let bids = dir.path().join("bids");
    fs::create_dir_all(&bids).unwrap();
    fs::write(bids.join("notes.txt"), "hello").unwrap();

    let result = RunConfig::builder(&bids)
        .cache_directory(dir.path().join("cache"))
        .build();
    assert!(matches!(result, Err(ConfigError::NonBidsDirectory(_))));
}

#[test]
fn test_missing_bids_version_rejected() {
    let dir = tempdir().unwrap();
    let bids = dir.path().join("bids");
    fs::create_dir_all(&bids).unwrap();
    fs::write(bids.join(DATASET_DESCRIPTION_FILE), r#"{"Name": "x"}"#).unwrap();

    let result = RunConfig::builder(&bids)
        .cache_directory(dir.path().join("cache"))
        .build();
    assert!(matches!(result, Err(ConfigError::MissingBidsVersion(_))));
}

#[test]
fn test_missing_additional_metadata_rejected() {
    let dir = tempdir().unwrap();
    let result = RunConfig::builder(dir.path().join("bids"))
        .cache_directory(dir.path().join("cache"))
        .additional_metadata_file_path(dir.path().join("nope.json"))
        .build();
    assert!(matches!(result, Err(ConfigError::MissingAdditionalMetadata(_))));
}

#[test]
fn test_generated_run_ids_are_unique() {
    let a = generate_run_id();
    let b = generate_run_id();
    assert!(a.starts_with("date-"));
    assert_ne!(a, b);
}

#[test]
fn test_file_mode_parsing() {
    assert_eq!("copy".parse::<FileMode>().unwrap(), FileMode::Copy);
    assert_eq!("Symlink".parse::<FileMode>().unwrap(), FileMode::Symlink);
    assert_eq!(FileMode::default(), FileMode::Auto);
    assert!("teleport".parse::<FileMode>().is_err());
    assert_eq!(FileMode::Move.to_string(), "move");
}
