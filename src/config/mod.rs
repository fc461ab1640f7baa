//! # Run Configuration
//!
//! A [`RunConfig`] is resolved once per invocation and never changes after
//! [`RunConfigBuilder::build`] returns. Building it has side effects that last
//! for the whole run:
//!
//! - the BIDS directory is validated, or created and bootstrapped with a
//!   minimal `dataset_description.json`;
//! - a run directory `<cache_directory>/runs/<run_id>/` is created;
//! - the run's report files (`sanitization.log`, `notifications.txt`,
//!   `notifications.json`) are touched there and only ever appended to or
//!   overwritten afterwards.
//!
//! ```rust,no_run
//! use nwb2bids::config::{FileMode, RunConfig};
//! use nwb2bids::sanitization::SanitizationLevel;
//!
//! let config = RunConfig::builder("bids_output")
//!     .file_mode(FileMode::Copy)
//!     .sanitization_level(SanitizationLevel::Critical)
//!     .build()?;
//! println!("Run {} logs to {}", config.run_id(), config.run_directory().display());
//! # Ok::<(), nwb2bids::config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::metadata::{Modality, DATASET_DESCRIPTION_FILE};
use crate::sanitization::SanitizationLevel;

mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

/// BIDS version written into new datasets
pub const BIDS_VERSION: &str = "1.10.0";

/// Name of the default cache directory inside the user's home
pub const DEFAULT_CACHE_DIR_NAME: &str = ".nwb2bids";

/// Sanitization substitutions log, inside the run directory
pub const SANITIZATION_LOG_FILE: &str = "sanitization.log";

/// Plain-text notification dump, inside the run directory
pub const NOTIFICATIONS_TEXT_FILE: &str = "notifications.txt";

/// JSON notification dump, inside the run directory
pub const NOTIFICATIONS_JSON_FILE: &str = "notifications.json";

/// How source files are placed into the BIDS tree
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Symlink when the filesystem supports it, copy otherwise
    #[default]
    Auto,
    /// Duplicate the bytes
    Copy,
    /// Relocate the file, removing the original
    Move,
    /// Create a symbolic link to the original
    Symlink,
}

impl FileMode {
    /// Returns all accepted mode names.
    pub fn variants() -> &'static [&'static str] {
        &["auto", "copy", "move", "symlink"]
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMode::Auto => write!(f, "auto"),
            FileMode::Copy => write!(f, "copy"),
            FileMode::Move => write!(f, "move"),
            FileMode::Symlink => write!(f, "symlink"),
        }
    }
}

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(FileMode::Auto),
            "copy" => Ok(FileMode::Copy),
            "move" => Ok(FileMode::Move),
            "symlink" | "link" => Ok(FileMode::Symlink),
            _ => Err(format!(
                "Unknown file mode '{}'. Valid options: {}",
                s,
                FileMode::variants().join(", ")
            )),
        }
    }
}

/// Immutable per-invocation configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    bids_directory: PathBuf,
    additional_metadata_file_path: Option<PathBuf>,
    file_mode: FileMode,
    cache_directory: PathBuf,
    sanitization_level: SanitizationLevel,
    default_modality: Modality,
    run_id: String,
}

impl RunConfig {
    /// Start configuring a run that writes into `bids_directory`.
    pub fn builder(bids_directory: impl Into<PathBuf>) -> RunConfigBuilder {
        RunConfigBuilder::new(bids_directory)
    }

    /// Root of the output dataset
    pub fn bids_directory(&self) -> &Path {
        &self.bids_directory
    }

    /// Explicitly supplied additional metadata file
    pub fn additional_metadata_file_path(&self) -> Option<&Path> {
        self.additional_metadata_file_path.as_deref()
    }

    /// Requested transfer mode (may still be `Auto`)
    pub fn file_mode(&self) -> FileMode {
        self.file_mode
    }

    /// Directory holding per-run report directories
    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    /// Identifier sanitization level
    pub fn sanitization_level(&self) -> SanitizationLevel {
        self.sanitization_level
    }

    /// Modality directory used when a session has no electrode data
    pub fn default_modality(&self) -> Modality {
        self.default_modality
    }

    /// Unique identifier of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// `<cache_directory>/runs/<run_id>`
    pub fn run_directory(&self) -> PathBuf {
        self.cache_directory.join("runs").join(&self.run_id)
    }

    /// Log of every sanitization substitution made during the run
    pub fn sanitization_file_path(&self) -> PathBuf {
        self.run_directory().join(SANITIZATION_LOG_FILE)
    }

    /// Plain-text dump of every notification
    pub fn notifications_file_path(&self) -> PathBuf {
        self.run_directory().join(NOTIFICATIONS_TEXT_FILE)
    }

    /// JSON dump of every notification
    pub fn notifications_json_file_path(&self) -> PathBuf {
        self.run_directory().join(NOTIFICATIONS_JSON_FILE)
    }
}

/// Builder for [`RunConfig`]
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    bids_directory: PathBuf,
    additional_metadata_file_path: Option<PathBuf>,
    file_mode: FileMode,
    cache_directory: Option<PathBuf>,
    sanitization_level: SanitizationLevel,
    default_modality: Modality,
    run_id: Option<String>,
}

impl RunConfigBuilder {
    fn new(bids_directory: impl Into<PathBuf>) -> Self {
        Self {
            bids_directory: bids_directory.into(),
            additional_metadata_file_path: None,
            file_mode: FileMode::default(),
            cache_directory: None,
            sanitization_level: SanitizationLevel::default(),
            default_modality: Modality::default(),
            run_id: None,
        }
    }

    /// Use an explicit additional metadata file
    pub fn additional_metadata_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.additional_metadata_file_path = Some(path.into());
        self
    }

    /// Set the transfer mode
    pub fn file_mode(mut self, file_mode: FileMode) -> Self {
        self.file_mode = file_mode;
        self
    }

    /// Override the cache directory (default `~/.nwb2bids`)
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(path.into());
        self
    }

    /// Set the sanitization level
    pub fn sanitization_level(mut self, level: SanitizationLevel) -> Self {
        self.sanitization_level = level;
        self
    }

    /// Set the modality used for sessions without electrode data
    pub fn default_modality(mut self, modality: Modality) -> Self {
        self.default_modality = modality;
        self
    }

    /// Override the generated run identifier
    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Validate the output directory and create the run's report files.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        if let Some(path) = &self.additional_metadata_file_path {
            if !path.is_file() {
                return Err(ConfigError::MissingAdditionalMetadata(path.clone()));
            }
        }

        prepare_bids_directory(&self.bids_directory)?;

        let config = RunConfig {
            bids_directory: self.bids_directory,
            additional_metadata_file_path: self.additional_metadata_file_path,
            file_mode: self.file_mode,
            cache_directory: self.cache_directory.unwrap_or_else(default_cache_directory),
            sanitization_level: self.sanitization_level,
            default_modality: self.default_modality,
            run_id: self.run_id.unwrap_or_else(generate_run_id),
        };

        fs::create_dir_all(config.run_directory())?;
        for path in [
            config.sanitization_file_path(),
            config.notifications_file_path(),
            config.notifications_json_file_path(),
        ] {
            OpenOptions::new().create(true).append(true).open(&path)?;
        }

        log::info!(
            "Run {} writing to {} (reports in {})",
            config.run_id,
            config.bids_directory.display(),
            config.run_directory().display()
        );

        Ok(config)
    }
}

/// `~/.nwb2bids`, or a directory under the system temp dir when there is no home.
pub fn default_cache_directory() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CACHE_DIR_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join("nwb2bids"))
}

fn generate_run_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}",
        chrono::Local::now().format("date-%Y%m%d_time-%H%M%S"),
        &suffix[..8]
    )
}

/// Create, bootstrap, or validate the output directory.
fn prepare_bids_directory(path: &Path) -> Result<(), ConfigError> {
    if path.exists() && !path.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_path_buf()));
    }
    fs::create_dir_all(path)?;

    let description_path = path.join(DATASET_DESCRIPTION_FILE);
    if description_path.is_file() {
        let content = fs::read_to_string(&description_path)?;
        let description: serde_json::Value = serde_json::from_str(&content)?;
        if description.get("BIDSVersion").is_none() {
            return Err(ConfigError::MissingBidsVersion(path.to_path_buf()));
        }
        return Ok(());
    }

    if fs::read_dir(path)?.next().is_some() {
        return Err(ConfigError::NonBidsDirectory(path.to_path_buf()));
    }

    let minimal = serde_json::json!({ "BIDSVersion": BIDS_VERSION });
    fs::write(&description_path, serde_json::to_string_pretty(&minimal)?)?;
    log::debug!("Bootstrapped empty BIDS directory {}", path.display());
    Ok(())
}
