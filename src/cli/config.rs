//! TOML configuration file support.
//!
//! Settings that would otherwise be repeated on every invocation can live in a
//! config file; flags given on the command line take precedence:
//!
//! ```toml
//! # nwb2bids.toml
//! [conversion]
//! file_mode = "symlink"
//! sanitization_level = "critical"
//! default_modality = "ecephys"
//! cache_directory = "/scratch/nwb2bids"
//! silent = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use nwb2bids::config::FileMode;
use nwb2bids::metadata::Modality;
use nwb2bids::sanitization::SanitizationLevel;

/// Root configuration structure for nwb2bids.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Conversion-specific settings.
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// Configuration for the conversion commands.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// How source files are placed in the BIDS tree.
    pub file_mode: Option<FileMode>,

    /// Identifier rewriting strength.
    pub sanitization_level: Option<SanitizationLevel>,

    /// Modality directory used when a source has no electrodes.
    pub default_modality: Option<Modality>,

    /// Where run reports are written.
    pub cache_directory: Option<PathBuf>,

    /// Suppress the console report.
    pub silent: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
