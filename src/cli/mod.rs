use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use nwb2bids::config::{FileMode, RunConfig};
use nwb2bids::dataset::{ConversionStats, DatasetConverter};
use nwb2bids::metadata::Modality;
use nwb2bids::notifications::NotificationReport;
use nwb2bids::sanitization::SanitizationLevel;

mod config;
mod convert;
#[cfg(feature = "dandi")]
mod convert_dandiset;

pub use config::Config;

/// nwb2bids - Reorganize NWB files into a BIDS dataset
#[derive(Parser)]
#[command(name = "nwb2bids")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// How source files are placed in the BIDS tree.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FileModeArg {
    /// Symlink when the filesystem allows it, copy otherwise
    Auto,
    /// Duplicate the file
    Copy,
    /// Relocate the file
    Move,
    /// Link to the original
    Symlink,
}

impl From<FileModeArg> for FileMode {
    fn from(arg: FileModeArg) -> Self {
        match arg {
            FileModeArg::Auto => FileMode::Auto,
            FileModeArg::Copy => FileMode::Copy,
            FileModeArg::Move => FileMode::Move,
            FileModeArg::Symlink => FileMode::Symlink,
        }
    }
}

/// Identifier rewriting strength.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SanitizationArg {
    /// Keep labels as found
    None,
    /// Replace characters BIDS does not allow in labels
    Critical,
}

impl From<SanitizationArg> for SanitizationLevel {
    fn from(arg: SanitizationArg) -> Self {
        match arg {
            SanitizationArg::None => SanitizationLevel::None,
            SanitizationArg::Critical => SanitizationLevel::Critical,
        }
    }
}

/// Output modality when a source has no electrode data.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModalityArg {
    /// Extracellular electrophysiology
    Ecephys,
    /// Intracellular electrophysiology
    Icephys,
}

impl From<ModalityArg> for Modality {
    fn from(arg: ModalityArg) -> Self {
        match arg {
            ModalityArg::Ecephys => Modality::Ecephys,
            ModalityArg::Icephys => Modality::Icephys,
        }
    }
}

/// Options shared by every conversion command
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Output BIDS directory (created if missing)
    #[arg(short = 'o', long, value_name = "DIR")]
    bids_directory: PathBuf,

    /// How source files are placed in the BIDS tree
    #[arg(long, value_enum)]
    file_mode: Option<FileModeArg>,

    /// JSON file with dataset description and events column documentation
    #[arg(long, value_name = "FILE")]
    additional_metadata_file_path: Option<PathBuf>,

    /// Identifier rewriting strength
    #[arg(long, value_enum)]
    sanitization_level: Option<SanitizationArg>,

    /// Modality directory used when a source has no electrodes
    #[arg(long, value_enum)]
    default_modality: Option<ModalityArg>,

    /// Where run reports are written (default: ~/.nwb2bids)
    #[arg(long, value_name = "DIR")]
    cache_directory: Option<PathBuf>,

    /// Suppress the console report; report files are still written
    #[arg(short, long)]
    silent: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl RunArgs {
    /// Merge flags over the config file into a validated run configuration.
    fn resolve(&self) -> Result<(RunConfig, bool)> {
        let file = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let settings = file.conversion;

        let mut builder = RunConfig::builder(&self.bids_directory);
        if let Some(mode) = self.file_mode.map(FileMode::from).or(settings.file_mode) {
            builder = builder.file_mode(mode);
        }
        if let Some(level) = self
            .sanitization_level
            .map(SanitizationLevel::from)
            .or(settings.sanitization_level)
        {
            builder = builder.sanitization_level(level);
        }
        if let Some(modality) = self
            .default_modality
            .map(Modality::from)
            .or(settings.default_modality)
        {
            builder = builder.default_modality(modality);
        }
        if let Some(dir) = self.cache_directory.clone().or(settings.cache_directory) {
            builder = builder.cache_directory(dir);
        }
        if let Some(path) = &self.additional_metadata_file_path {
            builder = builder.additional_metadata_file_path(path);
        }

        let config = builder
            .build()
            .context("Failed to prepare the BIDS directory")?;
        let silent = self.silent || settings.silent.unwrap_or(false);
        Ok((config, silent))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert local NWB files (or directories of them) to BIDS
    Convert {
        /// NWB files and/or directories searched recursively
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Convert the NWB assets of a DANDI dataset to BIDS
    #[cfg(feature = "dandi")]
    ConvertDandiset {
        /// Dandiset identifier, e.g. 000003
        #[arg(value_name = "DANDISET_ID")]
        dandiset_id: String,

        /// Dandiset version
        #[arg(long, default_value = nwb2bids::remote::DEFAULT_VERSION)]
        version: String,

        /// DANDI API root
        #[arg(long, default_value = nwb2bids::remote::DANDI_API_URL)]
        api_url: String,

        #[command(flatten)]
        run: RunArgs,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert { paths, run } => convert::run(paths, run),
        #[cfg(feature = "dandi")]
        Commands::ConvertDandiset {
            dandiset_id,
            version,
            api_url,
            run,
        } => convert_dandiset::run(dandiset_id, version, api_url, run),
    }
}

/// Extract, convert, and report; shared by every conversion command.
fn finish(mut converter: DatasetConverter, config: &RunConfig, silent: bool) -> Result<ConversionStats> {
    converter.extract_metadata();
    let stats = converter.convert_to_bids_dataset();

    let report = NotificationReport::new(converter.notifications());
    report
        .write_files(
            &config.notifications_file_path(),
            &config.notifications_json_file_path(),
        )
        .context("Failed to write the notification report")?;

    if !silent {
        println!("{}", report.format_colored());
        println!("{}", stats);
        println!(
            "Full report: {}",
            config.notifications_file_path().display()
        );
    }
    Ok(stats)
}
