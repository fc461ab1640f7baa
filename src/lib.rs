//! # nwb2bids - NWB to BIDS Reorganization
//!
//! `nwb2bids` takes neurophysiology recordings stored as NWB files and lays them
//! out as a BIDS dataset: the data files are copied, moved, or symlinked into a
//! `sub-<P>/ses-<S>/<modality>/` tree, and the metadata inside them is
//! extracted into the TSV + JSON sidecars BIDS expects.
//!
//! ## Key Features
//!
//! - **Entity extraction**: participants, probes, channels, electrodes, and
//!   events (all `TimeIntervals` tables merged and sorted) are read from each
//!   file and validated on construction.
//!
//! - **Notifications instead of aborts**: problems in the source metadata
//!   become structured [`Notification`](notifications::Notification)s with a
//!   severity, a reason, and a suggested fix. Conversion carries on and writes
//!   best-effort output.
//!
//! - **Run-scoped state**: label sanitization, source reads, and the symlink
//!   capability probe are cached per run in a [`RunContext`](context::RunContext).
//!
//! - **Remote datasets**: with the `dandi` feature, sessions can come straight
//!   from the DANDI archive.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nwb2bids::prelude::*;
//!
//! let config = RunConfig::builder("bids_dataset")
//!     .file_mode(FileMode::Symlink)
//!     .sanitization_level(SanitizationLevel::Critical)
//!     .build()?;
//! let context = RunContext::new(config.clone(), default_reader()).shared();
//!
//! let mut converter = DatasetConverter::from_nwb_paths(&["recordings/"], context)?;
//! converter.extract_metadata();
//! let stats = converter.convert_to_bids_dataset();
//!
//! let report = NotificationReport::new(converter.notifications());
//! report.write_files(
//!     &config.notifications_file_path(),
//!     &config.notifications_json_file_path(),
//! )?;
//! println!("{}\n{}", report, stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This creates:
//! ```text
//! bids_dataset/
//! ├── dataset_description.json
//! ├── participants.tsv / participants.json
//! └── sub-123/
//!     ├── sub-123_sessions.tsv / sub-123_sessions.json
//!     └── ses-456/ecephys/
//!         ├── sub-123_ses-456_ecephys.nwb
//!         ├── sub-123_ses-456_probes.tsv / .json
//!         ├── sub-123_ses-456_channels.tsv / .json
//!         ├── sub-123_ses-456_electrodes.tsv / .json
//!         └── sub-123_ses-456_events.tsv / .json
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `colorized_output` | yes | Colored console report |
//! | `dandi` | yes | DANDI REST client (`remote::DandiApiClient`) |
//! | `hdf5` | no | `nwb::Hdf5NwbReader`, needs a native HDF5 library |

// Documentation lints
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod context;
pub mod dataset;
pub mod metadata;
pub mod notifications;
pub mod nwb;
pub mod remote;
pub mod sanitization;
pub mod session;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{ConfigError, FileMode, RunConfig};
    pub use crate::context::RunContext;
    pub use crate::dataset::{ConversionError, ConversionStats, DatasetConverter};
    pub use crate::metadata::{
        AdditionalMetadata, DatasetDescription, Events, MetadataError, Modality, Participant,
        SessionMetadata, TabularSidecar,
    };
    pub use crate::notifications::{
        CollectNotifications, Notification, NotificationReport, Severity,
    };
    pub use crate::nwb::{default_reader, InMemoryReader, SourceLocation, SourceReader, SourceRecording};
    pub use crate::remote::{ArchiveClient, RemoteAsset, RemoteError};
    pub use crate::sanitization::{sanitize, SanitizationLevel};
    pub use crate::session::{SessionConverter, SessionOutcome};
}
