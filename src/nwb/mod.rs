//! # NWB Source Model
//!
//! The converter never touches HDF5 directly. A [`SourceReader`] turns a
//! [`SourceLocation`] into a [`SourceRecording`], a plain in-memory view of the
//! parts of an NWB file that end up in BIDS sidecars:
//!
//! - subject and session identifiers, institution, devices
//! - the extracellular electrode table and intracellular electrodes
//! - acquisition time series (rate, conversion, unit, electrode references)
//! - `TimeIntervals` tables (`trials`, `epochs`, and custom tables)
//!
//! [`InMemoryReader`] serves pre-built recordings and is what the tests use.
//! With the `hdf5` feature, `Hdf5NwbReader` reads real files.

mod error;
#[cfg(feature = "hdf5")]
mod hdf5_reader;
mod reader;
mod recording;


pub use error::SourceError;
#[cfg(feature = "hdf5")]
pub use hdf5_reader::Hdf5NwbReader;
pub use reader::{default_reader, InMemoryReader, SourceReader, UnavailableReader};
pub use recording::{
    Device, ElectrodeRow, IcephysElectrode, IntervalColumn, IntervalTable, SeriesKind,
    SourceLocation, SourceRecording, Subject, TimeSeriesInfo, NWB_EXTENSION,
};
