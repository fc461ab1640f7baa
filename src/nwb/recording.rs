use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// File extension of NWB sources
pub const NWB_EXTENSION: &str = "nwb";

/// Where a recording lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceLocation {
    /// A file on the local filesystem
    Local(PathBuf),
    /// An asset of a remote archive, fetched on demand
    Remote {
        /// Archive-side asset identifier
        asset_id: String,
        /// Path of the asset inside its dataset
        path: String,
        /// Download URL
        url: String,
    },
}

impl SourceLocation {
    /// Path used when pointing notifications and logs at this source.
    pub fn display_path(&self) -> PathBuf {
        match self {
            SourceLocation::Local(path) => path.clone(),
            SourceLocation::Remote { path, .. } => PathBuf::from(path),
        }
    }

    /// Extension of the underlying file, `nwb` when it has none.
    pub fn extension(&self) -> String {
        let path = self.display_path();
        path.extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| NWB_EXTENSION.to_string())
    }

    /// Local filesystem path, if any
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            SourceLocation::Local(path) => Some(path),
            SourceLocation::Remote { .. } => None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Local(path) => write!(f, "{}", path.display()),
            SourceLocation::Remote { path, asset_id, .. } => {
                write!(f, "{} (asset {})", path, asset_id)
            }
        }
    }
}

impl From<PathBuf> for SourceLocation {
    fn from(path: PathBuf) -> Self {
        SourceLocation::Local(path)
    }
}

impl From<&Path> for SourceLocation {
    fn from(path: &Path) -> Self {
        SourceLocation::Local(path.to_path_buf())
    }
}

/// Subject block of an NWB file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject identifier
    pub subject_id: Option<String>,
    /// Species, ideally a Latin binomial or taxonomy URL
    pub species: Option<String>,
    /// Strain
    pub strain: Option<String>,
    /// Sex as written by the experimenter
    pub sex: Option<String>,
    /// Date of birth (ISO 8601)
    pub date_of_birth: Option<String>,
    /// Age (ISO 8601 duration)
    pub age: Option<String>,
}

/// Acquisition device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Manufacturer
    pub manufacturer: Option<String>,
}

impl Device {
    /// Device with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One row of the extracellular electrode table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeRow {
    /// Row identifier
    pub id: i64,
    /// Coordinates in micrometers
    pub x: Option<f64>,
    /// Coordinates in micrometers
    pub y: Option<f64>,
    /// Coordinates in micrometers
    pub z: Option<f64>,
    /// Brain region
    pub location: Option<String>,
    /// Impedance in ohms
    pub imp: Option<f64>,
    /// Hardware filtering
    pub filtering: Option<String>,
    /// Name of the channel recording from this electrode
    pub channel_name: Option<String>,
    /// Probe contact identifiers
    pub contact_ids: Option<String>,
    /// Sampling time shift in seconds
    pub inter_sample_shift: Option<f64>,
    /// Electrode group
    pub group_name: Option<String>,
    /// Device owning the electrode group
    pub device_name: Option<String>,
    /// Custom columns
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ElectrodeRow {
    /// Row with only an identifier
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// Intracellular (patch-clamp) electrode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IcephysElectrode {
    /// Electrode name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Device the electrode is attached to
    pub device_name: Option<String>,
    /// Hardware filtering
    pub filtering: Option<String>,
    /// Brain region
    pub location: Option<String>,
    /// Cell identifier
    pub cell_id: Option<String>,
}

/// Kind of time series found in acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeriesKind {
    /// Extracellular voltage; references electrode table ids
    Electrical {
        /// Referenced electrode ids, one per channel
        electrodes: Vec<i64>,
    },
    /// Patch-clamp recording from one intracellular electrode
    PatchClamp {
        /// Electrode name
        electrode: String,
    },
    /// Anything else
    Other,
}

/// Summary of an acquisition time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesInfo {
    /// Series name
    pub name: String,
    /// Series kind
    pub kind: SeriesKind,
    /// Sampling rate in Hz, when regularly sampled
    pub rate: Option<f64>,
    /// Multiplier from stored values to `unit`
    pub conversion: f64,
    /// Physical unit
    pub unit: Option<String>,
    /// Explicit timestamps, when irregularly sampled
    pub timestamps: Option<Vec<f64>>,
}

impl TimeSeriesInfo {
    /// Series of the given kind with unit conversion 1.0
    pub fn new(name: impl Into<String>, kind: SeriesKind) -> Self {
        Self {
            name: name.into(),
            kind,
            rate: None,
            conversion: 1.0,
            unit: None,
            timestamps: None,
        }
    }

    /// Sampling frequency, derived from timestamps when no rate is stored.
    pub fn sampling_frequency(&self) -> Option<f64> {
        if let Some(rate) = self.rate {
            return Some(rate);
        }
        let timestamps = self.timestamps.as_ref()?;
        if timestamps.len() < 2 {
            return None;
        }
        let step = timestamps[1] - timestamps[0];
        (step > 0.0).then(|| 1.0 / step)
    }
}

/// Column of an interval table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalColumn {
    /// Column name
    pub name: String,
    /// Column description
    pub description: Option<String>,
    /// Cell values, one per row
    pub values: Vec<Value>,
}

impl IntervalColumn {
    /// Column without description
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values,
        }
    }

    /// Numeric column
    pub fn from_f64(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|v| Value::from(*v)).collect())
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A `TimeIntervals` table (trials, epochs, or a custom table)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalTable {
    /// Table name
    pub name: String,
    /// Table description
    pub description: Option<String>,
    /// Columns in file order
    pub columns: Vec<IntervalColumn>,
}

impl IntervalTable {
    /// Empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a column
    pub fn with_column(mut self, column: IntervalColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Column names in file order
    pub fn colnames(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&IntervalColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows (the longest column)
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }
}

/// In-memory view of one NWB file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecording {
    /// Where the file lives
    pub location: SourceLocation,
    /// NWB file identifier
    pub identifier: Option<String>,
    /// Session identifier
    pub session_id: Option<String>,
    /// Session description
    pub session_description: Option<String>,
    /// Session start (ISO 8601)
    pub session_start_time: Option<String>,
    /// Institution
    pub institution: Option<String>,
    /// Subject block
    pub subject: Option<Subject>,
    /// Devices
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Extracellular electrode table; `None` when the file has none
    pub electrodes: Option<Vec<ElectrodeRow>>,
    /// Intracellular electrodes
    #[serde(default)]
    pub icephys_electrodes: Vec<IcephysElectrode>,
    /// Acquisition time series
    #[serde(default)]
    pub time_series: Vec<TimeSeriesInfo>,
    /// Custom interval tables
    #[serde(default)]
    pub interval_tables: Vec<IntervalTable>,
    /// Canonical trials table
    pub trials: Option<IntervalTable>,
    /// Canonical epochs table
    pub epochs: Option<IntervalTable>,
}

impl SourceRecording {
    /// Empty recording at `location`
    pub fn new(location: impl Into<SourceLocation>) -> Self {
        Self {
            location: location.into(),
            identifier: None,
            session_id: None,
            session_description: None,
            session_start_time: None,
            institution: None,
            subject: None,
            devices: Vec::new(),
            electrodes: None,
            icephys_electrodes: Vec::new(),
            time_series: Vec::new(),
            interval_tables: Vec::new(),
            trials: None,
            epochs: None,
        }
    }

    /// True when the electrode table exists and has rows
    pub fn has_ecephys(&self) -> bool {
        self.electrodes.as_ref().is_some_and(|rows| !rows.is_empty())
    }

    /// True when any intracellular electrode exists
    pub fn has_icephys(&self) -> bool {
        !self.icephys_electrodes.is_empty()
    }

    /// Look up a device by name
    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Extracellular series, in acquisition order
    pub fn electrical_series(&self) -> impl Iterator<Item = &TimeSeriesInfo> {
        self.time_series
            .iter()
            .filter(|s| matches!(s.kind, SeriesKind::Electrical { .. }))
    }

    /// Patch-clamp series, in acquisition order
    pub fn patch_clamp_series(&self) -> impl Iterator<Item = &TimeSeriesInfo> {
        self.time_series
            .iter()
            .filter(|s| matches!(s.kind, SeriesKind::PatchClamp { .. }))
    }
}
