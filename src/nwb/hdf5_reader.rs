//! HDF5-backed NWB reader.
//!
//! Reads only the metadata the converter needs; bulk data arrays are never
//! loaded except for the small electrode-reference and timestamp vectors.

use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File as H5File, Group};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{
    Device, ElectrodeRow, IcephysElectrode, IntervalColumn, IntervalTable, SeriesKind,
    SourceError, SourceLocation, SourceReader, SourceRecording, Subject, TimeSeriesInfo,
};

const ELECTRODE_TABLE_PATH: &str = "/general/extracellular_ephys/electrodes";
const ICEPHYS_PATH: &str = "/general/intracellular_ephys";

/// Reads NWB 2.x files with libhdf5.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5NwbReader;

impl Hdf5NwbReader {
    /// Create a reader
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path) -> Result<H5File, SourceError> {
        if !path.is_file() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let file = H5File::open(path).map_err(|e| invalid(path, e))?;
        match file.attr("nwb_version").and_then(|a| read_attr_string(&a)) {
            Ok(version) => log::debug!("{}: NWB version {}", path.display(), version),
            Err(_) => log::warn!("{} has no nwb_version attribute", path.display()),
        }
        Ok(file)
    }

    fn local_path(location: &SourceLocation) -> Result<&Path, SourceError> {
        location.local_path().ok_or_else(|| {
            SourceError::UnsupportedLocation(format!(
                "{} must be downloaded before it can be read",
                location
            ))
        })
    }
}

impl SourceReader for Hdf5NwbReader {
    fn read(&self, location: &SourceLocation) -> Result<SourceRecording, SourceError> {
        let path = Self::local_path(location)?;
        let file = Self::open(path)?;

        let mut recording = SourceRecording::new(location.clone());
        recording.identifier = read_string_dataset(&file, "identifier");
        recording.session_description = read_string_dataset(&file, "session_description");
        recording.session_start_time = read_string_dataset(&file, "session_start_time");
        recording.session_id = read_string_dataset(&file, "general/session_id");
        recording.institution = read_string_dataset(&file, "general/institution");
        recording.subject = read_subject(&file);
        recording.devices = read_devices(&file);
        recording.electrodes = read_electrode_table(&file, &recording.devices)
            .map_err(|e| invalid(path, e))?;
        recording.icephys_electrodes = read_icephys_electrodes(&file);

        let electrode_ids: Vec<i64> = recording
            .electrodes
            .as_ref()
            .map(|rows| rows.iter().map(|r| r.id).collect())
            .unwrap_or_default();
        let icephys_names: Vec<String> = recording
            .icephys_electrodes
            .iter()
            .map(|e| e.name.clone())
            .collect();

        if let Ok(acquisition) = file.group("acquisition") {
            for name in acquisition.member_names().map_err(|e| invalid(path, e))? {
                let Ok(group) = acquisition.group(&name) else {
                    continue;
                };
                let neurodata_type = neurodata_type(&group);
                if neurodata_type == "TimeIntervals" {
                    recording.interval_tables.push(read_interval_table(&name, &group));
                } else if let Some(series) =
                    read_time_series(&name, &group, &neurodata_type, &electrode_ids, &icephys_names)
                {
                    recording.time_series.push(series);
                }
            }
        }

        if let Ok(intervals) = file.group("intervals") {
            for name in intervals.member_names().map_err(|e| invalid(path, e))? {
                let Ok(group) = intervals.group(&name) else {
                    continue;
                };
                let table = read_interval_table(&name, &group);
                match name.as_str() {
                    "trials" => recording.trials = Some(table),
                    "epochs" => recording.epochs = Some(table),
                    _ => recording.interval_tables.push(table),
                }
            }
        }

        log::debug!(
            "Read {}: session {:?}, {} devices, {} series, {} interval tables",
            path.display(),
            recording.session_id,
            recording.devices.len(),
            recording.time_series.len(),
            recording.interval_tables.len()
        );
        Ok(recording)
    }

    fn read_session_id(&self, location: &SourceLocation) -> Result<Option<String>, SourceError> {
        let path = Self::local_path(location)?;
        let file = Self::open(path)?;
        Ok(read_string_dataset(&file, "general/session_id"))
    }
}

fn invalid(path: &Path, error: impl std::fmt::Display) -> SourceError {
    SourceError::InvalidFile {
        path: PathBuf::from(path),
        message: error.to_string(),
    }
}

fn read_attr_string(attr: &hdf5::Attribute) -> hdf5::Result<String> {
    attr.read_scalar::<VarLenUnicode>()
        .map(|s| s.to_string())
        .or_else(|_| attr.read_scalar::<VarLenAscii>().map(|s| s.to_string()))
}

fn string_attr(group: &Group, name: &str) -> Option<String> {
    group.attr(name).and_then(|a| read_attr_string(&a)).ok()
}

fn neurodata_type(group: &Group) -> String {
    string_attr(group, "neurodata_type").unwrap_or_default()
}

fn read_string_dataset(group: &Group, name: &str) -> Option<String> {
    let dataset = group.dataset(name).ok()?;
    dataset
        .read_scalar::<VarLenUnicode>()
        .map(|s| s.to_string())
        .or_else(|_| dataset.read_scalar::<VarLenAscii>().map(|s| s.to_string()))
        .ok()
        .filter(|s| !s.is_empty())
}

fn read_f64_dataset(group: &Group, name: &str) -> Option<Vec<f64>> {
    group.dataset(name).ok()?.read_raw::<f64>().ok()
}

fn read_string_column(dataset: &Dataset) -> Option<Vec<String>> {
    dataset
        .read_raw::<VarLenUnicode>()
        .map(|v| v.into_iter().map(|s| s.to_string()).collect())
        .or_else(|_| {
            dataset
                .read_raw::<VarLenAscii>()
                .map(|v| v.into_iter().map(|s| s.to_string()).collect())
        })
        .ok()
}

/// Read any scalar-per-row column into JSON values.
fn read_column_values(dataset: &Dataset) -> Option<Vec<Value>> {
    let descriptor = dataset.dtype().ok()?.to_descriptor().ok()?;
    match descriptor {
        TypeDescriptor::Float(_) => dataset
            .read_raw::<f64>()
            .ok()
            .map(|v| v.into_iter().map(float_value).collect()),
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => dataset
            .read_raw::<i64>()
            .ok()
            .map(|v| v.into_iter().map(Value::from).collect()),
        TypeDescriptor::Boolean => dataset
            .read_raw::<bool>()
            .ok()
            .map(|v| v.into_iter().map(Value::from).collect()),
        TypeDescriptor::VarLenUnicode | TypeDescriptor::VarLenAscii => {
            read_string_column(dataset).map(|v| v.into_iter().map(Value::from).collect())
        }
        _ => None,
    }
}

fn float_value(value: f64) -> Value {
    if value.is_finite() {
        Value::from(value)
    } else {
        Value::Null
    }
}

fn read_subject(file: &H5File) -> Option<Subject> {
    let group = file.group("general/subject").ok()?;
    Some(Subject {
        subject_id: read_string_dataset(&group, "subject_id"),
        species: read_string_dataset(&group, "species"),
        strain: read_string_dataset(&group, "strain"),
        sex: read_string_dataset(&group, "sex"),
        date_of_birth: read_string_dataset(&group, "date_of_birth"),
        age: read_string_dataset(&group, "age"),
    })
}

fn read_devices(file: &H5File) -> Vec<Device> {
    let Ok(devices) = file.group("general/devices") else {
        return Vec::new();
    };
    let names = devices.member_names().unwrap_or_default();
    names
        .into_iter()
        .filter_map(|name| {
            let group = devices.group(&name).ok()?;
            Some(Device {
                description: string_attr(&group, "description"),
                manufacturer: string_attr(&group, "manufacturer"),
                name,
            })
        })
        .collect()
}

fn read_electrode_table(
    file: &H5File,
    devices: &[Device],
) -> hdf5::Result<Option<Vec<ElectrodeRow>>> {
    let Ok(table) = file.group(ELECTRODE_TABLE_PATH) else {
        return Ok(None);
    };
    let ids: Vec<i64> = table.dataset("id")?.read_raw()?;

    let floats = |name: &str| read_f64_dataset(&table, name);
    let strings = |name: &str| table.dataset(name).ok().and_then(|d| read_string_column(&d));

    let x = floats("x");
    let y = floats("y");
    let z = floats("z");
    let imp = floats("imp");
    let shift = floats("inter_sample_shift");
    let location = strings("location");
    let filtering = strings("filtering");
    let channel_name = strings("channel_name");
    let contact_ids = strings("contact_ids");
    let group_name = strings("group_name");

    // Electrode groups link to their device; the link target name is not
    // recoverable through the high-level API, so only single-device files
    // get a device assignment.
    let single_device = match devices {
        [device] => Some(device.name.clone()),
        _ => None,
    };

    let known: &[&str] = &[
        "id", "x", "y", "z", "imp", "inter_sample_shift", "location", "filtering",
        "channel_name", "contact_ids", "group_name", "group",
    ];
    let extra_columns: Vec<(String, Vec<Value>)> = table
        .member_names()?
        .into_iter()
        .filter(|name| !known.contains(&name.as_str()) && !name.ends_with("_index"))
        .filter_map(|name| {
            let values = read_column_values(&table.dataset(&name).ok()?)?;
            Some((name, values))
        })
        .collect();

    let pick_f64 = |column: &Option<Vec<f64>>, i: usize| {
        column
            .as_ref()
            .and_then(|v| v.get(i).copied())
            .filter(|v| v.is_finite())
    };
    let pick_str = |column: &Option<Vec<String>>, i: usize| {
        column
            .as_ref()
            .and_then(|v| v.get(i).cloned())
            .filter(|s| !s.is_empty())
    };

    let rows = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| ElectrodeRow {
            id,
            x: pick_f64(&x, i),
            y: pick_f64(&y, i),
            z: pick_f64(&z, i),
            location: pick_str(&location, i),
            imp: pick_f64(&imp, i),
            filtering: pick_str(&filtering, i),
            channel_name: pick_str(&channel_name, i),
            contact_ids: pick_str(&contact_ids, i),
            inter_sample_shift: pick_f64(&shift, i),
            group_name: pick_str(&group_name, i),
            device_name: single_device.clone(),
            extra: extra_columns
                .iter()
                .filter_map(|(name, values)| Some((name.clone(), values.get(i)?.clone())))
                .collect(),
        })
        .collect();
    Ok(Some(rows))
}

fn read_icephys_electrodes(file: &H5File) -> Vec<IcephysElectrode> {
    let Ok(icephys) = file.group(ICEPHYS_PATH) else {
        return Vec::new();
    };
    let device_names: Vec<String> = read_devices(file).into_iter().map(|d| d.name).collect();
    let device_name = match device_names.as_slice() {
        [name] => Some(name.clone()),
        _ => None,
    };

    icephys
        .member_names()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|name| {
            let group = icephys.group(&name).ok()?;
            if neurodata_type(&group) != "IntracellularElectrode" {
                return None;
            }
            Some(IcephysElectrode {
                description: string_attr(&group, "description")
                    .or_else(|| read_string_dataset(&group, "description")),
                device_name: device_name.clone(),
                filtering: read_string_dataset(&group, "filtering"),
                location: read_string_dataset(&group, "location"),
                cell_id: read_string_dataset(&group, "cell_id"),
                name,
            })
        })
        .collect()
}

fn read_time_series(
    name: &str,
    group: &Group,
    neurodata_type: &str,
    electrode_ids: &[i64],
    icephys_names: &[String],
) -> Option<TimeSeriesInfo> {
    let data = group.dataset("data").ok()?;

    let kind = if neurodata_type.contains("ElectricalSeries") {
        let indices: Vec<i64> = group
            .dataset("electrodes")
            .and_then(|d| d.read_raw())
            .unwrap_or_default();
        let electrodes = indices
            .into_iter()
            .filter_map(|i| usize::try_from(i).ok())
            .filter_map(|i| electrode_ids.get(i).copied())
            .collect();
        SeriesKind::Electrical { electrodes }
    } else if neurodata_type.contains("Clamp") {
        // Same link limitation as electrode groups.
        let electrode = match icephys_names {
            [name] => name.clone(),
            _ => String::new(),
        };
        SeriesKind::PatchClamp { electrode }
    } else {
        SeriesKind::Other
    };

    let rate = group
        .dataset("starting_time")
        .and_then(|d| d.attr("rate"))
        .and_then(|a| a.read_scalar::<f64>())
        .ok();
    let timestamps = if rate.is_none() {
        read_f64_dataset(group, "timestamps")
    } else {
        None
    };

    Some(TimeSeriesInfo {
        name: name.to_string(),
        kind,
        rate,
        conversion: data
            .attr("conversion")
            .and_then(|a| a.read_scalar::<f64>())
            .unwrap_or(1.0),
        unit: data.attr("unit").and_then(|a| read_attr_string(&a)).ok(),
        timestamps,
    })
}

fn read_interval_table(name: &str, group: &Group) -> IntervalTable {
    let mut table = IntervalTable::new(name);
    table.description = string_attr(group, "description");

    let colnames: Vec<String> = group
        .attr("colnames")
        .and_then(|a| {
            a.read_raw::<VarLenUnicode>()
                .map(|v| v.into_iter().map(|s| s.to_string()).collect())
                .or_else(|_| {
                    a.read_raw::<VarLenAscii>()
                        .map(|v| v.into_iter().map(|s| s.to_string()).collect())
                })
        })
        .unwrap_or_else(|_| {
            group
                .member_names()
                .unwrap_or_default()
                .into_iter()
                .filter(|n| n != "id" && !n.ends_with("_index"))
                .collect()
        });

    for column_name in colnames {
        if group.link_exists(&format!("{}_index", column_name)) {
            log::debug!("Skipping ragged column {}/{}", name, column_name);
            continue;
        }
        let Ok(dataset) = group.dataset(&column_name) else {
            continue;
        };
        let Some(values) = read_column_values(&dataset) else {
            log::debug!("Skipping unsupported column {}/{}", name, column_name);
            continue;
        };
        let mut column = IntervalColumn::new(column_name, values);
        column.description = dataset.attr("description").and_then(|a| read_attr_string(&a)).ok();
        table.columns.push(column);
    }
    table
}
