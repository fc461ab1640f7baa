use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::sidecar::{float_cell, ColumnDescription, SidecarSchema, TabularData, TabularSidecar};
use super::{single_recording, MetadataError};
use crate::notifications::{ids, CollectNotifications, Notification};
use crate::nwb::{IntervalTable, SourceRecording};

/// Synthesized column naming the table an event came from
pub const NWB_TABLE_COLUMN: &str = "nwb_table";

const START_TIME: &str = "start_time";
const STOP_TIME: &str = "stop_time";
const ONSET: &str = "onset";
const DURATION: &str = "duration";

/// One row of events.tsv
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Start in seconds
    pub onset: f64,
    /// Length in seconds; NaN when the source has no stop time
    pub duration: f64,
    /// Originating interval table
    pub nwb_table: String,
    /// Remaining source columns
    pub extra: Map<String, Value>,
}

impl EventRow {
    /// Sort order: onset ascending, then duration descending with unknown durations last.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        fn duration_key(duration: f64) -> f64 {
            if duration.is_nan() {
                f64::NEG_INFINITY
            } else {
                duration
            }
        }
        self.onset
            .total_cmp(&other.onset)
            .then_with(|| duration_key(other.duration).total_cmp(&duration_key(self.duration)))
    }
}

/// All interval tables of a session merged into one events table
#[derive(Debug, Clone, PartialEq)]
pub struct Events {
    /// Rows in sorted order
    pub rows: Vec<EventRow>,
    /// Source columns beyond onset/duration, in first-seen order
    pub extra_columns: Vec<String>,
    table_descriptions: Vec<(String, Option<String>)>,
    column_descriptions: BTreeMap<String, String>,
    overrides: BTreeMap<String, ColumnDescription>,
    notifications: Vec<Notification>,
}

impl Events {
    /// Collect custom interval tables, then `trials`, then `epochs`.
    pub fn from_source(recordings: &[Arc<SourceRecording>]) -> Result<Option<Self>, MetadataError> {
        let recording = single_recording(recordings)?;
        let tables: Vec<&IntervalTable> = recording
            .interval_tables
            .iter()
            .chain(recording.trials.iter())
            .chain(recording.epochs.iter())
            .collect();
        Self::from_tables(&tables, &recording.location.display_path())
    }

    /// Merge interval tables into sorted event rows.
    pub fn from_tables(
        tables: &[&IntervalTable],
        source: &Path,
    ) -> Result<Option<Self>, MetadataError> {
        if tables.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        for table in tables {
            if !seen.insert(table.name.as_str()) {
                return Err(MetadataError::DuplicateIntervalTable(table.name.clone()));
            }
        }
        if let Some(table) = tables
            .iter()
            .find(|t| t.colnames().any(|c| c == NWB_TABLE_COLUMN))
        {
            return Err(MetadataError::ReservedColumnName {
                table: table.name.clone(),
            });
        }

        let mut events = Self {
            rows: Vec::new(),
            extra_columns: Vec::new(),
            table_descriptions: Vec::new(),
            column_descriptions: BTreeMap::new(),
            overrides: BTreeMap::new(),
            notifications: Vec::new(),
        };

        for table in tables {
            events.append_table(table, source)?;
        }
        events.rows.sort_by(EventRow::sort_cmp);

        log::debug!(
            "Merged {} interval tables into {} events",
            tables.len(),
            events.rows.len()
        );
        Ok(Some(events))
    }

    fn append_table(&mut self, table: &IntervalTable, source: &Path) -> Result<(), MetadataError> {
        let description = table
            .description
            .clone()
            .filter(|d| !d.trim().is_empty());
        if description.is_none() {
            self.notifications.push(
                Notification::from_definition(
                    ids::MISSING_INTERVAL_TABLE_DESCRIPTION,
                    [source],
                    Vec::<PathBuf>::new(),
                )?
                .with_detail(format!("Table '{}' has no description.", table.name)),
            );
        }
        self.table_descriptions
            .push((table.name.clone(), description));

        let extra: Vec<_> = table
            .columns
            .iter()
            .filter(|c| ![START_TIME, STOP_TIME, ONSET, DURATION].contains(&c.name.as_str()))
            .collect();
        for column in &extra {
            if !self.extra_columns.contains(&column.name) {
                self.extra_columns.push(column.name.clone());
            }
            match column.description.as_deref().filter(|d| !d.trim().is_empty()) {
                Some(d) => {
                    self.column_descriptions
                        .entry(column.name.clone())
                        .or_insert_with(|| d.to_string());
                }
                None => self.notifications.push(
                    Notification::from_definition(
                        ids::MISSING_EVENT_COLUMN_DESCRIPTION,
                        [source],
                        Vec::<PathBuf>::new(),
                    )?
                    .with_field(column.name.clone())
                    .with_detail(format!(
                        "Column '{}' of table '{}' has no description.",
                        column.name, table.name
                    )),
                ),
            }
        }

        let cell_f64 = |name: &str, i: usize| {
            table
                .column(name)
                .and_then(|c| c.values.get(i))
                .and_then(Value::as_f64)
        };
        for i in 0..table.row_count() {
            let onset = cell_f64(START_TIME, i).unwrap_or(f64::NAN);
            let duration = cell_f64(STOP_TIME, i)
                .map(|stop| stop - onset)
                .unwrap_or(f64::NAN);
            self.rows.push(EventRow {
                onset,
                duration,
                nwb_table: table.name.clone(),
                extra: extra
                    .iter()
                    .map(|c| (c.name.clone(), c.values.get(i).cloned().unwrap_or(Value::Null)))
                    .collect(),
            });
        }
        Ok(())
    }

    /// Apply user-supplied column documentation.
    ///
    /// Columns that gain a description this way stop being reported as undocumented.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, ColumnDescription>) -> Self {
        self.overrides = overrides.clone();
        self.notifications.retain(|n| {
            let documented = n
                .field()
                .and_then(|field| overrides.get(field))
                .is_some_and(|d| d.description.is_some());
            !(n.identifier() == Some(ids::MISSING_EVENT_COLUMN_DESCRIPTION) && documented)
        });
        self
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no events
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the merged tables, in collection order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.table_descriptions.iter().map(|(name, _)| name.as_str())
    }
}

impl TabularSidecar for Events {
    fn tabular(&self) -> TabularData {
        let mut columns = vec![
            ONSET.to_string(),
            DURATION.to_string(),
            NWB_TABLE_COLUMN.to_string(),
        ];
        columns.extend(self.extra_columns.iter().cloned());

        let mut table = TabularData::new(columns);
        for row in &self.rows {
            let mut cells = vec![
                float_cell(Some(row.onset)),
                float_cell(Some(row.duration)),
                Value::String(row.nwb_table.clone()),
            ];
            cells.extend(
                self.extra_columns
                    .iter()
                    .map(|c| row.extra.get(c).cloned().unwrap_or(Value::Null)),
            );
            table.push_row(cells);
        }
        table
    }

    fn schema(&self) -> SidecarSchema {
        let mut tables = ColumnDescription::new("The NWB table the event was recorded in.")
            .with_long_name("Source NWB table");
        for (name, description) in &self.table_descriptions {
            tables = tables.with_level(name.clone(), description.clone().unwrap_or_default());
        }

        let mut schema = SidecarSchema::new()
            .with(
                ONSET,
                ColumnDescription::new("Onset of the event from the start of the acquisition.")
                    .with_units("s"),
            )
            .with(
                DURATION,
                ColumnDescription::new("Duration of the event.").with_units("s"),
            )
            .with(NWB_TABLE_COLUMN, tables);
        for column in &self.extra_columns {
            if let Some(description) = self.column_descriptions.get(column) {
                schema.insert(column.clone(), ColumnDescription::new(description.clone()));
            }
        }
        schema.merge_overrides(&self.overrides);
        schema
    }
}

impl CollectNotifications for Events {
    fn collect_notifications(&self) -> Vec<Notification> {
        self.notifications.clone()
    }
}
