//! Tabular (TSV) and JSON sidecar primitives shared by every entity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use super::MetadataError;

/// Placeholder for missing values in TSV files
pub const NA: &str = "n/a";

/// Documentation of one TSV column, as written to the JSON sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDescription {
    /// Human-readable column name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    /// What the column holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Meaning of each categorical value
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub levels: Map<String, Value>,
    /// Measurement unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl ColumnDescription {
    /// Description-only entry
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Set the long name
    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    /// Set the unit
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Add a categorical level
    pub fn with_level(mut self, level: impl Into<String>, meaning: impl Into<String>) -> Self {
        self.levels.insert(level.into(), Value::String(meaning.into()));
        self
    }

    /// Overlay the populated fields of `other`; levels are merged key by key.
    pub fn merge(&mut self, other: &ColumnDescription) {
        if other.long_name.is_some() {
            self.long_name.clone_from(&other.long_name);
        }
        if other.description.is_some() {
            self.description.clone_from(&other.description);
        }
        if other.units.is_some() {
            self.units.clone_from(&other.units);
        }
        for (level, meaning) in &other.levels {
            self.levels.insert(level.clone(), meaning.clone());
        }
    }
}

/// Ordered column documentation for one JSON sidecar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidecarSchema {
    entries: Vec<(String, ColumnDescription)>,
}

impl SidecarSchema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a column's documentation
    pub fn insert(&mut self, column: impl Into<String>, description: ColumnDescription) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = description,
            None => self.entries.push((column, description)),
        }
    }

    /// Builder form of [`SidecarSchema::insert`]
    pub fn with(mut self, column: impl Into<String>, description: ColumnDescription) -> Self {
        self.insert(column, description);
        self
    }

    /// Look up a column
    pub fn get(&self, column: &str) -> Option<&ColumnDescription> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, d)| d)
    }

    /// Merge `overrides` into existing entries, adding new ones at the end.
    pub fn merge_overrides<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a ColumnDescription)>,
    ) {
        for (column, description) in overrides {
            match self.entries.iter_mut().find(|(name, _)| name == column) {
                Some((_, existing)) => existing.merge(description),
                None => self.entries.push((column.clone(), description.clone())),
            }
        }
    }

    /// Keep only the columns present in `columns`.
    pub fn restricted_to(&self, columns: &[String]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(name, _)| columns.contains(name))
                .cloned()
                .collect(),
        }
    }

    /// Documented column names, in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// JSON object keyed by column name
    pub fn to_json(&self) -> Result<Value, MetadataError> {
        let mut object = Map::new();
        for (name, description) in &self.entries {
            object.insert(name.clone(), serde_json::to_value(description)?);
        }
        Ok(Value::Object(object))
    }

    /// Write the schema as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<(), MetadataError> {
        fs::write(path, serde_json::to_string_pretty(&self.to_json()?)?)?;
        Ok(())
    }
}

/// A table with named columns and JSON-valued cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularData {
    /// Header row
    pub columns: Vec<String>,
    /// Data rows, each as long as `columns`
    pub rows: Vec<Vec<Value>>,
}

impl TabularData {
    /// Empty table with the given header
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from flat records.
    ///
    /// Column order: every `required` column, then each `preferred` column that
    /// some record populates, then all other populated keys in first-seen order.
    pub fn from_records(records: &[Map<String, Value>], required: &[&str], preferred: &[&str]) -> Self {
        let populated = |key: &str| {
            records
                .iter()
                .any(|r| r.get(key).is_some_and(|v| !v.is_null()))
        };

        let mut columns: Vec<String> = required.iter().map(|c| c.to_string()).collect();
        for column in preferred {
            if !columns.iter().any(|c| c == column) && populated(column) {
                columns.push(column.to_string());
            }
        }
        for record in records {
            for (key, value) in record {
                if !value.is_null() && !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Append a row, padding or truncating it to the header length
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Write as a tab-separated file with a header row
    pub fn write_tsv(&self, path: &Path) -> Result<(), MetadataError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(format_cell))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a tab-separated file; every cell becomes a string, `n/a` becomes null.
    pub fn read_tsv(path: &Path) -> Result<Self, MetadataError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(true)
            .from_path(path)?;
        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Self {
            columns,
            rows: Vec::new(),
        };
        for record in reader.records() {
            let record = record?;
            table.push_row(
                record
                    .iter()
                    .map(|cell| match cell {
                        NA => Value::Null,
                        other => Value::String(other.to_string()),
                    })
                    .collect(),
            );
        }
        Ok(table)
    }
}

/// Render one cell for TSV output.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => NA.to_string(),
        Value::String(s) if s.trim().is_empty() => NA.to_string(),
        Value::String(s) => s.replace(['\t', '\n', '\r'], " "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string().replace(['\t', '\n', '\r'], " "),
    }
}

/// JSON value for an optional float; NaN and infinities become null.
pub fn float_cell(value: Option<f64>) -> Value {
    value
        .filter(|v| v.is_finite())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

/// JSON value for an optional string; empty strings become null.
pub fn text_cell(value: Option<&str>) -> Value {
    value
        .filter(|s| !s.trim().is_empty())
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null)
}

/// Anything that serializes to a TSV + JSON sidecar pair.
pub trait TabularSidecar {
    /// Table contents
    fn tabular(&self) -> TabularData;

    /// Column documentation
    fn schema(&self) -> SidecarSchema;

    /// Write `<stem>.tsv` and `<stem>.json`; undocumented columns are left out of the JSON.
    fn write_pair(&self, tsv_path: &Path, json_path: &Path) -> Result<(), MetadataError> {
        let table = self.tabular();
        table.write_tsv(tsv_path)?;
        self.schema().restricted_to(&table.columns).write(json_path)
    }
}
