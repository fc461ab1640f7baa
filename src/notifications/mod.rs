//! # Notifications
//!
//! Conversion never stops at the first imperfection in the source metadata.
//! Instead every detected issue becomes an immutable [`Notification`], built
//! from a static [`catalog`] entry and attached to the source and target paths
//! it concerns.
//!
//! Every entity, table, and converter implements [`CollectNotifications`];
//! the dataset converter gathers them by walking that tree and orders the
//! result with [`sort_notifications`] so the most structurally severe issues
//! come first.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

pub mod catalog;
mod error;
mod report;


pub use catalog::{ids, NotificationDefinition};
pub use error::NotificationError;
pub use report::NotificationReport;

/// Severity of an issue, strictly ordered from `Info` to `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Purely informational
    Info,
    /// Small improvement possible
    Hint,
    /// Likely problem, output still usable
    Warning,
    /// Output violates the target standard
    Error,
    /// Information required for archival is missing
    Critical,
}

impl Severity {
    /// All severities, least severe first.
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Hint,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Hint => "HINT",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", label)
    }
}

/// Kind of issue.
///
/// Categories are not comparable; [`Category::precedence`] only fixes where
/// they land when notifications are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Valid output that could be nicer
    StyleSuggestion,
    /// Output that does not conform to the target schema
    SchemaInvalidation,
    /// Failure inside the converter itself
    InternalError,
}

impl Category {
    /// Sort precedence; higher values are listed first.
    pub fn precedence(&self) -> u8 {
        match self {
            Category::StyleSuggestion => 1,
            Category::SchemaInvalidation => 2,
            Category::InternalError => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::StyleSuggestion => "STYLE_SUGGESTION",
            Category::SchemaInvalidation => "SCHEMA_INVALIDATION",
            Category::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", label)
    }
}

/// Data standard whose rules a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataStandard {
    /// Brain Imaging Data Structure
    Bids,
    /// Neurodata Without Borders
    Nwb,
    /// DANDI archive
    Dandi,
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    identifier: Option<String>,
    title: String,
    reason: String,
    solution: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    source_file_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    target_file_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    data_standards: Vec<DataStandard>,
    category: Category,
    severity: Severity,
}

impl Notification {
    /// Instantiate a catalog entry for the given paths.
    pub fn from_definition<S, T>(
        identifier: &str,
        source_file_paths: S,
        target_file_paths: T,
    ) -> Result<Self, NotificationError>
    where
        S: IntoIterator,
        S::Item: Into<PathBuf>,
        T: IntoIterator,
        T::Item: Into<PathBuf>,
    {
        let definition = catalog::lookup(identifier)
            .ok_or_else(|| NotificationError::UnknownIdentifier(identifier.to_string()))?;

        Ok(Self {
            identifier: Some(definition.identifier.to_string()),
            title: definition.title.to_string(),
            reason: definition.reason.to_string(),
            solution: definition.solution.to_string(),
            examples: definition.examples.iter().map(|s| s.to_string()).collect(),
            field: definition.field.map(str::to_string),
            source_file_paths: source_file_paths.into_iter().map(Into::into).collect(),
            target_file_paths: target_file_paths.into_iter().map(Into::into).collect(),
            data_standards: definition.data_standards.to_vec(),
            category: definition.category,
            severity: definition.severity,
        })
    }

    /// Append run-specific detail (an offending value, an error chain) to the reason.
    pub fn with_detail(mut self, detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref();
        if !detail.is_empty() {
            self.reason = format!("{}\n\n{}", self.reason, detail);
        }
        self
    }

    /// Point the notification at a specific field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Catalog identifier
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Short title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Explanation, including run-specific detail
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Suggested fix
    pub fn solution(&self) -> &str {
        &self.solution
    }

    /// Example values
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Affected metadata field
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Source files the issue was found in
    pub fn source_file_paths(&self) -> &[PathBuf] {
        &self.source_file_paths
    }

    /// Output files the issue affects
    pub fn target_file_paths(&self) -> &[PathBuf] {
        &self.target_file_paths
    }

    /// Standards involved
    pub fn data_standards(&self) -> &[DataStandard] {
        &self.data_standards
    }

    /// Kind of issue
    pub fn category(&self) -> Category {
        self.category
    }

    /// Severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Canonical total order: category precedence and severity descending,
    /// then title, with the remaining fields as tie-breakers.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        other
            .category
            .precedence()
            .cmp(&self.category.precedence())
            .then_with(|| other.severity.cmp(&self.severity))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.identifier.cmp(&other.identifier))
            .then_with(|| self.reason.cmp(&other.reason))
            .then_with(|| self.field.cmp(&other.field))
            .then_with(|| self.source_file_paths.cmp(&other.source_file_paths))
            .then_with(|| self.target_file_paths.cmp(&other.target_file_paths))
            .then_with(|| self.solution.cmp(&other.solution))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.title)?;
        if let Some(field) = &self.field {
            write!(f, " ({})", field)?;
        }
        Ok(())
    }
}

/// Sort notifications into the canonical report order.
pub fn sort_notifications(notifications: &mut [Notification]) {
    notifications.sort_by(Notification::canonical_cmp);
}

/// Anything that accumulates notifications while it is built or used.
pub trait CollectNotifications {
    /// All notifications held by this value and its children.
    fn collect_notifications(&self) -> Vec<Notification>;
}

impl<T: CollectNotifications> CollectNotifications for Option<T> {
    fn collect_notifications(&self) -> Vec<Notification> {
        self.as_ref()
            .map(CollectNotifications::collect_notifications)
            .unwrap_or_default()
    }
}

impl<T: CollectNotifications> CollectNotifications for [T] {
    fn collect_notifications(&self) -> Vec<Notification> {
        self.iter()
            .flat_map(CollectNotifications::collect_notifications)
            .collect()
    }
}
