//! # Label Sanitization
//!
//! BIDS labels (the `<label>` part of `sub-<label>` and `ses-<label>`) may only
//! contain ASCII letters and digits. NWB identifiers are free-form, so every
//! identifier that ends up in a path or a table passes through [`sanitize`].
//!
//! Two levels exist:
//!
//! - [`SanitizationLevel::None`]: labels are used verbatim.
//! - [`SanitizationLevel::Critical`]: every run of characters outside
//!   `[A-Za-z0-9]` becomes a single [`SEPARATOR`], and separators at either end
//!   are trimmed.
//!
//! The same subject and session identifiers recur across every session of a
//! run, so the [`Sanitizer`] owned by a run memoizes results and appends every
//! substitution it makes to the run's sanitization log.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};

/// Replacement for characters that are not allowed in a BIDS label.
pub const SEPARATOR: char = '+';

/// Runs of characters outside the BIDS label alphabet.
static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("label regex must compile"));

/// How aggressively identifiers are rewritten before they reach the output tree.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SanitizationLevel {
    /// Labels are written exactly as found in the source files.
    #[default]
    None,
    /// Characters that would break BIDS path parsing are replaced.
    Critical,
}

impl SanitizationLevel {
    /// Returns all accepted level names.
    pub fn variants() -> &'static [&'static str] {
        &["none", "critical"]
    }
}

impl fmt::Display for SanitizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizationLevel::None => write!(f, "none"),
            SanitizationLevel::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for SanitizationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "0" => Ok(SanitizationLevel::None),
            "critical" | "1" => Ok(SanitizationLevel::Critical),
            _ => Err(format!(
                "Unknown sanitization level '{}'. Valid options: {}",
                s,
                SanitizationLevel::variants().join(", ")
            )),
        }
    }
}

/// Map a raw identifier to a label at the given level.
///
/// Total over all inputs: the empty string maps to the empty string, and the
/// result is a fixed point (`sanitize(sanitize(x, l), l) == sanitize(x, l)`).
///
/// ```
/// use nwb2bids::sanitization::{sanitize, SanitizationLevel};
///
/// assert_eq!(sanitize("mouse_01", SanitizationLevel::None), "mouse_01");
/// assert_eq!(sanitize("mouse_01", SanitizationLevel::Critical), "mouse+01");
/// assert_eq!(sanitize("__A  B__", SanitizationLevel::Critical), "A+B");
/// ```
pub fn sanitize(label: &str, level: SanitizationLevel) -> String {
    match level {
        SanitizationLevel::None => label.to_string(),
        SanitizationLevel::Critical => NON_ALNUM_RUN
            .replace_all(label, SEPARATOR.to_string().as_str())
            .trim_matches(SEPARATOR)
            .to_string(),
    }
}

/// Returns true if `label` is already a valid BIDS label (non-empty, alphanumeric).
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Memoizing sanitizer owned by a single conversion run.
///
/// The cache is keyed by `(label, level)` so one instance may serve lookups at
/// more than one level without mixing results.
#[derive(Debug)]
pub struct Sanitizer {
    level: SanitizationLevel,
    cache: Mutex<HashMap<(String, SanitizationLevel), String>>,
    log_path: Option<PathBuf>,
}

impl Sanitizer {
    /// Create a sanitizer for the given default level, without a log file.
    pub fn new(level: SanitizationLevel) -> Self {
        Self {
            level,
            cache: Mutex::new(HashMap::new()),
            log_path: None,
        }
    }

    /// Append every substitution to `path`.
    pub fn with_log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// The level used by [`Sanitizer::sanitize`].
    pub fn level(&self) -> SanitizationLevel {
        self.level
    }

    /// Sanitize at this sanitizer's configured level.
    pub fn sanitize(&self, label: &str) -> String {
        self.sanitize_at(label, self.level)
    }

    /// Sanitize at an explicit level, consulting the cache first.
    pub fn sanitize_at(&self, label: &str, level: SanitizationLevel) -> String {
        let key = (label.to_string(), level);
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }

        let sanitized = sanitize(label, level);
        if sanitized != label {
            log::debug!("Sanitized label '{}' -> '{}' ({})", label, sanitized, level);
            // Appends happen while the cache lock is held, so the log has a single writer.
            self.append_to_log(label, &sanitized, level);
        }
        cache.insert(key, sanitized.clone());
        sanitized
    }

    /// Number of distinct `(label, level)` pairs seen so far.
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn append_to_log(&self, label: &str, sanitized: &str, level: SanitizationLevel) {
        let Some(path) = &self.log_path else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "[{}] '{}' -> '{}'", level, label, sanitized));
        if let Err(e) = result {
            log::warn!(
                "Could not append to sanitization log {}: {}",
                path.display(),
                e
            );
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SanitizationLevel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_none_is_identity() {
        for label in ["", "abc", "a_b-c d", "sub-01", "ü"] {
            assert_eq!(sanitize(label, SanitizationLevel::None), label);
        }
    }

    #[test]
    fn test_critical_replaces_and_trims() {
        let level = SanitizationLevel::Critical;
        assert_eq!(sanitize("", level), "");
        assert_eq!(sanitize("123", level), "123");
        assert_eq!(sanitize("mouse_1", level), "mouse+1");
        assert_eq!(sanitize("a--b__c", level), "a+b+c");
        assert_eq!(sanitize("_lead", level), "lead");
        assert_eq!(sanitize("trail.", level), "trail");
        assert_eq!(sanitize("___", level), "");
        assert_eq!(sanitize("Maus é 2", level), "Maus+2");
    }

    #[test]
    fn test_critical_is_fixed_point() {
        let level = SanitizationLevel::Critical;
        for label in ["a b", "+a+", "x_y_z", "++", "a+b"] {
            let once = sanitize(label, level);
            assert_eq!(sanitize(&once, level), once);
        }
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("none".parse::<SanitizationLevel>().unwrap(), SanitizationLevel::None);
        assert_eq!(
            "CRITICAL".parse::<SanitizationLevel>().unwrap(),
            SanitizationLevel::Critical
        );
        assert!("everything".parse::<SanitizationLevel>().is_err());
        assert!(SanitizationLevel::Critical > SanitizationLevel::None);
    }

    #[test]
    fn test_valid_label() {
        assert!(is_valid_label("A1"));
        assert!(!is_valid_label(""));
        assert!(!is_valid_label("a_b"));
    }

    #[test]
    fn test_sanitizer_caches_and_logs() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("sanitization.log");
        let sanitizer = Sanitizer::new(SanitizationLevel::Critical).with_log_file(&log);

        assert_eq!(sanitizer.sanitize("a_b"), "a+b");
        assert_eq!(sanitizer.sanitize("a_b"), "a+b");
        assert_eq!(sanitizer.sanitize("clean"), "clean");
        assert_eq!(sanitizer.sanitize_at("a_b", SanitizationLevel::None), "a_b");
        assert_eq!(sanitizer.cached_len(), 3);

        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("'a_b' -> 'a+b'"));
    }
}
