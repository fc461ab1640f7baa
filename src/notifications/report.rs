use std::fmt;
use std::fs;
use std::path::Path;

#[cfg(feature = "colorized_output")]
use console::style;

use super::{sort_notifications, Notification, Severity};

/// Default number of notifications shown in the console summary
pub const DEFAULT_MAX_DISPLAYED: usize = 10;

/// Human-readable summary of a run's notifications
#[derive(Debug, Clone)]
pub struct NotificationReport {
    /// Notifications in canonical order
    pub notifications: Vec<Notification>,
    /// How many notifications the summary lists in full
    pub max_displayed: usize,
}

impl NotificationReport {
    /// Create a report; the notifications are sorted canonically.
    pub fn new(mut notifications: Vec<Notification>) -> Self {
        sort_notifications(&mut notifications);
        Self {
            notifications,
            max_displayed: DEFAULT_MAX_DISPLAYED,
        }
    }

    /// Limit the number of notifications listed by the summary.
    pub fn with_max_displayed(mut self, max_displayed: usize) -> Self {
        self.max_displayed = max_displayed;
        self
    }

    /// Count notifications of one severity
    pub fn count(&self, severity: Severity) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.severity() == severity)
            .count()
    }

    /// Check if any notification is critical
    pub fn has_critical(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    /// Check if the run produced no notifications at all
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Full plain-text dump of every notification, for the run directory.
    pub fn full_text(&self) -> String {
        let mut output = String::new();
        for (i, notification) in self.notifications.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&render_detail(notification));
        }
        output
    }

    /// Persist the text and JSON dumps.
    pub fn write_files(&self, text_path: &Path, json_path: &Path) -> std::io::Result<()> {
        fs::write(text_path, self.full_text())?;
        let json = serde_json::to_string_pretty(&self.notifications)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(json_path, json)?;
        Ok(())
    }

    fn summary_line(&self) -> String {
        format!(
            "{} critical, {} errors, {} warnings, {} hints, {} info",
            self.count(Severity::Critical),
            self.count(Severity::Error),
            self.count(Severity::Warning),
            self.count(Severity::Hint),
            self.count(Severity::Info)
        )
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();

            output.push_str(&format!("{}\n", style("nwb2bids Conversion Report").bold().cyan()));
            output.push_str(&format!("{}\n\n", style("==========================").cyan()));

            for notification in self.notifications.iter().take(self.max_displayed) {
                let label = format!("[{}]", notification.severity());
                let label = match notification.severity() {
                    Severity::Critical | Severity::Error => style(label).red().bold(),
                    Severity::Warning => style(label).yellow().bold(),
                    Severity::Hint | Severity::Info => style(label).blue(),
                };
                output.push_str(&format!("{} {}\n", label, notification.title()));
                for path in notification.source_file_paths() {
                    output.push_str(&format!("    {}\n", style(path.display()).dim()));
                }
            }
            self.push_truncation(&mut output);

            output.push('\n');
            output.push_str(&format!("{}: {}\n", style("Summary").bold(), self.summary_line()));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }

    fn push_truncation(&self, output: &mut String) {
        if self.notifications.len() > self.max_displayed {
            output.push_str(&format!(
                "... and {} more (see the notifications dump)\n",
                self.notifications.len() - self.max_displayed
            ));
        }
    }
}

fn render_detail(notification: &Notification) -> String {
    let mut output = format!("{}\n", notification);
    if let Some(identifier) = notification.identifier() {
        output.push_str(&format!("  identifier: {}\n", identifier));
    }
    output.push_str(&format!("  category: {}\n", notification.category()));
    output.push_str(&format!("  reason: {}\n", notification.reason()));
    output.push_str(&format!("  solution: {}\n", notification.solution()));
    if !notification.examples().is_empty() {
        output.push_str(&format!("  examples: {}\n", notification.examples().join(", ")));
    }
    for path in notification.source_file_paths() {
        output.push_str(&format!("  source: {}\n", path.display()));
    }
    for path in notification.target_file_paths() {
        output.push_str(&format!("  target: {}\n", path.display()));
    }
    output
}

impl fmt::Display for NotificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nwb2bids Conversion Report")?;
        writeln!(f, "==========================")?;
        writeln!(f)?;

        for notification in self.notifications.iter().take(self.max_displayed) {
            writeln!(f, "{}", notification)?;
            for path in notification.source_file_paths() {
                writeln!(f, "    {}", path.display())?;
            }
        }
        let mut truncation = String::new();
        self.push_truncation(&mut truncation);
        write!(f, "{}", truncation)?;

        writeln!(f)?;
        writeln!(f, "Summary: {}", self.summary_line())?;
        Ok(())
    }
}
