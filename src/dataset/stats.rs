use std::fmt;

/// Statistics from a completed dataset conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Sessions known to the converter
    pub sessions_total: usize,

    /// Sessions whose directory was fully written
    pub sessions_converted: usize,

    /// Sessions skipped or failed
    pub sessions_failed: usize,

    /// Rows written to participants.tsv
    pub participants_written: usize,

    /// Sidecar files written (TSV and JSON)
    pub sidecars_written: usize,
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dataset: {}/{} sessions converted ({} failed), {} participants, {} sidecar files",
            self.sessions_converted,
            self.sessions_total,
            self.sessions_failed,
            self.participants_written,
            self.sidecars_written
        )
    }
}
