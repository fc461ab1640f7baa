use std::collections::HashMap;
use std::path::PathBuf;

use super::{SourceError, SourceLocation, SourceRecording};

/// Reads the metadata the converter needs out of a source file.
pub trait SourceReader: Send + Sync {
    /// Read the full metadata view of one recording.
    fn read(&self, location: &SourceLocation) -> Result<SourceRecording, SourceError>;

    /// Read only the session identifier.
    ///
    /// Grouping calls this once per discovered file, so readers that can get
    /// at the session id cheaply should override it.
    fn read_session_id(&self, location: &SourceLocation) -> Result<Option<String>, SourceError> {
        Ok(self.read(location)?.session_id)
    }
}

/// Reader serving recordings registered up front, keyed by local path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReader {
    recordings: HashMap<PathBuf, SourceRecording>,
}

impl InMemoryReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recording under its display path
    pub fn insert(&mut self, recording: SourceRecording) {
        self.recordings
            .insert(recording.location.display_path(), recording);
    }

    /// Builder form of [`InMemoryReader::insert`]
    pub fn with_recording(mut self, recording: SourceRecording) -> Self {
        self.insert(recording);
        self
    }

    /// Number of registered recordings
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Check if no recordings are registered
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

impl SourceReader for InMemoryReader {
    fn read(&self, location: &SourceLocation) -> Result<SourceRecording, SourceError> {
        let key = location.display_path();
        let mut recording = self
            .recordings
            .get(&key)
            .cloned()
            .ok_or(SourceError::NotFound(key))?;
        recording.location = location.clone();
        Ok(recording)
    }
}

/// Stand-in used when the crate is built without a file-format backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableReader;

impl SourceReader for UnavailableReader {
    fn read(&self, location: &SourceLocation) -> Result<SourceRecording, SourceError> {
        Err(SourceError::ReaderUnavailable(format!(
            "cannot read {}: nwb2bids was built without the `hdf5` feature",
            location
        )))
    }
}

/// The best reader this build supports.
pub fn default_reader() -> Box<dyn SourceReader> {
    #[cfg(feature = "hdf5")]
    {
        Box::new(super::Hdf5NwbReader::new())
    }

    #[cfg(not(feature = "hdf5"))]
    {
        Box::new(UnavailableReader)
    }
}
