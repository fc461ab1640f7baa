//! # Run Context
//!
//! Everything a conversion run caches lives here rather than in process-wide
//! statics: the memoizing [`Sanitizer`], the recording-read cache, and the
//! symlink capability probe. Two runs in one process with different
//! configurations therefore never share stale results.
//!
//! Converters hold the context through an [`Arc`], so sessions can be handed
//! to worker threads without copying the caches.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use crate::config::{FileMode, RunConfig};
use crate::nwb::{SourceError, SourceLocation, SourceReader, SourceRecording};
use crate::sanitization::Sanitizer;

/// Shared state of one conversion run
pub struct RunContext {
    config: RunConfig,
    sanitizer: Sanitizer,
    reader: Box<dyn SourceReader>,
    recordings: Mutex<HashMap<SourceLocation, Arc<SourceRecording>>>,
    symlink_support: OnceLock<bool>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("sanitizer", &self.sanitizer)
            .field("cached_recordings", &self.cached_recordings())
            .field("symlink_support", &self.symlink_support.get())
            .finish()
    }
}

impl RunContext {
    /// Create a context for `config`, reading sources with `reader`.
    pub fn new(config: RunConfig, reader: Box<dyn SourceReader>) -> Self {
        let sanitizer =
            Sanitizer::new(config.sanitization_level()).with_log_file(config.sanitization_file_path());
        Self {
            config,
            sanitizer,
            reader,
            recordings: Mutex::new(HashMap::new()),
            symlink_support: OnceLock::new(),
        }
    }

    /// Wrap in an [`Arc`] for sharing between converters
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The run's sanitizer
    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Sanitize a label at the configured level.
    pub fn sanitize(&self, label: &str) -> String {
        self.sanitizer.sanitize(label)
    }

    /// Read a recording, reusing an earlier read of the same location.
    pub fn load_recording(
        &self,
        location: &SourceLocation,
    ) -> Result<Arc<SourceRecording>, SourceError> {
        if let Some(hit) = self.lock_recordings().get(location) {
            return Ok(Arc::clone(hit));
        }

        // Read outside the lock; a concurrent duplicate read is harmless.
        let recording = Arc::new(self.reader.read(location)?);
        let mut cache = self.lock_recordings();
        let entry = cache
            .entry(location.clone())
            .or_insert_with(|| Arc::clone(&recording));
        Ok(Arc::clone(entry))
    }

    /// Seed the cache with a recording obtained elsewhere (e.g. from an archive API).
    pub fn insert_recording(&self, recording: SourceRecording) -> Arc<SourceRecording> {
        let recording = Arc::new(recording);
        self.lock_recordings()
            .insert(recording.location.clone(), Arc::clone(&recording));
        recording
    }

    /// Session identifier of a source, from the cache when possible.
    pub fn read_session_id(&self, location: &SourceLocation) -> Result<Option<String>, SourceError> {
        if let Some(hit) = self.lock_recordings().get(location) {
            return Ok(hit.session_id.clone());
        }
        self.reader.read_session_id(location)
    }

    /// Number of cached recordings
    pub fn cached_recordings(&self) -> usize {
        self.lock_recordings().len()
    }

    /// Resolve an explicit or configured mode; `Auto` becomes `Symlink` or `Copy`.
    pub fn resolve_file_mode(&self, requested: Option<FileMode>) -> FileMode {
        match requested.unwrap_or(self.config.file_mode()) {
            FileMode::Auto if self.supports_symlinks() => FileMode::Symlink,
            FileMode::Auto => FileMode::Copy,
            mode => mode,
        }
    }

    /// Whether the output filesystem accepts symlinks; probed once per run.
    pub fn supports_symlinks(&self) -> bool {
        *self.symlink_support.get_or_init(|| {
            let supported = probe_symlink_support(&self.config.run_directory());
            log::debug!("Symlink support: {}", supported);
            supported
        })
    }

    fn lock_recordings(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<SourceLocation, Arc<SourceRecording>>> {
        self.recordings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn probe_symlink_support(directory: &Path) -> bool {
    let Ok(probe_dir) = tempfile::Builder::new()
        .prefix("symlink-probe")
        .tempdir_in(directory)
    else {
        return false;
    };
    let target = probe_dir.path().join("target");
    let link = probe_dir.path().join("link");
    if fs::write(&target, b"probe").is_err() {
        return false;
    }
    create_symlink(&target, &link).is_ok()
}

/// Create a file symlink at `link` pointing to `target`.
pub fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, link);
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nwb::InMemoryReader;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn context(dir: &Path, reader: InMemoryReader, mode: FileMode) -> RunContext {
        let config = RunConfig::builder(dir.join("bids"))
            .cache_directory(dir.join("cache"))
            .file_mode(mode)
            .build()
            .unwrap();
        RunContext::new(config, Box::new(reader))
    }

    #[test]
    fn test_recordings_are_memoized() {
        let dir = tempdir().unwrap();
        let path = PathBuf::from("/virtual/a.nwb");
        let reader = InMemoryReader::new().with_recording(SourceRecording::new(path.clone()));
        let ctx = context(dir.path(), reader, FileMode::Copy);

        let location = SourceLocation::Local(path);
        let first = ctx.load_recording(&location).unwrap();
        let second = ctx.load_recording(&location).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.cached_recordings(), 1);
    }

    #[test]
    fn test_inserted_recordings_answer_session_id() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), InMemoryReader::new(), FileMode::Copy);

        let mut recording = SourceRecording::new(PathBuf::from("/remote/a.nwb"));
        recording.session_id = Some("S1".to_string());
        let location = recording.location.clone();
        ctx.insert_recording(recording);

        assert_eq!(ctx.read_session_id(&location).unwrap().as_deref(), Some("S1"));
    }

    #[test]
    fn test_explicit_mode_wins() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), InMemoryReader::new(), FileMode::Move);
        assert_eq!(ctx.resolve_file_mode(None), FileMode::Move);
        assert_eq!(ctx.resolve_file_mode(Some(FileMode::Copy)), FileMode::Copy);
    }

    #[cfg(unix)]
    #[test]
    fn test_auto_mode_resolves_to_symlink_on_unix() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), InMemoryReader::new(), FileMode::Auto);
        assert_eq!(ctx.resolve_file_mode(None), FileMode::Symlink);
    }

    #[test]
    fn test_sanitize_uses_configured_level() {
        let dir = tempdir().unwrap();
        let config = RunConfig::builder(dir.path().join("bids"))
            .cache_directory(dir.path().join("cache"))
            .sanitization_level(crate::sanitization::SanitizationLevel::Critical)
            .build()
            .unwrap();
        let log_path = config.sanitization_file_path();
        let ctx = RunContext::new(config, Box::new(InMemoryReader::new()));

        assert_eq!(ctx.sanitize("mouse_1"), "mouse+1");
        assert!(fs::read_to_string(log_path).unwrap().contains("mouse_1"));
    }
}
