use std::fs;
use std::io;
use std::path::Path;

use crate::config::FileMode;
use crate::context::create_symlink;
use crate::dataset::ConversionError;

/// Place `source` at `destination` using an already-resolved mode.
///
/// An existing destination is replaced. `Auto` must be resolved by the caller
/// and is treated as `Copy`.
pub fn transfer_file(source: &Path, destination: &Path, mode: FileMode) -> Result<(), ConversionError> {
    if is_same_file(source, destination) {
        log::debug!("{} is already in place", destination.display());
        return Ok(());
    }
    if fs::symlink_metadata(destination).is_ok() {
        log::debug!("Replacing existing {}", destination.display());
        fs::remove_file(destination)?;
    }

    match mode {
        FileMode::Copy | FileMode::Auto => {
            fs::copy(source, destination)?;
        }
        FileMode::Move => move_file(source, destination)?,
        FileMode::Symlink => {
            let target = fs::canonicalize(source)?;
            create_symlink(&target, destination).map_err(|source| {
                ConversionError::SymlinkFailed {
                    link: destination.to_path_buf(),
                    target: target.clone(),
                    source,
                }
            })?;
        }
    }

    log::debug!(
        "{} {} -> {}",
        mode,
        source.display(),
        destination.display()
    );
    Ok(())
}

/// Rename, falling back to copy-and-delete across filesystems.
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) => {
            log::debug!(
                "rename {} failed ({}), copying instead",
                source.display(),
                err
            );
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
    }
}

/// A link at `b` pointing to `a` does not count; it gets replaced.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if fs::symlink_metadata(b).is_ok_and(|m| m.file_type().is_symlink()) {
        return false;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
