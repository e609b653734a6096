//! Atomic file copy that carries the source timestamps across.
//!
//! The destination is written to a temp file in the same directory, synced,
//! then renamed over the target. Afterwards the source's access and
//! modification times are applied so a later scan sees identical metadata.

use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Copy `source` to `dest`, replacing it if present.
///
/// Missing parent directories of `dest` are created. Returns the number of
/// bytes copied.
pub fn copy_preserving_mtime(source: &Path, dest: &Path) -> io::Result<u64> {
    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("destination has no parent directory: {}", dest.display()),
        )
    })?;
    fs::create_dir_all(parent)?;

    let mut reader = File::open(source)?;
    let metadata = reader.metadata()?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    let bytes = io::copy(&mut reader, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), metadata.permissions())?;

    temp.persist(dest).map_err(|e| e.error)?;

    let accessed = FileTime::from_last_access_time(&metadata);
    let modified = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dest, accessed, modified)?;

    Ok(bytes)
}
