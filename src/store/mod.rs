use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{GitvaultError, Result};

pub mod history;
pub mod mappings;

/// Write-to-temp-then-rename so a concurrent reader never observes a
/// half-written store file.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        GitvaultError::message(format!("{} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| GitvaultError::message(format!("temp file in {}: {}", parent.display(), e)))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| GitvaultError::message(format!("rename into {}: {}", path.display(), e)))?;
    Ok(())
}
