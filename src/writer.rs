//! Output file writer
//!
//! Writes rendered secrets to disk atomically: contents land in a temp file
//! in the target directory and are renamed into place, so readers never see
//! a partially written config. Files carry owner-only permissions on Unix.

use crate::error::AppError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Atomically write `contents` to `dir`/`filename`, replacing any
/// existing file
///
/// The target directory must already exist; this never creates directories.
pub fn write_output_file(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf, AppError> {
    if !dir.is_dir() {
        return Err(AppError::ConfigError(format!(
            "output directory '{}' does not exist or is not a directory",
            dir.display()
        )));
    }

    let target = dir.join(filename);
    debug!(path = %target.display(), "Writing output file");

    // Temp file in the same directory keeps the final rename on one
    // filesystem.
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(temp.path(), permissions)?;
    }

    temp.persist(&target).map_err(|e| AppError::IoError(e.error))?;

    info!(
        path = %target.display(),
        bytes = contents.len(),
        "Wrote output file"
    );
    Ok(target)
}
