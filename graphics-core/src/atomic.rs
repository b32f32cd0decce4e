//! Atomic file replacement shared by every writer in the workspace.
//!
//! Write flow: bytes → `<name>.tmp` sibling → `rename`. The `.tmp` is always in
//! the same directory as the target so the rename never crosses filesystems.

use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};

/// Path of the temporary sibling used while replacing `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents`, creating parent directories as needed.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
