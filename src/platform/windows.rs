//! Windows implementations of platform helpers (best-effort, no ACL management).

use anyhow::{bail, Result};
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::backend::Visibility;
use crate::fs_ops::unique_temp_path;

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Create a new config file via temp + rename. Fails if the target exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent)?;
    let tmp = unique_temp_path(parent);
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    drop(f);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// No-op; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// No-op; Windows has no portable public/private distinction without ACLs.
pub fn apply_visibility(_path: &Path, _visibility: Visibility, _is_dir: bool) -> io::Result<()> {
    Ok(())
}

pub fn visibility_of(_meta: &Metadata) -> Visibility {
    Visibility::Public
}
