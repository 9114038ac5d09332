//! Unix implementations of platform helpers.

use anyhow::{bail, Context, Result};
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use crate::backend::Visibility;
use crate::fs_ops::{fsync_dir, unique_temp_path};

const FILE_PUBLIC: u32 = 0o644;
const FILE_PRIVATE: u32 = 0o600;
const DIR_PUBLIC: u32 = 0o755;
const DIR_PRIVATE: u32 = 0o700;

/// Open log file for appending; set 0600 only when creating a new file.
/// Existing files keep their permissions (e.g. group-readable for log shipping).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}

/// Create a new config file atomically with mode 0600: temp + fsync + rename + dir fsync.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent).with_context(|| format!("create parent '{}'", parent.display()))?;

    let tmp = unique_temp_path(parent);
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .custom_flags(libc::O_NOFOLLOW)
        .open(&tmp)
        .with_context(|| format!("create temp '{}'", tmp.display()))?;
    f.write_all(contents).context("write temp")?;
    f.sync_all().context("fsync temp")?;
    drop(f);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("rename '{}' -> '{}'", tmp.display(), path.display()));
    }
    fsync_dir(parent).context("fsync parent dir")?;
    Ok(())
}

pub fn set_dir_mode_0700(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(DIR_PRIVATE))
}

/// Public files are 0644 / directories 0755; private ones 0600 / 0700.
pub fn apply_visibility(path: &Path, visibility: Visibility, is_dir: bool) -> io::Result<()> {
    let mode = match (visibility, is_dir) {
        (Visibility::Public, false) => FILE_PUBLIC,
        (Visibility::Private, false) => FILE_PRIVATE,
        (Visibility::Public, true) => DIR_PUBLIC,
        (Visibility::Private, true) => DIR_PRIVATE,
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// World-readable means public.
pub fn visibility_of(meta: &Metadata) -> Visibility {
    if meta.permissions().mode() & 0o004 != 0 {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn preserve_existing_log_file_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, b"hello").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        let _f = open_log_file_secure_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640, "existing permissions should be preserved");
    }

    #[test]
    fn new_log_file_gets_0600() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new_log.txt");
        let _f = open_log_file_secure_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn config_write_sets_mode_and_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let cfg = dir.path().join("config.xml");
        write_config_secure_new_0600(&cfg, b"<x/>").unwrap();
        assert_eq!(fs::read(&cfg).unwrap(), b"<x/>");
        let mode = fs::metadata(&cfg).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(write_config_secure_new_0600(&cfg, b"<y/>").is_err());
        assert_eq!(fs::read(&cfg).unwrap(), b"<x/>");
    }

    #[test]
    fn visibility_round_trips_through_mode() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, b"").unwrap();
        apply_visibility(&f, Visibility::Private, false).unwrap();
        assert_eq!(visibility_of(&fs::metadata(&f).unwrap()), Visibility::Private);
        assert_eq!(fs::metadata(&f).unwrap().permissions().mode() & 0o777, 0o600);
        apply_visibility(dir.path(), Visibility::Public, true).unwrap();
        assert_eq!(fs::metadata(dir.path()).unwrap().permissions().mode() & 0o777, 0o755);
    }
}
