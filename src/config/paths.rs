//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{Context, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file (or a directory holding `config.xml`).
pub const CONFIG_ENV: &str = "LAZY_MIGRATE_CONFIG";

const APP_DIR: &str = "lazy_migrate";
const CONFIG_FILE: &str = "config.xml";
const LOG_FILE: &str = "lazy_migrate.log";

/// Config file location.
///
/// `$LAZY_MIGRATE_CONFIG` wins: relative values are resolved against the
/// current directory and a directory gets `config.xml` appended. Otherwise
/// `<config_dir>/lazy_migrate/config.xml`.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_ENV) {
        let mut path = PathBuf::from(raw);
        if path.is_relative() {
            path = env::current_dir()
                .context("resolve current directory for relative config path")?
                .join(path);
        }
        if path.is_dir() {
            path.push(CONFIG_FILE);
        }
        return Ok(path);
    }
    let base = config_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .with_context(|| format!("no config directory on this platform; set {CONFIG_ENV}"))?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// Log file location: next to an env-provided config, else under the data dir.
pub fn default_log_path() -> Result<PathBuf> {
    if env::var_os(CONFIG_ENV).is_some() {
        let cfg = default_config_path()?;
        if let Some(dir) = cfg.parent() {
            return Ok(dir.join(LOG_FILE));
        }
    }
    let base = data_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .context("no data directory on this platform")?;
    Ok(base.join(APP_DIR).join(LOG_FILE))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn detects_symlinked_parent() {
        let td = tempdir().unwrap();
        let base = dunce::canonicalize(td.path()).unwrap();
        let real = base.join("real");
        fs::create_dir_all(&real).unwrap();
        let link = base.join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(path_has_symlink_ancestor(&link.join("app.log")).unwrap());
        assert!(!path_has_symlink_ancestor(&real.join("app.log")).unwrap());
    }

    #[test]
    fn missing_ancestors_are_skipped() {
        let td = tempdir().unwrap();
        let deep = dunce::canonicalize(td.path()).unwrap().join("a").join("b").join("c.log");
        assert!(!path_has_symlink_ancestor(&deep).unwrap());
    }
}
