//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template at the default location when none exists.
//!
//! Notes:
//! - This module only reads/writes the config file; directory validation happens elsewhere.
//! - Unknown XML fields are rejected so misconfigurations surface early.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::paths::{CONFIG_ENV, default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{NEW_ROOT_DEFAULT, OLD_ROOT_DEFAULT};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    old_root: Option<String>,
    new_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

/// Outcome of [`load_or_init`].
#[derive(Debug)]
pub enum LoadResult {
    /// A config file was found and parsed.
    Loaded(Config, PathBuf),
    /// `$LAZY_MIGRATE_CONFIG` points at a missing file; defaults apply.
    Missing(PathBuf),
    /// No config existed at the default location; a template was written there.
    CreatedTemplate(PathBuf),
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// Missing fields fall back to defaults; a bad log level is ignored.
fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();
    if let Some(p) = non_empty(parsed.old_root.as_deref()) {
        cfg.old_root = PathBuf::from(p);
    }
    if let Some(p) = non_empty(parsed.new_root.as_deref()) {
        cfg.new_root = PathBuf::from(p);
    }
    if let Some(level) = non_empty(parsed.log_level.as_deref()).and_then(LogLevel::parse) {
        cfg.log_level = level;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);
    cfg
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    Ok(xml_to_config(parsed))
}

/// Load the config file, or write a template when none exists yet.
///
/// An explicit path must exist. Otherwise the location comes from
/// [`default_config_path`]; a missing file there gets a template unless it was
/// named by `$LAZY_MIGRATE_CONFIG`.
pub fn load_or_init(explicit: Option<&Path>) -> Result<LoadResult> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
        return Ok(LoadResult::Loaded(load_config_from_xml_path(path)?, path.to_path_buf()));
    }

    let path = default_config_path()?;
    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }
    if env::var_os(CONFIG_ENV).is_some() {
        return Ok(LoadResult::Missing(path));
    }
    create_template_config(&path)?;
    Ok(LoadResult::CreatedTemplate(path))
}

/// Create the template config file and its parent directory.
/// Uses secure creation to avoid following attacker-controlled symlinks on Unix.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory '{}'", parent.display()))?;
            let _ = set_dir_mode_0700(parent);
        }
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/lazy_migrate.log".into());

    let content = format!(
        "<!--\n  lazy_migrate configuration (XML)\n\n    old_root   -> directory served by the storage being phased out\n    new_root   -> directory that receives objects on first access\n    log_level  -> quiet | normal | info | debug\n    log_file   -> path to log file (optional; leave empty to log to stderr only)\n\n  CLI flags override XML values.\n-->\n<config>\n  <old_root>{}</old_root>\n  <new_root>{}</new_root>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n</config>\n",
        OLD_ROOT_DEFAULT, NEW_ROOT_DEFAULT, suggested_log
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_all_fields_and_trims() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.xml");
        fs::write(
            &path,
            "<config>\n  <old_root>  /data/old </old_root>\n  <new_root>/data/new</new_root>\n  <log_level>Debug</log_level>\n  <log_file>/var/log/lm.log</log_file>\n</config>",
        )
        .unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.old_root, PathBuf::from("/data/old"));
        assert_eq!(cfg.new_root, PathBuf::from("/data/new"));
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/var/log/lm.log")));
    }

    #[test]
    fn missing_and_empty_fields_use_defaults() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.xml");
        fs::write(&path, "<config><old_root>/o</old_root><log_file></log_file></config>").unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.old_root, PathBuf::from("/o"));
        assert_eq!(cfg.new_root, PathBuf::from(NEW_ROOT_DEFAULT));
        assert_eq!(cfg.log_level, LogLevel::Normal);
        assert_eq!(cfg.log_file, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.xml");
        fs::write(&path, "<config><old_root>/o</old_root><bucket>x</bucket></config>").unwrap();
        let err = load_config_from_xml_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse config xml"));
    }

    #[test]
    fn template_is_parseable_and_not_overwritten() {
        let td = tempdir().unwrap();
        let path = td.path().join("nested").join("config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.old_root, PathBuf::from(OLD_ROOT_DEFAULT));
        assert_eq!(cfg.new_root, PathBuf::from(NEW_ROOT_DEFAULT));
        assert!(create_template_config(&path).is_err());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let td = tempdir().unwrap();
        let err = load_or_init(Some(&td.path().join("absent.xml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
