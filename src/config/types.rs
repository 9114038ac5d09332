//! Core configuration types.
//! - Config holds the two storage roots plus logging settings.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{NEW_ROOT_DEFAULT, OLD_ROOT_DEFAULT};
use crate::backend::{LocalBackend, StorageBackend};
use crate::router::{DynRouter, MigrationRouter};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Migrations and warnings (default)
    #[default]
    Normal,
    /// Every migration decision
    Info,
    /// Backend-level tracing
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for the command-line front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory served by the backend being phased out
    pub old_root: PathBuf,
    /// Directory served by the backend being phased in
    pub new_root: PathBuf,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            old_root: PathBuf::from(OLD_ROOT_DEFAULT),
            new_root: PathBuf::from(NEW_ROOT_DEFAULT),
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl Config {
    /// Construct a Config with explicit roots; other fields use defaults.
    pub fn new(old_root: impl Into<PathBuf>, new_root: impl Into<PathBuf>) -> Self {
        Self {
            old_root: old_root.into(),
            new_root: new_root.into(),
            ..Default::default()
        }
    }

    /// Router over two local directory backends rooted at the configured paths.
    pub fn build_router(&self) -> DynRouter {
        let old: Box<dyn StorageBackend> = Box::new(LocalBackend::new(&self.old_root));
        let new: Box<dyn StorageBackend> = Box::new(LocalBackend::new(&self.new_root));
        MigrationRouter::new(old, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_aliases() {
        assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Quiet));
        assert_eq!("verbose".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Info.to_string(), "info");
    }

    #[test]
    fn build_router_uses_configured_roots() {
        let td = tempfile::tempdir().unwrap();
        let cfg = Config::new(td.path().join("old"), td.path().join("new"));
        std::fs::create_dir_all(&cfg.old_root).unwrap();
        std::fs::write(cfg.old_root.join("a.txt"), b"A").unwrap();

        let router = cfg.build_router();
        assert_eq!(router.read("a.txt").unwrap(), b"A");
        assert!(cfg.new_root.join("a.txt").exists());
        assert!(!cfg.old_root.join("a.txt").exists());
    }
}
