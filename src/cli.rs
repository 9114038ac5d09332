//! CLI definition and parsing.
//! Defines Args (global flags) and Command (one storage operation per invocation).
//!
//! Notes:
//! - Every command goes through the migration router, so touching an object
//!   through the CLI migrates it exactly as a library caller would.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::backend::Visibility;
use crate::config::types::{Config, LogLevel};

/// Storage operations over an old and a new root, migrating objects on first access.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Serve two storage roots as one, migrating each object to the new root on first access"
)]
pub struct Args {
    /// Explicit config file (otherwise LAZY_MIGRATE_CONFIG or the platform default).
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Override the old root directory (normally configured via XML).
    #[arg(long, global = true, value_hint = ValueHint::DirPath, help = "Override the old root directory")]
    pub old_root: Option<PathBuf>,

    /// Override the new root directory (normally configured via XML).
    #[arg(long, global = true, value_hint = ValueHint::DirPath, help = "Override the new root directory")]
    pub new_root: Option<PathBuf>,

    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    #[arg(
        long,
        help = "Print the config file location used by lazy_migrate and exit"
    )]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print whether a file exists (true/false).
    Exists { path: String },

    /// Print whether a directory exists (true/false).
    DirExists { path: String },

    /// Write a file's bytes to stdout.
    Read { path: String },

    /// Store a file from --from or stdin.
    Write {
        path: String,
        /// Read contents from this local file instead of stdin.
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        from: Option<PathBuf>,
        #[arg(long)]
        visibility: Option<Visibility>,
    },

    /// Delete a file.
    Rm { path: String },

    /// Delete a directory and everything below it.
    Rmdir { path: String },

    /// Create a directory.
    Mkdir {
        path: String,
        #[arg(long)]
        visibility: Option<Visibility>,
    },

    /// List a directory (the root when PATH is omitted).
    Ls {
        #[arg(default_value = "")]
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print size, modification time, visibility and MIME type.
    Stat { path: String },

    /// Set a file's visibility.
    SetVisibility { path: String, visibility: Visibility },

    /// Move a file.
    Mv { source: String, destination: String },

    /// Copy a file.
    Cp { source: String, destination: String },
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(old) = &self.old_root {
            cfg.old_root = old.clone();
        }
        if let Some(new) = &self.new_root {
            cfg.new_root = new.clone();
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "lazy_migrate",
            "read",
            "a/b.txt",
            "--old-root",
            "/o",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.command, Some(Command::Read { path: "a/b.txt".into() }));
        assert_eq!(args.old_root, Some(PathBuf::from("/o")));
        assert!(args.json);
    }

    #[test]
    fn ls_defaults_to_root() {
        let args = Args::try_parse_from(["lazy_migrate", "ls", "-r"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Ls { path: String::new(), recursive: true })
        );
    }

    #[test]
    fn visibility_is_validated() {
        let ok = Args::try_parse_from(["lazy_migrate", "set-visibility", "x", "private"]).unwrap();
        assert_eq!(
            ok.command,
            Some(Command::SetVisibility { path: "x".into(), visibility: Visibility::Private })
        );
        assert!(Args::try_parse_from(["lazy_migrate", "set-visibility", "x", "secret"]).is_err());
    }

    #[test]
    fn overrides_win_and_debug_beats_log_level() {
        let args = Args::try_parse_from([
            "lazy_migrate",
            "--new-root",
            "/n",
            "--log-level",
            "quiet",
            "-d",
            "exists",
            "x",
        ])
        .unwrap();
        let mut cfg = Config::new("/o-file", "/n-file");
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.old_root, PathBuf::from("/o-file"));
        assert_eq!(cfg.new_root, PathBuf::from("/n"));
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }
}
