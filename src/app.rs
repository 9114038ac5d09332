//! Application orchestrator.
//! Loads/merges config, initializes logging, validates roots, builds the router,
//! and runs one storage command through it.

use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{self, Write};
use tracing::{debug, error};

use lazy_migrate::cli::{Args, Command};
use lazy_migrate::config::{CONFIG_ENV, LoadResult, default_config_path, load_or_init, validate_and_normalize};
use lazy_migrate::output as out;
use lazy_migrate::{Config, ReadStream, StorageBackend, StorageEntry, StorageError, WriteOptions};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location(&args);
        return Ok(());
    }

    let mut cfg = match load_or_init(args.config.as_deref())? {
        LoadResult::Loaded(cfg, _) => cfg,
        LoadResult::Missing(path) => {
            if args.old_root.is_none() || args.new_root.is_none() {
                out::print_warn(&format!(
                    "{CONFIG_ENV} points at a missing file ({}); using defaults and CLI flags.",
                    path.display()
                ));
            }
            Config::default()
        }
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!(
                "A template lazy_migrate config was written to: {}",
                path.display()
            ));
            out::print_info("Edit the file to set `old_root` and `new_root` (and optionally `log_level` and `log_file`). Example:\n\n<config>\n  <old_root>/srv/storage/old</old_root>\n  <new_root>/srv/storage/new</new_root>\n  <log_level>normal</log_level>\n  <log_file>/path/to/lazy_migrate.log</log_file>\n</config>\n");
            if args.old_root.is_none() || args.new_root.is_none() {
                out::print_info(&format!(
                    "Then re-run this command. To use a different location set {CONFIG_ENV}."
                ));
                return Ok(());
            }
            Config::default()
        }
    };
    args.apply_overrides(&mut cfg);

    let Some(command) = args.command.as_ref() else {
        bail!("no command given; run with --help for usage");
    };

    // Initialize logging and keep the guard alive until the command finishes.
    let guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    debug!("Starting lazy_migrate: {:?}", args);

    let result = (|| -> Result<()> {
        validate_and_normalize(&mut cfg)?;
        let router = cfg.build_router();
        execute(&router, command)
    })();

    if let Err(e) = &result {
        if let Some(se) = e.downcast_ref::<StorageError>() {
            error!(code = se.code(), kind = se.kind(), error = %se, "Command failed");
        } else {
            error!("Command failed: {e:#}");
        }
    }

    drop(guard);
    result
}

fn print_config_location(args: &Args) {
    if let Some(p) = &args.config {
        out::print_info(&format!("Using --config (explicit):\n  {}\n", p.display()));
        return;
    }
    if let Some(env) = std::env::var_os(CONFIG_ENV) {
        out::print_info(&format!(
            "Using {CONFIG_ENV} (explicit):\n  {}\n",
            env.to_string_lossy()
        ));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default lazy_migrate config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run without --print-config to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

/// Run one command against any backend (the router, in practice).
pub fn execute(backend: &dyn StorageBackend, command: &Command) -> Result<()> {
    match command {
        Command::Exists { path } => {
            let exists = backend.file_exists(path).with_context(|| format!("check '{path}'"))?;
            out::print_user(&exists.to_string());
        }
        Command::DirExists { path } => {
            let exists = backend
                .directory_exists(path)
                .with_context(|| format!("check directory '{path}'"))?;
            out::print_user(&exists.to_string());
        }
        Command::Read { path } => {
            let mut stream = backend.read_stream(path).with_context(|| format!("read '{path}'"))?;
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            io::copy(&mut stream, &mut lock).with_context(|| format!("write '{path}' to stdout"))?;
            lock.flush()?;
        }
        Command::Write { path, from, visibility } => {
            let source: ReadStream = match from {
                Some(file) => Box::new(
                    File::open(file).with_context(|| format!("open '{}'", file.display()))?,
                ),
                None => Box::new(io::stdin()),
            };
            let options = WriteOptions {
                visibility: *visibility,
                ..Default::default()
            };
            backend
                .write_stream(path, source, &options)
                .with_context(|| format!("write '{path}'"))?;
        }
        Command::Rm { path } => backend.delete(path).with_context(|| format!("delete '{path}'"))?,
        Command::Rmdir { path } => backend
            .delete_directory(path)
            .with_context(|| format!("delete directory '{path}'"))?,
        Command::Mkdir { path, visibility } => {
            let options = WriteOptions {
                directory_visibility: *visibility,
                ..Default::default()
            };
            backend
                .create_directory(path, &options)
                .with_context(|| format!("create directory '{path}'"))?;
        }
        Command::Ls { path, recursive } => {
            let listing = backend
                .list_contents(path, *recursive)
                .with_context(|| format!("list '{path}'"))?;
            for entry in listing {
                match entry.with_context(|| format!("list '{path}'"))? {
                    StorageEntry::Directory(d) => out::print_user(&format!("{}/", d.path)),
                    StorageEntry::File(f) => out::print_user(&f.path),
                }
            }
        }
        Command::Stat { path } => {
            let size = backend.file_size(path).with_context(|| format!("stat '{path}'"))?;
            let modified = backend.last_modified(path).with_context(|| format!("stat '{path}'"))?;
            let visibility = backend.visibility(path).with_context(|| format!("stat '{path}'"))?;
            let mime = backend.mime_type(path).with_context(|| format!("stat '{path}'"))?;
            out::print_user(&format!("path: {path}"));
            if let Some(n) = size.file_size {
                out::print_user(&format!("size: {n}"));
            }
            if let Some(t) = modified.last_modified {
                out::print_user(&format!("modified: {}", t.to_rfc3339()));
            }
            if let Some(v) = visibility.visibility {
                out::print_user(&format!("visibility: {v}"));
            }
            if let Some(m) = mime.mime_type {
                out::print_user(&format!("mime: {m}"));
            }
        }
        Command::SetVisibility { path, visibility } => backend
            .set_visibility(path, *visibility)
            .with_context(|| format!("set visibility of '{path}'"))?,
        Command::Mv { source, destination } => backend
            .move_file(source, destination, &WriteOptions::default())
            .with_context(|| format!("move '{source}' -> '{destination}'"))?,
        Command::Cp { source, destination } => backend
            .copy(source, destination, &WriteOptions::default())
            .with_context(|| format!("copy '{source}' -> '{destination}'"))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_migrate::{MemoryBackend, MigrationRouter, Operation};

    #[test]
    fn stat_migrates_once() {
        let router = MigrationRouter::new(
            MemoryBackend::new().with_file("a.txt", "hello"),
            MemoryBackend::new(),
        );
        execute(&router, &Command::Stat { path: "a.txt".into() }).unwrap();
        assert!(router.old().is_empty());
        assert_eq!(router.old().call_count(Operation::ReadStream), 1);
        assert_eq!(router.old().call_count(Operation::FileExists), 4);
    }

    #[test]
    fn storage_errors_survive_context() {
        let router = MigrationRouter::new(MemoryBackend::new(), MemoryBackend::new());
        let err = execute(&router, &Command::Read { path: "missing".into() }).unwrap_err();
        let se = err.downcast_ref::<StorageError>().expect("storage error");
        assert!(se.is_not_found());
        assert!(format!("{err:#}").starts_with("read 'missing'"));
    }
}
