//! Config validation logic.
//! Verifies root existence, readability/writability and that the two roots are disjoint.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use super::types::Config;
use crate::fs_ops::{TEMP_PREFIX, io_error_with_help};

/// Validate both roots and replace them with their canonical forms.
///
/// - `old_root` must exist, be a directory and be readable.
/// - `new_root` is created when missing and must be writable.
/// - Neither root may equal or contain the other.
pub fn validate_and_normalize(cfg: &mut Config) -> Result<()> {
    ensure_dir_exists_and_is_dir(&cfg.old_root, "old_root")?;
    ensure_readable(&cfg.old_root, "old_root")?;

    ensure_dir_is_or_create(&cfg.new_root, "new_root")?;
    ensure_writable(&cfg.new_root, "new_root")?;

    let old_real = dunce::canonicalize(&cfg.old_root)
        .with_context(|| format!("canonicalize old_root '{}'", cfg.old_root.display()))?;
    let new_real = dunce::canonicalize(&cfg.new_root)
        .with_context(|| format!("canonicalize new_root '{}'", cfg.new_root.display()))?;

    if old_real == new_real {
        bail!(
            "old_root and new_root resolve to the same path: '{}'",
            old_real.display()
        );
    }
    if old_real.starts_with(&new_real) {
        bail!(
            "old_root '{}' must not be inside new_root '{}'",
            old_real.display(),
            new_real.display()
        );
    }
    if new_real.starts_with(&old_real) {
        bail!(
            "new_root '{}' must not be inside old_root '{}'",
            new_real.display(),
            old_real.display()
        );
    }

    cfg.old_root = old_real;
    cfg.new_root = new_real;
    info!(
        "Config validated: old='{}' new='{}' log_file='{}'",
        cfg.old_root.display(),
        cfg.new_root.display(),
        cfg.log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".into())
    );
    Ok(())
}

fn ensure_dir_exists_and_is_dir(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        error!("{name} does not exist: {}", path.display());
        bail!("{name} does not exist: {}", path.display());
    }
    if !path.is_dir() {
        error!("{name} is not a directory: {}", path.display());
        bail!("{name} is not a directory: {}", path.display());
    }
    Ok(())
}

fn ensure_readable(path: &Path, name: &str) -> Result<()> {
    fs::read_dir(path).with_context(|| {
        format!("Cannot read {name} directory '{}'; check permissions", path.display())
    })?;
    debug!("{name} readable: {}", path.display());
    Ok(())
}

fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            error!("{name} exists but isn't a directory: {}", path.display());
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path).map_err(io_error_with_help("create root directory", path))?;
        info!("Created {name} directory: {}", path.display());
    }
    Ok(())
}

/// Create and remove a scratch file. Its name is a temp name, so listings skip it.
fn ensure_writable(path: &Path, name: &str) -> Result<()> {
    let scratch = path.join(format!("{TEMP_PREFIX}writable.{}.tmp", std::process::id()));
    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&scratch)
        .with_context(|| format!("Cannot write to {name} '{}'; check permissions", path.display()))?;
    let _ = fs::remove_file(&scratch);
    debug!("{name} writable: {}", path.display());
    Ok(())
}
