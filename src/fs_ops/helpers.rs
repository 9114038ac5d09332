//! I/O error enrichment.
//!
//! Adds the operation, the path and a platform-aware hint to an io::Error.
//! The `_io` adapter keeps the original `ErrorKind`, so callers can still
//! tell "not found" apart from real failures after enrichment.
//!
//!   fs::create_dir_all(dir).map_err(io_error_with_help_io("create directory", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

#[cfg(unix)]
fn os_hint(code: i32) -> Option<&'static str> {
    Some(match code {
        libc::EACCES | libc::EPERM => "permission denied; check ownership and write permissions.",
        libc::EXDEV => "cross-filesystem; atomic rename not possible.",
        libc::EBUSY => "resource busy; ensure no other process is writing.",
        libc::ENOENT => "path not found; verify it exists.",
        libc::EEXIST => "already exists; pick a unique name or remove the target.",
        libc::ENOSPC => "insufficient space on device.",
        libc::EROFS => "read-only filesystem; cannot write here.",
        libc::ELOOP => "too many symbolic link levels (ELOOP); possible symlink cycle.",
        libc::ENAMETOOLONG => "filename or path too long; shorten path segments.",
        libc::EMFILE => "process file descriptor limit reached; close files or raise limits.",
        libc::ENFILE => "system-wide file table overflow; reduce open files.",
        libc::ENOTEMPTY => "directory not empty.",
        _ => return None,
    })
}

#[cfg(windows)]
fn os_hint(code: i32) -> Option<&'static str> {
    Some(match code {
        5 => "access denied; check permissions.",
        17 => "not same device; cross-filesystem move.",
        32 => "sharing violation; file is in use.",
        2 | 3 => "path not found; verify it exists.",
        80 => "already exists; pick a unique name.",
        112 => "insufficient disk space.",
        19 => "write protected / read-only media.",
        206 => "filename or path too long (MAX_PATH exceeded).",
        _ => return None,
    })
}

#[cfg(not(any(unix, windows)))]
fn os_hint(_code: i32) -> Option<&'static str> {
    None
}

fn kind_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions."),
        io::ErrorKind::NotFound => Some("path not found; verify it exists."),
        io::ErrorKind::AlreadyExists => Some("already exists; remove or choose a unique name."),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            Some("busy/timed out; retry after the current write finishes.")
        }
        _ => None,
    }
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    match e.raw_os_error() {
        Some(code) => {
            if let Some(h) = os_hint(code) {
                msg.push_str(" — ");
                msg.push_str(h);
            }
            msg.push_str(&format!(" [os code: {code}]"));
        }
        None => {
            if let Some(h) = kind_hint(e.kind()) {
                msg.push_str(" — ");
                msg.push_str(h);
            }
        }
    }
    msg
}

/// For anyhow::Result code paths (config, CLI).
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}

/// For io::Result code paths; preserves the ErrorKind.
pub fn io_error_with_help_io<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), build_message(op, path, &e))
}
