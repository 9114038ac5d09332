use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix of every temp file this crate creates next to its targets.
pub const TEMP_PREFIX: &str = ".lazy_migrate.";
const TEMP_SUFFIX: &str = ".tmp";

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling temp path in `dst_dir`: `.lazy_migrate.<pid>.<nanos>.<seq>.tmp`.
pub fn unique_temp_path(dst_dir: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    dst_dir.join(format!("{TEMP_PREFIX}{pid}.{nanos}.{seq}{TEMP_SUFFIX}"))
}

/// True for names produced by [`unique_temp_path`]; listings skip these.
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

pub fn is_cross_device(e: &io::Error) -> bool {
    // No stable ErrorKind for EXDEV / ERROR_NOT_SAME_DEVICE; use raw codes.
    match e.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::EXDEV,
        #[cfg(windows)]
        Some(code) => code == 17,
        #[cfg(not(any(unix, windows)))]
        Some(_) => false,
        None => false,
    }
}

#[cfg(unix)]
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn temp_names_are_unique_across_threads() {
        let dir = Path::new("some/dir");
        let handles: Vec<_> = (0..32)
            .map(|_| thread::spawn(move || unique_temp_path(dir)))
            .collect();
        let mut set = HashSet::new();
        for h in handles {
            let p = h.join().unwrap();
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            assert!(is_temp_name(&name), "unexpected temp name {name}");
            assert!(set.insert(p));
        }
    }

    #[test]
    fn ordinary_names_are_not_temp() {
        assert!(!is_temp_name("report.tmp"));
        assert!(!is_temp_name(".lazy_migrate.config.xml"));
    }
}
