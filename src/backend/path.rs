//! Logical path normalization for concrete backends.
//!
//! Backends map logical paths (`dir/file.txt`) onto their own addressing. The
//! router never calls this: it passes paths through exactly as received.
//!
//! Normal form: no leading or trailing `/`, no empty or `.` segments. The root
//! is the empty string. `..` and NUL bytes are rejected so a path can never
//! escape the backend's root.

use crate::errors::{StorageError, StorageResult};

pub fn normalize(path: &str) -> StorageResult<String> {
    if path.contains('\0') {
        return Err(invalid(path, "contains a NUL byte"));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid(path, "'..' segments are not allowed")),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Parent of a normalized path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind('/').map(|i| &path[..i]).unwrap_or(""))
}

/// Join a normalized directory and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// True if `path` lies strictly below the normalized directory `dir`.
pub fn is_descendant(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return !path.is_empty();
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

fn invalid(path: &str, reason: &str) -> StorageError {
    StorageError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_redundant_separators() {
        assert_eq!(normalize("/a//b/./c/").unwrap(), "a/b/c");
        assert_eq!(normalize("").unwrap(), "");
        assert_eq!(normalize("/").unwrap(), "");
        assert_eq!(normalize("a\\b").unwrap(), "a/b");
    }

    #[test]
    fn rejects_escapes() {
        assert!(matches!(
            normalize("a/../../etc"),
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(normalize("a\0b").is_err());
    }

    #[test]
    fn parent_and_join() {
        assert_eq!(parent("a/b/c"), Some("a/b"));
        assert_eq!(parent("a"), Some(""));
        assert_eq!(parent(""), None);
        assert_eq!(join("", "x"), "x");
        assert_eq!(join("a/b", "x"), "a/b/x");
    }

    #[test]
    fn descendant_checks_segment_boundary() {
        assert!(is_descendant("merged/a.txt", "merged"));
        assert!(!is_descendant("merged2/a.txt", "merged"));
        assert!(!is_descendant("merged", "merged"));
        assert!(is_descendant("x", ""));
    }
}
