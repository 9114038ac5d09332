//! Value types shared by every backend.
//! Attributes are opaque to the router; it hands back whatever the backend reported.

use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::errors::StorageResult;

/// Readable handle on an object's bytes. Dropping it releases the handle.
pub type ReadStream = Box<dyn Read + Send>;

/// Lazy listing of entries under a path.
pub type Listing<'a> = Box<dyn Iterator<Item = StorageResult<StorageEntry>> + Send + 'a>;

/// Portable visibility of a file or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// Parse common names (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        })
    }
}

impl FromStr for Visibility {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid visibility: '{s}' (expected public or private)"))
    }
}

/// Per-call write settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Visibility applied to written files; backend default when unset.
    pub visibility: Option<Visibility>,
    /// Visibility applied to directories created along the way.
    pub directory_visibility: Option<Visibility>,
}

impl WriteOptions {
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_directory_visibility(mut self, visibility: Visibility) -> Self {
        self.directory_visibility = Some(visibility);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub path: String,
    pub file_size: Option<u64>,
    pub visibility: Option<Visibility>,
    pub last_modified: Option<DateTime<Utc>>,
    pub mime_type: Option<String>,
}

impl FileAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_size: None,
            visibility: None,
            last_modified: None,
            mime_type: None,
        }
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAttributes {
    pub path: String,
    pub visibility: Option<Visibility>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl DirectoryAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            visibility: None,
            last_modified: None,
        }
    }
}

/// One item of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEntry {
    File(FileAttributes),
    Directory(DirectoryAttributes),
}

impl StorageEntry {
    pub fn path(&self) -> &str {
        match self {
            StorageEntry::File(f) => &f.path,
            StorageEntry::Directory(d) => &d.path,
        }
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self, StorageEntry::File(_))
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self, StorageEntry::Directory(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_parse_and_display() {
        assert_eq!(Visibility::parse("PUBLIC"), Some(Visibility::Public));
        assert_eq!(" private ".parse::<Visibility>(), Ok(Visibility::Private));
        assert!("world".parse::<Visibility>().is_err());
        assert_eq!(Visibility::Private.to_string(), "private");
    }

    #[test]
    fn entry_path_for_both_kinds() {
        let f = StorageEntry::File(FileAttributes::new("a/b.txt").with_file_size(3));
        let d = StorageEntry::Directory(DirectoryAttributes::new("a"));
        assert_eq!(f.path(), "a/b.txt");
        assert!(f.is_file());
        assert_eq!(d.path(), "a");
        assert!(d.is_dir());
    }
}
