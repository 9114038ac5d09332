//! Local filesystem backend.
//!
//! Maps logical paths onto OS paths under a root directory. Writes go through a
//! hidden temp file and an atomic rename (see [`crate::fs_ops`]), so readers
//! never observe a partial object. Temp files are hidden from listings.

use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::errors::{Operation, StorageError, StorageResult};
use crate::fs_ops::{
    atomic_copy_file, atomic_write_stream_with, io_error_with_help_io, is_cross_device, is_temp_name,
};
use crate::platform::{apply_visibility, visibility_of};

use super::path::{self as logical, normalize};
use super::{
    mime, DirectoryAttributes, FileAttributes, Listing, ReadStream, StorageBackend, StorageEntry,
    Visibility, WriteOptions,
};

#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized logical path plus its OS location.
    fn resolve(&self, path: &str) -> StorageResult<(String, PathBuf)> {
        let logical = normalize(path)?;
        let os_path = if logical.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&logical)
        };
        Ok((logical, os_path))
    }

    /// Metadata, with absence reported as `Ok(None)`.
    fn stat(op: Operation, logical: &str, os_path: &Path) -> StorageResult<Option<Metadata>> {
        match fs::metadata(os_path) {
            Ok(m) => Ok(Some(m)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::backend(
                op,
                logical,
                io_error_with_help_io("stat", os_path)(e),
            )),
        }
    }

    /// Metadata of an existing regular file.
    fn file_metadata(op: Operation, logical: &str, os_path: &Path) -> StorageResult<Metadata> {
        match Self::stat(op, logical, os_path)? {
            Some(m) if m.is_file() => Ok(m),
            Some(_) => Err(StorageError::backend(
                op,
                logical,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            )),
            None => Err(StorageError::not_found(logical)),
        }
    }

    /// Create missing ancestors of `os_path` below the root, applying the
    /// directory visibility to the ones this call created.
    fn ensure_parent(&self, op: Operation, logical: &str, os_path: &Path, options: &WriteOptions) -> StorageResult<()> {
        let Some(parent) = os_path.parent() else {
            return Ok(());
        };
        let missing: Vec<PathBuf> = parent
            .ancestors()
            .take_while(|p| p.starts_with(&self.root) && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        fs::create_dir_all(parent).map_err(|e| {
            StorageError::backend(op, logical, io_error_with_help_io("create directory", parent)(e))
        })?;
        if let Some(vis) = options.directory_visibility {
            for dir in missing.iter().rev() {
                apply_visibility(dir, vis, true).map_err(|e| StorageError::backend(op, logical, e))?;
            }
        }
        Ok(())
    }

    fn write_from(
        &self,
        op: Operation,
        path: &str,
        reader: &mut dyn Read,
        options: &WriteOptions,
    ) -> StorageResult<()> {
        let (logical, os_path) = self.resolve(path)?;
        if logical.is_empty() {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "cannot write to the backend root".into(),
            });
        }
        self.ensure_parent(op, &logical, &os_path, options)?;
        // Visibility goes on the empty temp file, so contents are never exposed wider.
        let bytes = atomic_write_stream_with(reader, &os_path, |tmp| match options.visibility {
            Some(vis) => apply_visibility(tmp, vis, false),
            None => Ok(()),
        })
        .map_err(|e| StorageError::backend(op, &logical, e))?;
        trace!(path = %logical, bytes, "local write");
        Ok(())
    }

    fn file_attributes(logical: &str, meta: &Metadata) -> FileAttributes {
        let mut attrs = FileAttributes::new(logical)
            .with_file_size(meta.len())
            .with_visibility(visibility_of(meta));
        attrs.last_modified = modified_at(meta);
        attrs
    }
}

fn modified_at(meta: &Metadata) -> Option<DateTime<Utc>> {
    let ft = FileTime::from_last_modification_time(meta);
    DateTime::from_timestamp(ft.unix_seconds(), ft.nanoseconds())
}

fn entry_for(base: &str, root: &Path, entry: &walkdir::DirEntry) -> StorageResult<StorageEntry> {
    let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let path = logical::join(base, &rel);
    let meta = entry
        .metadata()
        .map_err(|e| StorageError::from_io(Operation::ListContents, &path, io::Error::from(e)))?;
    if meta.is_dir() {
        Ok(StorageEntry::Directory(DirectoryAttributes {
            path,
            visibility: Some(visibility_of(&meta)),
            last_modified: modified_at(&meta),
        }))
    } else {
        Ok(StorageEntry::File(LocalBackend::file_attributes(&path, &meta)))
    }
}

impl StorageBackend for LocalBackend {
    fn file_exists(&self, path: &str) -> StorageResult<bool> {
        let (logical, os_path) = self.resolve(path)?;
        Ok(Self::stat(Operation::FileExists, &logical, &os_path)?.is_some_and(|m| m.is_file()))
    }

    fn directory_exists(&self, path: &str) -> StorageResult<bool> {
        let (logical, os_path) = self.resolve(path)?;
        Ok(Self::stat(Operation::DirectoryExists, &logical, &os_path)?.is_some_and(|m| m.is_dir()))
    }

    fn write(&self, path: &str, contents: &[u8], options: &WriteOptions) -> StorageResult<()> {
        let mut reader = contents;
        self.write_from(Operation::Write, path, &mut reader, options)
    }

    fn write_stream(&self, path: &str, mut contents: ReadStream, options: &WriteOptions) -> StorageResult<()> {
        self.write_from(Operation::WriteStream, path, &mut contents, options)
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let (logical, os_path) = self.resolve(path)?;
        Self::file_metadata(Operation::Read, &logical, &os_path)?;
        fs::read(&os_path).map_err(|e| StorageError::from_io(Operation::Read, &logical, e))
    }

    fn read_stream(&self, path: &str) -> StorageResult<ReadStream> {
        let (logical, os_path) = self.resolve(path)?;
        Self::file_metadata(Operation::ReadStream, &logical, &os_path)?;
        let f = File::open(&os_path).map_err(|e| StorageError::from_io(Operation::ReadStream, &logical, e))?;
        Ok(Box::new(f))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let (logical, os_path) = self.resolve(path)?;
        match fs::remove_file(&os_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::backend(
                Operation::Delete,
                logical,
                io_error_with_help_io("remove file", &os_path)(e),
            )),
        }
    }

    fn delete_directory(&self, path: &str) -> StorageResult<()> {
        let (logical, os_path) = self.resolve(path)?;
        let op = Operation::DeleteDirectory;
        if logical.is_empty() {
            // Root: clear its contents, keep the root itself.
            let entries = match fs::read_dir(&os_path) {
                Ok(rd) => rd,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(StorageError::backend(op, logical, e)),
            };
            for entry in entries {
                let entry = entry.map_err(|e| StorageError::backend(op, "", e))?;
                let p = entry.path();
                let res = if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    fs::remove_dir_all(&p)
                } else {
                    fs::remove_file(&p)
                };
                res.map_err(|e| StorageError::backend(op, "", io_error_with_help_io("remove", &p)(e)))?;
            }
            return Ok(());
        }
        match fs::remove_dir_all(&os_path) {
            Ok(()) => {
                debug!(path = %logical, "Removed local directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::backend(
                op,
                logical,
                io_error_with_help_io("remove directory", &os_path)(e),
            )),
        }
    }

    fn create_directory(&self, path: &str, options: &WriteOptions) -> StorageResult<()> {
        let (logical, os_path) = self.resolve(path)?;
        let op = Operation::CreateDirectory;
        self.ensure_parent(op, &logical, &os_path, options)?;
        fs::create_dir_all(&os_path).map_err(|e| {
            StorageError::backend(op, &logical, io_error_with_help_io("create directory", &os_path)(e))
        })?;
        if let Some(vis) = options.directory_visibility.or(options.visibility) {
            apply_visibility(&os_path, vis, true).map_err(|e| StorageError::backend(op, &logical, e))?;
        }
        Ok(())
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StorageResult<()> {
        let (logical, os_path) = self.resolve(path)?;
        let op = Operation::SetVisibility;
        let meta = Self::stat(op, &logical, &os_path)?.ok_or_else(|| StorageError::not_found(&logical))?;
        apply_visibility(&os_path, visibility, meta.is_dir()).map_err(|e| StorageError::backend(op, logical, e))
    }

    fn visibility(&self, path: &str) -> StorageResult<FileAttributes> {
        let (logical, os_path) = self.resolve(path)?;
        let meta = Self::file_metadata(Operation::Visibility, &logical, &os_path)?;
        Ok(FileAttributes::new(logical).with_visibility(visibility_of(&meta)))
    }

    fn mime_type(&self, path: &str) -> StorageResult<FileAttributes> {
        let (logical, os_path) = self.resolve(path)?;
        let op = Operation::MimeType;
        Self::file_metadata(op, &logical, &os_path)?;
        let mut head = Vec::with_capacity(mime::HEAD_LEN);
        File::open(&os_path)
            .and_then(|f| f.take(mime::HEAD_LEN as u64).read_to_end(&mut head))
            .map_err(|e| StorageError::from_io(op, &logical, e))?;
        let mime = mime::guess(&logical, &head);
        Ok(FileAttributes::new(logical).with_mime_type(mime))
    }

    fn last_modified(&self, path: &str) -> StorageResult<FileAttributes> {
        let (logical, os_path) = self.resolve(path)?;
        let meta = Self::file_metadata(Operation::LastModified, &logical, &os_path)?;
        let mut attrs = FileAttributes::new(logical);
        attrs.last_modified = modified_at(&meta);
        Ok(attrs)
    }

    fn file_size(&self, path: &str) -> StorageResult<FileAttributes> {
        let (logical, os_path) = self.resolve(path)?;
        let meta = Self::file_metadata(Operation::FileSize, &logical, &os_path)?;
        Ok(FileAttributes::new(logical).with_file_size(meta.len()))
    }

    fn list_contents<'a>(&'a self, path: &str, deep: bool) -> StorageResult<Listing<'a>> {
        let (logical, os_path) = self.resolve(path)?;
        let is_dir = Self::stat(Operation::ListContents, &logical, &os_path)?.is_some_and(|m| m.is_dir());
        if !is_dir {
            return Ok(Box::new(std::iter::empty()));
        }
        let walker = WalkDir::new(&os_path)
            .min_depth(1)
            .max_depth(if deep { usize::MAX } else { 1 })
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_temp_name(&e.file_name().to_string_lossy()));
        let root = os_path.clone();
        let listing = walker.filter_map(move |res| {
            let item = match res {
                Ok(entry) => entry_for(&logical, &root, &entry),
                Err(e) => {
                    let at = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    Err(StorageError::from_io(Operation::ListContents, at, io::Error::from(e)))
                }
            };
            match item {
                // Removed between readdir and stat; the listing is not a snapshot.
                Err(e) if e.is_not_found() => None,
                other => Some(other),
            }
        });
        Ok(Box::new(listing))
    }

    fn move_file(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
        let op = Operation::Move;
        let (src_logical, src_os) = self.resolve(source)?;
        let (dst_logical, dst_os) = self.resolve(destination)?;
        Self::file_metadata(op, &src_logical, &src_os)?;
        if src_os == dst_os {
            return Ok(());
        }
        self.ensure_parent(op, &dst_logical, &dst_os, options)?;
        match fs::rename(&src_os, &dst_os) {
            Ok(()) => {}
            Err(e) if is_cross_device(&e) => {
                warn!(src = %src_logical, dest = %dst_logical, "Rename crossed filesystems, using copy+remove");
                atomic_copy_file(&src_os, &dst_os).map_err(|e| StorageError::backend(op, &src_logical, e))?;
                fs::remove_file(&src_os).map_err(|e| {
                    StorageError::backend(op, &src_logical, io_error_with_help_io("remove original file", &src_os)(e))
                })?;
            }
            Err(e) => {
                return Err(StorageError::backend(
                    op,
                    src_logical,
                    io_error_with_help_io("rename", &dst_os)(e),
                ));
            }
        }
        if let Some(vis) = options.visibility {
            apply_visibility(&dst_os, vis, false).map_err(|e| StorageError::backend(op, &dst_logical, e))?;
        }
        Ok(())
    }

    fn copy(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
        let op = Operation::Copy;
        let (src_logical, src_os) = self.resolve(source)?;
        let (dst_logical, dst_os) = self.resolve(destination)?;
        let meta = Self::file_metadata(op, &src_logical, &src_os)?;
        if src_os == dst_os {
            return Ok(());
        }
        self.ensure_parent(op, &dst_logical, &dst_os, options)?;
        atomic_copy_file(&src_os, &dst_os).map_err(|e| StorageError::backend(op, &src_logical, e))?;
        let vis = options.visibility.unwrap_or_else(|| visibility_of(&meta));
        apply_visibility(&dst_os, vis, false).map_err(|e| StorageError::backend(op, &dst_logical, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalBackend) {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf());
        (dir, backend)
    }

    fn paths(backend: &LocalBackend, path: &str, deep: bool) -> Vec<String> {
        backend
            .list_contents(path, deep)
            .unwrap()
            .map(|e| e.unwrap().path().to_string())
            .collect()
    }

    #[test]
    fn write_creates_parents_and_reads_back() {
        let (_dir, backend) = setup();
        backend.write("a/b/c.txt", b"hello", &WriteOptions::default()).unwrap();
        assert!(backend.file_exists("a/b/c.txt").unwrap());
        assert!(backend.directory_exists("a/b").unwrap());
        assert!(!backend.file_exists("a/b").unwrap());
        assert_eq!(backend.read("/a//b/c.txt").unwrap(), b"hello");
    }

    #[test]
    fn absence_is_not_found_not_failure() {
        let (_dir, backend) = setup();
        assert!(!backend.file_exists("nope.txt").unwrap());
        assert!(backend.read("nope.txt").unwrap_err().is_not_found());
        assert!(backend.read_stream("nope.txt").err().unwrap().is_not_found());
        assert!(backend.file_size("nope.txt").unwrap_err().is_not_found());
        backend.delete("nope.txt").unwrap();
        backend.delete_directory("nope").unwrap();
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let (_dir, backend) = setup();
        let err = backend.write("../outside.txt", b"x", &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath { .. }));
    }

    #[test]
    fn stream_round_trip() {
        let (_dir, backend) = setup();
        let src: ReadStream = Box::new(io::Cursor::new(b"streamed".to_vec()));
        backend.write_stream("s.bin", src, &WriteOptions::default()).unwrap();
        let mut out = String::new();
        backend.read_stream("s.bin").unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "streamed");
    }

    #[test]
    fn listing_shallow_and_deep_skip_temp_files() {
        let (dir, backend) = setup();
        backend.write("top/one.txt", b"1", &WriteOptions::default()).unwrap();
        backend.write("top/sub/two.txt", b"2", &WriteOptions::default()).unwrap();
        fs::write(dir.path().join("top/.lazy_migrate.1.2.3.tmp"), b"partial").unwrap();

        assert_eq!(paths(&backend, "top", false), vec!["top/one.txt", "top/sub"]);
        assert_eq!(
            paths(&backend, "", true),
            vec!["top", "top/one.txt", "top/sub", "top/sub/two.txt"]
        );
        assert!(paths(&backend, "missing", true).is_empty());
    }

    #[test]
    fn attributes_report_size_mime_and_mtime() {
        let (dir, backend) = setup();
        backend.write("notes.txt", b"12345", &WriteOptions::default()).unwrap();
        let when = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(dir.path().join("notes.txt"), when).unwrap();

        assert_eq!(backend.file_size("notes.txt").unwrap().file_size, Some(5));
        assert_eq!(backend.mime_type("notes.txt").unwrap().mime_type.as_deref(), Some("text/plain"));
        let modified = backend.last_modified("notes.txt").unwrap().last_modified.unwrap();
        assert_eq!(modified.timestamp(), 1_600_000_000);
    }

    #[cfg(unix)]
    #[test]
    fn visibility_is_applied_on_write_and_set() {
        let (_dir, backend) = setup();
        let opts = WriteOptions::default().with_visibility(Visibility::Private);
        backend.write("secret.txt", b"s", &opts).unwrap();
        assert_eq!(backend.visibility("secret.txt").unwrap().visibility, Some(Visibility::Private));
        backend.set_visibility("secret.txt", Visibility::Public).unwrap();
        assert_eq!(backend.visibility("secret.txt").unwrap().visibility, Some(Visibility::Public));
    }

    #[test]
    fn move_and_copy_within_root() {
        let (_dir, backend) = setup();
        backend.write("a.txt", b"A", &WriteOptions::default()).unwrap();
        backend.copy("a.txt", "copies/a.txt", &WriteOptions::default()).unwrap();
        backend.move_file("a.txt", "moved/a.txt", &WriteOptions::default()).unwrap();
        assert!(!backend.file_exists("a.txt").unwrap());
        assert_eq!(backend.read("copies/a.txt").unwrap(), b"A");
        assert_eq!(backend.read("moved/a.txt").unwrap(), b"A");
        assert!(backend.move_file("a.txt", "b.txt", &WriteOptions::default()).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_directory_is_recursive_and_root_keeps_itself() {
        let (dir, backend) = setup();
        backend.write("d/x/y.txt", b"y", &WriteOptions::default()).unwrap();
        backend.write("keep.txt", b"k", &WriteOptions::default()).unwrap();
        backend.delete_directory("d").unwrap();
        assert!(!backend.directory_exists("d").unwrap());
        backend.delete_directory("").unwrap();
        assert!(dir.path().exists());
        assert!(!backend.file_exists("keep.txt").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn private_overwrite_never_publishes_a_public_file() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, backend) = setup();
        backend.write("k.pem", b"old", &WriteOptions::default()).unwrap();
        let opts = WriteOptions::default().with_visibility(Visibility::Private);
        backend.write("k.pem", b"secret", &opts).unwrap();

        let mode = fs::metadata(dir.path().join("k.pem")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(backend.read("k.pem").unwrap(), b"secret");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| is_temp_name(&e.file_name().to_string_lossy()))
            .collect();
        assert!(leftovers.is_empty());
    }
}
