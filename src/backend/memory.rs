//! In-process backend.
//!
//! Objects live in a map keyed by normalized path. Directories exist either
//! explicitly (`create_directory`) or implicitly as prefixes of stored objects,
//! the way object stores synthesize them.
//!
//! Every call is recorded, failures can be injected per operation/path, and
//! open read streams are counted. This makes it the usual collaborator for
//! exercising [`MigrationRouter`](crate::router::MigrationRouter) in tests.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::errors::{Operation, StorageError, StorageResult};

use super::path::{self as logical, normalize};
use super::{
    mime, DirectoryAttributes, FileAttributes, Listing, ReadStream, StorageBackend, StorageEntry,
    Visibility, WriteOptions,
};

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    visibility: Visibility,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, MemoryFile>,
    directories: BTreeMap<String, Visibility>,
}

impl MemoryState {
    fn has_directory(&self, dir: &str) -> bool {
        dir.is_empty()
            || self.directories.contains_key(dir)
            || self.files.keys().any(|k| logical::is_descendant(k, dir))
            || self.directories.keys().any(|k| logical::is_descendant(k, dir))
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Operation,
    /// The path argument as received (source path for move/copy).
    pub path: String,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<HashMap<(Operation, String), io::ErrorKind>>,
    open_streams: Arc<AtomicUsize>,
}

/// Read stream that decrements the backend's open-stream counter when dropped.
struct TrackedStream {
    inner: Cursor<Vec<u8>>,
    open: Arc<AtomicUsize>,
}

impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call.
    pub fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert_file(path, contents.into(), Visibility::Public, Utc::now());
        self
    }

    /// Seed an object with explicit attributes, without recording a call.
    pub fn insert_file(
        &self,
        path: &str,
        contents: Vec<u8>,
        visibility: Visibility,
        last_modified: DateTime<Utc>,
    ) {
        let key = normalize(path).unwrap_or_else(|_| path.to_string());
        self.write_state().files.insert(
            key,
            MemoryFile {
                contents,
                visibility,
                last_modified,
            },
        );
    }

    /// Seed an explicit directory without recording a call.
    pub fn with_directory(self, path: &str) -> Self {
        let key = normalize(path).unwrap_or_else(|_| path.to_string());
        self.write_state().directories.insert(key, Visibility::Public);
        self
    }

    /// Stored bytes, bypassing call recording and failure injection.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let key = normalize(path).ok()?;
        self.read_state().files.get(&key).map(|f| f.contents.clone())
    }

    /// Whether an object is stored, bypassing call recording.
    pub fn has_file(&self, path: &str) -> bool {
        normalize(path).is_ok_and(|key| self.read_state().files.contains_key(&key))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.read_state().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every future `operation` on `path` fail with a backend error.
    pub fn fail_on(&self, operation: Operation, path: &str) {
        self.fail_on_with(operation, path, io::ErrorKind::Other);
    }

    /// Like [`fail_on`](Self::fail_on) with a chosen error kind;
    /// `ErrorKind::NotFound` surfaces as [`StorageError::NotFound`].
    pub fn fail_on_with(&self, operation: Operation, path: &str, kind: io::ErrorKind) {
        lock(&self.failures).insert((operation, path.to_string()), kind);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Paths passed to `operation`, in call order.
    pub fn calls_of(&self, operation: Operation) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.path.clone())
            .collect()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        lock(&self.calls).iter().filter(|c| c.operation == operation).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Read streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, apply injected failures, and normalize the path.
    fn enter(&self, operation: Operation, path: &str) -> StorageResult<String> {
        lock(&self.calls).push(RecordedCall {
            operation,
            path: path.to_string(),
        });
        if let Some(kind) = lock(&self.failures).get(&(operation, path.to_string())) {
            return Err(StorageError::from_io(
                operation,
                path,
                io::Error::new(*kind, "injected failure"),
            ));
        }
        normalize(path)
    }

    fn store(&self, key: String, contents: Vec<u8>, options: &WriteOptions) {
        let mut state = self.write_state();
        let visibility = options
            .visibility
            .or_else(|| state.files.get(&key).map(|f| f.visibility))
            .unwrap_or_default();
        if let Some(dir_vis) = options.directory_visibility {
            let mut parent = logical::parent(&key);
            while let Some(dir) = parent.filter(|d| !d.is_empty()) {
                state.directories.entry(dir.to_string()).or_insert(dir_vis);
                parent = logical::parent(dir);
            }
        }
        state.files.insert(
            key,
            MemoryFile {
                contents,
                visibility,
                last_modified: Utc::now(),
            },
        );
    }

    fn file(&self, key: &str) -> StorageResult<MemoryFile> {
        self.read_state()
            .files
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }
}

impl StorageBackend for MemoryBackend {
    fn file_exists(&self, path: &str) -> StorageResult<bool> {
        let key = self.enter(Operation::FileExists, path)?;
        Ok(self.read_state().files.contains_key(&key))
    }

    fn directory_exists(&self, path: &str) -> StorageResult<bool> {
        let key = self.enter(Operation::DirectoryExists, path)?;
        Ok(self.read_state().has_directory(&key))
    }

    fn write(&self, path: &str, contents: &[u8], options: &WriteOptions) -> StorageResult<()> {
        let key = self.enter(Operation::Write, path)?;
        self.store(key, contents.to_vec(), options);
        Ok(())
    }

    fn write_stream(&self, path: &str, mut contents: ReadStream, options: &WriteOptions) -> StorageResult<()> {
        let key = self.enter(Operation::WriteStream, path)?;
        let mut buf = Vec::new();
        contents
            .read_to_end(&mut buf)
            .map_err(|e| StorageError::backend(Operation::WriteStream, path, e))?;
        drop(contents);
        self.store(key, buf, options);
        Ok(())
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let key = self.enter(Operation::Read, path)?;
        Ok(self.file(&key)?.contents)
    }

    fn read_stream(&self, path: &str) -> StorageResult<ReadStream> {
        let key = self.enter(Operation::ReadStream, path)?;
        let contents = self.file(&key)?.contents;
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedStream {
            inner: Cursor::new(contents),
            open: Arc::clone(&self.open_streams),
        }))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let key = self.enter(Operation::Delete, path)?;
        self.write_state().files.remove(&key);
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> StorageResult<()> {
        let key = self.enter(Operation::DeleteDirectory, path)?;
        let mut state = self.write_state();
        state.files.retain(|k, _| !logical::is_descendant(k, &key));
        state
            .directories
            .retain(|k, _| *k != key && !logical::is_descendant(k, &key));
        Ok(())
    }

    fn create_directory(&self, path: &str, options: &WriteOptions) -> StorageResult<()> {
        let key = self.enter(Operation::CreateDirectory, path)?;
        let vis = options
            .directory_visibility
            .or(options.visibility)
            .unwrap_or_default();
        let mut state = self.write_state();
        let mut current = Some(key.as_str());
        while let Some(dir) = current.filter(|d| !d.is_empty()) {
            state.directories.entry(dir.to_string()).or_insert(vis);
            current = logical::parent(dir);
        }
        if !key.is_empty() {
            state.directories.insert(key.clone(), vis);
        }
        Ok(())
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StorageResult<()> {
        let key = self.enter(Operation::SetVisibility, path)?;
        let mut state = self.write_state();
        if let Some(f) = state.files.get_mut(&key) {
            f.visibility = visibility;
            return Ok(());
        }
        if state.has_directory(&key) {
            state.directories.insert(key, visibility);
            return Ok(());
        }
        Err(StorageError::not_found(key))
    }

    fn visibility(&self, path: &str) -> StorageResult<FileAttributes> {
        let key = self.enter(Operation::Visibility, path)?;
        let f = self.file(&key)?;
        Ok(FileAttributes::new(key).with_visibility(f.visibility))
    }

    fn mime_type(&self, path: &str) -> StorageResult<FileAttributes> {
        let key = self.enter(Operation::MimeType, path)?;
        let f = self.file(&key)?;
        let mime = mime::guess(&key, &f.contents);
        Ok(FileAttributes::new(key).with_mime_type(mime))
    }

    fn last_modified(&self, path: &str) -> StorageResult<FileAttributes> {
        let key = self.enter(Operation::LastModified, path)?;
        let f = self.file(&key)?;
        Ok(FileAttributes::new(key).with_last_modified(f.last_modified))
    }

    fn file_size(&self, path: &str) -> StorageResult<FileAttributes> {
        let key = self.enter(Operation::FileSize, path)?;
        let f = self.file(&key)?;
        Ok(FileAttributes::new(key).with_file_size(f.contents.len() as u64))
    }

    fn list_contents<'a>(&'a self, path: &str, deep: bool) -> StorageResult<Listing<'a>> {
        let dir = self.enter(Operation::ListContents, path)?;
        let state = self.read_state();
        let within = |k: &str| {
            logical::is_descendant(k, &dir)
                && (deep || logical::parent(k) == Some(dir.as_str()))
        };

        let mut entries: BTreeMap<String, StorageEntry> = BTreeMap::new();
        let add_dir = |entries: &mut BTreeMap<String, StorageEntry>, d: &str| {
            if within(d) && !entries.contains_key(d) {
                let mut attrs = DirectoryAttributes::new(d);
                attrs.visibility = Some(state.directories.get(d).copied().unwrap_or_default());
                entries.insert(d.to_string(), StorageEntry::Directory(attrs));
            }
        };
        for d in state.directories.keys() {
            add_dir(&mut entries, d);
        }
        for (k, f) in &state.files {
            // Implied directories between `dir` and the object.
            let mut parent = logical::parent(k);
            while let Some(p) = parent.filter(|p| logical::is_descendant(p, &dir)) {
                add_dir(&mut entries, p);
                parent = logical::parent(p);
            }
            if within(k) {
                let attrs = FileAttributes::new(k.as_str())
                    .with_file_size(f.contents.len() as u64)
                    .with_visibility(f.visibility)
                    .with_last_modified(f.last_modified);
                entries.insert(k.clone(), StorageEntry::File(attrs));
            }
        }
        Ok(Box::new(entries.into_values().map(Ok)))
    }

    fn move_file(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
        let src = self.enter(Operation::Move, source)?;
        let dst = normalize(destination)?;
        let f = self.file(&src)?;
        if src == dst {
            return Ok(());
        }
        let opts = WriteOptions {
            visibility: options.visibility.or(Some(f.visibility)),
            ..options.clone()
        };
        self.store(dst, f.contents, &opts);
        self.write_state().files.remove(&src);
        Ok(())
    }

    fn copy(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
        let src = self.enter(Operation::Copy, source)?;
        let dst = normalize(destination)?;
        let f = self.file(&src)?;
        let opts = WriteOptions {
            visibility: options.visibility.or(Some(f.visibility)),
            ..options.clone()
        };
        self.store(dst, f.contents, &opts);
        Ok(())
    }
}
