//! Migrate-on-access routing between an old and a new backend.
//!
//! [`MigrationRouter`] is itself a [`StorageBackend`]. Every single-object
//! operation first runs [`MigrationRouter::ensure_migrated`], then delegates
//! to the new backend. Listings merge both backends, old entries winning on
//! path collisions.
//!
//! The router holds no state besides its two backends and adds no locking.
//! Concurrent migrations of the same path are tolerated: the second copy
//! overwrites the first and the second delete from old finds nothing.

mod listing;

pub use listing::MergedListing;

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::backend::{
    FileAttributes, Listing, ReadStream, StorageBackend, Visibility, WriteOptions,
};
use crate::errors::{StorageError, StorageResult};

/// What [`MigrationRouter::ensure_migrated`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Old does not hold the object; nothing to do.
    NotInOld,
    /// Both held it (an earlier copy finished but its delete did not); old copy removed.
    Recovered,
    /// Copied from old to new, then removed from old.
    Migrated { bytes: u64 },
}

/// Router over two backends, boxed. What the binary builds from its config.
pub type DynRouter = MigrationRouter<Box<dyn StorageBackend>, Box<dyn StorageBackend>>;

#[derive(Debug)]
pub struct MigrationRouter<O, N> {
    old: O,
    new: N,
}

/// Counts bytes pulled through the stream handed to the new backend.
struct CountingReader {
    inner: ReadStream,
    count: Arc<AtomicU64>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

impl<O: StorageBackend, N: StorageBackend> MigrationRouter<O, N> {
    pub fn new(old: O, new: N) -> Self {
        Self { old, new }
    }

    pub fn old(&self) -> &O {
        &self.old
    }

    pub fn new_backend(&self) -> &N {
        &self.new
    }

    pub fn into_inner(self) -> (O, N) {
        (self.old, self.new)
    }

    /// Move the object at `path` out of old, if old still holds it.
    ///
    /// The read stream on old is owned by the write to new and released when
    /// that write returns, successful or not. Old is only touched after new
    /// holds a complete copy, so a failed copy leaves old intact for retry.
    ///
    /// Failing to remove the old copy after new holds the object yields
    /// [`StorageError::OrphanedSource`]; the next access retries the removal.
    pub fn ensure_migrated(&self, path: &str) -> StorageResult<MigrationOutcome> {
        if !self.old.file_exists(path)? {
            debug!(path, "not in old backend");
            return Ok(MigrationOutcome::NotInOld);
        }

        if self.new.file_exists(path)? {
            debug!(path, "already in new backend, removing old copy");
            self.remove_old_copy(path)?;
            info!(path, "finished interrupted migration");
            return Ok(MigrationOutcome::Recovered);
        }

        let stream = match self.old.read_stream(path) {
            Ok(stream) => stream,
            Err(e) if e.is_not_found() => {
                // Migrated or deleted by another caller since the existence check.
                debug!(path, "vanished from old backend before copy");
                return Ok(MigrationOutcome::NotInOld);
            }
            Err(e) => return Err(e),
        };

        let count = Arc::new(AtomicU64::new(0));
        let counted = CountingReader {
            inner: stream,
            count: Arc::clone(&count),
        };
        debug!(path, "copying from old backend");
        self.new
            .write_stream(path, Box::new(counted), &WriteOptions::default())?;
        let bytes = count.load(Ordering::Relaxed);

        self.remove_old_copy(path)?;
        info!(path, bytes, "migrated");
        Ok(MigrationOutcome::Migrated { bytes })
    }

    fn remove_old_copy(&self, path: &str) -> StorageResult<()> {
        match self.old.delete(path) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => {
                warn!(path, error = %e, "object is in the new backend but its old copy could not be removed");
                Err(StorageError::OrphanedSource {
                    path: path.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}

impl<O: StorageBackend, N: StorageBackend> StorageBackend for MigrationRouter<O, N> {
    fn file_exists(&self, path: &str) -> StorageResult<bool> {
        self.ensure_migrated(path)?;
        self.new.file_exists(path)
    }

    fn directory_exists(&self, path: &str) -> StorageResult<bool> {
        if !self.old.directory_exists(path)? {
            return self.new.directory_exists(path);
        }
        if !self.new.directory_exists(path)? {
            self.new.create_directory(path, &WriteOptions::default())?;
        }
        self.old.delete_directory(path)?;
        info!(path, "migrated directory");
        Ok(true)
    }

    fn write(&self, path: &str, contents: &[u8], options: &WriteOptions) -> StorageResult<()> {
        self.ensure_migrated(path)?;
        self.new.write(path, contents, options)
    }

    fn write_stream(&self, path: &str, contents: ReadStream, options: &WriteOptions) -> StorageResult<()> {
        self.ensure_migrated(path)?;
        self.new.write_stream(path, contents, options)
    }

    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.ensure_migrated(path)?;
        self.new.read(path)
    }

    fn read_stream(&self, path: &str) -> StorageResult<ReadStream> {
        self.ensure_migrated(path)?;
        self.new.read_stream(path)
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        if self.old.file_exists(path)? {
            self.old.delete(path)?;
        }
        self.new.delete(path)
    }

    fn delete_directory(&self, path: &str) -> StorageResult<()> {
        if self.old.directory_exists(path)? {
            self.old.delete_directory(path)?;
        }
        self.new.delete_directory(path)
    }

    fn create_directory(&self, path: &str, options: &WriteOptions) -> StorageResult<()> {
        self.new.create_directory(path, options)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StorageResult<()> {
        self.ensure_migrated(path)?;
        self.new.set_visibility(path, visibility)
    }

    fn visibility(&self, path: &str) -> StorageResult<FileAttributes> {
        self.ensure_migrated(path)?;
        self.new.visibility(path)
    }

    fn mime_type(&self, path: &str) -> StorageResult<FileAttributes> {
        self.ensure_migrated(path)?;
        self.new.mime_type(path)
    }

    fn last_modified(&self, path: &str) -> StorageResult<FileAttributes> {
        self.ensure_migrated(path)?;
        self.new.last_modified(path)
    }

    fn file_size(&self, path: &str) -> StorageResult<FileAttributes> {
        self.ensure_migrated(path)?;
        self.new.file_size(path)
    }

    fn list_contents<'a>(&'a self, path: &str, deep: bool) -> StorageResult<Listing<'a>> {
        let old = self.old.list_contents(path, deep)?;
        Ok(Box::new(MergedListing::new(old, &self.new, path, deep)))
    }

    fn move_file(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
        self.ensure_migrated(source)?;
        self.ensure_migrated(destination)?;
        self.new.move_file(source, destination, options)
    }

    fn copy(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
        self.ensure_migrated(source)?;
        self.ensure_migrated(destination)?;
        self.new.copy(source, destination, options)
    }
}
