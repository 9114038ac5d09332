//! Storage backend capability set.
//!
//! Every backend (and the migration router itself) implements [`StorageBackend`].
//!
//! Contract:
//! - `file_exists` / `directory_exists` answer `Ok(false)` for absence; all other
//!   path-addressed reads report absence as [`StorageError::NotFound`].
//! - `delete` / `delete_directory` on an absent path succeed.
//! - Writes create missing parent directories and replace existing content.
//! - Listings of a missing directory are empty; entry paths are full logical paths.
//!
//! [`StorageError::NotFound`]: crate::errors::StorageError::NotFound

pub mod local;
pub mod memory;
pub mod mime;
pub mod path;
mod types;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use types::{
    DirectoryAttributes, FileAttributes, Listing, ReadStream, StorageEntry, Visibility,
    WriteOptions,
};

use std::sync::Arc;

use crate::errors::StorageResult;

pub trait StorageBackend: Send + Sync {
    fn file_exists(&self, path: &str) -> StorageResult<bool>;

    fn directory_exists(&self, path: &str) -> StorageResult<bool>;

    fn write(&self, path: &str, contents: &[u8], options: &WriteOptions) -> StorageResult<()>;

    /// Write from a stream. The backend owns `contents` and drops it before returning.
    fn write_stream(
        &self,
        path: &str,
        contents: ReadStream,
        options: &WriteOptions,
    ) -> StorageResult<()>;

    fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    fn read_stream(&self, path: &str) -> StorageResult<ReadStream>;

    fn delete(&self, path: &str) -> StorageResult<()>;

    /// Recursively delete a directory.
    fn delete_directory(&self, path: &str) -> StorageResult<()>;

    fn create_directory(&self, path: &str, options: &WriteOptions) -> StorageResult<()>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> StorageResult<()>;

    fn visibility(&self, path: &str) -> StorageResult<FileAttributes>;

    fn mime_type(&self, path: &str) -> StorageResult<FileAttributes>;

    fn last_modified(&self, path: &str) -> StorageResult<FileAttributes>;

    fn file_size(&self, path: &str) -> StorageResult<FileAttributes>;

    fn list_contents<'a>(&'a self, path: &str, deep: bool) -> StorageResult<Listing<'a>>;

    fn move_file(&self, source: &str, destination: &str, options: &WriteOptions)
    -> StorageResult<()>;

    fn copy(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()>;
}

macro_rules! forward_storage_backend {
    ($wrapper:ident) => {
        impl<T: StorageBackend + ?Sized> StorageBackend for $wrapper<T> {
            fn file_exists(&self, path: &str) -> StorageResult<bool> {
                (**self).file_exists(path)
            }
            fn directory_exists(&self, path: &str) -> StorageResult<bool> {
                (**self).directory_exists(path)
            }
            fn write(&self, path: &str, contents: &[u8], options: &WriteOptions) -> StorageResult<()> {
                (**self).write(path, contents, options)
            }
            fn write_stream(
                &self,
                path: &str,
                contents: ReadStream,
                options: &WriteOptions,
            ) -> StorageResult<()> {
                (**self).write_stream(path, contents, options)
            }
            fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
                (**self).read(path)
            }
            fn read_stream(&self, path: &str) -> StorageResult<ReadStream> {
                (**self).read_stream(path)
            }
            fn delete(&self, path: &str) -> StorageResult<()> {
                (**self).delete(path)
            }
            fn delete_directory(&self, path: &str) -> StorageResult<()> {
                (**self).delete_directory(path)
            }
            fn create_directory(&self, path: &str, options: &WriteOptions) -> StorageResult<()> {
                (**self).create_directory(path, options)
            }
            fn set_visibility(&self, path: &str, visibility: Visibility) -> StorageResult<()> {
                (**self).set_visibility(path, visibility)
            }
            fn visibility(&self, path: &str) -> StorageResult<FileAttributes> {
                (**self).visibility(path)
            }
            fn mime_type(&self, path: &str) -> StorageResult<FileAttributes> {
                (**self).mime_type(path)
            }
            fn last_modified(&self, path: &str) -> StorageResult<FileAttributes> {
                (**self).last_modified(path)
            }
            fn file_size(&self, path: &str) -> StorageResult<FileAttributes> {
                (**self).file_size(path)
            }
            fn list_contents<'a>(&'a self, path: &str, deep: bool) -> StorageResult<Listing<'a>> {
                (**self).list_contents(path, deep)
            }
            fn move_file(
                &self,
                source: &str,
                destination: &str,
                options: &WriteOptions,
            ) -> StorageResult<()> {
                (**self).move_file(source, destination, options)
            }
            fn copy(&self, source: &str, destination: &str, options: &WriteOptions) -> StorageResult<()> {
                (**self).copy(source, destination, options)
            }
        }
    };
}

forward_storage_backend!(Arc);
forward_storage_backend!(Box);
