//! Core library for `lazy_migrate`.
//!
//! A storage router that sits in front of two backends, an old one being
//! phased out and a new one being phased in, and moves every object from old
//! to new the first time it is touched. Callers keep using one
//! [`StorageBackend`] while data drains out of the old store with normal traffic.
//!
//! ```no_run
//! use lazy_migrate::prelude::*;
//!
//! let router = MigrationRouter::new(LocalBackend::new("/srv/old"), LocalBackend::new("/srv/new"));
//! let bytes = router.read("reports/2023.csv")?; // now lives under /srv/new only
//! # Ok::<(), StorageError>(())
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod router;

pub use backend::{
    DirectoryAttributes, FileAttributes, Listing, LocalBackend, MemoryBackend, ReadStream,
    StorageBackend, StorageEntry, Visibility, WriteOptions,
};
pub use config::{Config, LogLevel, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use errors::{Operation, StorageError, StorageResult};
pub use router::{DynRouter, MergedListing, MigrationOutcome, MigrationRouter};

pub mod prelude {
    pub use crate::backend::{
        FileAttributes, LocalBackend, MemoryBackend, StorageBackend, StorageEntry, Visibility,
        WriteOptions,
    };
    pub use crate::errors::{StorageError, StorageResult};
    pub use crate::router::{MigrationOutcome, MigrationRouter};
}
