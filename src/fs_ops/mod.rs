//! Local filesystem durability helpers used by [`LocalBackend`](crate::backend::LocalBackend).

mod atomic;
mod helpers;
mod io_copy;
mod util;
mod write;

pub use atomic::try_atomic_move;
pub use helpers::{io_error_with_help, io_error_with_help_io};
pub use io_copy::{copy_stream_into, CopyResult, DurabilityMode};
pub use util::{fsync_dir, is_cross_device, is_temp_name, unique_temp_path, TEMP_PREFIX};
pub use write::{atomic_copy_file, atomic_write_stream, atomic_write_stream_with};
