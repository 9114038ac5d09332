//! Atomic stream write:
//! - Streams into a hidden temp file in the destination directory (fsynced)
//! - Atomically renames temp -> dest
//! - Removes the temp file on any failure, so a partial write is never visible at `dest`
//! - An optional hook runs on the empty temp file before any data lands in it
//!   (used to restrict permissions before contents exist anywhere)

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use super::atomic::try_atomic_move;
use super::helpers::io_error_with_help_io;
use super::io_copy::{copy_stream_into, DurabilityMode};
use super::util::unique_temp_path;

/// Write `reader` to `dest`, replacing any existing file. Returns bytes written.
pub fn atomic_write_stream(reader: &mut dyn Read, dest: &Path) -> io::Result<u64> {
    atomic_write_stream_with(reader, dest, |_| Ok(()))
}

/// Like [`atomic_write_stream`], calling `prepare` on the freshly created temp
/// file before it is filled and renamed into place.
pub fn atomic_write_stream_with<F>(reader: &mut dyn Read, dest: &Path, prepare: F) -> io::Result<u64>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let dest_dir = dest.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("destination has no parent: {}", dest.display()),
        )
    })?;
    fs::create_dir_all(dest_dir).map_err(io_error_with_help_io("create destination directory", dest_dir))?;

    let tmp_path = unique_temp_path(dest_dir);
    let tmp_file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(io_error_with_help_io("create temporary file", &tmp_path))?;
    let copied = match prepare(&tmp_path).and_then(|()| copy_stream_into(reader, tmp_file, DurabilityMode::Full)) {
        Ok(res) => res,
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error_with_help_io("copy to temporary file", &tmp_path)(e));
        }
    };

    if let Err(e) = try_atomic_move(&tmp_path, dest) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(copied.bytes)
}

/// Copy the file at `src` to `dest` through a temp file.
pub fn atomic_copy_file(src: &Path, dest: &Path) -> io::Result<u64> {
    let mut f = fs::File::open(src).map_err(io_error_with_help_io("open source", src))?;
    atomic_write_stream(&mut f, dest)
}
