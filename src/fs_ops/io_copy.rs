//! Streaming copy from any reader into a freshly created file.
//!
//! - The caller opens the destination (`create_new`), so an existing file is never clobbered.
//! - Buffered with 1 MiB buffers to reduce syscall count.
//! - `DurabilityMode::Full` fsyncs the file before returning.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

const BUF_SIZE: usize = 1024 * 1024;

/// Post-write flush behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Data reaches the OS page cache only.
    Data,
    /// Data and metadata forced to stable storage (`sync_all`).
    Full,
}

#[derive(Debug, Clone, Copy)]
pub struct CopyResult {
    pub bytes: u64,
    pub mode: DurabilityMode,
}

/// Copy `reader` into an already opened, empty file.
pub fn copy_stream_into(reader: &mut dyn Read, dst_f: File, mode: DurabilityMode) -> io::Result<CopyResult> {
    let mut reader = BufReader::with_capacity(BUF_SIZE, reader);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, dst_f);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;

    if mode == DurabilityMode::Full {
        writer.get_ref().sync_all()?;
    }

    Ok(CopyResult { bytes, mode })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::tempdir;

    fn create(dst: &Path) -> File {
        OpenOptions::new().write(true).create_new(true).open(dst).unwrap()
    }

    #[test]
    fn copies_reader_contents() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("dst.txt");
        let mut src = Cursor::new(b"hello world".to_vec());
        let res = copy_stream_into(&mut src, create(&dst), DurabilityMode::Full).unwrap();
        assert_eq!(res.bytes, 11);
        assert_eq!(fs::read(&dst).unwrap(), b"hello world");
    }

    #[test]
    fn zero_length_ok() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("empty");
        let res = copy_stream_into(&mut io::empty(), create(&dst), DurabilityMode::Data).unwrap();
        assert_eq!(res.bytes, 0);
        assert_eq!(fs::metadata(&dst).unwrap().len(), 0);
    }

    #[test]
    fn crosses_buffer_boundaries() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("big.out");
        let size = 2 * BUF_SIZE + 123;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let res = copy_stream_into(&mut Cursor::new(data.clone()), create(&dst), DurabilityMode::Data)
            .unwrap();
        assert_eq!(res.bytes as usize, size);
        assert_eq!(fs::read(&dst).unwrap(), data);
    }
}
