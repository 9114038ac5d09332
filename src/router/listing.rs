//! Lazy union of two backend listings.

use std::collections::HashSet;

use crate::backend::{Listing, StorageBackend, StorageEntry};
use crate::errors::StorageResult;

/// Entries from `old` first, then entries from `new` whose path `old` did not yield.
///
/// The old listing is opened up front; the new one only once the old one is
/// exhausted, so nothing is buffered besides the set of paths already emitted.
pub struct MergedListing<'a, N: ?Sized> {
    old: Option<Listing<'a>>,
    new: NewHalf<'a, N>,
    seen: HashSet<String>,
}

enum NewHalf<'a, N: ?Sized> {
    Pending {
        backend: &'a N,
        path: String,
        deep: bool,
    },
    Open(Listing<'a>),
    Done,
}

impl<'a, N: StorageBackend + ?Sized> MergedListing<'a, N> {
    pub(crate) fn new(old: Listing<'a>, new: &'a N, path: &str, deep: bool) -> Self {
        Self {
            old: Some(old),
            new: NewHalf::Pending {
                backend: new,
                path: path.to_string(),
                deep,
            },
            seen: HashSet::new(),
        }
    }

    /// Paths emitted from the old listing so far.
    #[cfg(test)]
    fn seen(&self) -> usize {
        self.seen.len()
    }
}

impl<'a, N: StorageBackend + ?Sized> Iterator for MergedListing<'a, N> {
    type Item = StorageResult<StorageEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(old) = self.old.as_mut() {
            match old.next() {
                Some(Ok(entry)) => {
                    self.seen.insert(entry.path().to_string());
                    return Some(Ok(entry));
                }
                Some(Err(e)) => return Some(Err(e)),
                None => self.old = None,
            }
        }

        loop {
            match &mut self.new {
                NewHalf::Pending {
                    backend,
                    path,
                    deep,
                } => {
                    let backend: &'a N = *backend;
                    let (path, deep) = (std::mem::take(path), *deep);
                    match backend.list_contents(&path, deep) {
                        Ok(listing) => self.new = NewHalf::Open(listing),
                        Err(e) => {
                            self.new = NewHalf::Done;
                            return Some(Err(e));
                        }
                    }
                }
                NewHalf::Open(listing) => match listing.next() {
                    Some(Ok(entry)) if self.seen.contains(entry.path()) => continue,
                    Some(item) => return Some(item),
                    None => {
                        self.new = NewHalf::Done;
                        return None;
                    }
                },
                NewHalf::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileAttributes, MemoryBackend};
    use crate::errors::Operation;

    fn listing(paths: &[&str]) -> Listing<'static> {
        let entries: Vec<StorageResult<StorageEntry>> = paths
            .iter()
            .map(|p| Ok(StorageEntry::File(FileAttributes::new(*p))))
            .collect();
        Box::new(entries.into_iter())
    }

    #[test]
    fn old_entries_come_first_and_shadow_new_ones() {
        let new = MemoryBackend::new()
            .with_file("d/b", "new")
            .with_file("d/c", "new");
        let merged: Vec<String> = MergedListing::new(listing(&["d/b", "d/a"]), &new, "d", false)
            .map(|e| e.unwrap().path().to_string())
            .collect();
        assert_eq!(merged, vec!["d/b", "d/a", "d/c"]);
    }

    #[test]
    fn new_listing_is_opened_only_after_old_is_drained() {
        let new = MemoryBackend::new().with_file("d/x", "x");
        let mut merged = MergedListing::new(listing(&["d/a", "d/b"]), &new, "d", true);
        assert!(merged.next().is_some());
        assert_eq!(new.call_count(Operation::ListContents), 0);
        assert!(merged.next().is_some());
        assert_eq!(merged.seen(), 2);
        assert_eq!(merged.next().unwrap().unwrap().path(), "d/x");
        assert_eq!(new.calls_of(Operation::ListContents), vec!["d"]);
        assert!(merged.next().is_none());
    }

    #[test]
    fn failure_opening_new_listing_is_yielded_once() {
        let new = MemoryBackend::new();
        new.fail_on(Operation::ListContents, "d");
        let mut merged = MergedListing::new(listing(&["d/a"]), &new, "d", false);
        assert!(merged.next().unwrap().is_ok());
        assert!(merged.next().unwrap().is_err());
        assert!(merged.next().is_none());
    }
}
