//! MIME type detection by extension, falling back to a text/binary sniff.

const BY_EXTENSION: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
];

const SNIFF_LEN: usize = 1024;

/// Guess a MIME type from the path's extension, else from the first bytes.
pub fn guess(path: &str, head: &[u8]) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    if let Some((_, ext)) = name.rsplit_once('.') {
        let ext = ext.to_ascii_lowercase();
        if let Some((_, mime)) = BY_EXTENSION.iter().find(|(e, _)| *e == ext) {
            return *mime;
        }
    }
    let head = &head[..head.len().min(SNIFF_LEN)];
    if head.is_empty() {
        return "application/x-empty";
    }
    // A multi-byte char cut at the sniff boundary still counts as text.
    let text = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > head.len(),
    };
    if text && !head.contains(&0) {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

pub(crate) const HEAD_LEN: usize = SNIFF_LEN;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_wins() {
        assert_eq!(guess("a/b/photo.JPG", b""), "image/jpeg");
        assert_eq!(guess("doc.json", b"\x00\x01"), "application/json");
    }

    #[test]
    fn sniff_without_known_extension() {
        assert_eq!(guess("README", b"hello"), "text/plain");
        assert_eq!(guess("blob.bin", b"\x00\xff\x10"), "application/octet-stream");
        assert_eq!(guess("empty", b""), "application/x-empty");
    }
}
