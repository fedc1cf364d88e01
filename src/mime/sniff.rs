//! First-bytes text probe for files the extension tables don't cover.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const PROBE_LEN: usize = 1024;

/// Reads the head of the file and decides whether it looks textual.
///
/// `Some(true)` means text, `Some(false)` binary, `None` unreadable.
/// An empty file counts as text.
pub(crate) fn probe_text(path: &Path) -> Option<bool> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut buffer = [0u8; PROBE_LEN];
    let bytes_read = reader.read(&mut buffer).ok()?;

    if bytes_read == 0 {
        return Some(true);
    }
    if buffer[..bytes_read].contains(&0) {
        return Some(false);
    }
    Some(std::str::from_utf8(&buffer[..bytes_read]).is_ok())
}
