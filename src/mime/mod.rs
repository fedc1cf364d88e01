//! MIME-type classification and interning.
//!
//! Classified types are interned process-wide: two classifications of the
//! same type name yield pointer-equal handles, so the engine (and the
//! executable-override rules in particular) can compare types by identity
//! instead of by string.

mod sniff;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::core::BaseType;

/// A shared, interned handle to a content-classification identifier.
pub type MimeHandle = Arc<MimeType>;

/// A `media/subtype` pair. Instances live in the interning table for the
/// whole process; compare handles with `Arc::ptr_eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType {
    media: String,
    subtype: String,
}

impl MimeType {
    pub fn media(&self) -> &str {
        &self.media
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media, self.subtype)
    }
}

/// The well-known types the engine's override rules compare against.
#[derive(Debug, Clone)]
pub struct MimeSentinels {
    pub plain_text: MimeHandle,
    pub octet_stream: MimeHandle,
    pub executable: MimeHandle,
    pub shell_script: MimeHandle,
    pub desktop_entry: MimeHandle,
}

/// Path-to-type classification as consumed by the directory-item engine.
pub trait MimeClassifier {
    /// Classify a path, or `None` when no determination could be made
    /// (typically an unreadable file).
    fn classify(&self, path: &Path) -> Option<MimeHandle>;

    fn sentinels(&self) -> &MimeSentinels;

    /// The generic fallback type for entries that carry no sniffed type.
    fn generic_for(&self, base: BaseType) -> MimeHandle;
}

/// The production classifier: extension lookup, then a content probe.
pub struct MimeDb {
    interned: Mutex<HashMap<String, MimeHandle>>,
    sentinels: MimeSentinels,
}

impl MimeDb {
    pub fn new() -> Self {
        let mut map = HashMap::new();
        let mut seed = |name: &str| -> MimeHandle {
            let handle = Arc::new(parse_type(name));
            map.insert(name.to_string(), handle.clone());
            handle
        };
        let sentinels = MimeSentinels {
            plain_text: seed("text/plain"),
            octet_stream: seed("application/octet-stream"),
            executable: seed("application/x-executable"),
            shell_script: seed("application/x-shellscript"),
            desktop_entry: seed("application/x-desktop"),
        };
        for generic in [
            "inode/directory",
            "inode/fifo",
            "inode/socket",
            "inode/blockdevice",
            "inode/chardevice",
            "inode/door",
        ] {
            seed(generic);
        }
        Self {
            interned: Mutex::new(map),
            sentinels,
        }
    }

    /// Returns the process-wide handle for a type name, creating it on
    /// first use. Entries are immutable once interned.
    pub fn intern(&self, name: &str) -> MimeHandle {
        let mut map = self.interned.lock().unwrap();
        if let Some(handle) = map.get(name) {
            return handle.clone();
        }
        let handle = Arc::new(parse_type(name));
        map.insert(name.to_string(), handle.clone());
        handle
    }
}

impl Default for MimeDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeClassifier for MimeDb {
    fn classify(&self, path: &Path) -> Option<MimeHandle> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            // Desktop entries are recognised by name even when the guess
            // table doesn't know them.
            if ext.eq_ignore_ascii_case("desktop") {
                return Some(self.sentinels.desktop_entry.clone());
            }
            if let Some(raw) = mime_guess::from_path(path).first_raw() {
                return Some(self.intern(raw));
            }
        }

        // Unknown or missing extension: probe the first bytes, then hand
        // binary data to the magic-number sniffer.
        match sniff::probe_text(path) {
            Some(true) => Some(self.sentinels.plain_text.clone()),
            Some(false) => match tree_magic_mini::from_filepath(path) {
                Some(name) if name != "application/octet-stream" => Some(self.intern(name)),
                _ => Some(self.sentinels.octet_stream.clone()),
            },
            None => None,
        }
    }

    fn sentinels(&self) -> &MimeSentinels {
        &self.sentinels
    }

    fn generic_for(&self, base: BaseType) -> MimeHandle {
        match base {
            BaseType::Directory => self.intern("inode/directory"),
            BaseType::Pipe => self.intern("inode/fifo"),
            BaseType::Socket => self.intern("inode/socket"),
            BaseType::BlockDevice => self.intern("inode/blockdevice"),
            BaseType::CharDevice => self.intern("inode/chardevice"),
            BaseType::Door => self.intern("inode/door"),
            BaseType::File => self.sentinels.plain_text.clone(),
            BaseType::Unknown | BaseType::Error => self.sentinels.octet_stream.clone(),
        }
    }
}

fn parse_type(name: &str) -> MimeType {
    match name.split_once('/') {
        Some((media, subtype)) if !media.is_empty() && !subtype.is_empty() => MimeType {
            media: media.to_string(),
            subtype: subtype.to_string(),
        },
        _ => MimeType {
            media: "application".to_string(),
            subtype: name.to_string(),
        },
    }
}
