//! Icon resolution and caching.
//!
//! Rendering is out of scope for this crate; an [`Icon`] is a resolved,
//! cacheable icon-theme name. What matters here is the cache behaviour the
//! engine depends on: one shared handle per key, a shared error sentinel,
//! and release-on-drop accounting via `Arc`.

pub mod globicon;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::diritem::DirItem;
use crate::mime::MimeHandle;

pub use globicon::GlobIconTable;

/// A reference-counted, shared icon entry.
pub type IconHandle = Arc<Icon>;

/// A resolved icon: a theme name the display layer can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    name: String,
}

impl Icon {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Icon lookup as consumed by the directory-item engine.
pub trait IconResolver {
    /// The icon for a MIME type. Repeated calls for the same type return
    /// the same shared handle.
    fn resolve(&self, mime: &MimeHandle) -> IconHandle;

    /// The shared sentinel shown for entries whose status query failed.
    fn error_icon(&self) -> IconHandle;

    /// The eagerly-cached preview for a desktop entry, keyed by the given
    /// (link) path. `None` when the entry is unreadable or names no icon.
    fn desktop_preview(&self, path: &Path) -> Option<IconHandle>;
}

/// A hook that may assign a custom per-path icon during a rescan.
pub trait IconOverride {
    fn maybe_assign_icon(&self, path: &Path, item: &mut DirItem);
}

/// The no-op override used when the host registers no icon policy.
#[derive(Debug, Default)]
pub struct NoIconOverride;

impl IconOverride for NoIconOverride {
    fn maybe_assign_icon(&self, _path: &Path, _item: &mut DirItem) {}
}

/// Oversized desktop entries are ignored rather than read.
const MAX_DESKTOP_ENTRY_SIZE: u64 = 400 * 1024;

/// The process-wide icon cache.
pub struct IconCache {
    by_name: Mutex<HashMap<String, IconHandle>>,
    previews: Mutex<HashMap<PathBuf, IconHandle>>,
    error: IconHandle,
    resolves: AtomicUsize,
}

impl IconCache {
    pub fn new() -> Self {
        Self {
            by_name: Mutex::new(HashMap::new()),
            previews: Mutex::new(HashMap::new()),
            error: Arc::new(Icon {
                name: "dialog-error".to_string(),
            }),
            resolves: AtomicUsize::new(0),
        }
    }

    /// The shared handle for an icon-theme name, created on first use.
    pub fn named(&self, name: &str) -> IconHandle {
        let mut map = self.by_name.lock().unwrap();
        if let Some(handle) = map.get(name) {
            return handle.clone();
        }
        let handle = Arc::new(Icon {
            name: name.to_string(),
        });
        map.insert(name.to_string(), handle.clone());
        handle
    }

    /// How many times `resolve` has been queried. Lets tests verify the
    /// engine's lazy accessor hits the resolver at most once per item.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::Relaxed)
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IconResolver for IconCache {
    fn resolve(&self, mime: &MimeHandle) -> IconHandle {
        self.resolves.fetch_add(1, Ordering::Relaxed);
        self.named(&format!("{}-{}", mime.media(), mime.subtype()))
    }

    fn error_icon(&self) -> IconHandle {
        self.error.clone()
    }

    fn desktop_preview(&self, path: &Path) -> Option<IconHandle> {
        if let Some(handle) = self.previews.lock().unwrap().get(path) {
            return Some(handle.clone());
        }
        let name = desktop_entry_icon(path)?;
        let handle = self.named(&name);
        self.previews
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), handle.clone());
        Some(handle)
    }
}

/// Pulls the `Icon=` key out of a desktop entry's main group.
fn desktop_entry_icon(path: &Path) -> Option<String> {
    let len = fs::metadata(path).ok()?.len();
    if len > MAX_DESKTOP_ENTRY_SIZE {
        tracing::debug!("desktop entry {:?} too large to scan ({} bytes)", path, len);
        return None;
    }
    let contents = fs::read_to_string(path).ok()?;

    let mut in_main_group = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_main_group = line == "[Desktop Entry]";
            continue;
        }
        if !in_main_group {
            continue;
        }
        if let Some(value) = line.strip_prefix("Icon=") {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
