//! Mount-point detection.
//!
//! The mount oracle answers two questions about a resolved directory path:
//! is a filesystem attached here right now, and is this a statically
//! configured mount location (fstab) that merely *could* be mounted.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::error::CoreError;
use super::stat::FileStatus;

const MOUNTS_PATH: &str = "/proc/self/mounts";
const FSTAB_PATH: &str = "/etc/fstab";

/// Mount-point queries consumed by the directory-item engine.
pub trait MountOracle {
    /// Whether `path` currently has a filesystem attached.
    ///
    /// `parent` is an optional status hint for the containing directory; a
    /// device-number mismatch against it detects mounts that the table
    /// missed, without an extra status query.
    fn is_active_mount(
        &self,
        path: &Path,
        status: &FileStatus,
        parent: Option<&FileStatus>,
    ) -> bool;

    /// Whether `path` is a configured (fstab) mount location, mounted or not.
    fn is_known_static_mount(&self, path: &Path) -> bool;
}

#[derive(Debug, Default)]
struct MountSets {
    active: HashSet<PathBuf>,
    fstab: HashSet<PathBuf>,
}

/// The production oracle: a snapshot of the kernel mount table plus the
/// static fstab entries.
///
/// The snapshot is explicit state: call [`refresh`](Self::refresh) before
/// rescanning a listing to pick up mount activity.
#[derive(Debug, Default)]
pub struct SystemMountTable {
    sets: Mutex<MountSets>,
}

impl SystemMountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-reads the active mount table and fstab.
    ///
    /// A missing fstab is normal and leaves the static set empty; a failure
    /// to read the active table is reported and leaves the previous
    /// snapshot in place.
    pub fn refresh(&self) -> Result<(), CoreError> {
        self.refresh_from(Path::new(MOUNTS_PATH), Path::new(FSTAB_PATH))
    }

    /// Like [`refresh`](Self::refresh) but from explicit table files.
    pub fn refresh_from(&self, mounts: &Path, fstab: &Path) -> Result<(), CoreError> {
        let contents = fs::read_to_string(mounts)
            .map_err(|e| CoreError::Io(e, mounts.to_path_buf()))?;
        let active = parse_mount_points(&contents);

        let fstab_set = match fs::read_to_string(fstab) {
            Ok(contents) => parse_mount_points(&contents),
            Err(e) => {
                tracing::debug!("no usable fstab at {:?}: {}", fstab, e);
                HashSet::new()
            }
        };

        let mut sets = self.sets.lock().unwrap();
        tracing::debug!(
            "mount table refreshed: {} active, {} static",
            active.len(),
            fstab_set.len()
        );
        sets.active = active;
        sets.fstab = fstab_set;
        Ok(())
    }
}

impl MountOracle for SystemMountTable {
    fn is_active_mount(
        &self,
        path: &Path,
        status: &FileStatus,
        parent: Option<&FileStatus>,
    ) -> bool {
        if self.sets.lock().unwrap().active.contains(path) {
            return true;
        }
        // A directory sitting on a different device than its parent is a
        // mount point even if the table snapshot is stale.
        match parent {
            Some(parent) => status.dev != parent.dev,
            None => false,
        }
    }

    fn is_known_static_mount(&self, path: &Path) -> bool {
        self.sets.lock().unwrap().fstab.contains(path)
    }
}

/// An oracle answering from fixed sets. Backs deterministic tests and
/// hosts that manage their own mount bookkeeping.
#[derive(Debug, Default)]
pub struct StaticMountOracle {
    pub active: HashSet<PathBuf>,
    pub fstab: HashSet<PathBuf>,
}

impl MountOracle for StaticMountOracle {
    fn is_active_mount(
        &self,
        path: &Path,
        _status: &FileStatus,
        _parent: Option<&FileStatus>,
    ) -> bool {
        self.active.contains(path)
    }

    fn is_known_static_mount(&self, path: &Path) -> bool {
        self.fstab.contains(path)
    }
}

/// Extracts the mount-point column from fstab/mtab-format contents.
fn parse_mount_points(contents: &str) -> HashSet<PathBuf> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter(|field| field.starts_with('/'))
        .map(|field| PathBuf::from(decode_mount_escapes(field)))
        .collect()
}

/// Decodes the `\040`-style octal escapes the kernel uses for whitespace
/// in mount paths.
fn decode_mount_escapes(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut consumed = String::new();
        while consumed.len() < 3 {
            match chars.peek() {
                Some(&d) if d.is_digit(8) => {
                    consumed.push(d);
                    chars.next();
                }
                _ => break,
            }
        }
        match u32::from_str_radix(&consumed, 8)
            .ok()
            .filter(|_| consumed.len() == 3)
            .and_then(char::from_u32)
        {
            Some(decoded) => out.push(decoded),
            None => {
                // Not a 3-digit octal escape; keep the text as written.
                out.push('\\');
                out.push_str(&consumed);
            }
        }
    }
    out
}
