//! Wraps the platform's file-status queries.
//!
//! The engine distinguishes link-status (no symlink traversal) from
//! target-status (traversal); both produce the same raw attribute record or
//! a plain `io::Error` whose OS code the engine stores on the item.

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::BaseType;

/// Raw file attributes as returned by a single status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Device number, used for the mount-point fallback check.
    pub dev: u64,
    pub atime: i64,
    pub ctime: i64,
    pub mtime: i64,
}

impl FileStatus {
    pub fn from_metadata(md: &fs::Metadata) -> Self {
        Self {
            size: md.size(),
            mode: md.mode(),
            uid: md.uid(),
            gid: md.gid(),
            dev: md.dev(),
            atime: md.atime(),
            ctime: md.ctime(),
            mtime: md.mtime(),
        }
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & (libc::S_IFMT as u32) == libc::S_IFLNK as u32
    }

    /// Any of the owner/group/other execute bits.
    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }

    pub fn base_type(&self) -> BaseType {
        mode_to_base_type(self.mode)
    }
}

/// Classifies a raw `st_mode` into an entry kind.
pub fn mode_to_base_type(mode: u32) -> BaseType {
    match mode & (libc::S_IFMT as u32) {
        m if m == libc::S_IFREG as u32 => BaseType::File,
        m if m == libc::S_IFDIR as u32 => BaseType::Directory,
        m if m == libc::S_IFIFO as u32 => BaseType::Pipe,
        m if m == libc::S_IFSOCK as u32 => BaseType::Socket,
        m if m == libc::S_IFBLK as u32 => BaseType::BlockDevice,
        m if m == libc::S_IFCHR as u32 => BaseType::CharDevice,
        _ => BaseType::Unknown,
    }
}

/// Abstraction over the status syscalls, so tests and foreign hosts can
/// substitute their own source of attributes.
pub trait StatSource {
    /// Status of the entry itself; symlinks are not followed.
    fn link_status(&self, path: &Path) -> io::Result<FileStatus>;

    /// Status of the entry's target; symlinks are followed.
    fn target_status(&self, path: &Path) -> io::Result<FileStatus>;

    /// The real (symlink-free) path, or `None` if resolution fails.
    fn resolve(&self, path: &Path) -> Option<PathBuf>;
}

/// The production stat source: blocking `lstat`/`stat`/`realpath` via std.
#[derive(Debug, Default)]
pub struct SystemStatSource;

impl StatSource for SystemStatSource {
    fn link_status(&self, path: &Path) -> io::Result<FileStatus> {
        fs::symlink_metadata(path).map(|md| FileStatus::from_metadata(&md))
    }

    fn target_status(&self, path: &Path) -> io::Result<FileStatus> {
        fs::metadata(path).map(|md| FileStatus::from_metadata(&md))
    }

    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        fs::canonicalize(path).ok()
    }
}
