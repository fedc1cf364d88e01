pub mod diritem;
pub mod error;
pub mod mount;
pub mod stat;
pub mod xattr;

use bitflags::bitflags;

/// The filesystem entry kind, independent of content.
///
/// `Error` means the last status query failed; `Unknown` means the item has
/// been created but never rescanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Unknown,
    Error,
    File,
    Directory,
    Pipe,
    Socket,
    BlockDevice,
    CharDevice,
    /// Solaris door. Never produced by the system stat source on Linux.
    Door,
}

bitflags! {
    /// Per-item state bits maintained by the engine during a rescan.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ItemFlags: u32 {
        /// The entry is a symbolic link; mode-derived fields reflect the
        /// link's target.
        const SYMLINK = 1 << 0;
        /// The entry appears in the mount table (active or static).
        const MOUNT_POINT = 1 << 1;
        /// A filesystem is currently attached here.
        const MOUNTED = 1 << 2;
        /// The extended-attribute probe reported at least one attribute.
        const HAS_XATTR = 1 << 3;
        /// mtime or ctime falls within the recency window of the batch
        /// timestamp supplied to `restat`.
        const RECENT = 1 << 4;
        /// An execute-permission bit is set on the resolved file, or the
        /// entry is a desktop file.
        const EXEC_FILE = 1 << 5;
        /// Freshly created, not yet rescanned.
        const NEED_RESCAN = 1 << 6;
    }
}

pub use diritem::{DirItem, DirItemEngine, RecentRef, RECENT_WINDOW_SECS};
pub use error::CoreError;
pub use mount::{MountOracle, StaticMountOracle, SystemMountTable};
pub use stat::{FileStatus, StatSource, SystemStatSource};
pub use xattr::{SystemXattrProbe, XattrProbe};
