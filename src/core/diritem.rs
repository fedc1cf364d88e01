//! The directory-item metadata engine.
//!
//! Turns a raw filesystem path into a classified, cached, displayable item
//! record: symlink resolution, MIME classification, executable detection,
//! mount-point detection and recency tagging, tolerating partial failure
//! (missing files, permission errors, broken symlinks) without corrupting
//! the record or leaking cached icon references.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::mount::{MountOracle, SystemMountTable};
use super::stat::{FileStatus, StatSource, SystemStatSource};
use super::xattr::{SystemXattrProbe, XattrProbe};
use super::{BaseType, ItemFlags};
use crate::config::{ChoicesStore, FilerConfig, APP_DIR};
use crate::icons::{GlobIconTable, IconCache, IconHandle, IconOverride, IconResolver};
use crate::mime::{MimeClassifier, MimeDb, MimeHandle};
use crate::utils::collate::CollateKey;

/// Time in seconds to consider a file recent.
pub const RECENT_WINDOW_SECS: i64 = 5 * 60;

/// `uid`/`gid` value stored when the entry could not be stat'ed.
const UNKNOWN_ID: u32 = u32::MAX;

/// The wall-clock reference for "recent" tagging.
///
/// Captured once by the caller and passed to every `restat` in a batch, so
/// a whole listing agrees on what "now" means even when the rescan spans a
/// perceptible time.
#[derive(Debug, Clone, Copy)]
pub struct RecentRef {
    now: i64,
    window: i64,
}

impl RecentRef {
    /// The current wall clock with the default window.
    pub fn now() -> Self {
        Self::at(chrono::Utc::now().timestamp())
    }

    /// An explicit reference point (seconds since the epoch).
    pub fn at(now: i64) -> Self {
        Self {
            now,
            window: RECENT_WINDOW_SECS,
        }
    }

    pub fn with_window(now: i64, window: i64) -> Self {
        Self { now, window }
    }

    fn about_now(&self, t: i64) -> bool {
        self.now - t < self.window
    }
}

/// One filesystem entry as displayed in a directory listing.
#[derive(Debug, Clone)]
pub struct DirItem {
    leafname: String,
    leafname_collate: CollateKey,
    pub base_type: BaseType,
    pub mime_type: Option<MimeHandle>,
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub ctime: i64,
    pub mtime: i64,
    /// Failure code from the last status query, 0 on success.
    pub lstat_errno: i32,
    pub flags: ItemFlags,
    image: Option<IconHandle>,
    /// Transient rescan marker owned by the caller, not the engine.
    pub may_delete: bool,
}

impl DirItem {
    /// A fresh, never-scanned item. Pure in-memory construction.
    pub fn new(leafname: impl Into<String>) -> Self {
        let leafname = leafname.into();
        let leafname_collate = CollateKey::new(&leafname);
        Self {
            leafname,
            leafname_collate,
            base_type: BaseType::Unknown,
            mime_type: None,
            size: 0,
            mode: 0,
            uid: UNKNOWN_ID,
            gid: UNKNOWN_ID,
            atime: 0,
            ctime: 0,
            mtime: 0,
            lstat_errno: 0,
            flags: ItemFlags::NEED_RESCAN,
            image: None,
            may_delete: false,
        }
    }

    pub fn leafname(&self) -> &str {
        &self.leafname
    }

    /// Renames the item, regenerating the collation key.
    pub fn set_leafname(&mut self, leafname: impl Into<String>) {
        self.leafname = leafname.into();
        self.leafname_collate = CollateKey::new(&self.leafname);
    }

    pub fn collate_key(&self) -> &CollateKey {
        &self.leafname_collate
    }

    /// The icon cached on this item, if one has been resolved or assigned.
    pub fn cached_image(&self) -> Option<&IconHandle> {
        self.image.as_ref()
    }

    /// Assigns a custom icon. Called by icon-override hooks during a
    /// rescan; any previously held handle is released.
    pub fn set_image(&mut self, image: IconHandle) {
        self.image = Some(image);
    }
}

/// Orchestrates the stat source, mount oracle, xattr probe, MIME
/// classifier and icon resolver into [`DirItem`] records.
pub struct DirItemEngine {
    stat: Box<dyn StatSource + Send + Sync>,
    mounts: Arc<dyn MountOracle + Send + Sync>,
    xattr: Box<dyn XattrProbe + Send + Sync>,
    mime: Arc<dyn MimeClassifier + Send + Sync>,
    icons: Arc<dyn IconResolver + Send + Sync>,
    override_hook: Box<dyn IconOverride + Send + Sync>,
    eager_desktop_icons: bool,
}

impl DirItemEngine {
    pub fn new(
        stat: Box<dyn StatSource + Send + Sync>,
        mounts: Arc<dyn MountOracle + Send + Sync>,
        xattr: Box<dyn XattrProbe + Send + Sync>,
        mime: Arc<dyn MimeClassifier + Send + Sync>,
        icons: Arc<dyn IconResolver + Send + Sync>,
        override_hook: Box<dyn IconOverride + Send + Sync>,
    ) -> Self {
        Self {
            stat,
            mounts,
            xattr,
            mime,
            icons,
            override_hook,
            eager_desktop_icons: true,
        }
    }

    pub fn with_eager_desktop_icons(mut self, eager: bool) -> Self {
        self.eager_desktop_icons = eager;
        self
    }

    /// The production wiring: system stat/mount/xattr sources, a fresh
    /// MIME db and icon cache, and the user's icon overrides resolved
    /// through the choices layer.
    pub fn system(choices: &ChoicesStore, config: &FilerConfig) -> Self {
        let mounts = Arc::new(SystemMountTable::new());
        if let Err(e) = mounts.refresh() {
            tracing::warn!("mount table unavailable: {}", e);
        }

        let icons = Arc::new(IconCache::new());
        let overrides: Box<dyn IconOverride + Send + Sync> =
            match choices.find_xdg_load_path(&config.globicons_leaf, APP_DIR, None) {
                Some(path) => match GlobIconTable::load(&path, &icons) {
                    Ok(table) => Box::new(table),
                    Err(e) => {
                        tracing::warn!("ignoring icon overrides: {}", e);
                        Box::new(GlobIconTable::empty())
                    }
                },
                None => Box::new(GlobIconTable::empty()),
            };

        Self::new(
            Box::new(SystemStatSource),
            mounts,
            Box::new(SystemXattrProbe),
            Arc::new(MimeDb::new()),
            icons,
            overrides,
        )
        .with_eager_desktop_icons(config.eager_desktop_icons)
    }

    /// Brings the item's record up to date from the filesystem.
    ///
    /// `parent` is an optional status hint for the containing directory;
    /// it saves one status query inside the mount oracle. `now` is the
    /// batch timestamp for recency tagging; capture it once per listing.
    ///
    /// Query failures never propagate: they are recorded in
    /// `lstat_errno`/`base_type` and classification stops there.
    pub fn restat(
        &self,
        path: &Path,
        item: &mut DirItem,
        parent: Option<&FileStatus>,
        now: RecentRef,
    ) {
        item.image = None;
        item.flags = ItemFlags::empty();
        item.mime_type = None;

        let info = match self.stat.link_status(path) {
            Err(err) => {
                item.lstat_errno = err.raw_os_error().unwrap_or(libc::EIO);
                item.base_type = BaseType::Error;
                item.size = 0;
                item.mode = 0;
                item.atime = 0;
                item.ctime = 0;
                item.mtime = 0;
                item.uid = UNKNOWN_ID;
                item.gid = UNKNOWN_ID;
                return;
            }
            Ok(info) => info,
        };

        item.lstat_errno = 0;
        item.size = info.size;
        item.mode = info.mode;
        item.atime = info.atime;
        item.ctime = info.ctime;
        item.mtime = info.mtime;
        item.uid = info.uid;
        item.gid = info.gid;
        if now.about_now(item.mtime) || now.about_now(item.ctime) {
            item.flags |= ItemFlags::RECENT;
        }
        if self.xattr.has_any(path) {
            item.flags |= ItemFlags::HAS_XATTR;
        }

        // For symlinks every mode-derived decision below follows the
        // target, and the mount lookup needs the real path.
        let mut target_info = info;
        let mut resolved: Option<PathBuf> = None;
        if info.is_symlink() {
            item.flags |= ItemFlags::SYMLINK;
            match self.stat.target_status(path) {
                Ok(target) => {
                    item.base_type = target.base_type();
                    target_info = target;
                }
                Err(_) => item.base_type = BaseType::Error,
            }
            resolved = self.stat.resolve(path);
        } else {
            item.base_type = info.base_type();
        }
        let is_symlink = item.flags.contains(ItemFlags::SYMLINK);
        let target_path: &Path = resolved.as_deref().unwrap_or(path);

        if item.base_type == BaseType::Directory {
            // The parent hint describes the link's parent, not the
            // target's, so it only applies to non-symlinks.
            let parent_hint = if is_symlink { None } else { parent };
            if self
                .mounts
                .is_active_mount(target_path, &target_info, parent_hint)
            {
                item.flags |= ItemFlags::MOUNT_POINT | ItemFlags::MOUNTED;
            } else if self.mounts.is_known_static_mount(target_path) {
                item.flags |= ItemFlags::MOUNT_POINT;
            }
        }

        if item.base_type == BaseType::File {
            item.mime_type = self.mime.classify(target_path);

            let sentinels = self.mime.sentinels().clone();
            if target_info.is_executable() {
                // The flag is set for all executable files; the type is
                // only forced when the sniffed one gives no better answer.
                item.flags |= ItemFlags::EXEC_FILE;
                let forced = match &item.mime_type {
                    None => Some(sentinels.executable.clone()),
                    Some(t) if Arc::ptr_eq(t, &sentinels.octet_stream) => {
                        Some(sentinels.executable.clone())
                    }
                    Some(t)
                        if Arc::ptr_eq(t, &sentinels.plain_text)
                            && !item.leafname.contains('.') =>
                    {
                        Some(sentinels.shell_script.clone())
                    }
                    Some(_) => None,
                };
                if forced.is_some() {
                    item.mime_type = forced;
                }
            } else if matches!(&item.mime_type, Some(t) if Arc::ptr_eq(t, &sentinels.desktop_entry))
            {
                item.flags |= ItemFlags::EXEC_FILE;
            }

            if item.mime_type.is_none() {
                item.mime_type = Some(sentinels.plain_text.clone());
            }

            self.override_hook.maybe_assign_icon(path, item);

            // The one eager exception: desktop entries resolve their
            // preview now, keyed by the link path, unless an override
            // already supplied an icon.
            if self.eager_desktop_icons
                && item.cached_image().is_none()
                && matches!(&item.mime_type, Some(t) if Arc::ptr_eq(t, &sentinels.desktop_entry))
            {
                item.image = self.icons.desktop_preview(path);
            }
        } else if item.base_type != BaseType::Error {
            self.override_hook.maybe_assign_icon(path, item);
        }

        if item.mime_type.is_none() && item.base_type != BaseType::Error {
            item.mime_type = Some(self.mime.generic_for(item.base_type));
        }
    }

    /// The item's display icon, resolved on first request and cached on
    /// the item. Idempotent for an unchanged item: repeated calls return
    /// the cached handle without touching the resolver.
    pub fn image(&self, item: &mut DirItem) -> IconHandle {
        if let Some(image) = &item.image {
            return image.clone();
        }
        let handle = if item.base_type == BaseType::Error {
            self.icons.error_icon()
        } else {
            match &item.mime_type {
                Some(mime) => self.icons.resolve(mime),
                None => self.icons.resolve(&self.mime.generic_for(item.base_type)),
            }
        };
        item.image = Some(handle.clone());
        handle
    }
}
