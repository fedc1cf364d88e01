//! Integration tests for the dirmeta metadata engine.
//!
//! Each test builds an isolated fixture tree in a tempdir, runs the engine
//! over it the way a directory scanner would (one batch timestamp, parent
//! status hint, collation-sorted output), and checks the resulting records.

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::PathBuf;
use std::sync::Arc;

use dirmeta::config::{ChoicesStore, FilerConfig};
use dirmeta::core::{
    BaseType, DirItem, DirItemEngine, ItemFlags, RecentRef, StatSource, StaticMountOracle,
    SystemStatSource, SystemXattrProbe,
};
use dirmeta::icons::{GlobIconTable, IconCache, IconOverride, IconResolver, NoIconOverride};
use dirmeta::mime::{MimeClassifier, MimeDb};
use dirmeta::utils::test_helpers::setup_test_logging;
use tempfile::TempDir;

/// Contains the test infrastructure.
mod helpers {
    use super::*;

    /// `TestHarness` sets up a complete, isolated engine over a tempdir.
    pub struct TestHarness {
        pub engine: DirItemEngine,
        pub mime: Arc<MimeDb>,
        pub icons: Arc<IconCache>,
        pub root: PathBuf,
        _temp_dir: TempDir,
    }

    impl TestHarness {
        pub fn new() -> Self {
            Self::build(|_| Box::new(NoIconOverride))
        }

        /// An engine whose icon policy is a glob-pattern override table.
        pub fn with_globicons(entries: &[(&str, &str)]) -> Self {
            Self::build(|icons| {
                let table =
                    GlobIconTable::from_entries(entries.iter().copied(), icons).expect("globicons");
                Box::new(table)
            })
        }

        fn build(
            hook: impl FnOnce(&IconCache) -> Box<dyn IconOverride + Send + Sync>,
        ) -> Self {
            setup_test_logging();
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let mime = Arc::new(MimeDb::new());
            let icons = Arc::new(IconCache::new());
            let hook = hook(&icons);
            let engine = DirItemEngine::new(
                Box::new(SystemStatSource),
                Arc::new(StaticMountOracle::default()),
                Box::new(SystemXattrProbe),
                mime.clone(),
                icons.clone(),
                hook,
            );
            Self {
                engine,
                mime,
                icons,
                root: temp_dir.path().to_path_buf(),
                _temp_dir: temp_dir,
            }
        }

        /// Creates a file inside the temporary fixture tree.
        pub fn create_file(&self, rel: &str, contents: &[u8]) -> PathBuf {
            let path = self.root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            fs::write(&path, contents).expect("Failed to write file");
            path
        }

        pub fn create_executable(&self, rel: &str, contents: &[u8]) -> PathBuf {
            let path = self.create_file(rel, contents);
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to chmod");
            path
        }

        /// Rescans a single entry the way the scanner would.
        pub fn restat(&self, rel: &str) -> DirItem {
            let path = self.root.join(rel);
            let leaf = path.file_name().unwrap().to_string_lossy().into_owned();
            let mut item = DirItem::new(leaf);
            let parent = SystemStatSource.link_status(&self.root).ok();
            self.engine
                .restat(&path, &mut item, parent.as_ref(), RecentRef::now());
            item
        }

        /// Rescans every entry of the fixture root, sorted by collation key.
        pub fn scan(&self) -> Vec<DirItem> {
            let parent = SystemStatSource.link_status(&self.root).ok();
            let now = RecentRef::now();
            let mut items: Vec<DirItem> = fs::read_dir(&self.root)
                .expect("read_dir")
                .map(|entry| {
                    let entry = entry.expect("dir entry");
                    let mut item =
                        DirItem::new(entry.file_name().to_string_lossy().into_owned());
                    self.engine
                        .restat(&entry.path(), &mut item, parent.as_ref(), now);
                    item
                })
                .collect();
            items.sort_by(|a, b| a.collate_key().cmp(b.collate_key()));
            items
        }
    }
}

#[test]
fn scan_classifies_a_project_tree() {
    // --- ARRANGE ---
    let harness = helpers::TestHarness::new();
    harness.create_file("README.md", b"# readme");
    harness.create_file("notes.txt", b"plain text");
    harness.create_executable("run", b"#!/bin/sh\necho ok\n");
    fs::create_dir(harness.root.join("src")).unwrap();
    symlink(harness.root.join("src"), harness.root.join("src-link")).unwrap();

    // --- ACT ---
    let items = harness.scan();

    // --- ASSERT ---
    let names: Vec<&str> = items.iter().map(|i| i.leafname()).collect();
    assert_eq!(names, vec!["notes.txt", "README.md", "run", "src", "src-link"]);

    let by_name = |leaf: &str| items.iter().find(|i| i.leafname() == leaf).unwrap();

    assert_eq!(by_name("README.md").base_type, BaseType::File);
    assert_eq!(by_name("src").base_type, BaseType::Directory);
    assert!(by_name("src").mime_type.is_some());

    let link = by_name("src-link");
    assert_eq!(link.base_type, BaseType::Directory);
    assert!(link.flags.contains(ItemFlags::SYMLINK));

    let script = by_name("run");
    assert!(script.flags.contains(ItemFlags::EXEC_FILE));
    assert!(Arc::ptr_eq(
        script.mime_type.as_ref().unwrap(),
        &harness.mime.sentinels().shell_script
    ));

    // Everything in one batch was recomputed against the same clock, and a
    // freshly written tree is uniformly recent.
    assert!(items.iter().all(|i| i.flags.contains(ItemFlags::RECENT)));
}

#[test]
fn executable_binary_without_extension_is_an_executable() {
    let harness = helpers::TestHarness::new();
    harness.create_executable("prog", b"\x00\xfe\xba\xad\xf0\x0d");

    let item = harness.restat("prog");

    assert!(item.flags.contains(ItemFlags::EXEC_FILE));
    assert!(Arc::ptr_eq(
        item.mime_type.as_ref().unwrap(),
        &harness.mime.sentinels().executable
    ));
}

#[test]
fn missing_entries_surface_as_error_rows() {
    let harness = helpers::TestHarness::new();

    let mut item = harness.restat("never-created");

    assert_eq!(item.base_type, BaseType::Error);
    assert_ne!(item.lstat_errno, 0);
    assert!(item.mime_type.is_none());
    assert_eq!((item.uid, item.gid), (u32::MAX, u32::MAX));

    // Error rows render with the shared sentinel icon.
    let icon = harness.engine.image(&mut item);
    assert!(Arc::ptr_eq(&icon, &harness.icons.error_icon()));
}

#[test]
fn globicon_override_beats_the_eager_desktop_preview() {
    // --- ARRANGE ---
    let harness = helpers::TestHarness::with_globicons(&[
        ("**/*.desktop", "emblem-special"),
        ("**/*.iso", "media-optical"),
    ]);
    harness.create_file(
        "app.desktop",
        b"[Desktop Entry]\nName=App\nIcon=applications-games\n",
    );
    harness.create_file("disc.iso", b"\x00binary");

    // --- ACT ---
    let desktop = harness.restat("app.desktop");
    let disc = harness.restat("disc.iso");

    // --- ASSERT ---
    // The override hook ran first, so the eager preview never fired.
    assert_eq!(desktop.cached_image().unwrap().name(), "emblem-special");
    assert!(desktop.flags.contains(ItemFlags::EXEC_FILE));

    // The hook also fires for files that are not desktop entries.
    assert_eq!(disc.cached_image().unwrap().name(), "media-optical");
}

#[test]
fn desktop_entry_preview_is_keyed_by_the_entry_path() {
    let harness = helpers::TestHarness::new();
    harness.create_file(
        "games/solitaire.desktop",
        b"[Desktop Entry]\nName=Solitaire\nIcon=applications-games\n",
    );

    let item = harness.restat("games/solitaire.desktop");
    assert_eq!(item.cached_image().unwrap().name(), "applications-games");
}

#[test]
fn dropping_items_releases_their_icon_references() {
    // --- ARRANGE ---
    let harness = helpers::TestHarness::new();
    harness.create_file("a.txt", b"a");
    harness.create_file("b.txt", b"b");

    let mut a = harness.restat("a.txt");
    let mut b = harness.restat("b.txt");

    // --- ACT ---
    let handle = harness.engine.image(&mut a);
    let same = harness.engine.image(&mut b);

    // --- ASSERT ---
    assert!(Arc::ptr_eq(&handle, &same));
    let while_cached = Arc::strong_count(&handle);

    drop(a);
    drop(b);
    drop(same);
    // Only the cache's own entry and our probe handle remain.
    assert_eq!(Arc::strong_count(&handle), while_cached - 3);
}

#[test]
fn engine_system_wiring_loads_choices_backed_overrides() {
    // --- ARRANGE ---
    setup_test_logging();
    let sandbox = tempfile::tempdir().unwrap();
    let xdg = sandbox.path().join("xdg");
    fs::create_dir_all(xdg.join("dirmeta")).unwrap();
    fs::write(
        xdg.join("dirmeta/globicons.json"),
        r#"{"**/*.backup": "document-save"}"#,
    )
    .unwrap();

    let choices = ChoicesStore::with_dirs(vec![sandbox.path().join("legacy")], vec![xdg]);
    let config = FilerConfig::load(&choices).unwrap();
    let engine = DirItemEngine::system(&choices, &config);

    let data = sandbox.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("notes.backup"), b"saved").unwrap();

    // --- ACT ---
    let mut item = DirItem::new("notes.backup");
    engine.restat(
        &data.join("notes.backup"),
        &mut item,
        None,
        config.recent_ref(),
    );

    // --- ASSERT ---
    assert_eq!(item.base_type, BaseType::File);
    assert_eq!(item.cached_image().unwrap().name(), "document-save");
}

#[test]
fn rescan_batches_share_one_recency_reference() {
    // --- ARRANGE ---
    let harness = helpers::TestHarness::new();
    let path = harness.create_file("aging.txt", b"x");
    let status = SystemStatSource.link_status(&path).unwrap();
    let newest = status.mtime.max(status.ctime);

    // --- ACT / ASSERT ---
    // The same item flips between recent and stale purely as a function of
    // the caller-supplied reference, never of the wall clock.
    let mut item = DirItem::new("aging.txt");
    harness
        .engine
        .restat(&path, &mut item, None, RecentRef::at(newest + 299));
    assert!(item.flags.contains(ItemFlags::RECENT));

    harness
        .engine
        .restat(&path, &mut item, None, RecentRef::at(newest + 301));
    assert!(!item.flags.contains(ItemFlags::RECENT));
}

#[test]
fn broken_symlinks_keep_link_level_identity() {
    let harness = helpers::TestHarness::new();
    symlink(
        harness.root.join("gone"),
        harness.root.join("dangling"),
    )
    .unwrap();

    let item = harness.restat("dangling");

    assert_eq!(item.base_type, BaseType::Error);
    assert!(item.flags.contains(ItemFlags::SYMLINK));
    assert_eq!(item.lstat_errno, 0);
    assert!(item.mime_type.is_none());
}

#[test]
fn choices_resolution_and_listing_agree_on_priority() {
    // --- ARRANGE ---
    setup_test_logging();
    let sandbox = tempfile::tempdir().unwrap();
    let user = sandbox.path().join("user");
    let system = sandbox.path().join("system");
    for root in [&user, &system] {
        fs::create_dir_all(root.join("dirmeta")).unwrap();
        fs::write(root.join("dirmeta/options"), b"x").unwrap();
    }
    let choices = ChoicesStore::with_dirs(vec![], vec![user.clone(), system.clone()]);

    // --- ACT ---
    let load = choices.find_xdg_load_path("options", "dirmeta", None);
    let listed = choices.list_xdg_dirs("dirmeta", None);

    // --- ASSERT ---
    assert_eq!(load, Some(user.join("dirmeta/options")));
    assert_eq!(listed, vec![user.join("dirmeta"), system.join("dirmeta")]);

    let mut seen = HashSet::new();
    for dir in listed {
        assert!(seen.insert(dir), "roots must stay distinct");
    }
}

#[test]
fn collation_orders_a_numbered_series_naturally() {
    let harness = helpers::TestHarness::new();
    for name in ["page2.html", "page10.html", "Page1.html", ".index"] {
        harness.create_file(name, b"x");
    }

    let names: Vec<String> = harness
        .scan()
        .iter()
        .map(|i| i.leafname().to_string())
        .collect();
    assert_eq!(names, vec![".index", "Page1.html", "page2.html", "page10.html"]);
}
