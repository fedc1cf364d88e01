use anyhow::Result;
use std::path::PathBuf;

use dirmeta::config::{ChoicesStore, FilerConfig};
use dirmeta::core::{DirItem, DirItemEngine, ItemFlags, StatSource, SystemStatSource};

/// Prints a classified listing of one directory: the engine's view of what
/// a file manager would render.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let root = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".".to_string()));

    let choices = ChoicesStore::from_env();
    let config = FilerConfig::load(&choices).unwrap_or_default();
    let engine = DirItemEngine::system(&choices, &config);

    // One timestamp for the whole batch, so every row agrees on "recent".
    let now = config.recent_ref();
    let parent = SystemStatSource.link_status(&root).ok();

    let mut items = Vec::new();
    for entry in std::fs::read_dir(&root)? {
        let entry = entry?;
        let mut item = DirItem::new(entry.file_name().to_string_lossy().into_owned());
        engine.restat(&entry.path(), &mut item, parent.as_ref(), now);
        items.push(item);
    }
    items.sort_by(|a, b| a.collate_key().cmp(b.collate_key()));

    for item in &mut items {
        let icon = engine.image(item);
        let mime = item
            .mime_type
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("(errno {})", item.lstat_errno));
        println!(
            "{:>10}  {:<12} {:<28} {:<26} {}{}",
            item.size,
            format!("{:?}", item.base_type),
            mime,
            icon.name(),
            item.leafname(),
            flag_tags(item),
        );
    }
    Ok(())
}

fn flag_tags(item: &DirItem) -> String {
    let mut out = String::new();
    for (flag, tag) in [
        (ItemFlags::SYMLINK, " [link]"),
        (ItemFlags::MOUNT_POINT, " [mount]"),
        (ItemFlags::MOUNTED, " [mounted]"),
        (ItemFlags::EXEC_FILE, " [exec]"),
        (ItemFlags::RECENT, " [recent]"),
        (ItemFlags::HAS_XATTR, " [xattr]"),
    ] {
        if item.flags.contains(flag) {
            out.push_str(tag);
        }
    }
    out
}
