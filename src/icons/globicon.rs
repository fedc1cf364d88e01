//! Per-path icon overrides.
//!
//! Hosts can give individual files or whole pattern families a custom icon
//! (a `globicons.json` map of glob pattern to icon-theme name, resolved
//! through the choices layer). The table is consulted on every rescan via
//! the [`IconOverride`] hook; when several patterns match a path, the
//! later entry wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use super::{IconCache, IconHandle, IconOverride};
use crate::core::diritem::DirItem;
use crate::core::error::CoreError;

#[derive(Debug)]
pub struct GlobIconTable {
    set: GlobSet,
    icons: Vec<IconHandle>,
}

impl GlobIconTable {
    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            icons: Vec::new(),
        }
    }

    /// Loads a pattern→icon-name map from a JSON file.
    pub fn load(path: &Path, cache: &IconCache) -> Result<Self, CoreError> {
        let contents =
            fs::read_to_string(path).map_err(|e| CoreError::Io(e, path.to_path_buf()))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        let table = Self::from_entries(
            entries.iter().map(|(p, i)| (p.as_str(), i.as_str())),
            cache,
        )?;
        tracing::info!("loaded {} icon overrides from {:?}", table.icons.len(), path);
        Ok(table)
    }

    /// Builds a table from `(pattern, icon_name)` pairs. Unparsable
    /// patterns are skipped with a warning so one bad entry doesn't take
    /// the whole table down.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
        cache: &IconCache,
    ) -> Result<Self, CoreError> {
        let mut builder = GlobSetBuilder::new();
        let mut icons = Vec::new();
        for (pattern, icon_name) in entries {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    icons.push(cache.named(icon_name));
                }
                Err(e) => {
                    tracing::warn!("skipping icon override pattern {:?}: {}", pattern, e);
                }
            }
        }
        Ok(Self {
            set: builder.build()?,
            icons,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

impl IconOverride for GlobIconTable {
    fn maybe_assign_icon(&self, path: &Path, item: &mut DirItem) {
        if let Some(&idx) = self.set.matches(path).last() {
            item.set_image(self.icons[idx].clone());
        }
    }
}
