//! Layered resolution of user/system preference files.
//!
//! Preference files are looked up across two root lists: the XDG base
//! directories (`$XDG_CONFIG_HOME`, then each entry of `$XDG_CONFIG_DIRS`)
//! and a legacy list kept for configurations that predate the XDG scheme.
//! Earlier roots take priority; saving always targets the first root of
//! the relevant list.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const LEGACY_SYSTEM_DIRS: [&str; 2] = ["/usr/local/share/Choices", "/usr/share/Choices"];
const DEFAULT_XDG_CONFIG_DIRS: &str = "/etc/xdg";

/// The search-root table, built once at startup and immutable thereafter.
#[derive(Debug, Clone)]
pub struct ChoicesStore {
    saving_disabled: bool,
    legacy_dirs: Vec<PathBuf>,
    xdg_dirs: Vec<PathBuf>,
}

impl ChoicesStore {
    /// Builds the root lists from the environment.
    ///
    /// XDG roots: `$XDG_CONFIG_HOME` (default `~/.config`) followed by the
    /// colon-separated entries of `$XDG_CONFIG_DIRS` (default `/etc/xdg`).
    /// Legacy roots: `~/Choices`, then the fixed system locations.
    pub fn from_env() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));

        let mut legacy_dirs = vec![home.join("Choices")];
        legacy_dirs.extend(LEGACY_SYSTEM_DIRS.iter().map(PathBuf::from));

        let mut xdg_dirs = Vec::new();
        match env::var("XDG_CONFIG_HOME") {
            Ok(value) if !value.is_empty() => xdg_dirs.push(PathBuf::from(value)),
            _ => xdg_dirs.push(home.join(".config")),
        }
        let config_dirs = match env::var("XDG_CONFIG_DIRS") {
            Ok(value) if !value.is_empty() => value,
            _ => DEFAULT_XDG_CONFIG_DIRS.to_string(),
        };
        xdg_dirs.extend(
            config_dirs
                .split(':')
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from),
        );

        Self {
            saving_disabled: false,
            legacy_dirs,
            xdg_dirs,
        }
    }

    /// Builds a store over explicit root lists. Used by tests and by hosts
    /// that sandbox their configuration.
    pub fn with_dirs(legacy_dirs: Vec<PathBuf>, xdg_dirs: Vec<PathBuf>) -> Self {
        Self {
            saving_disabled: false,
            legacy_dirs,
            xdg_dirs,
        }
    }

    /// Globally disables (or re-enables) saving; the save-path queries
    /// return `None` while disabled.
    pub fn set_saving_disabled(&mut self, disabled: bool) {
        self.saving_disabled = disabled;
    }

    /// The path of an existing `dir/leaf` file in the legacy roots,
    /// highest priority first.
    pub fn find_load_path(&self, leaf: &str, dir: &str) -> Option<PathBuf> {
        self.legacy_dirs
            .iter()
            .map(|root| root.join(dir).join(leaf))
            .find(|path| exists(path))
    }

    /// The path of an existing `[site/]dir/leaf` file in the XDG roots,
    /// falling back to the legacy search.
    pub fn find_xdg_load_path(&self, leaf: &str, dir: &str, site: Option<&str>) -> Option<PathBuf> {
        self.xdg_dirs
            .iter()
            .map(|root| join_site(root, site, dir).join(leaf))
            .find(|path| exists(path))
            .or_else(|| self.find_load_path(leaf, dir))
    }

    /// A path to save `dir/leaf` under the primary legacy root, or `None`
    /// when saving is disabled or no root exists.
    ///
    /// With `create`, intermediate directories are made best-effort:
    /// failures are logged and the path is still returned, so the caller's
    /// own write reports the real error.
    pub fn find_save_path(&self, leaf: &str, dir: &str, create: bool) -> Option<PathBuf> {
        if self.saving_disabled {
            return None;
        }
        let root = self.legacy_dirs.first()?;
        if create {
            create_dir_best_effort(root);
        }
        let parent = root.join(dir);
        if create {
            create_dir_best_effort(&parent);
        }
        Some(parent.join(leaf))
    }

    /// A path to save `[site/]dir/leaf` under the primary XDG root, or
    /// `None` when saving is disabled or no root exists.
    pub fn find_xdg_save_path(
        &self,
        leaf: &str,
        dir: &str,
        site: Option<&str>,
        create: bool,
    ) -> Option<PathBuf> {
        if self.saving_disabled {
            return None;
        }
        let root = self.xdg_dirs.first()?;
        if create {
            create_dir_best_effort(root);
        }
        let mut parent = root.clone();
        if let Some(site) = site {
            parent.push(site);
            if create {
                create_dir_best_effort(&parent);
            }
        }
        parent.push(dir);
        if create {
            create_dir_best_effort(&parent);
        }
        Some(parent.join(leaf))
    }

    /// The existing `[site/]dir` directories across the XDG roots, highest
    /// priority first.
    pub fn list_xdg_dirs(&self, dir: &str, site: Option<&str>) -> Vec<PathBuf> {
        self.xdg_dirs
            .iter()
            .map(|root| join_site(root, site, dir))
            .filter(|path| exists(path))
            .collect()
    }
}

fn join_site(root: &Path, site: Option<&str>, dir: &str) -> PathBuf {
    match site {
        Some(site) => root.join(site).join(dir),
        None => root.join(dir),
    }
}

fn exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

fn create_dir_best_effort(path: &Path) {
    if exists(path) {
        return;
    }
    if let Err(e) = fs::create_dir(path) {
        tracing::warn!("mkdir({:?}): {}", path, e);
    }
}
