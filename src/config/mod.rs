pub mod choices;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::core::diritem::{RecentRef, RECENT_WINDOW_SECS};

pub use choices::ChoicesStore;

/// Directory under the search roots that holds this application's files.
pub const APP_DIR: &str = "dirmeta";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilerConfig {
    /// Seconds after modification during which an entry is tagged recent.
    pub recent_window_secs: i64,
    /// Resolve desktop-entry preview icons during the rescan instead of on
    /// first display.
    pub eager_desktop_icons: bool,
    /// Leaf name of the per-path icon-override table.
    pub globicons_leaf: String,
}

impl Default for FilerConfig {
    fn default() -> Self {
        Self {
            recent_window_secs: RECENT_WINDOW_SECS,
            eager_desktop_icons: true,
            globicons_leaf: "globicons.json".to_string(),
        }
    }
}

impl FilerConfig {
    /// Loads the configuration through the choices layer.
    ///
    /// A missing file writes the defaults (best-effort) and returns them;
    /// a corrupt file logs a warning and falls back to the defaults so a
    /// bad edit never prevents startup.
    pub fn load(choices: &ChoicesStore) -> Result<Self> {
        let Some(path) = choices.find_xdg_load_path(CONFIG_FILE, APP_DIR, None) else {
            tracing::info!("no config file found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save(choices) {
                tracing::warn!("could not write default config: {}", e);
            }
            return Ok(config);
        };

        let contents = fs::read_to_string(&path)?;
        match serde_json::from_str::<Self>(&contents) {
            Ok(config) => {
                tracing::info!("loaded config from {:?}", path);
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    "failed to parse config at {:?}: {}. Falling back to defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Saves the configuration through the choices layer, creating
    /// intermediate directories as needed.
    pub fn save(&self, choices: &ChoicesStore) -> Result<()> {
        let path = choices
            .find_xdg_save_path(CONFIG_FILE, APP_DIR, None, true)
            .ok_or_else(|| anyhow::anyhow!("saving is disabled"))?;
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        tracing::info!("saved config to {:?}", path);
        Ok(())
    }

    /// The batch timestamp for one listing's recency tagging, using the
    /// configured window.
    pub fn recent_ref(&self) -> RecentRef {
        RecentRef::with_window(chrono::Utc::now().timestamp(), self.recent_window_secs)
    }
}
