use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

pub const PREFERENCES_ENV: &str = "FRONTIER_SELECT_PREFS";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Keep dropdowns open when the control loses focus.
    #[serde(alias = "ui.popup.disable_autohide")]
    pub disable_popup_autohide: bool,
    /// Debounce for re-snapshotting an open dropdown after a mutation.
    pub update_delay_ms: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            disable_popup_autohide: false,
            update_delay_ms: 0,
        }
    }
}

impl Preferences {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, PreferencesError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                if contents.trim().is_empty() {
                    return Ok(Self::default());
                }
                Ok(serde_yaml::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `$FRONTIER_SELECT_PREFS`, else `preferences.yaml` in the Frontier config dir.
    pub fn from_env() -> Result<Self, PreferencesError> {
        Self::load(preferences_path())
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }
}

fn preferences_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(PREFERENCES_ENV) {
        return Some(PathBuf::from(path));
    }

    ProjectDirs::from("org", "Frontier", "FrontierBrowser").map(|dirs| {
        let mut path = dirs.config_dir().to_path_buf();
        path.push("preferences.yaml");
        path
    })
}
