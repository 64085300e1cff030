//! Configuration file support for i3-autorename.
//!
//! Loads settings from ~/.config/i3-autorename/config.toml if it exists,
//! otherwise uses sensible defaults.

use serde::Deserialize;
use std::path::PathBuf;

use crate::label::LabelStyle;

/// Directory name under the user's config dir
const APP_DIR: &str = "i3-autorename";

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub labels: LabelConfig,
    pub store: StoreConfig,
    pub ipc: IpcConfig,
}

/// How workspace labels are rendered
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Appended after every icon
    pub separator: String,
    /// Shown for windows whose class has no icon
    pub fallback_icon: String,
    /// Placed between the workspace number and the first icon
    pub number_delimiter: String,
}

/// Icon database settings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database path (supports ~)
    pub path: Option<String>,
}

/// i3 connection settings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Socket path (supports ~); defaults to $I3SOCK or `i3 --get-socketpath`
    pub socket: Option<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let style = LabelStyle::default();
        Self {
            separator: style.separator,
            fallback_icon: style.fallback_icon,
            number_delimiter: style.number_delimiter,
        }
    }
}

impl Config {
    /// Load config from default path (~/.config/i3-autorename/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    fn app_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        Self::app_dir().join("config.toml")
    }

    /// Default icon database path
    pub fn default_db_path() -> PathBuf {
        Self::app_dir().join("i3-autorename.db")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Resolved label style
    pub fn label_style(&self) -> LabelStyle {
        LabelStyle {
            separator: self.labels.separator.clone(),
            fallback_icon: self.labels.fallback_icon.clone(),
            number_delimiter: self.labels.number_delimiter.clone(),
        }
    }

    /// Icon database path, tilde-expanded
    pub fn db_path(&self) -> PathBuf {
        match &self.store.path {
            Some(path) => expand(path),
            None => Self::default_db_path(),
        }
    }

    /// Configured socket path, tilde-expanded
    pub fn socket_path(&self) -> Option<PathBuf> {
        self.ipc.socket.as_deref().map(expand)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
