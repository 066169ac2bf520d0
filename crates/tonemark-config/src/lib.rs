use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Tone played on flagged lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagToneConfig {
    /// Note name, e.g. `e6` or `c#4`
    pub note: String,
    /// General MIDI program number
    pub instrument: u8,
}

impl Default for FlagToneConfig {
    fn default() -> Self {
        Self {
            note: "e6".to_string(),
            instrument: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding the flags of every document
    pub storage_path: PathBuf,
    /// Documents under this directory are named relative to it in cues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    pub tab_size: usize,
    pub hard_tabs: bool,
    pub flag_tone: FlagToneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("~/.local/share/tonemark/flags.json"),
            workspace_root: None,
            tab_size: 4,
            hard_tabs: false,
            flag_tone: FlagToneConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.expand_paths();

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// The config file if there is one, defaults otherwise.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_else(|| {
            let mut config = Self::default();
            config.expand_paths();
            config
        }))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/tonemark");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    // Tilde and environment variables in path fields
    fn expand_paths(&mut self) {
        if let Some(expanded) = Self::expand_path(&self.storage_path) {
            self.storage_path = expanded;
        }
        if let Some(root) = &self.workspace_root {
            self.workspace_root = Some(Self::expand_path(root).unwrap_or_else(|| root.clone()));
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
