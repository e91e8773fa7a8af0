//! Engine configuration persistence
//!
//! Stores settings in `~/.config/structedit/config.yaml`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::highlight::{default_rules, LanguageRules};
use crate::store::file::MAX_FILE_SIZE;
use crate::undo::TYPING_INTERVAL;

/// Stores larger than this don't get their word list rebuilt on load
pub const WORDS_LIMIT: usize = 1024 * 1024;

/// Engine configuration that persists across sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window in which consecutive typed characters form one undo step
    #[serde(default = "default_typing_interval_ms")]
    pub typing_interval_ms: u64,

    /// Files larger than this (in bytes) are refused
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Word list recomputation limit, in characters
    #[serde(default = "default_words_limit")]
    pub words_limit: usize,

    /// Region highlighting rules, matched against file names
    #[serde(default = "default_rules")]
    pub highlight: Vec<LanguageRules>,

    /// Log every executed edit command at debug level
    #[serde(default)]
    pub trace_edits: bool,
}

fn default_typing_interval_ms() -> u64 {
    TYPING_INTERVAL.as_millis() as u64
}

fn default_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

fn default_words_limit() -> usize {
    WORDS_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            typing_interval_ms: default_typing_interval_ms(),
            max_file_size: default_max_file_size(),
            words_limit: default_words_limit(),
            highlight: default_rules(),
            trace_edits: false,
        }
    }
}

impl EngineConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }
}
