//! Where structedit keeps its files.
//!
//! `config.yaml` (engine settings and highlight rules) and the `logs/`
//! directory live in `$XDG_CONFIG_HOME/structedit`, falling back to
//! `~/.config/structedit`, or in `%APPDATA%\structedit` on Windows.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "structedit";

/// Prefix of the daily rotated log files
pub const LOG_FILE_PREFIX: &str = "structedit.log";

pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// The engine configuration, highlight rules included
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// Creates the log directory if needed and returns it
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let base = config_dir().ok_or_else(|| "No config directory available".to_string())?;
    create_logs_dir(&base)
}

fn create_logs_dir(base: &Path) -> Result<PathBuf, String> {
    let logs = base.join("logs");
    fs::create_dir_all(&logs)
        .map_err(|e| format!("Failed to create directory {}: {}", logs.display(), e))?;
    Ok(logs)
}
