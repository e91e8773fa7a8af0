//! Logging setup and diagnostics helpers
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=structedit::edit=trace` - module-level filtering
//!
//! # Log Files
//!
//! Logs are written to `~/.config/structedit/logs/structedit.log` with daily rotation.
//! File logging uses debug level by default for more verbose troubleshooting.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config_paths::LOG_FILE_PREFIX;
use crate::store::{Sel, SelId, TextStore};

/// Initialize tracing subscriber with console and file logging
///
/// Console output goes to stderr so it never mixes with program output,
/// and respects RUST_LOG (default `warn`).
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    // File layer - always debug level for troubleshooting
    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Lightweight snapshot of a store's registered selections for diffing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub revision: u64,
    pub len: usize,
    pub sels: Vec<(SelId, Sel)>,
}

impl SelectionSnapshot {
    pub fn from_store(store: &TextStore) -> Self {
        Self {
            revision: store.revision(),
            len: store.len(),
            sels: store.sels().snapshot(),
        }
    }

    /// Generate a diff description between two snapshots
    pub fn diff(&self, other: &SelectionSnapshot) -> Option<String> {
        let mut changes = Vec::new();

        if self.revision != other.revision {
            changes.push(format!(
                "revision {} -> {}, length {} -> {}",
                self.revision, other.revision, self.len, other.len
            ));
        }

        if self.sels.len() != other.sels.len() {
            changes.push(format!(
                "selection count: {} -> {}",
                self.sels.len(),
                other.sels.len()
            ));
        }

        for (id, before) in &self.sels {
            let after = other
                .sels
                .iter()
                .find(|(other_id, _)| other_id == id)
                .map(|(_, sel)| *sel);
            match after {
                Some(after) if after != *before => {
                    changes.push(format!("{:?}: {} -> {}", id, before, after));
                }
                None => changes.push(format!("{:?}: removed", id)),
                _ => {}
            }
        }

        if changes.is_empty() {
            None
        } else {
            Some(changes.join("; "))
        }
    }
}
