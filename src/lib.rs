//! structedit - structural regular-expression editing engine
//!
//! A gap-buffer text store with live selections and grouped undo, a
//! Pike-VM regex engine that matches in both directions, and the sam/acme
//! address and command language built on top of them.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod edit;
pub mod highlight;
pub mod regex;
pub mod store;
pub mod tracing;
pub mod undo;

// Re-export commonly used types
pub use config::EngineConfig;
pub use edit::{eval_address, interpret, EditEnv, EditError};
pub use regex::{Regex, RegexError};
pub use store::{Sel, SelId, StoreError, TextStore};
pub use undo::UndoLog;
