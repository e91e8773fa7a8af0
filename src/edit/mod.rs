//! Structural editing language.
//!
//! Programs are sam/acme style: an address selects a range of the store,
//! a command letter acts on it. `x`, `y`, `g` and `v` run a nested command
//! over the matches of a regex, which is how most non-trivial edits are
//! written:
//!
//! ```text
//! ,x/\w+/ g/al/ c/malkovitch/
//! ```

pub mod addr;
mod exec;
pub mod parse;

use std::fmt;
use std::path::Path;

pub use self::addr::Addr;
pub use self::exec::Interpreter;
pub use self::parse::{parse, parse_address, Cmd, CmdKind};

use crate::regex::RegexError;
use crate::store::{Sel, StoreError, TextStore};
use crate::tracing::SelectionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Malformed program
    Parse(String),
    Regex(RegexError),
    /// Address that can not be evaluated
    Address(String),
    /// A regex address found nothing, even after wrapping around
    NoMatch(String),
    /// `\N` in a replacement names a group the pattern doesn't have
    BadBackreference(usize),
    Store(StoreError),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::Parse(msg) => write!(f, "parse error: {}", msg),
            EditError::Regex(e) => write!(f, "{}", e),
            EditError::Address(msg) => write!(f, "address error: {}", msg),
            EditError::NoMatch(pattern) => write!(f, "no match found for: {}", pattern),
            EditError::BadBackreference(n) => write!(f, "nonexistent backreference \\{}", n),
            EditError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EditError {}

impl From<RegexError> for EditError {
    fn from(e: RegexError) -> Self {
        EditError::Regex(e)
    }
}

impl From<StoreError> for EditError {
    fn from(e: StoreError) -> Self {
        EditError::Store(e)
    }
}

/// What the interpreter needs from the application around it
pub trait EditEnv {
    /// User-visible warning (failed jobs, unreadable files)
    fn warn(&mut self, msg: &str);

    /// Output of `p`, `=` and `>`
    fn print(&mut self, text: &str) {
        self.warn(text);
    }

    /// Runs `command` through the shell in `dir` with `input` on stdin and
    /// returns its stdout
    fn run_job(&mut self, dir: &Path, command: &str, input: &str) -> Result<String, String>;

    /// Log every executed command, not just the program
    fn trace_edits(&self) -> bool {
        false
    }
}

/// Parses and runs `program` against `store`.
///
/// `dot` is the starting selection and is updated to where the program
/// leaves it. All edits made by one call form a single undo step.
pub fn interpret(
    program: &str,
    store: &mut TextStore,
    dot: &mut Sel,
    env: &mut dyn EditEnv,
) -> Result<(), EditError> {
    let cmd = parse(program)?;
    tracing::debug!("Running edit program {:?} on {} at {}", program, store.name(), dot);

    let id = store.add_sel(*dot);
    let before = tracing::enabled!(tracing::Level::DEBUG)
        .then(|| SelectionSnapshot::from_store(store));
    let trace = env.trace_edits();
    let result = Interpreter::new(store, env).trace_edits(trace).run(&cmd, id);
    if let Some(diff) = before.and_then(|b| b.diff(&SelectionSnapshot::from_store(store))) {
        tracing::debug!("Program changed {}: {}", store.name(), diff);
    }
    if let Some(sel) = store.remove_sel(id) {
        *dot = sel;
    }
    result
}

/// Evaluates an address on its own
pub fn eval_address(text: &str, store: &TextStore, dot: Sel) -> Result<Sel, EditError> {
    parse_address(text)?.eval(store, dot)
}
