//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.
//!
//! Edit fixtures use a marker syntax: `"uno\n<due>\ntre"` is the text
//! `"uno\ndue\ntre"` with dot selecting `due`. `<>` marks an empty dot.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use structedit::edit::{interpret, EditEnv, EditError};
use structedit::store::{EventOrigin, Sel, TextStore};

// ========================================================================
// Environment
// ========================================================================

/// [`EditEnv`] that records everything and never spawns processes
#[derive(Debug, Default)]
pub struct RecordingEnv {
    pub warnings: Vec<String>,
    pub printed: Vec<String>,
    /// `(dir, command, input)` of every job request
    pub jobs: Vec<(PathBuf, String, String)>,
    /// Answer given to job requests; `None` fails them
    pub job_output: Option<String>,
}

impl RecordingEnv {
    pub fn with_job_output(output: &str) -> Self {
        Self {
            job_output: Some(output.to_string()),
            ..Self::default()
        }
    }
}

impl EditEnv for RecordingEnv {
    fn warn(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn print(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }

    fn run_job(&mut self, dir: &Path, command: &str, input: &str) -> Result<String, String> {
        self.jobs
            .push((dir.to_path_buf(), command.to_string(), input.to_string()));
        self.job_output
            .clone()
            .ok_or_else(|| format!("{}: command not found", command))
    }
}

// ========================================================================
// Marker fixtures
// ========================================================================

/// Splits a marked string into its text and the marked selection
pub fn parse_marked(input: &str) -> (String, Sel) {
    let mut chars: Vec<char> = input.chars().collect();
    let start = chars
        .iter()
        .position(|&c| c == '<')
        .expect("fixture needs a '<' marker");
    chars.remove(start);
    let end = chars[start..]
        .iter()
        .position(|&c| c == '>')
        .map(|p| p + start)
        .expect("fixture needs a '>' marker after '<'");
    chars.remove(end);
    (chars.into_iter().collect(), Sel::new(start, end))
}

/// Scratch store holding `text`
pub fn store_with(text: &str) -> TextStore {
    let mut store = TextStore::scratch("Tag");
    let mut sel = Sel::point(0);
    store.replace(text, &mut sel, true, EventOrigin::Mouse);
    store
}

/// Store and dot built from a marked string
pub fn marked_store(input: &str) -> (TextStore, Sel) {
    let (text, sel) = parse_marked(input);
    (store_with(&text), sel)
}

/// Full content with `sel` drawn as markers
pub fn render(store: &TextStore, sel: Sel) -> String {
    let chars: Vec<char> = store.content().chars().collect();
    let mut out = String::with_capacity(chars.len() + 2);
    out.extend(&chars[..sel.start]);
    out.push('<');
    out.extend(&chars[sel.start..sel.end]);
    out.push('>');
    out.extend(&chars[sel.end..]);
    out
}

/// Runs `program` on a marked input and returns the marked result
pub fn try_edit(input: &str, program: &str) -> Result<String, EditError> {
    let (mut store, mut dot) = marked_store(input);
    let mut env = RecordingEnv::default();
    interpret(program, &mut store, &mut dot, &mut env)?;
    Ok(render(&store, dot))
}

/// Asserts that `program` turns the marked `input` into the marked `expected`
pub fn assert_edit(input: &str, program: &str, expected: &str) {
    match try_edit(input, program) {
        Ok(output) => assert_eq!(output, expected, "program {:?} on {:?}", program, input),
        Err(e) => panic!("program {:?} on {:?} failed: {}", program, input, e),
    }
}
