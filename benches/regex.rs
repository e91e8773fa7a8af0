//! Benchmarks for the regex engine and edit programs
//!
//! Run with: cargo bench regex

use structedit::edit::{interpret, EditEnv};
use structedit::regex::{Direction, Regex, RuneSource};
use structedit::store::{Sel, TextStore};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

const LINE: &str = "Humpty Dumpty sat on a wall, 0x1F and 0x2A went by\n";

fn store_with(text: &str) -> TextStore {
    let mut store = TextStore::scratch("bench");
    store.replace_full(text);
    store
}

/// Environment that drops all output
struct QuietEnv;

impl EditEnv for QuietEnv {
    fn warn(&mut self, _msg: &str) {}

    fn print(&mut self, _text: &str) {}

    fn run_job(
        &mut self,
        _dir: &std::path::Path,
        _command: &str,
        _input: &str,
    ) -> Result<String, String> {
        Err("jobs are disabled".to_string())
    }
}

// ============================================================================
// Compilation
// ============================================================================

#[divan::bench(args = ["abc", r"(\w+)=(\w+)", r"0x[0-9A-Fa-f]+|\b(fn|let|mut)\b", r"(a|b|c)*d[^\n]*"])]
fn compile(pattern: &str) {
    divan::black_box(Regex::compile(divan::black_box(pattern), true, false).ok());
}

// ============================================================================
// Searching
// ============================================================================

#[divan::bench(args = [100, 1000, 10000])]
fn find_last_line(lines: usize) {
    let mut text = LINE.repeat(lines);
    text.push_str("needle\n");
    let chars: Vec<char> = text.chars().collect();
    let rx = Regex::compile("needle", true, false).unwrap();
    divan::black_box(rx.find(&RuneSource(&chars), 0));
}

#[divan::bench(args = [100, 1000, 10000])]
fn find_backward_from_end(lines: usize) {
    let mut text = String::from("needle\n");
    text.push_str(&LINE.repeat(lines));
    let chars: Vec<char> = text.chars().collect();
    let rx = Regex::compile("needle", true, true).unwrap();
    divan::black_box(rx.find(&RuneSource(&chars), chars.len()));
}

#[divan::bench]
fn all_words_1k_lines() {
    let store = store_with(&LINE.repeat(1_000));
    let rx = Regex::compile(r"\w+", true, false).unwrap();
    let mut start = 0;
    let mut count = 0;
    while let Some(m) = rx.find(&store, start) {
        count += 1;
        start = m.end().max(m.start() + 1);
    }
    divan::black_box(count);
}

#[divan::bench(args = [100, 1000, 5000])]
fn pathological(n: usize) {
    let chars: Vec<char> = "a".repeat(n).chars().collect();
    let rx = Regex::compile("(a*)*b", true, false).unwrap();
    divan::black_box(rx.match_at(&RuneSource(&chars), 0, chars.len(), Direction::Forward));
}

// ============================================================================
// Edit programs
// ============================================================================

#[divan::bench(args = [100, 1000])]
fn x_change_words(lines: usize) {
    let mut store = store_with(&LINE.repeat(lines));
    let mut dot = Sel::point(0);
    interpret(r",x/\w+/ c/w/", &mut store, &mut dot, &mut QuietEnv).ok();
}

#[divan::bench(args = [100, 1000])]
fn s_hex_prefix(lines: usize) {
    let mut store = store_with(&LINE.repeat(lines));
    let mut dot = Sel::point(0);
    interpret(r",s/0x(\w+)/#\1/g", &mut store, &mut dot, &mut QuietEnv).ok();
}
