//! Undo log for a text store.
//!
//! Every replacement is recorded as the text it removed (`before`) and the
//! text it inserted (`after`). Consecutive single-character insertions made
//! within the typing interval are merged into one entry, so a burst of
//! typing undoes as a unit while paste, delete and programmatic edits stay
//! atomic.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Default window within which typed characters coalesce
pub const TYPING_INTERVAL: Duration = Duration::from_secs(2);

/// A range of the store together with the text it held
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UndoRange {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl UndoRange {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn precedes(&self, other: &UndoRange) -> bool {
        self.end == other.start
    }

    fn concat(&mut self, other: &UndoRange) {
        self.end = other.end;
        self.text.push_str(&other.text);
    }
}

/// One reversible edit
#[derive(Debug, Clone)]
pub struct UndoEntry {
    /// Store revision the edit was made at
    pub revision: u64,
    /// Replaced range and its old text
    pub before: UndoRange,
    /// Inserted range and its new text
    pub after: UndoRange,
    pub timestamp: Instant,
    /// Marks the entry matching the on-disk content
    pub saved: bool,
    /// Undo/redo runs stop at solid entries
    pub solid: bool,
    /// Made from the keyboard: may extend a typing run even when solid
    pub typed: bool,
}

impl UndoEntry {
    pub fn new(revision: u64, before: UndoRange, after: UndoRange, solid: bool) -> Self {
        Self {
            revision,
            before,
            after,
            timestamp: Instant::now(),
            saved: false,
            solid,
            typed: false,
        }
    }

    pub fn typed(mut self, typed: bool) -> Self {
        self.typed = typed;
        self
    }

    /// True for a one character insertion that can extend a typing run
    fn is_typing(&self) -> bool {
        self.before.is_empty() && self.after.text.chars().count() == 1 && self.after.text != " "
    }
}

/// Linear undo/redo history with a cursor.
///
/// Entries before `cur` are applied, entries from `cur` on can be redone.
#[derive(Debug, Clone)]
pub struct UndoLog {
    cur: usize,
    entries: Vec<UndoEntry>,
    /// Whether the state with nothing applied matches the disk
    nil_is_saved: bool,
    typing_interval: Duration,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoLog {
    pub fn new() -> Self {
        Self::with_typing_interval(TYPING_INTERVAL)
    }

    pub fn with_typing_interval(typing_interval: Duration) -> Self {
        Self {
            cur: 0,
            entries: Vec::new(),
            nil_is_saved: true,
            typing_interval,
        }
    }

    /// Records an edit made now
    pub fn add(&mut self, entry: UndoEntry) {
        self.add_at(entry, Instant::now());
    }

    /// Records an edit made at `now`.
    ///
    /// Drops everything that could still be redone, then either merges the
    /// entry into the previous one (typing run) or appends it. A solid
    /// entry always starts a new step unless it was typed.
    pub fn add_at(&mut self, mut entry: UndoEntry, now: Instant) {
        self.entries.truncate(self.cur);

        if let Some(prev) = self.entries.last_mut() {
            let coalesce = (entry.typed || !entry.solid)
                && prev.before.is_empty()
                && entry.is_typing()
                && prev.after.precedes(&entry.after)
                && now.saturating_duration_since(prev.timestamp) < self.typing_interval;
            if coalesce {
                prev.after.concat(&entry.after);
                prev.timestamp = now;
                return;
            }
        }

        entry.timestamp = now;
        self.entries.push(entry);
        self.cur += 1;
    }

    /// Steps back one entry and returns it
    pub fn undo(&mut self) -> Option<&UndoEntry> {
        if self.cur == 0 {
            return None;
        }
        self.cur -= 1;
        self.entries.get(self.cur)
    }

    /// Steps forward one entry and returns it
    pub fn redo(&mut self) -> Option<&UndoEntry> {
        let entry = self.entries.get(self.cur)?;
        self.cur += 1;
        Some(entry)
    }

    /// The most recently applied entry
    pub fn peek_undo(&self) -> Option<&UndoEntry> {
        self.cur.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// The entry the next redo would apply
    pub fn peek_redo(&self) -> Option<&UndoEntry> {
        self.entries.get(self.cur)
    }

    pub fn can_undo(&self) -> bool {
        self.cur > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cur < self.entries.len()
    }

    /// Marks the current state as the one on disk
    pub fn set_saved(&mut self) {
        for entry in &mut self.entries {
            entry.saved = false;
        }
        match self.cur.checked_sub(1) {
            Some(i) => {
                self.entries[i].saved = true;
                self.nil_is_saved = false;
            }
            None => self.nil_is_saved = true,
        }
    }

    /// Marks the empty history as not matching the disk (new files)
    pub fn set_nil_unsaved(&mut self) {
        self.nil_is_saved = false;
    }

    /// Whether the current state is the one on disk
    pub fn is_saved(&self) -> bool {
        match self.peek_undo() {
            Some(entry) => entry.saved,
            None => self.nil_is_saved,
        }
    }

    /// Forgets all history
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cur = 0;
    }

    pub fn position(&self) -> usize {
        self.cur
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// When the most recently applied edit happened
    pub fn last_edit(&self) -> Option<Instant> {
        self.peek_undo().map(|e| e.timestamp)
    }

    /// Multi-line dump of the log, `*` marks the cursor
    pub fn describe(&self) -> String {
        let mut w = String::new();
        if self.nil_is_saved {
            w.push_str("nil is saved\n");
        }
        let _ = writeln!(w, "cur {}", self.cur);

        for (i, entry) in self.entries.iter().enumerate() {
            w.push_str(if i == self.cur { "* " } else { "  " });
            let _ = write!(w, "{} rev:{} ", i, entry.revision);
            if entry.saved {
                w.push_str("saved ");
            }
            if entry.solid {
                w.push_str("solid ");
            }

            let (before, after) = (&entry.before, &entry.after);
            let _ = if before.start == before.end {
                writeln!(w, "ins({}) {:?}", before.start, after.text)
            } else if after.start == after.end {
                writeln!(w, "del({}-{}) {:?}", before.start, before.end, before.text)
            } else {
                writeln!(
                    w,
                    "replace({}-{}) {:?} -> {:?}",
                    before.start, before.end, before.text, after.text
                )
            };
        }

        w
    }
}
