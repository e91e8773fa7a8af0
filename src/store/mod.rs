//! The text store: a gap buffer plus everything that has to move with it.
//!
//! [`TextStore::replace`] is the only way content changes. Each call
//! records undo information, shifts every registered selection, tells the
//! highlighter where the text changed and notifies the event sink.

pub mod events;
pub mod file;
pub mod gap;
pub mod nav;
pub mod selection;

use std::path::{Path, PathBuf};
use std::time::Instant;

pub use self::events::{EditEvent, EventKind, EventOrigin, EventSink};
pub use self::file::StoreError;
pub use self::gap::{GapBuffer, Glyph};
pub use self::selection::{Sel, SelId, SelectionSet};

use self::file::Loaded;
use crate::config::EngineConfig;
use crate::highlight::{highlighter_for, Highlighter, NilHighlighter};
use crate::regex::{Direction, Matchable};
use crate::undo::{UndoEntry, UndoLog, UndoRange};

/// Content added through file operations between word list refreshes
const WORDS_REFRESH_INTERVAL: usize = 2 * 1024;

#[derive(Debug)]
pub struct TextStore {
    dir: PathBuf,
    name: String,
    /// Edits are silently ignored when false
    pub editable: bool,
    /// Content before this position is protected from edits
    editable_start: Option<usize>,
    modified: bool,

    gap: GapBuffer,
    sels: SelectionSet,
    undo: UndoLog,
    hl: Box<dyn Highlighter>,
    revision: u64,

    words: Vec<String>,
    words_updated: Option<Instant>,
    files_added: usize,

    sink: Option<EventSink>,

    max_file_size: u64,
    words_limit: usize,
}

impl TextStore {
    /// Opens `name` inside `dir` with the default configuration
    pub fn new(dir: impl AsRef<Path>, name: &str, create: bool) -> Result<Self, StoreError> {
        Self::open(dir, name, create, &EngineConfig::default())
    }

    /// Opens `name` inside `dir`.
    ///
    /// Names starting with `+` are scratch stores and never touch the disk.
    /// Otherwise the file is loaded; a missing file is an error unless
    /// `create` is set, in which case the store starts empty and modified.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        create: bool,
        config: &EngineConfig,
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        file::check_dir(dir)?;

        let hl = match highlighter_for(&config.highlight, name) {
            Ok(hl) => hl,
            Err(e) => {
                tracing::warn!("Bad highlight rules, highlighting disabled: {}", e);
                Box::new(NilHighlighter)
            }
        };

        let mut store = Self::blank(dir.to_path_buf(), name, config);
        store.hl = hl;
        if !store.is_scratch() {
            store.reload(create)?;
        }
        Ok(store)
    }

    /// An in-memory store that is never loaded from or saved to disk
    pub fn scratch(name: &str) -> Self {
        let name = if name.starts_with('+') {
            name.to_string()
        } else {
            format!("+{}", name)
        };
        Self::blank(PathBuf::from("."), &name, &EngineConfig::default())
    }

    fn blank(dir: PathBuf, name: &str, config: &EngineConfig) -> Self {
        Self {
            dir,
            name: name.to_string(),
            editable: true,
            editable_start: None,
            modified: false,
            gap: GapBuffer::new(),
            sels: SelectionSet::new(),
            undo: UndoLog::with_typing_interval(config.typing_interval()),
            hl: Box::new(NilHighlighter),
            revision: 0,
            words: Vec::new(),
            words_updated: None,
            files_added: 0,
            sink: None,
            max_file_size: config.max_file_size,
            words_limit: config.words_limit,
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn is_scratch(&self) -> bool {
        self.name.starts_with('+')
    }

    /// True for stores holding a directory listing
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn editable_start(&self) -> Option<usize> {
        self.editable_start
    }

    pub fn set_editable_start(&mut self, start: Option<usize>) {
        self.editable_start = start;
    }

    pub fn set_event_sink(&mut self, sink: Option<EventSink>) {
        self.sink = sink;
    }

    pub fn set_highlighter(&mut self, hl: Box<dyn Highlighter>) {
        self.hl = hl;
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub fn len(&self) -> usize {
        self.gap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gap.is_empty()
    }

    pub fn at(&self, p: usize) -> Option<Glyph> {
        self.gap.at(p)
    }

    pub fn char_at(&self, p: usize) -> Option<char> {
        self.gap.char_at(p)
    }

    pub fn buffer(&self) -> &GapBuffer {
        &self.gap
    }

    /// Content of `sel` as two slices split at the gap
    pub fn selection(&self, sel: Sel) -> (&[Glyph], &[Glyph]) {
        self.gap.range(sel.start, sel.end)
    }

    pub fn chars(&self, sel: Sel) -> Vec<char> {
        self.gap.chars(sel.start, sel.end)
    }

    pub fn text(&self, sel: Sel) -> String {
        self.gap.text(sel.start, sel.end)
    }

    pub fn content(&self) -> String {
        self.gap.text(0, self.len())
    }

    /// Clamps `sel` to the current size
    pub fn fix_sel(&self, sel: Sel) -> Sel {
        sel.clamped(self.len())
    }

    // =========================================================================
    // Selections
    // =========================================================================

    /// Registers a selection that edits will keep up to date
    pub fn add_sel(&mut self, sel: Sel) -> SelId {
        self.sels.add(sel.clamped(self.len()))
    }

    pub fn remove_sel(&mut self, id: SelId) -> Option<Sel> {
        self.sels.remove(id)
    }

    pub fn sel(&self, id: SelId) -> Option<Sel> {
        self.sels.get(id)
    }

    pub fn set_sel(&mut self, id: SelId, sel: Sel) {
        let sel = sel.clamped(self.len());
        self.sels.set(id, sel);
    }

    pub fn sels(&self) -> &SelectionSet {
        &self.sels
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Replaces the content of `sel` with `text`.
    ///
    /// Afterwards `sel` is the empty range just past the inserted text. An
    /// edit that would start inside the protected prefix only moves `sel`
    /// to its end.
    pub fn replace(&mut self, text: &str, sel: &mut Sel, solid: bool, origin: EventOrigin) {
        let chars: Vec<char> = text.chars().collect();
        *sel = self.replace_impl(&chars, *sel, None, solid, origin);
    }

    /// Like [`TextStore::replace`] for a registered selection, which is
    /// excluded from the shifting of other selections
    pub fn replace_sel(&mut self, text: &str, id: SelId, solid: bool, origin: EventOrigin) {
        let Some(sel) = self.sels.get(id) else {
            return;
        };
        let chars: Vec<char> = text.chars().collect();
        let after = self.replace_impl(&chars, sel, Some(id), solid, origin);
        self.sels.set(id, after);
    }

    fn replace_impl(
        &mut self,
        text: &[char],
        target: Sel,
        skip: Option<SelId>,
        solid: bool,
        origin: EventOrigin,
    ) -> Sel {
        if !self.editable {
            return target;
        }

        let sel = target.clamped(self.len());
        if let Some(protected) = self.editable_start {
            if sel.start < protected {
                return Sel::point(protected);
            }
        }

        self.modified = true;
        self.push_undo(sel, text, solid, origin);
        self.apply(text, sel, skip);
        self.emit_events(text, sel, origin);

        if origin == EventOrigin::Files {
            self.files_added += text.len();
            if self.files_added > WORDS_REFRESH_INTERVAL {
                self.files_added = 0;
                self.update_words();
            }
        }

        Sel::point(sel.start + text.len())
    }

    /// Replaces the whole content as one solid edit, keeping every
    /// registered selection where it was (clamped to the new size)
    pub fn replace_full(&mut self, text: &str) {
        let saved = self.sels.snapshot();
        let mut all = Sel::new(0, self.len());
        self.replace(text, &mut all, true, EventOrigin::Program);
        let size = self.len();
        for (id, sel) in saved {
            self.sels.set(id, sel.clamped(size));
        }
    }

    fn push_undo(&mut self, sel: Sel, text: &[char], solid: bool, origin: EventOrigin) {
        let before = UndoRange::new(sel.start, sel.end, self.text(sel));
        let after = UndoRange::new(
            sel.start,
            sel.start + text.len(),
            text.iter().collect::<String>(),
        );
        let entry = UndoEntry::new(self.revision, before, after, solid)
            .typed(origin == EventOrigin::Keyboard);
        self.undo.add(entry);
    }

    /// Mutates the gap buffer and shifts selections, without undo
    /// bookkeeping
    fn apply(&mut self, text: &[char], sel: Sel, skip: Option<SelId>) {
        if !sel.is_empty() {
            self.gap.delete(sel.start, sel.end);
        }
        self.gap.insert(sel.start, text);
        self.sels
            .shift(sel.start, sel.len(), text.len(), skip, self.gap.len());

        self.hl.alter(sel.start.saturating_sub(1));
        self.revision += 1;
    }

    fn emit_events(&mut self, text: &[char], sel: Sel, origin: EventOrigin) {
        let Some(sink) = &self.sink else {
            return;
        };
        let tag_region = self.name == "+Tag";
        let mut events = Vec::with_capacity(2);

        if !sel.is_empty() {
            events.push(EditEvent {
                origin,
                tag_region,
                kind: EventKind::Delete,
                start: sel.start,
                end: sel.end,
                flags: 0,
                text: String::new(),
            });
        }
        if sel.is_empty() || !text.is_empty() {
            events.push(EditEvent {
                origin,
                tag_region,
                kind: EventKind::Insert,
                start: sel.start,
                end: sel.start,
                flags: 0,
                text: text.iter().collect(),
            });
        }

        for event in events {
            if sink.send(event).is_err() {
                tracing::debug!("Event listener for {} went away", self.name);
                self.sink = None;
                return;
            }
        }
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Undoes (or redoes) one group of edits and sets `sel` to the text the
    /// last replayed entry put back
    pub fn undo(&mut self, sel: &mut Sel, redo: bool) {
        if let Some(last) = self.undo_impl(redo, None) {
            *sel = last;
        }
    }

    /// [`TextStore::undo`] for a registered selection
    pub fn undo_sel(&mut self, id: SelId, redo: bool) {
        if let Some(last) = self.undo_impl(redo, Some(id)) {
            self.sels.set(id, last);
        }
    }

    /// Undo replays entries until it has replayed a solid one; redo
    /// replays entries until the next one is solid.
    fn undo_impl(&mut self, redo: bool, skip: Option<SelId>) -> Option<Sel> {
        if !self.editable {
            return None;
        }

        let mut first = true;
        let mut last = None;
        loop {
            let entry = if redo {
                if !first && self.undo.peek_redo().is_some_and(|e| e.solid) {
                    break;
                }
                self.undo.redo().cloned()
            } else {
                self.undo.undo().cloned()
            };
            let Some(entry) = entry else {
                break;
            };
            first = false;

            let (range, text) = if redo {
                (&entry.before, &entry.after.text)
            } else {
                (&entry.after, &entry.before.text)
            };
            let chars: Vec<char> = text.chars().collect();
            let ws = Sel::new(range.start, range.end).clamped(self.len());
            self.apply(&chars, ws, skip);
            last = Some(Sel::new(ws.start, ws.start + chars.len()));
            self.modified = !self.undo.is_saved();

            if !redo && entry.solid {
                break;
            }
        }

        tracing::debug!(
            "{} on {}: position {}",
            if redo { "Redo" } else { "Undo" },
            self.name,
            self.undo.position()
        );
        last
    }

    pub fn has_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_position(&self) -> usize {
        self.undo.position()
    }

    pub fn flush_undo(&mut self) {
        self.undo.reset();
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    pub fn describe_undo(&self) -> String {
        self.undo.describe()
    }

    /// When the most recently applied edit was made
    pub fn last_edit(&self) -> Option<Instant> {
        self.undo.last_edit()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Re-reads the store from disk as one solid edit
    pub fn reload(&mut self, create: bool) -> Result<(), StoreError> {
        let path = self.path();
        match file::load(&path, self.max_file_size)? {
            Loaded::Text(text) => {
                self.replace_full(&text);
                self.modified = false;
                self.undo.set_saved();
                if self.len() < self.words_limit {
                    self.update_words();
                }
                tracing::debug!("Loaded {} ({} chars)", path.display(), self.len());
            }
            Loaded::Listing(listing) => {
                if !self.name.ends_with('/') {
                    self.name.push('/');
                }
                self.replace_full(&listing);
                self.modified = false;
                tracing::debug!("Listed directory {}", path.display());
            }
            Loaded::Missing if create => {
                self.modified = true;
                self.undo.set_nil_unsaved();
                tracing::debug!("New file {}", path.display());
            }
            Loaded::Missing => return Err(StoreError::NotFound(path)),
        }
        Ok(())
    }

    /// Writes the content to disk and marks it saved
    pub fn put(&mut self) -> Result<(), StoreError> {
        let path = self.path();
        file::write_glyphs(&path, self.gap.range(0, self.len()))?;
        self.update_words();
        self.modified = false;
        self.undo.set_saved();
        tracing::debug!("Saved {} ({} chars)", path.display(), self.len());
        Ok(())
    }

    /// Recomputes the completion word list
    pub fn update_words(&mut self) {
        let content = self.content();
        let mut words: Vec<String> = content
            .split(|c: char| !nav::is_word_char(c))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        words.sort();
        words.dedup();
        self.words = words;
        self.words_updated = Some(Instant::now());
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn words_updated(&self) -> Option<Instant> {
        self.words_updated
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn to_newline(&self, start: usize, dir: Direction) -> usize {
        nav::to_newline(&self.gap, start, dir)
    }

    pub fn line_start(&self, p: usize) -> usize {
        nav::line_start(&self.gap, p)
    }

    pub fn to_word_boundary(&self, start: usize, dir: Direction, dont_force_advance: bool) -> usize {
        nav::to_word_boundary(&self.gap, start, dir, dont_force_advance)
    }

    pub fn to_space_boundary(&self, start: usize, dir: Direction) -> usize {
        nav::to_space_boundary(&self.gap, start, dir)
    }

    pub fn to_filename_boundary(&self, start: usize, dir: Direction) -> usize {
        nav::to_filename_boundary(&self.gap, start, dir)
    }

    pub fn to_boundary(&self, start: usize, dir: Direction, stop: impl Fn(char) -> bool) -> usize {
        nav::to_boundary(&self.gap, start, dir, stop)
    }

    pub fn to_matching_paren(&self, start: usize, dir: Direction) -> Option<usize> {
        nav::to_matching_paren(&self.gap, start, dir)
    }

    /// 1-based line and 0-based column of `p`
    pub fn line_of(&self, p: usize, utf16: bool) -> (usize, usize) {
        nav::line_of(&self.gap, p.min(self.len()), utf16)
    }

    pub fn byte_offset(&self, p: usize) -> usize {
        nav::byte_offset(&self.gap, p.min(self.len()))
    }

    // =========================================================================
    // Highlighting
    // =========================================================================

    /// Computes the tags of `[start, end)`, stores them on the glyphs and
    /// returns them
    pub fn highlight(&mut self, start: usize, end: usize) -> Vec<u8> {
        let end = end.min(self.len());
        let start = start.min(end);
        let mut tags = Vec::with_capacity(end - start);
        self.hl.highlight(start, end, &self.gap, &mut tags);
        for (i, &tag) in tags.iter().enumerate() {
            self.gap.set_tag(start + i, tag);
        }
        tags
    }

    pub fn to_region_end(&mut self, pos: usize) -> Option<usize> {
        self.hl.to_region_end(pos, &self.gap)
    }
}

impl Matchable for TextStore {
    fn size(&self) -> usize {
        self.len()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.gap.char_at(pos)
    }
}
