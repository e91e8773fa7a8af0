//! Text store tests - gap buffer edits, selections, undo, disk round trips

mod common;

use std::sync::mpsc;

use common::{store_with, RecordingEnv};
use structedit::config::EngineConfig;
use structedit::edit::interpret;
use structedit::store::{EventOrigin, Sel, StoreError, TextStore};

/// Small deterministic generator so edit sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

// ========================================================================
// Content
// ========================================================================

#[test]
fn test_edits_match_string_model() {
    let mut rng = Lcg(7);
    let mut store = TextStore::scratch("model");
    let mut model: Vec<char> = Vec::new();
    let pieces = ["", "a", "xyz", "\n", "caff\u{e8}", "\u{1F600}\u{1F600}", "long line of text\n"];

    for step in 0..500 {
        let start = rng.next(model.len() + 1);
        let end = start + rng.next(model.len() - start + 1).min(8);
        let text = pieces[rng.next(pieces.len())];

        let mut sel = Sel::new(start, end);
        store.replace(text, &mut sel, step % 3 == 0, EventOrigin::Program);
        model.splice(start..end, text.chars());

        assert_eq!(sel, Sel::point(start + text.chars().count()));
        assert_eq!(store.len(), model.len(), "step {}", step);
    }

    assert_eq!(store.content(), model.iter().collect::<String>());
    for (i, &c) in model.iter().enumerate() {
        assert_eq!(store.char_at(i), Some(c));
    }
    assert_eq!(store.char_at(model.len()), None);
}

#[test]
fn test_text_of_selection_spans_gap() {
    let mut store = store_with("hello world");
    let mut sel = Sel::point(5);
    store.replace(",", &mut sel, true, EventOrigin::Keyboard);
    assert_eq!(store.text(Sel::new(3, 9)), "lo, wo");
    let (left, right) = store.selection(Sel::new(3, 9));
    assert_eq!(left.len() + right.len(), 6);
}

#[test]
fn test_line_of_and_byte_offset() {
    let store = store_with("uno\ndu\u{e8}\ntre");
    assert_eq!(store.line_of(0, false), (1, 0));
    assert_eq!(store.line_of(6, false), (2, 2));
    assert_eq!(store.line_of(99, false), (3, 3));
    assert_eq!(store.byte_offset(7), 8);
}

// ========================================================================
// Selections
// ========================================================================

#[test]
fn test_tracked_selections_keep_their_text() {
    let mut rng = Lcg(42);
    let mut store = store_with("alpha [beta] gamma");
    let tracked = store.add_sel(Sel::new(6, 12));

    for _ in 0..100 {
        let sel = store.sel(tracked).unwrap();
        let len = store.len();
        // edit only outside the tracked range
        let (start, end) = if rng.next(2) == 0 {
            let p = rng.next(sel.start);
            (p, p + rng.next(sel.start - p).min(2))
        } else {
            let p = sel.end + 1 + rng.next(len - sel.end);
            (p.min(len), (p + rng.next(3)).min(len))
        };
        let mut edit = Sel::new(start, end);
        store.replace("--", &mut edit, true, EventOrigin::Program);
        assert_eq!(store.text(store.sel(tracked).unwrap()), "[beta]");
    }
}

#[test]
fn test_selection_inside_deletion_collapses() {
    let mut store = store_with("one two three");
    let two = store.add_sel(Sel::new(4, 7));
    let mut edit = Sel::new(2, 9);
    store.replace("", &mut edit, true, EventOrigin::Program);
    assert_eq!(store.content(), "onhree");
    assert_eq!(store.sel(two), Some(Sel::point(2)));
}

#[test]
fn test_selection_after_replacement_keeps_length() {
    let mut store = store_with("abcdef");
    let tail = store.add_sel(Sel::new(3, 6));
    let mut edit = Sel::new(0, 3);
    store.replace("XY", &mut edit, true, EventOrigin::Program);
    assert_eq!(store.sel(tail), Some(Sel::new(2, 5)));
    assert_eq!(store.text(Sel::new(2, 5)), "def");
}

#[test]
fn test_endpoints_on_replaced_range_bounds() {
    let mut store = store_with("0123456789");
    let ends_at_start = store.add_sel(Sel::new(1, 3));
    let starts_at_end = store.add_sel(Sel::new(6, 8));
    let inside = store.add_sel(Sel::new(4, 5));
    let across = store.add_sel(Sel::new(2, 7));
    let empty_at_end = store.add_sel(Sel::point(6));

    let mut edit = Sel::new(3, 6);
    store.replace("ab", &mut edit, true, EventOrigin::Program);
    assert_eq!(store.content(), "012ab6789");

    assert_eq!(store.text(store.sel(ends_at_start).unwrap()), "12");
    assert_eq!(store.text(store.sel(starts_at_end).unwrap()), "67");
    assert_eq!(store.sel(inside), Some(Sel::point(3)));
    assert_eq!(store.sel(across), Some(Sel::new(2, 6)));
    assert_eq!(store.sel(empty_at_end), Some(Sel::point(5)));
}

#[test]
fn test_selections_after_any_edit_keep_length() {
    let mut rng = Lcg(11);
    let mut store = store_with("the quick brown fox jumps over the lazy dog");
    let ids: Vec<_> = (0..6)
        .map(|i| store.add_sel(Sel::new(i * 5, i * 5 + 3)))
        .collect();
    let pieces = ["", "z", "abc", "\n\n"];

    for _ in 0..300 {
        let len = store.len();
        let start = rng.next(len + 1);
        let end = (start + rng.next(6)).min(len);
        let text = pieces[rng.next(pieces.len())];
        let before: Vec<Sel> = ids.iter().map(|&id| store.sel(id).unwrap()).collect();

        let mut edit = Sel::new(start, end);
        store.replace(text, &mut edit, true, EventOrigin::Program);

        for (&id, old) in ids.iter().zip(before) {
            let sel = store.sel(id).unwrap();
            let what = format!("{} -> {} after {:?} over [{}, {})", old, sel, text, start, end);
            assert!(sel.start <= sel.end && sel.end <= store.len(), "{}", what);
            if old.start > start && old.start >= end {
                assert_eq!(sel.len(), old.len(), "{}", what);
            }
            if old.end <= start {
                assert_eq!(sel, old, "{}", what);
            }
        }
    }
}

#[test]
fn test_fix_sel_clamps() {
    let store = store_with("abc");
    assert_eq!(store.fix_sel(Sel::new(1, 10)), Sel::new(1, 3));
    assert_eq!(store.fix_sel(Sel::new(7, 10)), Sel::point(3));
}

// ========================================================================
// Undo
// ========================================================================

#[test]
fn test_undo_everything_restores_original() {
    let mut rng = Lcg(3);
    let original = "The quick brown fox\njumps over\nthe lazy dog\n";
    let mut store = store_with(original);
    let base = store.undo_position();

    for _ in 0..40 {
        let len = store.len();
        let start = rng.next(len + 1);
        let end = (start + rng.next(5)).min(len);
        let mut sel = Sel::new(start, end);
        store.replace("[edit]", &mut sel, true, EventOrigin::Program);
    }
    let edited = store.content();

    let mut sel = Sel::point(0);
    while store.undo_position() > base {
        store.undo(&mut sel, false);
    }
    assert_eq!(store.content(), original);

    while store.has_redo() {
        store.undo(&mut sel, true);
    }
    assert_eq!(store.content(), edited);
}

#[test]
fn test_typing_undoes_as_one_step() {
    let mut store = store_with("xy");
    // a deletion first, so the typed run can't extend the initial insert
    let mut sel = Sel::new(1, 2);
    store.replace("", &mut sel, true, EventOrigin::Keyboard);
    let before = store.undo_position();
    for c in ["a", "b", "c"] {
        store.replace(c, &mut sel, true, EventOrigin::Keyboard);
    }
    assert_eq!(store.content(), "xabc");
    assert_eq!(store.undo_position(), before + 1);

    store.undo(&mut sel, false);
    assert_eq!(store.content(), "x");
    assert_eq!(sel, Sel::new(1, 1));
}

#[test]
fn test_programs_undo_one_at_a_time() {
    let mut store = TextStore::scratch("programs");
    let mut sel = Sel::point(0);
    store.replace("hello", &mut sel, true, EventOrigin::Keyboard);

    let mut env = RecordingEnv::default();
    let mut dot = Sel::point(0);
    interpret("$a/!/", &mut store, &mut dot, &mut env).unwrap();
    interpret("$a/?/", &mut store, &mut dot, &mut env).unwrap();
    assert_eq!(store.content(), "hello!?");

    store.undo(&mut sel, false);
    assert_eq!(store.content(), "hello!");
    store.undo(&mut sel, false);
    assert_eq!(store.content(), "hello");
    store.undo(&mut sel, true);
    assert_eq!(store.content(), "hello!");
}

#[test]
fn test_undo_on_empty_history_does_nothing() {
    let mut store = TextStore::scratch("empty");
    let mut sel = Sel::new(0, 0);
    store.undo(&mut sel, false);
    store.undo(&mut sel, true);
    assert_eq!(store.content(), "");
    assert!(!store.has_undo());
}

// ========================================================================
// Events
// ========================================================================

#[test]
fn test_events_for_insert_and_delete() {
    let mut store = TextStore::scratch("Tag");
    let (tx, rx) = mpsc::channel();
    store.set_event_sink(Some(tx));

    let mut sel = Sel::point(0);
    store.replace("hey", &mut sel, true, EventOrigin::Keyboard);
    let mut sel = Sel::new(0, 1);
    store.replace("", &mut sel, true, EventOrigin::Program);

    let events: Vec<String> = rx.try_iter().map(|e| e.to_string()).collect();
    assert_eq!(events, vec!["Ki0 0 0 3 hey", "Ed0 1 0 0 "]);
}

#[test]
fn test_dropped_listener_is_forgotten() {
    let mut store = store_with("abc");
    let (tx, rx) = mpsc::channel();
    store.set_event_sink(Some(tx));
    drop(rx);
    let mut sel = Sel::point(0);
    store.replace("x", &mut sel, true, EventOrigin::Keyboard);
    store.replace("y", &mut sel, true, EventOrigin::Keyboard);
    assert_eq!(store.content(), "xyabc");
}

// ========================================================================
// Disk
// ========================================================================

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = TextStore::new(dir.path(), "absent.txt", false).unwrap_err();
    assert_eq!(err, StoreError::NotFound(dir.path().join("absent.txt")));

    let store = TextStore::new(dir.path(), "absent.txt", true).unwrap();
    assert!(store.is_empty());
    assert!(store.is_modified());
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("gone");
    let err = TextStore::new(&gone, "file.txt", true).unwrap_err();
    assert_eq!(err, StoreError::NotFound(gone));
}

#[test]
fn test_load_edit_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "first line\nsecond line\n").unwrap();

    let mut store = TextStore::new(dir.path(), "notes.txt", false).unwrap();
    assert_eq!(store.content(), "first line\nsecond line\n");
    assert!(!store.is_modified());
    assert_eq!(store.words(), ["first", "line", "second"]);

    let mut sel = Sel::new(0, 5);
    store.replace("1st", &mut sel, true, EventOrigin::Keyboard);
    assert!(store.is_modified());

    store.put().unwrap();
    assert!(!store.is_modified());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "1st line\nsecond line\n"
    );

    // back to the loaded state, which no longer matches the disk
    store.undo(&mut sel, false);
    assert!(store.is_modified());
    store.undo(&mut sel, true);
    assert!(!store.is_modified());
}

#[test]
fn test_reload_replaces_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "old").unwrap();
    let mut store = TextStore::new(dir.path(), "a.txt", false).unwrap();
    let dot = store.add_sel(Sel::new(1, 3));

    std::fs::write(&path, "brand new").unwrap();
    store.reload(false).unwrap();
    assert_eq!(store.content(), "brand new");
    assert_eq!(store.sel(dot), Some(Sel::new(1, 3)));
    assert!(!store.is_modified());
}

#[test]
fn test_binary_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("blob"), [0u8, 0, 0, 0, 0xff, 0xfe]).unwrap();
    let err = TextStore::new(dir.path(), "blob", false).unwrap_err();
    assert_eq!(err, StoreError::NotUtf8);
}

#[test]
fn test_large_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
    let config = EngineConfig {
        max_file_size: 4,
        ..EngineConfig::default()
    };
    let err = TextStore::open(dir.path(), "big.txt", false, &config).unwrap_err();
    assert_eq!(err, StoreError::FileTooLarge { size: 10 });
}

#[test]
fn test_directory_listing() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    std::fs::write(sub.join("b.txt"), "").unwrap();
    std::fs::create_dir(sub.join("a")).unwrap();

    let store = TextStore::new(dir.path(), "sub", false).unwrap();
    assert_eq!(store.name(), "sub/");
    assert!(store.is_dir());
    assert_eq!(store.content(), "a/\tb.txt");
    assert!(!store.is_modified());
}

#[test]
fn test_scratch_never_touches_disk() {
    let store = TextStore::scratch("Errors");
    assert_eq!(store.name(), "+Errors");
    assert!(store.is_scratch());
    assert!(store.is_empty());
}

// ========================================================================
// Protection
// ========================================================================

#[test]
fn test_protected_prefix_blocks_edits() {
    let mut store = store_with("prompt> typed");
    store.set_editable_start(Some(8));

    let mut sel = Sel::new(2, 10);
    store.replace("", &mut sel, true, EventOrigin::Keyboard);
    assert_eq!(store.content(), "prompt> typed");
    assert_eq!(sel, Sel::point(8));

    let mut sel = Sel::new(8, 13);
    store.replace("more", &mut sel, true, EventOrigin::Keyboard);
    assert_eq!(store.content(), "prompt> more");
}
