//! Boundary scans over a gap buffer.
//!
//! All scans clamp their result to `[0, size]`.

use super::gap::GapBuffer;
use crate::regex::Direction;

const OPEN_PARENS: [char; 4] = ['(', '[', '{', '<'];
const CLOSE_PARENS: [char; 4] = [')', ']', '}', '>'];

fn step(dir: Direction) -> isize {
    match dir {
        Direction::Forward => 1,
        Direction::Backward => -1,
    }
}

/// Word characters for motion: letters, digits and `_`
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Characters that can appear in a file path
pub fn is_filename_char(c: char) -> bool {
    is_word_char(c) || "-+/=~!:,.".contains(c)
}

/// Scans from `start` for the first newline in `dir` and returns the
/// position just after it, i.e. a line start. Without a newline the scan
/// ends at 0 (backward) or the size (forward).
pub fn to_newline(buf: &GapBuffer, start: usize, dir: Direction) -> usize {
    let size = buf.len();
    if size == 0 {
        return 0;
    }
    let mut i = start.min(size - 1) as isize;
    while i >= 0 && (i as usize) < size {
        if buf.char_at(i as usize) == Some('\n') {
            return i as usize + 1;
        }
        i += step(dir);
    }
    match dir {
        Direction::Backward => 0,
        Direction::Forward => size,
    }
}

/// Start of the line containing `p`
pub fn line_start(buf: &GapBuffer, p: usize) -> usize {
    match p.checked_sub(1) {
        Some(q) => to_newline(buf, q, Direction::Backward),
        None => 0,
    }
}

/// Scans the run of characters for which `inside` holds.
///
/// Forward scans return the first position past the run; a scan whose
/// first character is already outside is forced one step ahead unless
/// `dont_force_advance`. Backward scans return the start of the run.
fn scan_run(
    buf: &GapBuffer,
    start: usize,
    dir: Direction,
    inside: impl Fn(char) -> bool,
    dont_force_advance: bool,
) -> usize {
    let size = buf.len();
    let initial = dir == Direction::Backward;
    let mut first = initial;
    let mut i = start.min(size) as isize;

    while i >= 0 && (i as usize) < size {
        let c = buf.char_at(i as usize).unwrap_or('\0');
        if !inside(c) {
            if !first && !dont_force_advance {
                i += 1;
            }
            break;
        }
        first = !initial;
        i += step(dir);
    }

    i.max(0) as usize
}

/// Moves to the start or end of an alphanumeric word
pub fn to_word_boundary(
    buf: &GapBuffer,
    start: usize,
    dir: Direction,
    dont_force_advance: bool,
) -> usize {
    scan_run(buf, start, dir, is_word_char, dont_force_advance)
}

/// Moves to the first position where `stop` holds
pub fn to_boundary(
    buf: &GapBuffer,
    start: usize,
    dir: Direction,
    stop: impl Fn(char) -> bool,
) -> usize {
    scan_run(buf, start, dir, |c| !stop(c), false)
}

/// Moves to the start or end of a whitespace delimited word
pub fn to_space_boundary(buf: &GapBuffer, start: usize, dir: Direction) -> usize {
    to_boundary(buf, start, dir, char::is_whitespace)
}

/// Moves to the start or end of something that looks like a path
pub fn to_filename_boundary(buf: &GapBuffer, start: usize, dir: Direction) -> usize {
    scan_run(buf, start, dir, is_filename_char, false)
}

/// Position of the bracket matching the one at `start`.
///
/// Forward scans start from an opening bracket, backward scans from a
/// closing one.
pub fn to_matching_paren(buf: &GapBuffer, start: usize, dir: Direction) -> Option<usize> {
    let g = buf.char_at(start)?;
    let (open, close) = match dir {
        Direction::Forward => {
            let i = OPEN_PARENS.iter().position(|&c| c == g)?;
            (OPEN_PARENS[i], CLOSE_PARENS[i])
        }
        Direction::Backward => {
            let i = CLOSE_PARENS.iter().position(|&c| c == g)?;
            (CLOSE_PARENS[i], OPEN_PARENS[i])
        }
    };

    let mut depth = 0usize;
    let mut i = start as isize;
    while i >= 0 && (i as usize) < buf.len() {
        let c = buf.char_at(i as usize)?;
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
        }
        if depth == 0 {
            return Some(i as usize);
        }
        i += step(dir);
    }
    None
}

/// 1-based line and 0-based column of position `p`.
///
/// With `utf16` the column counts UTF-16 code units.
pub fn line_of(buf: &GapBuffer, p: usize, utf16: bool) -> (usize, usize) {
    let (a, b) = buf.range(0, p);
    let mut line = 1;
    let mut col = 0;
    for g in a.iter().chain(b) {
        if g.ch == '\n' {
            line += 1;
            col = 0;
        } else if utf16 {
            col += g.ch.len_utf16();
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// UTF-8 byte offset of position `p`
pub fn byte_offset(buf: &GapBuffer, p: usize) -> usize {
    let (a, b) = buf.range(0, p);
    a.iter().chain(b).map(|g| g.ch.len_utf8()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Backward, Forward};

    #[test]
    fn test_to_newline() {
        let buf = GapBuffer::from_text("uno\ndue\ntre");
        assert_eq!(to_newline(&buf, 0, Forward), 4);
        assert_eq!(to_newline(&buf, 5, Forward), 8);
        assert_eq!(to_newline(&buf, 9, Forward), 11);
        assert_eq!(to_newline(&buf, 6, Backward), 4);
        assert_eq!(to_newline(&buf, 2, Backward), 0);
        assert_eq!(line_start(&buf, 4), 4);
        assert_eq!(line_start(&buf, 7), 4);
        assert_eq!(line_start(&buf, 0), 0);
    }

    #[test]
    fn test_word_boundaries() {
        let buf = GapBuffer::from_text("foo bar_baz qux");
        assert_eq!(to_word_boundary(&buf, 4, Forward, false), 11);
        assert_eq!(to_word_boundary(&buf, 10, Backward, false), 4);
        // already outside a word: forced one step
        assert_eq!(to_word_boundary(&buf, 3, Forward, false), 4);
        assert_eq!(to_word_boundary(&buf, 3, Forward, true), 3);
        assert_eq!(to_word_boundary(&buf, 13, Forward, false), 15);
    }

    #[test]
    fn test_space_and_filename_boundaries() {
        let buf = GapBuffer::from_text("open src/main.rs:12 now");
        assert_eq!(to_space_boundary(&buf, 5, Forward), 19);
        assert_eq!(to_space_boundary(&buf, 10, Backward), 5);
        assert_eq!(to_filename_boundary(&buf, 8, Backward), 5);
        assert_eq!(to_filename_boundary(&buf, 8, Forward), 19);
    }

    #[test]
    fn test_matching_paren() {
        let buf = GapBuffer::from_text("f(a[b]{c}) <");
        assert_eq!(to_matching_paren(&buf, 1, Forward), Some(9));
        assert_eq!(to_matching_paren(&buf, 9, Backward), Some(1));
        assert_eq!(to_matching_paren(&buf, 3, Forward), Some(5));
        assert_eq!(to_matching_paren(&buf, 11, Forward), None);
        assert_eq!(to_matching_paren(&buf, 0, Forward), None);
    }

    #[test]
    fn test_line_of_and_byte_offset() {
        let buf = GapBuffer::from_text("ab\nc\u{1F600}d");
        assert_eq!(line_of(&buf, 0, false), (1, 0));
        assert_eq!(line_of(&buf, 3, false), (2, 0));
        assert_eq!(line_of(&buf, 5, false), (2, 2));
        assert_eq!(line_of(&buf, 5, true), (2, 3));
        assert_eq!(byte_offset(&buf, 5), 3 + 1 + 4);
    }
}
