//! Gap buffer of tagged characters.
//!
//! The live text is `buf[..gap]` followed by `buf[gap + gap_len..]`. Moving
//! the gap costs the distance moved; growing it reallocates in `SLOP` sized
//! steps.

use crate::regex::Matchable;

/// Growth granularity of the gap
pub const SLOP: usize = 128;

/// Tag given to freshly inserted, not yet highlighted characters
pub const DIRTY_TAG: u8 = 0;

/// One stored character and its highlight tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub tag: u8,
}

impl Glyph {
    const FILLER: Glyph = Glyph {
        ch: '\0',
        tag: DIRTY_TAG,
    };

    pub fn new(ch: char) -> Self {
        Self { ch, tag: DIRTY_TAG }
    }
}

#[derive(Debug, Clone)]
pub struct GapBuffer {
    buf: Vec<Glyph>,
    gap: usize,
    gap_len: usize,
}

impl Default for GapBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GapBuffer {
    pub fn new() -> Self {
        Self {
            buf: vec![Glyph::FILLER; SLOP],
            gap: 0,
            gap_len: SLOP,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut gb = Self::new();
        let chars: Vec<char> = text.chars().collect();
        gb.insert(0, &chars);
        gb
    }

    /// Number of live characters
    pub fn len(&self) -> usize {
        self.buf.len() - self.gap_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn gap_start(&self) -> usize {
        self.gap
    }

    pub fn gap_len(&self) -> usize {
        self.gap_len
    }

    /// Physical index of logical position `p`
    fn physical(&self, p: usize) -> usize {
        if p < self.gap {
            p
        } else {
            p + self.gap_len
        }
    }

    /// Moves the gap so it starts at logical position `p` (clamped)
    pub fn move_gap(&mut self, p: usize) {
        let p = p.min(self.len());
        if p < self.gap {
            self.buf.copy_within(p..self.gap, p + self.gap_len);
        } else if p > self.gap {
            let from = self.gap + self.gap_len;
            self.buf.copy_within(from..p + self.gap_len, self.gap);
        }
        self.gap = p;
    }

    /// Grows the gap so that at least `delta` more characters fit
    pub fn inc_gap(&mut self, delta: usize) {
        if self.gap_len > delta + 1 {
            return;
        }
        let new_len = (delta / SLOP + 1) * SLOP;
        let extra = new_len - self.gap_len;
        self.buf.splice(
            self.gap..self.gap,
            std::iter::repeat(Glyph::FILLER).take(extra),
        );
        self.gap_len = new_len;
    }

    /// Removes `[start, end)` by widening the gap over it
    pub fn delete(&mut self, start: usize, end: usize) {
        let end = end.min(self.len());
        if start >= end {
            return;
        }
        self.move_gap(start);
        self.gap_len += end - start;
    }

    /// Inserts `text` at `at`, every character tagged dirty
    pub fn insert(&mut self, at: usize, text: &[char]) {
        self.move_gap(at);
        self.inc_gap(text.len());
        for (slot, &ch) in self.buf[self.gap..].iter_mut().zip(text) {
            *slot = Glyph::new(ch);
        }
        self.gap += text.len();
        self.gap_len -= text.len();
    }

    pub fn at(&self, p: usize) -> Option<Glyph> {
        if p >= self.len() {
            return None;
        }
        self.buf.get(self.physical(p)).copied()
    }

    pub fn char_at(&self, p: usize) -> Option<char> {
        self.at(p).map(|g| g.ch)
    }

    /// Sets the tag of the glyph at `p`, ignored out of range
    pub fn set_tag(&mut self, p: usize, tag: u8) {
        if p < self.len() {
            let pp = self.physical(p);
            self.buf[pp].tag = tag;
        }
    }

    /// Live content of `[start, end)` as at most two slices, split at the gap
    pub fn range(&self, start: usize, end: usize) -> (&[Glyph], &[Glyph]) {
        let size = self.len();
        let end = end.min(size);
        let start = start.min(end);

        let gl = self.gap_len;
        if end <= self.gap {
            (&self.buf[start..end], &[])
        } else if start >= self.gap {
            (&self.buf[start + gl..end + gl], &[])
        } else {
            (&self.buf[start..self.gap], &self.buf[self.gap + gl..end + gl])
        }
    }

    pub fn chars(&self, start: usize, end: usize) -> Vec<char> {
        let (a, b) = self.range(start, end);
        a.iter().chain(b).map(|g| g.ch).collect()
    }

    pub fn text(&self, start: usize, end: usize) -> String {
        let (a, b) = self.range(start, end);
        a.iter().chain(b).map(|g| g.ch).collect()
    }

    pub fn tags(&self, start: usize, end: usize) -> Vec<u8> {
        let (a, b) = self.range(start, end);
        a.iter().chain(b).map(|g| g.tag).collect()
    }
}

impl Matchable for GapBuffer {
    fn size(&self) -> usize {
        self.len()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        GapBuffer::char_at(self, pos)
    }
}
