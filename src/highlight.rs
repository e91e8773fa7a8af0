//! Incremental region highlighting.
//!
//! Highlighters assign one tag byte per character. The store owns the tags;
//! highlighters only compute them and are told where the text last changed
//! through [`Highlighter::alter`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::regex::{Direction, Matchable, Regex, RegexError, RuneSource};

/// Tag of text outside any region
pub const TAG_PLAIN: u8 = 1;

/// Distance between cached synchronisation points
const SYNC_INTERVAL: usize = 128;

pub trait Highlighter: fmt::Debug + Send {
    /// Appends the tags of `[start, end)` to `out`
    fn highlight(&mut self, start: usize, end: usize, text: &dyn Matchable, out: &mut Vec<u8>);

    /// Last position of the region that begins at `start`, `None` when no
    /// region begins there
    fn to_region_end(&mut self, start: usize, text: &dyn Matchable) -> Option<usize>;

    /// Forgets everything computed at or after `pos`
    fn alter(&mut self, pos: usize);
}

/// Tags everything as plain text
#[derive(Debug, Default, Clone, Copy)]
pub struct NilHighlighter;

impl Highlighter for NilHighlighter {
    fn highlight(&mut self, start: usize, end: usize, _text: &dyn Matchable, out: &mut Vec<u8>) {
        out.extend(std::iter::repeat(TAG_PLAIN).take(end.saturating_sub(start)));
    }

    fn to_region_end(&mut self, _start: usize, _text: &dyn Matchable) -> Option<usize> {
        None
    }

    fn alter(&mut self, _pos: usize) {}
}

/// Precomputed tags, e.g. produced by an external tool. Anything past the
/// known tags is plain; edits drop the tags from the edit point on.
#[derive(Debug, Default, Clone)]
pub struct FixedHighlighter {
    tags: Vec<u8>,
}

impl FixedHighlighter {
    /// `len` plain tags
    pub fn new(len: usize) -> Self {
        Self {
            tags: vec![TAG_PLAIN; len],
        }
    }

    pub fn append(&mut self, tags: &[u8]) {
        self.tags.extend_from_slice(tags);
    }
}

impl Highlighter for FixedHighlighter {
    fn highlight(&mut self, start: usize, end: usize, _text: &dyn Matchable, out: &mut Vec<u8>) {
        let known = self.tags.len();
        if start < known {
            out.extend_from_slice(&self.tags[start..end.min(known)]);
        }
        let missing = end.saturating_sub(start.max(known));
        out.extend(std::iter::repeat(TAG_PLAIN).take(missing));
    }

    fn to_region_end(&mut self, _start: usize, _text: &dyn Matchable) -> Option<usize> {
        None
    }

    fn alter(&mut self, pos: usize) {
        self.tags.truncate(pos);
    }
}

// =============================================================================
// Region rules
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    String,
    Comment,
    Header,
}

impl RegionKind {
    pub fn tag(self) -> u8 {
        match self {
            RegionKind::String => 2,
            RegionKind::Comment => 3,
            RegionKind::Header => 4,
        }
    }
}

/// A region opened by `start` and closed by `end`.
///
/// Delimiters are literal text unless `regex` is set, in which case they
/// are patterns anchored at the current position and the delimiters
/// themselves are tagged plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRule {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub regex: bool,
    /// Inside the region, this character hides the next one from `end`
    #[serde(default)]
    pub escape: Option<char>,
    pub kind: RegionKind,
}

impl RegionRule {
    pub fn string(start: &str, end: &str, escape: Option<char>) -> Self {
        Self::literal(start, end, escape, RegionKind::String)
    }

    pub fn comment(start: &str, end: &str) -> Self {
        Self::literal(start, end, None, RegionKind::Comment)
    }

    pub fn pattern(start: &str, end: &str, kind: RegionKind) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            regex: true,
            escape: None,
            kind,
        }
    }

    fn literal(start: &str, end: &str, escape: Option<char>, kind: RegionKind) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            regex: false,
            escape,
            kind,
        }
    }
}

/// Region rules for files whose name matches `name_pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRules {
    pub name_pattern: String,
    pub regions: Vec<RegionRule>,
}

/// Built-in rules for a handful of common languages
pub fn default_rules() -> Vec<LanguageRules> {
    let c_like = |pattern: &str| LanguageRules {
        name_pattern: pattern.to_string(),
        regions: vec![
            RegionRule::string("\"", "\"", Some('\\')),
            RegionRule::string("'", "'", Some('\\')),
            RegionRule::comment("/*", "*/"),
            RegionRule::comment("//", "\n"),
        ],
    };

    vec![
        LanguageRules {
            name_pattern: r"\.go$".to_string(),
            regions: vec![
                RegionRule::string("`", "`", None),
                RegionRule::string("\"", "\"", Some('\\')),
                RegionRule::string("'", "'", Some('\\')),
                RegionRule::comment("/*", "*/"),
                RegionRule::comment("//", "\n"),
                RegionRule::pattern(
                    r"^(func|type)\s+(\([^\)]+\)\s+)?",
                    r"\W",
                    RegionKind::Header,
                ),
            ],
        },
        c_like(r"\.(?:c|h|cpp|java|js|rs)$"),
        LanguageRules {
            name_pattern: r"\.(?:py|star)$".to_string(),
            regions: vec![
                RegionRule::string("\"\"\"", "\"\"\"", None),
                RegionRule::string("\"", "\"", Some('\\')),
                RegionRule::string("'", "'", Some('\\')),
                RegionRule::comment("#", "\n"),
            ],
        },
        LanguageRules {
            name_pattern: r"\.lua$".to_string(),
            regions: vec![
                RegionRule::string("\"", "\"", Some('\\')),
                RegionRule::string("'", "'", Some('\\')),
                RegionRule::comment("--", "\n"),
            ],
        },
        LanguageRules {
            name_pattern: r"\.(?:diff|patch)$".to_string(),
            regions: vec![
                RegionRule::pattern(r"^\+", r"\n", RegionKind::Header),
                RegionRule::pattern(r"^-", r"\n", RegionKind::String),
            ],
        },
    ]
}

/// Picks the highlighter for a file name. The last matching rule set wins;
/// without one everything is plain.
pub fn highlighter_for(
    rules: &[LanguageRules],
    name: &str,
) -> Result<Box<dyn Highlighter>, RegexError> {
    let name_chars: Vec<char> = name.chars().collect();
    let mut chosen = None;
    for lang in rules {
        let re = Regex::compile(&lang.name_pattern, true, false)?;
        if re.find(&RuneSource(&name_chars), 0).is_some() {
            chosen = Some(lang);
        }
    }

    match chosen {
        Some(lang) => Ok(Box::new(RegionHighlighter::new(&lang.regions)?)),
        None => Ok(Box::new(NilHighlighter)),
    }
}

// =============================================================================
// RegionHighlighter
// =============================================================================

#[derive(Debug, Clone)]
enum Delim {
    Literal(Vec<char>),
    Pattern(Regex),
}

impl Delim {
    fn compile(text: &str, regex: bool) -> Result<Self, RegexError> {
        if regex {
            Ok(Delim::Pattern(Regex::compile(text, false, false)?))
        } else {
            Ok(Delim::Literal(text.chars().collect()))
        }
    }

    /// End of a non-empty delimiter match at `pos`
    fn match_at(&self, pos: usize, text: &dyn Matchable) -> Option<usize> {
        match self {
            Delim::Literal(chars) => {
                let hit = !chars.is_empty()
                    && chars
                        .iter()
                        .enumerate()
                        .all(|(j, &c)| text.char_at(pos + j) == Some(c));
                hit.then_some(pos + chars.len())
            }
            Delim::Pattern(re) => re
                .match_at(text, pos, text.size(), Direction::Forward)
                .map(|m| m.end())
                .filter(|&end| end > pos),
        }
    }
}

#[derive(Debug, Clone)]
struct Region {
    start: Delim,
    end: Delim,
    escape: Option<char>,
    tag: u8,
    delim_tag: u8,
}

/// Scanner state at a position: `state` is 0 outside regions, otherwise
/// the 1-based index of the open region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sync {
    index: usize,
    state: usize,
}

const ORIGIN: Sync = Sync { index: 0, state: 0 };

/// Tags string and comment regions, caching scanner states every
/// `SYNC_INTERVAL` characters so a highlight can resume close to where it
/// is asked to start.
#[derive(Debug, Clone)]
pub struct RegionHighlighter {
    regions: Vec<Region>,
    syncs: Vec<Sync>,
    /// Resume point after the last highlighted start
    temp: Sync,
}

impl RegionHighlighter {
    pub fn new(rules: &[RegionRule]) -> Result<Self, RegexError> {
        let regions = rules
            .iter()
            .map(|r| {
                Ok(Region {
                    start: Delim::compile(&r.start, r.regex)?,
                    end: Delim::compile(&r.end, r.regex)?,
                    escape: r.escape,
                    tag: r.kind.tag(),
                    delim_tag: if r.regex { TAG_PLAIN } else { r.kind.tag() },
                })
            })
            .collect::<Result<Vec<_>, RegexError>>()?;

        Ok(Self {
            regions,
            syncs: vec![ORIGIN],
            temp: ORIGIN,
        })
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.len()
    }

    /// Index of the last cached sync strictly before `pos`
    fn find(&self, pos: usize) -> Option<usize> {
        self.syncs
            .partition_point(|s| s.index < pos)
            .checked_sub(1)
    }

    /// One token from `sy`: the state after it and the tag of its characters
    fn scan(&self, sy: Sync, text: &dyn Matchable) -> (Sync, u8) {
        if sy.state == 0 {
            for (i, region) in self.regions.iter().enumerate() {
                if let Some(end) = region.start.match_at(sy.index, text) {
                    return (
                        Sync {
                            index: end,
                            state: i + 1,
                        },
                        region.delim_tag,
                    );
                }
            }
            return (
                Sync {
                    index: sy.index + 1,
                    state: 0,
                },
                TAG_PLAIN,
            );
        }

        let region = &self.regions[sy.state - 1];
        if let Some(end) = region.end.match_at(sy.index, text) {
            return (Sync { index: end, state: 0 }, region.delim_tag);
        }
        let width = if region.escape.is_some() && text.char_at(sy.index) == region.escape {
            2
        } else {
            1
        };
        (
            Sync {
                index: sy.index + width,
                state: sy.state,
            },
            region.tag,
        )
    }

    /// Where to start scanning for `pos`, and whether new syncs may be
    /// appended from there
    fn sync_for(&self, pos: usize) -> (Sync, bool) {
        let last = self.syncs.last().copied();
        if pos == self.temp.index {
            let at_end = last.map_or(true, |l| l == self.temp);
            return (self.temp, at_end);
        }
        match self.find(pos) {
            Some(i) => (self.syncs[i], i + 1 == self.syncs.len()),
            None => (ORIGIN, self.syncs.is_empty()),
        }
    }
}

impl Highlighter for RegionHighlighter {
    fn highlight(&mut self, start: usize, end: usize, text: &dyn Matchable, out: &mut Vec<u8>) {
        let end = end.min(text.size());
        let (mut sy, at_end) = self.sync_for(start);

        'coloring: while sy.index < end {
            let (next, tag) = self.scan(sy, text);
            for i in sy.index..next.index {
                if i == start {
                    self.temp = next;
                }
                if i >= end {
                    break 'coloring;
                }
                if i >= start {
                    out.push(tag);
                }
            }
            sy = next;
            if at_end {
                let far = self
                    .syncs
                    .last()
                    .map_or(true, |l| sy.index - l.index > SYNC_INTERVAL);
                if far {
                    self.syncs.push(sy);
                }
            }
        }
    }

    fn to_region_end(&mut self, start: usize, text: &dyn Matchable) -> Option<usize> {
        let (mut sy, _) = match start.checked_sub(1) {
            Some(p) => self.sync_for(p),
            None => (ORIGIN, false),
        };
        let mut prev = None;
        let mut cur = None;

        loop {
            if sy.index >= text.size() {
                return None;
            }
            let (next, tag) = self.scan(sy, text);
            for i in sy.index..next.index {
                if i + 1 == start {
                    prev = Some(tag);
                }
                if i == start {
                    if prev == Some(tag) {
                        return None;
                    }
                    cur = Some(tag);
                }
                if cur.is_some_and(|c| c != tag) {
                    return Some(i - 1);
                }
            }
            sy = next;
        }
    }

    fn alter(&mut self, pos: usize) {
        let keep = self.find(pos).unwrap_or(0);
        self.syncs.truncate(keep);
        if self.temp.index >= pos {
            self.temp = ORIGIN;
        }
        if self.syncs.is_empty() {
            self.syncs.push(ORIGIN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::RuneSource;

    fn python() -> RegionHighlighter {
        let rules = default_rules();
        let py = rules
            .iter()
            .find(|l| l.name_pattern.contains("py"))
            .unwrap();
        RegionHighlighter::new(&py.regions).unwrap()
    }

    const PY_SOURCE: &str = "\n \"\"\"long string \" long string\"\"\"\n \"string \\\" string\"\n 'string\\' string'\n # comment comment\n";

    fn py_expected() -> Vec<u8> {
        let mut v = vec![1, 1];
        v.extend([2; 31]);
        v.extend([1, 1]);
        v.extend([2; 18]);
        v.extend([1, 1]);
        v.extend([2; 17]);
        v.extend([1, 1]);
        v.extend([3; 18]);
        v
    }

    #[test]
    fn test_python_regions() {
        let text: Vec<char> = PY_SOURCE.chars().collect();
        let mut hl = python();
        let mut out = Vec::new();
        hl.highlight(0, text.len(), &RuneSource(&text), &mut out);
        assert_eq!(out, py_expected());
    }

    #[test]
    fn test_partial_highlight_matches_full() {
        let text: Vec<char> = PY_SOURCE.chars().collect();
        let src = RuneSource(&text);
        let expected = py_expected();
        let mut hl = python();

        let mut out = Vec::new();
        hl.highlight(0, 40, &src, &mut out);
        let mut rest = Vec::new();
        hl.highlight(40, text.len(), &src, &mut rest);
        out.extend(rest);
        assert_eq!(out, expected);

        hl.alter(10);
        let mut again = Vec::new();
        hl.highlight(20, 60, &src, &mut again);
        assert_eq!(again, expected[20..60]);
    }

    #[test]
    fn test_to_region_end() {
        let text: Vec<char> = "x = \"abc\" + y".chars().collect();
        let mut hl = python();
        let src = RuneSource(&text);
        assert_eq!(hl.to_region_end(4, &src), Some(8));
        assert_eq!(hl.to_region_end(5, &src), None);
    }

    #[test]
    fn test_fixed_highlighter() {
        let mut hl = FixedHighlighter::new(0);
        hl.append(&[2, 2, 3]);
        let text: Vec<char> = "abcde".chars().collect();
        let mut out = Vec::new();
        hl.highlight(1, 5, &RuneSource(&text), &mut out);
        assert_eq!(out, vec![2, 3, 1, 1]);
        hl.alter(1);
        out.clear();
        hl.highlight(0, 3, &RuneSource(&text), &mut out);
        assert_eq!(out, vec![2, 1, 1]);
    }

    #[test]
    fn test_highlighter_for_name() {
        let rules = default_rules();
        let text: Vec<char> = "# hi".chars().collect();
        let mut out = Vec::new();
        let mut hl = highlighter_for(&rules, "script.py").unwrap();
        hl.highlight(0, 4, &RuneSource(&text), &mut out);
        assert_eq!(out, vec![3, 3, 3, 3]);

        out.clear();
        let mut hl = highlighter_for(&rules, "notes.txt").unwrap();
        hl.highlight(0, 4, &RuneSource(&text), &mut out);
        assert_eq!(out, vec![1, 1, 1, 1]);
    }
}
