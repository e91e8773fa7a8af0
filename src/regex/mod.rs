//! Regular expressions over character-indexed text.
//!
//! Patterns are compiled to a small bytecode program and executed with a
//! Pike VM, so matching never backtracks. The same program can be compiled
//! to scan right to left, which is how backward searches (`?re?`) work.
//!
//! Supported syntax: literals, `.`, bracket classes with ranges, escapes and
//! `[:posix:]` names, `\d \D \s \S \w \W`, anchors `^ $ \A \z \b \B`,
//! capturing `(...)` and non-capturing `(?:...)` groups, `|`, and `* + ?`
//! with an optional lazy `?` suffix. Escapes `\a \f \t \n \r \v` and
//! `\xHHHHHH` (six hex digits) produce literal characters.

pub mod class;
pub mod compile;
mod exec;
pub mod parse;

use std::fmt;

use self::class::CharClass;
use self::compile::{emit, Instr};
use self::parse::{Node, RepeatKind};

/// Character-indexed text a regex can run against
pub trait Matchable {
    /// Number of characters
    fn size(&self) -> usize;
    /// Character at `pos`, `None` past the end
    fn char_at(&self, pos: usize) -> Option<char>;
}

/// A borrowed slice of characters
#[derive(Debug, Clone, Copy)]
pub struct RuneSource<'a>(pub &'a [char]);

impl Matchable for RuneSource<'_> {
    fn size(&self) -> usize {
        self.0.len()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.0.get(pos).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Errors raised while compiling a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    RepeatAtBranchStart,
    UnterminatedEscape,
    UnmatchedParen,
    UnexpectedChar { ch: char, pos: usize },
    UnmatchedBracket,
    BadClassName(String),
    BadHex,
    /// Any of the above, tagged with the pattern that caused it
    InPattern { pattern: String, error: Box<RegexError> },
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatAtBranchStart => write!(f, "repeat character at beginning of a branch"),
            Self::UnterminatedEscape => write!(f, "unterminated escape sequence"),
            Self::UnmatchedParen => write!(f, "unmatched open parenthesis"),
            Self::UnexpectedChar { ch, pos } => write!(f, "unexpected character {} at {}", ch, pos),
            Self::UnmatchedBracket => write!(f, "unmatched [ parenthesis"),
            Self::BadClassName(name) => write!(f, "invalid character class name: {}", name),
            Self::BadHex => write!(f, "bad hexadecimal sequence"),
            Self::InPattern { pattern, error } => {
                write!(f, "error compiling {}: {}", pattern, error)
            }
        }
    }
}

impl std::error::Error for RegexError {}

/// Capture slots of a successful match: `2n`/`2n+1` bound group `n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    slots: Vec<Option<usize>>,
}

impl Captures {
    pub fn new(slots: Vec<Option<usize>>) -> Self {
        Self { slots }
    }

    /// Start of the whole match
    pub fn start(&self) -> usize {
        self.slots.first().copied().flatten().unwrap_or(0)
    }

    /// End of the whole match
    pub fn end(&self) -> usize {
        self.slots.get(1).copied().flatten().unwrap_or(0)
    }

    /// Bounds of group `n`, if it took part in the match
    pub fn group(&self, n: usize) -> Option<(usize, usize)> {
        match (self.slots.get(2 * n)?, self.slots.get(2 * n + 1)?) {
            (Some(s), Some(e)) => Some((*s, *e)),
            _ => None,
        }
    }

    pub fn group_count(&self) -> usize {
        self.slots.len() / 2
    }

    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }

    /// Slots as signed offsets, `-1` for unset
    pub fn to_offsets(&self) -> Vec<i64> {
        self.slots
            .iter()
            .map(|s| s.map(|p| p as i64).unwrap_or(-1))
            .collect()
    }
}

/// A compiled pattern
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: String,
    program: Vec<Instr>,
    slots: usize,
    backward: bool,
}

impl Regex {
    /// Compiles `pattern`.
    ///
    /// With `for_search` the program is prefixed by a lazy "anything" loop,
    /// so a run finds the first match at or after the start instead of only
    /// a match anchored there. With `backward` the program scans right to left.
    pub fn compile(pattern: &str, for_search: bool, backward: bool) -> Result<Self, RegexError> {
        let ast = parse::parse(pattern).map_err(|error| RegexError::InPattern {
            pattern: pattern.to_string(),
            error: Box::new(error),
        })?;

        let mut program = Vec::new();
        if for_search {
            let prefix = Node::Repeat {
                kind: RepeatKind::ZeroOrMore,
                greedy: false,
                child: Box::new(Node::Class(CharClass::any())),
            };
            emit(&prefix, &mut program, backward);
        }
        emit(&ast, &mut program, backward);
        program.push(Instr::Match);

        Ok(Self::from_program(pattern, program, backward))
    }

    /// Builds a program matching any text that contains the characters of
    /// `needle` in order, with arbitrary (single-line) gaps between them.
    ///
    /// Group `2i+1` is the gap before the i-th needle character, group
    /// `2i+2` the character itself.
    pub fn compile_fuzzy_search(needle: &str) -> Self {
        let mut nodes = Vec::new();
        for (i, c) in needle.chars().enumerate() {
            nodes.push(Node::Alt {
                group: Some(2 * i + 1),
                branches: vec![Node::Repeat {
                    kind: RepeatKind::ZeroOrMore,
                    greedy: false,
                    child: Box::new(Node::Class(CharClass::dot())),
                }],
            });
            nodes.push(Node::Alt {
                group: Some(2 * i + 2),
                branches: vec![Node::Char(c)],
            });
        }
        let ast = Node::Alt {
            group: Some(0),
            branches: vec![Node::Group(nodes)],
        };

        let mut program = Vec::new();
        emit(&ast, &mut program, false);
        program.push(Instr::Match);
        Self::from_program(needle, program, false)
    }

    fn from_program(pattern: &str, program: Vec<Instr>, backward: bool) -> Self {
        let highest = program
            .iter()
            .filter_map(|ix| match ix {
                Instr::Save(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(1);
        let slots = (highest + 2) & !1;
        Self {
            pattern: pattern.to_string(),
            program,
            slots: slots.max(2),
            backward,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// Runs the program from `start` towards `end`.
    ///
    /// Forward runs need `end >= start`, backward runs `end <= start`; `end`
    /// is clamped to the text size. The first thread to reach `Match` wins.
    pub fn match_at(
        &self,
        text: &dyn Matchable,
        start: usize,
        end: usize,
        dir: Direction,
    ) -> Option<Captures> {
        let size = text.size();
        let start = start.min(size);
        let end = end.min(size);
        exec::run(&self.program, self.slots, text, start, end, dir)
    }

    /// Forward search in `[start, size]` for a forward program, backward
    /// search in `[0, start]` for a backward one.
    pub fn find(&self, text: &dyn Matchable, start: usize) -> Option<Captures> {
        if self.backward {
            self.match_at(text, start, 0, Direction::Backward)
        } else {
            self.match_at(text, start, text.size(), Direction::Forward)
        }
    }

    /// Human readable program dump, one instruction per line
    pub fn program_listing(&self) -> String {
        self.program
            .iter()
            .enumerate()
            .map(|(i, ix)| format!("{:04}\t{}\n", i, ix))
            .collect()
    }
}
