//! Address AST and evaluation.
//!
//! Every address evaluates to exactly one [`Sel`] given the store and the
//! current dot. Positions that fall outside the store are clamped.

use std::fmt;

use super::EditError;
use crate::regex::{Captures, Direction, Regex};
use crate::store::{Sel, TextStore};

/// How a base address relates to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrDir {
    Absolute,
    Plus,
    Minus,
}

#[derive(Debug, Clone)]
pub enum AddrKind {
    /// `.`
    Dot,
    /// `$`
    End,
    /// bare number
    Line,
    /// `#n`
    Char,
    /// `#wn`
    Word,
    /// `#?1`
    EndOfLine,
    /// `/re/` or `?re?`
    Search(Search),
}

/// A compiled regex address.
///
/// Both directions are compiled up front: the direction actually used
/// depends on the sign the address ends up with inside a list.
#[derive(Debug, Clone)]
pub struct Search {
    /// Pattern as written, including a leading `@`
    pub pattern: String,
    /// Written as `?re?`
    pub reverse: bool,
    /// `@` patterns yield dot instead of failing
    pub lenient: bool,
    forward: Regex,
    backward: Regex,
}

impl Search {
    pub fn new(pattern: &str, reverse: bool) -> Result<Self, EditError> {
        let (lenient, body) = match pattern.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        Ok(Self {
            pattern: pattern.to_string(),
            reverse,
            lenient,
            forward: Regex::compile(body, true, false)?,
            backward: Regex::compile(body, true, true)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AddrBase {
    pub kind: AddrKind,
    pub count: usize,
    pub dir: AddrDir,
}

impl AddrBase {
    pub fn new(kind: AddrKind, count: usize, dir: AddrDir) -> Self {
        Self { kind, count, dir }
    }

    pub fn dot() -> Self {
        Self::new(AddrKind::Dot, 0, AddrDir::Absolute)
    }
}

#[derive(Debug, Clone)]
pub enum Addr {
    Base(AddrBase),
    /// Bases applied left to right, each relative to the previous result
    List(Vec<AddrBase>),
    /// `,` or `;`
    Op {
        op: char,
        lh: Box<Addr>,
        rh: Box<Addr>,
    },
}

impl Default for Addr {
    fn default() -> Self {
        Addr::Base(AddrBase::dot())
    }
}

// =============================================================================
// Display
// =============================================================================

impl fmt::Display for AddrBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dir {
            AddrDir::Absolute => {}
            AddrDir::Plus => write!(f, "+")?,
            AddrDir::Minus => write!(f, "-")?,
        }
        match &self.kind {
            AddrKind::Dot => write!(f, "."),
            AddrKind::End => write!(f, "$"),
            AddrKind::Line => write!(f, "{}", self.count),
            AddrKind::Char => write!(f, "#{}", self.count),
            AddrKind::Word => write!(f, "#w{}", self.count),
            AddrKind::EndOfLine => write!(f, "#?{}", self.count),
            AddrKind::Search(search) => {
                let delim = if search.reverse { '?' } else { '/' };
                write!(f, "{}{}", delim, search.pattern)
            }
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addr::Base(base) => write!(f, "{}", base),
            Addr::List(bases) => {
                write!(f, "List<")?;
                for base in bases {
                    write!(f, "{} ", base)?;
                }
                write!(f, ">")
            }
            Addr::Op { op, lh, rh } => write!(f, "Op<{} {} {}>", lh, op, rh),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

impl Addr {
    pub fn eval(&self, store: &TextStore, dot: Sel) -> Result<Sel, EditError> {
        let sel = match self {
            Addr::Base(base) => base.eval(store, dot)?,
            Addr::List(bases) => {
                let mut sel = dot;
                for base in bases {
                    sel = base.eval(store, sel)?;
                }
                sel
            }
            Addr::Op { op, lh, rh } => {
                let l = lh.eval(store, dot)?;
                let r = if *op == ';' {
                    rh.eval(store, l)?
                } else {
                    rh.eval(store, dot)?
                };
                if l.start > r.end {
                    return Err(EditError::Address(format!(
                        "addresses out of order: {} {} {}",
                        l, op, r
                    )));
                }
                Sel::new(l.start, r.end)
            }
        };
        Ok(store.fix_sel(sel))
    }
}

impl AddrBase {
    fn eval(&self, store: &TextStore, dot: Sel) -> Result<Sel, EditError> {
        let size = store.len();
        let dot = store.fix_sel(dot);

        match &self.kind {
            AddrKind::Dot => {
                self.require_absolute(".")?;
                Ok(dot)
            }
            AddrKind::End => {
                self.require_absolute("$")?;
                Ok(Sel::point(size))
            }
            AddrKind::Line => Ok(self.eval_line(store, dot)),
            AddrKind::Char => {
                let p = match self.dir {
                    AddrDir::Absolute => self.count,
                    AddrDir::Plus => dot.end.saturating_add(self.count),
                    AddrDir::Minus => dot.start.saturating_sub(self.count),
                };
                Ok(Sel::point(p.min(size)))
            }
            AddrKind::Word => Ok(self.eval_word(store, dot)),
            AddrKind::EndOfLine => {
                if self.dir != AddrDir::Minus || self.count != 1 {
                    return Err(EditError::Address(
                        "#? is only supported as -#?1".to_string(),
                    ));
                }
                let mut p = dot.end;
                if dot.start < dot.end && store.char_at(p - 1) == Some('\n') {
                    p -= 1;
                }
                Ok(Sel::point(p))
            }
            AddrKind::Search(search) => self.eval_search(search, store, dot),
        }
    }

    fn require_absolute(&self, what: &str) -> Result<(), EditError> {
        if self.dir != AddrDir::Absolute {
            return Err(EditError::Address(format!(
                "bad address syntax, non-absolute '{}'",
                what
            )));
        }
        Ok(())
    }

    fn eval_line(&self, store: &TextStore, dot: Sel) -> Sel {
        if self.dir == AddrDir::Minus {
            let mut prev = dot.start;
            let mut start = line_back(store, dot.start as isize - 1).min(prev);
            for _ in 0..self.count {
                prev = start;
                start = line_back(store, start as isize - 2);
            }
            return Sel::new(start, prev);
        }

        let (mut sel, steps) = match self.dir {
            AddrDir::Absolute if self.count == 0 => return Sel::point(0),
            AddrDir::Absolute => (Sel::point(0), self.count - 1),
            _ => (dot, self.count),
        };
        if !sel.is_empty() {
            sel.end -= 1;
        }

        let mut prev = sel.end;
        let mut end = store.to_newline(sel.start, Direction::Forward);
        for _ in 0..steps {
            prev = end;
            end = store.to_newline(end, Direction::Forward);
        }
        Sel::new(prev, end)
    }

    fn eval_word(&self, store: &TextStore, dot: Sel) -> Sel {
        let mut sel = match self.dir {
            AddrDir::Absolute => Sel::point(0),
            _ => dot,
        };
        for _ in 0..self.count {
            if self.dir == AddrDir::Minus {
                sel.end = sel.start;
                sel.start = match sel.start.checked_sub(1) {
                    Some(p) => store.to_word_boundary(p, Direction::Backward, false),
                    None => 0,
                };
            } else {
                sel.start = sel.end;
                sel.end = store.to_word_boundary(sel.end, Direction::Forward, false);
            }
        }
        store.fix_sel(sel)
    }

    fn eval_search(&self, search: &Search, store: &TextStore, dot: Sel) -> Result<Sel, EditError> {
        let forward = search.reverse == (self.dir == AddrDir::Minus);
        let from = match self.dir {
            AddrDir::Absolute => 0,
            _ if forward => dot.end,
            _ => dot.start,
        };

        let found = if forward {
            find_wrapping(&search.forward, store, from, Direction::Forward)
        } else {
            find_wrapping(&search.backward, store, from, Direction::Backward)
        };

        match found {
            Some(m) => Ok(Sel::new(m.start(), m.end())),
            None if search.lenient => Ok(dot),
            None => Err(EditError::NoMatch(search.pattern.clone())),
        }
    }
}

/// Start of the line before position `p`; negative positions are the
/// start of the store
fn line_back(store: &TextStore, p: isize) -> usize {
    if p < 0 {
        0
    } else {
        store.to_newline(p as usize, Direction::Backward)
    }
}

/// Searches from `from` towards the end of the store in `dir`, then once
/// more from the opposite end. An empty match right at `from` does not
/// count, so repeated searches always make progress.
fn find_wrapping(re: &Regex, store: &TextStore, from: usize, dir: Direction) -> Option<Captures> {
    let size = store.len();
    let limit = match dir {
        Direction::Forward => size,
        Direction::Backward => 0,
    };

    let mut m = re.match_at(store, from, limit, dir);
    if let Some(found) = &m {
        if found.start() == found.end() && found.start() == from {
            m = match dir {
                Direction::Forward if from < size => re.match_at(store, from + 1, size, dir),
                Direction::Backward if from > 0 => re.match_at(store, from - 1, 0, dir),
                _ => None,
            };
        }
    }

    m.or_else(|| {
        let restart = match dir {
            Direction::Forward => 0,
            Direction::Backward => size,
        };
        re.match_at(store, restart, limit, dir)
    })
}
