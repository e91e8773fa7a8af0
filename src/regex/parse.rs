//! Pattern parser: turns a pattern string into a [`Node`] tree.

use std::fmt;

use super::class::{posix_class, Assertion, CharClass, Predicate};
use super::RegexError;

/// How a repeated node may repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatKind {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `?`
    ZeroOrOne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Char(char),
    Class(CharClass),
    Assert(Assertion),
    /// A sequence (one branch of an alternation)
    Group(Vec<Node>),
    Repeat {
        kind: RepeatKind,
        greedy: bool,
        child: Box<Node>,
    },
    /// Alternation; `group` is the capture index, `None` for `(?:...)`
    Alt {
        group: Option<usize>,
        branches: Vec<Node>,
    },
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Char(c) => write!(f, "char({})", c),
            Node::Class(class) => write!(f, "class({})", class.name),
            Node::Assert(a) => write!(f, "assert({})", a),
            Node::Group(nodes) => {
                f.write_str("branch(")?;
                for (i, n) in nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", n)?;
                }
                f.write_str(")")
            }
            Node::Repeat {
                kind,
                greedy,
                child,
            } => {
                let op = match kind {
                    RepeatKind::ZeroOrMore => '*',
                    RepeatKind::OneOrMore => '+',
                    RepeatKind::ZeroOrOne => '?',
                };
                let lazy = if *greedy { "" } else { "?" };
                write!(f, "rep({}{} {})", op, lazy, child)
            }
            Node::Alt { group, branches } => {
                let no = group.map(|g| g as i64).unwrap_or(-1);
                write!(f, "alt({} ", no)?;
                for (i, b) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", b)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parses a whole pattern. The result is always group 0.
pub fn parse(pattern: &str) -> Result<Node, RegexError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut parser = Parser {
        src: &chars,
        pos: 0,
        next_group: 1,
    };
    let branches = parser.parse_alt()?;
    if let Some(&ch) = chars.get(parser.pos) {
        return Err(RegexError::UnexpectedChar {
            ch,
            pos: parser.pos,
        });
    }
    Ok(Node::Alt {
        group: Some(0),
        branches,
    })
}

struct Parser<'a> {
    src: &'a [char],
    pos: usize,
    next_group: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn parse_alt(&mut self) -> Result<Vec<Node>, RegexError> {
        let mut branches = vec![self.parse_branch()?];
        while self.peek() == Some('|') {
            self.pos += 1;
            branches.push(self.parse_branch()?);
        }
        Ok(branches)
    }

    fn parse_paren(&mut self) -> Result<Node, RegexError> {
        let group = if self.src[self.pos..].starts_with(&['?', ':']) {
            self.pos += 2;
            None
        } else {
            let g = self.next_group;
            self.next_group += 1;
            Some(g)
        };

        let branches = self.parse_alt()?;
        if self.peek() != Some(')') {
            return Err(RegexError::UnmatchedParen);
        }
        self.pos += 1;
        Ok(Node::Alt { group, branches })
    }

    fn parse_branch(&mut self) -> Result<Node, RegexError> {
        let mut nodes = Vec::new();

        while let Some(c) = self.peek() {
            match c {
                ')' | '|' => break,
                '\\' => {
                    self.pos += 1;
                    let esc = self.peek().ok_or(RegexError::UnterminatedEscape)?;
                    self.pos += 1;
                    nodes.push(self.parse_escape(esc)?);
                }
                '.' => {
                    self.pos += 1;
                    nodes.push(Node::Class(CharClass::dot()));
                }
                '^' => {
                    self.pos += 1;
                    nodes.push(Node::Assert(Assertion::BeginLine));
                }
                '$' => {
                    self.pos += 1;
                    nodes.push(Node::Assert(Assertion::EndLine));
                }
                '[' => {
                    self.pos += 1;
                    let class = self.parse_bracket()?;
                    nodes.push(Node::Class(class));
                }
                '*' | '+' | '?' => {
                    self.pos += 1;
                    let kind = match c {
                        '*' => RepeatKind::ZeroOrMore,
                        '+' => RepeatKind::OneOrMore,
                        _ => RepeatKind::ZeroOrOne,
                    };
                    let greedy = if self.peek() == Some('?') {
                        self.pos += 1;
                        false
                    } else {
                        true
                    };
                    let child = nodes.pop().ok_or(RegexError::RepeatAtBranchStart)?;
                    nodes.push(Node::Repeat {
                        kind,
                        greedy,
                        child: Box::new(child),
                    });
                }
                '(' => {
                    self.pos += 1;
                    nodes.push(self.parse_paren()?);
                }
                _ => {
                    self.pos += 1;
                    nodes.push(Node::Char(c));
                }
            }
        }

        Ok(Node::Group(nodes))
    }

    fn parse_escape(&mut self, esc: char) -> Result<Node, RegexError> {
        if let Some(assertion) = Assertion::from_escape(esc) {
            return Ok(Node::Assert(assertion));
        }
        if let Some(class) = CharClass::perl(esc) {
            return Ok(Node::Class(class));
        }
        if esc == 'x' {
            return Ok(Node::Char(self.read_hex()?));
        }
        Ok(Node::Char(named_escape(esc).unwrap_or(esc)))
    }

    /// Exactly six hex digits after `\x`
    fn read_hex(&mut self) -> Result<char, RegexError> {
        let digits = self.src.get(self.pos..self.pos + 6).ok_or(RegexError::BadHex)?;
        let text: String = digits.iter().collect();
        let n = u32::from_str_radix(&text, 16).map_err(|_| RegexError::BadHex)?;
        self.pos += 6;
        char::from_u32(n).ok_or(RegexError::BadHex)
    }

    /// Parses a bracket class; `self.pos` is just past the `[`
    fn parse_bracket(&mut self) -> Result<CharClass, RegexError> {
        let mut class = CharClass::user();
        let start = self.pos;

        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '^' if self.pos - 1 == start => class.inverted = true,
                ']' => return Ok(class),
                '[' => self.parse_posix(&mut class)?,
                '\\' => {
                    let esc = self.peek().ok_or(RegexError::UnmatchedBracket)?;
                    self.pos += 1;
                    if let Some((predicate, inv)) = super::class::perl_class(esc) {
                        class.predicates.push((predicate, inv));
                    } else if esc == 'x' {
                        let ch = self.read_hex()?;
                        class.chars.push(ch);
                    } else {
                        class.chars.push(named_escape(esc).unwrap_or(esc));
                    }
                }
                _ => {
                    let is_range = self.peek() == Some('-')
                        && self.src.get(self.pos + 1).is_some_and(|&e| e != ']');
                    if is_range {
                        let end = self.src[self.pos + 1];
                        class.ranges.push((c, end));
                        self.pos += 2;
                    } else {
                        class.chars.push(c);
                    }
                }
            }
        }

        Err(RegexError::UnmatchedBracket)
    }

    /// `[:name:]` or `[:^name:]`; `self.pos` is just past the inner `[`
    fn parse_posix(&mut self, class: &mut CharClass) -> Result<(), RegexError> {
        let rest = &self.src[self.pos..];
        let close = rest
            .iter()
            .position(|&c| c == ']')
            .ok_or(RegexError::UnmatchedBracket)?;
        let raw: String = rest[..close].iter().collect();
        self.pos += close + 1;

        let name = raw
            .strip_prefix(':')
            .and_then(|n| n.strip_suffix(':'))
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RegexError::BadClassName(raw.clone()))?;
        let (name, negated) = match name.strip_prefix('^') {
            Some(n) => (n, true),
            None => (name, false),
        };
        let predicate: Predicate =
            posix_class(name).ok_or_else(|| RegexError::BadClassName(raw.clone()))?;
        class.predicates.push((predicate, negated));
        Ok(())
    }
}

fn named_escape(c: char) -> Option<char> {
    match c {
        'a' => Some('\u{7}'),
        'f' => Some('\u{c}'),
        't' => Some('\t'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        'v' => Some('\u{b}'),
        _ => None,
    }
}
