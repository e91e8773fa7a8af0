//! Edit program parser.
//!
//! A program is a single command, possibly a `{ ... }` block. Each command
//! is an optional address followed by a command letter and its arguments.
//! Parsing either consumes the whole program or fails; execution never
//! starts on a partial parse.

use std::fmt;

use super::addr::{Addr, AddrBase, AddrDir, AddrKind, Search};
use super::EditError;
use crate::regex::Regex;

/// Pattern `x` loops over when given no regex: every line
const LINES_PATTERN: &str = ".*\n|.+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdKind {
    /// Address only: moves dot
    Nil,
    Append,
    Change,
    Insert,
    Delete,
    Substitute,
    Move,
    Copy,
    Print,
    Position,
    Loop,
    Gaps,
    Guard,
    Unless,
    PipeIn,
    PipeOut,
    Pipe,
    EditFile,
    ReadFile,
    WriteFile,
    Block,
}

/// Argument shapes a command letter takes
struct Shape {
    text_args: usize,
    optional_text: bool,
    number: bool,
    target: bool,
    body: bool,
    tail: bool,
}

impl Shape {
    const NONE: Shape = Shape {
        text_args: 0,
        optional_text: false,
        number: false,
        target: false,
        body: false,
        tail: false,
    };
}

impl CmdKind {
    pub fn from_letter(c: char) -> Option<Self> {
        Some(match c {
            'a' => CmdKind::Append,
            'c' => CmdKind::Change,
            'i' => CmdKind::Insert,
            'd' => CmdKind::Delete,
            's' => CmdKind::Substitute,
            'm' => CmdKind::Move,
            't' => CmdKind::Copy,
            'p' => CmdKind::Print,
            '=' => CmdKind::Position,
            'x' => CmdKind::Loop,
            'y' => CmdKind::Gaps,
            'g' => CmdKind::Guard,
            'v' => CmdKind::Unless,
            '<' => CmdKind::PipeIn,
            '>' => CmdKind::PipeOut,
            '|' => CmdKind::Pipe,
            'e' => CmdKind::EditFile,
            'r' => CmdKind::ReadFile,
            'w' => CmdKind::WriteFile,
            '{' => CmdKind::Block,
            _ => return None,
        })
    }

    pub fn letter(self) -> char {
        match self {
            CmdKind::Nil => ' ',
            CmdKind::Append => 'a',
            CmdKind::Change => 'c',
            CmdKind::Insert => 'i',
            CmdKind::Delete => 'd',
            CmdKind::Substitute => 's',
            CmdKind::Move => 'm',
            CmdKind::Copy => 't',
            CmdKind::Print => 'p',
            CmdKind::Position => '=',
            CmdKind::Loop => 'x',
            CmdKind::Gaps => 'y',
            CmdKind::Guard => 'g',
            CmdKind::Unless => 'v',
            CmdKind::PipeIn => '<',
            CmdKind::PipeOut => '>',
            CmdKind::Pipe => '|',
            CmdKind::EditFile => 'e',
            CmdKind::ReadFile => 'r',
            CmdKind::WriteFile => 'w',
            CmdKind::Block => '{',
        }
    }

    fn shape(self) -> Shape {
        match self {
            CmdKind::Append | CmdKind::Change | CmdKind::Insert => Shape {
                text_args: 1,
                ..Shape::NONE
            },
            CmdKind::Substitute => Shape {
                text_args: 2,
                number: true,
                ..Shape::NONE
            },
            CmdKind::Move | CmdKind::Copy => Shape {
                target: true,
                ..Shape::NONE
            },
            CmdKind::Loop => Shape {
                text_args: 1,
                optional_text: true,
                body: true,
                ..Shape::NONE
            },
            CmdKind::Gaps | CmdKind::Guard | CmdKind::Unless => Shape {
                text_args: 1,
                body: true,
                ..Shape::NONE
            },
            CmdKind::PipeIn
            | CmdKind::PipeOut
            | CmdKind::Pipe
            | CmdKind::EditFile
            | CmdKind::ReadFile
            | CmdKind::WriteFile
            | CmdKind::Position => Shape {
                tail: true,
                ..Shape::NONE
            },
            CmdKind::Nil | CmdKind::Delete | CmdKind::Print | CmdKind::Block => Shape::NONE,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone)]
pub struct Cmd {
    pub kind: CmdKind,
    pub range: Addr,
    /// `sN`: replace only the N-th match; 0 means every match
    pub num: usize,
    pub args: Vec<String>,
    /// Delimiter the text arguments were written with
    pub delim: Option<char>,
    /// `s///g`
    pub global: bool,
    /// Destination of `m` and `t`
    pub target: Option<Addr>,
    /// Body of `x`, `y`, `g` and `v`
    pub body: Option<Box<Cmd>>,
    /// Children of a block
    pub block: Vec<Cmd>,
    /// Rest-of-line argument of pipes, file commands and `=`
    pub tail: String,
    /// Compiled pattern of `s`, `x`, `y`, `g` and `v`
    pub regex: Option<Regex>,
}

impl Cmd {
    fn new(kind: CmdKind, range: Addr) -> Self {
        Self {
            kind,
            range,
            num: 0,
            args: Vec::new(),
            delim: None,
            global: false,
            target: None,
            body: None,
            block: Vec::new(),
            tail: String::new(),
            regex: None,
        }
    }

    pub fn letter(&self) -> char {
        self.kind.letter()
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range<{}> Cmd<{}>", self.range, self.letter())?;
        if self.num != 0 {
            write!(f, " Num<{}>", self.num)?;
        }
        for arg in &self.args {
            write!(f, " Arg<{}>", arg)?;
        }
        if self.global {
            write!(f, " Flags<1>")?;
        }
        if let Some(target) = &self.target {
            write!(f, " Addr<{}>", target)?;
        }
        if let Some(body) = &self.body {
            write!(f, " Body<{}>", body)?;
        }
        if !self.tail.is_empty() {
            write!(f, " Body<{}>", self.tail)?;
        }
        if !self.block.is_empty() {
            write!(f, " Body<")?;
            for (i, child) in self.block.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

// =============================================================================
// Address tokens
// =============================================================================

#[derive(Debug, Clone)]
enum Tok {
    /// `+ - , ;`
    Op(char),
    Dot,
    End,
    Line(Option<usize>),
    Char(Option<usize>),
    Word(Option<usize>),
    EndOfLine(Option<usize>),
    Search { pattern: String, reverse: bool },
}

fn is_address_start(c: char) -> bool {
    matches!(c, '+' | '-' | ',' | ';' | '.' | '$' | '/' | '?' | '#') || c.is_ascii_digit()
}

/// Parses a whole string as an address
pub fn parse_address(text: &str) -> Result<Addr, EditError> {
    let mut parser = Parser::new(text);
    let mut toks = Vec::new();
    loop {
        parser.skip_spaces();
        if parser.at_end() {
            break;
        }
        toks.push(parser.address_tok()?);
    }
    build_address(&toks)
}

/// Parses a whole program
pub fn parse(program: &str) -> Result<Cmd, EditError> {
    let mut parser = Parser::new(program);
    let cmd = parser.command()?;
    parser.skip_spaces();
    if !parser.at_end() {
        return Err(EditError::Parse(format!(
            "spurious characters <{}> after <{}>",
            parser.rest(),
            program
        )));
    }
    Ok(cmd)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n')) {
            self.pos += 1;
        }
    }

    fn number(&mut self) -> Result<Option<usize>, EditError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse()
            .map(Some)
            .map_err(|_| EditError::Parse(format!("number out of range: {}", digits)))
    }

    /// Reads up to the next unescaped `delim` and consumes it.
    ///
    /// `\delim` always becomes `delim`. With `unescape`, `\n`, `\t` and
    /// `\\` are expanded too; other escapes are kept as written.
    fn delimited(&mut self, delim: char, unescape: bool) -> Result<String, EditError> {
        let start = self.pos;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == delim {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let Some(next) = self.peek() else {
                out.push('\\');
                break;
            };
            self.pos += 1;
            match next {
                _ if next == delim => out.push(delim),
                'n' if unescape => out.push('\n'),
                't' if unescape => out.push('\t'),
                '\\' if unescape => out.push('\\'),
                _ => {
                    out.push('\\');
                    out.push(next);
                }
            }
        }
        Err(EditError::Parse(format!(
            "could not find matching {} while parsing <{}>",
            delim,
            self.chars[start..].iter().collect::<String>()
        )))
    }

    fn address_tok(&mut self) -> Result<Tok, EditError> {
        let Some(c) = self.peek() else {
            return Err(EditError::Parse("unexpected end of address".to_string()));
        };
        self.pos += 1;
        match c {
            '+' | '-' | ',' | ';' => Ok(Tok::Op(c)),
            '.' => Ok(Tok::Dot),
            '$' => Ok(Tok::End),
            '/' | '?' => Ok(Tok::Search {
                pattern: self.delimited(c, false)?,
                reverse: c == '?',
            }),
            '#' => match self.peek() {
                Some('w') => {
                    self.pos += 1;
                    Ok(Tok::Word(self.number()?))
                }
                Some('?') => {
                    self.pos += 1;
                    Ok(Tok::EndOfLine(self.number()?))
                }
                _ => Ok(Tok::Char(self.number()?)),
            },
            '0'..='9' => {
                self.pos -= 1;
                Ok(Tok::Line(self.number()?))
            }
            _ => Err(EditError::Parse(format!(
                "unexpected character {} while parsing address",
                c
            ))),
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn command(&mut self) -> Result<Cmd, EditError> {
        let mut toks = Vec::new();
        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else {
                return Ok(Cmd::new(CmdKind::Nil, build_address(&toks)?));
            };
            if c == '}' {
                return Ok(Cmd::new(CmdKind::Nil, build_address(&toks)?));
            }
            if let Some(kind) = CmdKind::from_letter(c) {
                self.pos += 1;
                let range = build_address(&toks)?;
                return self.arguments(kind, range);
            }
            if !is_address_start(c) {
                return Err(EditError::Parse(format!("unknown command {}", c)));
            }
            toks.push(self.address_tok()?);
        }
    }

    fn arguments(&mut self, kind: CmdKind, range: Addr) -> Result<Cmd, EditError> {
        let mut cmd = Cmd::new(kind, range);
        let shape = kind.shape();

        if kind == CmdKind::Block {
            return self.block(cmd);
        }

        if shape.tail {
            self.skip_spaces_inline();
            cmd.tail = self.line_tail();
            return Ok(cmd);
        }

        self.skip_spaces();
        if shape.number {
            cmd.num = self.number()?.unwrap_or(0);
            self.skip_spaces();
        }

        if shape.text_args > 0 {
            let unescape = matches!(kind, CmdKind::Append | CmdKind::Change | CmdKind::Insert);
            match self.peek() {
                Some(c) if !c.is_alphanumeric() && !c.is_whitespace() && c != '{' => {
                    self.pos += 1;
                    cmd.delim = Some(c);
                    for _ in 0..shape.text_args {
                        cmd.args.push(self.delimited(c, unescape)?);
                    }
                    self.skip_spaces();
                }
                _ if shape.optional_text => {}
                Some(c) => {
                    return Err(EditError::Parse(format!(
                        "expected argument to {} but character {} found",
                        kind.letter(),
                        c
                    )))
                }
                None => {
                    return Err(EditError::Parse(format!(
                        "expected argument to {}",
                        kind.letter()
                    )))
                }
            }
        }

        if kind == CmdKind::Substitute {
            while self.peek() == Some('g') {
                self.pos += 1;
                cmd.global = true;
            }
            self.skip_spaces();
        }

        if shape.target {
            let mut toks = Vec::new();
            loop {
                self.skip_spaces_inline();
                match self.peek() {
                    Some(c) if is_address_start(c) => toks.push(self.address_tok()?),
                    _ => break,
                }
            }
            cmd.target = Some(build_address(&toks)?);
        }

        if matches!(
            kind,
            CmdKind::Substitute | CmdKind::Loop | CmdKind::Gaps | CmdKind::Guard | CmdKind::Unless
        ) {
            let pattern = cmd.args.first().map(String::as_str).unwrap_or(LINES_PATTERN);
            cmd.regex = Some(Regex::compile(pattern, true, false)?);
        }

        if shape.body {
            cmd.body = Some(Box::new(self.command()?));
        }

        Ok(cmd)
    }

    fn block(&mut self, mut cmd: Cmd) -> Result<Cmd, EditError> {
        loop {
            self.skip_spaces();
            match self.peek() {
                None => return Err(EditError::Parse("unmatched {".to_string())),
                Some('}') => {
                    self.pos += 1;
                    return Ok(cmd);
                }
                Some(_) => cmd.block.push(self.command()?),
            }
        }
    }

    fn skip_spaces_inline(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    /// Everything up to the end of the line, trimmed
    fn line_tail(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    }
}

// =============================================================================
// Address grammar
// =============================================================================

/// `addr := low ((',' | ';') low)*` with missing operands defaulting to
/// the start and the end of the store
fn build_address(toks: &[Tok]) -> Result<Addr, EditError> {
    let (first, mut rest) = parse_low(toks)?;
    let mut addr = first;

    loop {
        let Some(tok) = rest.first() else {
            return Ok(addr.unwrap_or_default());
        };
        let op = match tok {
            Tok::Op(op @ (',' | ';')) => *op,
            other => {
                return Err(EditError::Parse(format!(
                    "unexpected address token {:?}",
                    other
                )))
            }
        };
        let (rh, after) = parse_low(&rest[1..])?;
        rest = after;
        let lh = addr.unwrap_or_else(|| {
            Addr::Base(AddrBase::new(AddrKind::Line, 0, AddrDir::Absolute))
        });
        let rh = rh.unwrap_or_else(|| Addr::Base(AddrBase::new(AddrKind::End, 0, AddrDir::Absolute)));
        addr = Some(Addr::Op {
            op,
            lh: Box::new(lh),
            rh: Box::new(rh),
        });
    }
}

/// A chain of bases joined by explicit or implicit `+`/`-`
fn parse_low(toks: &[Tok]) -> Result<(Option<Addr>, &[Tok]), EditError> {
    let (first, mut rest) = parse_base(toks)?;
    let mut bases = vec![first.map(|(base, _)| base)];

    while let Some(tok) = rest.first() {
        let (dir, explicit) = match tok {
            Tok::Op('-') => (AddrDir::Minus, true),
            Tok::Op('+') => (AddrDir::Plus, true),
            _ => (AddrDir::Plus, false),
        };
        if explicit {
            rest = &rest[1..];
        }

        let (next, after) = parse_base(rest)?;
        rest = after;
        match next {
            Some((mut base, counted)) => {
                base.dir = dir;
                if !counted {
                    base.count = 1;
                }
                bases.push(Some(base));
            }
            None if explicit => bases.push(Some(AddrBase::new(AddrKind::Line, 1, dir))),
            None => break,
        }
    }

    if bases.len() == 1 {
        return Ok((bases.pop().flatten().map(Addr::Base), rest));
    }
    let bases = bases
        .into_iter()
        .map(|b| b.unwrap_or_else(AddrBase::dot))
        .collect();
    Ok((Some(Addr::List(bases)), rest))
}

/// One base address, and whether it was written with an explicit count
fn parse_base(toks: &[Tok]) -> Result<(Option<(AddrBase, bool)>, &[Tok]), EditError> {
    let Some(tok) = toks.first() else {
        return Ok((None, toks));
    };
    let numbered = |kind, n: &Option<usize>| {
        Some((
            AddrBase::new(kind, n.unwrap_or(0), AddrDir::Absolute),
            n.is_some(),
        ))
    };
    let base = match tok {
        Tok::Dot => Some((AddrBase::dot(), true)),
        Tok::End => Some((AddrBase::new(AddrKind::End, 0, AddrDir::Absolute), true)),
        Tok::Line(n) => numbered(AddrKind::Line, n),
        Tok::Char(n) => numbered(AddrKind::Char, n),
        Tok::Word(n) => numbered(AddrKind::Word, n),
        Tok::EndOfLine(n) => numbered(AddrKind::EndOfLine, n),
        Tok::Search { pattern, reverse } => Some((
            AddrBase::new(
                AddrKind::Search(Search::new(pattern, *reverse)?),
                0,
                AddrDir::Plus,
            ),
            true,
        )),
        Tok::Op(_) => None,
    };
    match base {
        Some(base) => Ok((Some(base), &toks[1..])),
        None => Ok((None, toks)),
    }
}
