//! Character classes and zero-width assertions.
//!
//! The named classes (`\d`, `[:alpha:]`, ...) and assertions (`^`, `\b`, ...)
//! live in immutable tables and are copied by value into the parsed pattern.

use std::fmt;

use super::Matchable;

/// A single Unicode predicate a class can be built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Digit,
    Space,
    /// Letter or digit
    Word,
    Letter,
    Ascii,
    Control,
    Print,
    Lower,
    Upper,
    Punct,
    HexDigit,
    /// Anything except a newline (`.`)
    NotNewline,
    /// Anything at all (the search prefix)
    Any,
}

impl Predicate {
    pub fn test(self, c: char) -> bool {
        match self {
            Predicate::Digit => c.is_numeric(),
            Predicate::Space => c.is_whitespace(),
            Predicate::Word => is_word_char(c),
            Predicate::Letter => c.is_alphabetic(),
            Predicate::Ascii => c.is_ascii(),
            Predicate::Control => c.is_control(),
            Predicate::Print => !c.is_control() && (c == ' ' || !c.is_whitespace()),
            Predicate::Lower => c.is_lowercase(),
            Predicate::Upper => c.is_uppercase(),
            Predicate::Punct => {
                c.is_ascii_punctuation()
                    || (!c.is_ascii()
                        && !c.is_alphanumeric()
                        && !c.is_whitespace()
                        && !c.is_control())
            }
            Predicate::HexDigit => c.is_ascii_hexdigit(),
            Predicate::NotNewline => c != '\n',
            Predicate::Any => true,
        }
    }
}

/// Word characters for `\w` and `\b`: letters and digits
pub fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c.is_numeric()
}

/// Perl shorthand classes: escape letter, predicate, inverted
pub const PERL_CLASSES: [(char, Predicate, bool); 6] = [
    ('d', Predicate::Digit, false),
    ('D', Predicate::Digit, true),
    ('s', Predicate::Space, false),
    ('S', Predicate::Space, true),
    ('w', Predicate::Word, false),
    ('W', Predicate::Word, true),
];

/// POSIX bracket classes usable as `[[:name:]]`
pub const POSIX_CLASSES: [(&str, Predicate); 14] = [
    ("alnum", Predicate::Word),
    ("alpha", Predicate::Letter),
    ("ascii", Predicate::Ascii),
    ("blank", Predicate::Space),
    ("cntrl", Predicate::Control),
    ("digit", Predicate::Digit),
    ("graph", Predicate::Print),
    ("lower", Predicate::Lower),
    ("print", Predicate::Print),
    ("punct", Predicate::Punct),
    ("space", Predicate::Space),
    ("upper", Predicate::Upper),
    ("word", Predicate::Word),
    ("xdigit", Predicate::HexDigit),
];

pub fn perl_class(letter: char) -> Option<(Predicate, bool)> {
    PERL_CLASSES
        .iter()
        .find(|(l, _, _)| *l == letter)
        .map(|&(_, p, inv)| (p, inv))
}

pub fn posix_class(name: &str) -> Option<Predicate> {
    POSIX_CLASSES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, p)| p)
}

/// A set of characters: explicit chars, inclusive ranges and predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub name: String,
    pub inverted: bool,
    pub chars: Vec<char>,
    pub ranges: Vec<(char, char)>,
    /// Predicates with their own negation flag (`\S` inside brackets)
    pub predicates: Vec<(Predicate, bool)>,
}

impl CharClass {
    /// An empty user-defined bracket class
    pub fn user() -> Self {
        Self {
            name: "userdef".to_string(),
            inverted: false,
            chars: Vec::new(),
            ranges: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// A class backed by a single predicate
    pub fn named(name: &str, predicate: Predicate, inverted: bool) -> Self {
        Self {
            name: name.to_string(),
            inverted,
            chars: Vec::new(),
            ranges: Vec::new(),
            predicates: vec![(predicate, false)],
        }
    }

    /// `.`
    pub fn dot() -> Self {
        Self::named(".", Predicate::NotNewline, false)
    }

    /// Matches every character, newline included
    pub fn any() -> Self {
        Self::named("any", Predicate::Any, false)
    }

    pub fn perl(letter: char) -> Option<Self> {
        perl_class(letter).map(|(p, inv)| Self::named(&format!("\\{}", letter), p, inv))
    }

    pub fn contains(&self, c: char) -> bool {
        let hit = self.predicates.iter().any(|&(p, neg)| p.test(c) != neg)
            || self.chars.contains(&c)
            || self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != self.inverted
    }
}

/// Zero-width assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    /// `\A`
    BeginText,
    /// `\z`
    EndText,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
    /// `^`
    BeginLine,
    /// `$`
    EndLine,
}

impl Assertion {
    /// Escape letter to assertion
    pub fn from_escape(letter: char) -> Option<Self> {
        match letter {
            'A' => Some(Assertion::BeginText),
            'z' => Some(Assertion::EndText),
            'b' => Some(Assertion::WordBoundary),
            'B' => Some(Assertion::NotWordBoundary),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Assertion::BeginText => "\\A",
            Assertion::EndText => "\\z",
            Assertion::WordBoundary => "\\b",
            Assertion::NotWordBoundary => "\\B",
            Assertion::BeginLine => "^",
            Assertion::EndLine => "$",
        }
    }

    /// Checks the assertion at boundary `pos` (between `pos-1` and `pos`)
    pub fn check(self, text: &dyn Matchable, pos: usize) -> bool {
        let size = text.size();
        let before = if pos == 0 { None } else { text.char_at(pos - 1) };
        let after = if pos >= size { None } else { text.char_at(pos) };
        match self {
            Assertion::BeginText => pos == 0,
            Assertion::EndText => pos >= size,
            Assertion::BeginLine => pos == 0 || before == Some('\n'),
            Assertion::EndLine => pos >= size || after == Some('\n'),
            Assertion::WordBoundary => word_boundary(before, after),
            Assertion::NotWordBoundary => !word_boundary(before, after),
        }
    }
}

fn word_boundary(before: Option<char>, after: Option<char>) -> bool {
    before.is_some_and(is_word_char) != after.is_some_and(is_word_char)
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::RuneSource;

    #[test]
    fn test_perl_classes_cover_inverse() {
        let d = CharClass::perl('d').unwrap();
        let nd = CharClass::perl('D').unwrap();
        for c in ['0', '7', 'a', ' ', '_'] {
            assert_ne!(d.contains(c), nd.contains(c), "char {:?}", c);
        }
    }

    #[test]
    fn test_word_excludes_underscore() {
        let w = CharClass::perl('w').unwrap();
        assert!(w.contains('x'));
        assert!(w.contains('9'));
        assert!(w.contains('é'));
        assert!(!w.contains('_'));
    }

    #[test]
    fn test_user_class_range_inclusive() {
        let mut class = CharClass::user();
        class.ranges.push(('a', 'c'));
        assert!(class.contains('a'));
        assert!(class.contains('c'));
        assert!(!class.contains('d'));
        class.inverted = true;
        assert!(class.contains('d'));
    }

    #[test]
    fn test_posix_lookup() {
        assert_eq!(posix_class("xdigit"), Some(Predicate::HexDigit));
        assert_eq!(posix_class("nope"), None);
    }

    #[test]
    fn test_line_assertions() {
        let chars: Vec<char> = "ab\ncd".chars().collect();
        let text = RuneSource(&chars);
        assert!(Assertion::BeginLine.check(&text, 0));
        assert!(!Assertion::BeginLine.check(&text, 1));
        assert!(Assertion::BeginLine.check(&text, 3));
        assert!(Assertion::EndLine.check(&text, 2));
        assert!(Assertion::EndLine.check(&text, 5));
        assert!(!Assertion::EndLine.check(&text, 4));
    }

    #[test]
    fn test_word_boundary_at_edges() {
        let chars: Vec<char> = "x y".chars().collect();
        let text = RuneSource(&chars);
        assert!(Assertion::WordBoundary.check(&text, 0));
        assert!(Assertion::WordBoundary.check(&text, 1));
        assert!(Assertion::WordBoundary.check(&text, 3));
        let empty: Vec<char> = Vec::new();
        assert!(!Assertion::WordBoundary.check(&RuneSource(&empty), 0));
    }
}
