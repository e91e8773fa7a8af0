//! Structured edit notifications.
//!
//! A store with a registered sink sends one [`EditEvent`] per deletion and
//! insertion. The `Display` form is the one-line wire format external
//! listeners read: `<origin><kind><start> <end> <flags> <len> <text>`.

use std::fmt;
use std::sync::mpsc::Sender;

/// Texts at least this long are sent without their content
pub const MAX_EVENT_TEXT: usize = 256;

/// Who caused an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    Keyboard,
    Mouse,
    Files,
    Program,
}

impl EventOrigin {
    fn code(self) -> char {
        match self {
            EventOrigin::Keyboard => 'K',
            EventOrigin::Mouse => 'M',
            EventOrigin::Files => 'F',
            EventOrigin::Program => 'E',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Delete,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub origin: EventOrigin,
    /// The edit targets a tag/title region instead of a body
    pub tag_region: bool,
    pub kind: EventKind,
    pub start: usize,
    pub end: usize,
    pub flags: u32,
    pub text: String,
}

pub type EventSink = Sender<EditEvent>;

impl fmt::Display for EditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match (self.kind, self.tag_region) {
            (EventKind::Delete, false) => 'D',
            (EventKind::Delete, true) => 'd',
            (EventKind::Insert, false) => 'I',
            (EventKind::Insert, true) => 'i',
        };
        let len = self.text.chars().count();
        let text = if len >= MAX_EVENT_TEXT {
            ""
        } else {
            self.text.as_str()
        };
        write!(
            f,
            "{}{}{} {} {} {} {}",
            self.origin.code(),
            kind,
            self.start,
            self.end,
            self.flags,
            text.chars().count(),
            text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let ev = EditEvent {
            origin: EventOrigin::Keyboard,
            tag_region: false,
            kind: EventKind::Insert,
            start: 3,
            end: 3,
            flags: 0,
            text: "hey".to_string(),
        };
        assert_eq!(ev.to_string(), "KI3 3 0 3 hey");

        let tag = EditEvent {
            tag_region: true,
            kind: EventKind::Delete,
            text: String::new(),
            ..ev
        };
        assert_eq!(tag.to_string(), "Kd3 3 0 0 ");
    }

    #[test]
    fn test_long_text_is_dropped() {
        let ev = EditEvent {
            origin: EventOrigin::Files,
            tag_region: false,
            kind: EventKind::Insert,
            start: 0,
            end: 0,
            flags: 0,
            text: "x".repeat(MAX_EVENT_TEXT),
        };
        assert_eq!(ev.to_string(), "FI0 0 0 0 ");
    }
}
