//! Lowers a [`Node`] tree to a flat instruction program.

use std::fmt;

use super::class::{Assertion, CharClass};
use super::parse::{Node, RepeatKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Char(char),
    Class(CharClass),
    Assert(Assertion),
    Match,
    Jmp(usize),
    /// Branch to every target, in priority order
    Split(Vec<usize>),
    Save(usize),
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Char(c) => {
                let shown = if c.is_control() {
                    "-".to_string()
                } else {
                    c.to_string()
                };
                write!(f, "char {} {}", *c as u32, shown)
            }
            Instr::Class(class) => write!(f, "class {}", class.name),
            Instr::Assert(a) => write!(f, "assert {}", a),
            Instr::Match => f.write_str("match"),
            Instr::Jmp(to) => write!(f, "jmp {}", to),
            Instr::Split(targets) => {
                let list: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
                write!(f, "split {}", list.join(", "))
            }
            Instr::Save(slot) => write!(f, "save {}", slot),
        }
    }
}

/// Appends the code for `node` to `pgm`. With `backward` the members of
/// every sequence are emitted right to left.
pub fn emit(node: &Node, pgm: &mut Vec<Instr>, backward: bool) {
    match node {
        Node::Char(c) => pgm.push(Instr::Char(*c)),
        Node::Class(class) => pgm.push(Instr::Class(class.clone())),
        Node::Assert(a) => pgm.push(Instr::Assert(*a)),
        Node::Group(nodes) => {
            if backward {
                for n in nodes.iter().rev() {
                    emit(n, pgm, backward);
                }
            } else {
                for n in nodes {
                    emit(n, pgm, backward);
                }
            }
        }
        Node::Repeat {
            kind,
            greedy,
            child,
        } => emit_repeat(*kind, *greedy, child, pgm, backward),
        Node::Alt { group, branches } => emit_alt(*group, branches, pgm, backward),
    }
}

fn emit_repeat(
    kind: RepeatKind,
    greedy: bool,
    child: &Node,
    pgm: &mut Vec<Instr>,
    backward: bool,
) {
    let top = pgm.len();
    match kind {
        RepeatKind::OneOrMore => {
            emit(child, pgm, backward);
            let next = pgm.len() + 1;
            let targets = if greedy {
                vec![top, next]
            } else {
                vec![next, top]
            };
            pgm.push(Instr::Split(targets));
        }
        RepeatKind::ZeroOrMore => {
            pgm.push(Instr::Split(Vec::new()));
            emit(child, pgm, backward);
            pgm.push(Instr::Jmp(top));
            pgm[top] = split_for(greedy, top + 1, pgm.len());
        }
        RepeatKind::ZeroOrOne => {
            pgm.push(Instr::Split(Vec::new()));
            emit(child, pgm, backward);
            pgm[top] = split_for(greedy, top + 1, pgm.len());
        }
    }
}

fn split_for(greedy: bool, body: usize, exit: usize) -> Instr {
    if greedy {
        Instr::Split(vec![body, exit])
    } else {
        Instr::Split(vec![exit, body])
    }
}

fn emit_alt(group: Option<usize>, branches: &[Node], pgm: &mut Vec<Instr>, backward: bool) {
    if let Some(g) = group {
        pgm.push(Instr::Save(g * 2));
    }

    match branches {
        [] => {}
        [only] => emit(only, pgm, backward),
        _ => {
            let top = pgm.len();
            pgm.push(Instr::Split(Vec::new()));

            let mut starts = Vec::with_capacity(branches.len());
            let mut jumps = Vec::with_capacity(branches.len() - 1);
            for (i, branch) in branches.iter().enumerate() {
                starts.push(pgm.len());
                emit(branch, pgm, backward);
                if i != branches.len() - 1 {
                    jumps.push(pgm.len());
                    pgm.push(Instr::Jmp(0));
                }
            }

            let end = pgm.len();
            pgm[top] = Instr::Split(starts);
            for j in jumps {
                pgm[j] = Instr::Jmp(end);
            }
        }
    }

    if let Some(g) = group {
        pgm.push(Instr::Save(g * 2 + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::parse::parse;

    fn listing(pattern: &str, backward: bool) -> Vec<String> {
        let mut pgm = Vec::new();
        emit(&parse(pattern).unwrap(), &mut pgm, backward);
        pgm.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_plus_loops_back() {
        assert_eq!(
            listing("a+", false),
            vec!["save 0", "char 97 a", "split 1, 3", "save 1"]
        );
    }

    #[test]
    fn test_lazy_star_prefers_exit() {
        assert_eq!(
            listing("a*?", false),
            vec!["save 0", "split 4, 2", "char 97 a", "jmp 1", "save 1"]
        );
    }

    #[test]
    fn test_alternation_jumps_to_end() {
        assert_eq!(
            listing("a|b", false),
            vec!["save 0", "split 2, 4", "char 97 a", "jmp 5", "char 98 b", "save 1"]
        );
    }

    #[test]
    fn test_backward_reverses_sequence() {
        assert_eq!(
            listing("ab", true),
            vec!["save 0", "char 98 b", "char 97 a", "save 1"]
        );
    }
}
