//! Pike VM: runs every thread of the program in lock step over the input.

use super::compile::Instr;
use super::{Captures, Direction, Matchable};

#[derive(Debug, Clone)]
struct Thread {
    pc: usize,
    saves: Vec<Option<usize>>,
}

/// Threads for one input position, deduplicated by pc
struct ThreadList {
    seen: Vec<bool>,
    threads: Vec<Thread>,
}

impl ThreadList {
    fn new(program_len: usize) -> Self {
        Self {
            seen: vec![false; program_len],
            threads: Vec::with_capacity(program_len),
        }
    }

    fn clear(&mut self) {
        self.seen.iter_mut().for_each(|s| *s = false);
        self.threads.clear();
    }
}

struct Vm<'a> {
    program: &'a [Instr],
    text: &'a dyn Matchable,
}

impl Vm<'_> {
    /// Follows jumps, splits, saves and assertions so that `list` only
    /// ever holds threads sitting on a consuming instruction or a match.
    fn add_thread(&self, list: &mut ThreadList, mut thread: Thread, pos: usize) {
        if list.seen[thread.pc] {
            return;
        }
        list.seen[thread.pc] = true;

        match &self.program[thread.pc] {
            Instr::Assert(assertion) => {
                if assertion.check(self.text, pos) {
                    thread.pc += 1;
                    self.add_thread(list, thread, pos);
                }
            }
            Instr::Save(slot) => {
                thread.saves[*slot] = Some(pos);
                thread.pc += 1;
                self.add_thread(list, thread, pos);
            }
            Instr::Jmp(to) => {
                thread.pc = *to;
                self.add_thread(list, thread, pos);
            }
            Instr::Split(targets) => {
                for &to in targets {
                    let branch = Thread {
                        pc: to,
                        saves: thread.saves.clone(),
                    };
                    self.add_thread(list, branch, pos);
                }
            }
            Instr::Char(_) | Instr::Class(_) | Instr::Match => list.threads.push(thread),
        }
    }
}

/// Runs `program` from `start` towards `end` (inclusive bound).
pub fn run(
    program: &[Instr],
    slots: usize,
    text: &dyn Matchable,
    start: usize,
    end: usize,
    dir: Direction,
) -> Option<Captures> {
    let vm = Vm { program, text };
    let mut clist = ThreadList::new(program.len());
    let mut nlist = ThreadList::new(program.len());
    let mut matched: Option<Vec<Option<usize>>> = None;

    vm.add_thread(
        &mut clist,
        Thread {
            pc: 0,
            saves: vec![None; slots],
        },
        start,
    );

    let mut pos = start;
    loop {
        if clist.threads.is_empty() {
            break;
        }

        let at_bound = pos == end;
        let ch = if at_bound {
            None
        } else {
            match dir {
                Direction::Forward => text.char_at(pos),
                Direction::Backward => pos.checked_sub(1).and_then(|p| text.char_at(p)),
            }
        };
        let next = match dir {
            Direction::Forward => pos + 1,
            Direction::Backward => pos.saturating_sub(1),
        };

        for thread in clist.threads.drain(..) {
            let advance = match &program[thread.pc] {
                Instr::Char(c) => ch == Some(*c),
                Instr::Class(class) => ch.is_some_and(|c| class.contains(c)),
                Instr::Match => {
                    // lower priority threads are dropped
                    matched = Some(thread.saves);
                    break;
                }
                _ => false,
            };
            if advance {
                let moved = Thread {
                    pc: thread.pc + 1,
                    saves: thread.saves,
                };
                vm.add_thread(&mut nlist, moved, next);
            }
        }

        if at_bound {
            break;
        }
        pos = next;
        std::mem::swap(&mut clist, &mut nlist);
        nlist.clear();
    }

    matched.map(|mut saves| {
        if dir == Direction::Backward {
            for pair in saves.chunks_mut(2) {
                if let [Some(a), Some(b)] = pair {
                    if *a > *b {
                        std::mem::swap(a, b);
                    }
                }
            }
        }
        Captures::new(saves)
    })
}
