//! Command dispatcher.
//!
//! Dot is always a selection registered with the store, so edits applied
//! while a command runs keep it up to date. Edits made inside `x`, `y`,
//! `s` and blocks are collected first and applied together when the
//! outermost of them finishes, so every match is computed against the
//! text as it was when the command started.

use std::fs;
use std::path::PathBuf;

use super::parse::{Cmd, CmdKind};
use super::{EditEnv, EditError};
use crate::regex::{Captures, Direction};
use crate::store::{EventOrigin, Sel, SelId, TextStore};

/// Characters of a range shown in trace output
const TRACE_PREVIEW: usize = 20;

/// An edit waiting to be applied, in the coordinates of the text at the
/// time it was collected
#[derive(Debug, Clone)]
struct ReplaceOp {
    text: String,
    sel: Sel,
}

type Stash<'s> = Option<&'s mut Vec<ReplaceOp>>;

pub struct Interpreter<'a> {
    store: &'a mut TextStore,
    env: &'a mut dyn EditEnv,
    /// The first edit of a run starts a new undo group
    first_edit: bool,
    trace_edits: bool,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(store: &'a mut TextStore, env: &'a mut dyn EditEnv) -> Self {
        Self {
            store,
            env,
            first_edit: true,
            trace_edits: false,
            depth: 0,
        }
    }

    /// Log every command at debug level instead of trace
    pub fn trace_edits(mut self, on: bool) -> Self {
        self.trace_edits = on;
        self
    }

    /// Runs `cmd` with dot being the registered selection `dot`
    pub fn run(&mut self, cmd: &Cmd, dot: SelId) -> Result<(), EditError> {
        self.exec(cmd, dot, None)
    }

    fn exec(&mut self, cmd: &Cmd, dot: SelId, stash: Stash<'_>) -> Result<(), EditError> {
        let cur = self.store.sel(dot).unwrap_or_default();

        match cmd.kind {
            CmdKind::Nil => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
            }

            CmdKind::Append | CmdKind::Change | CmdKind::Insert | CmdKind::Delete => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                let text = cmd.args.first().map(String::as_str).unwrap_or("");
                let target = match cmd.kind {
                    CmdKind::Append => Sel::point(sel.end),
                    CmdKind::Insert => Sel::point(sel.start),
                    _ => sel,
                };
                let after = self.replace(text, target, stash);
                if matches!(cmd.kind, CmdKind::Change | CmdKind::Delete) {
                    self.store.set_sel(dot, after);
                }
            }

            CmdKind::Substitute => self.substitute(cmd, dot, cur, stash)?,

            CmdKind::Move | CmdKind::Copy => self.move_copy(cmd, dot, cur, stash)?,

            CmdKind::Print => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
                let text = self.store.text(sel);
                self.env.print(&text);
            }

            CmdKind::Position => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
                self.report_position(&cmd.tail, sel);
            }

            CmdKind::Loop | CmdKind::Gaps => self.loop_over(cmd, dot, cur, stash)?,

            CmdKind::Guard | CmdKind::Unless => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);

                let found = cmd.regex.as_ref().is_some_and(|re| {
                    re.match_at(&*self.store, sel.start, sel.end, Direction::Forward)
                        .is_some()
                });
                if found != (cmd.kind == CmdKind::Unless) {
                    if let Some(body) = &cmd.body {
                        self.depth += 1;
                        let result = self.exec(body, dot, stash);
                        self.depth -= 1;
                        result?;
                    }
                }
            }

            CmdKind::PipeIn => {
                let dir = self.store.dir().to_path_buf();
                match self.env.run_job(&dir, &cmd.tail, "") {
                    Ok(output) => {
                        let sel = cmd.range.eval(self.store, cur)?;
                        self.trace_cmd(cmd, sel);
                        let after = self.replace(&output, sel, stash);
                        self.store.set_sel(dot, after);
                    }
                    Err(e) => self.warn(&format!("{}: {}", cmd.tail, e)),
                }
            }

            CmdKind::PipeOut => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
                let input = self.store.text(sel);
                let dir = self.store.dir().to_path_buf();
                match self.env.run_job(&dir, &cmd.tail, &input) {
                    Ok(output) if !output.is_empty() => self.env.print(&output),
                    Ok(_) => {}
                    Err(e) => self.warn(&format!("{}: {}", cmd.tail, e)),
                }
            }

            CmdKind::Pipe => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
                let input = self.store.text(sel);
                let dir = self.store.dir().to_path_buf();
                match self.env.run_job(&dir, &cmd.tail, &input) {
                    Ok(output) => {
                        let after = self.replace(&output, sel, stash);
                        self.store.set_sel(dot, after);
                    }
                    Err(e) => self.warn(&format!("{}: {}", cmd.tail, e)),
                }
            }

            CmdKind::EditFile => {
                self.trace_cmd(cmd, cur);
                if let Some(content) = self.read_file(&cmd.tail) {
                    let all = Sel::new(0, self.store.len());
                    self.replace(&content, all, stash);
                    self.store.set_sel(dot, Sel::point(0));
                }
            }

            CmdKind::ReadFile => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
                if let Some(content) = self.read_file(&cmd.tail) {
                    let after = self.replace(&content, sel, stash);
                    self.store.set_sel(dot, after);
                }
            }

            CmdKind::WriteFile => {
                let mut sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                self.store.set_sel(dot, sel);
                if sel.is_empty() {
                    sel = Sel::new(0, self.store.len());
                }
                self.write_file(&cmd.tail, sel);
            }

            CmdKind::Block => {
                let sel = cmd.range.eval(self.store, cur)?;
                self.trace_cmd(cmd, sel);
                let id = self.store.add_sel(sel);
                let mut ops = Vec::new();
                let mut result = Ok(());
                self.depth += 1;
                for child in &cmd.block {
                    result = self.exec(child, id, Some(&mut ops));
                    if result.is_err() {
                        break;
                    }
                }
                self.depth -= 1;
                self.store.remove_sel(id);
                result?;
                self.flush(ops, stash);
            }
        }

        Ok(())
    }

    // =========================================================================
    // Structural commands
    // =========================================================================

    fn loop_over(&mut self, cmd: &Cmd, dot: SelId, cur: Sel, stash: Stash<'_>) -> Result<(), EditError> {
        let range = cmd.range.eval(self.store, cur)?;
        self.trace_cmd(cmd, range);
        self.store.set_sel(dot, range);

        let (Some(re), Some(body)) = (&cmd.regex, &cmd.body) else {
            return Ok(());
        };
        let gaps = cmd.kind == CmdKind::Gaps;

        let mut ops = Vec::new();
        let mut pos = range.start;
        let mut gap_start = range.start;
        while pos <= range.end {
            let Some(m) = re.match_at(&*self.store, pos, range.end, Direction::Forward) else {
                break;
            };
            let target = if gaps {
                Sel::new(gap_start, m.start())
            } else {
                Sel::new(m.start(), m.end())
            };
            tracing::trace!("{} iteration on {}", cmd.letter(), target);
            if let Err(e) = self.run_body(body, target, &mut ops) {
                self.warn(&format!("{}: {}", cmd.letter(), e));
                return Ok(());
            }
            gap_start = m.end();
            pos = if m.start() == m.end() { m.end() + 1 } else { m.end() };
        }

        if gaps && gap_start < range.end {
            let target = Sel::new(gap_start, range.end);
            if let Err(e) = self.run_body(body, target, &mut ops) {
                self.warn(&format!("{}: {}", cmd.letter(), e));
                return Ok(());
            }
        }

        self.flush(ops, stash);
        Ok(())
    }

    fn run_body(&mut self, body: &Cmd, sel: Sel, ops: &mut Vec<ReplaceOp>) -> Result<(), EditError> {
        let id = self.store.add_sel(sel);
        self.depth += 1;
        let result = self.exec(body, id, Some(ops));
        self.depth -= 1;
        self.store.remove_sel(id);
        result
    }

    fn substitute(&mut self, cmd: &Cmd, dot: SelId, cur: Sel, stash: Stash<'_>) -> Result<(), EditError> {
        let range = cmd.range.eval(self.store, cur)?;
        self.trace_cmd(cmd, range);
        let Some(re) = &cmd.regex else {
            return Ok(());
        };
        let repl = cmd.args.get(1).map(String::as_str).unwrap_or("");
        let global = cmd.num == 0 || cmd.global;

        let mut ops = Vec::new();
        let mut pos = range.start;
        let mut nmatch = 0;
        while pos <= range.end {
            let Some(m) = re.match_at(&*self.store, pos, range.end, Direction::Forward) else {
                break;
            };
            if m.start() >= range.end {
                break;
            }
            nmatch += 1;
            if global || nmatch == cmd.num {
                let text = expand_replacement(repl, &m, self.store)?;
                tracing::trace!("replace {} with {:?}", Sel::new(m.start(), m.end()), text);
                ops.push(ReplaceOp {
                    text,
                    sel: Sel::new(m.start(), m.end()),
                });
                if !global {
                    break;
                }
            }
            pos = if m.start() == m.end() { m.end() + 1 } else { m.end() };
        }

        let saved = self.store.add_sel(range);
        self.flush(ops, stash);
        let after = self.store.remove_sel(saved).unwrap_or(range);
        self.store.set_sel(dot, after);
        Ok(())
    }

    fn move_copy(&mut self, cmd: &Cmd, dot: SelId, cur: Sel, stash: Stash<'_>) -> Result<(), EditError> {
        let from = cmd.range.eval(self.store, cur)?;
        let to = match &cmd.target {
            Some(target) => target.eval(self.store, cur)?.end,
            None => cur.end,
        };
        self.trace_cmd(cmd, from);

        let moving = cmd.kind == CmdKind::Move;
        if moving && to > from.start && to < from.end {
            return Err(EditError::Address(format!(
                "can not move {} inside itself",
                from
            )));
        }

        let text = self.store.text(from);
        let len = from.len();
        let insert = ReplaceOp {
            text,
            sel: Sel::point(to),
        };
        let delete = ReplaceOp {
            text: String::new(),
            sel: from,
        };

        let (ops, landed) = if !moving {
            (vec![insert], Sel::new(to, to + len))
        } else if to >= from.end {
            (vec![delete, insert], Sel::new(to - len, to))
        } else {
            (vec![insert, delete], Sel::new(to, to + len))
        };

        let stashed = stash.is_some();
        self.flush(ops, stash);
        if !stashed {
            self.store.set_sel(dot, landed);
        }
        Ok(())
    }

    // =========================================================================
    // Applying edits
    // =========================================================================

    /// Applies `text` over `sel` now, or queues it when collecting
    fn replace(&mut self, text: &str, sel: Sel, stash: Stash<'_>) -> Sel {
        match stash {
            Some(ops) => {
                ops.push(ReplaceOp {
                    text: text.to_string(),
                    sel,
                });
                sel
            }
            None => {
                let mut sel = sel;
                self.apply_edit(text, &mut sel);
                sel
            }
        }
    }

    /// Hands collected edits to the enclosing collection, or applies them
    /// in position order. An edit starting inside one applied before it is
    /// dropped.
    fn flush(&mut self, mut ops: Vec<ReplaceOp>, stash: Stash<'_>) {
        if let Some(outer) = stash {
            outer.append(&mut ops);
            return;
        }

        ops.sort_by_key(|op| (op.sel.start, op.sel.end));
        let mut delta: isize = 0;
        let mut last_end = 0;
        for op in ops {
            if op.sel.start < last_end {
                tracing::debug!("Dropping overlapping edit at {}", op.sel);
                continue;
            }
            let start = op.sel.start.saturating_add_signed(delta);
            let mut sel = Sel::new(start, start + op.sel.len());
            let inserted = op.text.chars().count();
            self.apply_edit(&op.text, &mut sel);
            delta += inserted as isize - op.sel.len() as isize;
            last_end = op.sel.end;
        }
    }

    fn apply_edit(&mut self, text: &str, sel: &mut Sel) {
        let solid = std::mem::replace(&mut self.first_edit, false);
        self.store.replace(text, sel, solid, EventOrigin::Program);
    }

    // =========================================================================
    // Reporting and files
    // =========================================================================

    fn report_position(&mut self, arg: &str, sel: Sel) {
        let path = self.store.path();
        let path = path.display();
        let report = match arg {
            "#" if sel.is_empty() => format!("{}:#{}", path, sel.start),
            "#" => format!("{}:#{},#{}", path, sel.start, sel.end),
            "" => {
                let (first, _) = self.store.line_of(sel.start, false);
                let (last, _) = self.store.line_of(sel.end, false);
                if sel.is_empty() {
                    format!("{}:{}", path, first)
                } else {
                    format!("{}:{},{}", path, first, last)
                }
            }
            _ => {
                self.warn("wrong argument to =");
                return;
            }
        };
        self.env.print(&report);
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let path = PathBuf::from(name);
        if path.is_absolute() {
            path
        } else {
            self.store.dir().join(path)
        }
    }

    fn read_file(&mut self, name: &str) -> Option<String> {
        if name.is_empty() {
            self.warn("missing file name");
            return None;
        }
        let path = self.resolve(name);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                self.warn(&format!("couldn't read file {}: {}", path.display(), e));
                None
            }
        }
    }

    fn write_file(&mut self, name: &str, sel: Sel) {
        if name.is_empty() {
            self.warn("missing file name");
            return;
        }
        let path = self.resolve(name);
        let text = self.store.text(sel);
        if let Err(e) = fs::write(&path, text) {
            self.warn(&format!("couldn't write file {}: {}", path.display(), e));
        }
    }

    fn warn(&mut self, msg: &str) {
        tracing::warn!("{}", msg);
        self.env.warn(msg);
    }

    fn trace_cmd(&self, cmd: &Cmd, sel: Sel) {
        let indent = "   ".repeat(self.depth);
        let preview = self.preview(sel);
        if self.trace_edits {
            tracing::debug!("{}{} {} {} {:?}", indent, cmd.letter(), sel, preview, cmd.args);
        } else {
            tracing::trace!("{}{} {} {} {:?}", indent, cmd.letter(), sel, preview, cmd.args);
        }
    }

    fn preview(&self, sel: Sel) -> String {
        let shown = Sel::new(sel.start, sel.end.min(sel.start + TRACE_PREVIEW));
        let mut text = format!("{:?}", self.store.text(shown));
        if shown.end < sel.end {
            text.push_str("...");
        }
        text
    }
}

/// Expands `\0`..`\9`, `\n` and `\t` in a replacement; any other escaped
/// character stands for itself
fn expand_replacement(repl: &str, m: &Captures, store: &TextStore) -> Result<String, EditError> {
    let mut out = String::with_capacity(repl.len());
    let mut chars = repl.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(d @ '0'..='9') => {
                let n = d as usize - '0' as usize;
                if n >= m.group_count() {
                    return Err(EditError::BadBackreference(n));
                }
                if let Some((s, e)) = m.group(n) {
                    out.push_str(&store.text(Sel::new(s, e)));
                }
            }
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Ok(out)
}
