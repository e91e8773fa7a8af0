//! Command-line argument parsing and the runner behind the binary
//!
//! Supports:
//! - Editing a file in place or printing the result
//! - Filtering stdin through a program
//! - Several programs run in sequence, each one undo step
//! - A JSON report of the final state

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::edit::{self, EditEnv};
use crate::store::{Sel, TextStore};

/// Structural regular-expression editor
#[derive(Parser, Debug)]
#[command(name = "structedit", version, about = "Structural regular-expression editor")]
pub struct CliArgs {
    /// File or directory to edit; stdin is read when omitted
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Program to run (repeatable, runs in order)
    #[arg(short = 'e', long = "expr", value_name = "PROGRAM", required = true)]
    pub programs: Vec<String>,

    /// Address evaluated to set the initial dot
    #[arg(short = 'a', long = "addr", value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Start from an empty buffer if FILE does not exist
    #[arg(short = 'c', long)]
    pub create: bool,

    /// Write the result back to FILE instead of printing it
    #[arg(short = 'w', long)]
    pub write: bool,

    /// Print a JSON report instead of the text
    #[arg(long)]
    pub json: bool,

    /// Alternative config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Where the text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File { path: PathBuf, create: bool },
}

/// What to do with the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Print the final text on stdout
    Print,
    /// Save the store back to its file
    Write,
    /// Print a [`Report`] as JSON
    Json,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: Source,
    pub programs: Vec<String>,
    pub address: Option<String>,
    pub output: Output,
    pub config_path: Option<PathBuf>,
}

impl CliArgs {
    /// Convert parsed CLI args into a run configuration
    pub fn into_config(self) -> Result<RunConfig, String> {
        let source = match self.file {
            Some(path) => Source::File {
                path,
                create: self.create,
            },
            None if self.write => {
                return Err("--write needs a FILE".to_string());
            }
            None => Source::Stdin,
        };

        let output = match (self.write, self.json) {
            (true, true) => return Err("--write and --json are exclusive".to_string()),
            (true, false) => Output::Write,
            (false, true) => Output::Json,
            (false, false) => Output::Print,
        };

        Ok(RunConfig {
            source,
            programs: self.programs,
            address: self.address,
            output,
            config_path: self.config,
        })
    }
}

/// Final state printed by `--json`
#[derive(Debug, Serialize)]
pub struct Report {
    pub name: String,
    pub dot: [usize; 2],
    pub modified: bool,
    pub undo_position: usize,
    pub warnings: Vec<String>,
    pub printed: String,
    pub content: String,
}

/// [`EditEnv`] for the command line: jobs go through the system shell,
/// printed text goes to stdout (or into the report)
#[derive(Debug, Default)]
pub struct ShellEnv {
    pub trace_edits: bool,
    /// Collect printed text instead of writing it to stdout
    pub capture: bool,
    pub printed: String,
    pub warnings: Vec<String>,
}

impl ShellEnv {
    pub fn new(trace_edits: bool, capture: bool) -> Self {
        Self {
            trace_edits,
            capture,
            ..Self::default()
        }
    }
}

impl EditEnv for ShellEnv {
    fn warn(&mut self, msg: &str) {
        if !self.capture {
            eprintln!("{}", msg);
        }
        self.warnings.push(msg.to_string());
    }

    fn print(&mut self, text: &str) {
        if self.capture {
            self.printed.push_str(text);
            if !text.ends_with('\n') {
                self.printed.push('\n');
            }
        } else if text.ends_with('\n') {
            print!("{}", text);
        } else {
            println!("{}", text);
        }
    }

    fn run_job(&mut self, dir: &Path, command: &str, input: &str) -> Result<String, String> {
        run_shell(dir, command, input)
    }

    fn trace_edits(&self) -> bool {
        self.trace_edits
    }
}

/// Runs `command` with the platform shell, feeding `input` on stdin
pub fn run_shell(dir: &Path, command: &str, input: &str) -> Result<String, String> {
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };

    #[cfg(not(target_os = "windows"))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };

    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let mut child = cmd
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("couldn't start {:?}: {}", command, e))?;

    // stdin is fed from its own thread while the output is drained
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_string();
        std::thread::spawn(move || {
            let _ = stdin.write_all(input.as_bytes());
        })
    });

    let output = child
        .wait_with_output()
        .map_err(|e| format!("{:?} failed: {}", command, e))?;
    if let Some(writer) = writer {
        let _ = writer.join();
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{:?} exited with {}: {}",
            command,
            output.status,
            stderr.trim_end()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Loads the store, runs every program and handles the output
pub fn run(config: RunConfig) -> Result<()> {
    let engine = match &config.config_path {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    let mut store = open_store(&config.source, &engine)?;
    let mut env = ShellEnv::new(engine.trace_edits, config.output == Output::Json);

    let mut dot = Sel::default();
    if let Some(address) = &config.address {
        dot = edit::eval_address(address, &store, dot)
            .with_context(|| format!("evaluating address {:?}", address))?;
    }

    for program in &config.programs {
        edit::interpret(program, &mut store, &mut dot, &mut env)
            .with_context(|| format!("running {:?}", program))?;
    }

    match config.output {
        Output::Print => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(store.content().as_bytes())
                .context("writing result")?;
            stdout.flush().context("writing result")?;
        }
        Output::Write => {
            store
                .put()
                .with_context(|| format!("saving {}", store.path().display()))?;
            tracing::debug!("Saved {}", store.path().display());
        }
        Output::Json => {
            let report = Report {
                name: store.name().to_string(),
                dot: [dot.start, dot.end],
                modified: store.is_modified(),
                undo_position: store.undo_position(),
                warnings: env.warnings,
                printed: env.printed,
                content: store.content(),
            };
            let json = serde_json::to_string_pretty(&report).context("serializing report")?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn open_store(source: &Source, engine: &EngineConfig) -> Result<TextStore> {
    match source {
        Source::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            let mut store = TextStore::scratch("stdin");
            store.replace_full(&text);
            Ok(store)
        }
        Source::File { path, create } => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("bad file name {}", path.display()))?;
            TextStore::open(dir, name, *create, engine)
                .with_context(|| format!("opening {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: Option<&str>) -> CliArgs {
        CliArgs {
            file: file.map(PathBuf::from),
            programs: vec![",x/a/ c/b/".to_string()],
            address: None,
            create: false,
            write: false,
            json: false,
            config: None,
        }
    }

    #[test]
    fn test_no_file_reads_stdin() {
        let config = args(None).into_config().unwrap();
        assert_eq!(config.source, Source::Stdin);
        assert_eq!(config.output, Output::Print);
    }

    #[test]
    fn test_file_with_create() {
        let mut a = args(Some("notes.txt"));
        a.create = true;
        let config = a.into_config().unwrap();
        assert_eq!(
            config.source,
            Source::File {
                path: PathBuf::from("notes.txt"),
                create: true
            }
        );
    }

    #[test]
    fn test_write_needs_file() {
        let mut a = args(None);
        a.write = true;
        assert!(a.into_config().is_err());
    }

    #[test]
    fn test_write_and_json_conflict() {
        let mut a = args(Some("notes.txt"));
        a.write = true;
        a.json = true;
        assert!(a.into_config().is_err());
    }

    #[test]
    fn test_parse_repeated_programs() {
        let parsed =
            CliArgs::try_parse_from(["structedit", "-e", ",d", "-e", "a/x/", "--json", "f.txt"])
                .unwrap();
        assert_eq!(parsed.programs, vec![",d".to_string(), "a/x/".to_string()]);
        let config = parsed.into_config().unwrap();
        assert_eq!(config.output, Output::Json);
    }

    #[test]
    fn test_program_is_required() {
        assert!(CliArgs::try_parse_from(["structedit", "f.txt"]).is_err());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_run_shell_pipes_input() {
        let out = run_shell(Path::new("."), "tr a-z A-Z", "hello\n").unwrap();
        assert_eq!(out, "HELLO\n");
        assert!(run_shell(Path::new("."), "exit 3", "").is_err());
    }

    #[test]
    fn test_capture_env_collects_output() {
        let mut env = ShellEnv::new(false, true);
        env.print("one");
        env.print("two\n");
        env.warn("careful");
        assert_eq!(env.printed, "one\ntwo\n");
        assert_eq!(env.warnings, vec!["careful".to_string()]);
    }
}
