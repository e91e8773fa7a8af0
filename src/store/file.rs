//! Reading and writing store content on disk.

use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::gap::Glyph;

/// Refuse to load files larger than this unless configured otherwise
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Bytes inspected by the binary heuristic
const BINARY_PROBE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotADirectory(PathBuf),
    NotFound(PathBuf),
    FileTooLarge { size: u64 },
    NotUtf8,
    Io(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotADirectory(p) => write!(f, "not a directory: {}", p.display()),
            StoreError::NotFound(p) => write!(f, "file doesn't exist: {}", p.display()),
            StoreError::FileTooLarge { size } => {
                write!(f, "refusing to open a file of {} bytes", size)
            }
            StoreError::NotUtf8 => write!(f, "can not open binary file"),
            StoreError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// What a path on disk turned out to hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Text(String),
    /// Tab separated directory listing
    Listing(String),
    Missing,
}

/// Checks that `dir` exists and is a directory
pub fn check_dir(dir: &Path) -> Result<(), StoreError> {
    let meta = fs::metadata(dir).map_err(|_| StoreError::NotFound(dir.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(StoreError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Reads `path` as text, or as a listing when it is a directory
pub fn load(path: &Path, max_size: u64) -> Result<Loaded, StoreError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        return Ok(Loaded::Listing(read_listing(path)?));
    }
    if meta.len() > max_size {
        return Err(StoreError::FileTooLarge { size: meta.len() });
    }

    let bytes = fs::read(path)?;
    if is_binary(&bytes) {
        return Err(StoreError::NotUtf8);
    }
    Ok(Loaded::Text(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Heuristic over the first kilobyte: invalid UTF-8 bytes, NULs and
/// replacement characters are bad, everything else good. Binary means
/// strictly more bad than good.
pub fn is_binary(bytes: &[u8]) -> bool {
    let mut rest = &bytes[..bytes.len().min(BINARY_PROBE)];
    let (mut good, mut bad) = (0usize, 0usize);

    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                let (g, b) = tally(s);
                good += g;
                bad += b;
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                // the prefix was just validated
                let (g, b) = tally(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                let invalid = e.error_len().unwrap_or(rest.len() - valid);
                good += g;
                bad += b + invalid;
                rest = &rest[valid + invalid..];
            }
        }
    }

    bad > good
}

fn tally(s: &str) -> (usize, usize) {
    let bad = s
        .chars()
        .filter(|&c| c == '\0' || c == char::REPLACEMENT_CHARACTER)
        .count();
    (s.chars().count() - bad, bad)
}

/// Lists a directory as `name\tname/\tlink@\tprog*`, hidden entries skipped
pub fn read_listing(path: &Path) -> Result<String, StoreError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if name.is_empty() || name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            name.push('/');
        } else if file_type.is_symlink() {
            name.push('@');
        } else if is_executable(&entry.path()) {
            name.push('*');
        }
        names.push(name);
    }
    names.sort();
    Ok(names.join("\t"))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Writes the two halves of a gap buffer range to `path`
pub fn write_glyphs(path: &Path, halves: (&[Glyph], &[Glyph])) -> Result<(), StoreError> {
    let file = fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    let mut utf8 = [0u8; 4];
    for g in halves.0.iter().chain(halves.1) {
        out.write_all(g.ch.encode_utf8(&mut utf8).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}
