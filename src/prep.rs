//! Preprocessing 6502 source files.
//!
//! Before tokenizing, source text is turned into a flat list of lines:
//! 1. the text is split into lines,
//! 2. everything from the first `;` on each line is removed (comments),
//! 3. `.INCLUDE path` lines are replaced by the preprocessed lines of the named file,
//! 4. every line is upper-cased.
//!
//! Include paths may be quoted (`.INCLUDE "lib/math.asm"`) and are resolved
//! relative to the directory of the file containing the `.INCLUDE`.
//!
//! Line numbers in later errors refer to this flattened list (1-based).

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::debug;

/// The default limit of nested `.INCLUDE`s.
pub const DEFAULT_MAX_DEPTH: usize = 64;

const INCLUDE: &str = ".INCLUDE";

/// Error from preprocessing.
#[derive(Debug)]
pub enum PrepErr {
    /// A source file could not be read.
    Io {
        /// The file which failed to read.
        path: PathBuf,
        #[allow(missing_docs)]
        source: std::io::Error
    },
    /// Includes were nested too deeply (usually, files which include each other).
    IncludeDepth {
        /// The file whose inclusion passed the limit.
        path: PathBuf,
        /// The nesting limit.
        limit: usize
    },
    /// An `.INCLUDE` line did not name a file.
    EmptyInclude {
        /// The file containing the `.INCLUDE` (if the source came from a file).
        file: Option<PathBuf>,
        /// The 1-based line of the `.INCLUDE` in that file.
        line: usize
    },
}
impl std::fmt::Display for PrepErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrepErr::Io { path, source } => write!(f, "could not read {}: {source}", path.display()),
            PrepErr::IncludeDepth { path, limit } => write!(f, "cannot include {}, includes are nested more than {limit} deep", path.display()),
            PrepErr::EmptyInclude { file: Some(file), line } => write!(f, "{INCLUDE} is missing a file path (line {line} of {})", file.display()),
            PrepErr::EmptyInclude { file: None, line } => write!(f, "{INCLUDE} is missing a file path (line {line})"),
        }
    }
}
impl std::error::Error for PrepErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrepErr::Io { source, .. } => Some(source),
            _ => None
        }
    }
}
impl crate::err::Error for PrepErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            PrepErr::Io { .. } => Some("include paths are relative to the file which includes them".into()),
            PrepErr::IncludeDepth { .. } => Some("check for files which include each other".into()),
            PrepErr::EmptyInclude { .. } => Some("write the file to include after the directive (e.g., `.INCLUDE \"lib.asm\"`)".into()),
        }
    }
}

/// Removes the comment (everything from the first `;`) from a line.
///
/// ```
/// use mos6502_asm::prep::strip_comment;
///
/// assert_eq!(strip_comment("LDA #1 ; load"), "LDA #1 ");
/// assert_eq!(strip_comment("; nothing"), "");
/// ```
pub fn strip_comment(line: &str) -> &str {
    line.split_once(';').map_or(line, |(code, _)| code)
}

/// Prepares a single line for tokenizing: strips its comment and upper-cases it.
pub fn normalize_line(line: &str) -> String {
    strip_comment(line).to_ascii_uppercase()
}

/// If this (comment-stripped) line is an include, returns its (unquoted) path.
fn include_path(line: &str) -> Option<&str> {
    let rest = line.trim_start();
    let head = rest.get(..INCLUDE.len())?;
    if !head.eq_ignore_ascii_case(INCLUDE) { return None; }

    let rest = &rest[INCLUDE.len()..];
    // `.INCLUDEX` is some other directive
    if rest.starts_with(|c: char| !c.is_whitespace()) { return None; }

    let path = rest.trim();
    let path = path.strip_prefix('"').unwrap_or(path);
    let path = path.strip_suffix('"').unwrap_or(path);
    Some(path.trim())
}

/// Preprocesses source files, expanding includes.
///
/// # Example
/// ```
/// use std::path::Path;
/// use mos6502_asm::prep::Preprocessor;
///
/// let lines = Preprocessor::new()
///     .preprocess_str("start: lda #1 ; load\n  brk", Path::new("."))
///     .unwrap();
/// assert_eq!(lines, ["START: LDA #1 ", "  BRK"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    max_depth: usize,
}
impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
impl Preprocessor {
    /// Creates a preprocessor with the default include limit ([`DEFAULT_MAX_DEPTH`]).
    pub fn new() -> Self {
        Preprocessor { max_depth: DEFAULT_MAX_DEPTH }
    }
    /// Sets how deeply includes can be nested.
    ///
    /// With a limit of 0, no file can be included.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Preprocesses a source file.
    pub fn preprocess_file(&self, path: &Path) -> Result<Vec<String>, PrepErr> {
        let mut out = vec![];
        self.expand_file(path, 0, &mut out)?;
        debug!("preprocessed {} into {} lines", path.display(), out.len());
        Ok(out)
    }

    /// Preprocesses in-memory source text.
    ///
    /// Includes are resolved relative to `base_dir`.
    pub fn preprocess_str(&self, src: &str, base_dir: &Path) -> Result<Vec<String>, PrepErr> {
        let mut out = vec![];
        self.expand_src(src, base_dir, None, 0, &mut out)?;
        Ok(out)
    }

    fn expand_file(&self, path: &Path, depth: usize, out: &mut Vec<String>) -> Result<(), PrepErr> {
        let src = std::fs::read_to_string(path)
            .map_err(|source| PrepErr::Io { path: path.to_path_buf(), source })?;
        let base_dir = path.parent().unwrap_or(Path::new(""));

        self.expand_src(&src, base_dir, Some(path), depth, out)
    }

    fn expand_src(&self, src: &str, base_dir: &Path, file: Option<&Path>, depth: usize, out: &mut Vec<String>) -> Result<(), PrepErr> {
        for (i, line) in src.lines().enumerate() {
            let code = strip_comment(line);

            match include_path(code) {
                Some("") => return Err(PrepErr::EmptyInclude { file: file.map(Path::to_path_buf), line: i + 1 }),
                Some(inc) => {
                    let path = base_dir.join(inc);
                    if depth >= self.max_depth {
                        return Err(PrepErr::IncludeDepth { path, limit: self.max_depth });
                    }

                    debug!("including {}", path.display());
                    self.expand_file(&path, depth + 1, out)?;
                },
                None => out.push(code.to_ascii_uppercase()),
            }
        }

        Ok(())
    }
}

/// Preprocesses a source file with the default settings.
///
/// See [`Preprocessor::preprocess_file`].
pub fn preprocess(path: impl AsRef<Path>) -> Result<Vec<String>, PrepErr> {
    Preprocessor::new().preprocess_file(path.as_ref())
}
