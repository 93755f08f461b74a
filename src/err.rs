//! Error interface for this crate.
//!
//! Every error raised while assembling implements [`Error`], which extends
//! [`std::error::Error`] with the position in the preprocessed source that caused it
//! and an optional hint on how to fix it.
//!
//! This module also re-exports all of the crate's error types.

use std::borrow::Cow;

pub use crate::asm::AsmErr;
pub use crate::parse::lex::{LexErr, LexErrKind};
pub use crate::parse::{ParseErr, ParseErrKind};
pub use crate::prep::PrepErr;

/// A position in the preprocessed source that an error points to.
///
/// Line numbers are 1-based and count preprocessed lines
/// (after `.INCLUDE` expansion).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ErrSpan {
    /// A character position on a line, as reached by the lexer's scan (0-based).
    Col {
        #[allow(missing_docs)]
        line: usize,
        #[allow(missing_docs)]
        col: usize
    },
    /// A token on a line, counted from the start of the line (1-based).
    Token {
        #[allow(missing_docs)]
        line: usize,
        #[allow(missing_docs)]
        token: usize
    },
}
impl ErrSpan {
    /// The 1-based line this span points to.
    pub fn line(&self) -> usize {
        match *self {
            ErrSpan::Col { line, .. } => line,
            ErrSpan::Token { line, .. } => line,
        }
    }
}
impl std::fmt::Display for ErrSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrSpan::Col { line, col }     => write!(f, "line {line}, scan position {col}"),
            ErrSpan::Token { line, token } => write!(f, "line {line}, token {token}"),
        }
    }
}

/// Unified error interface for all errors in this crate.
///
/// Note that the [`std::fmt::Display`] implementation is used for the brief message,
/// whereas [`Error::help`] is used for any clarifying messages.
pub trait Error: std::error::Error {
    /// The position in the source associated with this error, if there is one.
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A clarifying message to help the user fix the error.
    fn help(&self) -> Option<Cow<str>> {
        None
    }

    /// Renders the message, the position (if any), and the hint (if any) as one report.
    ///
    /// ```
    /// use mos6502_asm::asm::assemble_src;
    /// use mos6502_asm::err::Error;
    ///
    /// let err = assemble_src("LDA #$100").unwrap_err();
    /// assert_eq!(
    ///     err.report(),
    ///     "expected byte, but found word (at line 1, token 3)\nhelp: immediate operands must be in [0, 255]"
    /// );
    /// ```
    fn report(&self) -> String {
        let mut out = self.to_string();
        if let Some(span) = self.span() {
            out.push_str(&format!(" (at {span})"));
        }
        if let Some(help) = self.help() {
            out.push_str("\nhelp: ");
            out.push_str(&help);
        }
        out
    }
}
