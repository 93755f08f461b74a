//! Parsing 6502 assembly.
//!
//! This module converts the token sequence of a single line ([`TokenLine`])
//! into a statement ([`Stmt`]).
//!
//! Parsing a line is pure: it never depends on what came before it.
//! All of the state an assembly run carries (the program counter, labels, and fixups)
//! lives in the code generator ([`crate::asm`]).
//!
//! The addressing mode of an instruction is decided by the shape of the tokens after
//! its mnemonic, not by any declared type.

pub mod lex;

use std::borrow::Cow;

use crate::ast::{Branch, Directive, Instr, Label, Operand, Stmt, StmtKind, Target};
use crate::err::ErrSpan;
use crate::isa::{AddrMode, Mnemonic};

use self::lex::{Ident, Token, TokenKind};
pub use self::lex::TokenLine;

/// Kinds of errors that can occur while parsing and assembling.
///
/// See [`ParseErr`] for this error type with position information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ParseErrKind {
    /// A token was found that cannot start or continue the statement.
    UnexpectedToken {
        /// The offending token, as written.
        found: String,
        #[allow(missing_docs)]
        kind: TokenKind
    },
    /// A specific token was required, but something else was found.
    Expected {
        /// What was required (e.g., `NUMBER`, `"X" (LABEL)`).
        expected: String,
        /// What was found instead (e.g., `"A" (LABEL)`, `EOL`).
        found: String
    },
    /// A label definition appeared after the start of its line.
    LabelNotAtLineStart(String),
    /// There were multiple labels of the same name.
    DuplicateLabel(String),
    /// The instruction has no encoding for the addressing mode its operand selected.
    ModeUndefined {
        #[allow(missing_docs)]
        mnemonic: Mnemonic,
        #[allow(missing_docs)]
        mode: AddrMode
    },
    /// A value larger than 255 was given where a byte is required.
    ByteExpected(u16),
    /// A branch target is too far from the branch.
    OffsetOutOfRange(i32),
    /// A label was referenced but never defined.
    UnresolvedLabel(String),
    /// Code was emitted past the end of the 16-bit address space.
    PcOverflow,
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken { found, kind } => write!(f, "unexpected token \"{found}\" ({kind})"),
            Self::Expected { expected, found }    => write!(f, "expected {expected}, but found {found}"),
            Self::LabelNotAtLineStart(l)          => write!(f, "label \"{l}\" can only be defined at the beginning of a line"),
            Self::DuplicateLabel(l)               => write!(f, "duplicate label \"{l}\""),
            Self::ModeUndefined { mnemonic, mode } => write!(f, "opcode {mnemonic} is not defined for mode {mode}"),
            Self::ByteExpected(_)                 => f.write_str("expected byte, but found word"),
            Self::OffsetOutOfRange(_)             => f.write_str("label offset is out of range"),
            Self::UnresolvedLabel(l)              => write!(f, "couldn't resolve label \"{l}\""),
            Self::PcOverflow                      => f.write_str("program counter passed the end of memory"),
        }
    }
}

/// Error from parsing or assembling a line.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ParseErr {
    /// The kind of error.
    pub kind: ParseErrKind,
    /// The line and token associated with this error.
    pub span: ErrSpan
}
impl ParseErr {
    /// Creates a new [`ParseErr`] pointing at a token of a line.
    pub fn new(kind: ParseErrKind, line: usize, token: usize) -> Self {
        ParseErr { kind, span: ErrSpan::Token { line, token } }
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {}
impl crate::err::Error for ParseErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span)
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            ParseErrKind::UnexpectedToken { kind: TokenKind::Directive, .. } => Some("the supported directives are .ORG, .DB, .BYTE, .BYTES, .WORD, and .WORDS".into()),
            ParseErrKind::UnexpectedToken { .. } => Some("a line starts with a label definition, a directive, or an instruction".into()),
            ParseErrKind::Expected { .. }        => None,
            ParseErrKind::LabelNotAtLineStart(_) => Some("only one label can be defined per line".into()),
            ParseErrKind::DuplicateLabel(_)      => Some("labels must be unique within a program, try renaming one of the labels".into()),
            ParseErrKind::ModeUndefined { mode: AddrMode::Relative, .. } => Some("only branches take a label operand, except for JMP and JSR".into()),
            ParseErrKind::ModeUndefined { .. }   => None,
            ParseErrKind::ByteExpected(_)        => Some("immediate operands must be in [0, 255]".into()),
            ParseErrKind::OffsetOutOfRange(n)    => Some(format!("branch displacements must be in [-128, 127], but this is {n}").into()),
            ParseErrKind::UnresolvedLabel(_)     => Some("try defining this label at the start of a line (e.g., `LABEL:`)".into()),
            ParseErrKind::PcOverflow             => Some("the last addressable byte is $FFFF".into()),
        }
    }
}

/// A cursor over the tokens of one line.
///
/// Running past the last token yields the implicit end-of-line token.
struct Cursor<'a> {
    line: &'a TokenLine,
    pos: usize,
}
impl<'a> Cursor<'a> {
    fn new(line: &'a TokenLine) -> Self {
        Cursor { line, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.line.tokens.get(self.pos)
    }
    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// The 1-based position of the next token.
    fn token_no(&self) -> usize {
        self.pos + 1
    }
    fn error(&self, kind: ParseErrKind) -> ParseErr {
        ParseErr::new(kind, self.line.lineno, self.token_no())
    }
    /// Errors at the token which was just consumed.
    fn error_prev(&self, kind: ParseErrKind) -> ParseErr {
        ParseErr::new(kind, self.line.lineno, self.pos)
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(t) => format!("\"{t}\" ({})", t.kind()),
            None => TokenKind::Eol.to_string(),
        }
    }
    fn unexpected(&self) -> ParseErr {
        match self.peek() {
            Some(t) => self.error(ParseErrKind::UnexpectedToken { found: t.to_string(), kind: t.kind() }),
            None => self.error(ParseErrKind::Expected { expected: "operand".to_string(), found: self.found() }),
        }
    }
    fn expected(&self, expected: impl Into<String>) -> ParseErr {
        self.error(ParseErrKind::Expected { expected: expected.into(), found: self.found() })
    }

    fn accept(&mut self, token: &Token) -> bool {
        let matched = self.peek() == Some(token);
        if matched { self.pos += 1; }
        matched
    }
    fn accept_register(&mut self, name: &str) -> bool {
        let matched = self.peek().is_some_and(|t| t.is_label(name));
        if matched { self.pos += 1; }
        matched
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseErr> {
        match self.accept(token) {
            true  => Ok(()),
            false => Err(self.expected(token.kind().to_string())),
        }
    }
    fn expect_register(&mut self, name: &str) -> Result<(), ParseErr> {
        match self.accept_register(name) {
            true  => Ok(()),
            false => Err(self.expected(format!("\"{name}\" ({})", TokenKind::Label))),
        }
    }
    fn expect_number(&mut self) -> Result<u16, ParseErr> {
        match self.peek() {
            Some(&Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            },
            _ => Err(self.expected(TokenKind::Number.to_string())),
        }
    }
    fn expect_eol(&self) -> Result<(), ParseErr> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.expected(TokenKind::Eol.to_string())),
        }
    }

    /// Parses a comma-separated list of at least one number.
    fn number_list(&mut self) -> Result<Vec<u16>, ParseErr> {
        let mut values = vec![self.expect_number()?];
        while self.accept(&Token::Comma) {
            values.push(self.expect_number()?);
        }
        Ok(values)
    }
}

/// Parses one line into a statement.
///
/// A line is either empty, a label definition (`NAME:`) optionally followed by a statement,
/// a directive, or an instruction. Every statement must end at the end of the line.
///
/// # Example
/// ```
/// use mos6502_asm::ast::{Branch, Label, Operand, StmtKind};
/// use mos6502_asm::parse::{lex::tokenize, parse_line};
///
/// let stmt = parse_line(&tokenize("LOOP: BNE LOOP", 4).unwrap()).unwrap();
/// assert_eq!(stmt.lineno, 4);
/// assert_eq!(stmt.label, Some(Label::new("LOOP", 1)));
///
/// let Some(StmtKind::Instr(instr)) = stmt.nucleus else { unreachable!() };
/// assert_eq!(instr.opcode(), 0xD0);
/// assert_eq!(instr.operand(), &Operand::Relative(Branch::Label(Label::new("LOOP", 4))));
/// ```
pub fn parse_line(line: &TokenLine) -> Result<Stmt, ParseErr> {
    let mut cur = Cursor::new(line);

    let label = match cur.peek() {
        Some(Token::Ident(Ident::Label(name))) => {
            let token = cur.token_no();
            cur.advance();
            cur.expect(&Token::Colon)?;
            Some(Label::new(name.clone(), token))
        }
        _ => None
    };

    let nucleus = match cur.peek() {
        None => None,
        Some(Token::Ident(Ident::Label(name))) => {
            return Err(cur.error(ParseErrKind::LabelNotAtLineStart(name.clone())));
        }
        Some(Token::Directive(_)) => Some(StmtKind::Directive(parse_directive(&mut cur)?)),
        Some(&Token::Ident(Ident::Mnemonic(m))) => {
            cur.advance();
            Some(StmtKind::Instr(parse_instr(m, &mut cur)?))
        }
        Some(_) => return Err(cur.unexpected()),
    };

    cur.expect_eol()?;
    Ok(Stmt { lineno: line.lineno, label, nucleus })
}

fn parse_directive(cur: &mut Cursor<'_>) -> Result<Directive, ParseErr> {
    let Some(Token::Directive(name)) = cur.peek() else {
        return Err(cur.unexpected());
    };

    let directive = match name.as_str() {
        "DB" => {
            cur.advance();
            Directive::Db(cur.number_list()?)
        },
        "BYTE" | "BYTES" => {
            cur.advance();
            let mut bytes = vec![];
            loop {
                let n = cur.expect_number()?;
                let b = u8::try_from(n)
                    .map_err(|_| cur.error_prev(ParseErrKind::ByteExpected(n)))?;
                bytes.push(b);

                if !cur.accept(&Token::Comma) { break; }
            }
            Directive::Byte(bytes)
        },
        "WORD" | "WORDS" => {
            cur.advance();
            Directive::Word(cur.number_list()?)
        },
        "ORG" => {
            cur.advance();
            Directive::Org(cur.expect_number()?)
        },
        _ => return Err(cur.unexpected()),
    };

    Ok(directive)
}

fn parse_instr(mnemonic: Mnemonic, cur: &mut Cursor<'_>) -> Result<Instr, ParseErr> {
    let operand = parse_operand(mnemonic, cur)?;
    let mode = operand.mode();

    Instr::new(mnemonic, operand)
        .ok_or_else(|| cur.error_prev(ParseErrKind::ModeUndefined { mnemonic, mode }))
}

/// Decides the operand (and so the addressing mode) of an instruction
/// from the tokens following its mnemonic.
///
/// | tokens            | operand                                             |
/// |-------------------|-----------------------------------------------------|
/// | (none)            | [`Operand::Implied`]                                |
/// | `# n`             | [`Operand::Immediate`] (`n` must be a byte)         |
/// | `A`               | [`Operand::Accumulator`]                            |
/// | `LABEL`           | [`Operand::Absolute`] for `JMP`/`JSR`, else [`Operand::Relative`] |
/// | `n` (byte)        | [`Operand::ZeroPage`], or [`Operand::Relative`] for branches |
/// | `n , X` / `n , Y` | zero-page or absolute indexed, by the size of `n`   |
/// | `n` (word)        | [`Operand::Absolute`]                               |
/// | `( n , X )`       | [`Operand::IndirectX`]                              |
/// | `( n ) , Y`       | [`Operand::IndirectY`]                              |
/// | `( n )` (word)    | [`Operand::Indirect`]                               |
/// | `( LABEL )`       | [`Operand::Indirect`]                               |
///
/// This only consumes the operand; the caller checks that the line ends after it.
fn parse_operand(mnemonic: Mnemonic, cur: &mut Cursor<'_>) -> Result<Operand, ParseErr> {
    let Some(token) = cur.peek() else {
        return Ok(Operand::Implied);
    };

    let operand = match token {
        Token::Hash => {
            cur.advance();
            let n = cur.expect_number()?;
            let b = u8::try_from(n)
                .map_err(|_| cur.error_prev(ParseErrKind::ByteExpected(n)))?;
            Operand::Immediate(b)
        },
        t if t.is_label("A") => {
            cur.advance();
            Operand::Accumulator
        },
        Token::Ident(Ident::Label(name)) => {
            let label = Label::new(name.clone(), cur.token_no());
            cur.advance();
            match mnemonic.is_jump() {
                true  => Operand::Absolute(Target::Label(label)),
                false => Operand::Relative(Branch::Label(label)),
            }
        },
        &Token::Number(n) => {
            cur.advance();
            match (u8::try_from(n), cur.accept(&Token::Comma)) {
                (Ok(b), false) if mnemonic.is_branch() => Operand::Relative(Branch::Offset(b)),
                (Ok(b), false) => Operand::ZeroPage(b),
                (Err(_), false) => Operand::Absolute(Target::Addr(n)),
                (Ok(b), true) => {
                    if cur.accept_register("X") { Operand::ZeroPageX(b) }
                    else if cur.accept_register("Y") { Operand::ZeroPageY(b) }
                    else { return Err(cur.unexpected()) }
                },
                (Err(_), true) => {
                    if cur.accept_register("X") { Operand::AbsoluteX(n) }
                    else if cur.accept_register("Y") { Operand::AbsoluteY(n) }
                    else { return Err(cur.unexpected()) }
                },
            }
        },
        Token::LParen => {
            cur.advance();
            match cur.peek() {
                Some(&Token::Number(n)) => {
                    cur.advance();
                    match u8::try_from(n) {
                        Ok(b) if cur.accept(&Token::Comma) => {
                            cur.expect_register("X")?;
                            cur.expect(&Token::RParen)?;
                            Operand::IndirectX(b)
                        },
                        Ok(b) if cur.accept(&Token::RParen) => {
                            cur.expect(&Token::Comma)?;
                            cur.expect_register("Y")?;
                            Operand::IndirectY(b)
                        },
                        Ok(_) => return Err(cur.unexpected()),
                        Err(_) => {
                            cur.expect(&Token::RParen)?;
                            Operand::Indirect(Target::Addr(n))
                        },
                    }
                },
                Some(Token::Ident(Ident::Label(name))) => {
                    let label = Label::new(name.clone(), cur.token_no());
                    cur.advance();
                    cur.expect(&Token::RParen)?;
                    Operand::Indirect(Target::Label(label))
                },
                _ => return Err(cur.unexpected()),
            }
        },
        _ => return Err(cur.unexpected()),
    };

    Ok(operand)
}
