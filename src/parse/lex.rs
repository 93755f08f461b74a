//! Tokenizing 6502 assembly.
//!
//! This module holds the tokens that characterize 6502 assembly ([`Token`]).
//! This module is used by the parser to facilitate the conversion of
//! preprocessed source lines into statements.
//!
//! Lexing operates on one line at a time ([`tokenize`]), because the
//! preprocessor has already split, comment-stripped, and upper-cased the source.
//! The end of the line is the end of the token sequence;
//! it terminates whatever token was being scanned.

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

use crate::err::ErrSpan;
use crate::isa::Mnemonic;

/// A unit of information in 6502 source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n]+", error = LexErrKind)]
pub enum Token {
    /// The immediate marker, `#`.
    #[token("#")]
    Hash,

    /// A comma, which separates an operand from its index register
    /// and separates the values of a data directive.
    #[token(",")]
    Comma,

    /// A colon, which ends a label definition.
    #[token(":")]
    Colon,

    /// An opening parenthesis (for indirect operands).
    #[token("(")]
    LParen,

    /// A closing parenthesis (for indirect operands).
    #[token(")")]
    RParen,

    // Like the identifier regex, this spans over numbers that are technically invalid
    // (e.g., `%102` or `09`), which are then rejected by the validator.

    /// A numeric literal (e.g., `123`, `%1010`, `$FF`, `017`).
    #[regex(r"[0-9%$][0-9A-F]*", lex_number)]
    Number(u16),

    /// A directive (e.g., `.ORG`, `.DB`), stored without its leading period.
    #[regex(r"\.[A-Z0-9_]*", |lx| lx.slice()[1..].to_string())]
    Directive(String),

    /// An identifier.
    ///
    /// This can refer to either:
    /// - an instruction (e.g. `LDA`, `BNE`)
    /// - a label (e.g., `LOOP`, `END_2`)
    /// - one of the register names `A`, `X`, `Y` (which are lexed as labels)
    #[regex(r"[A-Z][A-Z0-9_]*", |lx| Ident::new(lx.slice()))]
    Ident(Ident),
}
impl Token {
    /// The class of this token, used in diagnostics.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Hash       => TokenKind::Immediate,
            Token::Comma      => TokenKind::Comma,
            Token::Colon      => TokenKind::Colon,
            Token::LParen     => TokenKind::LParen,
            Token::RParen     => TokenKind::RParen,
            Token::Number(_)  => TokenKind::Number,
            Token::Directive(_) => TokenKind::Directive,
            Token::Ident(Ident::Mnemonic(_)) => TokenKind::Operator,
            Token::Ident(Ident::Label(_))    => TokenKind::Label,
        }
    }

    /// Whether this token is the label (or register name) `name`.
    pub(crate) fn is_label(&self, name: &str) -> bool {
        matches!(self, Token::Ident(Ident::Label(l)) if l == name)
    }
}
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Hash         => f.write_str("#"),
            Token::Comma        => f.write_str(","),
            Token::Colon        => f.write_str(":"),
            Token::LParen       => f.write_str("("),
            Token::RParen       => f.write_str(")"),
            Token::Number(n)    => write!(f, "{n}"),
            Token::Directive(d) => write!(f, ".{d}"),
            Token::Ident(id)    => id.fmt(f),
        }
    }
}

/// An identifier: either an instruction name or a label.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Ident {
    /// One of the documented instruction names.
    Mnemonic(Mnemonic),
    /// Anything else (label names and the register names `A`, `X`, `Y`).
    Label(String),
}
impl Ident {
    /// Classifies an identifier.
    pub fn new(s: &str) -> Self {
        match Mnemonic::from_name(s) {
            Some(m) => Ident::Mnemonic(m),
            None    => Ident::Label(s.to_string()),
        }
    }
}
impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ident::Mnemonic(m) => m.fmt(f),
            Ident::Label(id)   => f.write_str(id),
        }
    }
}

/// The class of a token (see [`Token::kind`]).
///
/// This also includes [`TokenKind::Eol`], the implicit token at the end of every line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TokenKind {
    #[allow(missing_docs)]
    Immediate,
    #[allow(missing_docs)]
    Comma,
    #[allow(missing_docs)]
    Colon,
    #[allow(missing_docs)]
    LParen,
    #[allow(missing_docs)]
    RParen,
    #[allow(missing_docs)]
    Number,
    #[allow(missing_docs)]
    Directive,
    #[allow(missing_docs)]
    Operator,
    #[allow(missing_docs)]
    Label,
    /// The end of a line.
    Eol,
}
impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenKind::Immediate => "IMMEDIATE",
            TokenKind::Comma     => "COMMA",
            TokenKind::Colon     => "COLON",
            TokenKind::LParen    => "LPAREN",
            TokenKind::RParen    => "RPAREN",
            TokenKind::Number    => "NUMBER",
            TokenKind::Directive => "DIRECTIVE",
            TokenKind::Operator  => "OPERATOR",
            TokenKind::Label     => "LABEL",
            TokenKind::Eol       => "EOL",
        })
    }
}

/// The tokens of one preprocessed source line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TokenLine {
    /// The 1-based index of this line in the preprocessed source.
    pub lineno: usize,
    /// The tokens on this line, in order.
    pub tokens: Vec<Token>,
}

/// Kinds of errors that can occur from tokenizing a line.
///
/// See [`LexErr`] for this error type with position information included.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErrKind {
    /// Numeric literal cannot fit within the range of a u16
    DoesNotFitU16,
    /// Binary literal (starting with %) has digits other than 0 and 1
    InvalidBinary,
    /// Hex literal (starting with $) has invalid hex digits
    ///
    /// (This cannot occur for uppercase source, but is kept for completeness.)
    InvalidHex,
    /// Octal literal (starting with 0) has digits other than 0-7
    InvalidOctal,
    /// Decimal literal has digits other than 0-9
    InvalidDecimal,
    /// Binary or hex literal doesn't have digits after its prefix
    EmptyNumber,
    /// Int parsing failed but the reason why is unknown
    UnknownIntErr,
    /// A character was used which is not allowed in 6502 assembly files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErrKind::DoesNotFitU16  => f.write_str("numeric literal does not fit 16-bit unsigned integer"),
            LexErrKind::InvalidBinary  => f.write_str("invalid binary literal"),
            LexErrKind::InvalidHex     => f.write_str("invalid hex literal"),
            LexErrKind::InvalidOctal   => f.write_str("invalid octal literal"),
            LexErrKind::InvalidDecimal => f.write_str("invalid decimal literal"),
            LexErrKind::EmptyNumber    => f.write_str("numeric literal has no digits"),
            LexErrKind::UnknownIntErr  => f.write_str("could not parse integer"),
            LexErrKind::InvalidSymbol  => f.write_str("unexpected character"),
        }
    }
}
impl LexErrKind {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErrKind::DoesNotFitU16  => Some(format!("the range for a 16-bit unsigned integer is [{}, {}]", u16::MIN, u16::MAX).into()),
            LexErrKind::InvalidBinary  => Some("a binary literal starts with '%' and consists of 0-1".into()),
            LexErrKind::InvalidHex     => Some("a hex literal starts with '$' and consists of 0-9, A-F".into()),
            LexErrKind::InvalidOctal   => Some("a number starting with '0' is octal and consists of 0-7".into()),
            LexErrKind::InvalidDecimal => Some("a decimal literal only consists of digits 0-9".into()),
            LexErrKind::EmptyNumber    => Some("there should be digits after the prefix here".into()),
            LexErrKind::UnknownIntErr  => None,
            LexErrKind::InvalidSymbol  => Some("this char does not occur in any token in 6502 assembly".into()),
        }
    }
}

/// Error from tokenizing a line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LexErr {
    /// The kind of error.
    pub kind: LexErrKind,
    /// The line and scan position of the offending text.
    pub span: ErrSpan
}
impl LexErr {
    /// Creates a new [`LexErr`].
    pub fn new(kind: LexErrKind, line: usize, col: usize) -> Self {
        LexErr { kind, span: ErrSpan::Col { line, col } }
    }
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span)
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        self.kind.help()
    }
}

/// Helper that converts an int error kind to its corresponding LexErrKind, based on the provided inputs.
fn convert_int_error(
    e: &IntErrorKind,
    invalid_digits_err: LexErrKind,
) -> LexErrKind {
    match e {
        IntErrorKind::Empty        => LexErrKind::EmptyNumber,
        IntErrorKind::InvalidDigit => invalid_digits_err,
        IntErrorKind::PosOverflow  => LexErrKind::DoesNotFitU16,
        IntErrorKind::NegOverflow  => LexErrKind::DoesNotFitU16,
        _ => LexErrKind::UnknownIntErr,
    }
}
fn lex_number(lx: &Lexer<'_, Token>) -> Result<u16, LexErrKind> {
    let text = lx.slice();

    let (digits, radix, invalid) = if let Some(bin) = text.strip_prefix('%') {
        (bin, 2, LexErrKind::InvalidBinary)
    } else if let Some(hex) = text.strip_prefix('$') {
        (hex, 16, LexErrKind::InvalidHex)
    } else if let Some(oct) = text.strip_prefix('0').filter(|rest| !rest.is_empty()) {
        (oct, 8, LexErrKind::InvalidOctal)
    } else {
        (text, 10, LexErrKind::InvalidDecimal)
    };

    u16::from_str_radix(digits, radix)
        .map_err(|e| convert_int_error(e.kind(), invalid))
}

/// Tokenizes a single preprocessed line.
///
/// `lineno` is the 1-based line index, which is recorded on the result
/// and on any error.
///
/// # Example
/// ```
/// use mos6502_asm::parse::lex::{tokenize, Ident, Token};
/// use mos6502_asm::isa::Mnemonic;
///
/// let line = tokenize("LDA ($20),Y", 1).unwrap();
/// assert_eq!(line.tokens, [
///     Token::Ident(Ident::Mnemonic(Mnemonic::LDA)),
///     Token::LParen,
///     Token::Number(0x20),
///     Token::RParen,
///     Token::Comma,
///     Token::Ident(Ident::Label("Y".to_string())),
/// ]);
/// ```
pub fn tokenize(line: &str, lineno: usize) -> Result<TokenLine, LexErr> {
    let mut lx = Token::lexer(line);
    let mut tokens = vec![];

    while let Some(m_token) = lx.next() {
        match m_token {
            Ok(token) => tokens.push(token),
            Err(kind) => return Err(LexErr::new(kind, lineno, lx.span().start)),
        }
    }

    Ok(TokenLine { lineno, tokens })
}

/// Tokenizes every line of a preprocessed source, numbering lines from 1.
///
/// This stops at the first line which fails to tokenize.
pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<TokenLine>, LexErr> {
    lines.iter()
        .enumerate()
        .map(|(i, line)| tokenize(line.as_ref(), i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::err::{ErrSpan, LexErrKind};
    use crate::isa::Mnemonic;
    use crate::parse::lex::{tokenize, tokenize_lines, Ident, Token, TokenKind};

    fn label(s: &str) -> Token {
        Token::Ident(Ident::Label(s.to_string()))
    }
    fn directive(s: &str) -> Token {
        Token::Directive(s.to_string())
    }
    fn op(m: Mnemonic) -> Token {
        Token::Ident(Ident::Mnemonic(m))
    }

    #[test]
    fn test_numeric_bases() {
        let mut tokens = Token::lexer("10 $FF %1010 010 0 00 $0 %0");
        assert_eq!(tokens.next(), Some(Ok(Token::Number(10))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(255))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(10))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(8))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0))));
        assert_eq!(tokens.next(), None);

        let mut tokens = Token::lexer("$ABCD $600 0777 %11111111");
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0xABCD))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0x600))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0o777))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0xFF))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_numeric_range() {
        // Literals are bounded to 16 bits.
        let mut tokens = Token::lexer("65535 $FFFF 0177777");
        assert_eq!(tokens.next(), Some(Ok(Token::Number(65535))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(65535))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(65535))));
        assert_eq!(tokens.next(), None);

        assert_eq!(Token::lexer("65536").next(), Some(Err(LexErrKind::DoesNotFitU16)));
        assert_eq!(Token::lexer("$10000").next(), Some(Err(LexErrKind::DoesNotFitU16)));
        assert_eq!(Token::lexer("%11111111111111111").next(), Some(Err(LexErrKind::DoesNotFitU16)));
        assert_eq!(Token::lexer("99999999999999999999").next(), Some(Err(LexErrKind::DoesNotFitU16)));
    }

    #[test]
    fn test_numeric_invalid() {
        assert_eq!(Token::lexer("%102").next(), Some(Err(LexErrKind::InvalidBinary)));
        assert_eq!(Token::lexer("09").next(), Some(Err(LexErrKind::InvalidOctal)));
        assert_eq!(Token::lexer("12A").next(), Some(Err(LexErrKind::InvalidDecimal)));
        assert_eq!(Token::lexer("%").next(), Some(Err(LexErrKind::EmptyNumber)));
        assert_eq!(Token::lexer("$").next(), Some(Err(LexErrKind::EmptyNumber)));
    }

    #[test]
    fn test_number_then_ident() {
        // A number scan stops at the first character outside [0-9A-F].
        let mut tokens = Token::lexer("1G $FFZ");
        assert_eq!(tokens.next(), Some(Ok(Token::Number(1))));
        assert_eq!(tokens.next(), Some(Ok(label("G"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Number(0xFF))));
        assert_eq!(tokens.next(), Some(Ok(label("Z"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_keywords_labels() {
        for &m in Mnemonic::ALL {
            let mut tokens = Token::lexer(m.name());
            assert_eq!(tokens.next(), Some(Ok(op(m))), "Expected {m} to be keyword");
            assert_eq!(tokens.next(), None);
        }

        let mut tokens = Token::lexer("LOOP A X Y LDAX END_2 BNE2");
        assert_eq!(tokens.next(), Some(Ok(label("LOOP"))));
        assert_eq!(tokens.next(), Some(Ok(label("A"))));
        assert_eq!(tokens.next(), Some(Ok(label("X"))));
        assert_eq!(tokens.next(), Some(Ok(label("Y"))));
        assert_eq!(tokens.next(), Some(Ok(label("LDAX"))));
        assert_eq!(tokens.next(), Some(Ok(label("END_2"))));
        assert_eq!(tokens.next(), Some(Ok(label("BNE2"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_directive() {
        let mut tokens = Token::lexer(".ORG .DB .WORDS .INCLUDE2 .");
        assert_eq!(tokens.next(), Some(Ok(directive("ORG"))));
        assert_eq!(tokens.next(), Some(Ok(directive("DB"))));
        assert_eq!(tokens.next(), Some(Ok(directive("WORDS"))));
        assert_eq!(tokens.next(), Some(Ok(directive("INCLUDE2"))));
        assert_eq!(tokens.next(), Some(Ok(directive(""))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_punct() {
        let line = tokenize("LOOP: LDA ($10,X) \t", 3).unwrap();
        assert_eq!(line.lineno, 3);
        assert_eq!(line.tokens, [
            label("LOOP"),
            Token::Colon,
            op(Mnemonic::LDA),
            Token::LParen,
            Token::Number(16),
            Token::Comma,
            label("X"),
            Token::RParen,
        ]);

        let kinds: Vec<_> = tokenize("STA #1,(", 1).unwrap()
            .tokens
            .iter()
            .map(Token::kind)
            .collect();
        assert_eq!(kinds, [TokenKind::Operator, TokenKind::Immediate, TokenKind::Number, TokenKind::Comma, TokenKind::LParen]);
    }

    #[test]
    fn test_empty_line() {
        assert!(tokenize("", 1).unwrap().tokens.is_empty());
        assert!(tokenize("   \t \n", 1).unwrap().tokens.is_empty());
    }

    #[test]
    fn test_invalid_symbol() {
        for c in ['!', '"', '&', '*', '+', '-', ';', '=', '@', '[', '\\', '`', 'a', 'z', '{', '~'] {
            let line = format!("NOP {c}");
            let err = tokenize(&line, 7).unwrap_err();
            assert_eq!(err.kind, LexErrKind::InvalidSymbol, "Expected {c:?} to be an invalid symbol");
            assert_eq!(err.span, ErrSpan::Col { line: 7, col: 4 });
        }
    }

    #[test]
    fn test_error_position() {
        let err = tokenize("  .DB 1, %12", 12).unwrap_err();
        assert_eq!(err.kind, LexErrKind::InvalidBinary);
        assert_eq!(err.span, ErrSpan::Col { line: 12, col: 9 });
    }

    #[test]
    fn test_tokenize_lines() {
        let lines = tokenize_lines(&["NOP", "", "BRK"]).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].lineno, 3);
        assert_eq!(lines[2].tokens, [op(Mnemonic::BRK)]);

        let err = tokenize_lines(&["NOP", "LDA !"]).unwrap_err();
        assert_eq!(err.span.line(), 2);
    }
}
