//! Components relating to the statements of 6502 assembly.
//!
//! Each preprocessed line parses into one [`Stmt`], which holds
//! an optional label definition and an optional nucleus
//! (either an [`Instr`] or a [`Directive`]).
//!
//! Instructions carry their addressing mode in the shape of their [`Operand`],
//! so an [`Instr`] can only be built for (mnemonic, mode) pairs the opcode table defines.

use crate::isa::{self, AddrMode, Mnemonic};

/// A label reference or definition.
///
/// This struct stores the name of the label (accessible by the `name` field)
/// and the position of its token on its line, which is used for diagnostics.
///
/// # Examples
/// ```text
/// .ORG $0600
/// LOOP:
/// ~~~~
///     DEX
///     BNE LOOP
///         ~~~~
///     JMP (VECTOR)
///          ~~~~~~
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Label {
    /// The label's identifier
    pub name: String,

    /// The 1-based index of the label's token on its line.
    pub token: usize,
}
impl Label {
    /// Creates a new label.
    pub fn new(name: impl Into<String>, token: usize) -> Self {
        Label { name: name.into(), token }
    }
}
impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

/// A 16-bit address operand, either a literal or a label.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Target {
    #[allow(missing_docs)]
    Addr(u16),
    #[allow(missing_docs)]
    Label(Label),
}
impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Addr(a)  => write!(f, "${a:04X}"),
            Target::Label(l) => l.fmt(f),
        }
    }
}

/// A branch operand, either a literal displacement byte or a label.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Branch {
    /// A displacement byte, written as-is.
    Offset(u8),
    /// A label, whose displacement is computed from the branch's address.
    Label(Label),
}
impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Branch::Offset(o) => write!(f, "${o:02X}"),
            Branch::Label(l)  => l.fmt(f),
        }
    }
}

/// The operand of an instruction, shaped by its addressing mode.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Operand {
    /// No operand (`CLC`).
    Implied,
    /// The accumulator (`ASL A`).
    Accumulator,
    /// `#byte`
    Immediate(u8),
    /// `byte`
    ZeroPage(u8),
    /// `byte,X`
    ZeroPageX(u8),
    /// `byte,Y`
    ZeroPageY(u8),
    /// `word` or `LABEL` (for jumps)
    Absolute(Target),
    /// `word,X`
    AbsoluteX(u16),
    /// `word,Y`
    AbsoluteY(u16),
    /// `(byte,X)`
    IndirectX(u8),
    /// `(byte),Y`
    IndirectY(u8),
    /// `byte` or `LABEL` (for branches)
    Relative(Branch),
    /// `(word)` or `(LABEL)`
    Indirect(Target),
}
impl Operand {
    /// The addressing mode this operand is encoded with.
    pub fn mode(&self) -> AddrMode {
        match self {
            Operand::Implied      => AddrMode::Implied,
            Operand::Accumulator  => AddrMode::Accumulator,
            Operand::Immediate(_) => AddrMode::Immediate,
            Operand::ZeroPage(_)  => AddrMode::ZeroPage,
            Operand::ZeroPageX(_) => AddrMode::ZeroPageX,
            Operand::ZeroPageY(_) => AddrMode::ZeroPageY,
            Operand::Absolute(_)  => AddrMode::Absolute,
            Operand::AbsoluteX(_) => AddrMode::AbsoluteX,
            Operand::AbsoluteY(_) => AddrMode::AbsoluteY,
            Operand::IndirectX(_) => AddrMode::IndirectX,
            Operand::IndirectY(_) => AddrMode::IndirectY,
            Operand::Relative(_)  => AddrMode::Relative,
            Operand::Indirect(_)  => AddrMode::Indirect,
        }
    }
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Implied      => Ok(()),
            Operand::Accumulator  => f.write_str("A"),
            Operand::Immediate(b) => write!(f, "#${b:02X}"),
            Operand::ZeroPage(b)  => write!(f, "${b:02X}"),
            Operand::ZeroPageX(b) => write!(f, "${b:02X},X"),
            Operand::ZeroPageY(b) => write!(f, "${b:02X},Y"),
            Operand::Absolute(t)  => t.fmt(f),
            Operand::AbsoluteX(w) => write!(f, "${w:04X},X"),
            Operand::AbsoluteY(w) => write!(f, "${w:04X},Y"),
            Operand::IndirectX(b) => write!(f, "(${b:02X},X)"),
            Operand::IndirectY(b) => write!(f, "(${b:02X}),Y"),
            Operand::Relative(br) => br.fmt(f),
            Operand::Indirect(t)  => write!(f, "({t})"),
        }
    }
}

/// An instruction whose (mnemonic, mode) pair has an encoding.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Instr {
    mnemonic: Mnemonic,
    opcode: u8,
    operand: Operand,
}
impl Instr {
    /// Creates an instruction, returning `None` if the mnemonic
    /// is not defined for the operand's addressing mode.
    ///
    /// ```
    /// use mos6502_asm::ast::{Instr, Operand};
    /// use mos6502_asm::isa::Mnemonic;
    ///
    /// let lda = Instr::new(Mnemonic::LDA, Operand::Immediate(1)).unwrap();
    /// assert_eq!(lda.opcode(), 0xA9);
    /// assert_eq!(lda.len(), 2);
    ///
    /// assert!(Instr::new(Mnemonic::STA, Operand::Immediate(1)).is_none());
    /// ```
    pub fn new(mnemonic: Mnemonic, operand: Operand) -> Option<Self> {
        let opcode = isa::opcode(mnemonic, operand.mode())?;
        Some(Instr { mnemonic, opcode, operand })
    }

    /// The instruction name.
    pub fn mnemonic(&self) -> Mnemonic {
        self.mnemonic
    }
    /// The encoding byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }
    /// The operand.
    pub fn operand(&self) -> &Operand {
        &self.operand
    }
    /// Splits the instruction into its opcode and operand.
    pub fn into_parts(self) -> (u8, Operand) {
        (self.opcode, self.operand)
    }

    /// How many bytes this instruction takes up in memory (1-3).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u16 {
        1 + self.operand.mode().operand_len()
    }
}
impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operand {
            Operand::Implied => self.mnemonic.fmt(f),
            _ => write!(f, "{} {}", self.mnemonic, self.operand),
        }
    }
}

/// A directive.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Directive {
    /// `.DB v, v, ...`: values up to 255 take one byte, larger values take two.
    Db(Vec<u16>),
    /// `.BYTE v, v, ...` (or `.BYTES`): one byte per value.
    Byte(Vec<u8>),
    /// `.WORD v, v, ...` (or `.WORDS`): two bytes per value.
    Word(Vec<u16>),
    /// `.ORG addr`: moves the program counter.
    Org(u16),
}
impl Directive {
    /// The bytes this directive emits, in order.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Directive::Db(values) => values.iter()
                .flat_map(|&v| match u8::try_from(v) {
                    Ok(b)  => vec![b],
                    Err(_) => v.to_le_bytes().to_vec(),
                })
                .collect(),
            Directive::Byte(values) => values.clone(),
            Directive::Word(values) => values.iter()
                .flat_map(|v| v.to_le_bytes())
                .collect(),
            Directive::Org(_) => vec![],
        }
    }
}
impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, name: &str, values: &[T]) -> std::fmt::Result {
            write!(f, ".{name} ")?;
            for (i, v) in values.iter().enumerate() {
                if i != 0 { f.write_str(", ")?; }
                v.fmt(f)?;
            }
            Ok(())
        }

        match self {
            Directive::Db(v)   => list(f, "DB", v),
            Directive::Byte(v) => list(f, "BYTE", v),
            Directive::Word(v) => list(f, "WORD", v),
            Directive::Org(a)  => write!(f, ".ORG ${a:04X}"),
        }
    }
}

/// The nucleus of a statement.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum StmtKind {
    #[allow(missing_docs)]
    Instr(Instr),
    #[allow(missing_docs)]
    Directive(Directive),
}
impl std::fmt::Display for StmtKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StmtKind::Instr(i)     => i.fmt(f),
            StmtKind::Directive(d) => d.fmt(f),
        }
    }
}

/// One parsed source line.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Stmt {
    /// The 1-based line this statement was parsed from.
    pub lineno: usize,
    /// The label defined at the start of this line, if any.
    pub label: Option<Label>,
    /// The instruction or directive on this line, if any.
    pub nucleus: Option<StmtKind>,
}
