//! The 6502 instruction set.
//!
//! This module holds the static encoding table of the documented 6502 instructions:
//! - [`Mnemonic`]: every documented instruction name, independent of addressing mode
//! - [`AddrMode`]: the thirteen operand shapes
//! - [`opcode`]: the lookup from a (mnemonic, mode) pair to its encoding byte
//!
//! An absent entry is the single signal that an instruction cannot be used
//! with a given addressing mode.

macro_rules! mnemonic_enum {
    ($($instr:ident),+ $(,)?) => {
        /// A documented 6502 instruction name (e.g., `LDA`, `BNE`).
        ///
        /// Each mnemonic has a fixed index (its position in [`Mnemonic::ALL`]),
        /// which is its row in the opcode table.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
        pub enum Mnemonic {
            $(
                #[allow(missing_docs)]
                $instr
            ),+
        }

        impl Mnemonic {
            /// Every mnemonic, in table order.
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$instr),+];

            /// Looks up a mnemonic by name.
            ///
            /// The match is case-insensitive.
            pub fn from_name(s: &str) -> Option<Self> {
                match &*s.to_ascii_uppercase() {
                    $(stringify!($instr) => Some(Self::$instr)),+,
                    _ => None
                }
            }

            /// The name of this mnemonic, in uppercase.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$instr => stringify!($instr)),+
                }
            }
        }
    };
}
mnemonic_enum! {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
}

impl Mnemonic {
    /// The row of this mnemonic in the opcode table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this instruction is a conditional branch
    /// (i.e., it is only encodable in [`AddrMode::Relative`]).
    pub fn is_branch(self) -> bool {
        opcode(self, AddrMode::Relative).is_some()
    }

    /// Whether a bare label operand on this instruction is a full 16-bit address
    /// (as opposed to a branch displacement).
    pub fn is_jump(self) -> bool {
        matches!(self, Mnemonic::JMP | Mnemonic::JSR)
    }
}
impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
impl std::str::FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(())
    }
}

/// An addressing mode: how the operand of an instruction is encoded.
///
/// The order of variants matches the columns of the opcode table.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum AddrMode {
    /// `LDA #$10`
    Immediate,
    /// `LDA $10`
    ZeroPage,
    /// `LDA $10,X`
    ZeroPageX,
    /// `LDX $10,Y`
    ZeroPageY,
    /// `CLC`
    Implied,
    /// `LDA $1234`
    Absolute,
    /// `LDA $1234,X`
    AbsoluteX,
    /// `LDA $1234,Y`
    AbsoluteY,
    /// `LDA ($10,X)`
    IndirectX,
    /// `LDA ($10),Y`
    IndirectY,
    /// `ASL A`
    Accumulator,
    /// `BNE LOOP`
    Relative,
    /// `JMP ($1234)`
    Indirect,
}
impl AddrMode {
    /// Every addressing mode, in table order.
    pub const ALL: [AddrMode; 13] = [
        AddrMode::Immediate, AddrMode::ZeroPage, AddrMode::ZeroPageX, AddrMode::ZeroPageY,
        AddrMode::Implied, AddrMode::Absolute, AddrMode::AbsoluteX, AddrMode::AbsoluteY,
        AddrMode::IndirectX, AddrMode::IndirectY, AddrMode::Accumulator, AddrMode::Relative,
        AddrMode::Indirect,
    ];

    /// The column of this mode in the opcode table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The number of operand bytes that follow the opcode in this mode.
    pub fn operand_len(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::IndirectX
            | AddrMode::IndirectY
            | AddrMode::Relative => 1,
            AddrMode::Absolute
            | AddrMode::AbsoluteX
            | AddrMode::AbsoluteY
            | AddrMode::Indirect => 2,
        }
    }
}
impl std::fmt::Display for AddrMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AddrMode::Immediate   => "IMMEDIATE",
            AddrMode::ZeroPage    => "ZERO-PAGE",
            AddrMode::ZeroPageX   => "ZERO-PAGE X",
            AddrMode::ZeroPageY   => "ZERO-PAGE Y",
            AddrMode::Implied     => "IMPLIED",
            AddrMode::Absolute    => "ABSOLUTE",
            AddrMode::AbsoluteX   => "ABSOLUTE X",
            AddrMode::AbsoluteY   => "ABSOLUTE Y",
            AddrMode::IndirectX   => "INDIRECT X",
            AddrMode::IndirectY   => "INDIRECT Y",
            AddrMode::Accumulator => "ACCUMULATOR",
            AddrMode::Relative    => "RELATIVE",
            AddrMode::Indirect    => "INDIRECT",
        })
    }
}

// Shorthand for "no encoding" so the table lines up.
const __: Option<u8> = None;
const fn o(b: u8) -> Option<u8> { Some(b) }

#[rustfmt::skip]
static OPCODES: [[Option<u8>; 13]; 56] = [
    //   IMM       ZP        ZPX       ZPY       IMP       ABS       ABSX      ABSY      INDX      INDY      ACC       REL       IND
    [o(0x69), o(0x65), o(0x75), __,      __,      o(0x6D), o(0x7D), o(0x79), o(0x61), o(0x71), __,      __,      __     ], // ADC
    [o(0x29), o(0x25), o(0x35), __,      __,      o(0x2D), o(0x3D), o(0x39), o(0x21), o(0x31), __,      __,      __     ], // AND
    [__,      o(0x06), o(0x16), __,      __,      o(0x0E), o(0x1E), __,      __,      __,      o(0x0A), __,      __     ], // ASL
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0x90), __     ], // BCC
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0xB0), __     ], // BCS
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0xF0), __     ], // BEQ
    [__,      o(0x24), __,      __,      __,      o(0x2C), __,      __,      __,      __,      __,      __,      __     ], // BIT
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0x30), __     ], // BMI
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0xD0), __     ], // BNE
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0x10), __     ], // BPL
    [__,      __,      __,      __,      o(0x00), __,      __,      __,      __,      __,      __,      __,      __     ], // BRK
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0x50), __     ], // BVC
    [__,      __,      __,      __,      __,      __,      __,      __,      __,      __,      __,      o(0x70), __     ], // BVS
    [__,      __,      __,      __,      o(0x18), __,      __,      __,      __,      __,      __,      __,      __     ], // CLC
    [__,      __,      __,      __,      o(0xD8), __,      __,      __,      __,      __,      __,      __,      __     ], // CLD
    [__,      __,      __,      __,      o(0x58), __,      __,      __,      __,      __,      __,      __,      __     ], // CLI
    [__,      __,      __,      __,      o(0xB8), __,      __,      __,      __,      __,      __,      __,      __     ], // CLV
    [o(0xC9), o(0xC5), o(0xD5), __,      __,      o(0xCD), o(0xDD), o(0xD9), o(0xC1), o(0xD1), __,      __,      __     ], // CMP
    [o(0xE0), o(0xE4), __,      __,      __,      o(0xEC), __,      __,      __,      __,      __,      __,      __     ], // CPX
    [o(0xC0), o(0xC4), __,      __,      __,      o(0xCC), __,      __,      __,      __,      __,      __,      __     ], // CPY
    [__,      o(0xC6), o(0xD6), __,      __,      o(0xCE), o(0xDE), __,      __,      __,      __,      __,      __     ], // DEC
    [__,      __,      __,      __,      o(0xCA), __,      __,      __,      __,      __,      __,      __,      __     ], // DEX
    [__,      __,      __,      __,      o(0x88), __,      __,      __,      __,      __,      __,      __,      __     ], // DEY
    [o(0x49), o(0x45), o(0x55), __,      __,      o(0x4D), o(0x5D), o(0x59), o(0x41), o(0x51), __,      __,      __     ], // EOR
    [__,      o(0xE6), o(0xF6), __,      __,      o(0xEE), o(0xFE), __,      __,      __,      __,      __,      __     ], // INC
    [__,      __,      __,      __,      o(0xE8), __,      __,      __,      __,      __,      __,      __,      __     ], // INX
    [__,      __,      __,      __,      o(0xC8), __,      __,      __,      __,      __,      __,      __,      __     ], // INY
    [__,      __,      __,      __,      __,      o(0x4C), __,      __,      __,      __,      __,      __,      o(0x6C)], // JMP
    [__,      __,      __,      __,      __,      o(0x20), __,      __,      __,      __,      __,      __,      __     ], // JSR
    [o(0xA9), o(0xA5), o(0xB5), __,      __,      o(0xAD), o(0xBD), o(0xB9), o(0xA1), o(0xB1), __,      __,      __     ], // LDA
    [o(0xA2), o(0xA6), __,      o(0xB6), __,      o(0xAE), __,      o(0xBE), __,      __,      __,      __,      __     ], // LDX
    [o(0xA0), o(0xA4), o(0xB4), __,      __,      o(0xAC), o(0xBC), __,      __,      __,      __,      __,      __     ], // LDY
    [__,      o(0x46), o(0x56), __,      __,      o(0x4E), o(0x5E), __,      __,      __,      o(0x4A), __,      __     ], // LSR
    [__,      __,      __,      __,      o(0xEA), __,      __,      __,      __,      __,      __,      __,      __     ], // NOP
    [o(0x09), o(0x05), o(0x15), __,      __,      o(0x0D), o(0x1D), o(0x19), o(0x01), o(0x11), __,      __,      __     ], // ORA
    [__,      __,      __,      __,      o(0x48), __,      __,      __,      __,      __,      __,      __,      __     ], // PHA
    [__,      __,      __,      __,      o(0x08), __,      __,      __,      __,      __,      __,      __,      __     ], // PHP
    [__,      __,      __,      __,      o(0x68), __,      __,      __,      __,      __,      __,      __,      __     ], // PLA
    [__,      __,      __,      __,      o(0x28), __,      __,      __,      __,      __,      __,      __,      __     ], // PLP
    [__,      o(0x26), o(0x36), __,      __,      o(0x2E), o(0x3E), __,      __,      __,      o(0x2A), __,      __     ], // ROL
    [__,      o(0x66), o(0x76), __,      __,      o(0x6E), o(0x7E), __,      __,      __,      o(0x6A), __,      __     ], // ROR
    [__,      __,      __,      __,      o(0x40), __,      __,      __,      __,      __,      __,      __,      __     ], // RTI
    [__,      __,      __,      __,      o(0x60), __,      __,      __,      __,      __,      __,      __,      __     ], // RTS
    [o(0xE9), o(0xE5), o(0xF5), __,      __,      o(0xED), o(0xFD), o(0xF9), o(0xE1), o(0xF1), __,      __,      __     ], // SBC
    [__,      __,      __,      __,      o(0x38), __,      __,      __,      __,      __,      __,      __,      __     ], // SEC
    [__,      __,      __,      __,      o(0xF8), __,      __,      __,      __,      __,      __,      __,      __     ], // SED
    [__,      __,      __,      __,      o(0x78), __,      __,      __,      __,      __,      __,      __,      __     ], // SEI
    [__,      o(0x85), o(0x95), __,      __,      o(0x8D), o(0x9D), o(0x99), o(0x81), o(0x91), __,      __,      __     ], // STA
    [__,      o(0x86), __,      o(0x96), __,      o(0x8E), __,      __,      __,      __,      __,      __,      __     ], // STX
    [__,      o(0x84), o(0x94), __,      __,      o(0x8C), __,      __,      __,      __,      __,      __,      __     ], // STY
    [__,      __,      __,      __,      o(0xAA), __,      __,      __,      __,      __,      __,      __,      __     ], // TAX
    [__,      __,      __,      __,      o(0xA8), __,      __,      __,      __,      __,      __,      __,      __     ], // TAY
    [__,      __,      __,      __,      o(0xBA), __,      __,      __,      __,      __,      __,      __,      __     ], // TSX
    [__,      __,      __,      __,      o(0x8A), __,      __,      __,      __,      __,      __,      __,      __     ], // TXA
    [__,      __,      __,      __,      o(0x9A), __,      __,      __,      __,      __,      __,      __,      __     ], // TXS
    [__,      __,      __,      __,      o(0x98), __,      __,      __,      __,      __,      __,      __,      __     ], // TYA
];

/// Gets the encoding byte of an instruction in a given addressing mode.
///
/// Returns `None` if the instruction cannot be used with that mode.
///
/// ```
/// use mos6502_asm::isa::{opcode, AddrMode, Mnemonic};
///
/// assert_eq!(opcode(Mnemonic::LDA, AddrMode::Immediate), Some(0xA9));
/// assert_eq!(opcode(Mnemonic::JMP, AddrMode::Indirect), Some(0x6C));
/// assert_eq!(opcode(Mnemonic::STA, AddrMode::Immediate), None);
/// ```
pub fn opcode(m: Mnemonic, mode: AddrMode) -> Option<u8> {
    OPCODES[m.index()][mode.index()]
}
