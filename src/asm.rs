//! Assembling 6502 statements into a memory image.
//!
//! This module converts tokenized lines (`[`[`TokenLine`]`]`) into an object file
//! holding the assembled memory image.
//!
//! Assembly is single-pass. Lines are parsed and encoded strictly in order, threading
//! one [`Assembler`] context (program counter, image, [`SymbolTable`]) through every line.
//! Label references which cannot be resolved when they are encountered (forward references)
//! are written as zero placeholders and recorded as [`Fixup`]s, which are all patched
//! in a final resolution pass once the whole source has been scanned.
//!
//! The assembler module notably consists of:
//! - [`assemble`] and [`assemble_src`]: The main functions which assemble source lines into an object file.
//! - [`SymbolTable`]: a struct holding the label table and the queue of pending fixups
//! - [`ObjectFile`]: a struct holding the assembled image and its final label table

pub mod encoding;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{Branch, Directive, Label, Operand, Stmt, StmtKind, Target};
use crate::err::{Error as _, ErrSpan, LexErr};
use crate::parse::lex::{tokenize_lines, TokenLine};
use crate::parse::{parse_line, ParseErr, ParseErrKind};

/// Assembles tokenized lines into an object file.
///
/// Lines are processed in order. The first error aborts the run,
/// except unresolved labels, which are only reported once every line has been processed.
///
/// # Example
/// ```
/// use mos6502_asm::asm::assemble;
/// use mos6502_asm::parse::lex::tokenize_lines;
///
/// let lines = tokenize_lines(&["JMP FWD", "FWD: NOP"]).unwrap();
/// let obj = assemble(&lines).unwrap();
///
/// assert_eq!(obj.as_bytes(), [0x4C, 0x03, 0x00, 0xEA]);
/// assert_eq!(obj.lookup_label("FWD"), Some(0x0003));
/// ```
pub fn assemble(lines: &[TokenLine]) -> Result<ObjectFile, ParseErr> {
    debug!("assembling {} lines", lines.len());

    let mut asm = Assembler::new();
    for line in lines {
        let stmt = parse_line(line)?;
        asm.write_stmt(&stmt)?;
    }
    asm.finish()
}

/// Assembles in-memory source text into an object file.
///
/// Each line has its comment stripped and is upper-cased before tokenizing
/// (see [`crate::prep::normalize_line`]). `.INCLUDE` is not expanded here;
/// use [`crate::prep`] to preprocess files.
///
/// # Example
/// ```
/// use mos6502_asm::asm::assemble_src;
///
/// let obj = assemble_src("
///     .org $0600
///     loop: dex   ; count down
///     bne loop
/// ").unwrap();
///
/// assert_eq!(&obj.as_bytes()[0x600..], [0xCA, 0xD0, 0xFD]);
/// ```
pub fn assemble_src(src: &str) -> Result<ObjectFile, AsmErr> {
    let lines: Vec<_> = src.lines()
        .map(crate::prep::normalize_line)
        .collect();

    let lines = tokenize_lines(&lines)?;
    Ok(assemble(&lines)?)
}

/// Error from assembling source text.
///
/// This is either a lexing error (which is detected for all lines before assembly starts)
/// or an error from parsing and assembling.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AsmErr {
    /// A line could not be tokenized.
    Lex(LexErr),
    /// A line could not be parsed or assembled.
    Parse(ParseErr),
}
impl From<LexErr> for AsmErr {
    fn from(value: LexErr) -> Self {
        AsmErr::Lex(value)
    }
}
impl From<ParseErr> for AsmErr {
    fn from(value: ParseErr) -> Self {
        AsmErr::Parse(value)
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsmErr::Lex(e)   => e.fmt(f),
            AsmErr::Parse(e) => e.fmt(f),
        }
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AsmErr::Lex(e)   => Some(e),
            AsmErr::Parse(e) => Some(e),
        }
    }
}
impl crate::err::Error for AsmErr {
    fn span(&self) -> Option<ErrSpan> {
        match self {
            AsmErr::Lex(e)   => e.span(),
            AsmErr::Parse(e) => e.span(),
        }
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            AsmErr::Lex(e)   => e.help(),
            AsmErr::Parse(e) => e.help(),
        }
    }
}

/// Computes the displacement byte of a branch at `instr_addr` which jumps to `target`.
///
/// The displacement is relative to the address following the (2-byte) branch,
/// and must fit in a signed byte.
///
/// ```
/// use mos6502_asm::asm::branch_offset;
///
/// assert_eq!(branch_offset(0x0600, 0x0601), Ok(0xFD));
/// assert_eq!(branch_offset(0x0010, 0x0000), Ok(0x0E));
/// assert!(branch_offset(0x0100, 0x0000).is_err());
/// ```
pub fn branch_offset(target: u16, instr_addr: u16) -> Result<u8, ParseErrKind> {
    let disp = i32::from(target) - (i32::from(instr_addr) + 2);
    i8::try_from(disp)
        .map(|d| d as u8)
        .map_err(|_| ParseErrKind::OffsetOutOfRange(disp))
}

/// How a fixup is resolved.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FixupKind {
    /// The label's address is written as two little-endian bytes.
    Absolute,
    /// The branch displacement to the label is written as one byte.
    ///
    /// The branch instruction sits directly before the patched byte.
    Relative,
}

/// A label reference which was not yet resolvable when it was encoded.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Fixup {
    /// The referenced label (and its token position).
    pub label: Label,
    /// The line the reference occurs on.
    pub line: usize,
    /// The image offset of the placeholder bytes.
    pub patch_offset: u16,
    /// How the placeholder is filled in.
    pub kind: FixupKind,
}

/// The symbol table created during assembly.
///
/// This holds the address of every label defined so far, plus every
/// label reference whose resolution was deferred.
/// Once assembly finishes, the pending fixups are consumed and only the labels remain.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct SymbolTable {
    /// A mapping from label to its address.
    label_map: HashMap<String, u16>,
    /// Label references which still need to be patched.
    fixups: Vec<Fixup>,
}
impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Defines a label at the given address.
    ///
    /// Labels are unique, so redefining a label fails no matter where it was first defined.
    fn define(&mut self, label: &Label, addr: u16, line: usize) -> Result<(), ParseErr> {
        match self.label_map.entry(label.name.clone()) {
            Entry::Occupied(e) => Err(ParseErr::new(ParseErrKind::DuplicateLabel(e.key().clone()), line, label.token)),
            Entry::Vacant(e) => {
                trace!("defined label {} at ${addr:04X}", label.name);
                e.insert(addr);
                Ok(())
            },
        }
    }

    /// Records a reference which is resolved once the whole source has been scanned.
    fn defer(&mut self, fixup: Fixup) {
        trace!("deferred {:?} reference to {} at ${:04X}", fixup.kind, fixup.label.name, fixup.patch_offset);
        self.fixups.push(fixup);
    }

    /// Gets the address of a label (if it is defined).
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.label_map.get(label).copied()
    }

    /// Gets an iterator over the defined labels, ordered by address (then name).
    pub fn label_iter(&self) -> impl Iterator<Item=(&str, u16)> + '_ {
        let mut labels: Vec<_> = self.label_map.iter()
            .map(|(name, &addr)| (name.as_str(), addr))
            .collect();
        labels.sort_by_key(|&(name, addr)| (addr, name));
        labels.into_iter()
    }

    /// The fixups which are still pending.
    pub fn fixups(&self) -> &[Fixup] {
        &self.fixups
    }
}

/// The mutable state of one assembly run.
///
/// The image always covers the program counter
/// (its length is at least the program counter), and only grows.
struct Assembler {
    /// The current program counter.
    pc: u16,
    /// True if the program counter has run past `$FFFF`.
    overflowed: bool,
    /// The memory image, indexed by address.
    image: Vec<u8>,
    sym: SymbolTable,
}
impl Assembler {
    fn new() -> Self {
        Assembler { pc: 0, overflowed: false, image: vec![], sym: SymbolTable::new() }
    }

    /// Moves the program counter, growing (zero-filling) the image to reach it.
    fn set_pc(&mut self, addr: u16) {
        trace!("program counter moved from ${:04X} to ${addr:04X}", self.pc);
        self.pc = addr;
        self.overflowed = false;

        let end = usize::from(addr);
        if self.image.len() < end {
            self.image.resize(end, 0);
        }
    }

    /// Writes a byte at the program counter (overwriting what is there) and advances it.
    fn write_byte(&mut self, byte: u8) -> Result<(), ParseErrKind> {
        if self.overflowed {
            return Err(ParseErrKind::PcOverflow);
        }

        let i = usize::from(self.pc);
        match self.image.get_mut(i) {
            Some(slot) => *slot = byte,
            None => {
                self.image.resize(i, 0);
                self.image.push(byte);
            }
        }

        match self.pc.checked_add(1) {
            Some(pc) => self.pc = pc,
            None => {
                self.pc = 0;
                self.overflowed = true;
            }
        }
        Ok(())
    }
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ParseErrKind> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }
    fn write_word(&mut self, word: u16) -> Result<(), ParseErrKind> {
        self.write_bytes(&word.to_le_bytes())
    }

    /// Writes one statement into the image, defining its label first (if it has one).
    fn write_stmt(&mut self, stmt: &Stmt) -> Result<(), ParseErr> {
        // the statement itself starts after `NAME :`
        let nucleus_token = match stmt.label {
            Some(_) => 3,
            None => 1,
        };

        if let Some(label) = &stmt.label {
            if self.overflowed {
                return Err(ParseErr::new(ParseErrKind::PcOverflow, stmt.lineno, label.token));
            }
            self.sym.define(label, self.pc, stmt.lineno)?;
        }

        match &stmt.nucleus {
            None => Ok(()),
            Some(StmtKind::Directive(Directive::Org(addr))) => {
                self.set_pc(*addr);
                Ok(())
            },
            Some(StmtKind::Directive(d)) => {
                self.write_bytes(&d.bytes())
                    .map_err(|e| ParseErr::new(e, stmt.lineno, nucleus_token))
            },
            Some(StmtKind::Instr(instr)) => self.write_instr(instr.opcode(), instr.operand(), stmt.lineno, nucleus_token),
        }
    }

    fn write_instr(&mut self, opcode: u8, operand: &Operand, line: usize, token: usize) -> Result<(), ParseErr> {
        let instr_addr = self.pc;
        let overflow = |e| ParseErr::new(e, line, token);

        self.write_byte(opcode).map_err(overflow)?;
        match operand {
            Operand::Implied | Operand::Accumulator => Ok(()),
            | Operand::Immediate(b)
            | Operand::ZeroPage(b)
            | Operand::ZeroPageX(b)
            | Operand::ZeroPageY(b)
            | Operand::IndirectX(b)
            | Operand::IndirectY(b)
            | Operand::Relative(Branch::Offset(b))
            => self.write_byte(*b).map_err(overflow),
            | Operand::AbsoluteX(w)
            | Operand::AbsoluteY(w)
            | Operand::Absolute(Target::Addr(w))
            | Operand::Indirect(Target::Addr(w))
            => self.write_word(*w).map_err(overflow),
            | Operand::Absolute(Target::Label(label))
            | Operand::Indirect(Target::Label(label))
            => {
                let word = match self.sym.lookup_label(&label.name) {
                    Some(addr) => addr,
                    None => {
                        self.defer(label, line, FixupKind::Absolute);
                        0
                    }
                };
                self.write_word(word).map_err(overflow)
            },
            Operand::Relative(Branch::Label(label)) => {
                let byte = match self.sym.lookup_label(&label.name) {
                    Some(addr) => branch_offset(addr, instr_addr)
                        .map_err(|e| ParseErr::new(e, line, label.token))?,
                    None => {
                        self.defer(label, line, FixupKind::Relative);
                        0
                    }
                };
                self.write_byte(byte).map_err(overflow)
            },
        }
    }

    /// Defers a reference whose placeholder is about to be written at the program counter.
    fn defer(&mut self, label: &Label, line: usize, kind: FixupKind) {
        self.sym.defer(Fixup { label: label.clone(), line, patch_offset: self.pc, kind });
    }

    /// Resolves every pending fixup, completing the object file.
    fn finish(mut self) -> Result<ObjectFile, ParseErr> {
        let fixups = std::mem::take(&mut self.sym.fixups);
        debug!("resolving {} deferred label references", fixups.len());

        for fixup in fixups {
            let Fixup { label, line, patch_offset, kind } = fixup;
            let addr = self.sym.lookup_label(&label.name)
                .ok_or_else(|| ParseErr::new(ParseErrKind::UnresolvedLabel(label.name.clone()), line, label.token))?;

            let start = usize::from(patch_offset);
            match kind {
                FixupKind::Absolute => {
                    self.image[start..start + 2].copy_from_slice(&addr.to_le_bytes());
                },
                FixupKind::Relative => {
                    let instr_addr = patch_offset.wrapping_sub(1);
                    self.image[start] = branch_offset(addr, instr_addr)
                        .map_err(|e| ParseErr::new(e, line, label.token))?;
                },
            }
            trace!("patched {kind:?} reference to {} (${addr:04X}) at ${patch_offset:04X}", label.name);
        }

        debug!("assembled {} bytes, {} labels", self.image.len(), self.sym.label_map.len());
        Ok(ObjectFile { image: self.image, sym: self.sym })
    }
}

/// An object file.
///
/// This is the final product after assembly source code is fully assembled.
/// It holds the memory image from address `$0000` up to the highest address written
/// (or moved to by `.ORG`), with gaps zero-filled, as well as the label table.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ObjectFile {
    image: Vec<u8>,
    sym: SymbolTable,
}
impl ObjectFile {
    /// The memory image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }
    /// Converts this object file into its memory image.
    pub fn into_bytes(self) -> Vec<u8> {
        self.image
    }
    /// The length of the memory image.
    pub fn len(&self) -> usize {
        self.image.len()
    }
    /// Whether the memory image is empty.
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// The label table of the assembled program.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.sym
    }
    /// Gets the address of a label (if it is defined).
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.sym.lookup_label(label)
    }
    /// Gets an iterator over the defined labels, ordered by address (then name).
    pub fn label_iter(&self) -> impl Iterator<Item=(&str, u16)> + '_ {
        self.sym.label_iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::err::ErrSpan;
    use crate::parse::{ParseErr, ParseErrKind};

    use super::{assemble_src, AsmErr, ObjectFile};

    fn assemble_ok(src: &str) -> ObjectFile {
        match assemble_src(src) {
            Ok(obj) => obj,
            Err(e) => panic!("failed to assemble {src:?}: {e:?}"),
        }
    }
    fn assemble_err(src: &str) -> ParseErr {
        match assemble_src(src) {
            Ok(obj) => panic!("expected {src:?} to fail, got {:02X?}", obj.as_bytes()),
            Err(AsmErr::Parse(e)) => e,
            Err(AsmErr::Lex(e)) => panic!("expected parse error, got lex error {e:?}"),
        }
    }
    fn assert_asm_fail(src: &str, kind: ParseErrKind, line: usize, token: usize) {
        let err = assemble_err(src);
        assert_eq!(err.kind, kind, "{src:?}");
        assert_eq!(err.span, ErrSpan::Token { line, token }, "{src:?}");
    }

    #[test]
    fn test_forward_absolute() {
        let obj = assemble_ok("JMP FWD\nFWD: NOP");
        assert_eq!(obj.as_bytes(), [0x4C, 0x03, 0x00, 0xEA]);

        let obj = assemble_ok("JSR SUB\nBRK\nSUB: RTS");
        assert_eq!(obj.as_bytes(), [0x20, 0x04, 0x00, 0x00, 0x60]);

        let obj = assemble_ok("JMP (VEC)\nVEC: .WORD $1234");
        assert_eq!(obj.as_bytes(), [0x6C, 0x03, 0x00, 0x34, 0x12]);
    }

    #[test]
    fn test_backward_absolute() {
        let obj = assemble_ok(".ORG $0200\nSTART: NOP\nJMP START");
        assert_eq!(&obj.as_bytes()[0x200..], [0xEA, 0x4C, 0x00, 0x02]);
    }

    #[test]
    fn test_backward_relative() {
        let obj = assemble_ok(".ORG $0600\nLOOP:\nDEX\nBNE LOOP");
        assert_eq!(obj.len(), 0x603);
        assert_eq!(&obj.as_bytes()[0x600..], [0xCA, 0xD0, 0xFD]);
        assert!(obj.as_bytes()[..0x600].iter().all(|&b| b == 0));

        // branch to itself
        let obj = assemble_ok("SELF: BEQ SELF");
        assert_eq!(obj.as_bytes(), [0xF0, 0xFE]);
    }

    #[test]
    fn test_forward_relative() {
        let obj = assemble_ok("BEQ SKIP\nNOP\nSKIP: RTS");
        assert_eq!(obj.as_bytes(), [0xF0, 0x01, 0xEA, 0x60]);

        // forward and backward references resolve by the same rule
        let obj = assemble_ok(".ORG $10\nBACK: NOP\nBCC BACK\nBCS FWD\nNOP\nNOP\nFWD: NOP");
        assert_eq!(&obj.as_bytes()[0x10..], [0xEA, 0x90, 0xFD, 0xB0, 0x02, 0xEA, 0xEA, 0xEA]);
    }

    #[test]
    fn test_offset_range() {
        // +127
        let obj = assemble_ok("BNE L\n.ORG $81\nL: NOP");
        assert_eq!(obj.as_bytes()[1], 0x7F);

        // -128
        let obj = assemble_ok(".ORG $100\nL:\n.ORG $17E\nBNE L");
        assert_eq!(obj.as_bytes()[0x17F], 0x80);

        assert_asm_fail("BNE L\n.ORG $82\nL: NOP", ParseErrKind::OffsetOutOfRange(128), 1, 2);
        assert_asm_fail("L: NOP\n.ORG $100\nBNE L", ParseErrKind::OffsetOutOfRange(-258), 3, 2);
    }

    #[test]
    fn test_duplicate_label() {
        assert_asm_fail("A1: NOP\nA1: NOP", ParseErrKind::DuplicateLabel("A1".into()), 2, 1);
        assert_asm_fail("JMP A1\nA1: NOP\nNOP\nA1: BRK", ParseErrKind::DuplicateLabel("A1".into()), 4, 1);
    }

    #[test]
    fn test_unresolved_label() {
        assert_asm_fail("NOP\nJMP NOWHERE\nNOP", ParseErrKind::UnresolvedLabel("NOWHERE".into()), 2, 2);
        assert_asm_fail("LOOP: BNE LOOOP", ParseErrKind::UnresolvedLabel("LOOOP".into()), 1, 4);

        // the whole source is scanned before unresolved labels are reported
        assert_asm_fail("JMP NOWHERE\nA: NOP\nA: NOP", ParseErrKind::DuplicateLabel("A".into()), 3, 1);
    }

    #[test]
    fn test_org() {
        // moving forward grows the image to exactly the new address
        let obj = assemble_ok(".ORG $10");
        assert_eq!(obj.as_bytes(), [0; 16]);

        // moving backward overwrites, but never shrinks
        let obj = assemble_ok(".BYTE 1, 2, 3, 4\n.ORG 1\n.BYTE 9");
        assert_eq!(obj.as_bytes(), [1, 9, 3, 4]);

        let obj = assemble_ok(".ORG $20\n.ORG 0\nNOP");
        assert_eq!(obj.len(), 0x20);
        assert_eq!(obj.as_bytes()[0], 0xEA);
    }

    #[test]
    fn test_data_directives() {
        let obj = assemble_ok(".DB 1,2,300");
        assert_eq!(obj.as_bytes(), [0x01, 0x02, 0x2C, 0x01]);

        let obj = assemble_ok(".WORD $1234, 1\n.WORDS 0");
        assert_eq!(obj.as_bytes(), [0x34, 0x12, 0x01, 0x00, 0x00, 0x00]);

        let obj = assemble_ok("DATA: .BYTES %1, 02, $3\nPTR:");
        assert_eq!(obj.as_bytes(), [1, 2, 3]);
        assert_eq!(obj.lookup_label("PTR"), Some(3));
    }

    #[test]
    fn test_pc_overflow() {
        let obj = assemble_ok(".ORG $FFFF\n.BYTE 1");
        assert_eq!(obj.len(), 0x10000);
        assert_eq!(obj.as_bytes()[0xFFFF], 1);

        assert_asm_fail(".ORG $FFFF\n.BYTE 1, 2", ParseErrKind::PcOverflow, 2, 1);
        assert_asm_fail(".ORG $FFFE\nL: LDA $1234", ParseErrKind::PcOverflow, 2, 3);
        assert_asm_fail(".ORG $FFFF\nNOP\nEND:", ParseErrKind::PcOverflow, 3, 1);

        // moving the program counter clears the overflow
        let obj = assemble_ok(".ORG $FFFF\nNOP\n.ORG 0\nNOP");
        assert_eq!(obj.as_bytes()[0], 0xEA);
        assert_eq!(obj.as_bytes()[0xFFFF], 0xEA);
    }

    #[test]
    fn test_labels() {
        let obj = assemble_ok("
            .ORG $0600
            START: LDX #8
            LOOP: DEX
                BNE LOOP
            END: BRK
        ");
        assert_eq!(obj.lookup_label("START"), Some(0x0600));
        assert_eq!(obj.lookup_label("LOOP"), Some(0x0602));
        assert_eq!(obj.lookup_label("END"), Some(0x0605));
        assert_eq!(obj.lookup_label("MISSING"), None);

        let labels: Vec<_> = obj.label_iter().collect();
        assert_eq!(labels, [("START", 0x0600), ("LOOP", 0x0602), ("END", 0x0605)]);
        assert!(obj.symbol_table().fixups().is_empty());
    }

    #[test]
    fn test_source_normalization() {
        let obj = assemble_ok("  lda #1 ; load one\n; only a comment\n\n  sta $0200");
        assert_eq!(obj.as_bytes(), [0xA9, 0x01, 0x8D, 0x00, 0x02]);
    }

    #[test]
    fn test_lex_errors_first() {
        // every line is tokenized before anything is assembled
        match assemble_src("LDA #$100\nLDA #%12") {
            Err(AsmErr::Lex(e)) => assert_eq!(e.span.line(), 2),
            r => panic!("expected lex error, got {r:?}"),
        }
    }
}
