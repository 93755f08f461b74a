//! A MOS 6502 cross-assembler.
//!
//! This converts 6502 assembly source into a raw memory image:
//! a byte sequence starting at address `$0000`, which can be loaded into an emulator
//! or burned into a ROM.
//!
//! # Usage
//!
//! Source text goes through three stages:
//! 1. preprocessing ([`prep`]): comments are removed, `.INCLUDE`s are expanded, lines are upper-cased
//! 2. lexing ([`parse::lex`]): each line becomes a sequence of tokens
//! 3. parsing and assembling ([`parse`], [`asm`]): each line is encoded in order,
//!    then forward label references are patched
//!
//! ```
//! use std::path::Path;
//!
//! use mos6502_asm::asm::assemble;
//! use mos6502_asm::parse::lex::tokenize_lines;
//! use mos6502_asm::prep::Preprocessor;
//!
//! let src = "
//!     .ORG $0600
//!     START:  LDX #$03   ; count
//!     LOOP:   DEX
//!             BNE LOOP
//!             JMP START
//! ";
//! let lines = Preprocessor::new().preprocess_str(src, Path::new(".")).unwrap();
//! let tokens = tokenize_lines(&lines).unwrap();
//! let obj = assemble(&tokens).unwrap();
//!
//! assert_eq!(&obj.as_bytes()[0x600..], [0xA2, 0x03, 0xCA, 0xD0, 0xFD, 0x4C, 0x00, 0x06]);
//! ```
//!
//! For in-memory source without includes, [`asm::assemble_src`] runs all three stages at once.
#![warn(missing_docs)]

pub mod err;
pub mod isa;
pub mod parse;
pub mod ast;
pub mod asm;
pub mod prep;
