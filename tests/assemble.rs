use mos6502_asm::asm::encoding::{BinaryFormat, HexFormat, ImageFormat};
use mos6502_asm::asm::{assemble, assemble_src, AsmErr, ObjectFile};
use mos6502_asm::err::{Error, LexErrKind, ParseErrKind};
use mos6502_asm::isa::{self, AddrMode, Mnemonic};
use mos6502_asm::parse::lex::tokenize_lines;
use mos6502_asm::prep::{preprocess, Preprocessor};

fn assemble_ok(src: &str) -> ObjectFile {
    match assemble_src(src) {
        Ok(obj) => obj,
        Err(e) => panic!("failed to assemble {src:?}: {}", e.report()),
    }
}
fn parse_err_kind(src: &str) -> ParseErrKind {
    match assemble_src(src) {
        Err(AsmErr::Parse(e)) => e.kind,
        r => panic!("expected parse error for {src:?}, got {r:?}"),
    }
}

/// A minimal statement in the given mode, and the operand bytes it should encode to.
fn minimal_stmt(m: Mnemonic, mode: AddrMode) -> (String, Vec<u8>) {
    let (operand, bytes): (&str, &[u8]) = match mode {
        AddrMode::Immediate   => ("#$12", &[0x12]),
        AddrMode::ZeroPage    => ("$12", &[0x12]),
        AddrMode::ZeroPageX   => ("$12,X", &[0x12]),
        AddrMode::ZeroPageY   => ("$12,Y", &[0x12]),
        AddrMode::Implied     => ("", &[]),
        AddrMode::Absolute    => ("$1234", &[0x34, 0x12]),
        AddrMode::AbsoluteX   => ("$1234,X", &[0x34, 0x12]),
        AddrMode::AbsoluteY   => ("$1234,Y", &[0x34, 0x12]),
        AddrMode::IndirectX   => ("($12,X)", &[0x12]),
        AddrMode::IndirectY   => ("($12),Y", &[0x12]),
        AddrMode::Accumulator => ("A", &[]),
        AddrMode::Relative    => ("$12", &[0x12]),
        AddrMode::Indirect    => ("($1234)", &[0x34, 0x12]),
    };
    (format!("{m} {operand}"), bytes.to_vec())
}

#[test]
fn every_table_entry_encodes() {
    let mut count = 0;
    for &m in Mnemonic::ALL {
        for mode in AddrMode::ALL {
            let Some(opcode) = isa::opcode(m, mode) else { continue };
            let (src, operand) = minimal_stmt(m, mode);

            let mut expected = vec![opcode];
            expected.extend(operand);

            let obj = assemble_ok(&src);
            assert_eq!(obj.as_bytes(), expected.as_slice(), "{src:?} ({mode})");
            assert_eq!(obj.len(), 1 + usize::from(mode.operand_len()), "{src:?} ({mode})");
            count += 1;
        }
    }
    assert_eq!(count, 151);
}

#[test]
fn undefined_table_entries_fail() {
    for &m in Mnemonic::ALL {
        for mode in AddrMode::ALL {
            if isa::opcode(m, mode).is_some() { continue; }

            // A bare byte is relative on a branch and zero-page elsewhere,
            // so neither can be written for the other kind of mnemonic.
            if matches!(mode, AddrMode::ZeroPage | AddrMode::Relative) { continue; }

            let (src, _) = minimal_stmt(m, mode);
            assert_eq!(
                parse_err_kind(&src),
                ParseErrKind::ModeUndefined { mnemonic: m, mode },
                "{src:?}"
            );
        }
    }
}

#[test]
fn numeric_literals() {
    let obj = assemble_ok(".BYTE $FF, %1010, 010, 10");
    assert_eq!(obj.as_bytes(), [255, 10, 8, 10]);
}

#[test]
fn literals_are_bounded_to_16_bits() {
    // Literals past 65535 are rejected while lexing rather than truncated.
    let obj = assemble_ok(".WORD 65535");
    assert_eq!(obj.as_bytes(), [0xFF, 0xFF]);

    match assemble_src(".WORD 65536") {
        Err(AsmErr::Lex(e)) => assert_eq!(e.kind, LexErrKind::DoesNotFitU16),
        r => panic!("expected lex error, got {r:?}"),
    }
}

#[test]
fn immediate_requires_byte() {
    assert_eq!(parse_err_kind("LDA #$100"), ParseErrKind::ByteExpected(0x100));
    assert_eq!(assemble_ok("LDA #$FF").as_bytes(), [0xA9, 0xFF]);
}

#[test]
fn forward_reference() {
    let obj = assemble_ok("JMP TARGET\nTARGET:\nNOP");
    assert_eq!(obj.as_bytes(), [0x4C, 0x03, 0x00, 0xEA]);
}

#[test]
fn backward_relative_branch() {
    let obj = assemble_ok(".ORG $0600\nLOOP:\nDEX\nBNE LOOP");
    assert_eq!(&obj.as_bytes()[0x600..], [0xCA, 0xD0, 0xFD]);
}

#[test]
fn mixed_width_db() {
    let obj = assemble_ok(".DB 1,2,300");
    assert_eq!(obj.as_bytes(), [0x01, 0x02, 0x2C, 0x01]);
}

#[test]
fn duplicate_labels_rejected() {
    let cases = [
        "DUP: NOP\nDUP: NOP",
        "DUP:\nJMP DUP\nDUP:",
        "JMP DUP\nDUP: NOP\n.ORG $100\nDUP: BRK",
    ];
    for src in cases {
        assert_eq!(parse_err_kind(src), ParseErrKind::DuplicateLabel("DUP".into()), "{src:?}");
    }
}

#[test]
fn unresolved_reported_after_scan() {
    assert_eq!(parse_err_kind("JMP NOWHERE\nNOP"), ParseErrKind::UnresolvedLabel("NOWHERE".into()));

    // a later error on another line wins, because the scan finishes first
    assert_eq!(parse_err_kind("JMP NOWHERE\nNOP\nLDA #$1FF"), ParseErrKind::ByteExpected(0x1FF));
}

#[test]
fn org_never_shrinks() {
    let srcs = [
        ".ORG $10\nNOP\n.ORG 0\nNOP",
        "NOP\nNOP\nNOP\n.ORG 1\n.WORD $BEEF",
        ".ORG $20\n.ORG $10\n.BYTE 1",
    ];
    for src in srcs {
        // the image of every prefix of the source is at most as long as the whole
        let lines: Vec<_> = src.lines().collect();
        let mut last_len = 0;
        for n in 1..=lines.len() {
            let obj = assemble_ok(&lines[..n].join("\n"));
            assert!(obj.len() >= last_len, "{src:?} shrank after line {n}");
            last_len = obj.len();
        }
    }

    let obj = assemble_ok("NOP\nNOP\nNOP\n.ORG 1\n.WORD $BEEF");
    assert_eq!(obj.as_bytes(), [0xEA, 0xEF, 0xBE]);
}

#[test]
fn error_report() {
    let err = assemble_src("NOP\nSTA #1").unwrap_err();
    assert_eq!(
        err.report(),
        "opcode STA is not defined for mode IMMEDIATE (at line 2, token 3)"
    );

    let err = assemble_src("LDA #%2").unwrap_err();
    assert_eq!(
        err.report(),
        "invalid binary literal (at line 1, scan position 5)\nhelp: a binary literal starts with '%' and consists of 0-1"
    );
}

#[test]
fn preprocess_and_assemble() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.asm"), "\
        .org $0600        ; entry point
        .include \"vectors.asm\"
        start: jsr init
               brk
    ").unwrap();
    std::fs::write(dir.path().join("vectors.asm"), "init: rts").unwrap();

    let lines = preprocess(dir.path().join("main.asm")).unwrap();
    let obj = assemble(&tokenize_lines(&lines).unwrap()).unwrap();
    assert_eq!(&obj.as_bytes()[0x600..], [0x60, 0x20, 0x00, 0x06, 0x00]);
    assert_eq!(obj.lookup_label("INIT"), Some(0x0600));
    assert_eq!(obj.lookup_label("START"), Some(0x0601));

    // same thing from memory
    let lines = Preprocessor::new()
        .preprocess_str(".include vectors.asm\nnop", dir.path())
        .unwrap();
    let obj = assemble(&tokenize_lines(&lines).unwrap()).unwrap();
    assert_eq!(obj.as_bytes(), [0x60, 0xEA]);
}

#[test]
fn output_formats() {
    let obj = assemble_ok(".ORG 2\nLDA #1\nSTA $0200");
    assert_eq!(BinaryFormat::serialize(obj.as_bytes()), [0, 0, 0xA9, 0x01, 0x8D, 0x00, 0x02]);
    assert_eq!(HexFormat::serialize(obj.as_bytes()), "00 00 A9 01 8D 00 02");
}
