//! Opcode descriptor tables.
//!
//! The decoder and the disassembler both walk these tables. An entry either
//! describes an instruction (mnemonic format, handler, operand type, base
//! cycle count and total size in bytes) or redirects decoding to another
//! table, as the CB, DD, ED and FD prefixes do.
//!
//! Format placeholders: `$*` 8-bit operand, `$^` 16-bit operand, `%` signed
//! index displacement, `$+` relative branch target.
use super::*;
use crate::ops::*;
use crate::z80::{Z80, HL, IX, IY};
use std::borrow::Cow;
use std::fmt;

/// Instruction handler: gets the opcode and its operand (8-bit operands in
/// the low byte), returns the cycles spent on top of the base count.
pub type ExecFn = fn(&mut Z80, u8, u16) -> usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Base,
    Bit,
    Ix,
    Iy,
    Misc,
    IxBit,
    IyBit,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Base => "base",
            Table::Bit => "bit",
            Table::Ix => "ix",
            Table::Iy => "iy",
            Table::Misc => "misc",
            Table::IxBit => "ixbit",
            Table::IyBit => "iybit",
        }
    }

    /// The prefix redirects allowed out of this table.
    pub fn redirects_to(&self, next: Table) -> bool {
        matches!(
            (self, next),
            (Table::Base, Table::Bit | Table::Ix | Table::Iy | Table::Misc)
                | (Table::Ix, Table::IxBit)
                | (Table::Iy, Table::IyBit)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    None,
    /// one operand byte
    A8,
    /// two operand bytes, little endian
    A16,
    /// signed branch offset
    Rel,
    /// continue decoding in another table
    Prefix(Table),
}

#[derive(Clone)]
pub struct Instruction {
    pub format: Cow<'static, str>,
    pub exec: Option<ExecFn>,
    pub kind: ArgType,
    /// base cost, prefixes included; conditional instructions list the
    /// not-taken cost
    pub cycles: u8,
    /// total size in bytes, prefixes included
    pub size: u8,
}

// the derived Debug would print the handler address, which says nothing
impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("format", &self.format)
            .field("kind", &self.kind)
            .field("cycles", &self.cycles)
            .field("size", &self.size)
            .finish()
    }
}

const fn op(format: &'static str, exec: ExecFn, kind: ArgType, cycles: u8, size: u8) -> Instruction {
    Instruction {
        format: Cow::Borrowed(format),
        exec: Some(exec),
        kind,
        cycles,
        size,
    }
}
const fn n(format: &'static str, exec: ExecFn, cycles: u8) -> Instruction { op(format, exec, ArgType::None, cycles, 1) }
const fn b(format: &'static str, exec: ExecFn, cycles: u8) -> Instruction { op(format, exec, ArgType::A8, cycles, 2) }
const fn w(format: &'static str, exec: ExecFn, cycles: u8) -> Instruction { op(format, exec, ArgType::A16, cycles, 3) }
const fn rel(format: &'static str, exec: ExecFn, cycles: u8) -> Instruction { op(format, exec, ArgType::Rel, cycles, 2) }
const fn pfx(table: Table) -> Instruction {
    Instruction {
        format: Cow::Borrowed(""),
        exec: None,
        kind: ArgType::Prefix(table),
        cycles: 0,
        size: 1,
    }
}

fn owned(format: String, exec: ExecFn, kind: ArgType, cycles: u8, size: u8) -> Instruction {
    Instruction {
        format: Cow::Owned(format),
        exec: Some(exec),
        kind,
        cycles,
        size,
    }
}

#[rustfmt::skip]
static BASE: [Instruction; 256] = [
    n("NOP",               __nop,                    4),     // 00
    w("LD BC, $^",         __ld_rr_nn::<HL>,        10),     // 01
    n("LD (BC), A",        __ld_rp_a,                7),     // 02
    n("INC BC",            __inc_rr::<HL>,           6),     // 03
    n("INC B",             __inc_r::<HL>,            4),     // 04
    n("DEC B",             __dec_r::<HL>,            4),     // 05
    b("LD B, $*",          __ld_r_n::<HL>,           7),     // 06
    n("RLCA",              __rlca,                   4),     // 07
    n("EX AF, AF'",        __ex_af,                  4),     // 08
    n("ADD HL, BC",        __add_idx_rr::<HL>,      11),     // 09
    n("LD A, (BC)",        __ld_a_rp,                7),     // 0A
    n("DEC BC",            __dec_rr::<HL>,           6),     // 0B
    n("INC C",             __inc_r::<HL>,            4),     // 0C
    n("DEC C",             __dec_r::<HL>,            4),     // 0D
    b("LD C, $*",          __ld_r_n::<HL>,           7),     // 0E
    n("RRCA",              __rrca,                   4),     // 0F

    rel("DJNZ $+",         __djnz,                   8),     // 10
    w("LD DE, $^",         __ld_rr_nn::<HL>,        10),     // 11
    n("LD (DE), A",        __ld_rp_a,                7),     // 12
    n("INC DE",            __inc_rr::<HL>,           6),     // 13
    n("INC D",             __inc_r::<HL>,            4),     // 14
    n("DEC D",             __dec_r::<HL>,            4),     // 15
    b("LD D, $*",          __ld_r_n::<HL>,           7),     // 16
    n("RLA",               __rla,                    4),     // 17
    rel("JR $+",           __jr,                    12),     // 18
    n("ADD HL, DE",        __add_idx_rr::<HL>,      11),     // 19
    n("LD A, (DE)",        __ld_a_rp,                7),     // 1A
    n("DEC DE",            __dec_rr::<HL>,           6),     // 1B
    n("INC E",             __inc_r::<HL>,            4),     // 1C
    n("DEC E",             __dec_r::<HL>,            4),     // 1D
    b("LD E, $*",          __ld_r_n::<HL>,           7),     // 1E
    n("RRA",               __rra,                    4),     // 1F

    rel("JR NZ, $+",       __jr_cc,                  7),     // 20
    w("LD HL, $^",         __ld_rr_nn::<HL>,        10),     // 21
    w("LD ($^), HL",       __ld_nn_idx::<HL>,       16),     // 22
    n("INC HL",            __inc_rr::<HL>,           6),     // 23
    n("INC H",             __inc_r::<HL>,            4),     // 24
    n("DEC H",             __dec_r::<HL>,            4),     // 25
    b("LD H, $*",          __ld_r_n::<HL>,           7),     // 26
    n("DAA",               __daa,                    4),     // 27
    rel("JR Z, $+",        __jr_cc,                  7),     // 28
    n("ADD HL, HL",        __add_idx_rr::<HL>,      11),     // 29
    w("LD HL, ($^)",       __ld_idx_nn::<HL>,       16),     // 2A
    n("DEC HL",            __dec_rr::<HL>,           6),     // 2B
    n("INC L",             __inc_r::<HL>,            4),     // 2C
    n("DEC L",             __dec_r::<HL>,            4),     // 2D
    b("LD L, $*",          __ld_r_n::<HL>,           7),     // 2E
    n("CPL",               __cpl,                    4),     // 2F

    rel("JR NC, $+",       __jr_cc,                  7),     // 30
    w("LD SP, $^",         __ld_rr_nn::<HL>,        10),     // 31
    w("LD ($^), A",        __ld_nn_a,               13),     // 32
    n("INC SP",            __inc_rr::<HL>,           6),     // 33
    n("INC (HL)",          __inc_m::<HL>,           11),     // 34
    n("DEC (HL)",          __dec_m::<HL>,           11),     // 35
    b("LD (HL), $*",       __ld_m_n::<HL>,          10),     // 36
    n("SCF",               __scf,                    4),     // 37
    rel("JR C, $+",        __jr_cc,                  7),     // 38
    n("ADD HL, SP",        __add_idx_rr::<HL>,      11),     // 39
    w("LD A, ($^)",        __ld_a_nn,               13),     // 3A
    n("DEC SP",            __dec_rr::<HL>,           6),     // 3B
    n("INC A",             __inc_r::<HL>,            4),     // 3C
    n("DEC A",             __dec_r::<HL>,            4),     // 3D
    b("LD A, $*",          __ld_r_n::<HL>,           7),     // 3E
    n("CCF",               __ccf,                    4),     // 3F

    n("LD B, B",           __ld_r_r::<HL>,           4),     // 40
    n("LD B, C",           __ld_r_r::<HL>,           4),     // 41
    n("LD B, D",           __ld_r_r::<HL>,           4),     // 42
    n("LD B, E",           __ld_r_r::<HL>,           4),     // 43
    n("LD B, H",           __ld_r_r::<HL>,           4),     // 44
    n("LD B, L",           __ld_r_r::<HL>,           4),     // 45
    n("LD B, (HL)",        __ld_r_m::<HL>,           7),     // 46
    n("LD B, A",           __ld_r_r::<HL>,           4),     // 47
    n("LD C, B",           __ld_r_r::<HL>,           4),     // 48
    n("LD C, C",           __ld_r_r::<HL>,           4),     // 49
    n("LD C, D",           __ld_r_r::<HL>,           4),     // 4A
    n("LD C, E",           __ld_r_r::<HL>,           4),     // 4B
    n("LD C, H",           __ld_r_r::<HL>,           4),     // 4C
    n("LD C, L",           __ld_r_r::<HL>,           4),     // 4D
    n("LD C, (HL)",        __ld_r_m::<HL>,           7),     // 4E
    n("LD C, A",           __ld_r_r::<HL>,           4),     // 4F

    n("LD D, B",           __ld_r_r::<HL>,           4),     // 50
    n("LD D, C",           __ld_r_r::<HL>,           4),     // 51
    n("LD D, D",           __ld_r_r::<HL>,           4),     // 52
    n("LD D, E",           __ld_r_r::<HL>,           4),     // 53
    n("LD D, H",           __ld_r_r::<HL>,           4),     // 54
    n("LD D, L",           __ld_r_r::<HL>,           4),     // 55
    n("LD D, (HL)",        __ld_r_m::<HL>,           7),     // 56
    n("LD D, A",           __ld_r_r::<HL>,           4),     // 57
    n("LD E, B",           __ld_r_r::<HL>,           4),     // 58
    n("LD E, C",           __ld_r_r::<HL>,           4),     // 59
    n("LD E, D",           __ld_r_r::<HL>,           4),     // 5A
    n("LD E, E",           __ld_r_r::<HL>,           4),     // 5B
    n("LD E, H",           __ld_r_r::<HL>,           4),     // 5C
    n("LD E, L",           __ld_r_r::<HL>,           4),     // 5D
    n("LD E, (HL)",        __ld_r_m::<HL>,           7),     // 5E
    n("LD E, A",           __ld_r_r::<HL>,           4),     // 5F

    n("LD H, B",           __ld_r_r::<HL>,           4),     // 60
    n("LD H, C",           __ld_r_r::<HL>,           4),     // 61
    n("LD H, D",           __ld_r_r::<HL>,           4),     // 62
    n("LD H, E",           __ld_r_r::<HL>,           4),     // 63
    n("LD H, H",           __ld_r_r::<HL>,           4),     // 64
    n("LD H, L",           __ld_r_r::<HL>,           4),     // 65
    n("LD H, (HL)",        __ld_r_m::<HL>,           7),     // 66
    n("LD H, A",           __ld_r_r::<HL>,           4),     // 67
    n("LD L, B",           __ld_r_r::<HL>,           4),     // 68
    n("LD L, C",           __ld_r_r::<HL>,           4),     // 69
    n("LD L, D",           __ld_r_r::<HL>,           4),     // 6A
    n("LD L, E",           __ld_r_r::<HL>,           4),     // 6B
    n("LD L, H",           __ld_r_r::<HL>,           4),     // 6C
    n("LD L, L",           __ld_r_r::<HL>,           4),     // 6D
    n("LD L, (HL)",        __ld_r_m::<HL>,           7),     // 6E
    n("LD L, A",           __ld_r_r::<HL>,           4),     // 6F

    n("LD (HL), B",        __ld_m_r::<HL>,           7),     // 70
    n("LD (HL), C",        __ld_m_r::<HL>,           7),     // 71
    n("LD (HL), D",        __ld_m_r::<HL>,           7),     // 72
    n("LD (HL), E",        __ld_m_r::<HL>,           7),     // 73
    n("LD (HL), H",        __ld_m_r::<HL>,           7),     // 74
    n("LD (HL), L",        __ld_m_r::<HL>,           7),     // 75
    n("HALT",              __halt,                   4),     // 76
    n("LD (HL), A",        __ld_m_r::<HL>,           7),     // 77
    n("LD A, B",           __ld_r_r::<HL>,           4),     // 78
    n("LD A, C",           __ld_r_r::<HL>,           4),     // 79
    n("LD A, D",           __ld_r_r::<HL>,           4),     // 7A
    n("LD A, E",           __ld_r_r::<HL>,           4),     // 7B
    n("LD A, H",           __ld_r_r::<HL>,           4),     // 7C
    n("LD A, L",           __ld_r_r::<HL>,           4),     // 7D
    n("LD A, (HL)",        __ld_r_m::<HL>,           7),     // 7E
    n("LD A, A",           __ld_r_r::<HL>,           4),     // 7F

    n("ADD A, B",          __alu_r::<HL>,            4),     // 80
    n("ADD A, C",          __alu_r::<HL>,            4),     // 81
    n("ADD A, D",          __alu_r::<HL>,            4),     // 82
    n("ADD A, E",          __alu_r::<HL>,            4),     // 83
    n("ADD A, H",          __alu_r::<HL>,            4),     // 84
    n("ADD A, L",          __alu_r::<HL>,            4),     // 85
    n("ADD A, (HL)",       __alu_m::<HL>,            7),     // 86
    n("ADD A, A",          __alu_r::<HL>,            4),     // 87
    n("ADC A, B",          __alu_r::<HL>,            4),     // 88
    n("ADC A, C",          __alu_r::<HL>,            4),     // 89
    n("ADC A, D",          __alu_r::<HL>,            4),     // 8A
    n("ADC A, E",          __alu_r::<HL>,            4),     // 8B
    n("ADC A, H",          __alu_r::<HL>,            4),     // 8C
    n("ADC A, L",          __alu_r::<HL>,            4),     // 8D
    n("ADC A, (HL)",       __alu_m::<HL>,            7),     // 8E
    n("ADC A, A",          __alu_r::<HL>,            4),     // 8F

    n("SUB B",             __alu_r::<HL>,            4),     // 90
    n("SUB C",             __alu_r::<HL>,            4),     // 91
    n("SUB D",             __alu_r::<HL>,            4),     // 92
    n("SUB E",             __alu_r::<HL>,            4),     // 93
    n("SUB H",             __alu_r::<HL>,            4),     // 94
    n("SUB L",             __alu_r::<HL>,            4),     // 95
    n("SUB (HL)",          __alu_m::<HL>,            7),     // 96
    n("SUB A",             __alu_r::<HL>,            4),     // 97
    n("SBC A, B",          __alu_r::<HL>,            4),     // 98
    n("SBC A, C",          __alu_r::<HL>,            4),     // 99
    n("SBC A, D",          __alu_r::<HL>,            4),     // 9A
    n("SBC A, E",          __alu_r::<HL>,            4),     // 9B
    n("SBC A, H",          __alu_r::<HL>,            4),     // 9C
    n("SBC A, L",          __alu_r::<HL>,            4),     // 9D
    n("SBC A, (HL)",       __alu_m::<HL>,            7),     // 9E
    n("SBC A, A",          __alu_r::<HL>,            4),     // 9F

    n("AND B",             __alu_r::<HL>,            4),     // A0
    n("AND C",             __alu_r::<HL>,            4),     // A1
    n("AND D",             __alu_r::<HL>,            4),     // A2
    n("AND E",             __alu_r::<HL>,            4),     // A3
    n("AND H",             __alu_r::<HL>,            4),     // A4
    n("AND L",             __alu_r::<HL>,            4),     // A5
    n("AND (HL)",          __alu_m::<HL>,            7),     // A6
    n("AND A",             __alu_r::<HL>,            4),     // A7
    n("XOR B",             __alu_r::<HL>,            4),     // A8
    n("XOR C",             __alu_r::<HL>,            4),     // A9
    n("XOR D",             __alu_r::<HL>,            4),     // AA
    n("XOR E",             __alu_r::<HL>,            4),     // AB
    n("XOR H",             __alu_r::<HL>,            4),     // AC
    n("XOR L",             __alu_r::<HL>,            4),     // AD
    n("XOR (HL)",          __alu_m::<HL>,            7),     // AE
    n("XOR A",             __alu_r::<HL>,            4),     // AF

    n("OR B",              __alu_r::<HL>,            4),     // B0
    n("OR C",              __alu_r::<HL>,            4),     // B1
    n("OR D",              __alu_r::<HL>,            4),     // B2
    n("OR E",              __alu_r::<HL>,            4),     // B3
    n("OR H",              __alu_r::<HL>,            4),     // B4
    n("OR L",              __alu_r::<HL>,            4),     // B5
    n("OR (HL)",           __alu_m::<HL>,            7),     // B6
    n("OR A",              __alu_r::<HL>,            4),     // B7
    n("CP B",              __alu_r::<HL>,            4),     // B8
    n("CP C",              __alu_r::<HL>,            4),     // B9
    n("CP D",              __alu_r::<HL>,            4),     // BA
    n("CP E",              __alu_r::<HL>,            4),     // BB
    n("CP H",              __alu_r::<HL>,            4),     // BC
    n("CP L",              __alu_r::<HL>,            4),     // BD
    n("CP (HL)",           __alu_m::<HL>,            7),     // BE
    n("CP A",              __alu_r::<HL>,            4),     // BF

    n("RET NZ",            __ret_cc,                 5),     // C0
    n("POP BC",            __pop::<HL>,             10),     // C1
    w("JP NZ, $^",         __jp_cc,                 10),     // C2
    w("JP $^",             __jp,                    10),     // C3
    w("CALL NZ, $^",       __call_cc,               10),     // C4
    n("PUSH BC",           __push::<HL>,            11),     // C5
    b("ADD A, $*",         __alu_n,                  7),     // C6
    n("RST $00",           __rst,                   11),     // C7
    n("RET Z",             __ret_cc,                 5),     // C8
    n("RET",               __ret,                   10),     // C9
    w("JP Z, $^",          __jp_cc,                 10),     // CA
    pfx(Table::Bit),                                         // CB
    w("CALL Z, $^",        __call_cc,               10),     // CC
    w("CALL $^",           __call,                  17),     // CD
    b("ADC A, $*",         __alu_n,                  7),     // CE
    n("RST $08",           __rst,                   11),     // CF

    n("RET NC",            __ret_cc,                 5),     // D0
    n("POP DE",            __pop::<HL>,             10),     // D1
    w("JP NC, $^",         __jp_cc,                 10),     // D2
    b("OUT ($*), A",       __out_n_a,               11),     // D3
    w("CALL NC, $^",       __call_cc,               10),     // D4
    n("PUSH DE",           __push::<HL>,            11),     // D5
    b("SUB $*",            __alu_n,                  7),     // D6
    n("RST $10",           __rst,                   11),     // D7
    n("RET C",             __ret_cc,                 5),     // D8
    n("EXX",               __exx,                    4),     // D9
    w("JP C, $^",          __jp_cc,                 10),     // DA
    b("IN A, ($*)",        __in_a_n,                11),     // DB
    w("CALL C, $^",        __call_cc,               10),     // DC
    pfx(Table::Ix),                                          // DD
    b("SBC A, $*",         __alu_n,                  7),     // DE
    n("RST $18",           __rst,                   11),     // DF

    n("RET PO",            __ret_cc,                 5),     // E0
    n("POP HL",            __pop::<HL>,             10),     // E1
    w("JP PO, $^",         __jp_cc,                 10),     // E2
    n("EX (SP), HL",       __ex_msp_idx::<HL>,      19),     // E3
    w("CALL PO, $^",       __call_cc,               10),     // E4
    n("PUSH HL",           __push::<HL>,            11),     // E5
    b("AND $*",            __alu_n,                  7),     // E6
    n("RST $20",           __rst,                   11),     // E7
    n("RET PE",            __ret_cc,                 5),     // E8
    n("JP (HL)",           __jp_idx::<HL>,           4),     // E9
    w("JP PE, $^",         __jp_cc,                 10),     // EA
    n("EX DE, HL",         __ex_de_hl,               4),     // EB
    w("CALL PE, $^",       __call_cc,               10),     // EC
    pfx(Table::Misc),                                        // ED
    b("XOR $*",            __alu_n,                  7),     // EE
    n("RST $28",           __rst,                   11),     // EF

    n("RET P",             __ret_cc,                 5),     // F0
    n("POP AF",            __pop::<HL>,             10),     // F1
    w("JP P, $^",          __jp_cc,                 10),     // F2
    n("DI",                __di,                     4),     // F3
    w("CALL P, $^",        __call_cc,               10),     // F4
    n("PUSH AF",           __push::<HL>,            11),     // F5
    b("OR $*",             __alu_n,                  7),     // F6
    n("RST $30",           __rst,                   11),     // F7
    n("RET M",             __ret_cc,                 5),     // F8
    n("LD SP, HL",         __ld_sp_idx::<HL>,        6),     // F9
    w("JP M, $^",          __jp_cc,                 10),     // FA
    n("EI",                __ei,                     4),     // FB
    w("CALL M, $^",        __call_cc,               10),     // FC
    pfx(Table::Iy),                                          // FD
    b("CP $*",             __alu_n,                  7),     // FE
    n("RST $38",           __rst,                   11),     // FF
];

const REG8: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const REG16: [&str; 4] = ["BC", "DE", "HL", "SP"];
const SHIFTS: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
const ALU: [&str; 8] = ["ADD A, ", "ADC A, ", "SUB ", "SBC A, ", "AND ", "XOR ", "OR ", "CP "];

// CB xx
fn build_bit() -> Vec<Instruction> {
    (0..=255u8)
        .map(|op| {
            let r = REG8[(op & 7) as usize];
            let n = (op >> 3) & 7;
            let mem = op & 7 == 6;
            let (format, exec, cycles): (String, ExecFn, u8) = match op >> 6 {
                0 => (format!("{} {}", SHIFTS[n as usize], r), __cb_shift as ExecFn, if mem { 15 } else { 8 }),
                1 => (format!("BIT {}, {}", n, r), __cb_bit as ExecFn, if mem { 12 } else { 8 }),
                2 => (format!("RES {}, {}", n, r), __cb_res as ExecFn, if mem { 15 } else { 8 }),
                _ => (format!("SET {}, {}", n, r), __cb_set as ExecFn, if mem { 15 } else { 8 }),
            };
            owned(format, exec, ArgType::None, cycles, 2)
        })
        .collect()
}

// ED xx
fn build_misc() -> Vec<Instruction> {
    let ed = |format: &str, exec: ExecFn, cycles: u8| owned(format.to_string(), exec, ArgType::None, cycles, 2);
    let mut t = vec![ed("NOP*", __nop, 8); 256];
    for y in 0..8usize {
        let r = REG8[y];
        let base = 0x40 | y << 3;
        t[base] = if y == 6 { ed("IN (C)", __in_r_c, 12) } else { ed(&format!("IN {}, (C)", r), __in_r_c, 12) };
        t[base | 1] = if y == 6 { ed("OUT (C), 0", __out_c_r, 12) } else { ed(&format!("OUT (C), {}", r), __out_c_r, 12) };
        t[base | 4] = ed("NEG", __neg, 8);
        t[base | 5] = if y == 1 { ed("RETI", __retn, 14) } else { ed("RETN", __retn, 14) };
        t[base | 6] = ed(&format!("IM {}", [0, 0, 1, 2][y & 3]), __im, 8);
    }
    for (p, rr) in REG16.iter().enumerate() {
        let base = 0x40 | p << 4;
        t[base | 0x02] = ed(&format!("SBC HL, {}", rr), __sbc_hl_rr, 15);
        t[base | 0x0A] = ed(&format!("ADC HL, {}", rr), __adc_hl_rr, 15);
        t[base | 0x03] = owned(format!("LD ($^), {}", rr), __ld_nn_rr, ArgType::A16, 20, 4);
        t[base | 0x0B] = owned(format!("LD {}, ($^)", rr), __ld_rr_mnn, ArgType::A16, 20, 4);
    }
    t[0x47] = ed("LD I, A", __ld_i_a, 9);
    t[0x4F] = ed("LD R, A", __ld_r_a, 9);
    t[0x57] = ed("LD A, I", __ld_a_i, 9);
    t[0x5F] = ed("LD A, R", __ld_a_r, 9);
    t[0x67] = ed("RRD", __rrd, 18);
    t[0x6F] = ed("RLD", __rld, 18);
    #[rustfmt::skip]
    let block: [(usize, &str, ExecFn); 16] = [
        (0xA0, "LDI", __ldi_ldd),   (0xA1, "CPI", __cpi_cpd),   (0xA2, "INI", __ini_ind),   (0xA3, "OUTI", __outi_outd),
        (0xA8, "LDD", __ldi_ldd),   (0xA9, "CPD", __cpi_cpd),   (0xAA, "IND", __ini_ind),   (0xAB, "OUTD", __outi_outd),
        (0xB0, "LDIR", __ldi_ldd),  (0xB1, "CPIR", __cpi_cpd),  (0xB2, "INIR", __ini_ind),  (0xB3, "OTIR", __outi_outd),
        (0xB8, "LDDR", __ldi_ldd),  (0xB9, "CPDR", __cpi_cpd),  (0xBA, "INDR", __ini_ind),  (0xBB, "OTDR", __outi_outd),
    ];
    for (op, format, exec) in block {
        t[op] = ed(format, exec, 16);
    }
    t
}

// DD xx / FD xx: the base table with HL replaced by the index register,
// every entry one byte longer and four cycles slower.
fn build_index<const I: u8>() -> Vec<Instruction> {
    let ix = if I == IX { "IX" } else { "IY" };
    let (ixh, ixl) = if I == IX { ("IXH", "IXL") } else { ("IYH", "IYL") };
    let mem = format!("({}%)", ix);
    let reg = |code: u8| match code & 7 {
        4 => ixh,
        5 => ixl,
        c => REG8[c as usize],
    };
    let mut t: Vec<Instruction> = BASE
        .iter()
        .map(|ins| Instruction {
            cycles: ins.cycles + 4,
            size: ins.size + 1,
            ..ins.clone()
        })
        .collect();
    let mut set = |op: u8, format: String, exec: ExecFn, kind: ArgType, cycles: u8| {
        let size = match kind {
            ArgType::None => 2,
            ArgType::A16 => 4,
            _ => 3,
        };
        t[op as usize] = owned(format, exec, kind, cycles, size);
    };
    for (p, rr) in REG16.iter().enumerate() {
        let rr = if p == 2 { ix } else { rr };
        set((p << 4 | 0x09) as u8, format!("ADD {}, {}", ix, rr), __add_idx_rr::<I>, ArgType::None, 15);
    }
    set(0x21, format!("LD {}, $^", ix), __ld_rr_nn::<I>, ArgType::A16, 14);
    set(0x22, format!("LD ($^), {}", ix), __ld_nn_idx::<I>, ArgType::A16, 20);
    set(0x2A, format!("LD {}, ($^)", ix), __ld_idx_nn::<I>, ArgType::A16, 20);
    set(0x23, format!("INC {}", ix), __inc_rr::<I>, ArgType::None, 10);
    set(0x2B, format!("DEC {}", ix), __dec_rr::<I>, ArgType::None, 10);
    for (op, r) in [(0x24u8, ixh), (0x2C, ixl)] {
        set(op, format!("INC {}", r), __inc_r::<I>, ArgType::None, 8);
        set(op + 1, format!("DEC {}", r), __dec_r::<I>, ArgType::None, 8);
        set(op + 2, format!("LD {}, $*", r), __ld_r_n::<I>, ArgType::A8, 11);
    }
    set(0x34, format!("INC {}", mem), __inc_m::<I>, ArgType::A8, 23);
    set(0x35, format!("DEC {}", mem), __dec_m::<I>, ArgType::A8, 23);
    set(0x36, format!("LD {}, $*", mem), __ld_m_n::<I>, ArgType::A16, 19);
    for op in 0x40..0x80u8 {
        let (d, s) = ((op >> 3) & 7, op & 7);
        if op == 0x76 {
            continue;
        } else if s == 6 {
            set(op, format!("LD {}, {}", REG8[d as usize], mem), __ld_r_m::<I>, ArgType::A8, 19);
        } else if d == 6 {
            set(op, format!("LD {}, {}", mem, REG8[s as usize]), __ld_m_r::<I>, ArgType::A8, 19);
        } else if matches!(d, 4 | 5) || matches!(s, 4 | 5) {
            set(op, format!("LD {}, {}", reg(d), reg(s)), __ld_r_r::<I>, ArgType::None, 8);
        }
    }
    for op in 0x80..0xC0u8 {
        let (a, s) = (((op >> 3) & 7) as usize, op & 7);
        if s == 6 {
            set(op, format!("{}{}", ALU[a], mem), __alu_m::<I>, ArgType::A8, 19);
        } else if matches!(s, 4 | 5) {
            set(op, format!("{}{}", ALU[a], reg(s)), __alu_r::<I>, ArgType::None, 8);
        }
    }
    set(0xE1, format!("POP {}", ix), __pop::<I>, ArgType::None, 14);
    set(0xE3, format!("EX (SP), {}", ix), __ex_msp_idx::<I>, ArgType::None, 23);
    set(0xE5, format!("PUSH {}", ix), __push::<I>, ArgType::None, 15);
    set(0xE9, format!("JP ({})", ix), __jp_idx::<I>, ArgType::None, 8);
    set(0xF9, format!("LD SP, {}", ix), __ld_sp_idx::<I>, ArgType::None, 10);
    // a second prefix cancels this one
    for op in [0xDDu8, 0xED, 0xFD] {
        t[op as usize] = owned("NOP*".to_string(), __prefix_skip, ArgType::None, 4, 1);
    }
    t[0xCB] = pfx(if I == IX { Table::IxBit } else { Table::IyBit });
    t
}

// DD CB d xx / FD CB d xx
fn build_index_bit<const I: u8>() -> Vec<Instruction> {
    let mem = if I == IX { "(IX%)" } else { "(IY%)" };
    (0..=255u8)
        .map(|op| {
            let n = (op >> 3) & 7;
            let mut format = match op >> 6 {
                0 => format!("{} {}", SHIFTS[n as usize], mem),
                1 => format!("BIT {}, {}", n, mem),
                2 => format!("RES {}, {}", n, mem),
                _ => format!("SET {}, {}", n, mem),
            };
            if op >> 6 != 1 && op & 7 != 6 {
                format.push_str(", ");
                format.push_str(REG8[(op & 7) as usize]);
            }
            let cycles = if op >> 6 == 1 { 20 } else { 23 };
            owned(format, __idx_bit::<I>, ArgType::A8, cycles, 4)
        })
        .collect()
}

lazy_static! {
    static ref TABLES: [Vec<Instruction>; 7] = [
        BASE.to_vec(),
        build_bit(),
        build_index::<IX>(),
        build_index::<IY>(),
        build_misc(),
        build_index_bit::<IX>(),
        build_index_bit::<IY>(),
    ];
}

pub fn table(t: Table) -> &'static [Instruction] { &TABLES[t as usize] }
