/// Z80 register file: primary and shadow banks, index registers, I/R and
/// the internal memptr.
use super::*;
use std::fmt;

/// Flag register bits
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    C = 0,
    N = 1,
    V = 2,
    X = 3,
    H = 4,
    Y = 5,
    Z = 6,
    S = 7,
}

pub const C: u8 = 0x01;
pub const N: u8 = 0x02;
pub const V: u8 = 0x04;
pub const X: u8 = 0x08;
pub const H: u8 = 0x10;
pub const Y: u8 = 0x20;
pub const Z: u8 = 0x40;
pub const S: u8 = 0x80;

/// Metadata about a flag bit.
pub struct FlagInfo {
    pub flag: Flag,
    pub mask: u8,
    pub short: char,
    pub name: &'static str,
}

#[rustfmt::skip]
static FLAG_TABLE: [FlagInfo; 8] = [
    FlagInfo {flag: Flag::C, mask: C, short: 'C', name: "carry"},
    FlagInfo {flag: Flag::N, mask: N, short: 'N', name: "subtract"},
    FlagInfo {flag: Flag::V, mask: V, short: 'V', name: "parity/overflow"},
    FlagInfo {flag: Flag::X, mask: X, short: 'X', name: "bit 3"},
    FlagInfo {flag: Flag::H, mask: H, short: 'H', name: "half carry"},
    FlagInfo {flag: Flag::Y, mask: Y, short: 'Y', name: "bit 5"},
    FlagInfo {flag: Flag::Z, mask: Z, short: 'Z', name: "zero"},
    FlagInfo {flag: Flag::S, mask: S, short: 'S', name: "sign"},
];

impl Flag {
    pub fn info(&self) -> &'static FlagInfo { &FLAG_TABLE[*self as usize] }
    pub fn from_char(c: char) -> Option<Flag> {
        let c = c.to_ascii_uppercase();
        FLAG_TABLE.iter().find(|i| i.short == c).map(|i| i.flag)
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,
    pub i: u8,
    pub r: u8,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub memptr: u16,
}

#[inline]
fn join(hi: u8, lo: u8) -> u16 { (hi as u16) << 8 | lo as u16 }
#[inline]
fn split(v: u16) -> (u8, u8) { ((v >> 8) as u8, v as u8) }

impl Registers {
    /// Power-on/RESET values.
    pub fn reset(&mut self) {
        *self = Registers {
            a: 0xFF,
            f: 0xFF,
            sp: 0xFFFF,
            ..Registers::default()
        };
    }

    pub fn af(&self) -> u16 { join(self.a, self.f) }
    pub fn bc(&self) -> u16 { join(self.b, self.c) }
    pub fn de(&self) -> u16 { join(self.d, self.e) }
    pub fn hl(&self) -> u16 { join(self.h, self.l) }
    pub fn af_alt(&self) -> u16 { join(self.a_alt, self.f_alt) }
    pub fn bc_alt(&self) -> u16 { join(self.b_alt, self.c_alt) }
    pub fn de_alt(&self) -> u16 { join(self.d_alt, self.e_alt) }
    pub fn hl_alt(&self) -> u16 { join(self.h_alt, self.l_alt) }
    pub fn set_af(&mut self, v: u16) { (self.a, self.f) = split(v) }
    pub fn set_bc(&mut self, v: u16) { (self.b, self.c) = split(v) }
    pub fn set_de(&mut self, v: u16) { (self.d, self.e) = split(v) }
    pub fn set_hl(&mut self, v: u16) { (self.h, self.l) = split(v) }

    /// EX AF,AF'
    pub fn ex_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_alt);
        std::mem::swap(&mut self.f, &mut self.f_alt);
    }

    /// EXX
    pub fn exx(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_alt);
        std::mem::swap(&mut self.c, &mut self.c_alt);
        std::mem::swap(&mut self.d, &mut self.d_alt);
        std::mem::swap(&mut self.e, &mut self.e_alt);
        std::mem::swap(&mut self.h, &mut self.h_alt);
        std::mem::swap(&mut self.l, &mut self.l_alt);
    }

    /// Refresh counter step: the low seven bits count, bit 7 stays put.
    pub fn inc_r(&mut self) { self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F) }

    /// Look a register up by its symbolic name: `ra`, `rbc`, `rhl'`, `rx`,
    /// `rsp`, `rf.z`, `rf'.c` and so on. Flag bits come back as 0 or 1.
    pub fn value(&self, name: &str) -> Option<u16> {
        let name = name.to_ascii_lowercase();
        if let Some((reg, bit)) = name.split_once('.') {
            let flags = match reg {
                "rf" => self.f,
                "rf'" => self.f_alt,
                _ => return None,
            };
            let mut chars = bit.chars();
            let flag = match (chars.next(), chars.next()) {
                (Some(c), None) => Flag::from_char(c)?,
                _ => return None,
            };
            return Some((flags & flag.info().mask != 0) as u16);
        }
        let v = match name.as_str() {
            "ra" => self.a as u16,
            "rf" => self.f as u16,
            "rb" => self.b as u16,
            "rc" => self.c as u16,
            "rd" => self.d as u16,
            "re" => self.e as u16,
            "rh" => self.h as u16,
            "rl" => self.l as u16,
            "raf" => self.af(),
            "rbc" => self.bc(),
            "rde" => self.de(),
            "rhl" => self.hl(),
            "ra'" => self.a_alt as u16,
            "rf'" => self.f_alt as u16,
            "rb'" => self.b_alt as u16,
            "rc'" => self.c_alt as u16,
            "rd'" => self.d_alt as u16,
            "re'" => self.e_alt as u16,
            "rh'" => self.h_alt as u16,
            "rl'" => self.l_alt as u16,
            "raf'" => self.af_alt(),
            "rbc'" => self.bc_alt(),
            "rde'" => self.de_alt(),
            "rhl'" => self.hl_alt(),
            "ri" => self.i as u16,
            "rr" => self.r as u16,
            "rx" => self.ix,
            "ry" => self.iy,
            "rsp" => self.sp,
            "rpc" => self.pc,
            _ => return None,
        };
        Some(v)
    }
}

/// Names accepted by [`Registers::value`], for help texts.
pub const REG_NAMES: &[&str] = &[
    "ra", "rf", "rb", "rc", "rd", "re", "rh", "rl", "raf", "rbc", "rde", "rhl", "ra'", "rf'", "rb'", "rc'", "rd'",
    "re'", "rh'", "rl'", "raf'", "rbc'", "rde'", "rhl'", "ri", "rr", "rx", "ry", "rsp", "rpc", "rf.<flag>",
    "rf'.<flag>",
];

/// Flag register rendered as `SZYHXVNC` with clear bits shown as `-`.
pub struct Flags(pub u8);

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for info in FLAG_TABLE.iter().rev() {
            let c = if self.0 & info.mask != 0 { info.short } else { '-' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            concat!(
                blue!("AF:"), "{:04X} ", blue!("BC:"), "{:04X} ", blue!("DE:"), "{:04X} ", blue!("HL:"), "{:04X} ",
                blue!("AF'"), ":{:04X} ", blue!("BC'"), ":{:04X} ", blue!("DE'"), ":{:04X} ", blue!("HL'"), ":{:04X} ",
                blue!("IX:"), "{:04X} ", blue!("IY:"), "{:04X} ", blue!("SP:"), "{:04X} ", blue!("PC:"), "{:04X} ",
                blue!("I:"), "{:02X} ", blue!("R:"), "{:02X} ", blue!("F:"), "{}"
            ),
            self.af(),
            self.bc(),
            self.de(),
            self.hl(),
            self.af_alt(),
            self.bc_alt(),
            self.de_alt(),
            self.hl_alt(),
            self.ix,
            self.iy,
            self.sp,
            self.pc,
            self.i,
            self.r,
            Flags(self.f)
        )
    }
}
