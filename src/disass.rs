// Disassembler. Walks the same descriptor tables as the decoder, using peek
// so that no device sees a read.
use crate::aspace::AddressSpace;
use crate::instructions::{self, ArgType, Instruction, Table};
use crate::z80::Z80;

fn fetch(mmap: &AddressSpace, pos: &mut u16) -> u8 {
    let v = mmap.peek(*pos);
    *pos = pos.wrapping_add(1);
    v
}

fn signed(d: u8) -> String {
    let d = d as i8;
    if d < 0 {
        format!("-${:02X}", d.unsigned_abs())
    } else {
        format!("+${:02X}", d)
    }
}

/// Decode the instruction at `addr` into its mnemonic and move `addr` past
/// it.
pub fn mnemonic(mmap: &AddressSpace, addr: &mut u16) -> String {
    let start = *addr;
    let mut pos = start;
    let mut table = Table::Base;
    let mut disp = None;
    let ins: &Instruction = loop {
        let op = fetch(mmap, &mut pos);
        let ins = &instructions::table(table)[op as usize];
        match ins.kind {
            ArgType::Prefix(next) => {
                // DD CB d op: the displacement comes before the opcode
                if matches!(next, Table::IxBit | Table::IyBit) {
                    disp = Some(fetch(mmap, &mut pos));
                }
                table = next;
            }
            _ => break ins,
        }
    };
    let mut text = ins.format.to_string();
    if let Some(i) = text.find('%') {
        let d = match disp {
            Some(d) => d,
            None => fetch(mmap, &mut pos),
        };
        text.replace_range(i..i + 1, &signed(d));
        if ins.kind == ArgType::A16 {
            let n = fetch(mmap, &mut pos);
            text = text.replacen("$*", &format!("${:02X}", n), 1);
        }
    } else if text.contains("$*") {
        let n = fetch(mmap, &mut pos);
        text = text.replacen("$*", &format!("${:02X}", n), 1);
    } else if text.contains("$^") {
        let lo = fetch(mmap, &mut pos);
        let hi = fetch(mmap, &mut pos);
        text = text.replacen("$^", &format!("${:04X}", u16::from_le_bytes([lo, hi])), 1);
    } else if text.contains("$+") {
        let d = fetch(mmap, &mut pos);
        let target = pos.wrapping_add(d as i8 as u16);
        text = text.replacen("$+", &format!("${:04X}", target), 1);
    }
    // a cancelled prefix is one byte long even though two were looked at
    *addr = start.wrapping_add(ins.size as u16);
    text
}

/// One listing line: address, instruction bytes, mnemonic.
pub fn disass_line(mmap: &AddressSpace, addr: &mut u16) -> String {
    let start = *addr;
    let text = mnemonic(mmap, addr);
    let len = addr.wrapping_sub(start);
    let hex = (0..len)
        .map(|i| format!("{:02X}", mmap.peek(start.wrapping_add(i))))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:04X}: {:<13}{}", start, hex, text)
}

impl Z80 {
    /// Disassemble the instruction at `addr` and advance `addr`. With
    /// `show_pc` the line holding PC is marked.
    pub fn disass(&self, addr: &mut u16, show_pc: bool) -> String {
        let start = *addr;
        let mut line = disass_line(self.mmap(), addr);
        let pc = self.regs().pc;
        if show_pc && pc.wrapping_sub(start) < addr.wrapping_sub(start) {
            line.push_str(" <");
        }
        line
    }

    pub fn disass_range(&self, mut addr: u16, count: usize, show_pc: bool) -> Vec<String> {
        (0..count).map(|_| self.disass(&mut addr, show_pc)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testbench::*;

    fn text(bytes: &[u8], at: u16) -> (String, u16) {
        let tb = TestBench::at(at, bytes);
        let mut addr = at;
        let s = mnemonic(tb.cpu.mmap(), &mut addr);
        (s, addr.wrapping_sub(at))
    }

    #[test]
    fn operands() {
        assert_eq!(text(&[0x3E, 0x42], 0), ("LD A, $42".to_string(), 2));
        assert_eq!(text(&[0x21, 0x34, 0x12], 0), ("LD HL, $1234".to_string(), 3));
        assert_eq!(text(&[0x18, 0xFE], 0x100), ("JR $0100".to_string(), 2));
        assert_eq!(text(&[0x10, 0x05], 0), ("DJNZ $0007".to_string(), 2));
        assert_eq!(text(&[0xC7], 0), ("RST $00".to_string(), 1));
    }

    #[test]
    fn prefixed() {
        assert_eq!(text(&[0xCB, 0x7E], 0), ("BIT 7, (HL)".to_string(), 2));
        assert_eq!(text(&[0xED, 0x73, 0x34, 0x12], 0), ("LD ($1234), SP".to_string(), 4));
        assert_eq!(text(&[0xED, 0xB0], 0), ("LDIR".to_string(), 2));
        assert_eq!(text(&[0xDD, 0x7E, 0xFB], 0), ("LD A, (IX-$05)".to_string(), 3));
        assert_eq!(text(&[0xDD, 0x36, 0x05, 0x99], 0), ("LD (IX+$05), $99".to_string(), 4));
        assert_eq!(text(&[0xFD, 0xCB, 0xFE, 0x46], 0), ("BIT 0, (IY-$02)".to_string(), 4));
        assert_eq!(text(&[0xFD, 0xCB, 0x02, 0x00], 0), ("RLC (IY+$02), B".to_string(), 4));
        assert_eq!(text(&[0xDD, 0xDD, 0x21], 0), ("NOP*".to_string(), 1));
    }

    #[test]
    fn listing() {
        let mut tb = TestBench::new(&[0x3E, 0x42, 0x00]);
        tb.cpu.regs.pc = 2;
        let lines = tb.cpu.disass_range(0, 2, true);
        assert_eq!(lines[0], "0000: 3E 42        LD A, $42");
        assert_eq!(lines[1], "0002: 00           NOP <");
        tb.step();
        // listing never touches the data bus latch
        tb.cpu.mmap().set_databus(0x5A);
        tb.cpu.disass_range(0, 4, false);
        assert_eq!(tb.cpu.mmap().databus(), 0x5A);
    }
}
