// The register file doubles as the ALU: every operation updates F the way
// the chip does, undocumented X/Y bits included.
use crate::registers::*;

const fn build_sz53p() -> [u8; 256] {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let v = i as u8;
        let mut f = v & (S | Y | X);
        if v == 0 {
            f |= Z;
        }
        if v.count_ones() % 2 == 0 {
            f |= V;
        }
        t[i] = f;
        i += 1;
    }
    t
}

/// Sign, zero, bits 5/3 and parity of every byte value.
pub static SZ53P: [u8; 256] = build_sz53p();

#[inline]
pub fn sz53(v: u8) -> u8 { SZ53P[v as usize] & !V }

impl Registers {
    fn carry(&self) -> u8 { self.f & C }

    pub fn add8(&mut self, v: u8, with_carry: bool) {
        let a = self.a;
        let c = if with_carry { self.carry() } else { 0 };
        let sum = a as u16 + v as u16 + c as u16;
        let r = sum as u8;
        let mut f = sz53(r) | ((a ^ v ^ r) & H);
        if (a ^ v) & 0x80 == 0 && (a ^ r) & 0x80 != 0 {
            f |= V;
        }
        if sum > 0xFF {
            f |= C;
        }
        self.a = r;
        self.f = f;
    }

    fn sub_flags(&mut self, a: u8, v: u8, with_carry: bool) -> u8 {
        let c = if with_carry { self.carry() } else { 0 };
        let diff = (a as u16).wrapping_sub(v as u16).wrapping_sub(c as u16);
        let r = diff as u8;
        let mut f = sz53(r) | N | ((a ^ v ^ r) & H);
        if (a ^ v) & 0x80 != 0 && (a ^ r) & 0x80 != 0 {
            f |= V;
        }
        if diff > 0xFF {
            f |= C;
        }
        self.f = f;
        r
    }

    pub fn sub8(&mut self, v: u8, with_carry: bool) { self.a = self.sub_flags(self.a, v, with_carry) }

    /// CP: like SUB but A is kept and bits 5/3 come from the operand.
    pub fn cp8(&mut self, v: u8) {
        self.sub_flags(self.a, v, false);
        self.f = (self.f & !(Y | X)) | (v & (Y | X));
    }

    pub fn and8(&mut self, v: u8) {
        self.a &= v;
        self.f = SZ53P[self.a as usize] | H;
    }
    pub fn xor8(&mut self, v: u8) {
        self.a ^= v;
        self.f = SZ53P[self.a as usize];
    }
    pub fn or8(&mut self, v: u8) {
        self.a |= v;
        self.f = SZ53P[self.a as usize];
    }

    /// The eight accumulator operations in opcode order:
    /// ADD ADC SUB SBC AND XOR OR CP.
    pub fn alu(&mut self, sel: u8, v: u8) {
        match sel & 7 {
            0 => self.add8(v, false),
            1 => self.add8(v, true),
            2 => self.sub8(v, false),
            3 => self.sub8(v, true),
            4 => self.and8(v),
            5 => self.xor8(v),
            6 => self.or8(v),
            _ => self.cp8(v),
        }
    }

    // INC/DEC leave the carry alone
    pub fn inc8(&mut self, v: u8) -> u8 {
        let r = v.wrapping_add(1);
        let mut f = self.carry() | sz53(r);
        if v & 0x0F == 0x0F {
            f |= H;
        }
        if v == 0x7F {
            f |= V;
        }
        self.f = f;
        r
    }
    pub fn dec8(&mut self, v: u8) -> u8 {
        let r = v.wrapping_sub(1);
        let mut f = self.carry() | sz53(r) | N;
        if v & 0x0F == 0 {
            f |= H;
        }
        if v == 0x80 {
            f |= V;
        }
        self.f = f;
        r
    }

    /// ADD HL/IX/IY,rr: S, Z and P/V survive.
    pub fn add16(&mut self, a: u16, b: u16) -> u16 {
        let sum = a as u32 + b as u32;
        let r = sum as u16;
        let mut f = (self.f & (S | Z | V)) | (((a ^ b ^ r) >> 8) as u8 & H) | ((r >> 8) as u8 & (Y | X));
        if sum > 0xFFFF {
            f |= C;
        }
        self.f = f;
        r
    }

    pub fn adc16(&mut self, a: u16, b: u16) -> u16 {
        let sum = a as u32 + b as u32 + self.carry() as u32;
        let r = sum as u16;
        let mut f = (((a ^ b ^ r) >> 8) as u8 & H) | ((r >> 8) as u8 & (S | Y | X));
        if r == 0 {
            f |= Z;
        }
        if (a ^ b) & 0x8000 == 0 && (a ^ r) & 0x8000 != 0 {
            f |= V;
        }
        if sum > 0xFFFF {
            f |= C;
        }
        self.f = f;
        r
    }

    pub fn sbc16(&mut self, a: u16, b: u16) -> u16 {
        let diff = (a as u32).wrapping_sub(b as u32).wrapping_sub(self.carry() as u32);
        let r = diff as u16;
        let mut f = N | (((a ^ b ^ r) >> 8) as u8 & H) | ((r >> 8) as u8 & (S | Y | X));
        if r == 0 {
            f |= Z;
        }
        if (a ^ b) & 0x8000 != 0 && (a ^ r) & 0x8000 != 0 {
            f |= V;
        }
        if diff > 0xFFFF {
            f |= C;
        }
        self.f = f;
        r
    }

    // accumulator rotates touch only H, N, C and bits 5/3
    fn rot_a(&mut self, r: u8, carry: bool) {
        self.a = r;
        self.f = (self.f & (S | Z | V)) | (r & (Y | X)) | carry as u8;
    }
    pub fn rlca(&mut self) { self.rot_a(self.a.rotate_left(1), self.a & 0x80 != 0) }
    pub fn rrca(&mut self) { self.rot_a(self.a.rotate_right(1), self.a & 0x01 != 0) }
    pub fn rla(&mut self) { self.rot_a(self.a << 1 | self.carry(), self.a & 0x80 != 0) }
    pub fn rra(&mut self) { self.rot_a(self.a >> 1 | self.carry() << 7, self.a & 0x01 != 0) }

    /// CB-table rotates and shifts in opcode order:
    /// RLC RRC RL RR SLA SRA SLL SRL.
    pub fn shift(&mut self, sel: u8, v: u8) -> u8 {
        let (r, c) = match sel & 7 {
            0 => (v.rotate_left(1), v & 0x80),
            1 => (v.rotate_right(1), v & 0x01),
            2 => (v << 1 | self.carry(), v & 0x80),
            3 => (v >> 1 | self.carry() << 7, v & 0x01),
            4 => (v << 1, v & 0x80),
            5 => ((v >> 1) | (v & 0x80), v & 0x01),
            6 => (v << 1 | 1, v & 0x80),
            _ => (v >> 1, v & 0x01),
        };
        self.f = SZ53P[r as usize] | (c != 0) as u8;
        r
    }

    /// BIT n: bits 5/3 are copied from `xy`, which depends on the
    /// addressing mode (the register, memptr high byte, or the address).
    pub fn bit(&mut self, n: u8, v: u8, xy: u8) {
        let set = v & (1 << n) != 0;
        let mut f = self.carry() | H | (xy & (Y | X));
        if !set {
            f |= Z | V;
        }
        if set && n == 7 {
            f |= S;
        }
        self.f = f;
    }

    pub fn daa(&mut self) {
        let a = self.a;
        let (c, h, n) = (self.f & C != 0, self.f & H != 0, self.f & N != 0);
        let mut diff = 0u8;
        if h || a & 0x0F > 9 {
            diff |= 0x06;
        }
        let carry = c || a > 0x99;
        if carry {
            diff |= 0x60;
        }
        let r = if n { a.wrapping_sub(diff) } else { a.wrapping_add(diff) };
        let half = if n { h && a & 0x0F < 6 } else { a & 0x0F > 9 };
        self.a = r;
        self.f = SZ53P[r as usize] | (self.f & N) | (if half { H } else { 0 }) | carry as u8;
    }

    pub fn cpl(&mut self) {
        self.a = !self.a;
        self.f = (self.f & (S | Z | V | C)) | H | N | (self.a & (Y | X));
    }

    pub fn neg(&mut self) {
        let v = self.a;
        self.a = 0;
        self.sub8(v, false);
    }

    pub fn scf(&mut self) { self.f = (self.f & (S | Z | V)) | (self.a & (Y | X)) | C }
    pub fn ccf(&mut self) {
        let c = self.f & C;
        self.f = (self.f & (S | Z | V)) | (self.a & (Y | X)) | (if c != 0 { H } else { C });
    }

    /// Flags after LD A,I / LD A,R: P/V reflects IFF2.
    pub fn ld_a_ir(&mut self, v: u8, iff2: bool) {
        self.a = v;
        self.f = self.carry() | sz53(v) | (if iff2 { V } else { 0 });
    }

    /// Flags after IN r,(C), RLD and RRD: carry kept.
    pub fn szp_keep_c(&mut self, v: u8) { self.f = self.carry() | SZ53P[v as usize] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regs(a: u8, f: u8) -> Registers {
        Registers {
            a,
            f,
            ..Default::default()
        }
    }

    #[test]
    fn add_and_adc() {
        let mut r = regs(0x7F, 0);
        r.add8(0x01, false);
        assert_eq!(r.a, 0x80);
        assert_eq!(r.f & (S | V | H | C | Z | N), S | V | H);
        let mut r = regs(0xFF, C);
        r.add8(0x00, true);
        assert_eq!(r.a, 0x00);
        assert_eq!(r.f & (Z | C | H), Z | C | H);
    }

    #[test]
    fn sub_and_cp() {
        let mut r = regs(0x80, 0);
        r.sub8(0x01, false);
        assert_eq!(r.a, 0x7F);
        assert_eq!(r.f & (V | N | H | C), V | N | H);
        let mut r = regs(0x10, 0);
        r.cp8(0x28);
        assert_eq!(r.a, 0x10);
        assert_eq!(r.f & (C | N | Y | X), C | N | Y | X);
        let mut r = regs(0x00, C);
        r.sub8(0x00, true);
        assert_eq!(r.a, 0xFF);
        assert!(r.f & C != 0);
    }

    #[test]
    fn logic_parity() {
        let mut r = regs(0xF0, C);
        r.and8(0x3C);
        assert_eq!(r.a, 0x30);
        assert_eq!(r.f, H | V | Y);
        r.xor8(0x30);
        assert_eq!(r.f, Z | V);
        r.or8(0x01);
        assert_eq!(r.f, 0);
    }

    #[test]
    fn inc_dec_keep_carry() {
        let mut r = regs(0, C);
        assert_eq!(r.inc8(0x7F), 0x80);
        assert_eq!(r.f, S | H | V | C);
        assert_eq!(r.dec8(0x00), 0xFF);
        assert_eq!(r.f & (N | H | C | S), N | H | C | S);
    }

    #[test]
    fn sixteen_bit() {
        let mut r = regs(0, Z | S);
        assert_eq!(r.add16(0x0FFF, 0x0001), 0x1000);
        assert_eq!(r.f & (Z | S | H | C | N), Z | S | H);
        r.f = C;
        assert_eq!(r.sbc16(0x0000, 0x0000), 0xFFFF);
        assert_eq!(r.f & (S | N | C | Z), S | N | C);
        r.f = 0;
        assert_eq!(r.adc16(0x7FFF, 0x0001), 0x8000);
        assert!(r.f & V != 0);
        assert_eq!(r.sbc16(0x1234, 0x1234), 0);
        assert!(r.f & Z != 0);
    }

    #[test]
    fn rotates_and_shifts() {
        let mut r = regs(0x81, 0);
        r.rlca();
        assert_eq!((r.a, r.f & C), (0x03, C));
        r.rra();
        assert_eq!((r.a, r.f & C), (0x81, C));
        assert_eq!(r.shift(6, 0x80), 0x01); // SLL
        assert_eq!(r.f & C, C);
        assert_eq!(r.shift(5, 0x81), 0xC0); // SRA
        assert_eq!(r.shift(7, 0x01), 0x00); // SRL
        assert_eq!(r.f & (Z | C), Z | C);
    }

    #[test]
    fn bit_test() {
        let mut r = regs(0, C);
        r.bit(7, 0x80, 0x28);
        assert_eq!(r.f, S | H | C | Y | X);
        r.bit(0, 0x80, 0);
        assert_eq!(r.f, Z | V | H | C);
    }

    #[test]
    fn daa_adjusts() {
        let mut r = regs(0x15, 0);
        r.add8(0x27, false);
        r.daa();
        assert_eq!(r.a, 0x42);
        let mut r = regs(0x42, 0);
        r.sub8(0x15, false);
        r.daa();
        assert_eq!(r.a, 0x27);
        let mut r = regs(0x99, 0);
        r.add8(0x01, false);
        r.daa();
        assert_eq!(r.a, 0x00);
        assert_eq!(r.f & (C | Z), C | Z);
    }

    #[test]
    fn misc_accumulator() {
        let mut r = regs(0x01, 0);
        r.neg();
        assert_eq!(r.a, 0xFF);
        assert_eq!(r.f & (N | C), N | C);
        r.cpl();
        assert_eq!(r.a, 0x00);
        r.scf();
        assert_eq!(r.f & C, C);
        r.ccf();
        assert_eq!(r.f & (C | H), H);
    }
}
