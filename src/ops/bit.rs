use super::*;

pub fn __rlca(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.rlca();
    0
}

pub fn __rrca(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.rrca();
    0
}

pub fn __rla(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.rla();
    0
}

pub fn __rra(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.rra();
    0
}

//
// CB table: register code in bits 0-2, code 6 is (HL)
//

pub fn __cb_shift(cpu: &mut Z80, op: u8, _: u16) -> usize {
    if op & 7 == 6 {
        let addr = cpu.regs.hl();
        let v = cpu.read(addr);
        let r = cpu.regs.shift(op >> 3, v);
        cpu.write(addr, r);
    } else {
        let v = cpu.reg8::<HL>(op);
        let r = cpu.regs.shift(op >> 3, v);
        cpu.set_reg8::<HL>(op, r);
    }
    0
}

pub fn __cb_bit(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let n = (op >> 3) & 7;
    if op & 7 == 6 {
        let v = cpu.read(cpu.regs.hl());
        let xy = (cpu.regs.memptr >> 8) as u8;
        cpu.regs.bit(n, v, xy);
    } else {
        let v = cpu.reg8::<HL>(op);
        cpu.regs.bit(n, v, v);
    }
    0
}

fn update(cpu: &mut Z80, op: u8, f: impl Fn(u8) -> u8) {
    if op & 7 == 6 {
        let addr = cpu.regs.hl();
        let r = f(cpu.read(addr));
        cpu.write(addr, r);
    } else {
        let r = f(cpu.reg8::<HL>(op));
        cpu.set_reg8::<HL>(op, r);
    }
}

pub fn __cb_res(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let mask = !(1u8 << ((op >> 3) & 7));
    update(cpu, op, |v| v & mask);
    0
}

pub fn __cb_set(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let mask = 1u8 << ((op >> 3) & 7);
    update(cpu, op, |v| v | mask);
    0
}

/// DD CB d op / FD CB d op. Every form works on (IX+d); all but BIT also
/// copy the result into the register selected by bits 0-2 unless it is 6.
pub fn __idx_bit<const I: u8>(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    let v = cpu.read(addr);
    let n = (op >> 3) & 7;
    let r = match op >> 6 {
        0 => cpu.regs.shift(n, v),
        1 => {
            cpu.regs.bit(n, v, (addr >> 8) as u8);
            return 0;
        }
        2 => v & !(1 << n),
        _ => v | (1 << n),
    };
    cpu.write(addr, r);
    if op & 7 != 6 {
        cpu.set_reg8::<HL>(op, r);
    }
    0
}
