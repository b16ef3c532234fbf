use super::*;

pub fn __alu_r<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.reg8::<I>(op);
    cpu.regs.alu(op >> 3, v);
    0
}

pub fn __alu_m<const I: u8>(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    let v = cpu.read(addr);
    cpu.regs.alu(op >> 3, v);
    0
}

pub fn __alu_n(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    cpu.regs.alu(op >> 3, arg as u8);
    0
}

pub fn __inc_r<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.reg8::<I>(op >> 3);
    let r = cpu.regs.inc8(v);
    cpu.set_reg8::<I>(op >> 3, r);
    0
}

pub fn __dec_r<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.reg8::<I>(op >> 3);
    let r = cpu.regs.dec8(v);
    cpu.set_reg8::<I>(op >> 3, r);
    0
}

pub fn __inc_m<const I: u8>(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    let v = cpu.read(addr);
    let r = cpu.regs.inc8(v);
    cpu.write(addr, r);
    0
}

pub fn __dec_m<const I: u8>(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    let v = cpu.read(addr);
    let r = cpu.regs.dec8(v);
    cpu.write(addr, r);
    0
}

pub fn __inc_rr<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.rr::<I>(op >> 4).wrapping_add(1);
    cpu.set_rr::<I>(op >> 4, v);
    0
}

pub fn __dec_rr<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.rr::<I>(op >> 4).wrapping_sub(1);
    cpu.set_rr::<I>(op >> 4, v);
    0
}

pub fn __add_idx_rr<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let a = cpu.idx::<I>();
    let b = cpu.rr::<I>(op >> 4);
    let r = cpu.regs.add16(a, b);
    cpu.regs.memptr = a.wrapping_add(1);
    cpu.set_idx::<I>(r);
    0
}

pub fn __adc_hl_rr(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let a = cpu.regs.hl();
    let b = cpu.rr::<HL>(op >> 4);
    let r = cpu.regs.adc16(a, b);
    cpu.regs.memptr = a.wrapping_add(1);
    cpu.regs.set_hl(r);
    0
}

pub fn __sbc_hl_rr(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let a = cpu.regs.hl();
    let b = cpu.rr::<HL>(op >> 4);
    let r = cpu.regs.sbc16(a, b);
    cpu.regs.memptr = a.wrapping_add(1);
    cpu.regs.set_hl(r);
    0
}

pub fn __daa(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.daa();
    0
}

pub fn __cpl(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.cpl();
    0
}

pub fn __neg(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.neg();
    0
}

pub fn __scf(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.scf();
    0
}

pub fn __ccf(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.ccf();
    0
}
