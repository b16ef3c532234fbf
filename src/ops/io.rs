use super::*;

pub fn __in_a_n(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let port = (cpu.regs.a as u16) << 8 | (arg & 0xFF);
    cpu.regs.a = cpu.io_in(port);
    cpu.regs.memptr = port.wrapping_add(1);
    0
}

pub fn __out_n_a(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let a = cpu.regs.a;
    let port = (a as u16) << 8 | (arg & 0xFF);
    cpu.io_out(port, a);
    cpu.regs.memptr = (a as u16) << 8 | (arg.wrapping_add(1) & 0xFF);
    0
}

/// IN r,(C); code 6 only sets the flags.
pub fn __in_r_c(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let port = cpu.regs.bc();
    let v = cpu.io_in(port);
    cpu.regs.memptr = port.wrapping_add(1);
    cpu.regs.szp_keep_c(v);
    if (op >> 3) & 7 != 6 {
        cpu.set_reg8::<HL>(op >> 3, v);
    }
    0
}

/// OUT (C),r; code 6 writes 0.
pub fn __out_c_r(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let port = cpu.regs.bc();
    let v = cpu.reg8::<HL>(op >> 3);
    cpu.io_out(port, v);
    cpu.regs.memptr = port.wrapping_add(1);
    0
}
