use super::*;

pub fn __nop(_: &mut Z80, _: u8, _: u16) -> usize { 0 }

/// A DD/FD prefix followed by another prefix (DD, ED, FD) is dropped: the
/// next fetch starts again at the second prefix. The refresh counter already
/// counted that byte as an extra opcode fetch, which is taken back here.
pub fn __prefix_skip(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.pc = cpu.regs.pc.wrapping_sub(1);
    cpu.regs.r = (cpu.regs.r & 0x80) | (cpu.regs.r.wrapping_sub(1) & 0x7F);
    0
}

pub fn __halt(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.set_halt(true);
    0
}

pub fn __di(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.iff1 = false;
    cpu.iff2 = false;
    0
}

pub fn __ei(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.iff1 = true;
    cpu.iff2 = true;
    0
}

pub fn __im(cpu: &mut Z80, op: u8, _: u16) -> usize {
    cpu.imode = match (op >> 3) & 3 {
        2 => IMode::IM1,
        3 => IMode::IM2,
        _ => IMode::IM0,
    };
    0
}

pub fn __rld(cpu: &mut Z80, _: u8, _: u16) -> usize {
    let addr = cpu.regs.hl();
    let v = cpu.read(addr);
    let a = cpu.regs.a;
    cpu.write(addr, v << 4 | (a & 0x0F));
    cpu.regs.a = (a & 0xF0) | (v >> 4);
    cpu.regs.szp_keep_c(cpu.regs.a);
    cpu.regs.memptr = addr.wrapping_add(1);
    0
}

pub fn __rrd(cpu: &mut Z80, _: u8, _: u16) -> usize {
    let addr = cpu.regs.hl();
    let v = cpu.read(addr);
    let a = cpu.regs.a;
    cpu.write(addr, a << 4 | (v >> 4));
    cpu.regs.a = (a & 0xF0) | (v & 0x0F);
    cpu.regs.szp_keep_c(cpu.regs.a);
    cpu.regs.memptr = addr.wrapping_add(1);
    0
}
