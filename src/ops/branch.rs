use super::*;

/// Condition field of JP/CALL/RET cc: NZ Z NC C PO PE P M.
pub fn cond(cpu: &Z80, code: u8) -> bool {
    let f = cpu.regs.f;
    match code & 7 {
        0 => f & Z == 0,
        1 => f & Z != 0,
        2 => f & C == 0,
        3 => f & C != 0,
        4 => f & V == 0,
        5 => f & V != 0,
        6 => f & S == 0,
        _ => f & S != 0,
    }
}

fn jump_rel(cpu: &mut Z80, arg: u16) {
    cpu.regs.pc = cpu.regs.pc.wrapping_add(arg as u8 as i8 as u16);
    cpu.regs.memptr = cpu.regs.pc;
}

pub fn __jp(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    cpu.regs.pc = arg;
    cpu.regs.memptr = arg;
    0
}

pub fn __jp_cc(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    if cond(cpu, op >> 3) {
        cpu.regs.pc = arg;
    }
    cpu.regs.memptr = arg;
    0
}

pub fn __jp_idx<const I: u8>(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.pc = cpu.idx::<I>();
    0
}

pub fn __jr(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    jump_rel(cpu, arg);
    0
}

// JR NZ/Z/NC/C
pub fn __jr_cc(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    if cond(cpu, (op >> 3) & 3) {
        jump_rel(cpu, arg);
        5
    } else {
        0
    }
}

pub fn __djnz(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    if cpu.regs.b != 0 {
        jump_rel(cpu, arg);
        5
    } else {
        0
    }
}

pub fn __call(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let pc = cpu.regs.pc;
    cpu.push(pc);
    cpu.regs.pc = arg;
    cpu.regs.memptr = arg;
    0
}

pub fn __call_cc(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    cpu.regs.memptr = arg;
    if !cond(cpu, op >> 3) {
        return 0;
    }
    let pc = cpu.regs.pc;
    cpu.push(pc);
    cpu.regs.pc = arg;
    7
}

pub fn __ret(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.pc = cpu.pop();
    cpu.regs.memptr = cpu.regs.pc;
    0
}

pub fn __ret_cc(cpu: &mut Z80, op: u8, _: u16) -> usize {
    if !cond(cpu, op >> 3) {
        return 0;
    }
    cpu.regs.pc = cpu.pop();
    cpu.regs.memptr = cpu.regs.pc;
    6
}

/// RETN and RETI: both restore IFF1 from IFF2.
pub fn __retn(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.iff1 = cpu.iff2;
    cpu.regs.pc = cpu.pop();
    cpu.regs.memptr = cpu.regs.pc;
    0
}

pub fn __rst(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let pc = cpu.regs.pc;
    cpu.push(pc);
    cpu.regs.pc = (op & 0x38) as u16;
    cpu.regs.memptr = cpu.regs.pc;
    0
}
