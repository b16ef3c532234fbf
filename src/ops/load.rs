use super::*;

pub fn __ld_rr_nn<const I: u8>(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    cpu.set_rr::<I>(op >> 4, arg);
    cpu.regs.memptr = arg.wrapping_add(1);
    0
}

pub fn __ld_r_n<const I: u8>(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    cpu.set_reg8::<I>(op >> 3, arg as u8);
    0
}

pub fn __ld_r_r<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.reg8::<I>(op);
    cpu.set_reg8::<I>(op >> 3, v);
    0
}

// LD r,(HL) / LD r,(IX+d): the register is never IXH/IXL
pub fn __ld_r_m<const I: u8>(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    let v = cpu.read(addr);
    cpu.set_reg8::<HL>(op >> 3, v);
    0
}

pub fn __ld_m_r<const I: u8>(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    cpu.write(addr, cpu.reg8::<HL>(op));
    0
}

/// LD (HL),n or LD (IX+d),n; the indexed form carries d in the low byte and
/// n in the high byte of `arg`.
pub fn __ld_m_n<const I: u8>(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let addr = cpu.maddr::<I>(arg);
    let v = if I == HL { arg as u8 } else { (arg >> 8) as u8 };
    cpu.write(addr, v);
    0
}

fn rp(cpu: &Z80, op: u8) -> u16 {
    if op & 0x10 == 0 {
        cpu.regs.bc()
    } else {
        cpu.regs.de()
    }
}

pub fn __ld_a_rp(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let addr = rp(cpu, op);
    cpu.regs.a = cpu.read(addr);
    cpu.regs.memptr = addr.wrapping_add(1);
    0
}

pub fn __ld_rp_a(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let addr = rp(cpu, op);
    cpu.write(addr, cpu.regs.a);
    cpu.regs.memptr = (cpu.regs.a as u16) << 8 | (addr.wrapping_add(1) & 0xFF);
    0
}

pub fn __ld_a_nn(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    cpu.regs.a = cpu.read(arg);
    cpu.regs.memptr = arg.wrapping_add(1);
    0
}

pub fn __ld_nn_a(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    cpu.write(arg, cpu.regs.a);
    cpu.regs.memptr = (cpu.regs.a as u16) << 8 | (arg.wrapping_add(1) & 0xFF);
    0
}

pub fn __ld_nn_idx<const I: u8>(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    cpu.write16(arg, cpu.idx::<I>());
    cpu.regs.memptr = arg.wrapping_add(1);
    0
}

pub fn __ld_idx_nn<const I: u8>(cpu: &mut Z80, _: u8, arg: u16) -> usize {
    let v = cpu.read16(arg);
    cpu.set_idx::<I>(v);
    cpu.regs.memptr = arg.wrapping_add(1);
    0
}

// ED 43/53/63/73
pub fn __ld_nn_rr(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    cpu.write16(arg, cpu.rr::<HL>(op >> 4));
    cpu.regs.memptr = arg.wrapping_add(1);
    0
}

// ED 4B/5B/6B/7B
pub fn __ld_rr_mnn(cpu: &mut Z80, op: u8, arg: u16) -> usize {
    let v = cpu.read16(arg);
    cpu.set_rr::<HL>(op >> 4, v);
    cpu.regs.memptr = arg.wrapping_add(1);
    0
}

pub fn __ld_sp_idx<const I: u8>(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.sp = cpu.idx::<I>();
    0
}

pub fn __push<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = match (op >> 4) & 3 {
        3 => cpu.regs.af(),
        code => cpu.rr::<I>(code),
    };
    cpu.push(v);
    0
}

pub fn __pop<const I: u8>(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let v = cpu.pop();
    match (op >> 4) & 3 {
        3 => cpu.regs.set_af(v),
        code => cpu.set_rr::<I>(code, v),
    }
    0
}

pub fn __ex_af(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.ex_af();
    0
}

pub fn __exx(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.exx();
    0
}

pub fn __ex_de_hl(cpu: &mut Z80, _: u8, _: u16) -> usize {
    let de = cpu.regs.de();
    cpu.regs.set_de(cpu.regs.hl());
    cpu.regs.set_hl(de);
    0
}

pub fn __ex_msp_idx<const I: u8>(cpu: &mut Z80, _: u8, _: u16) -> usize {
    let sp = cpu.regs.sp;
    let v = cpu.read16(sp);
    cpu.write16(sp, cpu.idx::<I>());
    cpu.set_idx::<I>(v);
    cpu.regs.memptr = v;
    0
}

pub fn __ld_i_a(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.i = cpu.regs.a;
    0
}

pub fn __ld_r_a(cpu: &mut Z80, _: u8, _: u16) -> usize {
    cpu.regs.r = cpu.regs.a;
    0
}

pub fn __ld_a_i(cpu: &mut Z80, _: u8, _: u16) -> usize {
    let (v, iff2) = (cpu.regs.i, cpu.iff2);
    cpu.regs.ld_a_ir(v, iff2);
    0
}

pub fn __ld_a_r(cpu: &mut Z80, _: u8, _: u16) -> usize {
    let (v, iff2) = (cpu.regs.r, cpu.iff2);
    cpu.regs.ld_a_ir(v, iff2);
    0
}
