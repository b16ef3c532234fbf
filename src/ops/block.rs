// ED A0-BB. Bit 3 of the opcode selects decrement, bit 4 the repeating form.
use super::*;

fn step(op: u8) -> u16 {
    if op & 0x08 == 0 {
        1
    } else {
        0xFFFF
    }
}

fn repeat(cpu: &mut Z80) -> usize {
    cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
    cpu.regs.memptr = cpu.regs.pc.wrapping_add(1);
    5
}

// flags shared by INI/IND/OUTI/OUTD; `k` is the byte moved plus the
// adjusted C or L
fn io_block_flags(cpu: &mut Z80, v: u8, k: u16) {
    let b = cpu.regs.b;
    let mut f = sz53(b) | (SZ53P[(((k as u8) & 7) ^ b) as usize] & V);
    if v & 0x80 != 0 {
        f |= N;
    }
    if k > 0xFF {
        f |= H | C;
    }
    cpu.regs.f = f;
}

pub fn __ldi_ldd(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let d = step(op);
    let (hl, de) = (cpu.regs.hl(), cpu.regs.de());
    let v = cpu.read(hl);
    cpu.write(de, v);
    cpu.regs.set_hl(hl.wrapping_add(d));
    cpu.regs.set_de(de.wrapping_add(d));
    let bc = cpu.regs.bc().wrapping_sub(1);
    cpu.regs.set_bc(bc);
    let n = v.wrapping_add(cpu.regs.a);
    let mut f = (cpu.regs.f & (S | Z | C)) | (n & X) | ((n << 4) & Y);
    if bc != 0 {
        f |= V;
    }
    cpu.regs.f = f;
    if op & 0x10 != 0 && bc != 0 {
        return repeat(cpu);
    }
    0
}

pub fn __cpi_cpd(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let d = step(op);
    let hl = cpu.regs.hl();
    let v = cpu.read(hl);
    let a = cpu.regs.a;
    let r = a.wrapping_sub(v);
    let h = (a ^ v ^ r) & H;
    let n = r.wrapping_sub((h != 0) as u8);
    cpu.regs.set_hl(hl.wrapping_add(d));
    let bc = cpu.regs.bc().wrapping_sub(1);
    cpu.regs.set_bc(bc);
    cpu.regs.memptr = cpu.regs.memptr.wrapping_add(d);
    let mut f = (cpu.regs.f & C) | N | h | (sz53(r) & (S | Z)) | (n & X) | ((n << 4) & Y);
    if bc != 0 {
        f |= V;
    }
    cpu.regs.f = f;
    if op & 0x10 != 0 && bc != 0 && r != 0 {
        return repeat(cpu);
    }
    0
}

pub fn __ini_ind(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let d = step(op);
    let bc = cpu.regs.bc();
    let v = cpu.io_in(bc);
    cpu.regs.memptr = bc.wrapping_add(d);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let hl = cpu.regs.hl();
    cpu.write(hl, v);
    cpu.regs.set_hl(hl.wrapping_add(d));
    let k = v as u16 + cpu.regs.c.wrapping_add(d as u8) as u16;
    io_block_flags(cpu, v, k);
    if op & 0x10 != 0 && cpu.regs.b != 0 {
        return repeat(cpu);
    }
    0
}

pub fn __outi_outd(cpu: &mut Z80, op: u8, _: u16) -> usize {
    let d = step(op);
    let hl = cpu.regs.hl();
    let v = cpu.read(hl);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let bc = cpu.regs.bc();
    cpu.regs.memptr = bc.wrapping_add(d);
    cpu.io_out(bc, v);
    cpu.regs.set_hl(hl.wrapping_add(d));
    let k = v as u16 + cpu.regs.l as u16;
    io_block_flags(cpu, v, k);
    if op & 0x10 != 0 && cpu.regs.b != 0 {
        return repeat(cpu);
    }
    0
}
