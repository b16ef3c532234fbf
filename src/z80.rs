//! Zilog Z80 core.
//!
//! Every call to [`Clockable::tick`] advances the CPU by one bus-cycle phase.
//! A normal opcode fetch walks `T1 -> T2 -> T3 -> Tn`: T1 asserts M1, T2
//! inserts wait states while WAIT is held, T3 fetches, decodes and executes
//! the whole instruction (returning its remaining cycle cost) and Tn samples
//! the interrupt lines. When an interrupt was sampled the next fetch is an
//! acknowledge cycle instead (`T1 -> T2 -> T3`).
use super::*;
use crate::aspace::AddressSpace;
use crate::clock::{ClockInfo, Clockable, Tick};
use crate::instructions::{self, ArgType, Table};
use crate::monitor::Monitor;
use crate::registers::Registers;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Index register selectors for the handlers shared by the base, DD and FD
/// tables.
pub const HL: u8 = 0;
pub const IX: u8 = 1;
pub const IY: u8 = 2;

pub const RESET_ADDR: u16 = 0x0000;
pub const NMI_ADDR: u16 = 0x0066;
pub const IRQ_ADDR: u16 = 0x0038;

const OP_NOP: u8 = 0x00;
const OP_EI: u8 = 0xFB;

const NMI_CYCLES: usize = 17;
const IM1_CYCLES: usize = 17;
const IM2_CYCLES: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    T1,
    T2,
    T3,
    Tn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IMode {
    IM0,
    IM1,
    IM2,
}

/// Output pins that can have a listener attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin {
    Halt,
    Iorq,
    M1,
    Rfsh,
}

pub type PinListener = Box<dyn FnMut(bool)>;
pub type BreakFn = Box<dyn FnMut(&mut Z80)>;

#[derive(Default)]
struct OutputPin {
    level: bool,
    listener: Option<PinListener>,
}

impl OutputPin {
    fn set(&mut self, level: bool) {
        if self.level != level {
            self.level = level;
            if let Some(listener) = self.listener.as_mut() {
                listener(level);
            }
        }
    }
}

/// Tables and opcodes visited while decoding one instruction.
#[derive(Debug, Clone, Copy)]
pub struct DecodePath {
    steps: [(Table, u8); 3],
    len: usize,
}

impl DecodePath {
    fn new(opcode: u8) -> DecodePath {
        DecodePath {
            steps: [(Table::Base, opcode); 3],
            len: 1,
        }
    }
    fn push(&mut self, table: Table, opcode: u8) -> bool {
        if self.len == self.steps.len() {
            return false;
        }
        self.steps[self.len] = (table, opcode);
        self.len += 1;
        true
    }
}

impl fmt::Display for DecodePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (table, op)) in self.steps[..self.len].iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}:${:02X}", table.name(), op)?;
        }
        Ok(())
    }
}

pub struct Z80 {
    label: String,
    pub(crate) log: logger::Logger,
    pub(crate) regs: Registers,
    mmap: Rc<AddressSpace>,
    io: Rc<AddressSpace>,
    pub(crate) imode: IMode,
    pub(crate) iff1: bool,
    pub(crate) iff2: bool,
    tx: Cycle,
    is_int: bool,
    is_nmi: bool,
    int_level: bool,
    nmi_level: bool,
    nmi_latch: bool,
    reset_level: bool,
    wait_level: bool,
    halt: OutputPin,
    iorq: OutputPin,
    m1: OutputPin,
    rfsh: OutputPin,
    ebreak: bool,
    monitor: Option<Monitor>,
    breakpoints: HashMap<u16, BreakFn>,
    // address of the callback being run; bpdel on it clears this
    bp_running: Option<u16>,
    fault: Option<Error>,
    executed: u64,
}

impl Z80 {
    /// New CPU on the given memory and port buses, already reset.
    pub fn new(label: &str, mmap: Rc<AddressSpace>, io: Rc<AddressSpace>, log: logger::Logger) -> Z80 {
        let mut cpu = Z80 {
            label: label.to_string(),
            log,
            regs: Registers::default(),
            mmap,
            io,
            imode: IMode::IM0,
            iff1: false,
            iff2: false,
            tx: Cycle::T1,
            is_int: false,
            is_nmi: false,
            int_level: false,
            nmi_level: false,
            nmi_latch: false,
            reset_level: false,
            wait_level: false,
            halt: OutputPin::default(),
            iorq: OutputPin::default(),
            m1: OutputPin::default(),
            rfsh: OutputPin::default(),
            ebreak: false,
            monitor: None,
            breakpoints: HashMap::new(),
            bp_running: None,
            fault: None,
            executed: 0,
        };
        cpu.reset();
        cpu
    }

    pub fn reset(&mut self) {
        self.regs.reset();
        self.imode = IMode::IM0;
        self.iff1 = false;
        self.iff2 = false;
        self.tx = Cycle::T1;
        self.is_int = false;
        self.is_nmi = false;
        self.nmi_latch = false;
        self.ebreak = false;
        self.fault = None;
        self.halt.set(false);
        self.iorq.set(false);
        self.m1.set(false);
        self.rfsh.set(false);
        debug!(self.log, "{}: reset", self.label);
    }

    pub fn label(&self) -> &str { &self.label }
    pub fn regs(&self) -> &Registers { &self.regs }
    pub fn regs_mut(&mut self) -> &mut Registers { &mut self.regs }
    pub fn mmap(&self) -> &Rc<AddressSpace> { &self.mmap }
    pub fn io(&self) -> &Rc<AddressSpace> { &self.io }
    pub fn logger(&self) -> &logger::Logger { &self.log }
    pub fn imode(&self) -> IMode { self.imode }
    pub fn iff(&self) -> (bool, bool) { (self.iff1, self.iff2) }
    pub fn cycle(&self) -> Cycle { self.tx }
    /// Number of instructions executed since creation.
    pub fn executed(&self) -> u64 { self.executed }
    /// The decode error that stopped this CPU, if any.
    pub fn fault(&self) -> Option<&Error> { self.fault.as_ref() }

    /// True between instructions, where a new fetch (or acknowledge) starts.
    pub fn at_boundary(&self) -> bool { self.tx == Cycle::T1 }

    //
    // pins
    //
    pub fn pin(&self, pin: Pin) -> bool {
        match pin {
            Pin::Halt => self.halt.level,
            Pin::Iorq => self.iorq.level,
            Pin::M1 => self.m1.level,
            Pin::Rfsh => self.rfsh.level,
        }
    }

    /// Attach a listener called on every edge of an output pin.
    pub fn set_listener(&mut self, pin: Pin, listener: impl FnMut(bool) + 'static) {
        let slot = match pin {
            Pin::Halt => &mut self.halt,
            Pin::Iorq => &mut self.iorq,
            Pin::M1 => &mut self.m1,
            Pin::Rfsh => &mut self.rfsh,
        };
        slot.listener = Some(Box::new(listener));
    }

    /// Maskable interrupt line; level sensitive, sampled at Tn.
    pub fn int_pin(&mut self, active: bool) { self.int_level = active }

    /// Non-maskable interrupt line; the rising edge is latched.
    pub fn nmi_pin(&mut self, active: bool) {
        if active && !self.nmi_level {
            self.nmi_latch = true;
        }
        self.nmi_level = active;
    }

    /// RESET resets on its rising edge and holds the CPU while asserted.
    pub fn reset_pin(&mut self, active: bool) {
        if active && !self.reset_level {
            self.reset();
        }
        self.reset_level = active;
    }

    pub fn wait_pin(&mut self, active: bool) { self.wait_level = active }

    pub fn is_halted(&self) -> bool { self.halt.level }
    pub(crate) fn set_halt(&mut self, active: bool) { self.halt.set(active) }

    //
    // breakpoints
    //

    /// Request a break at the next instruction boundary. Without a monitor
    /// this stops the clock.
    pub fn ebreak(&mut self) { self.ebreak = true }

    /// Register a callback run whenever execution reaches `addr`.
    pub fn bpadd(&mut self, addr: u16, f: impl FnMut(&mut Z80) + 'static) { self.breakpoints.insert(addr, Box::new(f)); }
    pub fn bpdel(&mut self, addr: u16) {
        self.breakpoints.remove(&addr);
        if self.bp_running == Some(addr) {
            self.bp_running = None;
        }
    }

    /// Attach a monitor; it gets a breakpoint on the reset vector.
    pub fn init_monitor(&mut self, mut monitor: Monitor) {
        monitor.breakpoints_mut().add(RESET_ADDR, None);
        self.monitor = Some(monitor);
    }

    pub fn monitor(&self) -> Option<&Monitor> { self.monitor.as_ref() }
    pub fn monitor_mut(&mut self) -> Option<&mut Monitor> { self.monitor.as_mut() }

    // returns false when the monitor asked to stop
    fn check_monitor(&mut self) -> bool {
        let Some(mut monitor) = self.monitor.take() else {
            return true;
        };
        let mut keep_going = true;
        if self.ebreak || monitor.is_breakpoint(self, self.regs.pc) {
            loop {
                self.ebreak = false;
                let pc = self.regs.pc;
                if !monitor.run(self) {
                    keep_going = false;
                    break;
                }
                if pc == self.regs.pc || !monitor.is_breakpoint(self, self.regs.pc) {
                    break;
                }
            }
        }
        self.monitor = Some(monitor);
        keep_going
    }

    fn system_breakpoint(&mut self) {
        let pc = self.regs.pc;
        if let Some(mut f) = self.breakpoints.remove(&pc) {
            self.bp_running = Some(pc);
            f(self);
            // put it back unless it deleted itself; a replacement wins
            if self.bp_running.take() == Some(pc) {
                self.breakpoints.entry(pc).or_insert(f);
            }
        }
    }

    //
    // bus
    //
    #[inline]
    pub(crate) fn read(&self, addr: u16) -> u8 { self.mmap.read(addr) }
    #[inline]
    pub(crate) fn write(&self, addr: u16, value: u8) { self.mmap.write(addr, value) }

    pub(crate) fn read16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }
    pub(crate) fn write16(&self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    pub(crate) fn push(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(self.regs.sp, lo);
    }
    pub(crate) fn pop(&mut self) -> u16 {
        let v = self.read16(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        v
    }

    pub(crate) fn io_in(&mut self, port: u16) -> u8 {
        self.iorq.set(true);
        let v = self.io.read(port);
        self.iorq.set(false);
        v
    }
    pub(crate) fn io_out(&mut self, port: u16, value: u8) {
        self.iorq.set(true);
        self.io.write(port, value);
        self.iorq.set(false);
    }

    //
    // index register helpers shared by HL/IX/IY handlers
    //
    #[inline]
    pub(crate) fn idx<const I: u8>(&self) -> u16 {
        match I {
            IX => self.regs.ix,
            IY => self.regs.iy,
            _ => self.regs.hl(),
        }
    }
    #[inline]
    pub(crate) fn set_idx<const I: u8>(&mut self, v: u16) {
        match I {
            IX => self.regs.ix = v,
            IY => self.regs.iy = v,
            _ => self.regs.set_hl(v),
        }
    }

    /// 8-bit register by opcode field (B C D E H L - A). With an index
    /// prefix H and L select the halves of IX/IY. Code 6 is the memory
    /// operand and is handled by the `(HL)` forms, so it reads as 0 here.
    pub(crate) fn reg8<const I: u8>(&self, code: u8) -> u8 {
        match code & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => (self.idx::<I>() >> 8) as u8,
            5 => self.idx::<I>() as u8,
            7 => self.regs.a,
            _ => 0,
        }
    }
    pub(crate) fn set_reg8<const I: u8>(&mut self, code: u8, v: u8) {
        match code & 7 {
            0 => self.regs.b = v,
            1 => self.regs.c = v,
            2 => self.regs.d = v,
            3 => self.regs.e = v,
            4 => self.set_idx::<I>((self.idx::<I>() & 0x00FF) | (v as u16) << 8),
            5 => self.set_idx::<I>((self.idx::<I>() & 0xFF00) | v as u16),
            7 => self.regs.a = v,
            _ => {}
        }
    }

    /// Memory operand address: HL, or IX/IY plus the signed displacement in
    /// the low byte of `arg` (which also lands in memptr).
    pub(crate) fn maddr<const I: u8>(&mut self, arg: u16) -> u16 {
        if I == HL {
            return self.regs.hl();
        }
        let addr = self.idx::<I>().wrapping_add(arg as u8 as i8 as u16);
        self.regs.memptr = addr;
        addr
    }

    /// 16-bit register by opcode field (BC DE HL SP), HL replaced by the
    /// index register.
    pub(crate) fn rr<const I: u8>(&self, code: u8) -> u16 {
        match code & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.idx::<I>(),
            _ => self.regs.sp,
        }
    }
    pub(crate) fn set_rr<const I: u8>(&mut self, code: u8, v: u16) {
        match code & 3 {
            0 => self.regs.set_bc(v),
            1 => self.regs.set_de(v),
            2 => self.set_idx::<I>(v),
            _ => self.regs.sp = v,
        }
    }

    //
    // decode and execute
    //

    /// Execute an opcode that has already been fetched at PC. Operands are
    /// read from the bus as the descriptor dictates and PC ends up past the
    /// instruction. `forced` opcodes were not read from PC (the NOP run while
    /// halted, interrupt mode 0 vectors); they must be single byte.
    pub fn execute(&mut self, opcode: u8, forced: bool) -> Result<usize, Error> {
        let mut path = DecodePath::new(opcode);
        self.dispatch(Table::Base, opcode, forced, &mut path)
    }

    fn dispatch(&mut self, table: Table, opcode: u8, forced: bool, path: &mut DecodePath) -> Result<usize, Error> {
        let ins = &instructions::table(table)[opcode as usize];
        if forced && ins.kind != ArgType::None {
            return Err(Error::new(
                ErrorKind::ForcedOpcode,
                Some(self.regs),
                format!("{}: forced opcode ${:02X} ({}) is not a single byte instruction", self.label, opcode, ins.format)
                    .as_str(),
            ));
        }
        let pc = self.regs.pc;
        let arg = match ins.kind {
            ArgType::None => {
                if !forced {
                    self.regs.pc = pc.wrapping_add(1);
                }
                0
            }
            ArgType::A8 | ArgType::Rel => {
                let v = self.read(pc.wrapping_add(1));
                self.regs.pc = pc.wrapping_add(2);
                v as u16
            }
            ArgType::A16 => {
                let v = self.read16(pc.wrapping_add(1));
                self.regs.pc = pc.wrapping_add(3);
                v
            }
            ArgType::Prefix(next) => {
                if !table.redirects_to(next) {
                    return Err(decode_err!(
                        Some(self.regs),
                        "{}: {} table cannot redirect to {}: opcode ${:02X} at ${:04X}, decode path {}",
                        self.label,
                        table.name(),
                        next.name(),
                        opcode,
                        pc,
                        path
                    ));
                }
                // DD CB d op: the opcode sits after the displacement
                let (next_op, step) = match next {
                    Table::IxBit | Table::IyBit => (self.read(pc.wrapping_add(2)), 0),
                    _ => (self.read(pc.wrapping_add(1)), 1),
                };
                if !path.push(next, next_op) {
                    return Err(decode_err!(
                        Some(self.regs),
                        "{}: decode nested too deep: opcode ${:02X} at ${:04X}, decode path {}",
                        self.label,
                        next_op,
                        pc,
                        path
                    ));
                }
                self.regs.pc = pc.wrapping_add(step);
                let cycles = self.dispatch(next, next_op, false, path)?;
                if step == 0 {
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
                return Ok(cycles);
            }
        };
        match ins.exec {
            Some(exec) => Ok(ins.cycles as usize + exec(self, opcode, arg)),
            None => Err(decode_err!(
                Some(self.regs),
                "{}: no handler for opcode ${:02X} at ${:04X}, decode path {}",
                self.label,
                opcode,
                pc,
                path
            )),
        }
    }

    fn m1_cycle(&mut self) -> Result<usize, Error> {
        match self.tx {
            Cycle::T1 => {
                self.m1.set(true);
                self.rfsh.set(false);
                self.tx = Cycle::T2;
                Ok(1)
            }
            Cycle::T2 => {
                if !self.wait_level {
                    self.tx = Cycle::T3;
                }
                Ok(1)
            }
            Cycle::T3 => {
                let halted = self.halt.level;
                let pc = self.regs.pc;
                let opcode = if halted { OP_NOP } else { self.read(pc) };
                self.m1.set(false);
                self.regs.inc_r();
                if matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD) {
                    self.regs.inc_r();
                }
                if !halted && self.log.is_debug() {
                    let mut addr = pc;
                    let line = disass::disass_line(&self.mmap, &mut addr);
                    debug!(self.log, "{}: {}", self.label, line);
                }
                let cycles = self.execute(opcode, halted)?;
                self.executed += 1;
                self.rfsh.set(true);
                if self.log.is_debug() {
                    debug!(self.log, "{}: {} cycles, {}", self.label, cycles, self.regs);
                }
                if opcode == OP_EI && !halted {
                    // no interrupt sampling right after EI
                    self.tx = Cycle::T1;
                    Ok(cycles.saturating_sub(2).max(1))
                } else {
                    self.tx = Cycle::Tn;
                    Ok(cycles.saturating_sub(3).max(1))
                }
            }
            Cycle::Tn => {
                if self.nmi_latch {
                    self.is_nmi = true;
                } else if self.iff1 && self.int_level {
                    self.is_int = true;
                }
                self.tx = Cycle::T1;
                Ok(1)
            }
        }
    }

    fn m1_cycle_interrupt(&mut self) -> Result<usize, Error> {
        match self.tx {
            Cycle::T1 => {
                self.m1.set(true);
                self.rfsh.set(false);
                self.halt.set(false);
                if self.is_int {
                    self.iorq.set(true);
                }
                self.tx = Cycle::T2;
                Ok(1)
            }
            Cycle::T2 => {
                if !(self.is_int && self.wait_level) {
                    self.tx = Cycle::T3;
                }
                Ok(1)
            }
            _ => {
                self.m1.set(false);
                self.regs.inc_r();
                let cycles = if self.is_nmi {
                    self.is_nmi = false;
                    self.nmi_latch = false;
                    self.iff2 = self.iff1;
                    self.iff1 = false;
                    self.push(self.regs.pc);
                    self.regs.pc = NMI_ADDR;
                    self.regs.memptr = NMI_ADDR;
                    debug!(self.log, "{}: NMI", self.label);
                    NMI_CYCLES
                } else {
                    self.is_int = false;
                    self.iff1 = false;
                    self.iff2 = false;
                    let vector = self.mmap.databus();
                    self.iorq.set(false);
                    debug!(self.log, "{}: INT mode {:?}, data bus ${:02X}", self.label, self.imode, vector);
                    match self.imode {
                        IMode::IM0 => match self.execute(vector, true) {
                            Ok(cycles) => cycles,
                            Err(e) if e.kind == ErrorKind::ForcedOpcode => {
                                warn!(self.log, "{}, interrupt serviced as NOP", e.msg);
                                4
                            }
                            Err(e) => return Err(e),
                        },
                        IMode::IM1 => {
                            self.push(self.regs.pc);
                            self.regs.pc = IRQ_ADDR;
                            self.regs.memptr = IRQ_ADDR;
                            IM1_CYCLES
                        }
                        IMode::IM2 => {
                            self.push(self.regs.pc);
                            let addr = (self.regs.i as u16) << 8 | vector as u16;
                            self.regs.pc = self.read16(addr);
                            self.regs.memptr = self.regs.pc;
                            IM2_CYCLES
                        }
                    }
                };
                self.rfsh.set(true);
                self.tx = Cycle::T1;
                Ok(cycles.saturating_sub(2).max(1))
            }
        }
    }

    /// Multi-line status: registers, interrupt state and the instruction at
    /// PC.
    pub fn status(&self) -> String {
        let mut addr = self.regs.pc;
        format!(
            "{}\n{} IFF1:{} IFF2:{} IM:{} HALT:{}\n{}",
            self.regs,
            self.label,
            self.iff1 as u8,
            self.iff2 as u8,
            self.imode as u8,
            self.halt.level as u8,
            disass::disass_line(&self.mmap, &mut addr)
        )
    }
}

impl Clockable for Z80 {
    fn tick(&mut self, _clk: &ClockInfo) -> Tick {
        if self.fault.is_some() {
            return Tick::Halt;
        }
        if self.ebreak && self.monitor.is_none() {
            debug!(self.log, "{}: System halt requested from breakpoint", self.label);
            self.ebreak = false;
            return Tick::Halt;
        }
        if self.reset_level {
            return Tick::Cycles(1);
        }
        let acknowledge = self.is_int || self.is_nmi;
        if self.tx == Cycle::T1 && !acknowledge {
            if !self.check_monitor() {
                debug!(self.log, "{}: System halt requested from monitor", self.label);
                return Tick::Halt;
            }
            self.system_breakpoint();
        }
        let result = if acknowledge { self.m1_cycle_interrupt() } else { self.m1_cycle() };
        match result {
            Ok(cycles) => Tick::Cycles(cycles),
            Err(e) => {
                error!(self.log, "{}", e);
                self.fault = Some(e);
                Tick::Halt
            }
        }
    }
}

impl fmt::Display for Z80 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.status()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testbench::*;

    #[test]
    fn scenario_ld_a_immediate() {
        let mut tb = TestBench::new(&[0x3E, 0x42]);
        let cycles = tb.step();
        assert_eq!(cycles, 7);
        assert_eq!(tb.cpu.regs.a, 0x42);
        assert_eq!(tb.cpu.regs.pc, 2);
        assert!(tb.ram.borrow().writes.is_empty());
    }

    #[test]
    fn scenario_ld_nn_a() {
        let mut tb = TestBench::new(&[0x32, 0x00, 0x80]);
        tb.cpu.regs.a = 0x99;
        assert_eq!(tb.step(), 13);
        assert_eq!(tb.ram.borrow().writes, vec![(0x8000, 0x99)]);
        assert_eq!(tb.cpu.regs.memptr, 0x9901);
        assert_eq!(tb.cpu.regs.pc, 3);
    }

    #[test]
    fn scenario_im1_interrupt() {
        // IM 1; EI; NOP; NOP
        let mut tb = TestBench::new(&[0xED, 0x56, 0xFB, 0x00, 0x00]);
        tb.cpu.regs.sp = 0xF000;
        tb.step();
        tb.step();
        tb.cpu.int_pin(true);
        assert_eq!(tb.step(), 4);
        tb.ram.borrow_mut().writes.clear();
        assert!(tb.cpu.is_int);
        assert_eq!(tb.step(), 17);
        assert_eq!(tb.cpu.regs.pc, IRQ_ADDR);
        assert_eq!(tb.cpu.regs.sp, 0xEFFE);
        assert_eq!(tb.ram.borrow().writes, vec![(0xEFFF, 0x00), (0xEFFE, 0x04)]);
        assert_eq!(tb.cpu.iff(), (false, false));
    }

    #[test]
    fn ei_delays_interrupts_by_one_instruction() {
        // EI; NOP
        let mut tb = TestBench::new(&[0xFB, 0x00, 0x00]);
        tb.cpu.regs.sp = 0xF000;
        tb.cpu.imode = IMode::IM1;
        tb.cpu.int_pin(true);
        tb.step();
        assert!(!tb.cpu.is_int);
        assert_eq!(tb.cpu.regs.pc, 1);
        tb.step();
        assert!(tb.cpu.is_int);
        tb.step();
        assert_eq!(tb.cpu.regs.pc, IRQ_ADDR);
        assert_eq!(tb.cpu.read16(tb.cpu.regs.sp), 0x0002);
    }

    #[test]
    fn prefixed_ei_does_not_delay_interrupts() {
        // DD EI; NOP: only a bare $FB counts as EI for the delay
        let mut tb = TestBench::new(&[0xDD, 0xFB, 0x00]);
        tb.cpu.regs.sp = 0xF000;
        tb.cpu.imode = IMode::IM1;
        tb.cpu.int_pin(true);
        assert_eq!(tb.step(), 8);
        assert!(tb.cpu.is_int);
        tb.step();
        assert_eq!(tb.cpu.regs.pc, IRQ_ADDR);
        assert_eq!(tb.cpu.read16(tb.cpu.regs.sp), 0x0002);
    }

    #[test]
    fn nmi_wins_over_int() {
        // EI; NOP; NOP...   handler at $0066: RETN
        let mut prog = vec![0x00u8; 0x70];
        prog[0] = 0xFB;
        prog[0x66] = 0xED;
        prog[0x67] = 0x45;
        let mut tb = TestBench::new(&prog);
        tb.cpu.regs.sp = 0xF000;
        tb.cpu.imode = IMode::IM1;
        tb.step();
        tb.cpu.int_pin(true);
        tb.cpu.nmi_pin(true);
        tb.step();
        assert!(tb.cpu.is_nmi && !tb.cpu.is_int);
        assert_eq!(tb.step(), 17);
        assert_eq!(tb.cpu.regs.pc, NMI_ADDR);
        assert_eq!(tb.cpu.iff(), (false, true));
        // INT stays pending but is masked until RETN restores IFF1
        tb.step();
        assert_eq!(tb.cpu.regs.pc, 2);
        assert_eq!(tb.cpu.iff(), (true, true));
        assert!(tb.cpu.is_int);
        tb.step();
        assert_eq!(tb.cpu.regs.pc, IRQ_ADDR);
    }

    #[test]
    fn nmi_is_edge_triggered() {
        let mut tb = TestBench::new(&[0x00; 0x70]);
        tb.cpu.regs.sp = 0xF000;
        tb.cpu.nmi_pin(true);
        tb.step();
        tb.step();
        assert_eq!(tb.cpu.regs.pc, NMI_ADDR);
        // still held: no second NMI
        tb.step();
        assert_eq!(tb.cpu.regs.pc, NMI_ADDR + 1);
    }

    #[test]
    fn halt_until_interrupt() {
        // IM 2 with I=$80 and vector $10: table entry at $8010 -> $1234
        let mut tb = TestBench::new(&[0xED, 0x5E, 0xFB, 0x76, 0x00]);
        tb.poke(0x8010, &[0x34, 0x12]);
        tb.cpu.regs.sp = 0xF000;
        tb.cpu.regs.i = 0x80;
        let halts = tb.watch(Pin::Halt);
        tb.step();
        tb.step();
        tb.step();
        assert!(tb.cpu.is_halted());
        assert_eq!(tb.cpu.regs.pc, 4);
        for _ in 0..10 {
            assert_eq!(tb.step(), 4);
            assert_eq!(tb.cpu.regs.pc, 4);
        }
        tb.cpu.mmap.set_databus(0x10);
        tb.cpu.int_pin(true);
        tb.step();
        assert_eq!(tb.step(), 19);
        assert!(!tb.cpu.is_halted());
        assert_eq!(tb.cpu.regs.pc, 0x1234);
        assert_eq!(tb.cpu.regs.memptr, 0x1234);
        assert_eq!(tb.cpu.read16(tb.cpu.regs.sp), 0x0004);
        assert_eq!(*halts.borrow(), vec![true, false]);
    }

    #[test]
    fn im0_executes_data_bus_opcode() {
        let mut tb = TestBench::new(&[0xFB, 0x00, 0x00]);
        tb.cpu.regs.sp = 0xF000;
        tb.step();
        tb.cpu.int_pin(true);
        tb.step();
        // the device drives the vector after the last opcode fetch
        tb.cpu.mmap.set_databus(0xD7); // RST $10
        assert_eq!(tb.step(), 11);
        assert_eq!(tb.cpu.regs.pc, 0x0010);
        assert_eq!(tb.cpu.read16(tb.cpu.regs.sp), 0x0002);
    }

    #[test]
    fn im0_rejects_multibyte_vector() {
        let mut tb = TestBench::new(&[0xFB, 0x00, 0x00]);
        tb.cpu.regs.sp = 0xF000;
        tb.step();
        tb.cpu.int_pin(true);
        tb.step();
        tb.cpu.mmap.set_databus(0xCD); // CALL nn
        assert_eq!(tb.step(), 4);
        assert_eq!(tb.cpu.regs.pc, 2);
        assert_eq!(tb.cpu.regs.sp, 0xF000);
        assert!(tb.cpu.fault().is_none());
        assert_eq!(
            tb.cpu.execute(0x3E, true).err().map(|e| e.kind),
            Some(ErrorKind::ForcedOpcode)
        );
    }

    #[test]
    fn refresh_register_counts_prefixes() {
        // NOP; CB: RLC B; DD: LD IX,nn; DD CB: RLC (IX+0); ED: NEG
        let mut tb = TestBench::new(&[0x00, 0xCB, 0x00, 0xDD, 0x21, 0, 0, 0xDD, 0xCB, 0x00, 0x06, 0xED, 0x44]);
        tb.cpu.regs.r = 0x80;
        tb.step();
        assert_eq!(tb.cpu.regs.r, 0x81);
        tb.step();
        assert_eq!(tb.cpu.regs.r, 0x83);
        tb.step();
        assert_eq!(tb.cpu.regs.r, 0x85);
        tb.step();
        assert_eq!(tb.cpu.regs.r, 0x87);
        tb.step();
        assert_eq!(tb.cpu.regs.r, 0x89);
        assert_eq!(tb.cpu.regs.pc, 13);
    }

    #[test]
    fn wait_stretches_t2() {
        let mut tb = TestBench::new(&[0x00]);
        let clk = tb.clk;
        assert_eq!(tb.cpu.tick(&clk), Tick::Cycles(1));
        tb.cpu.wait_pin(true);
        for _ in 0..3 {
            assert_eq!(tb.cpu.tick(&clk), Tick::Cycles(1));
            assert_eq!(tb.cpu.cycle(), Cycle::T2);
        }
        tb.cpu.wait_pin(false);
        tb.cpu.tick(&clk);
        assert_eq!(tb.cpu.cycle(), Cycle::T3);
    }

    #[test]
    fn pins_follow_the_bus_cycle() {
        let mut tb = TestBench::new(&[0xDB, 0x10]); // IN A,($10)
        let m1 = tb.watch(Pin::M1);
        let rfsh = tb.watch(Pin::Rfsh);
        let iorq = tb.watch(Pin::Iorq);
        tb.step();
        assert_eq!(*m1.borrow(), vec![true, false]);
        assert_eq!(*rfsh.borrow(), vec![true]);
        assert_eq!(*iorq.borrow(), vec![true, false]);
    }

    #[test]
    fn reset_pin_holds_the_cpu() {
        let mut tb = TestBench::new(&[0x3E, 0x42]);
        tb.cpu.regs.pc = 0x1234;
        tb.cpu.reset_pin(true);
        assert_eq!(tb.cpu.regs.pc, 0);
        let clk = tb.clk;
        for _ in 0..5 {
            assert_eq!(tb.cpu.tick(&clk), Tick::Cycles(1));
        }
        assert_eq!(tb.cpu.regs.a, 0xFF);
        tb.cpu.reset_pin(false);
        tb.step();
        assert_eq!(tb.cpu.regs.a, 0x42);
    }

    #[test]
    fn system_breakpoints_fire_at_boundaries() {
        let mut tb = TestBench::new(&[0x00, 0x00, 0x00]);
        let hits = Rc::new(std::cell::RefCell::new(0));
        let h = hits.clone();
        tb.cpu.bpadd(0x0001, move |cpu| {
            *h.borrow_mut() += 1;
            cpu.regs.a = 0x11;
        });
        tb.step();
        tb.step();
        tb.step();
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(tb.cpu.regs.a, 0x11);
        tb.cpu.bpdel(0x0001);
        tb.cpu.regs.pc = 1;
        tb.step();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn breakpoint_callback_removes_itself() {
        let mut tb = TestBench::new(&[0x00, 0x00]);
        let hits = Rc::new(std::cell::RefCell::new(0));
        let h = hits.clone();
        tb.cpu.bpadd(0x0000, move |cpu| {
            *h.borrow_mut() += 1;
            cpu.bpdel(0x0000);
        });
        tb.step();
        tb.cpu.regs.pc = 0;
        tb.step();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn breakpoint_callback_replaces_itself() {
        let mut tb = TestBench::new(&[0x00, 0x00]);
        let seen = Rc::new(std::cell::RefCell::new(vec![]));
        let s = seen.clone();
        tb.cpu.bpadd(0x0000, move |cpu| {
            s.borrow_mut().push(1);
            let s2 = s.clone();
            cpu.bpadd(0x0000, move |_| s2.borrow_mut().push(2));
        });
        tb.step();
        tb.cpu.regs.pc = 0;
        tb.step();
        tb.cpu.regs.pc = 0;
        tb.step();
        assert_eq!(*seen.borrow(), vec![1, 2, 2]);
    }

    #[test]
    fn ebreak_without_monitor_halts() {
        let mut tb = TestBench::new(&[0x00]);
        tb.cpu.ebreak();
        let clk = tb.clk;
        assert_eq!(tb.cpu.tick(&clk), Tick::Halt);
        assert_eq!(tb.cpu.tick(&clk), Tick::Cycles(1));
    }

    #[test]
    fn decode_path_display() {
        let mut p = DecodePath::new(0xDD);
        assert!(p.push(Table::Ix, 0xCB));
        assert!(p.push(Table::IxBit, 0x46));
        assert!(!p.push(Table::Base, 0));
        assert_eq!(p.to_string(), "base:$DD -> ix:$CB -> ixbit:$46");
    }
}
