//! Test fixture: a Z80 wired to 64K of RAM that records every bus write and
//! a 256 port I/O space.
use super::*;
use crate::aspace::{AddressSpace, DevMap};
use crate::clock::{ClockInfo, Clockable, Tick};
use crate::device::{Device, ReadMode};
use crate::z80::{Pin, Z80};
use std::cell::RefCell;
use std::rc::Rc;

pub struct RecordingRam {
    pub data: Vec<u8>,
    pub writes: Vec<(u16, u8)>,
}

impl RecordingRam {
    pub fn new(size: usize) -> RecordingRam {
        RecordingRam {
            data: vec![0; size],
            writes: vec![],
        }
    }
}

impl Device for RecordingRam {
    fn read(&mut self, addr: u16, _mode: ReadMode) -> u8 { self.data[addr as usize] }
    fn write(&mut self, addr: u16, value: u8) {
        self.writes.push((addr, value));
        self.data[addr as usize] = value;
    }
    fn size(&self) -> usize { self.data.len() }
    fn label(&self) -> &str { "recording-ram" }
}

pub struct TestBench {
    pub cpu: Z80,
    pub ram: Rc<RefCell<RecordingRam>>,
    pub ports: Rc<RefCell<RecordingRam>>,
    pub clk: ClockInfo,
}

impl TestBench {
    /// Program loaded at 0, PC at 0.
    pub fn new(program: &[u8]) -> TestBench { TestBench::at(0, program) }

    /// Program loaded at `addr` with PC pointing at it.
    pub fn at(addr: u16, program: &[u8]) -> TestBench {
        let ram = Rc::new(RefCell::new(RecordingRam::new(0x10000)));
        let ports = Rc::new(RefCell::new(RecordingRam::new(0x100)));
        {
            let mut r = ram.borrow_mut();
            for (i, b) in program.iter().enumerate() {
                r.data[addr.wrapping_add(i as u16) as usize] = *b;
            }
        }
        let ram_dev: device::DevPtr = ram.clone();
        let port_dev: device::DevPtr = ports.clone();
        let mmap = AddressSpace::symmetric(vec![DevMap::new(&ram_dev, 0)], 0xFFFF).unwrap();
        let io = AddressSpace::symmetric(vec![DevMap::new(&port_dev, 0)], 0x00FF).unwrap();
        let mut cpu = Z80::new("cpu", Rc::new(mmap), Rc::new(io), logger::Logger::silent());
        cpu.regs.pc = addr;
        TestBench {
            cpu,
            ram,
            ports,
            clk: ClockInfo {
                freq: 4_000_000,
                cycle: 0,
            },
        }
    }

    /// Run one instruction (or interrupt acknowledge) to the next T1 and
    /// return the cycles it took.
    pub fn step(&mut self) -> usize {
        let mut cycles = 0;
        loop {
            match self.cpu.tick(&self.clk) {
                Tick::Cycles(n) => {
                    cycles += n;
                    self.clk.cycle += n as u64;
                }
                Tick::Halt => break,
            }
            if self.cpu.at_boundary() {
                break;
            }
        }
        cycles
    }

    /// Store bytes without recording them as bus writes.
    pub fn poke(&mut self, addr: u16, bytes: &[u8]) {
        let mut r = self.ram.borrow_mut();
        for (i, b) in bytes.iter().enumerate() {
            r.data[addr.wrapping_add(i as u16) as usize] = *b;
        }
    }

    /// Collect every level change of `pin`.
    pub fn watch(&mut self, pin: Pin) -> Rc<RefCell<Vec<bool>>> {
        let seen = Rc::new(RefCell::new(vec![]));
        let sink = seen.clone();
        self.cpu.set_listener(pin, move |level| sink.borrow_mut().push(level));
        seen
    }
}
