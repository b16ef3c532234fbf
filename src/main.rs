//! # z80: run a raw Z80 image on the cycle-accurate core.
//!
//! ## Getting Started
//! Load a binary at address 0 and run it at 4MHz until it halts:
//! ```
//! cargo run -- --exit-on-halt /path/to/program.bin
//! ```
//! With a ROM shadowing the first 16K and a conditional breakpoint:
//! ```
//! z80 --rom boot.rom --rom-size 0x4000 --break '$8010 ra >= 80' program.bin
//! ```
//! ## Options
//! Help for command line options is available using -h or --help.
mod config;
use config::ARGS;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use z80core::*;
use z80core::{green, info};

/// Lines of disassembly printed by --dump.
const DUMP_LINES: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        println!("{}", e);
        return Err(Box::new(e));
    }
    Ok(())
}

/// Prints the CPU state at every breakpoint and carries on.
struct Tracer;

impl StepController for Tracer {
    fn on_break(&mut self, cpu: &mut dyn MonitoredCpu, _bps: &mut Breakpoints) -> Resume {
        println!("{} {} at ${:04X}", green!("Breakpoint"), cpu.label(), cpu.pc());
        println!("{}", cpu.status());
        Resume::Go
    }
}

/// 64K of RAM holding `image` at `load_addr`. With a ROM the space is split
/// into banks of `bank_size` and the ROM answers reads of the first bank.
fn memory_map(image: &[u8], load_addr: u16, rom: Option<DevPtr>, bank_size: usize) -> Result<AddressSpace, Error> {
    let mut ram = DeviceRam::new("ram", 0x10000);
    ram.load(load_addr as usize, image)?;
    let ram = device::shared(ram);
    let Some(rom) = rom else {
        return AddressSpace::symmetric(vec![DevMap::new(&ram, 0)], 0xFFFF);
    };
    if bank_size == 0 || bank_size > 0x10000 || !bank_size.is_power_of_two() {
        return Err(Error::new(
            ErrorKind::Config,
            None,
            format!("ROM size ${:X} must be a power of two no larger than 64K", bank_size).as_str(),
        ));
    }
    let wmaps: Vec<DevMap> = (0..0x10000 / bank_size)
        .map(|bank| DevMap::new(&ram, (bank * bank_size) as u16))
        .collect();
    let mut rmaps = wmaps.clone();
    rmaps[0] = DevMap::new(&rom, 0);
    AddressSpace::new(rmaps, wmaps, 0xFFFF)
}

/// CPU with an open-bus port space on top of `mmap`.
fn machine(mmap: AddressSpace, log: &logger::Logger) -> Result<Z80, Error> {
    let ports = device::shared(DeviceNone::new(0x100));
    let io = AddressSpace::symmetric(vec![DevMap::new(&ports, 0)], 0x00FF)?;
    Ok(Z80::new("z80", Rc::new(mmap), Rc::new(io), log.clone()))
}

/// run wires the machine described by the command line and clocks it until
/// it stops
fn run() -> Result<(), Error> {
    let log = logger::default_logger();
    log.set_loglevel(&config::loglevel())?;
    if let Some(fname) = &ARGS.logfile {
        log.set_logfile(fname)?;
    }
    let image = std::fs::read(&ARGS.file)?;
    info!(log, "Loaded {} ({} bytes) at ${:04X}", ARGS.file, image.len(), ARGS.load_addr);
    let rom = match &ARGS.rom {
        Some(fname) => Some(device::shared(DeviceRom::from_file("rom", fname, ARGS.rom_size, log.clone())?)),
        None => None,
    };
    let mmap = memory_map(&image, ARGS.load_addr, rom, ARGS.rom_size)?;
    info!(log, "Memory map:\n{}", mmap);
    let mut cpu = machine(mmap, &log)?;
    if let Some(pc) = ARGS.start {
        cpu.regs_mut().pc = pc;
    }
    let mut clock = Clock::new("main", ARGS.freq, ARGS.delay, log.clone())?;

    if ARGS.break_start || !ARGS.breakpoints.is_empty() {
        cpu.init_monitor(Monitor::new(Box::new(Tracer), log.clone()));
        if let Some(monitor) = cpu.monitor_mut() {
            let bps = monitor.breakpoints_mut();
            if !ARGS.break_start {
                bps.clear();
            }
            for spec in &ARGS.breakpoints {
                let addr = bps.add_str(spec)?;
                info!(log, "Breakpoint set at ${:04X}", addr);
            }
        }
    }
    if ARGS.exit_on_halt {
        let handle = clock.handle();
        cpu.set_listener(Pin::Halt, move |halted| {
            if halted {
                handle.stop()
            }
        });
    }

    let cpu = Rc::new(RefCell::new(cpu));
    clock.add(cpu.clone());
    info!(log, "Executing {} at {}Hz", ARGS.file, ARGS.freq);
    let start = Instant::now();
    clock.run();
    let cpu = cpu.borrow();
    info!(log, "{} instructions in {:.3}s", cpu.executed(), start.elapsed().as_secs_f32());
    if ARGS.dump {
        println!("{}", cpu.status());
        for line in cpu.disass_range(cpu.regs().pc, DUMP_LINES, true) {
            println!("{}", line);
        }
    }
    match cpu.fault() {
        Some(e) => Err(Error::new(e.kind, e.ctx, &e.msg)),
        None => Ok(()),
    }
}
