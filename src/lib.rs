//! # A cycle-accurate Z80 core written in Rust.
//!
//! The pieces fit together like this:
//! - devices ([`device`]) are mapped into 64K address spaces ([`aspace`]),
//!   one for memory and one for I/O ports
//! - a [`Z80`] runs on those spaces, one T-state group per tick
//! - a [`Clock`] drives any number of [`Clockable`]s and paces them to
//!   real time
//! - an optional [`Monitor`] breaks into execution at addresses or on
//!   conditions
//!
//! ```no_run
//! use std::{cell::RefCell, rc::Rc};
//! use z80core::*;
//!
//! let log = logger::default_logger();
//! let ram = device::shared(DeviceRam::new("ram", 0x10000));
//! let ports = device::shared(DeviceNone::new(0x100));
//! let mmap = AddressSpace::symmetric(vec![DevMap::new(&ram, 0)], 0xFFFF).unwrap();
//! let io = AddressSpace::symmetric(vec![DevMap::new(&ports, 0)], 0x00FF).unwrap();
//! let cpu = Rc::new(RefCell::new(Z80::new("cpu", Rc::new(mmap), Rc::new(io), log.clone())));
//! let mut clock = Clock::new("main", 4_000_000, 1.0, log).unwrap();
//! clock.add(cpu);
//! clock.run();
//! ```
#[macro_use]
mod macros;
mod alu;
pub mod aspace;
pub mod clock;
pub mod device;
pub mod disass;
pub mod error;
pub mod instructions;
pub mod logger;
pub mod monitor;
mod ops;
pub mod registers;
#[cfg(test)]
mod testbench;
pub mod z80;

pub(crate) use lazy_static::lazy_static;

pub use crate::aspace::{AddressSpace, DevMap};
pub use crate::clock::{Clock, ClockHandle, ClockInfo, Clockable, ClockablePtr, Status, Tick};
pub use crate::device::{DevPtr, Device, DeviceNone, DeviceRam, DeviceRom, ReadMode};
pub use crate::error::{Error, ErrorKind};
pub use crate::monitor::{Breakpoints, Condition, Monitor, MonitoredCpu, Resume, StepController};
pub use crate::registers::Registers;
pub use crate::z80::{IMode, Pin, Z80};
