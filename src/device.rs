//! Devices that can be mapped into an [`AddressSpace`](crate::aspace::AddressSpace).
use super::*;
use std::cell::RefCell;
use std::rc::Rc;

/// How a device read is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// normal bus read; the device may react (auto-increment registers etc.)
    Read,
    /// side-effect free read used by debuggers and the disassembler
    Peek,
}

/// Anything that answers bus cycles. Addresses are device relative.
pub trait Device {
    fn read(&mut self, addr: u16, mode: ReadMode) -> u8;
    fn write(&mut self, addr: u16, value: u8);
    fn size(&self) -> usize;
    fn label(&self) -> &str { "" }
}

pub type DevPtr = Rc<RefCell<dyn Device>>;

/// Wrap a device so it can be shared by several mappings.
pub fn shared<D: Device + 'static>(dev: D) -> DevPtr { Rc::new(RefCell::new(dev)) }

/// Plain read/write memory.
pub struct DeviceRam {
    label: String,
    data: Vec<u8>,
}

impl DeviceRam {
    pub fn new(label: &str, size: usize) -> Self {
        DeviceRam {
            label: label.to_string(),
            data: vec![0; size],
        }
    }

    /// Copy `bytes` into the device starting at `addr`.
    pub fn load(&mut self, addr: usize, bytes: &[u8]) -> Result<(), Error> {
        let end = addr + bytes.len();
        if end > self.data.len() {
            return Err(general_err!(
                "{}: image of {} bytes at ${:04X} does not fit ({} bytes)",
                self.label,
                bytes.len(),
                addr,
                self.data.len()
            ));
        }
        self.data[addr..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] { &self.data }
}

impl Device for DeviceRam {
    fn read(&mut self, addr: u16, _mode: ReadMode) -> u8 { self.data[addr as usize] }
    fn write(&mut self, addr: u16, value: u8) { self.data[addr as usize] = value }
    fn size(&self) -> usize { self.data.len() }
    fn label(&self) -> &str { &self.label }
}

/// Read-only memory. Writes are ignored and reported.
pub struct DeviceRom {
    label: String,
    data: Vec<u8>,
    log: logger::Logger,
}

impl DeviceRom {
    /// Build a ROM of exactly `size` bytes; a shorter image is padded with $FF.
    pub fn new(label: &str, image: &[u8], size: usize, log: logger::Logger) -> Result<Self, Error> {
        if image.len() > size {
            return Err(config_err!("{}: image is {} bytes but the ROM is {} bytes", label, image.len(), size));
        }
        let mut data = image.to_vec();
        data.resize(size, 0xFF);
        Ok(DeviceRom {
            label: label.to_string(),
            data,
            log,
        })
    }

    pub fn from_file(label: &str, fname: &str, size: usize, log: logger::Logger) -> Result<Self, Error> {
        let image = std::fs::read(fname)?;
        DeviceRom::new(label, &image, size, log)
    }
}

impl Device for DeviceRom {
    fn read(&mut self, addr: u16, _mode: ReadMode) -> u8 { self.data[addr as usize] }
    fn write(&mut self, addr: u16, value: u8) {
        warn!(self.log, "{}: Write attempt: addr ${:04X}, value ${:02X}", self.label, addr, value);
    }
    fn size(&self) -> usize { self.data.len() }
    fn label(&self) -> &str { &self.label }
}

/// Open bus: reads float high, writes vanish.
pub struct DeviceNone {
    size: usize,
}

impl DeviceNone {
    pub fn new(size: usize) -> Self { DeviceNone { size } }
}

impl Device for DeviceNone {
    fn read(&mut self, _addr: u16, _mode: ReadMode) -> u8 { 0xFF }
    fn write(&mut self, _addr: u16, _value: u8) {}
    fn size(&self) -> usize { self.size }
    fn label(&self) -> &str { "none" }
}
