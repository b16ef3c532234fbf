//! Banked 16-bit address space.
//!
//! The 64K range is split into a power-of-two number of equally sized banks.
//! Every bank is bound to one device plus an offset inside that device, with
//! separate maps for reads and writes (so ROM can shadow RAM). Incoming
//! addresses are first masked with `amask` and then split into bank and
//! bank-relative offset.
use super::*;
use crate::device::{DevPtr, ReadMode};
use std::cell::{Cell, RefCell};

/// One bank binding: the device answering the bank and where inside it the
/// bank starts.
#[derive(Clone)]
pub struct DevMap {
    pub dev: DevPtr,
    pub offset: u16,
}

impl DevMap {
    pub fn new(dev: &DevPtr, offset: u16) -> DevMap {
        DevMap {
            dev: dev.clone(),
            offset,
        }
    }
}

struct Mappings {
    amask: u16,
    bank_shift: u32,
    bank_mask: u16,
    rmaps: Vec<DevMap>,
    wmaps: Vec<DevMap>,
}

impl Mappings {
    fn build(rmaps: Vec<DevMap>, wmaps: Vec<DevMap>, amask: u16) -> Result<Mappings, Error> {
        let banks = rmaps.len();
        if banks != wmaps.len() {
            return Err(config_err!(
                "AddressSpace: read and write maps differ in size: {} != {}",
                banks,
                wmaps.len()
            ));
        }
        if banks == 0 || banks > 0x10000 || !banks.is_power_of_two() {
            return Err(config_err!(
                "AddressSpace: {} banks do not split 64K into power-of-two sized banks",
                banks
            ));
        }
        let bank_size = 0x10000 / banks;
        let bank_shift = bank_size.trailing_zeros();
        let bank_mask = (bank_size - 1) as u16;
        // only the addresses amask lets through can ever reach a device
        let span = (bank_mask & amask) as usize + 1;
        for (what, maps) in [("read", &rmaps), ("write", &wmaps)] {
            for (bank, m) in maps.iter().enumerate() {
                // device addresses are 16 bits wide, so a bank never reaches
                // past $FFFF even inside a larger device
                let size = m.dev.borrow().size().min(0x10000);
                if m.offset as usize + span > size {
                    return Err(config_err!(
                        "AddressSpace: {} bank {} maps offset ${:04X} + ${:X} beyond device \"{}\" (size ${:X})",
                        what,
                        bank,
                        m.offset,
                        span,
                        m.dev.borrow().label(),
                        size
                    ));
                }
            }
        }
        Ok(Mappings {
            amask,
            bank_shift,
            bank_mask,
            rmaps,
            wmaps,
        })
    }

    #[inline]
    fn decode(&self, addr: u16) -> (usize, u16) {
        let masked = addr & self.amask;
        ((masked as u32 >> self.bank_shift) as usize, masked & self.bank_mask)
    }
}

pub struct AddressSpace {
    maps: RefCell<Mappings>,
    data_bus: Cell<u8>,
}

impl AddressSpace {
    pub fn new(rmaps: Vec<DevMap>, wmaps: Vec<DevMap>, amask: u16) -> Result<AddressSpace, Error> {
        Ok(AddressSpace {
            maps: RefCell::new(Mappings::build(rmaps, wmaps, amask)?),
            data_bus: Cell::new(0),
        })
    }

    /// Same device for reads and writes in every bank.
    pub fn symmetric(maps: Vec<DevMap>, amask: u16) -> Result<AddressSpace, Error> {
        AddressSpace::new(maps.clone(), maps, amask)
    }

    /// Replace both mappings and the address mask in one step. On error the
    /// previous mapping stays in place.
    pub fn reset(&self, rmaps: Vec<DevMap>, wmaps: Vec<DevMap>, amask: u16) -> Result<(), Error> {
        let maps = Mappings::build(rmaps, wmaps, amask)?;
        *self.maps.borrow_mut() = maps;
        Ok(())
    }

    fn resolve(&self, addr: u16, write: bool) -> (DevPtr, u16) {
        let maps = self.maps.borrow();
        let (bank, rel) = maps.decode(addr);
        let m = if write { &maps.wmaps[bank] } else { &maps.rmaps[bank] };
        // the mapping borrow ends here so a device may remap us from inside
        (m.dev.clone(), rel.wrapping_add(m.offset))
    }

    pub fn read(&self, addr: u16) -> u8 { self.read_mode(addr, ReadMode::Read) }

    pub fn read_mode(&self, addr: u16, mode: ReadMode) -> u8 {
        let (dev, daddr) = self.resolve(addr, false);
        let value = dev.borrow_mut().read(daddr, mode);
        self.data_bus.set(value);
        value
    }

    /// Side-effect free read. Leaves the data bus latch alone.
    pub fn peek(&self, addr: u16) -> u8 {
        let (dev, daddr) = self.resolve(addr, false);
        let value = dev.borrow_mut().read(daddr, ReadMode::Peek);
        value
    }

    pub fn write(&self, addr: u16, value: u8) {
        let (dev, daddr) = self.resolve(addr, true);
        dev.borrow_mut().write(daddr, value);
        self.data_bus.set(value);
    }

    /// Little-endian 16-bit peek, used by debuggers.
    pub fn peek16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.peek(addr), self.peek(addr.wrapping_add(1))])
    }

    pub fn databus(&self) -> u8 { self.data_bus.get() }
    /// Drive the data bus, e.g. an interrupting device placing its vector.
    pub fn set_databus(&self, value: u8) { self.data_bus.set(value) }

    pub fn amask(&self) -> u16 { self.maps.borrow().amask }
    pub fn banks(&self) -> usize { self.maps.borrow().rmaps.len() }
    pub fn bank_size(&self) -> usize { self.maps.borrow().bank_mask as usize + 1 }
}

impl std::fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let maps = self.maps.borrow();
        let bsize = maps.bank_mask as usize + 1;
        writeln!(f, "amask ${:04X}, {} banks of ${:X} bytes", maps.amask, maps.rmaps.len(), bsize)?;
        for (bank, (r, w)) in maps.rmaps.iter().zip(maps.wmaps.iter()).enumerate() {
            let start = bank * bsize;
            writeln!(
                f,
                "  ${:04X}-${:04X}  R: {:<10} +${:04X}  W: {:<10} +${:04X}",
                start,
                start + bsize - 1,
                r.dev.borrow().label(),
                r.offset,
                w.dev.borrow().label(),
                w.offset
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{shared, Device, DeviceNone, DeviceRam};
    use std::rc::Rc;

    /// Reports its id in reads and remembers the last device address seen.
    struct Tag {
        id: u8,
        size: usize,
        last: Option<u16>,
        writes: Vec<(u16, u8)>,
    }
    impl Device for Tag {
        fn read(&mut self, addr: u16, _mode: ReadMode) -> u8 {
            self.last = Some(addr);
            self.id
        }
        fn write(&mut self, addr: u16, value: u8) { self.writes.push((addr, value)) }
        fn size(&self) -> usize { self.size }
    }

    fn tag(id: u8, size: usize) -> Rc<RefCell<Tag>> {
        Rc::new(RefCell::new(Tag {
            id,
            size,
            last: None,
            writes: vec![],
        }))
    }

    #[test]
    fn every_address_routes_to_one_bank() -> Result<(), Error> {
        let tags: Vec<_> = (0..4).map(|i| tag(i, 0x4000)).collect();
        let maps: Vec<DevMap> = tags
            .iter()
            .map(|t| {
                let d: DevPtr = t.clone();
                DevMap::new(&d, 0)
            })
            .collect();
        let aspace = AddressSpace::symmetric(maps, 0xFFFF)?;
        for addr in 0..=0xFFFFu16 {
            let bank = (addr >> 14) as usize;
            assert_eq!(aspace.read(addr), bank as u8);
            assert_eq!(tags[bank].borrow().last, Some(addr & 0x3FFF));
            assert_eq!(aspace.databus(), bank as u8);
        }
        aspace.write(0xC001, 0x5A);
        assert_eq!(tags[3].borrow().writes, vec![(0x0001, 0x5A)]);
        assert_eq!(aspace.databus(), 0x5A);
        Ok(())
    }

    #[test]
    fn offsets_apply_per_bank() -> Result<(), Error> {
        // one 32K device in banks 1 and 6 of eight, at different offsets
        let ram = Rc::new(RefCell::new(DeviceRam::new("ram", 0x8000)));
        ram.borrow_mut().load(0x0000, &[0x11])?;
        ram.borrow_mut().load(0x4000, &[0x22])?;
        let dev: DevPtr = ram.clone();
        let none = shared(crate::device::DeviceNone::new(0x2000));
        let mut maps: Vec<DevMap> = (0..8).map(|_| DevMap::new(&none, 0)).collect();
        maps[1] = DevMap::new(&dev, 0x0000);
        maps[6] = DevMap::new(&dev, 0x4000);
        let aspace = AddressSpace::symmetric(maps, 0xFFFF)?;
        assert_eq!(aspace.read(0x2000), 0x11);
        assert_eq!(aspace.read(0xC000), 0x22);
        assert_eq!(aspace.read(0x0000), 0xFF);
        aspace.write(0xC001, 0x33);
        assert_eq!(ram.borrow().bytes()[0x4001], 0x33);
        Ok(())
    }

    #[test]
    fn rejects_bad_mappings() {
        let ram = shared(DeviceRam::new("ram", 0x4000));
        let four: Vec<DevMap> = (0..4).map(|_| DevMap::new(&ram, 0)).collect();
        let three: Vec<DevMap> = (0..3).map(|_| DevMap::new(&ram, 0)).collect();
        let kind = |r: Result<AddressSpace, Error>| r.err().map(|e| e.kind);
        assert_eq!(kind(AddressSpace::new(four.clone(), three.clone(), 0xFFFF)), Some(ErrorKind::Config));
        assert_eq!(kind(AddressSpace::symmetric(three, 0xFFFF)), Some(ErrorKind::Config));
        assert_eq!(kind(AddressSpace::symmetric(vec![], 0xFFFF)), Some(ErrorKind::Config));
        // a 16K device cannot back a 16K bank starting at offset 1
        let shifted: Vec<DevMap> = (0..4).map(|_| DevMap::new(&ram, 1)).collect();
        assert_eq!(kind(AddressSpace::symmetric(shifted, 0xFFFF)), Some(ErrorKind::Config));
        assert!(AddressSpace::symmetric(four, 0xFFFF).is_ok());
        // a 128K device still only answers 16-bit device addresses
        let big = shared(DeviceNone::new(0x20000));
        let past_end: Vec<DevMap> = (0..4).map(|_| DevMap::new(&big, 0xE000)).collect();
        assert_eq!(kind(AddressSpace::symmetric(past_end, 0xFFFF)), Some(ErrorKind::Config));
        let at_end: Vec<DevMap> = (0..4).map(|_| DevMap::new(&big, 0xC000)).collect();
        assert!(AddressSpace::symmetric(at_end, 0xFFFF).is_ok());
    }

    #[test]
    fn failed_reset_keeps_old_mapping() -> Result<(), Error> {
        let a = tag(0xAA, 0x10000);
        let da: DevPtr = a.clone();
        let aspace = AddressSpace::symmetric(vec![DevMap::new(&da, 0)], 0xFFFF)?;
        assert!(aspace.reset(vec![DevMap::new(&da, 0)], vec![], 0xFFFF).is_err());
        assert_eq!(aspace.read(0x1234), 0xAA);
        Ok(())
    }

    #[test]
    fn narrow_mask_for_ports() -> Result<(), Error> {
        let ports = tag(0x77, 0x100);
        let dp: DevPtr = ports.clone();
        let io = AddressSpace::symmetric(vec![DevMap::new(&dp, 0)], 0x00FF)?;
        assert_eq!(io.read(0x12FE), 0x77);
        assert_eq!(ports.borrow().last, Some(0x00FE));
        io.write(0xFF10, 1);
        assert_eq!(ports.borrow().writes, vec![(0x0010, 1)]);
        Ok(())
    }

    #[test]
    fn peek_matches_read() -> Result<(), Error> {
        let ram = Rc::new(RefCell::new(DeviceRam::new("ram", 0x10000)));
        let bytes: Vec<u8> = (0..=255u8).collect();
        ram.borrow_mut().load(0x100, &bytes)?;
        let dev: DevPtr = ram;
        let aspace = AddressSpace::symmetric(vec![DevMap::new(&dev, 0)], 0xFFFF)?;
        aspace.set_databus(0xEE);
        let mut last = 0xEE;
        for addr in 0x100..0x200u16 {
            let p = aspace.peek(addr);
            assert_eq!(aspace.databus(), last);
            last = aspace.read(addr);
            assert_eq!(p, last);
        }
        assert_eq!(aspace.peek16(0x1FE), 0xFFFE);
        Ok(())
    }

    #[test]
    fn dump_lists_banks() -> Result<(), Error> {
        let ram = shared(DeviceRam::new("ram", 0x8000));
        let aspace = AddressSpace::symmetric(vec![DevMap::new(&ram, 0), DevMap::new(&ram, 0)], 0xFFFF)?;
        let s = aspace.to_string();
        assert!(s.contains("2 banks"));
        assert!(s.contains("$8000-$FFFF"));
        Ok(())
    }
}
