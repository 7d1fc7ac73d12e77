//! Drivers for the memory bank controllers.
//!
//! A driver turns linear ROM/RAM offsets into bank switches and bus cycles.
//! Everything above this module sees ROM as one flat array of `rom_size`
//! bytes and RAM as one flat array of `ram_size` bytes.

use std::{cmp::min, ops::Range};

use derive_more::Display;

use crate::{
    bus::{Bus, ROM_BANK0_START, ROM_BANKN_START, ROM_BANK_SIZE, SRAM_BANK_SIZE, SRAM_START},
    cartridge::{CartridgeDescriptor, MapperKind},
    log::*,
    primitives::Word,
};
pub use self::{
    camera::Camera,
    huc1::HuC1,
    mbc1::Mbc1,
    mbc2::Mbc2,
    mbc3::Mbc3,
    mbc5::Mbc5,
    no_mbc::NoMbc,
};

mod camera;
mod huc1;
mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;
mod no_mbc;


/// Returned when the cartridge has no driver for an operation: unknown or
/// undriven controllers, or RAM access on a cartridge without RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "operation not supported by this cartridge")]
pub struct Unsupported;

impl std::error::Error for Unsupported {}

/// A memory bank controller driver.
///
/// All addresses are linear offsets from the start of ROM or RAM. One call may
/// cross any number of bank boundaries. Callers make sure the range is inside
/// the chip ([`Mapper`] does that).
pub trait Mbc {
    /// Fills `dest` with ROM bytes starting at `addr`.
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32);

    /// Fills `dest` with RAM bytes starting at `addr`.
    fn read_ram<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32);

    /// Writes `src` into RAM starting at `addr`.
    fn write_ram<B: Bus>(&self, bus: &mut B, src: &[u8], addr: u32);

    /// Enables or disables the RAM window. The read/write methods already do
    /// this around every access; this is for code poking at the RAM window
    /// directly.
    fn set_ram_access<B: Bus>(&self, bus: &mut B, enable: bool);
}

/// The driver chosen for a cartridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Driver {
    NoMbc(NoMbc),
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
    HuC1(HuC1),
    Camera(Camera),

    /// No driver. Every operation fails with [`Unsupported`].
    Unsupported,
}

/// Calls a method on whatever driver is inside a [`Driver`], or returns
/// `Err(Unsupported)`.
macro_rules! dispatch {
    ($driver:expr, $d:ident => $call:expr) => {
        match $driver {
            Driver::NoMbc($d) => Ok($call),
            Driver::Mbc1($d) => Ok($call),
            Driver::Mbc2($d) => Ok($call),
            Driver::Mbc3($d) => Ok($call),
            Driver::Mbc5($d) => Ok($call),
            Driver::HuC1($d) => Ok($call),
            Driver::Camera($d) => Ok($call),
            Driver::Unsupported => Err(Unsupported),
        }
    };
}

/// ROM bytes reachable without a controller: `0x0000..0x8000`.
const NO_MBC_ROM_SIZE: u32 = 2 * ROM_BANK_SIZE;

/// The driver for one cartridge, together with the ROM and RAM sizes it
/// clamps every access to.
///
/// Bytes past the end of ROM or RAM read as zero and writes past the end of
/// RAM are dropped. That keeps the FAT layer (which thinks in clusters) from
/// ever putting out-of-range bank numbers on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapper {
    driver: Driver,
    rom_size: u32,
    ram_size: u32,
}

impl Mapper {
    /// Picks the driver for the identified cartridge.
    pub fn for_cartridge(desc: &CartridgeDescriptor) -> Self {
        let driver = match desc.kind {
            MapperKind::NoMapper => Driver::NoMbc(NoMbc),
            MapperKind::Mbc1 => Driver::Mbc1(Mbc1),
            MapperKind::Mbc2 => Driver::Mbc2(Mbc2),
            MapperKind::Mbc3 => Driver::Mbc3(Mbc3),
            MapperKind::Mbc5 => Driver::Mbc5(Mbc5),
            MapperKind::HuC1 => Driver::HuC1(HuC1),
            MapperKind::Camera => Driver::Camera(Camera),
            MapperKind::Mmm01 | MapperKind::Mbc4 | MapperKind::Unknown => {
                warn!("[mbc] no driver for '{}', ROM and RAM will read as zeros", desc.type_str);
                Driver::Unsupported
            }
        };

        let (mut rom_size, mut ram_size) = (desc.rom_size, desc.ram_size);
        if let Driver::NoMbc(_) = driver {
            // Without a controller, only two ROM banks and one RAM bank are
            // on the bus.
            if rom_size > NO_MBC_ROM_SIZE || ram_size > SRAM_BANK_SIZE {
                warn!(
                    "[mbc] header claims 0x{:x} bytes ROM and 0x{:x} bytes RAM without a \
                        controller, only the directly mapped part is used",
                    rom_size,
                    ram_size,
                );
            }
            rom_size = min(rom_size, NO_MBC_ROM_SIZE);
            ram_size = min(ram_size, SRAM_BANK_SIZE);
        }

        Self { driver, rom_size, ram_size }
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn is_supported(&self) -> bool {
        self.driver != Driver::Unsupported
    }

    pub fn rom_size(&self) -> u32 {
        self.rom_size
    }

    pub fn ram_size(&self) -> u32 {
        self.ram_size
    }

    /// Fills `dest` with ROM starting at linear address `addr`. On error,
    /// `dest` is zeroed.
    pub fn read_rom<B: Bus>(
        &self,
        bus: &mut B,
        dest: &mut [u8],
        addr: u32,
    ) -> Result<(), Unsupported> {
        let valid = clamp(addr, dest.len(), self.rom_size);
        let (head, tail) = dest.split_at_mut(valid);
        zero(tail);

        let out = dispatch!(&self.driver, d => if !head.is_empty() {
            d.read_rom(bus, head, addr)
        });
        if out.is_err() {
            zero(head);
        }
        out
    }

    /// Fills `dest` with RAM starting at linear address `addr`. On error,
    /// `dest` is zeroed.
    pub fn read_ram<B: Bus>(
        &self,
        bus: &mut B,
        dest: &mut [u8],
        addr: u32,
    ) -> Result<(), Unsupported> {
        if self.ram_size == 0 {
            zero(dest);
            return Err(Unsupported);
        }

        let valid = clamp(addr, dest.len(), self.ram_size);
        let (head, tail) = dest.split_at_mut(valid);
        zero(tail);

        let out = dispatch!(&self.driver, d => if !head.is_empty() {
            d.read_ram(bus, head, addr)
        });
        if out.is_err() {
            zero(head);
        }
        out
    }

    /// Writes `src` into RAM starting at linear address `addr`. Bytes past
    /// the end of RAM are dropped.
    pub fn write_ram<B: Bus>(&self, bus: &mut B, src: &[u8], addr: u32) -> Result<(), Unsupported> {
        if self.ram_size == 0 {
            return Err(Unsupported);
        }

        let valid = clamp(addr, src.len(), self.ram_size);
        if valid < src.len() {
            warn!(
                "[mbc] dropping {} bytes written past the end of RAM (0x{:x})",
                src.len() - valid,
                self.ram_size,
            );
        }

        let src = &src[..valid];
        dispatch!(&self.driver, d => if !src.is_empty() {
            d.write_ram(bus, src, addr)
        })
    }

    /// Enables or disables the RAM window.
    pub fn set_ram_access<B: Bus>(&self, bus: &mut B, enable: bool) -> Result<(), Unsupported> {
        if self.ram_size == 0 {
            return Err(Unsupported);
        }
        dispatch!(&self.driver, d => d.set_ram_access(bus, enable))
    }

    /// Maps RAM bank `bank` into the RAM window. Only the camera driver
    /// offers this.
    pub fn set_ram_bank<B: Bus>(&self, bus: &mut B, bank: u8) -> Result<(), Unsupported> {
        match &self.driver {
            Driver::Camera(cam) => {
                cam.set_ram_bank(bus, bank);
                Ok(())
            }
            _ => Err(Unsupported),
        }
    }
}

/// Number of bytes of an access of `len` bytes at `addr` that are inside a
/// chip of `size` bytes.
fn clamp(addr: u32, len: usize, size: u32) -> usize {
    if addr >= size {
        0
    } else {
        min(len, (size - addr) as usize)
    }
}

fn zero(buf: &mut [u8]) {
    for b in buf {
        *b = 0;
    }
}


/// The part of a linear access that falls into one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    /// The bank.
    pub(crate) bank: u16,

    /// Offset inside the bank.
    pub(crate) offset: u16,

    /// Index into the caller's buffer where this span starts.
    pub(crate) start: usize,

    pub(crate) len: usize,
}

impl Span {
    /// The part of the caller's buffer this span covers.
    pub(crate) fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Splits an access of `len` bytes at linear address `addr` into per-bank
/// spans.
pub(crate) struct BankSpans {
    addr: u32,
    pos: usize,
    len: usize,
    bank_size: u32,
}

impl BankSpans {
    pub(crate) fn new(addr: u32, len: usize, bank_size: u32) -> Self {
        Self { addr, pos: 0, len, bank_size }
    }
}

impl Iterator for BankSpans {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.pos >= self.len {
            return None;
        }

        let addr = self.addr + self.pos as u32;
        let offset = addr % self.bank_size;
        let len = min(self.len - self.pos, (self.bank_size - offset) as usize);
        let span = Span {
            bank: (addr / self.bank_size) as u16,
            offset: offset as u16,
            start: self.pos,
            len,
        };

        self.pos += len;
        Some(span)
    }
}

/// Where a ROM bank can be read after selecting it.
pub(crate) enum RomWindow {
    /// At `0x0000`, only bank 0.
    Low,

    /// At `0x4000`.
    High,

    /// The controller can't map this bank. Reads as zeros.
    Missing,
}

impl RomWindow {
    fn base(&self) -> Option<Word> {
        match self {
            RomWindow::Low => Some(ROM_BANK0_START),
            RomWindow::High => Some(ROM_BANKN_START),
            RomWindow::Missing => None,
        }
    }
}

/// The common ROM loop: `select` maps each bank touched by the access and
/// says where to read it from.
pub(crate) fn read_banked_rom<B: Bus>(
    bus: &mut B,
    dest: &mut [u8],
    addr: u32,
    mut select: impl FnMut(&mut B, u16) -> RomWindow,
) {
    for span in BankSpans::new(addr, dest.len(), ROM_BANK_SIZE) {
        let chunk = &mut dest[span.range()];
        match select(bus, span.bank).base() {
            Some(base) => bus.read_buf(base + span.offset, chunk),
            None => zero(chunk),
        }
    }
}

/// The common RAM read loop: `select` maps each bank touched by the access.
pub(crate) fn read_banked_ram<B: Bus>(
    bus: &mut B,
    dest: &mut [u8],
    addr: u32,
    mut select: impl FnMut(&mut B, u16),
) {
    for span in BankSpans::new(addr, dest.len(), SRAM_BANK_SIZE) {
        select(bus, span.bank);
        bus.read_buf(SRAM_START + span.offset, &mut dest[span.range()]);
    }
}

/// The common RAM write loop: `select` maps each bank touched by the access.
pub(crate) fn write_banked_ram<B: Bus>(
    bus: &mut B,
    src: &[u8],
    addr: u32,
    mut select: impl FnMut(&mut B, u16),
) {
    for span in BankSpans::new(addr, src.len(), SRAM_BANK_SIZE) {
        select(bus, span.bank);
        for (i, &byte) in src[span.range()].iter().enumerate() {
            bus.write_byte(SRAM_START + span.offset + i as u16, byte);
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cartridge::identify,
        emu::{test_rom, test_rom_byte, BusEvent, EmulatedCartridge},
    };

    fn setup(ty: u8, rom_code: u8, ram_code: u8) -> (EmulatedCartridge, Mapper) {
        let rom = test_rom(ty, rom_code, ram_code, b"MAPPER");
        let mut bus = EmulatedCartridge::new(rom, None).unwrap();
        let desc = identify(&mut bus);
        let mapper = Mapper::for_cartridge(&desc);
        (bus, mapper)
    }

    fn expected_rom(addr: u32, len: usize) -> Vec<u8> {
        (addr as usize..addr as usize + len).map(test_rom_byte).collect()
    }

    #[test]
    fn spans_split_at_bank_boundaries() {
        let spans: Vec<_> = BankSpans::new(0x3FFE, 0x4004, 0x4000).collect();
        assert_eq!(spans, vec![
            Span { bank: 0, offset: 0x3FFE, start: 0, len: 2 },
            Span { bank: 1, offset: 0, start: 2, len: 0x4000 },
            Span { bank: 2, offset: 0, start: 0x4002, len: 2 },
        ]);

        assert_eq!(BankSpans::new(0x1234, 0, 0x4000).count(), 0);
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp(0, 10, 100), 10);
        assert_eq!(clamp(95, 10, 100), 5);
        assert_eq!(clamp(100, 10, 100), 0);
        assert_eq!(clamp(200, 10, 100), 0);
    }

    #[test]
    fn rom_read_spanning_banks() {
        for &ty in &[0x01, 0x05, 0x11, 0x19, 0xFF, 0xFC] {
            let (mut bus, mapper) = setup(ty, 0x03, 0x00);

            let mut buf = vec![0; 0x100];
            mapper.read_rom(&mut bus, &mut buf, 0x7FC0).unwrap();
            assert_eq!(buf, expected_rom(0x7FC0, 0x100), "type {:02x}", ty);
        }
    }

    #[test]
    fn rom_past_end_reads_zero() {
        let (mut bus, mapper) = setup(0x00, 0x00, 0x00);

        let mut buf = vec![0xAA; 0x20];
        mapper.read_rom(&mut bus, &mut buf, 0x7FF0).unwrap();
        assert_eq!(&buf[..0x10], &expected_rom(0x7FF0, 0x10)[..]);
        assert!(buf[0x10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn unsupported_driver() {
        let (mut bus, mapper) = setup(0x0B, 0x00, 0x02);
        assert!(!mapper.is_supported());

        let mut buf = vec![0xAA; 16];
        assert_eq!(mapper.read_rom(&mut bus, &mut buf, 0), Err(Unsupported));
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(mapper.read_ram(&mut bus, &mut buf, 0), Err(Unsupported));
        assert_eq!(mapper.write_ram(&mut bus, &buf, 0), Err(Unsupported));
        assert_eq!(mapper.set_ram_access(&mut bus, true), Err(Unsupported));
    }

    #[test]
    fn no_ram_is_unsupported() {
        let (mut bus, mapper) = setup(0x01, 0x01, 0x00);
        let mut buf = [0; 4];
        assert_eq!(mapper.read_ram(&mut bus, &mut buf, 0), Err(Unsupported));
        assert_eq!(mapper.write_ram(&mut bus, &buf, 0), Err(Unsupported));
    }

    #[test]
    fn ram_write_past_end_is_dropped() {
        let (mut bus, mapper) = setup(0x1B, 0x01, 0x02);

        mapper.write_ram(&mut bus, &[1, 2, 3, 4], 0x1FFE).unwrap();
        assert_eq!(&bus.ram()[0x1FFE..], &[1, 2]);

        let mut buf = [0xAA; 4];
        mapper.read_ram(&mut bus, &mut buf, 0x1FFE).unwrap();
        assert_eq!(buf, [1, 2, 0, 0]);
    }

    #[test]
    fn ram_round_trip_across_banks() {
        for &ty in &[0x03, 0x13, 0x1B, 0xFF] {
            let (mut bus, mapper) = setup(ty, 0x02, 0x03);

            let data: Vec<u8> = (0..0x3000u32).map(|i| (i * 7) as u8).collect();
            mapper.write_ram(&mut bus, &data, 0x1800).unwrap();

            let mut back = vec![0; data.len()];
            mapper.read_ram(&mut bus, &mut back, 0x1800).unwrap();
            assert_eq!(back, data, "type {:02x}", ty);
            assert_eq!(&bus.ram()[0x1800..0x4800], &data[..], "type {:02x}", ty);
        }
    }

    #[test]
    fn mbc2_write_stops_after_256_bytes() {
        let (mut bus, mapper) = setup(0x06, 0x03, 0x00);
        assert_eq!(mapper.ram_size(), 256);

        let mut data = vec![0xA5; 256];
        data.extend_from_slice(&[0x3C; 256]);

        bus.start_trace();
        mapper.write_ram(&mut bus, &data, 0).unwrap();
        let last_write = bus.take_trace().into_iter()
            .filter_map(|e| match e {
                BusEvent::Write(addr, _) if addr >= SRAM_START => Some(addr),
                _ => None,
            })
            .max();
        assert_eq!(last_write, Some(Word::new(0xA1FF)));

        // The mirrored cells were not hit by the dropped half.
        for pair in bus.ram().chunks(2) {
            assert_eq!(pair, &[0x5, 0xA]);
        }

        let mut back = vec![0xAA; 512];
        mapper.read_ram(&mut bus, &mut back, 0).unwrap();
        assert!(back[..256].iter().all(|&b| b == 0xA5));
        assert!(back[256..].iter().all(|&b| b == 0));
    }

    #[test]
    fn no_mbc_sizes_are_limited_to_the_bus_windows() {
        // ROM+RAM with a 128 KiB ROM and 32 KiB RAM claimed in the header.
        let (mut bus, mapper) = setup(0x08, 0x02, 0x03);
        assert_eq!(mapper.rom_size(), 0x8000);
        assert_eq!(mapper.ram_size(), 0x2000);

        bus.start_trace();
        mapper.write_ram(&mut bus, &[0x77], 0x6000).unwrap();
        mapper.write_ram(&mut bus, &[0x66; 4], 0x1FFE).unwrap();
        let writes: Vec<_> = bus.take_trace().into_iter()
            .filter(|e| match e {
                BusEvent::Write(..) => true,
                _ => false,
            })
            .collect();
        assert_eq!(writes, vec![
            BusEvent::Write(Word::new(0xBFFE), 0x66),
            BusEvent::Write(Word::new(0xBFFF), 0x66),
        ]);

        let mut buf = [0xAA; 4];
        mapper.read_ram(&mut bus, &mut buf, 0x6000).unwrap();
        assert_eq!(buf, [0; 4]);

        bus.start_trace();
        mapper.read_rom(&mut bus, &mut buf, 0x9000).unwrap();
        assert_eq!(buf, [0; 4]);
        assert_eq!(bus.take_trace(), vec![]);
    }

    #[test]
    fn reads_do_not_depend_on_previous_bank_state() {
        // Raw register writes that leave each controller in some other state:
        // RAM enabled, odd ROM banks, MBC3 RTC and camera sensor registers
        // mapped, MBC1 RAM mode.
        const SCRAMBLE: &[(u16, u8)] = &[
            (0x0000, 0x0A),
            (0x2000, 0x05),
            (0x2100, 0x03),
            (0x3000, 0x01),
            (0x4000, 0x10),
            (0x4000, 0x08),
            (0x6000, 0x01),
        ];

        let carts = [
            (0x09, 0x00, 0x02),
            (0x03, 0x03, 0x03),
            (0x06, 0x03, 0x00),
            (0x13, 0x03, 0x03),
            (0x1B, 0x03, 0x03),
            (0xFF, 0x03, 0x03),
            (0xFC, 0x03, 0x04),
        ];

        for &(ty, rom_code, ram_code) in &carts {
            let (mut bus, mapper) = setup(ty, rom_code, ram_code);
            let rom_size = mapper.rom_size();
            let ram_size = mapper.ram_size();

            let save: Vec<u8> = (0..ram_size).map(|i| (i * 13 + i / 0x2000) as u8).collect();
            mapper.write_ram(&mut bus, &save, 0).unwrap();

            let rom_ranges = [
                (0x0100, 0x40),
                (0x3FF0, 0x20),
                (0x5234, 0x40),
                (rom_size - 0x40, 0x40),
            ];
            let ram_ranges = [
                (0, 0x40),
                (ram_size / 2 - 0x10, 0x20),
                (ram_size - 0x40, 0x40),
            ];

            let read = |bus: &mut EmulatedCartridge, rom: bool, (addr, len): (u32, usize)| {
                let mut buf = vec![0xAA; len];
                if rom {
                    mapper.read_rom(bus, &mut buf, addr).unwrap();
                } else {
                    mapper.read_ram(bus, &mut buf, addr).unwrap();
                }
                buf
            };

            let targets = rom_ranges.iter().map(|&r| (true, r))
                .chain(ram_ranges.iter().map(|&r| (false, r)));
            for (rom, range) in targets {
                let first = read(&mut bus, rom, range);

                for &other in &rom_ranges {
                    read(&mut bus, true, other);
                }
                for &other in &ram_ranges {
                    read(&mut bus, false, other);
                }
                for &(addr, byte) in SCRAMBLE {
                    bus.write_byte(Word::new(addr), byte);
                }

                let again = read(&mut bus, rom, range);
                assert_eq!(
                    first, again,
                    "type {:02x}, {} at 0x{:x}", ty, if rom { "ROM" } else { "RAM" }, range.0,
                );
            }

            let mut back = vec![0; ram_size as usize];
            mapper.read_ram(&mut bus, &mut back, 0).unwrap();
            assert_eq!(back, save, "type {:02x}", ty);
        }
    }

    #[test]
    fn camera_ram_bank() {
        let (mut bus, mapper) = setup(0xFC, 0x05, 0x04);
        assert_eq!(mapper.set_ram_bank(&mut bus, 3), Ok(()));

        let (mut bus, mapper) = setup(0x03, 0x01, 0x02);
        assert_eq!(mapper.set_ram_bank(&mut bus, 3), Err(Unsupported));
    }
}
