//! An in-memory cartridge that answers bus cycles the way the real hardware
//! would.
//!
//! The mapper drivers only ever talk to a [`Bus`]. On the adapter that's the
//! connector, in tests and in the simulator it's an `EmulatedCartridge`: a
//! ROM image (and optionally a save file) behind a model of the cartridge's
//! memory bank controller. Every controller the drivers support is modelled,
//! including the quirks the drivers have to work around (RAM that reads `0xFF`
//! while disabled, MBC1 banks that can't be selected, the MBC2's 4 bit RAM).
//!
//! The cartridge can record every bus cycle, which lets tests check the exact
//! sequence of register writes a driver performs.

use derive_more::Display;

use crate::{
    bus::{Bus, SRAM_BANK_SIZE, SRAM_START},
    cartridge::MapperKind,
    log::*,
    primitives::Word,
};
use self::{
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


/// Everything up to and including the header checksum at `0x014D`.
const HEADER_END: usize = 0x0150;

/// The model of a memory bank controller.
///
/// This part of the cartridge decides what a bus cycle does. Writes into the
/// ROM area land in controller registers, the RAM window is usually gated by
/// an enable register and banked.
trait Controller {
    /// Loads one byte from the ROM area. `addr` is below `0x8000`.
    fn load_rom_byte(&self, addr: Word) -> u8;

    /// A write into the ROM area. `addr` is below `0x8000`.
    fn store_rom_byte(&mut self, addr: Word, byte: u8);

    /// Loads one byte from the RAM window. `addr` is relative and below
    /// `0x2000`.
    fn load_ram_byte(&self, addr: Word) -> u8;

    /// Stores one byte into the RAM window. `addr` is relative and below
    /// `0x2000`.
    fn store_ram_byte(&mut self, addr: Word, byte: u8);

    /// The raw RAM contents, as they would be dumped into a save file.
    fn ram(&self) -> &[u8];
}

/// One recorded bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Read(Word),
    Write(Word, u8),
}

/// Errors when building an [`EmulatedCartridge`].
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum EmuError {
    #[display(fmt = "ROM image is only {} bytes long, which is too short for a header", len)]
    RomTooShort { len: usize },
}

impl std::error::Error for EmuError {}

/// A cartridge living in memory.
pub struct EmulatedCartridge {
    controller: Box<dyn Controller>,
    trace: Option<Vec<BusEvent>>,
}

impl EmulatedCartridge {
    /// Creates the cartridge from a ROM image and an optional save file. The
    /// controller is chosen from the header. Save files that are too short are
    /// padded with zeros, excess bytes are ignored.
    pub fn new(rom: Vec<u8>, save: Option<Vec<u8>>) -> Result<Self, EmuError> {
        if rom.len() < HEADER_END {
            return Err(EmuError::RomTooShort { len: rom.len() });
        }

        let cart_type = rom[0x0147];
        let ram_code = rom[0x0149];
        let kind = match MapperKind::from_type_byte(cart_type) {
            Some((_, kind)) => kind,
            None => MapperKind::Unknown,
        };

        let ram_len = match kind {
            MapperKind::Mbc2 => mbc2::RAM_CELLS,
            _ => ram_len(ram_code),
        };
        let mut ram = vec![0; ram_len];
        if let Some(save) = save {
            let n = save.len().min(ram.len());
            ram[..n].copy_from_slice(&save[..n]);
        }

        let rom = rom.into_boxed_slice();
        let ram = ram.into_boxed_slice();
        let controller: Box<dyn Controller> = match kind {
            MapperKind::NoMapper => Box::new(NoMbc::new(rom, ram)),
            MapperKind::Mbc1 => Box::new(Mbc1::new(rom, ram)),
            MapperKind::Mbc2 => Box::new(Mbc2::new(rom, ram)),
            MapperKind::Mbc3 => Box::new(Mbc3::new(rom, ram)),
            MapperKind::Mbc5 => Box::new(Mbc5::new(rom, ram)),
            MapperKind::HuC1 => Box::new(HuC1::new(rom, ram)),
            MapperKind::Camera => Box::new(Camera::new(rom, ram)),
            MapperKind::Mmm01 | MapperKind::Mbc4 | MapperKind::Unknown => {
                warn!(
                    "[emu] no model for cartridge type 0x{:02x}, treating it as plain ROM",
                    cart_type,
                );
                Box::new(NoMbc::new(rom, ram))
            }
        };

        Ok(Self {
            controller,
            trace: None,
        })
    }

    /// Starts recording bus cycles. Discards everything recorded so far.
    pub fn start_trace(&mut self) {
        self.trace = Some(vec![]);
    }

    /// Returns everything recorded since the last call (or since
    /// `start_trace`) and keeps recording.
    pub fn take_trace(&mut self) -> Vec<BusEvent> {
        match &mut self.trace {
            Some(trace) => std::mem::replace(trace, vec![]),
            None => vec![],
        }
    }

    /// The battery backed RAM as it is stored in a save file. For the MBC2
    /// that's one byte per 4 bit cell.
    pub fn ram(&self) -> &[u8] {
        self.controller.ram()
    }

    fn record(&mut self, event: BusEvent) {
        if let Some(trace) = &mut self.trace {
            trace.push(event);
        }
    }
}

impl Bus for EmulatedCartridge {
    fn read_byte(&mut self, addr: Word) -> u8 {
        self.record(BusEvent::Read(addr));

        match addr.get() {
            0x0000..=0x7FFF => self.controller.load_rom_byte(addr),
            0xA000..=0xBFFF => self.controller.load_ram_byte(Word::new(addr - SRAM_START)),

            // VRAM, WRAM and IO are not on the cartridge; the data lines
            // float high.
            _ => 0xFF,
        }
    }

    fn write_byte(&mut self, addr: Word, byte: u8) {
        self.record(BusEvent::Write(addr, byte));

        match addr.get() {
            0x0000..=0x7FFF => self.controller.store_rom_byte(addr, byte),
            0xA000..=0xBFFF => {
                self.controller.store_ram_byte(Word::new(addr - SRAM_START), byte);
            }
            _ => trace!("[emu] write of {:02x} to {} is not on the cartridge", byte, addr),
        }
    }
}

/// Number of RAM bytes for the RAM size code in the header.
fn ram_len(code: u8) -> usize {
    match code {
        1 => 0x800,
        2 => RAM_BANK,
        3 => 4 * RAM_BANK,
        4 => 16 * RAM_BANK,
        5 => 8 * RAM_BANK,
        _ => 0,
    }
}

/// Reads `mem[bank * bank_size + offset]` or returns `0xFF` if that's past
/// the end of the chip.
fn banked_load(mem: &[u8], bank: usize, bank_size: usize, offset: u16) -> u8 {
    mem.get(bank * bank_size + offset as usize).cloned().unwrap_or(0xFF)
}

/// Counterpart of `banked_load`. Writes past the end of the chip are lost.
fn banked_store(mem: &mut [u8], bank: usize, bank_size: usize, offset: u16, byte: u8) {
    if let Some(b) = mem.get_mut(bank * bank_size + offset as usize) {
        *b = byte;
    }
}

/// Size of a ROM bank as `usize`, for indexing.
const ROM_BANK: usize = 0x4000;

/// Size of a RAM bank as `usize`, for indexing.
const RAM_BANK: usize = SRAM_BANK_SIZE as usize;


/// Builds a ROM image with a valid header for the given type byte, size codes
/// and title. Every byte outside the header holds a value derived from its
/// bank and offset, so reads from the wrong bank are easy to spot.
#[cfg(test)]
pub(crate) fn test_rom(cart_type: u8, rom_code: u8, ram_code: u8, title: &[u8]) -> Vec<u8> {
    use crate::cartridge::LOGO;

    let banks = match rom_code {
        0..=8 => 2usize << rom_code,
        0x52 => 72,
        0x53 => 80,
        0x54 => 96,
        _ => 2,
    };
    let mut rom: Vec<u8> = (0..banks * ROM_BANK).map(test_rom_byte).collect();

    for b in &mut rom[0x0100..HEADER_END] {
        *b = 0;
    }
    rom[0x0104..0x0134].copy_from_slice(&LOGO);
    rom[0x0134..0x0134 + title.len()].copy_from_slice(title);
    rom[0x0147] = cart_type;
    rom[0x0148] = rom_code;
    rom[0x0149] = ram_code;

    rom
}

/// The byte `test_rom` stores at ROM offset `i` (outside the header).
#[cfg(test)]
pub(crate) fn test_rom_byte(i: usize) -> u8 {
    let bank = (i / ROM_BANK) as u8;
    bank.wrapping_mul(31) ^ (i as u8) ^ ((i >> 8) as u8)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_short_rom() {
        let res = EmulatedCartridge::new(vec![0; 0x100], None);
        assert_eq!(res.err(), Some(EmuError::RomTooShort { len: 0x100 }));
    }

    #[test]
    fn save_is_loaded_and_padded() {
        let rom = test_rom(0x03, 0x01, 0x02, b"SAVE");
        let cart = EmulatedCartridge::new(rom, Some(vec![7; 100])).unwrap();

        assert_eq!(cart.ram().len(), 0x2000);
        assert!(cart.ram()[..100].iter().all(|&b| b == 7));
        assert!(cart.ram()[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn trace_records_cycles() {
        let rom = test_rom(0x00, 0x00, 0x00, b"TRACE");
        let mut cart = EmulatedCartridge::new(rom, None).unwrap();

        cart.read_byte(Word::new(0x0000));
        cart.start_trace();
        cart.write_byte(Word::new(0x2000), 3);
        cart.read_byte(Word::new(0x4000));

        assert_eq!(cart.take_trace(), vec![
            BusEvent::Write(Word::new(0x2000), 3),
            BusEvent::Read(Word::new(0x4000)),
        ]);
        assert_eq!(cart.take_trace(), vec![]);
    }

    #[test]
    fn off_cartridge_reads_float_high() {
        let rom = test_rom(0x00, 0x00, 0x00, b"FLOAT");
        let mut cart = EmulatedCartridge::new(rom, None).unwrap();
        assert_eq!(cart.read_byte(Word::new(0xC000)), 0xFF);
    }
}
