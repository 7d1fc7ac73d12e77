use crate::primitives::Word;
use super::{banked_load, banked_store, Controller, RAM_BANK, ROM_BANK};

/// The Pocket Camera's controller.
///
/// 1 MiB of ROM, 128 KiB of RAM holding the photos, and the sensor registers,
/// which replace the RAM window when bit 4 of the RAM bank register is set.
pub(super) struct Camera {
    rom: Box<[u8]>,
    ram: Box<[u8]>,

    /// 6 bit ROM bank. Bank 0 can be mapped to `0x4000` as well.
    rom_bank: u8,

    ram_bank: u8,

    /// Reads always work, writes need this.
    ram_writable: bool,
}

/// Set in the RAM bank register to map the sensor registers.
const REGISTER_BANK: u8 = 0x10;

impl Camera {
    pub(super) fn new(rom: Box<[u8]>, ram: Box<[u8]>) -> Self {
        Self {
            rom,
            ram,
            rom_bank: 1,
            ram_bank: 0,
            ram_writable: false,
        }
    }
}

impl Controller for Camera {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        match addr.get() {
            0x0000..=0x3FFF => banked_load(&self.rom, 0, ROM_BANK, addr.get()),
            _ => banked_load(&self.rom, self.rom_bank as usize, ROM_BANK, addr.get() - 0x4000),
        }
    }

    fn store_rom_byte(&mut self, addr: Word, byte: u8) {
        match addr.get() {
            0x0000..=0x1FFF => self.ram_writable = byte & 0x0F == 0x0A,
            0x2000..=0x3FFF => self.rom_bank = byte & 0x3F,
            0x4000..=0x5FFF => self.ram_bank = byte & 0x1F,
            _ => {}
        }
    }

    fn load_ram_byte(&self, addr: Word) -> u8 {
        if self.ram_bank & REGISTER_BANK != 0 {
            // Sensor idle, nothing to report.
            return 0x00;
        }
        banked_load(&self.ram, self.ram_bank as usize, RAM_BANK, addr.get())
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if self.ram_writable && self.ram_bank & REGISTER_BANK == 0 {
            let bank = self.ram_bank as usize;
            banked_store(&mut self.ram, bank, RAM_BANK, addr.get(), byte);
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}
