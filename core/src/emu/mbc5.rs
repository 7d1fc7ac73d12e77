use crate::primitives::Word;
use super::{banked_load, banked_store, Controller, RAM_BANK, ROM_BANK};

/// MBC5.
///
/// With this controller, the cartridge can have up to 8 MiB of ROM and up to
/// 128 KiB of external RAM.
pub(super) struct Mbc5 {
    rom: Box<[u8]>,
    ram: Box<[u8]>,

    /// A 9 bit number to select the bank mapped to `0x4000..0x8000`. Unlike
    /// all other controllers, 0 really maps bank 0 there.
    rom_bank: u16,

    /// A 4 bit number to select the RAM bank.
    ram_bank: u8,

    ram_enabled: bool,
}

impl Mbc5 {
    pub(super) fn new(rom: Box<[u8]>, ram: Box<[u8]>) -> Self {
        Self {
            rom,
            ram,
            rom_bank: 1,
            ram_bank: 0,
            ram_enabled: false,
        }
    }
}

impl Controller for Mbc5 {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        match addr.get() {
            0x0000..=0x3FFF => banked_load(&self.rom, 0, ROM_BANK, addr.get()),
            _ => banked_load(&self.rom, self.rom_bank as usize, ROM_BANK, addr.get() - 0x4000),
        }
    }

    fn store_rom_byte(&mut self, addr: Word, byte: u8) {
        match addr.get() {
            0x0000..=0x1FFF => self.ram_enabled = byte & 0x0F == 0x0A,

            // Lower 8 bits of ROM bank number
            0x2000..=0x2FFF => self.rom_bank = (self.rom_bank & 0x100) | byte as u16,

            // Bit 8 of ROM bank number
            0x3000..=0x3FFF => {
                self.rom_bank = (self.rom_bank & 0xFF) | ((byte as u16 & 1) << 8);
            }

            0x4000..=0x5FFF => self.ram_bank = byte & 0x0F,
            _ => {}
        }
    }

    fn load_ram_byte(&self, addr: Word) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }
        banked_load(&self.ram, self.ram_bank as usize, RAM_BANK, addr.get())
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if self.ram_enabled {
            let bank = self.ram_bank as usize;
            banked_store(&mut self.ram, bank, RAM_BANK, addr.get(), byte);
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}
