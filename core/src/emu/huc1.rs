use crate::primitives::Word;
use super::{banked_load, banked_store, Controller, RAM_BANK, ROM_BANK};

/// Hudson's HuC1. Works much like an MBC1 without the mode register, but the
/// RAM window can be switched over to an infrared transceiver.
pub(super) struct HuC1 {
    rom: Box<[u8]>,
    ram: Box<[u8]>,

    /// 6 bit ROM bank, 0 selects 1.
    rom_bank: u8,
    ram_bank: u8,

    /// Last value written to the RAM/IR select register.
    select: u8,
}

/// Select value that maps the IR port into the RAM window.
const SELECT_IR: u8 = 0x0E;

/// Select value that maps the RAM with write access.
const SELECT_RAM: u8 = 0x0A;

impl HuC1 {
    pub(super) fn new(rom: Box<[u8]>, ram: Box<[u8]>) -> Self {
        Self {
            rom,
            ram,
            rom_bank: 1,
            ram_bank: 0,
            select: 0,
        }
    }
}

impl Controller for HuC1 {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        match addr.get() {
            0x0000..=0x3FFF => banked_load(&self.rom, 0, ROM_BANK, addr.get()),
            _ => banked_load(&self.rom, self.rom_bank as usize, ROM_BANK, addr.get() - 0x4000),
        }
    }

    fn store_rom_byte(&mut self, addr: Word, byte: u8) {
        match addr.get() {
            0x0000..=0x1FFF => self.select = byte & 0x0F,
            0x2000..=0x3FFF => {
                self.rom_bank = match byte & 0x3F {
                    0 => 1,
                    b => b,
                };
            }
            0x4000..=0x5FFF => self.ram_bank = byte & 0x03,
            _ => {}
        }
    }

    fn load_ram_byte(&self, addr: Word) -> u8 {
        if self.select == SELECT_IR {
            // No light seen.
            return 0xC0;
        }
        banked_load(&self.ram, self.ram_bank as usize, RAM_BANK, addr.get())
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if self.select == SELECT_RAM {
            let bank = self.ram_bank as usize;
            banked_store(&mut self.ram, bank, RAM_BANK, addr.get(), byte);
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}
