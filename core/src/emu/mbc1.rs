use crate::primitives::Word;
use super::{banked_load, banked_store, Controller, RAM_BANK, ROM_BANK};

/// The first version of a memory bank controller.
///
/// With this controller, the cartridge can have up to 2 MiB of ROM and up to
/// 32 KiB of external RAM. The bank number is split into two registers and a
/// mode bit decides what the upper register means.
pub(super) struct Mbc1 {
    rom: Box<[u8]>,
    ram: Box<[u8]>,

    /// Lower 5 bits of the ROM bank. Writing 0 selects 1, which is why banks
    /// `0x20`, `0x40` and `0x60` can never be mapped.
    bank1: u8,

    /// 2 bit register. Upper bits of the ROM bank, or the RAM bank in RAM
    /// mode.
    bank2: u8,

    /// `false` is ROM mode, `true` is RAM mode. In RAM mode, `bank2` also
    /// selects the RAM bank and is applied to the `0x0000` window.
    ram_mode: bool,

    ram_enabled: bool,
}

impl Mbc1 {
    pub(super) fn new(rom: Box<[u8]>, ram: Box<[u8]>) -> Self {
        Self {
            rom,
            ram,
            bank1: 1,
            bank2: 0,
            ram_mode: false,
            ram_enabled: false,
        }
    }

    fn ram_bank(&self) -> usize {
        if self.ram_mode {
            self.bank2 as usize
        } else {
            0
        }
    }
}

impl Controller for Mbc1 {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        match addr.get() {
            0x0000..=0x3FFF => {
                let bank = if self.ram_mode { (self.bank2 as usize) << 5 } else { 0 };
                banked_load(&self.rom, bank, ROM_BANK, addr.get())
            }
            _ => {
                let bank = ((self.bank2 as usize) << 5) | self.bank1 as usize;
                banked_load(&self.rom, bank, ROM_BANK, addr.get() - 0x4000)
            }
        }
    }

    fn store_rom_byte(&mut self, addr: Word, byte: u8) {
        match addr.get() {
            0x0000..=0x1FFF => self.ram_enabled = byte & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                // Bank 0 can't be written to this register.
                self.bank1 = match byte & 0x1F {
                    0 => 1,
                    b => b,
                };
            }
            0x4000..=0x5FFF => self.bank2 = byte & 0x03,
            _ => self.ram_mode = byte & 0x01 != 0,
        }
    }

    fn load_ram_byte(&self, addr: Word) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }
        banked_load(&self.ram, self.ram_bank(), RAM_BANK, addr.get())
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if self.ram_enabled {
            let bank = self.ram_bank();
            banked_store(&mut self.ram, bank, RAM_BANK, addr.get(), byte);
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}
