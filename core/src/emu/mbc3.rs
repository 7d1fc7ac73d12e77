use crate::{
    log::*,
    primitives::Word,
};
use super::{banked_load, banked_store, Controller, RAM_BANK, ROM_BANK};

/// Third version of the memory bank controller. It can have a real time clock
/// (RTC), which is not modelled: selecting an RTC register reads `0xFF`.
pub(super) struct Mbc3 {
    rom: Box<[u8]>,
    ram: Box<[u8]>,

    /// 7 bit ROM bank. Bank 0 can't be mapped to `0x4000`, 0 selects 1.
    rom_bank: u8,

    /// A value of 0--3 selects a RAM bank, 8--C an RTC register.
    ram_bank: u8,

    /// Whether or not the RAM and RTC registers are enabled.
    ram_enabled: bool,
}

impl Mbc3 {
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

impl Controller for Mbc3 {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        match addr.get() {
            0x0000..=0x3FFF => banked_load(&self.rom, 0, ROM_BANK, addr.get()),
            _ => {
                let bank = std::cmp::max(self.rom_bank, 1);
                banked_load(&self.rom, bank as usize, ROM_BANK, addr.get() - 0x4000)
            }
        }
    }

    fn store_rom_byte(&mut self, addr: Word, byte: u8) {
        match addr.get() {
            0x0000..=0x1FFF => self.ram_enabled = byte & 0x0F == 0x0A,
            0x2000..=0x3FFF => self.rom_bank = byte & 0x7F,
            0x4000..=0x5FFF => {
                if byte <= 0x0C {
                    self.ram_bank = byte;
                } else {
                    warn!("[emu mbc3] RAM bank/RTC register {:02x} was selected", byte);
                }
            }

            // RTC latch
            _ => {}
        }
    }

    fn load_ram_byte(&self, addr: Word) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }

        match self.ram_bank {
            // Banks 4--7 only exist on the MBC30.
            0..=7 => banked_load(&self.ram, self.ram_bank as usize, RAM_BANK, addr.get()),
            _ => 0xFF,
        }
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if self.ram_enabled && self.ram_bank <= 7 {
            let bank = self.ram_bank as usize;
            banked_store(&mut self.ram, bank, RAM_BANK, addr.get(), byte);
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}
