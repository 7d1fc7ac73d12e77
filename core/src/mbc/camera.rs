use crate::{
    bus::Bus,
    log::*,
    primitives::Word,
};
use super::{read_banked_ram, read_banked_rom, write_banked_ram, Mbc, RomWindow};

const RAM_ENABLE: Word = Word::new(0x1000);
const ROM_BANK: Word = Word::new(0x2000);
const RAM_BANK: Word = Word::new(0x4000);

const RAM_ENABLE_DATA: u8 = 0x0A;

/// The Pocket Camera's controller. Any of its 64 ROM banks, bank 0 included,
/// can be mapped to `0x4000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera;

impl Camera {
    /// Maps one of the 16 RAM banks. Bit 4 would map the sensor registers
    /// instead, so it's masked off.
    pub fn set_ram_bank<B: Bus>(&self, bus: &mut B, bank: u8) {
        debug!("[camera] selecting RAM bank {}", bank);
        bus.write_byte(RAM_BANK, bank & 0x0F);
    }
}

impl Mbc for Camera {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        read_banked_rom(bus, dest, addr, |bus, bank| {
            debug!("[camera] selecting ROM bank {}", bank);
            bus.write_byte(ROM_BANK, (bank & 0x3F) as u8);
            RomWindow::High
        });
    }

    fn read_ram<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        self.set_ram_access(bus, true);
        read_banked_ram(bus, dest, addr, |bus, bank| self.set_ram_bank(bus, bank as u8));
        self.set_ram_access(bus, false);
    }

    fn write_ram<B: Bus>(&self, bus: &mut B, src: &[u8], addr: u32) {
        self.set_ram_access(bus, true);
        write_banked_ram(bus, src, addr, |bus, bank| self.set_ram_bank(bus, bank as u8));
        self.set_ram_access(bus, false);
    }

    fn set_ram_access<B: Bus>(&self, bus: &mut B, enable: bool) {
        bus.write_byte(RAM_ENABLE, if enable { RAM_ENABLE_DATA } else { 0x00 });
    }
}
