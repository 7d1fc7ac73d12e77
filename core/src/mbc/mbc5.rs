use crate::{
    bus::Bus,
    log::*,
    primitives::Word,
};
use super::{read_banked_ram, read_banked_rom, write_banked_ram, Mbc, RomWindow};

const RAM_ENABLE: Word = Word::new(0x1000);
const ROM_BANK_LOW: Word = Word::new(0x2000);
const ROM_BANK_HIGH: Word = Word::new(0x3000);
const RAM_BANK: Word = Word::new(0x4000);

const RAM_ENABLE_DATA: u8 = 0x0A;

/// The MBC5. Has a 9 bit ROM bank register and, unlike the others, can map
/// bank 0 into the switchable window, so every bank is read from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc5;

impl Mbc5 {
    fn select_ram_bank<B: Bus>(bus: &mut B, bank: u16) {
        debug!("[mbc5] selecting RAM bank {}", bank);
        bus.write_byte(RAM_BANK, (bank & 0x0F) as u8);
    }
}

impl Mbc for Mbc5 {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        read_banked_rom(bus, dest, addr, |bus, bank| {
            debug!("[mbc5] selecting ROM bank {}", bank);
            bus.write_byte(ROM_BANK_LOW, (bank & 0xFF) as u8);
            bus.write_byte(ROM_BANK_HIGH, ((bank >> 8) & 0x01) as u8);
            RomWindow::High
        });
    }

    fn read_ram<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        self.set_ram_access(bus, true);
        read_banked_ram(bus, dest, addr, Self::select_ram_bank);
        self.set_ram_access(bus, false);
    }

    fn write_ram<B: Bus>(&self, bus: &mut B, src: &[u8], addr: u32) {
        self.set_ram_access(bus, true);
        write_banked_ram(bus, src, addr, Self::select_ram_bank);
        self.set_ram_access(bus, false);
    }

    fn set_ram_access<B: Bus>(&self, bus: &mut B, enable: bool) {
        bus.write_byte(RAM_ENABLE, if enable { RAM_ENABLE_DATA } else { 0x00 });
    }
}
