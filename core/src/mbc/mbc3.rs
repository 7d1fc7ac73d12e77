use crate::{
    bus::Bus,
    log::*,
    primitives::Word,
};
use super::{read_banked_ram, read_banked_rom, write_banked_ram, Mbc, RomWindow};

const RAM_ENABLE: Word = Word::new(0x0000);
const ROM_BANK: Word = Word::new(0x2000);
const RAM_BANK: Word = Word::new(0x4000);

const RAM_ENABLE_DATA: u8 = 0x0A;

/// The MBC3 (and MBC30). A plain 7 bit ROM bank register; bank 0 is read
/// through the low window. The clock registers are never selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc3;

impl Mbc3 {
    fn select_ram_bank<B: Bus>(bus: &mut B, bank: u16) {
        debug!("[mbc3] selecting RAM bank {}", bank);
        bus.write_byte(RAM_BANK, (bank & 0x07) as u8);
    }
}

impl Mbc for Mbc3 {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        read_banked_rom(bus, dest, addr, |bus, bank| {
            if bank == 0 {
                RomWindow::Low
            } else {
                debug!("[mbc3] selecting ROM bank {}", bank);
                bus.write_byte(ROM_BANK, (bank & 0x7F) as u8);
                RomWindow::High
            }
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


#[cfg(test)]
mod test {
    use super::*;
    use crate::emu::{test_rom, test_rom_byte, EmulatedCartridge};

    #[test]
    fn mbc30_upper_ram_banks() {
        let rom = test_rom(0x10, 0x06, 0x05, b"PM_CRYSTAL");
        let mut bus = EmulatedCartridge::new(rom, None).unwrap();

        Mbc3.write_ram(&mut bus, &[0x77], 7 * 0x2000 + 5);
        assert_eq!(bus.ram()[7 * 0x2000 + 5], 0x77);
    }

    #[test]
    fn whole_rom_matches() {
        let rom = test_rom(0x11, 0x02, 0x00, b"MBC3");
        let mut bus = EmulatedCartridge::new(rom.clone(), None).unwrap();

        let mut buf = vec![0; rom.len()];
        Mbc3.read_rom(&mut bus, &mut buf, 0);
        assert_eq!(buf, rom);
        assert_eq!(buf[0x4000], test_rom_byte(0x4000));
    }
}
