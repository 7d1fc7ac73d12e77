use crate::{
    bus::Bus,
    log::*,
    primitives::Word,
};
use super::{read_banked_ram, read_banked_rom, write_banked_ram, Mbc, RomWindow};

const RAM_ENABLE: Word = Word::new(0x1000);
const ROM_BANK_LOW: Word = Word::new(0x2000);
const SHARED_BANK: Word = Word::new(0x4000);
const MODE_SELECT: Word = Word::new(0x6000);

const RAM_ENABLE_DATA: u8 = 0x0A;

/// The MBC1.
///
/// The bank number is split into a 5 bit and a 2 bit register. Because the
/// lower register turns 0 into 1, banks `0x20`, `0x40` and `0x60` can't be
/// mapped at all; we read them as zeros. Bank 0 is only reachable through the
/// `0x0000` window, and only while the controller is in ROM mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc1;

impl Mbc1 {
    fn select_rom_bank<B: Bus>(bus: &mut B, bank: u16) {
        debug!("[mbc1] selecting ROM bank {}", bank);
        bus.write_byte(MODE_SELECT, 0x00);
        bus.write_byte(ROM_BANK_LOW, (bank & 0x1F) as u8);
        bus.write_byte(SHARED_BANK, ((bank & 0x60) >> 5) as u8);
    }

    fn select_ram_bank<B: Bus>(bus: &mut B, bank: u16) {
        debug!("[mbc1] selecting RAM bank {}", bank);
        bus.write_byte(MODE_SELECT, 0x01);
        bus.write_byte(SHARED_BANK, (bank & 0x03) as u8);
    }
}

impl Mbc for Mbc1 {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        read_banked_rom(bus, dest, addr, |bus, bank| match bank {
            0 => {
                // In RAM mode the upper register would be applied to the
                // low window as well.
                bus.write_byte(MODE_SELECT, 0x00);
                RomWindow::Low
            }
            0x20 | 0x40 | 0x60 => {
                debug!("[mbc1] ROM bank 0x{:02x} can't be mapped, reading zeros", bank);
                RomWindow::Missing
            }
            _ => {
                Self::select_rom_bank(bus, bank);
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
    use crate::emu::{test_rom, test_rom_byte, BusEvent, EmulatedCartridge};

    fn cart() -> EmulatedCartridge {
        let rom = test_rom(0x03, 0x06, 0x03, b"MBC1");
        EmulatedCartridge::new(rom, None).unwrap()
    }

    #[test]
    fn ram_read_selects_bank_before_sampling() {
        let mut bus = cart();
        bus.start_trace();

        let mut buf = [0];
        Mbc1.read_ram(&mut bus, &mut buf, 0x2000);

        assert_eq!(bus.take_trace(), vec![
            BusEvent::Write(RAM_ENABLE, 0x0A),
            BusEvent::Write(MODE_SELECT, 0x01),
            BusEvent::Write(SHARED_BANK, 0x01),
            BusEvent::Read(Word::new(0xA000)),
            BusEvent::Write(RAM_ENABLE, 0x00),
        ]);
    }

    #[test]
    fn unreachable_banks_read_zero() {
        let mut bus = cart();

        let mut buf = vec![0xAA; 0x10];
        Mbc1.read_rom(&mut bus, &mut buf, 0x20 * 0x4000);
        assert!(buf.iter().all(|&b| b == 0));

        // Such a bank doesn't touch the bus at all.
        bus.start_trace();
        Mbc1.read_rom(&mut bus, &mut buf, 0x40 * 0x4000 + 0x100);
        assert_eq!(bus.take_trace(), vec![]);
    }

    #[test]
    fn bank_0_after_ram_access() {
        let mut bus = cart();

        // Leaves the controller in RAM mode with the upper register at 3.
        Mbc1.write_ram(&mut bus, &[1], 3 * 0x2000);

        let mut buf = vec![0; 0x40];
        Mbc1.read_rom(&mut bus, &mut buf, 0x0000);
        let expected: Vec<u8> = (0..0x40).map(test_rom_byte).collect();
        assert_eq!(buf, expected);
    }

    #[test]
    fn high_banks() {
        let mut bus = cart();

        let mut buf = vec![0; 4];
        Mbc1.read_rom(&mut bus, &mut buf, 0x45 * 0x4000 + 8);
        let expected: Vec<u8> = (0..4).map(|i| test_rom_byte(0x45 * 0x4000 + 8 + i)).collect();
        assert_eq!(buf, expected);
    }
}
