use crate::{
    bus::Bus,
    log::*,
    primitives::Word,
};
use super::{read_banked_ram, read_banked_rom, write_banked_ram, Mbc, RomWindow};

const RAM_IR_SELECT: Word = Word::new(0x1000);
const ROM_BANK: Word = Word::new(0x3000);
const RAM_BANK: Word = Word::new(0x5000);

/// Maps the RAM into `0xA000..0xC000`.
const SELECT_RAM: u8 = 0x0A;

/// Maps the infrared port instead, which is what "RAM disabled" means on this
/// controller.
const SELECT_IR: u8 = 0x0E;

/// Hudson's HuC1, also used for HuC3 cartridges (we never touch the HuC3's
/// clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuC1;

impl HuC1 {
    fn select_ram_bank<B: Bus>(bus: &mut B, bank: u16) {
        debug!("[huc1] selecting RAM bank {}", bank);
        bus.write_byte(RAM_BANK, bank as u8);
    }
}

impl Mbc for HuC1 {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        read_banked_rom(bus, dest, addr, |bus, bank| {
            if bank == 0 {
                RomWindow::Low
            } else {
                debug!("[huc1] selecting ROM bank {}", bank);
                bus.write_byte(ROM_BANK, (bank & 0x3F) as u8);
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
        bus.write_byte(RAM_IR_SELECT, if enable { SELECT_RAM } else { SELECT_IR });
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::emu::{test_rom, EmulatedCartridge};

    #[test]
    fn ir_mode_after_access() {
        let rom = test_rom(0xFF, 0x03, 0x03, b"HUC1");
        let mut bus = EmulatedCartridge::new(rom, None).unwrap();

        HuC1.write_ram(&mut bus, &[0x3C], 0x2001);
        assert_eq!(bus.ram()[0x2001], 0x3C);

        // IR mode: the window shows the sensor, not the RAM.
        assert_eq!(bus.read_byte(Word::new(0xA000)), 0xC0);

        let mut buf = [0];
        HuC1.read_ram(&mut bus, &mut buf, 0x2001);
        assert_eq!(buf, [0x3C]);
    }
}
