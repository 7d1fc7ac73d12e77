use crate::{
    bus::{Bus, SRAM_START},
    log::*,
    primitives::Word,
};
use super::{read_banked_rom, Mbc, RomWindow};

/// Both registers decode only up to address bit 8: cleared selects the RAM
/// enable, set selects the ROM bank.
const RAM_ENABLE: Word = Word::new(0x0000);
const ROM_BANK: Word = Word::new(0x2100);

const RAM_ENABLE_DATA: u8 = 0x0A;

/// The MBC2.
///
/// Its RAM is built into the controller and only 4 bits wide. We store every
/// logical byte in two consecutive cells, low nibble first, which gives 256
/// usable bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc2;

impl Mbc2 {
    /// Address of the cell holding the low nibble of logical byte `addr + i`.
    fn cell(addr: u32, i: usize) -> Word {
        SRAM_START + ((addr as u16 + i as u16) * 2)
    }
}

impl Mbc for Mbc2 {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        read_banked_rom(bus, dest, addr, |bus, bank| {
            if bank == 0 {
                RomWindow::Low
            } else {
                debug!("[mbc2] selecting ROM bank {}", bank);
                bus.write_byte(ROM_BANK, (bank & 0x0F) as u8);
                RomWindow::High
            }
        });
    }

    fn read_ram<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        self.set_ram_access(bus, true);
        for (i, b) in dest.iter_mut().enumerate() {
            let cell = Self::cell(addr, i);
            let low = bus.read_byte(cell) & 0x0F;
            let high = bus.read_byte(cell + 1) & 0x0F;
            *b = (high << 4) | low;
        }
        self.set_ram_access(bus, false);
    }

    fn write_ram<B: Bus>(&self, bus: &mut B, src: &[u8], addr: u32) {
        self.set_ram_access(bus, true);
        for (i, &b) in src.iter().enumerate() {
            let cell = Self::cell(addr, i);
            bus.write_byte(cell, b & 0x0F);
            bus.write_byte(cell + 1, b >> 4);
        }
        self.set_ram_access(bus, false);
    }

    fn set_ram_access<B: Bus>(&self, bus: &mut B, enable: bool) {
        bus.write_byte(RAM_ENABLE, if enable { RAM_ENABLE_DATA } else { 0x00 });
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::emu::{test_rom, BusEvent, EmulatedCartridge};

    fn cart() -> EmulatedCartridge {
        let rom = test_rom(0x06, 0x03, 0x00, b"MBC2");
        EmulatedCartridge::new(rom, None).unwrap()
    }

    #[test]
    fn byte_is_split_into_nibbles() {
        let mut bus = cart();
        bus.start_trace();

        Mbc2.write_ram(&mut bus, &[0xAB], 0);
        assert_eq!(bus.take_trace(), vec![
            BusEvent::Write(RAM_ENABLE, 0x0A),
            BusEvent::Write(Word::new(0xA000), 0x0B),
            BusEvent::Write(Word::new(0xA001), 0x0A),
            BusEvent::Write(RAM_ENABLE, 0x00),
        ]);
        assert_eq!(&bus.ram()[..2], &[0x0B, 0x0A]);

        let mut buf = [0];
        Mbc2.read_ram(&mut bus, &mut buf, 0);
        assert_eq!(buf, [0xAB]);
    }

    #[test]
    fn whole_ram_round_trip() {
        let mut bus = cart();

        let data: Vec<u8> = (0..=255).collect();
        Mbc2.write_ram(&mut bus, &data, 0);

        let mut back = vec![0; 256];
        Mbc2.read_ram(&mut bus, &mut back, 0);
        assert_eq!(back, data);
    }

    #[test]
    fn ram_is_disabled_afterwards() {
        let mut bus = cart();
        Mbc2.write_ram(&mut bus, &[0x55], 0);

        // With RAM disabled the emulated controller reads open bus.
        assert_eq!(bus.read_byte(Word::new(0xA000)), 0xFF);
    }
}
