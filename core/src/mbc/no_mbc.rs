use crate::{
    bus::{Bus, ROM_BANK0_START, ROM_BANK_SIZE, SRAM_BANK_SIZE, SRAM_START},
    primitives::Word,
};
use super::Mbc;

/// No controller in the cartridge. ROM is wired straight to `0x0000..0x8000`
/// and RAM, if any, to `0xA000` without an enable register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMbc;

/// Bus address of linear offset `addr` in a window of `size` bytes at `base`.
/// The whole access of `len` bytes has to fit into the window.
fn window(base: Word, size: u32, addr: u32, len: usize) -> Word {
    debug_assert!(
        addr as u64 + len as u64 <= size as u64,
        "access 0x{:x}+0x{:x} outside of a 0x{:x} byte window",
        addr,
        len,
        size,
    );
    base + addr as u16
}

impl Mbc for NoMbc {
    fn read_rom<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        let start = window(ROM_BANK0_START, 2 * ROM_BANK_SIZE, addr, dest.len());
        bus.read_buf(start, dest);
    }

    fn read_ram<B: Bus>(&self, bus: &mut B, dest: &mut [u8], addr: u32) {
        let start = window(SRAM_START, SRAM_BANK_SIZE, addr, dest.len());
        bus.read_buf(start, dest);
    }

    fn write_ram<B: Bus>(&self, bus: &mut B, src: &[u8], addr: u32) {
        let start = window(SRAM_START, SRAM_BANK_SIZE, addr, src.len());
        for (i, &byte) in src.iter().enumerate() {
            bus.write_byte(start + i as u16, byte);
        }
    }

    fn set_ram_access<B: Bus>(&self, _: &mut B, _: bool) {}
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::emu::{test_rom, BusEvent, EmulatedCartridge};

    #[test]
    fn linear_access_without_register_writes() {
        let mut rom = test_rom(0x09, 0x00, 0x02, b"PLAIN");
        rom[0x5000] = 0x5A;
        let mut bus = EmulatedCartridge::new(rom, None).unwrap();
        bus.start_trace();

        let mut buf = [0];
        NoMbc.read_rom(&mut bus, &mut buf, 0x5000);
        assert_eq!(buf, [0x5A]);

        NoMbc.write_ram(&mut bus, &[0x12, 0x34], 0x100);
        NoMbc.read_ram(&mut bus, &mut buf, 0x101);
        assert_eq!(buf, [0x34]);

        assert_eq!(bus.take_trace(), vec![
            BusEvent::Read(Word::new(0x5000)),
            BusEvent::Write(Word::new(0xA100), 0x12),
            BusEvent::Write(Word::new(0xA101), 0x34),
            BusEvent::Read(Word::new(0xA101)),
        ]);
    }
}
