use crate::primitives::Word;
use super::{banked_load, Controller, ROM_BANK};

/// Number of 4 bit cells built into the controller.
pub(super) const RAM_CELLS: usize = 512;

/// MBC2: up to 256 KiB of ROM and 512 half-bytes of RAM inside the
/// controller.
///
/// All registers live in `0x0000..0x4000`. Address bit 8 decides which one is
/// written: cleared for RAM enable, set for the ROM bank.
pub(super) struct Mbc2 {
    rom: Box<[u8]>,

    /// One cell per byte, only the low nibble is used.
    ram: Box<[u8]>,

    /// 4 bit ROM bank, never 0.
    rom_bank: u8,
    ram_enabled: bool,
}

impl Mbc2 {
    pub(super) fn new(rom: Box<[u8]>, mut ram: Box<[u8]>) -> Self {
        for cell in ram.iter_mut() {
            *cell &= 0x0F;
        }

        Self {
            rom,
            ram,
            rom_bank: 1,
            ram_enabled: false,
        }
    }

    /// The RAM only decodes 9 address bits, the rest of the window mirrors it.
    fn cell(addr: Word) -> usize {
        addr.as_usize() % RAM_CELLS
    }
}

impl Controller for Mbc2 {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        match addr.get() {
            0x0000..=0x3FFF => banked_load(&self.rom, 0, ROM_BANK, addr.get()),
            _ => banked_load(&self.rom, self.rom_bank as usize, ROM_BANK, addr.get() - 0x4000),
        }
    }

    fn store_rom_byte(&mut self, addr: Word, byte: u8) {
        if addr.get() >= 0x4000 {
            return;
        }

        if addr.get() & 0x0100 == 0 {
            self.ram_enabled = byte & 0x0F == 0x0A;
        } else {
            self.rom_bank = match byte & 0x0F {
                0 => 1,
                b => b,
            };
        }
    }

    fn load_ram_byte(&self, addr: Word) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }

        // The upper four data lines are not connected and float high.
        self.ram.get(Self::cell(addr)).map(|c| c | 0xF0).unwrap_or(0xFF)
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if self.ram_enabled {
            if let Some(cell) = self.ram.get_mut(Self::cell(addr)) {
                *cell = byte & 0x0F;
            }
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn mbc2() -> Mbc2 {
        let rom: Vec<u8> = (0..16 * ROM_BANK).map(|i| (i / ROM_BANK) as u8).collect();
        Mbc2::new(rom.into_boxed_slice(), vec![0; RAM_CELLS].into_boxed_slice())
    }

    #[test]
    fn address_bit_8_selects_register() {
        let mut mbc = mbc2();

        // Bit 8 clear: this is the RAM enable, not the bank.
        mbc.store_rom_byte(Word::new(0x2000), 0x05);
        assert_eq!(mbc.load_rom_byte(Word::new(0x4000)), 1);

        mbc.store_rom_byte(Word::new(0x2100), 0x05);
        assert_eq!(mbc.load_rom_byte(Word::new(0x4000)), 5);
    }

    #[test]
    fn nibble_ram() {
        let mut mbc = mbc2();
        mbc.store_rom_byte(Word::new(0x0000), 0x0A);
        mbc.store_ram_byte(Word::new(0x0003), 0xAB);

        assert_eq!(mbc.load_ram_byte(Word::new(0x0003)), 0xFB);
        assert_eq!(mbc.ram()[3], 0x0B);

        // Mirrored every 512 bytes.
        assert_eq!(mbc.load_ram_byte(Word::new(0x0203)), 0xFB);
    }
}
