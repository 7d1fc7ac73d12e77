use crate::primitives::Word;
use super::Controller;

/// No controller in the cartridge.
///
/// Small games fit into `0x8000` bytes (e.g. Tetris) and don't need banking.
/// Writes into the ROM area are ignored. Such cartridges might still have up
/// to 8 KiB of RAM, which is always enabled.
pub(super) struct NoMbc {
    rom: Box<[u8]>,
    ram: Box<[u8]>,
}

impl NoMbc {
    pub(super) fn new(rom: Box<[u8]>, ram: Box<[u8]>) -> Self {
        Self { rom, ram }
    }
}

impl Controller for NoMbc {
    fn load_rom_byte(&self, addr: Word) -> u8 {
        self.rom.get(addr.as_usize()).cloned().unwrap_or(0xFF)
    }

    fn store_rom_byte(&mut self, _: Word, _: u8) {}

    fn load_ram_byte(&self, addr: Word) -> u8 {
        // If a value outside of the usable RAM is requested, we return FF.
        self.ram.get(addr.as_usize()).cloned().unwrap_or(0xFF)
    }

    fn store_ram_byte(&mut self, addr: Word, byte: u8) {
        if let Some(b) = self.ram.get_mut(addr.as_usize()) {
            *b = byte;
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}
