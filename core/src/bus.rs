//! The seam between the core and the cartridge connector.
//!
//! On the real adapter, every method here is one (or a handful of)
//! bit-banged bus cycles with fixed busy-wait timing. A cycle cannot be
//! interrupted halfway through, so implementations are synchronous and
//! blocking and the core never preempts a multi-byte transfer.

use crate::primitives::Word;


/// Start of ROM bank 0, which is always mapped.
pub const ROM_BANK0_START: Word = Word::new(0x0000);

/// Start of the switchable ROM window.
pub const ROM_BANKN_START: Word = Word::new(0x4000);

/// Size of one ROM bank (and of both ROM windows).
pub const ROM_BANK_SIZE: u32 = 0x4000;

/// First address of the cartridge RAM window.
pub const SRAM_START: Word = Word::new(0xA000);

/// Last address of the cartridge RAM window.
pub const SRAM_END: Word = Word::new(0xBFFF);

/// Size of one RAM bank.
pub const SRAM_BANK_SIZE: u32 = 0x2000;


/// Byte level access to the cartridge's address and data bus.
pub trait Bus {
    /// Performs one read cycle.
    fn read_byte(&mut self, addr: Word) -> u8;

    /// Performs one write cycle. Writes into the ROM area usually don't
    /// store anything but land in one of the mapper's registers.
    fn write_byte(&mut self, addr: Word, byte: u8);

    /// Reads `buf.len()` consecutive addresses starting at `addr`.
    fn read_buf(&mut self, addr: Word, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(addr + i as u16);
        }
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn read_byte(&mut self, addr: Word) -> u8 {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: Word, byte: u8) {
        (**self).write_byte(addr, byte)
    }

    fn read_buf(&mut self, addr: Word, buf: &mut [u8]) {
        (**self).read_buf(addr, buf)
    }
}
