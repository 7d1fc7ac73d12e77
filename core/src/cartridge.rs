//! Everything related to the cartridge header: identification, the logo gate
//! and the human readable report that ends up in `STATUS.TXT`.

use std::fmt;

use crate::{
    bus::{Bus, ROM_BANK_SIZE, SRAM_BANK_SIZE, SRAM_END, SRAM_START},
    log::*,
    primitives::Word,
};


const LOGO_START: Word = Word::new(0x0104);
const TITLE_START: Word = Word::new(0x0134);
const TYPE_ADDR: Word = Word::new(0x0147);
const ROM_SIZE_ADDR: Word = Word::new(0x0148);
const RAM_SIZE_ADDR: Word = Word::new(0x0149);

/// Number of title bytes in the header.
pub const TITLE_LEN: usize = 16;

/// The MBC2 has 512 half-byte cells built into the controller, which we
/// expose as 256 full bytes.
pub const MBC2_RAM_SIZE: u32 = 256;

/// Bitmap every licensed cartridge carries at `0x0104..=0x0133`. The console
/// refuses to boot when it doesn't match, so we use it to detect a cartridge
/// that is inserted and properly seated.
pub const LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83,
    0x00, 0x0C, 0x00, 0x0D, 0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E,
    0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99, 0xBB, 0xBB, 0x67, 0x63,
    0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];


/// The family of memory bank controller a cartridge uses. Several header
/// type codes share one family (e.g. `MBC5+RUMBLE` is driven like `MBC5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperKind {
    /// No controller at all, ROM (and maybe RAM) are wired straight to the bus.
    NoMapper,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,

    /// Hudson's controller. HuC3 cartridges are driven the same way.
    HuC1,

    /// The Pocket Camera.
    Camera,

    /// Known, but no driver exists.
    Mmm01,

    /// Known, but no driver exists.
    Mbc4,

    /// The type byte isn't in our table.
    Unknown,
}

impl MapperKind {
    /// Looks up the header label and family for the type byte at `0x0147`.
    /// Returns `None` for codes we don't know.
    pub fn from_type_byte(byte: u8) -> Option<(&'static str, Self)> {
        use self::MapperKind::*;

        let out = match byte {
            0x00 => ("ROM ONLY", NoMapper),
            0x01 => ("MBC1", Mbc1),
            0x02 => ("MBC1+RAM", Mbc1),
            0x03 => ("MBC1+RAM+BATTERY", Mbc1),
            0x05 => ("MBC2", Mbc2),
            0x06 => ("MBC2+BATTERY", Mbc2),
            0x08 => ("ROM+RAM", NoMapper),
            0x09 => ("ROM+RAM+BATTERY", NoMapper),
            0x0B => ("MMM01", Mmm01),
            0x0C => ("MMM01+RAM", Mmm01),
            0x0D => ("MMM01+RAM+BATTERY", Mmm01),
            0x0F => ("MBC3+TIMER+BATTERY", Mbc3),
            0x10 => ("MBC3+TIMER+RAM+BATTERY", Mbc3),
            0x11 => ("MBC3", Mbc3),
            0x12 => ("MBC3+RAM", Mbc3),
            0x13 => ("MBC3+RAM+BATTERY", Mbc3),
            0x15 => ("MBC4", Mbc4),
            0x16 => ("MBC4+RAM", Mbc4),
            0x17 => ("MBC4+RAM+BATTERY", Mbc4),
            0x19 => ("MBC5", Mbc5),
            0x1A => ("MBC5+RAM", Mbc5),
            0x1B => ("MBC5+RAM+BATTERY", Mbc5),
            0x1C => ("MBC5+RUMBLE", Mbc5),
            0x1D => ("MBC5+RUMBLE+RAM", Mbc5),
            0x1E => ("MBC5+RUMBLE+RAM+BATTERY", Mbc5),
            0xFC => ("GB CAMERA", Camera),
            0xFE => ("HuC3+RAM+BATTERY", HuC1),
            0xFF => ("HuC1+RAM+BATTERY", HuC1),
            _ => return None,
        };

        Some(out)
    }
}

/// Everything we learned from the cartridge header.
#[derive(Clone, PartialEq, Eq)]
pub struct CartridgeDescriptor {
    /// Raw type byte from `0x0147`.
    pub cart_type: u8,

    /// Human readable label for `cart_type`.
    pub type_str: String,

    pub kind: MapperKind,

    /// Number of 16 KiB ROM banks. Always at least 2.
    pub rom_banks: u16,

    /// ROM size in bytes.
    pub rom_size: u32,

    /// Number of RAM banks. 0 if the cartridge has no RAM.
    pub ram_banks: u16,

    /// RAM size in bytes (logical bytes for the MBC2).
    pub ram_size: u32,

    /// Last valid address in the RAM window. `0xA000` without RAM.
    pub ram_end: Word,

    /// Printable title bytes, NUL padded.
    pub title: [u8; TITLE_LEN],
}

impl CartridgeDescriptor {
    /// Returns the title as string, without the NUL padding.
    pub fn title(&self) -> &str {
        let len = self.title.iter().position(|&b| b == 0).unwrap_or(TITLE_LEN);

        // Only printable ASCII is ever copied into `title`.
        std::str::from_utf8(&self.title[..len]).unwrap_or("")
    }

    pub fn has_ram(&self) -> bool {
        self.ram_size > 0
    }
}

// Manual implementation to print the title as string.
impl fmt::Debug for CartridgeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CartridgeDescriptor")
            .field("cart_type", &format_args!("0x{:02x}", self.cart_type))
            .field("type_str", &self.type_str)
            .field("kind", &self.kind)
            .field("rom_banks", &self.rom_banks)
            .field("rom_size", &self.rom_size)
            .field("ram_banks", &self.ram_banks)
            .field("ram_size", &self.ram_size)
            .field("ram_end", &self.ram_end)
            .field("title", &self.title())
            .finish()
    }
}

/// The report block written at the top of `STATUS.TXT`.
impl fmt::Display for CartridgeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Cart Type: {} (0x{:x})", self.type_str, self.cart_type)?;
        writeln!(f, "Num ROM Banks: {}", self.rom_banks)?;
        writeln!(f, "Num RAM Banks: {}", self.ram_banks)?;
        writeln!(f, "RAM Ending Address: 0x{:x}", self.ram_end.get())?;
        writeln!(f, "Cart Title: {}", self.title())
    }
}


/// Reads the header and builds the descriptor. Only performs reads, so it can
/// be called any number of times with the same result.
pub fn identify<B: Bus>(bus: &mut B) -> CartridgeDescriptor {
    let cart_type = bus.read_byte(TYPE_ADDR);
    let rom_code = bus.read_byte(ROM_SIZE_ADDR);
    let ram_code = bus.read_byte(RAM_SIZE_ADDR);

    let mut raw_title = [0; TITLE_LEN];
    bus.read_buf(TITLE_START, &mut raw_title);

    let (type_str, kind) = match MapperKind::from_type_byte(cart_type) {
        Some((label, kind)) => (label.to_string(), kind),
        None => {
            warn!("[cart] unknown cartridge type 0x{:02x}", cart_type);
            (format!("UNKNOWN MAPPER 0x{:02x}", cart_type), MapperKind::Unknown)
        }
    };

    let rom_banks = rom_bank_count(rom_code);
    let (ram_banks, ram_size, ram_end) = if kind == MapperKind::Mbc2 {
        (1, MBC2_RAM_SIZE, Word::new(0xA0FF))
    } else {
        ram_geometry(ram_code)
    };

    let mut desc = CartridgeDescriptor {
        cart_type,
        type_str,
        kind,
        rom_banks,
        rom_size: rom_banks as u32 * ROM_BANK_SIZE,
        ram_banks,
        ram_size,
        ram_end,
        title: printable_title(&raw_title),
    };
    relabel_mbc30(&mut desc);

    info!(
        "[cart] identified '{}': {} (0x{:02x}), {} ROM banks, {} RAM banks",
        desc.title(),
        desc.type_str,
        desc.cart_type,
        desc.rom_banks,
        desc.ram_banks,
    );

    desc
}

/// Number of ROM banks for the size code at `0x0148`.
fn rom_bank_count(code: u8) -> u16 {
    match code {
        0..=8 => 2 << code,
        0x52 => 72,
        0x53 => 80,
        0x54 => 96,
        _ => {
            warn!("[cart] invalid ROM size code 0x{:02x}, assuming 2 banks", code);
            2
        }
    }
}

/// Returns `(banks, size, end address)` for the RAM size code at `0x0149`.
fn ram_geometry(code: u8) -> (u16, u32, Word) {
    // Codes 1 and 2 follow the hardware: 2 KiB and 8 KiB.
    match code {
        0 => (0, 0, SRAM_START),
        1 => (1, 0x800, Word::new(0xA7FF)),
        2 => (1, SRAM_BANK_SIZE, SRAM_END),
        3 => (4, 4 * SRAM_BANK_SIZE, SRAM_END),
        4 => (16, 16 * SRAM_BANK_SIZE, SRAM_END),
        5 => (8, 8 * SRAM_BANK_SIZE, SRAM_END),
        _ => {
            warn!("[cart] invalid RAM size code 0x{:02x}, assuming no RAM", code);
            (0, 0, SRAM_START)
        }
    }
}

/// Copies title bytes up to the first non-printable one.
fn printable_title(raw: &[u8; TITLE_LEN]) -> [u8; TITLE_LEN] {
    let mut out = [0; TITLE_LEN];
    for (dst, &b) in out.iter_mut().zip(raw.iter()) {
        if b < 0x20 || b > 0x7E {
            break;
        }
        *dst = b;
    }
    out
}

/// Pokemon Crystal (JP) uses an MBC30, which has twice the RAM of an MBC3 but
/// the same type byte. The header can't tell them apart, the title can.
fn relabel_mbc30(desc: &mut CartridgeDescriptor) {
    if desc.kind == MapperKind::Mbc3
        && desc.ram_banks == 8
        && desc.title.starts_with(b"PM_CRYSTAL")
    {
        desc.type_str = "MBC30+TIMER+RAM+BATTERY".to_string();
    }
}


/// Compares the logo area with [`LOGO`]. Returns the first address that
/// doesn't match.
pub fn check_logo<B: Bus>(bus: &mut B) -> Result<(), Word> {
    let mut found = [0; LOGO.len()];
    bus.read_buf(LOGO_START, &mut found);

    match found.iter().zip(LOGO.iter()).position(|(a, b)| a != b) {
        None => Ok(()),
        Some(i) => Err(LOGO_START + i as u16),
    }
}

/// Blocks until a cartridge with a valid logo is on the bus. `on_retry` is
/// called with the mismatching address before every new attempt; the firmware
/// blinks the status LED from there.
pub fn wait_for_cartridge<B: Bus>(bus: &mut B, mut on_retry: impl FnMut(Word)) {
    loop {
        match check_logo(bus) {
            Ok(()) => return,
            Err(addr) => {
                trace!("[cart] logo mismatch at {}", addr);
                on_retry(addr);
            }
        }
    }
}
