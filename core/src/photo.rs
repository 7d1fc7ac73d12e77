//! Pocket Camera photos as BMP files.
//!
//! The camera keeps 30 photos in its RAM, two per bank starting at bank 1.
//! Each photo is 16x14 tiles of 2bpp data. We turn them into 128x112 4 bit
//! BMPs, using the four grays of the standard 16 color palette.

use crate::{
    bus::{Bus, SRAM_START},
    log::*,
    mbc::{Mapper, Unsupported},
};


/// Number of photo slots.
pub const PHOTO_COUNT: usize = 30;

pub const PHOTO_WIDTH: usize = 128;
pub const PHOTO_HEIGHT: usize = 112;

/// Size of one BMP file.
pub const PHOTO_SIZE: usize = BMP_HEADER.len() + PIXEL_BYTES;

const PIXEL_BYTES: usize = PHOTO_WIDTH * PHOTO_HEIGHT / 2;

/// Offset of the second photo inside a RAM bank.
const SLOT_SIZE: u16 = 0x1000;

/// Tile data of one photo.
const RAW_SIZE: usize = 0xE00;

const TILES_X: usize = PHOTO_WIDTH / 8;
const TILES_Y: usize = PHOTO_HEIGHT / 8;

/// BMP file header and info header (128x112, 4bpp, uncompressed) followed by
/// the 16 color palette.
const BMP_HEADER: [u8; 0x76] = [
    0x42, 0x4D, 0x76, 0x1C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x76, 0x00, 0x00, 0x00,
    0x28, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x70, 0x00, 0x00, 0x00, 0x01, 0x00,
    0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00,

    // Palette
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x80, 0x00, 0x00,
    0x00, 0x80, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x80, 0x00, 0x80, 0x00,
    0x80, 0x80, 0x00, 0x00, 0x80, 0x80, 0x80, 0x00, 0xC0, 0xC0, 0xC0, 0x00,
    0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00,
    0xFF, 0x00, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0xFF, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x00,
];

/// Palette index for a 2bpp color (white, dark gray, light gray, black).
fn palette_index(color: u8) -> u8 {
    match color {
        0 => 0xF,
        1 => 0x8,
        2 => 0x7,
        _ => 0x0,
    }
}

/// Reads photo `n` from the camera and returns the complete BMP file.
pub fn decode_photo<B: Bus>(bus: &mut B, mapper: &Mapper, n: usize) -> Result<Vec<u8>, Unsupported> {
    if n >= PHOTO_COUNT {
        return Err(Unsupported);
    }
    debug!("[photo] decoding photo {}", n);

    let mut raw = [0; RAW_SIZE];
    mapper.set_ram_access(bus, true)?;
    mapper.set_ram_bank(bus, (n / 2 + 1) as u8)?;
    bus.read_buf(SRAM_START + (n % 2) as u16 * SLOT_SIZE, &mut raw);
    mapper.set_ram_access(bus, false)?;

    Ok(encode_bmp(&raw))
}

/// Converts the tile data into a BMP file. BMP rows are stored bottom-up.
fn encode_bmp(raw: &[u8; RAW_SIZE]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PHOTO_SIZE);
    out.extend_from_slice(&BMP_HEADER);

    for tile_y in (0..TILES_Y).rev() {
        for line in (0..8).rev() {
            let mut pixels = [0; PHOTO_WIDTH];
            for tile_x in 0..TILES_X {
                let at = tile_y * TILES_X * 16 + tile_x * 16 + line * 2;
                let (lo, hi) = (raw[at], raw[at + 1]);

                for px in 0..8 {
                    let bit = 7 - px;
                    let color = ((lo >> bit) & 1) | (((hi >> bit) & 1) << 1);
                    pixels[tile_x * 8 + px] = palette_index(color);
                }
            }

            out.extend(pixels.chunks(2).map(|p| (p[0] << 4) | p[1]));
        }
    }

    out
}
