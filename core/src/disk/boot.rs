//! The boot sector (LBA 0).

use super::{
    BLOCK_SIZE, CLUSTER_BLOCKS, DISK_BLOCK_COUNT, FAT_BLOCKS, FAT_COUNT, RESERVED_BLOCKS,
    ROOT_ENTRIES,
};


const OEM_NAME: &[u8; 8] = b"MSWIN4.1";
const VOLUME_LABEL: &[u8; 11] = b"CARTDISK   ";
const FS_TYPE: &[u8; 8] = b"FAT16   ";
const VOLUME_SERIAL: u32 = 0x000B_0450;

/// Fixed disk.
const MEDIA_DESCRIPTOR: u8 = 0xF8;

/// Builds the 512 byte boot sector describing our fixed geometry.
pub fn boot_sector() -> [u8; BLOCK_SIZE] {
    let mut s = [0; BLOCK_SIZE];

    s[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    s[3..11].copy_from_slice(OEM_NAME);
    put_u16(&mut s, 11, BLOCK_SIZE as u16);
    s[13] = CLUSTER_BLOCKS as u8;
    put_u16(&mut s, 14, RESERVED_BLOCKS as u16);
    s[16] = FAT_COUNT as u8;
    put_u16(&mut s, 17, ROOT_ENTRIES as u16);

    // The 16 bit total is too small for us, the 32 bit one below is used.
    put_u16(&mut s, 19, 0);
    s[21] = MEDIA_DESCRIPTOR;
    put_u16(&mut s, 22, FAT_BLOCKS as u16);

    // Sectors per track and heads: there's no spinning platter.
    put_u16(&mut s, 24, 1);
    put_u16(&mut s, 26, 1);
    put_u32(&mut s, 28, 1);
    put_u32(&mut s, 32, DISK_BLOCK_COUNT);

    // Extended boot record
    s[36] = 0x00;
    s[38] = 0x29;
    put_u32(&mut s, 39, VOLUME_SERIAL);
    s[43..54].copy_from_slice(VOLUME_LABEL);
    s[54..62].copy_from_slice(FS_TYPE);

    s[510] = 0x55;
    s[511] = 0xAA;
    s
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}
