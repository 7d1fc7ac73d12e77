//! Everything the firmware knows about the inserted cartridge, and the block
//! dispatcher serving the synthetic disk from it.

use std::ops::Range;

use derive_more::Display;

use crate::{
    bus::Bus,
    cartridge::{identify, CartridgeDescriptor},
    disk::{
        boot_sector, build_volume, Region, StatusBuffer, VolumeLayout, BLOCK_SIZE,
        DISK_BLOCK_COUNT,
    },
    log::*,
    mbc::Mapper,
    photo::{decode_photo, PHOTO_SIZE},
    selftest,
};


/// Boot options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Run the self-test and append its results to `STATUS.TXT`.
    pub self_test: bool,
}

/// Errors at the block I/O boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiskError {
    #[display(
        fmt = "request at LBA {} + {} bytes is outside of the disk ({} blocks)",
        lba,
        len,
        block_count,
    )]
    OutOfRange { lba: u32, len: usize, block_count: u32 },

    #[display(fmt = "there is no logical unit {}", lun)]
    NoSuchLun { lun: u8 },
}

impl std::error::Error for DiskError {}

/// The inserted cartridge and the disk built for it.
///
/// Created once at boot. The descriptor, mapper and layout never change
/// afterwards, only the cartridge's RAM does (through `write_block`).
pub struct CartSession<B: Bus> {
    bus: B,
    desc: CartridgeDescriptor,
    mapper: Mapper,
    status: StatusBuffer,
    layout: VolumeLayout,
    boot: [u8; BLOCK_SIZE],

    /// Set when the host ejected the disk.
    pub(crate) ejected: bool,

    /// The last decoded photo. Hosts read a file block by block, so without
    /// this every block would decode the whole photo again.
    photo_cache: Option<(u8, Vec<u8>)>,
}

impl<B: Bus> CartSession<B> {
    /// Identifies the cartridge and builds the disk for it. The cartridge
    /// should have passed the logo check already (see
    /// [`wait_for_cartridge`][crate::cartridge::wait_for_cartridge]).
    pub fn boot(mut bus: B, config: &Config) -> Self {
        let desc = identify(&mut bus);
        let mapper = Mapper::for_cartridge(&desc);

        let mut status = StatusBuffer::new();
        status.append(&desc.to_string());
        if !mapper.is_supported() {
            status.append("Mapper not supported, ROM and RAM read as zeros\n");
        }

        if config.self_test {
            let report = selftest::run(&mut bus, &desc, &mapper);
            status.append(&report.to_string());
        }

        let layout = build_volume(&desc, &mapper, &status);

        Self {
            bus,
            desc,
            mapper,
            status,
            layout,
            boot: boot_sector(),
            ejected: false,
            photo_cache: None,
        }
    }

    pub fn descriptor(&self) -> &CartridgeDescriptor {
        &self.desc
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    pub fn status(&self) -> &StatusBuffer {
        &self.status
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Fills `buf` with disk bytes starting `offset` bytes into block `lba`.
    /// The request may span several blocks. Returns the number of bytes read.
    pub fn read_block(&mut self, lba: u32, offset: usize, buf: &mut [u8]) -> Result<usize, DiskError> {
        check_range(lba, offset, buf.len())?;
        trace!("[disk] read LBA 0x{:x}+{}, {} bytes", lba, offset, buf.len());

        for part in BlockParts::new(lba, offset, buf.len()) {
            self.read_part(part.lba, part.offset, &mut buf[part.range]);
        }

        Ok(buf.len())
    }

    /// Writes `buf` to the disk starting `offset` bytes into block `lba`.
    /// Only the save file is backed by anything; all other writes are
    /// accepted and dropped. Returns the number of bytes accepted.
    pub fn write_block(&mut self, lba: u32, offset: usize, buf: &[u8]) -> Result<usize, DiskError> {
        check_range(lba, offset, buf.len())?;
        trace!("[disk] write LBA 0x{:x}+{}, {} bytes", lba, offset, buf.len());

        for part in BlockParts::new(lba, offset, buf.len()) {
            self.write_part(part.lba, part.offset, &buf[part.range]);
        }

        Ok(buf.len())
    }

    /// Reads from a single block.
    fn read_part(&mut self, lba: u32, offset: usize, dest: &mut [u8]) {
        let region = self.layout.region(lba);
        debug!("[disk] LBA 0x{:x} is {:?}", lba, region);

        match region {
            Region::Reserved => dest.copy_from_slice(&self.boot[offset..offset + dest.len()]),
            Region::Fat { block } => self.layout.fat().read(block_offset(block, offset), dest),
            Region::RootDir { block } => {
                self.layout.root_dir().read(block_offset(block, offset), dest)
            }
            Region::Status { block } => self.status.read(block_offset(block, offset), dest),
            Region::Rom { block } => {
                let addr = block_offset(block, offset) as u32;
                if self.mapper.read_rom(&mut self.bus, dest, addr).is_err() {
                    trace!("[disk] no ROM driver, zero filling");
                }
            }
            Region::Ram { block } => {
                let addr = block_offset(block, offset) as u32;
                if self.mapper.read_ram(&mut self.bus, dest, addr).is_err() {
                    trace!("[disk] no RAM driver, zero filling");
                }
            }
            Region::Photo { index, block } => {
                self.read_photo(index, block_offset(block, offset), dest)
            }
            Region::Free => fill(dest, 0),
        }
    }

    /// Writes into a single block.
    fn write_part(&mut self, lba: u32, offset: usize, src: &[u8]) {
        match self.layout.region(lba) {
            Region::Ram { block } => {
                let addr = block_offset(block, offset) as u32;
                if self.mapper.write_ram(&mut self.bus, src, addr).is_err() {
                    warn!("[disk] no RAM driver, dropping write to save file at 0x{:x}", addr);
                }

                // The photos live in RAM, too.
                self.photo_cache = None;
            }
            Region::RootDir { .. } => {
                warn!(
                    "[disk] host wrote to the root directory (LBA 0x{:x}), files can't be \
                        created, renamed or deleted on this disk",
                    lba,
                );
            }
            region => debug!("[disk] dropping write to {:?} (LBA 0x{:x})", region, lba),
        }
    }

    fn read_photo(&mut self, index: u8, offset: usize, dest: &mut [u8]) {
        let cached = match &self.photo_cache {
            Some((i, _)) => *i == index,
            None => false,
        };
        if !cached {
            match decode_photo(&mut self.bus, &self.mapper, index as usize) {
                Ok(bmp) => self.photo_cache = Some((index, bmp)),
                Err(e) => {
                    warn!("[disk] failed to decode photo {}: {}", index, e);
                    fill(dest, 0);
                    return;
                }
            }
        }

        if let Some((_, bmp)) = &self.photo_cache {
            for (i, b) in dest.iter_mut().enumerate() {
                let pos = offset + i;
                *b = if pos < PHOTO_SIZE { bmp[pos] } else { 0 };
            }
        }
    }
}

/// Checks that the whole request is inside the disk.
fn check_range(lba: u32, offset: usize, len: usize) -> Result<(), DiskError> {
    let end = lba as u64 * BLOCK_SIZE as u64 + offset as u64 + len as u64;
    if lba >= DISK_BLOCK_COUNT || end > DISK_BLOCK_COUNT as u64 * BLOCK_SIZE as u64 {
        warn!("[disk] request for LBA 0x{:x}+{} ({} bytes) is out of range", lba, offset, len);
        return Err(DiskError::OutOfRange { lba, len, block_count: DISK_BLOCK_COUNT });
    }
    Ok(())
}

fn block_offset(block: u32, offset: usize) -> usize {
    block as usize * BLOCK_SIZE + offset
}

fn fill(buf: &mut [u8], v: u8) {
    for b in buf {
        *b = v;
    }
}

/// The part of a request that falls into one block.
struct BlockPart {
    lba: u32,

    /// Offset inside the block.
    offset: usize,

    /// Range inside the request buffer.
    range: Range<usize>,
}

/// Splits a request of `len` bytes, starting `offset` bytes into block `lba`,
/// at block boundaries.
struct BlockParts {
    pos: usize,
    done: usize,
    len: usize,
}

impl BlockParts {
    fn new(lba: u32, offset: usize, len: usize) -> Self {
        Self {
            pos: lba as usize * BLOCK_SIZE + offset,
            done: 0,
            len,
        }
    }
}

impl Iterator for BlockParts {
    type Item = BlockPart;

    fn next(&mut self) -> Option<BlockPart> {
        if self.done == self.len {
            return None;
        }

        let offset = self.pos % BLOCK_SIZE;
        let n = (BLOCK_SIZE - offset).min(self.len - self.done);
        let part = BlockPart {
            lba: (self.pos / BLOCK_SIZE) as u32,
            offset,
            range: self.done..self.done + n,
        };

        self.pos += n;
        self.done += n;
        Some(part)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        disk::{entry_size, DATA_LBA, FAT1_LBA, FAT2_LBA, ROOT_DIR_LBA},
        emu::{test_rom, test_rom_byte, EmulatedCartridge},
    };

    fn session(ty: u8, rom_code: u8, ram_code: u8, save: Option<Vec<u8>>) -> CartSession<EmulatedCartridge> {
        let rom = test_rom(ty, rom_code, ram_code, b"SESSION");
        let bus = EmulatedCartridge::new(rom, save).unwrap();
        CartSession::boot(bus, &Config::default())
    }

    fn read(s: &mut CartSession<EmulatedCartridge>, lba: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0xAA; len];
        assert_eq!(s.read_block(lba, 0, &mut buf), Ok(len));
        buf
    }

    #[test]
    fn rom_only_end_to_end() {
        let mut s = session(0x00, 0x00, 0x00, None);
        let rom_lba = s.layout().rom.start_lba();

        let bin = s.layout().root_dir().entry(2).unwrap().to_vec();
        assert_eq!(entry_size(&bin), 32768);

        // The save file slot stays empty.
        let dir = read(&mut s, ROOT_DIR_LBA, BLOCK_SIZE);
        assert!(dir[96..128].iter().all(|&b| b == 0));

        // Block 0x21 of the ROM file is ROM offset 0x4200.
        let block = read(&mut s, rom_lba + 0x21, BLOCK_SIZE);
        let expected: Vec<_> = (0x4200..0x4400).map(test_rom_byte).collect();
        assert_eq!(block, expected);

        // The header is in the first ROM block.
        let first = read(&mut s, rom_lba, BLOCK_SIZE);
        assert_eq!(&first[0x134..0x13B], b"SESSION");
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut s = session(0x00, 0x00, 0x00, None);
        let mut buf = [0xAA; BLOCK_SIZE];

        let err = s.read_block(DISK_BLOCK_COUNT, 0, &mut buf);
        assert_eq!(err, Err(DiskError::OutOfRange {
            lba: DISK_BLOCK_COUNT,
            len: BLOCK_SIZE,
            block_count: DISK_BLOCK_COUNT,
        }));
        assert!(buf.iter().all(|&b| b == 0xAA));

        assert!(s.write_block(DISK_BLOCK_COUNT + 5, 0, &buf).is_err());

        // Starts inside, but runs past the end.
        assert!(s.read_block(DISK_BLOCK_COUNT - 1, 0, &mut [0; 2 * BLOCK_SIZE]).is_err());
        assert!(s.read_block(DISK_BLOCK_COUNT - 1, 0, &mut buf).is_ok());
    }

    #[test]
    fn system_area() {
        let mut s = session(0x01, 0x02, 0x00, None);

        let boot = read(&mut s, 0, BLOCK_SIZE);
        assert_eq!(&boot[..], &boot_sector()[..]);

        let fat1 = read(&mut s, FAT1_LBA, 4 * BLOCK_SIZE);
        let fat2 = read(&mut s, FAT2_LBA, 4 * BLOCK_SIZE);
        assert_eq!(fat1, fat2);
        assert_eq!(&fat1[..8], &[0xF8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x04, 0x00]);
    }

    #[test]
    fn status_file() {
        let rom = test_rom(0x1B, 0x02, 0x02, b"SESSION");
        let bus = EmulatedCartridge::new(rom, None).unwrap();
        let mut s = CartSession::boot(bus, &Config { self_test: true });

        let text = read(&mut s, DATA_LBA, BLOCK_SIZE);
        let text = String::from_utf8_lossy(&text);
        assert!(text.starts_with("Cart Type: MBC5+RAM+BATTERY (0x1b)\n"));
        assert!(text.contains("Cart Title: SESSION\n"));
        assert!(text.contains("SRAM READ/WRITE: PASS\n"));

        // The directory records exactly what was written.
        let status = s.layout().root_dir().entry(1).unwrap().to_vec();
        assert_eq!(entry_size(&status) as usize, s.status().len());

        // Unwritten bytes are spaces, the rest of the cluster is zero.
        assert_eq!(text.as_bytes()[BLOCK_SIZE - 1], b' ');
        assert!(read(&mut s, DATA_LBA + 1, BLOCK_SIZE).iter().all(|&b| b == 0));
    }

    #[test]
    fn save_file_round_trip() {
        let mut save = vec![0; 32 * 1024];
        save[0x2000] = 0x42;
        let mut s = session(0x03, 0x02, 0x03, Some(save));
        let ram_lba = s.layout().ram.start_lba();

        // 0x2000 is the start of bank 1.
        let block = read(&mut s, ram_lba + 0x10, BLOCK_SIZE);
        assert_eq!(block[0], 0x42);

        // A write spanning two blocks, starting in the middle of one.
        let data: Vec<u8> = (0..BLOCK_SIZE as u32).map(|i| i as u8).collect();
        assert_eq!(s.write_block(ram_lba + 3, 256, &data), Ok(BLOCK_SIZE));

        let back = read(&mut s, ram_lba + 3, 2 * BLOCK_SIZE);
        assert_eq!(&back[256..256 + BLOCK_SIZE], &data[..]);
        assert_eq!(&s.bus().ram()[3 * BLOCK_SIZE + 256..4 * BLOCK_SIZE + 256], &data[..]);
    }

    #[test]
    fn writes_outside_the_save_file_are_dropped() {
        let mut s = session(0x03, 0x02, 0x02, None);
        let rom_lba = s.layout().rom.start_lba();
        let junk = [0x55; BLOCK_SIZE];

        let before_dir = read(&mut s, ROOT_DIR_LBA, BLOCK_SIZE);
        let before_rom = read(&mut s, rom_lba, BLOCK_SIZE);

        assert_eq!(s.write_block(ROOT_DIR_LBA, 0, &junk), Ok(BLOCK_SIZE));
        assert_eq!(s.write_block(rom_lba, 0, &junk), Ok(BLOCK_SIZE));
        assert_eq!(s.write_block(0, 0, &junk), Ok(BLOCK_SIZE));

        assert_eq!(read(&mut s, ROOT_DIR_LBA, BLOCK_SIZE), before_dir);
        assert_eq!(read(&mut s, rom_lba, BLOCK_SIZE), before_rom);
        assert!(s.bus().ram().iter().all(|&b| b == 0));
    }

    #[test]
    fn unknown_mapper_reads_zeros() {
        let mut s = session(0x0B, 0x01, 0x00, None);
        let rom_lba = s.layout().rom.start_lba();

        assert!(!s.mapper().is_supported());
        assert!(read(&mut s, rom_lba, BLOCK_SIZE).iter().all(|&b| b == 0));

        let text = read(&mut s, DATA_LBA, BLOCK_SIZE);
        assert!(String::from_utf8_lossy(&text).contains("Mapper not supported"));
    }

    #[test]
    fn camera_photos() {
        let mut save = vec![0; 128 * 1024];

        // Photo 1 is in bank 1, second slot. Its top-left pixel is black.
        save[0x2000 + 0x1000] = 0x80;
        save[0x2000 + 0x1001] = 0x80;
        let mut s = session(0xFC, 0x05, 0x04, Some(save));
        let photo_lba = s.layout().photos.start_lba() + 16;

        let mut bmp = vec![0; 16 * BLOCK_SIZE];
        s.read_block(photo_lba, 0, &mut bmp).unwrap();
        assert_eq!(&bmp[..2], b"BM");
        assert_eq!(bmp[PHOTO_SIZE - 64], 0x0F);
        assert!(bmp[PHOTO_SIZE..].iter().all(|&b| b == 0));

        // Changing the RAM through the save file changes the photo.
        let ram_lba = s.layout().ram.start_lba();
        s.write_block(ram_lba + 0x18, 0, &[0x00, 0x00]).unwrap();
        s.read_block(photo_lba, 0, &mut bmp).unwrap();
        assert_eq!(bmp[PHOTO_SIZE - 64], 0xFF);
    }
}
