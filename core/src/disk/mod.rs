//! The synthetic FAT16 volume.
//!
//! Nothing of this volume exists anywhere: the boot sector, both FAT copies
//! and the root directory are built once at boot from the cartridge
//! descriptor, and every file block is produced on demand by the dispatcher.
//!
//! Disk layout (LBAs):
//!
//! ```text
//! 0x000           boot sector
//! 0x001..0x082    FAT 1
//! 0x082..0x103    FAT 2 (same bytes)
//! 0x103..0x123    root directory (512 entries)
//! 0x123..         data region, cluster 2 onwards:
//!                 STATUS.TXT, <TITLE>.BIN, <TITLE>.SAV, GBCAM_*.BMP
//! ```

use crate::{
    cartridge::CartridgeDescriptor,
    log::*,
    mbc::{Driver, Mapper},
    photo::{PHOTO_COUNT, PHOTO_SIZE},
};
pub use self::{
    boot::boot_sector,
    dir::{entry_cluster, entry_size, RootDirectory, ENTRY_SIZE},
    fat::{FatTable, END_OF_CHAIN},
    status::{StatusBuffer, STATUS_CAPACITY},
};

mod boot;
mod dir;
mod fat;
mod status;


/// Size of one block (sector) in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Blocks per cluster.
pub const CLUSTER_BLOCKS: u32 = 8;

/// Size of one cluster in bytes.
pub const CLUSTER_SIZE: u32 = CLUSTER_BLOCKS * BLOCK_SIZE as u32;

/// Number of blocks the device reports. 128 MiB, which keeps the cluster
/// count inside what `FAT_BLOCKS` can address and above the FAT12 limit.
pub const DISK_BLOCK_COUNT: u32 = 0x4_0000;

pub const RESERVED_BLOCKS: u32 = 1;
pub const FAT_COUNT: u32 = 2;

/// Size of one FAT copy in blocks.
pub const FAT_BLOCKS: u32 = 0x81;

/// Number of entries in the root directory.
pub const ROOT_ENTRIES: u32 = 512;

pub const FAT1_LBA: u32 = RESERVED_BLOCKS;
pub const FAT2_LBA: u32 = FAT1_LBA + FAT_BLOCKS;
pub const ROOT_DIR_LBA: u32 = FAT2_LBA + FAT_BLOCKS;
pub const ROOT_DIR_BLOCKS: u32 = ROOT_ENTRIES * ENTRY_SIZE as u32 / BLOCK_SIZE as u32;
pub const DATA_LBA: u32 = ROOT_DIR_LBA + ROOT_DIR_BLOCKS;

/// The first data cluster. Clusters 0 and 1 only exist in the FAT.
pub const FIRST_CLUSTER: u16 = 2;

/// Clusters per camera photo.
pub const PHOTO_CLUSTERS: u32 = 2;

/// Number of clusters needed for `n` bytes.
pub fn byte2cls(n: u32) -> u32 {
    (n + CLUSTER_SIZE - 1) / CLUSTER_SIZE
}

/// Number of blocks needed for `n` bytes.
pub fn byte2blk(n: u32) -> u32 {
    (n + BLOCK_SIZE as u32 - 1) / BLOCK_SIZE as u32
}

/// First LBA of `cluster`.
pub fn cluster_lba(cluster: u16) -> u32 {
    DATA_LBA + (cluster as u32 - FIRST_CLUSTER as u32) * CLUSTER_BLOCKS
}


/// Where a file lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub start_cluster: u16,
    pub clusters: u32,
}

impl Extent {
    const EMPTY: Extent = Extent { start_cluster: 0, clusters: 0 };

    pub fn start_lba(&self) -> u32 {
        if self.clusters == 0 {
            0
        } else {
            cluster_lba(self.start_cluster)
        }
    }

    pub fn blocks(&self) -> u32 {
        self.clusters * CLUSTER_BLOCKS
    }

    /// If `lba` is inside this extent, returns the block index inside it.
    fn block_of(&self, lba: u32) -> Option<u32> {
        let start = self.start_lba();
        if self.clusters > 0 && lba >= start && lba < start + self.blocks() {
            Some(lba - start)
        } else {
            None
        }
    }
}

/// What a block of the disk belongs to. Block numbers are relative to the
/// start of the respective area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Reserved,

    /// One of the two FAT copies.
    Fat { block: u32 },

    RootDir { block: u32 },
    Status { block: u32 },
    Rom { block: u32 },
    Ram { block: u32 },
    Photo { index: u8, block: u32 },

    /// Inside the disk, but not part of any file.
    Free,
}

/// Everything the dispatcher needs to know about the volume: the extents of
/// all files, the FAT and the root directory. Immutable after `build_volume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeLayout {
    pub status: Extent,
    pub rom: Extent,
    pub ram: Extent,

    /// All photo files, one after another.
    pub photos: Extent,

    /// First LBA after the last file.
    pub data_end: u32,

    fat: FatTable,
    root: RootDirectory,
}

impl VolumeLayout {
    pub fn fat(&self) -> &FatTable {
        &self.fat
    }

    pub fn root_dir(&self) -> &RootDirectory {
        &self.root
    }

    /// Looks up which area `lba` belongs to. `lba` has to be inside the disk.
    pub fn region(&self, lba: u32) -> Region {
        if lba < FAT1_LBA {
            Region::Reserved
        } else if lba < FAT2_LBA {
            Region::Fat { block: lba - FAT1_LBA }
        } else if lba < ROOT_DIR_LBA {
            Region::Fat { block: lba - FAT2_LBA }
        } else if lba < DATA_LBA {
            Region::RootDir { block: lba - ROOT_DIR_LBA }
        } else if let Some(block) = self.status.block_of(lba) {
            Region::Status { block }
        } else if let Some(block) = self.rom.block_of(lba) {
            Region::Rom { block }
        } else if let Some(block) = self.ram.block_of(lba) {
            Region::Ram { block }
        } else if let Some(block) = self.photos.block_of(lba) {
            let per_photo = PHOTO_CLUSTERS * CLUSTER_BLOCKS;
            Region::Photo {
                index: (block / per_photo) as u8,
                block: block % per_photo,
            }
        } else {
            Region::Free
        }
    }
}

/// Builds the volume for the identified cartridge.
///
/// Files get consecutive clusters from cluster 2 on, in this order:
/// `STATUS.TXT` (always one cluster), the ROM, the RAM (if any), and the 30
/// camera photos (camera only). The size recorded for `STATUS.TXT` is its
/// length right now.
pub fn build_volume(
    desc: &CartridgeDescriptor,
    mapper: &Mapper,
    status: &StatusBuffer,
) -> VolumeLayout {
    let mut fat = FatTable::new();
    let mut root = RootDirectory::new();

    let name = file_stem(desc);
    root.push_label(if desc.title().is_empty() { "CARTDISK" } else { desc.title() });

    let status_extent = allocate(&mut fat, 1);
    root.push_file("STATUS", "TXT", status_extent.start_cluster, status.len() as u32);

    let rom_extent = allocate(&mut fat, byte2cls(mapper.rom_size()));
    root.push_file(&name, "BIN", rom_extent.start_cluster, mapper.rom_size());

    let ram_extent = allocate(&mut fat, byte2cls(mapper.ram_size()));
    if ram_extent.clusters > 0 {
        root.push_file(&name, "SAV", ram_extent.start_cluster, mapper.ram_size());
    }

    let photos = match mapper.driver() {
        Driver::Camera(_) => {
            let first = fat.next_free();
            for i in 0..PHOTO_COUNT {
                let photo = allocate(&mut fat, PHOTO_CLUSTERS);
                root.push_file(&format!("GBCAM_{}", i), "BMP", photo.start_cluster, PHOTO_SIZE as u32);
            }
            Extent {
                start_cluster: first,
                clusters: PHOTO_COUNT as u32 * PHOTO_CLUSTERS,
            }
        }
        _ => Extent::EMPTY,
    };

    let data_end = cluster_lba(fat.next_free());
    info!(
        "[disk] volume built: {} files, ROM at LBA 0x{:x}, RAM at LBA 0x{:x}, data ends at 0x{:x}",
        root.len() - 1,
        rom_extent.start_lba(),
        ram_extent.start_lba(),
        data_end,
    );
    if data_end > DISK_BLOCK_COUNT {
        error!("[disk] files need {} blocks, but the disk only has {}", data_end, DISK_BLOCK_COUNT);
    }

    VolumeLayout {
        status: status_extent,
        rom: rom_extent,
        ram: ram_extent,
        photos,
        data_end,
        fat,
        root,
    }
}

fn allocate(fat: &mut FatTable, clusters: u32) -> Extent {
    match fat.allocate(clusters) {
        Some(start_cluster) => Extent { start_cluster, clusters },
        None => Extent::EMPTY,
    }
}

/// The 8 character stem used for the ROM and save file.
fn file_stem(desc: &CartridgeDescriptor) -> String {
    match desc.title() {
        "" => "UNTITLED".to_string(),
        title => title.chars().take(8).collect(),
    }
}
