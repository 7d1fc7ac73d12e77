use super::{BLOCK_SIZE, FAT_BLOCKS, FIRST_CLUSTER};


/// Marks the last cluster of a chain.
pub const END_OF_CHAIN: u16 = 0xFFFF;

/// Entry 0 holds the media descriptor in its low byte.
const MEDIA_ENTRY: u16 = 0xFFF8;

/// The file allocation table.
///
/// Only the entries up to the last allocated cluster are stored. The rest of
/// the `FAT_BLOCKS` blocks reads as zero (free clusters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatTable {
    entries: Vec<u16>,
}

impl FatTable {
    pub fn new() -> Self {
        Self {
            entries: vec![MEDIA_ENTRY, END_OF_CHAIN],
        }
    }

    /// The next cluster that `allocate` will hand out.
    pub fn next_free(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Allocates a chain of `clusters` consecutive clusters and returns its
    /// first cluster. Returns `None` for an empty chain; such files have no
    /// clusters at all.
    pub fn allocate(&mut self, clusters: u32) -> Option<u16> {
        if clusters == 0 {
            return None;
        }

        let start = self.next_free();
        for i in 1..clusters {
            self.entries.push(start + i as u16);
        }
        self.entries.push(END_OF_CHAIN);

        Some(start)
    }

    /// The entry for `cluster`.
    pub fn entry(&self, cluster: u16) -> u16 {
        self.entries.get(cluster as usize).cloned().unwrap_or(0)
    }

    /// Number of stored entries (including the two reserved ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Follows the chain starting at `start` and returns all its clusters.
    pub fn chain(&self, start: u16) -> Vec<u16> {
        let mut out = vec![];
        let mut cluster = start;
        while cluster >= FIRST_CLUSTER && out.len() < self.entries.len() {
            out.push(cluster);
            match self.entry(cluster) {
                END_OF_CHAIN => break,
                next => cluster = next,
            }
        }
        out
    }

    /// Copies the FAT bytes starting at `offset` (relative to the start of
    /// one FAT copy) into `dest`.
    pub fn read(&self, offset: usize, dest: &mut [u8]) {
        for (i, b) in dest.iter_mut().enumerate() {
            let pos = offset + i;
            *b = if pos < FAT_BLOCKS as usize * BLOCK_SIZE {
                let [lo, hi] = self.entry((pos / 2) as u16).to_le_bytes();
                if pos % 2 == 0 { lo } else { hi }
            } else {
                0
            };
        }
    }
}
