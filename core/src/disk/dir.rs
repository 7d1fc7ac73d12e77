use super::{byte2blk, BLOCK_SIZE, ROOT_ENTRIES};


/// Size of one directory entry.
pub const ENTRY_SIZE: usize = 32;

const ATTR_ARCHIVE: u8 = 0x20;
const ATTR_VOLUME_LABEL: u8 = 0x08;

const CLUSTER_OFFSET: usize = 26;
const SIZE_OFFSET: usize = 28;

/// Bytes 11..26 of every file entry: archive attribute and a fixed
/// creation/modification timestamp.
const ENTRY_TEMPLATE: [u8; 15] = [
    ATTR_ARCHIVE, 0x00, 0xC6, 0x52, 0x6D, 0x65, 0x43, 0x65,
    0x43, 0x00, 0x00, 0x88, 0x6D, 0x65, 0x43,
];

/// The root directory. Entries are appended in order; the region is
/// `ROOT_ENTRIES` entries long and everything after the last entry reads as
/// zeros (which also marks the end of the directory for the host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDirectory {
    /// Always a whole number of blocks.
    bytes: Vec<u8>,
    entries: usize,
}

impl RootDirectory {
    pub fn new() -> Self {
        Self {
            bytes: vec![],
            entries: 0,
        }
    }

    /// Adds the volume label entry. The label is sanitised like a file name
    /// but may contain spaces.
    pub fn push_label(&mut self, label: &str) {
        let mut entry = [0; ENTRY_SIZE];
        fill_name(&mut entry[..11], label, true);
        entry[11] = ATTR_VOLUME_LABEL | ATTR_ARCHIVE;
        self.push(entry);
    }

    /// Adds a file entry. `name` and `ext` are upper-cased and sanitised into
    /// valid 8.3 characters.
    pub fn push_file(&mut self, name: &str, ext: &str, start_cluster: u16, size: u32) {
        let mut entry = [0; ENTRY_SIZE];
        fill_name(&mut entry[..8], name, false);
        fill_name(&mut entry[8..11], ext, false);
        entry[11..CLUSTER_OFFSET].copy_from_slice(&ENTRY_TEMPLATE);
        entry[CLUSTER_OFFSET..SIZE_OFFSET].copy_from_slice(&start_cluster.to_le_bytes());
        entry[SIZE_OFFSET..].copy_from_slice(&size.to_le_bytes());
        self.push(entry);
    }

    fn push(&mut self, entry: [u8; ENTRY_SIZE]) {
        debug_assert!(self.entries < ROOT_ENTRIES as usize);

        let at = self.entries * ENTRY_SIZE;
        let blocks = byte2blk((at + ENTRY_SIZE) as u32) as usize;
        self.bytes.resize(blocks * BLOCK_SIZE, 0);
        self.bytes[at..at + ENTRY_SIZE].copy_from_slice(&entry);
        self.entries += 1;
    }

    /// Number of entries, including the volume label.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Returns entry `i`.
    pub fn entry(&self, i: usize) -> Option<&[u8]> {
        if i < self.entries {
            Some(&self.bytes[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE])
        } else {
            None
        }
    }

    /// The stored bytes, padded to whole blocks.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the directory bytes starting at `offset` into `dest`.
    pub fn read(&self, offset: usize, dest: &mut [u8]) {
        for (i, b) in dest.iter_mut().enumerate() {
            *b = self.bytes.get(offset + i).cloned().unwrap_or(0);
        }
    }
}

/// Start cluster stored in a file entry.
pub fn entry_cluster(entry: &[u8]) -> u16 {
    u16::from_le_bytes([entry[CLUSTER_OFFSET], entry[CLUSTER_OFFSET + 1]])
}

/// File size stored in a file entry.
pub fn entry_size(entry: &[u8]) -> u32 {
    let mut b = [0; 4];
    b.copy_from_slice(&entry[SIZE_OFFSET..SIZE_OFFSET + 4]);
    u32::from_le_bytes(b)
}

/// Writes `s` into `out`: upper-cased, characters that are not allowed in
/// short names replaced by `_`, padded with spaces.
fn fill_name(out: &mut [u8], s: &str, allow_space: bool) {
    let mut chars = s.bytes();
    for b in out.iter_mut() {
        *b = match chars.next() {
            Some(c) => short_name_char(c, allow_space),
            None => b' ',
        };
    }
}

fn short_name_char(c: u8, allow_space: bool) -> u8 {
    let c = c.to_ascii_uppercase();
    match c {
        b'A'..=b'Z' | b'0'..=b'9' => c,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'(' | b')' | b'-' | b'@' | b'^' | b'_'
            | b'`' | b'{' | b'}' | b'~' => c,
        b' ' if allow_space => c,
        _ => b'_',
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_entry_layout() {
        let mut dir = RootDirectory::new();
        dir.push_label("Zelda");
        dir.push_file("status", "txt", 2, 0x1234);

        let label = dir.entry(0).unwrap();
        assert_eq!(&label[..11], b"ZELDA      ");
        assert_eq!(label[11], 0x28);

        let e = dir.entry(1).unwrap();
        assert_eq!(&e[..11], b"STATUS  TXT");
        assert_eq!(&e[11..26], &ENTRY_TEMPLATE);
        assert_eq!(entry_cluster(e), 2);
        assert_eq!(entry_size(e), 0x1234);
        assert_eq!(&e[26..], &[0x02, 0x00, 0x34, 0x12, 0x00, 0x00]);
    }

    #[test]
    fn names_are_sanitised() {
        let mut dir = RootDirectory::new();
        dir.push_file("pm.gold*", "sav", 3, 0);
        dir.push_file("POKEMON RED", "BIN", 3, 0);
        dir.push_label("POKEMON RED");

        assert_eq!(&dir.entry(0).unwrap()[..11], b"PM_GOLD_SAV");
        assert_eq!(&dir.entry(1).unwrap()[..11], b"POKEMON_BIN");
        assert_eq!(&dir.entry(2).unwrap()[..11], b"POKEMON RED");
    }

    #[test]
    fn block_aligned() {
        let mut dir = RootDirectory::new();
        assert_eq!(dir.as_bytes().len(), 0);

        dir.push_label("X");
        assert_eq!(dir.as_bytes().len(), BLOCK_SIZE);

        for i in 0..16 {
            dir.push_file(&format!("F{}", i), "BIN", 2, 0);
        }
        assert_eq!(dir.len(), 17);
        assert_eq!(dir.as_bytes().len(), 2 * BLOCK_SIZE);

        let mut buf = [0xAA; 4];
        dir.read(10 * BLOCK_SIZE, &mut buf);
        assert_eq!(buf, [0; 4]);
    }
}
