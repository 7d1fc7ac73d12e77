use std::fmt;

use crate::log::*;
use super::BLOCK_SIZE;


/// Capacity of the status file. It has a whole cluster on disk, but one block
/// is plenty.
pub const STATUS_CAPACITY: usize = BLOCK_SIZE;

/// The contents of `STATUS.TXT`.
///
/// Append-only text with a fixed capacity. Everything beyond the capacity is
/// silently cut off; unwritten bytes read back as spaces.
#[derive(Clone)]
pub struct StatusBuffer {
    buf: [u8; STATUS_CAPACITY],
    len: usize,
}

impl StatusBuffer {
    pub fn new() -> Self {
        Self {
            buf: [b' '; STATUS_CAPACITY],
            len: 0,
        }
    }

    /// Appends as much of `s` as still fits.
    pub fn append(&mut self, s: &str) {
        let n = s.len().min(STATUS_CAPACITY - self.len);
        if n < s.len() {
            debug!("[status] status file full, dropping {} bytes", s.len() - n);
        }

        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Copies the file contents starting at `offset` into `dest`. Past the
    /// capacity, the file reads as zeros.
    pub fn read(&self, offset: usize, dest: &mut [u8]) {
        for (i, b) in dest.iter_mut().enumerate() {
            *b = self.buf.get(offset + i).cloned().unwrap_or(0);
        }
    }
}

impl Default for StatusBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for StatusBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

// Manual implementation to print the text instead of 512 numbers.
impl fmt::Debug for StatusBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StatusBuffer")
            .field("text", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn unwritten_bytes_are_spaces() {
        let mut status = StatusBuffer::new();
        status.append("hi\n");

        let mut buf = [0; 6];
        status.read(0, &mut buf);
        assert_eq!(&buf, b"hi\n   ");
        assert_eq!(status.len(), 3);
    }

    #[test]
    fn truncates_at_capacity() {
        let mut status = StatusBuffer::new();
        for _ in 0..100 {
            write!(status, "0123456789").unwrap();
        }

        assert_eq!(status.len(), STATUS_CAPACITY);
        assert_eq!(&status.as_bytes()[..10], b"0123456789");
        assert_eq!(status.as_bytes()[STATUS_CAPACITY - 1], b'1');

        // Appending to a full buffer doesn't change anything.
        status.append("x");
        assert_eq!(status.len(), STATUS_CAPACITY);
    }

    #[test]
    fn past_capacity_reads_zero() {
        let status = StatusBuffer::new();
        let mut buf = [0xAA; 4];
        status.read(STATUS_CAPACITY - 2, &mut buf);
        assert_eq!(buf, [b' ', b' ', 0, 0]);
    }
}
