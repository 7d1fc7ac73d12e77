//! The interface the USB mass storage stack talks to.
//!
//! The stack itself (SCSI parsing, endpoints, sense data) lives outside of
//! this crate; it calls into a [`BlockDevice`] for everything that concerns
//! the disk.

use crate::{
    bus::Bus,
    disk::{BLOCK_SIZE, DISK_BLOCK_COUNT},
    log::*,
    session::{CartSession, DiskError},
};


/// SCSI inquiry strings, space padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inquiry {
    pub vendor: [u8; 8],
    pub product: [u8; 16],
    pub revision: [u8; 4],
}

impl Inquiry {
    fn new(vendor: &str, product: &str, revision: &str) -> Self {
        let mut out = Self {
            vendor: [b' '; 8],
            product: [b' '; 16],
            revision: [b' '; 4],
        };
        pad(&mut out.vendor, vendor);
        pad(&mut out.product, product);
        pad(&mut out.revision, revision);
        out
    }
}

fn pad(out: &mut [u8], s: &str) {
    for (dst, src) in out.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
}

/// A disk with a single logical unit (LUN 0).
pub trait BlockDevice {
    fn inquiry(&self, lun: u8) -> Result<Inquiry, DiskError>;

    /// `false` once the host has ejected the medium.
    fn test_unit_ready(&self, lun: u8) -> bool;

    /// Returns `(block count, block size)`.
    fn capacity(&self, lun: u8) -> Result<(u32, u16), DiskError>;

    /// Handles START STOP UNIT. Returns whether the command succeeded.
    fn start_stop(&mut self, lun: u8, start: bool, load_eject: bool) -> bool;

    /// READ(10): fills `buf` starting `offset` bytes into block `lba`.
    fn read10(&mut self, lun: u8, lba: u32, offset: usize, buf: &mut [u8]) -> Result<usize, DiskError>;

    /// WRITE(10): writes `buf` starting `offset` bytes into block `lba`.
    fn write10(&mut self, lun: u8, lba: u32, offset: usize, buf: &[u8]) -> Result<usize, DiskError>;
}

fn check_lun(lun: u8) -> Result<(), DiskError> {
    if lun == 0 {
        Ok(())
    } else {
        Err(DiskError::NoSuchLun { lun })
    }
}

impl<B: Bus> BlockDevice for CartSession<B> {
    fn inquiry(&self, lun: u8) -> Result<Inquiry, DiskError> {
        check_lun(lun)?;
        Ok(Inquiry::new("CartDisk", "Game Boy Cart", "1.0"))
    }

    fn test_unit_ready(&self, lun: u8) -> bool {
        lun == 0 && !self.ejected
    }

    fn capacity(&self, lun: u8) -> Result<(u32, u16), DiskError> {
        check_lun(lun)?;
        Ok((DISK_BLOCK_COUNT, BLOCK_SIZE as u16))
    }

    fn start_stop(&mut self, lun: u8, start: bool, load_eject: bool) -> bool {
        if lun != 0 {
            return false;
        }

        if load_eject {
            self.ejected = !start;
            info!("[msc] medium {}", if start { "loaded" } else { "ejected" });
        }
        true
    }

    fn read10(&mut self, lun: u8, lba: u32, offset: usize, buf: &mut [u8]) -> Result<usize, DiskError> {
        check_lun(lun)?;
        self.read_block(lba, offset, buf)
    }

    fn write10(&mut self, lun: u8, lba: u32, offset: usize, buf: &[u8]) -> Result<usize, DiskError> {
        check_lun(lun)?;
        self.write_block(lba, offset, buf)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        emu::{test_rom, EmulatedCartridge},
        session::Config,
    };

    fn device() -> CartSession<EmulatedCartridge> {
        let rom = test_rom(0x00, 0x00, 0x00, b"MSC");
        let bus = EmulatedCartridge::new(rom, None).unwrap();
        CartSession::boot(bus, &Config::default())
    }

    #[test]
    fn capacity() {
        let dev = device();
        assert_eq!(dev.capacity(0), Ok((0x4_0000, 512)));
        assert_eq!(dev.capacity(1), Err(DiskError::NoSuchLun { lun: 1 }));
    }

    #[test]
    fn inquiry_is_padded() {
        let inq = device().inquiry(0).unwrap();
        assert_eq!(&inq.vendor, b"CartDisk");
        assert_eq!(&inq.product, b"Game Boy Cart   ");
        assert_eq!(&inq.revision, b"1.0 ");
    }

    #[test]
    fn eject() {
        let mut dev = device();
        assert!(dev.test_unit_ready(0));

        // Power state changes without load/eject don't matter.
        assert!(dev.start_stop(0, false, false));
        assert!(dev.test_unit_ready(0));

        assert!(dev.start_stop(0, false, true));
        assert!(!dev.test_unit_ready(0));

        assert!(dev.start_stop(0, true, true));
        assert!(dev.test_unit_ready(0));
    }

    #[test]
    fn io_goes_to_the_session() {
        let mut dev = device();
        let mut buf = [0; 512];

        assert_eq!(dev.read10(0, 0, 0, &mut buf), Ok(512));
        assert_eq!(&buf[510..], &[0x55, 0xAA]);

        assert_eq!(dev.read10(2, 0, 0, &mut buf), Err(DiskError::NoSuchLun { lun: 2 }));
        assert!(dev.write10(0, 0x4_0000, 0, &buf).is_err());
        assert_eq!(dev.write10(0, 0, 0, &buf), Ok(512));
    }
}
