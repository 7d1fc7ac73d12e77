//! A quick check that the driver and the cartridge agree with each other.
//!
//! Run at boot (when enabled), before the volume is built. The results end up
//! in `STATUS.TXT`, so a user with a flaky cartridge connector can see what's
//! wrong without any tooling.

use std::fmt;

use derive_more::Display;

use crate::{
    bus::{Bus, ROM_BANK_SIZE, SRAM_BANK_SIZE},
    cartridge::CartridgeDescriptor,
    log::*,
    mbc::Mapper,
};


/// How often a memory area is read again and compared to the first read.
const COHERENCY_ROUNDS: usize = 4;

/// Bytes compared between consecutive ROM banks.
const SLICE_LEN: usize = 16;

/// Where in each ROM bank the slice is taken from. Away from the start, where
/// many games keep identical bank headers.
const SLICE_OFFSET: u32 = 0x1234;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    #[display(fmt = "PASS")]
    Pass,
    #[display(fmt = "FAIL")]
    Fail,
    #[display(fmt = "SKIPPED")]
    Skipped,
}

impl Outcome {
    fn from_bool(ok: bool) -> Self {
        if ok { Outcome::Pass } else { Outcome::Fail }
    }
}

/// Results of all checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub rom_coherency: Outcome,
    pub sram_coherency: Outcome,
    pub sram_read_write: Outcome,
    pub rom_bank_switching: Outcome,
}

impl Report {
    /// `true` if no check failed.
    pub fn passed(&self) -> bool {
        [
            self.rom_coherency,
            self.sram_coherency,
            self.sram_read_write,
            self.rom_bank_switching,
        ].iter().all(|&o| o != Outcome::Fail)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "ROM COHERENCY: {}", self.rom_coherency)?;
        writeln!(f, "SRAM COHERENCY: {}", self.sram_coherency)?;
        writeln!(f, "SRAM READ/WRITE: {}", self.sram_read_write)?;
        writeln!(f, "ROM BANK SWITCHING: {}", self.rom_bank_switching)
    }
}

/// Runs all checks. Leaves RAM as it was found (unless the cartridge is
/// broken in a way that makes the restore fail, too).
pub fn run<B: Bus>(bus: &mut B, desc: &CartridgeDescriptor, mapper: &Mapper) -> Report {
    if !mapper.is_supported() {
        info!("[selftest] no driver, skipping all checks");
        return Report {
            rom_coherency: Outcome::Skipped,
            sram_coherency: Outcome::Skipped,
            sram_read_write: Outcome::Skipped,
            rom_bank_switching: Outcome::Skipped,
        };
    }

    let report = Report {
        rom_coherency: rom_coherency(bus, mapper),
        sram_coherency: sram_coherency(bus, mapper),
        sram_read_write: sram_read_write(bus, mapper),
        rom_bank_switching: rom_bank_switching(bus, desc, mapper),
    };

    if report.passed() {
        info!("[selftest] all checks passed");
    } else {
        warn!("[selftest] some checks failed:\n{}", report);
    }
    report
}

/// Reads `len` bytes a few times and checks that the result never changes.
/// `read` returns `false` if the read failed, which fails the check.
fn coherent(mut read: impl FnMut(&mut [u8]) -> bool, len: usize) -> bool {
    let mut first = vec![0; len];
    let mut again = vec![0; len];

    read(&mut first) && (0..COHERENCY_ROUNDS).all(|_| {
        read(&mut again) && first == again
    })
}

fn rom_coherency<B: Bus>(bus: &mut B, mapper: &Mapper) -> Outcome {
    let ok = coherent(
        |buf| mapper.read_rom(bus, buf, 0).is_ok(),
        ROM_BANK_SIZE as usize,
    );
    Outcome::from_bool(ok)
}

fn sram_coherency<B: Bus>(bus: &mut B, mapper: &Mapper) -> Outcome {
    if mapper.ram_size() == 0 {
        return Outcome::Skipped;
    }

    let ok = coherent(
        |buf| mapper.read_ram(bus, buf, 0).is_ok(),
        mapper.ram_size() as usize,
    );
    Outcome::from_bool(ok)
}

/// Writes the complement of one byte in every RAM bank, reads it back and
/// restores the old value.
fn sram_read_write<B: Bus>(bus: &mut B, mapper: &Mapper) -> Outcome {
    let ram_size = mapper.ram_size();
    if ram_size == 0 {
        return Outcome::Skipped;
    }

    let bank_size = ram_size.min(SRAM_BANK_SIZE);
    let mut ok = true;
    for bank in 0..(ram_size / bank_size) {
        let addr = bank * bank_size + bank_size / 2 + bank;

        let mut saved = [0];
        let mut found = [0];
        let res = mapper.read_ram(bus, &mut saved, addr)
            .and_then(|_| mapper.write_ram(bus, &[!saved[0]], addr))
            .and_then(|_| mapper.read_ram(bus, &mut found, addr))
            .and_then(|_| mapper.write_ram(bus, &saved, addr));

        if res.is_err() || found[0] != !saved[0] {
            debug!(
                "[selftest] RAM at 0x{:x}: wrote 0x{:02x}, read 0x{:02x}",
                addr,
                !saved[0],
                found[0],
            );
            ok = false;
        }
    }

    Outcome::from_bool(ok)
}

/// Compares a slice of every switchable bank with the one of the bank before.
/// A cartridge where every bank reads the same can't be switching.
fn rom_bank_switching<B: Bus>(bus: &mut B, desc: &CartridgeDescriptor, mapper: &Mapper) -> Outcome {
    if desc.rom_banks <= 2 {
        return Outcome::Skipped;
    }

    let mut prev = [0; SLICE_LEN];
    let mut cur = [0; SLICE_LEN];
    if mapper.read_rom(bus, &mut prev, ROM_BANK_SIZE + SLICE_OFFSET).is_err() {
        return Outcome::Fail;
    }

    let mut switched = false;
    for bank in 2..desc.rom_banks as u32 {
        if mapper.read_rom(bus, &mut cur, bank * ROM_BANK_SIZE + SLICE_OFFSET).is_err() {
            return Outcome::Fail;
        }
        if cur != prev {
            switched = true;
        }
        prev = cur;
    }

    Outcome::from_bool(switched)
}
