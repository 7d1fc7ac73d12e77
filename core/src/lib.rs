//! CartDisk: a Game Boy cartridge as a USB disk.
//!
//! This is the core of the adapter firmware. It identifies the cartridge on
//! the [`Bus`], picks a driver for its memory bank controller and builds a
//! synthetic FAT16 volume in which the ROM, the save RAM and (for the Pocket
//! Camera) the photos show up as files. Nothing of that volume is stored:
//! every block the host reads is produced on demand by [`CartSession`].
//!
//! The usual boot sequence:
//!
//! ```ignore
//! wait_for_cartridge(&mut bus, |_| led.toggle());
//! let mut session = CartSession::boot(bus, &Config::default());
//! usb_stack.run(&mut session);
//! ```


mod log;

pub mod bus;
pub mod cartridge;
pub mod disk;
pub mod emu;
pub mod mbc;
pub mod msc;
pub mod photo;
pub mod primitives;
pub mod selftest;
pub mod session;

pub use crate::{
    bus::Bus,
    cartridge::{check_logo, identify, wait_for_cartridge, CartridgeDescriptor, MapperKind},
    disk::{build_volume, Region, VolumeLayout},
    emu::EmulatedCartridge,
    mbc::{Mapper, Unsupported},
    msc::BlockDevice,
    primitives::Word,
    session::{CartSession, Config, DiskError},
};
