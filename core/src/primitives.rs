use std::{
    ops::{Add, Sub},
    fmt::{self, Debug, Display},
};

use derive_more::From;


/// A 16 bit address on the cartridge bus.
///
/// Drivers only ever put `Word`s on the bus. Everything above them (the
/// volume builder, the dispatcher) deals in linear `u32` offsets into ROM or
/// RAM instead.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From)]
pub struct Word(u16);

impl Word {
    pub const fn new(val: u16) -> Self {
        Word(val)
    }

    pub const fn zero() -> Self {
        Self::new(0)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Returns this address as an index (e.g. into an image buffer).
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Add<u16> for Word {
    type Output = Self;

    fn add(self, rhs: u16) -> Self {
        Word(self.0.wrapping_add(rhs))
    }
}

impl Sub<u16> for Word {
    type Output = Self;

    fn sub(self, rhs: u16) -> Self {
        Word(self.0.wrapping_sub(rhs))
    }
}

impl Sub for Word {
    type Output = u16;

    fn sub(self, rhs: Self) -> u16 {
        self.0.wrapping_sub(rhs.0)
    }
}

impl Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(self, f)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn word_arithmetic_wraps() {
        assert_eq!(Word::new(0xFFFF) + 1, Word::zero());
        assert_eq!(Word::zero() - 1, Word::new(0xFFFF));
        assert_eq!(Word::new(0xA010) - Word::new(0xA000), 0x10);
    }

    #[test]
    fn word_formats_as_hex() {
        assert_eq!(format!("{}", Word::new(0x4000)), "0x4000");
        assert_eq!(format!("{:?}", Word::from(0xA0u16)), "0x00a0");
    }
}
