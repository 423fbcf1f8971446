use std::cmp::Ordering;
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::core::config::MAXENTRYPOS;
use crate::core::error::{Error, ErrorKind, Result};

const WEIGHT_SHIFT: u16 = 14;
const OFFSET_MASK: u16 = (1 << WEIGHT_SHIFT) - 1;

/// Weight class of an occurrence. `D` means "no weight" and is never printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weight {
    D = 0,
    C = 1,
    B = 2,
    A = 3,
}

impl Weight {
    pub fn letter(self) -> Option<char> {
        match self {
            Weight::A => Some('A'),
            Weight::B => Some('B'),
            Weight::C => Some('C'),
            Weight::D => None,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            3 => Weight::A,
            2 => Weight::B,
            1 => Weight::C,
            _ => Weight::D,
        }
    }
}

impl TryFrom<u8> for Weight {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Weight::D),
            1 => Ok(Weight::C),
            2 => Ok(Weight::B),
            3 => Ok(Weight::A),
            other => Err(Error::new(
                ErrorKind::ValueOutOfRange,
                format!("weight class {} is not one of 0..=3", other),
            )),
        }
    }
}

/// One packed token position: offset in the low 14 bits, weight in the top 2.
///
/// Equality compares the raw value; use [`WordPos::cmp_offset`] and
/// [`WordPos::same_token`] where only the offset matters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordPos(u16);

impl WordPos {
    pub const MAX_OFFSET: u16 = MAXENTRYPOS - 1;

    pub fn new(offset: u16, weight: Weight) -> Result<Self> {
        if offset > Self::MAX_OFFSET {
            return Err(Error::new(
                ErrorKind::ValueOutOfRange,
                format!("position {} is out of range 0..={}", offset, Self::MAX_OFFSET),
            ));
        }
        Ok(WordPos(offset | ((weight as u16) << WEIGHT_SHIFT)))
    }

    /// Checked construction from wider integers, e.g. values coming from callers
    /// that do not use [`Weight`].
    pub fn from_parts(offset: u32, weight: u8) -> Result<Self> {
        let weight = Weight::try_from(weight)?;
        let offset = u16::try_from(offset).map_err(|_| {
            Error::new(
                ErrorKind::ValueOutOfRange,
                format!("position {} is out of range 0..={}", offset, Self::MAX_OFFSET),
            )
        })?;
        Self::new(offset, weight)
    }

    /// Every 16-bit value decodes to some position.
    pub fn from_raw(raw: u16) -> Self {
        WordPos(raw)
    }

    pub fn to_raw(self) -> u16 {
        self.0
    }

    pub fn offset(self) -> u16 {
        self.0 & OFFSET_MASK
    }

    pub fn weight(self) -> Weight {
        Weight::from_bits(self.0 >> WEIGHT_SHIFT)
    }

    pub fn with_weight(self, weight: Weight) -> Self {
        WordPos(self.offset() | ((weight as u16) << WEIGHT_SHIFT))
    }

    pub fn cmp_offset(&self, other: &WordPos) -> Ordering {
        self.offset().cmp(&other.offset())
    }

    pub fn same_token(&self, other: &WordPos) -> bool {
        self.offset() == other.offset()
    }
}

impl fmt::Debug for WordPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for WordPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.offset())?;
        if let Some(letter) = self.weight().letter() {
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_offset_low_and_weight_high() {
        let pos = WordPos::new(5, Weight::A).unwrap();
        assert_eq!(pos.to_raw(), 0xC005);
        assert_eq!(pos.offset(), 5);
        assert_eq!(pos.weight(), Weight::A);
    }

    #[test]
    fn rejects_offsets_past_the_maximum() {
        assert!(WordPos::new(WordPos::MAX_OFFSET, Weight::D).is_ok());
        let err = WordPos::new(MAXENTRYPOS, Weight::D).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueOutOfRange);
        let err = WordPos::from_parts(70_000, 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueOutOfRange);
    }

    #[test]
    fn rejects_unknown_weight_classes() {
        let err = WordPos::from_parts(1, 4).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueOutOfRange);
    }

    #[test]
    fn decode_is_total() {
        for raw in [0u16, 1, 0x3FFF, 0x4000, 0xFFFF] {
            let pos = WordPos::from_raw(raw);
            assert_eq!(pos.to_raw(), raw);
            assert_eq!(WordPos::new(pos.offset(), pos.weight()).unwrap(), pos);
        }
    }

    #[test]
    fn ordering_ignores_weight() {
        let a = WordPos::new(2, Weight::B).unwrap();
        let b = WordPos::new(2, Weight::A).unwrap();
        let c = WordPos::new(3, Weight::D).unwrap();
        assert!(a.same_token(&b));
        assert_eq!(a.cmp_offset(&b), Ordering::Equal);
        assert_eq!(b.cmp_offset(&c), Ordering::Less);
        assert!(Weight::D < Weight::C && Weight::C < Weight::B && Weight::B < Weight::A);
    }

    #[test]
    fn displays_weight_letter() {
        assert_eq!(WordPos::new(1, Weight::A).unwrap().to_string(), "1A");
        assert_eq!(WordPos::new(3, Weight::D).unwrap().to_string(), "3");
    }
}
