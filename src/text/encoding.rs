use serde::{Deserialize, Serialize};

/// Character-width capability of a server text encoding.
pub trait CharWidth {
    /// Byte length of the character starting at `bytes[0]`.
    /// Always at least 1 and never more than `bytes.len()` for non-empty input.
    fn char_len(&self, bytes: &[u8]) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    SingleByte,
}

impl CharWidth for Encoding {
    fn char_len(&self, bytes: &[u8]) -> usize {
        let width = match self {
            Encoding::SingleByte => 1,
            Encoding::Utf8 => match bytes.first() {
                Some(&b) if b < 0x80 => 1,
                Some(&b) if b & 0xE0 == 0xC0 => 2,
                Some(&b) if b & 0xF0 == 0xE0 => 3,
                Some(&b) if b & 0xF8 == 0xF0 => 4,
                // Stray continuation or invalid lead byte
                _ => 1,
            },
        };
        width.min(bytes.len()).max(1)
    }
}
