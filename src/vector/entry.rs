//! Per-lexeme metadata and the offset recurrence of the shared byte area.
//!
//! Current-format entries store only the payload length and the number of
//! positions. Where a lexeme starts is derived by walking the entries in
//! order: a lexeme's bytes are followed, when it has positions, by padding to
//! an even offset and then its packed positions.

use std::ops::Range;
use crate::core::config::{MAXSTRLEN, POS_SIZE};
use crate::core::error::{Error, ErrorKind, Result};
use crate::vector::position::WordPos;

const LEN_BITS: u32 = 12;
const LEN_MASK: u32 = (1 << LEN_BITS) - 1;
const NPOS_SHIFT: u32 = LEN_BITS;
const NPOS_MASK: u32 = 0xFFFF;
const RESERVED_MASK: u32 = !((NPOS_MASK << NPOS_SHIFT) | LEN_MASK);

/// Round up to the next even offset.
#[inline]
pub fn align2(offset: usize) -> usize {
    (offset + 1) & !1
}

/// Current-format entry: `len:12, npos:16, reserved:4`, little-endian u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordEntry {
    pub len: u16,
    pub npos: u16,
}

impl WordEntry {
    pub fn new(len: usize, npos: usize) -> Result<Self> {
        if len > MAXSTRLEN {
            return Err(Error::new(
                ErrorKind::TokenTooLong,
                format!("lexeme of {} bytes does not fit an entry (max {})", len, MAXSTRLEN),
            ));
        }
        let npos = u16::try_from(npos).map_err(|_| {
            Error::new(
                ErrorKind::InvalidPositionCount,
                format!("positions array too long ({})", npos),
            )
        })?;
        Ok(WordEntry { len: len as u16, npos })
    }

    pub fn encode(&self) -> u32 {
        (self.len as u32 & LEN_MASK) | ((self.npos as u32) << NPOS_SHIFT)
    }

    pub fn decode(raw: u32) -> Result<Self> {
        if raw & RESERVED_MASK != 0 {
            return Err(Error::new(
                ErrorKind::CorruptVector,
                format!("entry {:#010x} has reserved bits set", raw),
            ));
        }
        Ok(WordEntry {
            len: (raw & LEN_MASK) as u16,
            npos: ((raw >> NPOS_SHIFT) & NPOS_MASK) as u16,
        })
    }

    pub fn has_positions(&self) -> bool {
        self.npos > 0
    }

    pub fn positions_size(&self) -> usize {
        self.npos as usize * POS_SIZE
    }

    /// Start of the position array for an entry whose lexeme begins at `start`.
    pub fn positions_start(&self, start: usize) -> usize {
        align2(start + self.len as usize)
    }

    /// Start of the following entry.
    pub fn next_offset(&self, start: usize) -> usize {
        if self.has_positions() {
            self.positions_start(start) + self.positions_size()
        } else {
            start + self.len as usize
        }
    }

    /// Bytes occupied by this entry's payload, padding included.
    pub fn span(&self, start: usize) -> Range<usize> {
        start..self.next_offset(start)
    }
}

/// Write one lexeme and its positions at `start` inside `area`, which must be
/// zero-filled where padding lands. Returns the next entry's start.
pub(crate) fn write_payload(area: &mut [u8], start: usize, lexeme: &[u8], positions: &[WordPos]) -> usize {
    let end = start + lexeme.len();
    area[start..end].copy_from_slice(lexeme);
    if positions.is_empty() {
        return end;
    }
    let mut at = align2(end);
    for pos in positions {
        area[at..at + POS_SIZE].copy_from_slice(&pos.to_raw().to_le_bytes());
        at += POS_SIZE;
    }
    at
}

/// Iterator over packed little-endian positions.
#[derive(Debug, Clone)]
pub struct PositionIter<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
}

impl<'a> PositionIter<'a> {
    pub(crate) fn new(packed: &'a [u8]) -> Self {
        PositionIter {
            chunks: packed.chunks_exact(POS_SIZE),
        }
    }
}

impl Iterator for PositionIter<'_> {
    type Item = WordPos;

    fn next(&mut self) -> Option<WordPos> {
        self.chunks
            .next()
            .map(|c| WordPos::from_raw(u16::from_le_bytes([c[0], c[1]])))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for PositionIter<'_> {}

/// One lexeme as stored in a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub entry: WordEntry,
    bytes: &'a [u8],
    positions: &'a [u8],
}

impl<'a> Lexeme<'a> {
    /// Split an entry's payload. `span` starts at the lexeme, `start` is its
    /// offset within the byte area (needed for padding parity).
    pub(crate) fn split(entry: WordEntry, start: usize, span: &'a [u8]) -> Result<Self> {
        let len = entry.len as usize;
        let pos_at = entry.positions_start(start) - start;
        let pos_end = pos_at + entry.positions_size();
        if span.len() < len || (entry.has_positions() && span.len() < pos_end) {
            return Err(Error::new(
                ErrorKind::InsufficientData,
                format!("entry payload needs {} bytes, got {}", entry.next_offset(start) - start, span.len()),
            ));
        }
        let positions = if entry.has_positions() { &span[pos_at..pos_end] } else { &span[0..0] };
        Ok(Lexeme {
            entry,
            bytes: &span[..len],
            positions,
        })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn positions(&self) -> PositionIter<'a> {
        PositionIter::new(self.positions)
    }

    pub fn num_positions(&self) -> usize {
        self.entry.npos as usize
    }
}
