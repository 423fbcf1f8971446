//! Read-only support for the fixed-width legacy layout and its conversion.
//!
//! Legacy entries are `hasPositions:1, length:11, byteOffset:20` with each
//! lexeme addressed by absolute offset. Positions, when present, follow the
//! lexeme at an even offset behind a u16 count. Conversion computes the exact
//! size of the current layout first, then copies every entry into a fresh
//! buffer; the legacy buffer is never modified.

use bytes::Bytes;
use log::debug;
use crate::core::config::{HEADER_SIZE, POS_SIZE};
use crate::core::error::{Error, ErrorKind, Result};
use crate::vector::compact::{read_entry_word, Header, VectorWriter};
use crate::vector::entry::align2;
use crate::vector::position::WordPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyEntry {
    pub has_positions: bool,
    pub len: u16,
    pub pos: u32,
}

impl LegacyEntry {
    pub fn decode(raw: u32) -> Self {
        LegacyEntry {
            has_positions: raw & 1 != 0,
            len: ((raw >> 1) & 0x7FF) as u16,
            pos: raw >> 12,
        }
    }

    pub fn encode(&self) -> u32 {
        (self.has_positions as u32) | ((self.len as u32 & 0x7FF) << 1) | (self.pos << 12)
    }
}

/// A legacy entry resolved against its byte area.
struct LegacySlot<'a> {
    lexeme: &'a [u8],
    positions: &'a [u8],
}

impl LegacySlot<'_> {
    fn npos(&self) -> usize {
        self.positions.len() / POS_SIZE
    }
}

/// Borrowed view of a legacy buffer.
pub struct LegacyVector<'a> {
    entries: &'a [u8],
    area: &'a [u8],
    count: usize,
}

impl<'a> LegacyVector<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;
        if header.current {
            return Err(Error::new(
                ErrorKind::CorruptLegacyVector,
                "buffer is already in the current layout".to_string(),
            ));
        }
        let end = header.total_len.min(bytes.len());
        if header.entries_end() > end {
            return Err(Error::new(
                ErrorKind::CorruptLegacyVector,
                format!("{} legacy entries do not fit a {} byte buffer", header.count, end),
            ));
        }
        Ok(LegacyVector {
            entries: &bytes[HEADER_SIZE..header.entries_end()],
            area: &bytes[header.entries_end()..end],
            count: header.count,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn entry(&self, index: usize) -> LegacyEntry {
        LegacyEntry::decode(read_entry_word(self.entries, index))
    }

    fn slot(&self, index: usize) -> Result<LegacySlot<'a>> {
        let entry = self.entry(index);
        let start = entry.pos as usize;
        let end = start + entry.len as usize;
        if end > self.area.len() {
            return Err(corrupt(index, "lexeme runs past the byte area"));
        }
        let lexeme = &self.area[start..end];
        if !entry.has_positions {
            return Ok(LegacySlot { lexeme, positions: &[] });
        }

        let count_at = align2(end);
        if count_at + POS_SIZE > self.area.len() {
            return Err(corrupt(index, "position count runs past the byte area"));
        }
        let npos = u16::from_le_bytes([self.area[count_at], self.area[count_at + 1]]) as usize;
        let pos_start = count_at + POS_SIZE;
        let pos_end = pos_start + npos * POS_SIZE;
        if pos_end > self.area.len() {
            return Err(corrupt(index, "positions run past the byte area"));
        }
        Ok(LegacySlot {
            lexeme,
            positions: &self.area[pos_start..pos_end],
        })
    }
}

fn corrupt(index: usize, what: &str) -> Error {
    Error::new(ErrorKind::CorruptLegacyVector, format!("legacy entry {}: {}", index, what))
}

/// True when the buffer lacks the current-format flag.
pub fn is_legacy(bytes: &[u8]) -> Result<bool> {
    Ok(!Header::parse(bytes)?.current)
}

/// Normalize a buffer into the current layout. Current buffers are returned
/// as they are; legacy buffers are converted into a new allocation.
pub fn upgrade(bytes: Bytes) -> Result<Bytes> {
    if !is_legacy(&bytes)? {
        return Ok(bytes);
    }
    let legacy = LegacyVector::parse(&bytes)?;

    // First pass: exact size of the new byte area
    let mut payload_len = 0;
    for i in 0..legacy.len() {
        let slot = legacy.slot(i)?;
        payload_len += slot.lexeme.len();
        if slot.npos() > 0 {
            payload_len = align2(payload_len) + slot.positions.len();
        }
    }

    // Second pass: copy into the sequential layout
    let mut writer = VectorWriter::new(legacy.len(), payload_len)?;
    let mut positions = Vec::new();
    for i in 0..legacy.len() {
        let slot = legacy.slot(i)?;
        positions.clear();
        positions.extend(
            slot.positions
                .chunks_exact(POS_SIZE)
                .map(|c| WordPos::from_raw(u16::from_le_bytes([c[0], c[1]]))),
        );
        writer.push(slot.lexeme, &positions)?;
    }

    let upgraded = writer.finish().into_bytes();
    debug!(
        "upgraded legacy vector: {} entries, {} -> {} bytes",
        legacy.len(),
        bytes.len(),
        upgraded.len()
    );
    Ok(upgraded)
}
