//! Binary transfer format, big-endian:
//!
//! ```text
//! u32 count
//! count x { lexeme bytes, 0x00, u16 npos, npos x u16 position }
//! ```
//!
//! Receiving lays the data out directly in the packed layout. Entries that
//! arrive out of order are repaired by rebuilding; positions that arrive out
//! of order are rejected.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::{debug, warn};
use crate::core::config::{Config, ENTRY_SIZE, HEADER_SIZE, MAX_ENTRIES, MAXNUMPOS, MAXSTRLEN, MAXSTRPOS, POS_SIZE};
use crate::core::error::{Error, ErrorKind, Result};
use crate::vector::builder::VectorBuilder;
use crate::vector::compact::{CompactVector, FORMAT_FLAG};
use crate::vector::entry::WordEntry;
use crate::vector::position::WordPos;

/// Serialize a vector for transfer.
pub fn send(vector: &CompactVector) -> Result<Bytes> {
    let size = 4 + vector
        .iter()
        .map(|l| l.bytes().len() + 1 + 2 + l.num_positions() * POS_SIZE)
        .sum::<usize>();
    let mut buf = BytesMut::with_capacity(size);

    buf.put_u32(vector.len() as u32);
    for lexeme in vector.iter() {
        if lexeme.bytes().contains(&0) {
            return Err(Error::new(
                ErrorKind::InvalidLexeme,
                "lexeme contains a NUL byte and cannot be sent".to_string(),
            ));
        }
        buf.put_slice(lexeme.bytes());
        buf.put_u8(0);
        buf.put_u16(lexeme.num_positions() as u16);
        for pos in lexeme.positions() {
            buf.put_u16(pos.to_raw());
        }
    }
    Ok(buf.freeze())
}

/// Deserialize a transferred vector with default settings.
pub fn recv(input: &[u8]) -> Result<CompactVector> {
    recv_with(input, &Config::default())
}

pub fn recv_with(mut input: &[u8], config: &Config) -> Result<CompactVector> {
    let count = get_u32(&mut input)? as usize;
    if count > MAX_ENTRIES {
        return Err(Error::new(
            ErrorKind::InvalidVectorSize,
            format!("invalid size of tsvector: {} entries", count),
        ));
    }

    let mut entries: Vec<WordEntry> = Vec::with_capacity(count.min(config.initial_token_capacity));
    let mut area = BytesMut::with_capacity(config.initial_buffer_capacity);
    let mut prev_start = 0;
    let mut needs_sort = false;

    for _ in 0..count {
        let lexeme = get_lexeme(&mut input)?;
        let npos = get_u16(&mut input)? as usize;
        if npos > MAXNUMPOS {
            return Err(Error::new(
                ErrorKind::InvalidPositionCount,
                format!("unexpected number of tsvector positions: {}", npos),
            ));
        }

        if let Some(prev) = entries.last() {
            if lexeme <= &area[prev_start..prev_start + prev.len as usize] {
                needs_sort = true;
            }
        }

        let start = area.len();
        let entry = WordEntry::new(lexeme.len(), npos)?;
        reserve_doubling(&mut area, entry.next_offset(start) - start);
        area.put_slice(lexeme);

        if npos > 0 {
            if area.len() % 2 != 0 {
                area.put_u8(0);
            }
            let mut prev: Option<WordPos> = None;
            for _ in 0..npos {
                let pos = WordPos::from_raw(get_u16(&mut input)?);
                if prev.is_some_and(|p| pos.offset() <= p.offset()) {
                    return Err(Error::new(
                        ErrorKind::MisorderedPositions,
                        "position information is misordered".to_string(),
                    ));
                }
                area.put_u16_le(pos.to_raw());
                prev = Some(pos);
            }
        }

        if area.len() > MAXSTRPOS {
            return Err(Error::new(
                ErrorKind::PayloadTooLong,
                format!("string is too long for tsvector ({} bytes, max {} bytes)", area.len(), MAXSTRPOS),
            ));
        }
        entries.push(entry);
        prev_start = start;
    }

    if input.has_remaining() {
        debug!("ignoring {} trailing bytes after tsvector message", input.remaining());
    }

    let vector = assemble(&entries, &area)?;
    if needs_sort {
        warn!("received tsvector entries out of order, rebuilding {} entries", vector.len());
        return rebuild(&vector, config);
    }
    Ok(vector)
}

/// Grow by at least doubling so a long message costs O(log n) reallocations.
fn reserve_doubling(area: &mut BytesMut, extra: usize) {
    let needed = area.len() + extra;
    if needed > area.capacity() {
        let target = needed.max(area.capacity() * 2);
        area.reserve(target - area.len());
    }
}

fn assemble(entries: &[WordEntry], area: &[u8]) -> Result<CompactVector> {
    let total = HEADER_SIZE + entries.len() * ENTRY_SIZE + area.len();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32_le(total as u32);
    buf.put_u32_le(entries.len() as u32 | FORMAT_FLAG);
    for entry in entries {
        buf.put_u32_le(entry.encode());
    }
    buf.put_slice(area);
    CompactVector::from_bytes(buf.freeze())
}

/// Sort and merge through the builder; the lexeme data moves with its entry.
fn rebuild(vector: &CompactVector, config: &Config) -> Result<CompactVector> {
    let mut builder = VectorBuilder::with_config(config);
    for lexeme in vector.iter() {
        builder.stage(lexeme.bytes(), lexeme.positions().collect())?;
    }
    builder.finish()
}

fn get_u32(input: &mut &[u8]) -> Result<u32> {
    need(input, 4)?;
    Ok(input.get_u32())
}

fn get_u16(input: &mut &[u8]) -> Result<u16> {
    need(input, 2)?;
    Ok(input.get_u16())
}

fn need(input: &[u8], len: usize) -> Result<()> {
    if input.remaining() < len {
        return Err(Error::new(
            ErrorKind::InsufficientData,
            format!("message needs {} more bytes, {} left", len, input.remaining()),
        ));
    }
    Ok(())
}

/// NUL-terminated lexeme. The terminator is consumed but not returned.
fn get_lexeme<'a>(input: &mut &'a [u8]) -> Result<&'a [u8]> {
    let data: &'a [u8] = *input;
    let Some(end) = data.iter().position(|&b| b == 0) else {
        return Err(Error::new(
            ErrorKind::InvalidLexeme,
            "lexeme is not NUL-terminated".to_string(),
        ));
    };
    if end > MAXSTRLEN {
        return Err(Error::new(
            ErrorKind::InvalidLexeme,
            format!("invalid tsvector: lexeme too long ({} bytes)", end),
        ));
    }
    *input = &data[end + 1..];
    Ok(&data[..end])
}
