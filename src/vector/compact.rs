use std::fmt;
use bytes::{Buf, Bytes, BytesMut};
use crate::core::config::{ENTRY_SIZE, HEADER_SIZE, MAX_ENTRIES, MAXSTRPOS};
use crate::core::error::{Error, ErrorKind, Result};
use crate::vector::entry::{write_payload, Lexeme, WordEntry};
use crate::vector::legacy;
use crate::vector::position::WordPos;

/// Set in the count word of every current-format buffer. Legacy buffers never
/// carried it.
pub const FORMAT_FLAG: u32 = 0x8000_0000;

/// Decoded 8-byte header shared by both layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub total_len: usize,
    pub count: usize,
    pub current: bool,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::new(
                ErrorKind::InsufficientData,
                format!("vector header needs {} bytes, got {}", HEADER_SIZE, bytes.len()),
            ));
        }
        let mut raw = &bytes[..HEADER_SIZE];
        let total_len = raw.get_u32_le() as usize;
        let word = raw.get_u32_le();
        Ok(Header {
            total_len,
            count: (word & !FORMAT_FLAG) as usize,
            current: word & FORMAT_FLAG != 0,
        })
    }

    pub fn entries_end(&self) -> usize {
        HEADER_SIZE + self.count * ENTRY_SIZE
    }

    fn write(total_len: usize, count: usize, out: &mut [u8]) {
        out[0..4].copy_from_slice(&(total_len as u32).to_le_bytes());
        out[4..8].copy_from_slice(&(count as u32 | FORMAT_FLAG).to_le_bytes());
    }
}

/// Read the `i`-th packed u32 of an entry array.
pub(crate) fn read_entry_word(entries: &[u8], i: usize) -> u32 {
    let at = i * ENTRY_SIZE;
    (&entries[at..at + ENTRY_SIZE]).get_u32_le()
}

/// Immutable packed vector in the current layout.
///
/// ```text
/// [ total_len u32 | count u32 | FORMAT_FLAG ]
/// [ WordEntry; count ]
/// [ lexeme bytes, pad, positions ... ]   <- shared byte area
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CompactVector {
    data: Bytes,
    count: usize,
}

impl CompactVector {
    pub fn empty() -> Self {
        let mut buf = vec![0u8; HEADER_SIZE];
        Header::write(HEADER_SIZE, 0, &mut buf);
        CompactVector {
            data: Bytes::from(buf),
            count: 0,
        }
    }

    /// Wrap a current-format buffer after checking that its header, entries
    /// and byte area agree with each other.
    pub fn from_bytes(data: Bytes) -> Result<Self> {
        let header = Header::parse(&data)?;
        if !header.current {
            return Err(Error::new(
                ErrorKind::LegacyFormat,
                "buffer uses the legacy layout and must be upgraded first".to_string(),
            ));
        }
        if header.total_len != data.len() {
            return Err(Error::new(
                ErrorKind::CorruptVector,
                format!("header says {} bytes, buffer has {}", header.total_len, data.len()),
            ));
        }
        if header.count > MAX_ENTRIES || header.entries_end() > data.len() {
            return Err(Error::new(
                ErrorKind::CorruptVector,
                format!("{} entries do not fit a {} byte buffer", header.count, data.len()),
            ));
        }

        let entries = &data[HEADER_SIZE..header.entries_end()];
        let mut offset = 0;
        for i in 0..header.count {
            offset = WordEntry::decode(read_entry_word(entries, i))?.next_offset(offset);
        }
        let area_len = data.len() - header.entries_end();
        if offset != area_len {
            return Err(Error::new(
                ErrorKind::CorruptVector,
                format!("entries describe {} payload bytes, buffer holds {}", offset, area_len),
            ));
        }

        Ok(CompactVector {
            data,
            count: header.count,
        })
    }

    /// Accept either layout, upgrading legacy buffers first.
    pub fn load(data: Bytes) -> Result<Self> {
        Self::from_bytes(legacy::upgrade(data)?)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Size of the shared byte area.
    pub fn payload_len(&self) -> usize {
        self.data.len() - self.data_start()
    }

    pub fn entry(&self, index: usize) -> Option<WordEntry> {
        if index >= self.count {
            return None;
        }
        // Validated in from_bytes
        WordEntry::decode(read_entry_word(self.entry_bytes(), index)).ok()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            vector: self,
            index: 0,
            offset: 0,
        }
    }

    fn data_start(&self) -> usize {
        HEADER_SIZE + self.count * ENTRY_SIZE
    }

    fn entry_bytes(&self) -> &[u8] {
        &self.data[HEADER_SIZE..self.data_start()]
    }

    pub(crate) fn data_area(&self) -> &[u8] {
        &self.data[self.data_start()..]
    }
}

impl Default for CompactVector {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CompactVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|lex| {
                (String::from_utf8_lossy(lex.bytes()).into_owned(), lex.positions().collect::<Vec<_>>())
            }))
            .finish()
    }
}

impl<'a> IntoIterator for &'a CompactVector {
    type Item = Lexeme<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Walks entries in storage order, applying the offset recurrence.
pub struct Iter<'a> {
    vector: &'a CompactVector,
    index: usize,
    offset: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Lexeme<'a>;

    fn next(&mut self) -> Option<Lexeme<'a>> {
        let entry = self.vector.entry(self.index)?;
        let area = self.vector.data_area();
        let next = entry.next_offset(self.offset);
        let lexeme = Lexeme::split(entry, self.offset, &area[self.offset..next]).ok()?;
        self.index += 1;
        self.offset = next;
        Some(lexeme)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.vector.count - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Lays out a vector whose entry count and byte-area size are known up front.
/// Shared by the builder and the upgrader so both emit the same layout.
pub(crate) struct VectorWriter {
    buf: BytesMut,
    count: usize,
    written: usize,
    data_start: usize,
    offset: usize,
}

impl VectorWriter {
    pub(crate) fn new(count: usize, payload_len: usize) -> Result<Self> {
        if count > MAX_ENTRIES {
            return Err(Error::new(
                ErrorKind::InvalidVectorSize,
                format!("{} entries exceed the maximum of {}", count, MAX_ENTRIES),
            ));
        }
        if payload_len > MAXSTRPOS {
            return Err(Error::new(
                ErrorKind::PayloadTooLong,
                format!("string is too long for tsvector ({} bytes, max {} bytes)", payload_len, MAXSTRPOS),
            ));
        }
        let data_start = HEADER_SIZE + count * ENTRY_SIZE;
        let total = data_start + payload_len;
        let mut buf = BytesMut::zeroed(total);
        Header::write(total, count, &mut buf);
        Ok(VectorWriter {
            buf,
            count,
            written: 0,
            data_start,
            offset: 0,
        })
    }

    pub(crate) fn push(&mut self, lexeme: &[u8], positions: &[WordPos]) -> Result<()> {
        let entry = WordEntry::new(lexeme.len(), positions.len())?;
        let at = HEADER_SIZE + self.written * ENTRY_SIZE;
        self.buf[at..at + ENTRY_SIZE].copy_from_slice(&entry.encode().to_le_bytes());
        let area = &mut self.buf[self.data_start..];
        self.offset = write_payload(area, self.offset, lexeme, positions);
        self.written += 1;
        Ok(())
    }

    pub(crate) fn finish(self) -> CompactVector {
        debug_assert_eq!(self.written, self.count);
        debug_assert_eq!(self.data_start + self.offset, self.buf.len());
        CompactVector {
            data: self.buf.freeze(),
            count: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::position::Weight;

    fn pos(offset: u16, weight: Weight) -> WordPos {
        WordPos::new(offset, weight).unwrap()
    }

    fn two_entry_vector() -> CompactVector {
        let positions = [pos(1, Weight::A), pos(3, Weight::D)];
        // "ab" + 2 positions = 6 bytes, "cat" = 3 bytes
        let mut writer = VectorWriter::new(2, 9).unwrap();
        writer.push(b"ab", &positions).unwrap();
        writer.push(b"cat", &[]).unwrap();
        writer.finish()
    }

    #[test]
    fn empty_vector_is_header_only() {
        let vector = CompactVector::empty();
        assert!(vector.is_empty());
        assert_eq!(vector.byte_len(), HEADER_SIZE);
        assert_eq!(CompactVector::from_bytes(vector.clone().into_bytes()).unwrap(), vector);
    }

    #[test]
    fn writer_output_validates_and_iterates() {
        let vector = two_entry_vector();
        let reread = CompactVector::from_bytes(vector.clone().into_bytes()).unwrap();
        assert_eq!(reread, vector);

        let lexemes: Vec<_> = vector.iter().collect();
        assert_eq!(lexemes.len(), 2);
        assert_eq!(lexemes[0].bytes(), b"ab");
        assert_eq!(lexemes[0].positions().collect::<Vec<_>>(), vec![pos(1, Weight::A), pos(3, Weight::D)]);
        assert_eq!(lexemes[1].bytes(), b"cat");
        assert_eq!(lexemes[1].num_positions(), 0);
    }

    #[test]
    fn header_carries_format_flag() {
        let vector = two_entry_vector();
        let header = Header::parse(vector.as_bytes()).unwrap();
        assert!(header.current);
        assert_eq!(header.count, 2);
        assert_eq!(header.total_len, vector.byte_len());
    }

    #[test]
    fn truncated_buffer_is_corrupt() {
        let bytes = two_entry_vector().into_bytes();
        let mut cut = bytes[..bytes.len() - 1].to_vec();
        let len = cut.len() as u32;
        cut[0..4].copy_from_slice(&len.to_le_bytes());
        let err = CompactVector::from_bytes(Bytes::from(cut)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorruptVector);
    }

    #[test]
    fn legacy_header_is_refused() {
        let mut bytes = CompactVector::empty().into_bytes().to_vec();
        bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
        let err = CompactVector::from_bytes(Bytes::from(bytes)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LegacyFormat);
    }

    #[test]
    fn entry_words_are_little_endian() {
        let entries = [0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD];
        assert_eq!(read_entry_word(&entries, 0), 0x0403_0201);
        assert_eq!(read_entry_word(&entries, 1), 0xDDCC_BBAA);
        assert_eq!(Header::parse(&entries).unwrap().total_len, 0x0403_0201);
    }

    #[test]
    fn oversized_payload_is_refused_by_writer() {
        let err = VectorWriter::new(1, MAXSTRPOS + 1).err().unwrap();
        assert_eq!(err.kind, ErrorKind::PayloadTooLong);
    }
}
