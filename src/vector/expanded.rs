//! Lazily decoded, randomly indexable view over a stored vector.
//!
//! Only the header and the entry array are read when the view is created.
//! Lexeme offsets are derived on demand with the entry recurrence and cached,
//! so walking forward costs O(1) per step and a far jump is paid once.
//! The view borrows its source and holds private mutable state; give every
//! access session its own view.

use std::borrow::Cow;
use std::cmp::Ordering;
use bytes::Bytes;
use log::trace;
use crate::core::config::{ENTRY_SIZE, HEADER_SIZE};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::SliceSource;
use crate::vector::compact::{read_entry_word, CompactVector, Header};
use crate::vector::entry::{PositionIter, WordEntry};

pub struct ExpandedView<'a, S: SliceSource + ?Sized> {
    source: &'a S,
    entries: Vec<WordEntry>,
    offsets: Vec<usize>,   // Byte-area offset per entry, valid up to max_index
    max_index: usize,
    data_start: usize,
}

impl<'a, S: SliceSource + ?Sized> ExpandedView<'a, S> {
    pub fn new(source: &'a S) -> Result<Self> {
        let header = Header::parse(&source.read_slice(0, HEADER_SIZE)?)?;
        if !header.current {
            return Err(Error::new(
                ErrorKind::LegacyFormat,
                "expanded views need an upgraded vector".to_string(),
            ));
        }

        let raw = source.read_slice(HEADER_SIZE, header.count * ENTRY_SIZE)?;
        let entries = (0..header.count)
            .map(|i| WordEntry::decode(read_entry_word(&raw, i)))
            .collect::<Result<Vec<_>>>()?;

        let offsets = vec![0; entries.len()];
        trace!("expanded view over {} entries", entries.len());

        Ok(ExpandedView {
            source,
            entries,
            offsets,
            max_index: 0,
            data_start: header.entries_end(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<WordEntry> {
        self.entries.get(index).copied()
    }

    /// Highest index whose offset is already cached.
    pub fn cached_index(&self) -> usize {
        self.max_index
    }

    /// Byte-area offset of lexeme `index`, extending the cache if needed.
    pub fn position_of(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        if index > self.max_index {
            let mut offset = self.offsets[self.max_index];
            for i in self.max_index + 1..=index {
                offset = self.entries[i - 1].next_offset(offset);
                self.offsets[i] = offset;
            }
            self.max_index = index;
        }
        Ok(self.offsets[index])
    }

    /// Fetch exactly the bytes of entry `index` (lexeme, padding, positions).
    pub fn lexeme_at(&mut self, index: usize) -> Result<ExpandedLexeme<'a>> {
        let start = self.position_of(index)?;
        let entry = self.entries[index];
        let span = entry.span(start);
        let data = self.source.read_slice(self.data_start + span.start, span.len())?;
        if data.len() != span.len() {
            return Err(Error::new(
                ErrorKind::InsufficientData,
                format!("entry {} needs {} bytes, storage returned {}", index, span.len(), data.len()),
            ));
        }
        Ok(ExpandedLexeme {
            entry,
            positions_at: entry.positions_start(start) - start,
            data,
        })
    }

    /// Binary search for a lexeme by raw bytes.
    pub fn find(&mut self, lexeme: &[u8]) -> Result<Option<usize>> {
        let (mut low, mut high) = (0, self.len());
        while low < high {
            let mid = low + (high - low) / 2;
            let found = self.lexeme_at(mid)?;
            match found.bytes().cmp(lexeme) {
                Ordering::Equal => return Ok(Some(mid)),
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
            }
        }
        Ok(None)
    }

    /// Size of the flat buffer behind the view.
    pub fn flat_size(&self) -> Result<usize> {
        self.source.total_len()
    }

    /// Materialize the whole backing buffer as a validated vector.
    pub fn flatten(&self) -> Result<CompactVector> {
        let data = self.source.read_slice(0, self.flat_size()?)?;
        CompactVector::from_bytes(Bytes::copy_from_slice(&data))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("lexeme index {} out of range (len {})", index, self.entries.len()),
            ));
        }
        Ok(())
    }
}

/// Bytes fetched for one entry of an expanded view.
#[derive(Debug, Clone)]
pub struct ExpandedLexeme<'a> {
    pub entry: WordEntry,
    positions_at: usize,
    data: Cow<'a, [u8]>,
}

impl ExpandedLexeme<'_> {
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.entry.len as usize]
    }

    pub fn positions(&self) -> PositionIter<'_> {
        if !self.entry.has_positions() {
            return PositionIter::new(&[]);
        }
        PositionIter::new(&self.data[self.positions_at..self.positions_at + self.entry.positions_size()])
    }

    /// Everything fetched for this entry, padding included.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use crate::vector::builder::VectorBuilder;
    use crate::vector::position::{Weight, WordPos};

    /// Records every range requested from the wrapped bytes.
    struct Recording {
        data: Bytes,
        reads: RefCell<Vec<(usize, usize)>>,
    }

    impl SliceSource for Recording {
        fn total_len(&self) -> Result<usize> {
            Ok(self.data.len())
        }

        fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
            self.reads.borrow_mut().push((offset, len));
            self.data.read_slice(offset, len)
        }
    }

    fn sample() -> CompactVector {
        let mut builder = VectorBuilder::new();
        builder.push(b"apple", &[WordPos::new(1, Weight::A).unwrap()]).unwrap();
        builder.push(b"be", &[]).unwrap();
        builder.push(b"cherry", &[WordPos::new(2, Weight::D).unwrap(), WordPos::new(9, Weight::B).unwrap()]).unwrap();
        builder.push(b"d", &[WordPos::new(4, Weight::C).unwrap()]).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn offsets_follow_the_recurrence() {
        let vector = sample();
        let bytes = vector.clone().into_bytes();
        let mut view = ExpandedView::new(&bytes).unwrap();
        // apple(5) pad pos(2) | be(2) | cherry(6) pos(4) | d(1) pad pos(2)
        assert_eq!(view.position_of(0).unwrap(), 0);
        assert_eq!(view.position_of(3).unwrap(), 20);
        assert_eq!(view.cached_index(), 3);
        assert_eq!(view.position_of(1).unwrap(), 8);
        assert_eq!(view.position_of(2).unwrap(), 10);
    }

    #[test]
    fn random_access_matches_iteration() {
        let vector = sample();
        let bytes = vector.clone().into_bytes();
        let mut view = ExpandedView::new(&bytes).unwrap();
        let expected: Vec<_> = vector.iter().collect();
        for &i in &[2usize, 0, 3, 1, 3] {
            let got = view.lexeme_at(i).unwrap();
            assert_eq!(got.bytes(), expected[i].bytes());
            assert_eq!(got.positions().collect::<Vec<_>>(), expected[i].positions().collect::<Vec<_>>());
        }
    }

    #[test]
    fn fetches_only_the_requested_entry() {
        let vector = sample();
        let source = Recording {
            data: vector.clone().into_bytes(),
            reads: RefCell::new(Vec::new()),
        };
        let mut view = ExpandedView::new(&source).unwrap();
        assert_eq!(source.reads.borrow().len(), 2);

        let cherry = view.lexeme_at(2).unwrap();
        assert_eq!(cherry.bytes(), b"cherry");
        let data_start = HEADER_SIZE + 4 * ENTRY_SIZE;
        assert_eq!(source.reads.borrow().last(), Some(&(data_start + 10, 10)));
        assert_eq!(cherry.raw().len(), 10);
    }

    #[test]
    fn find_uses_binary_search() {
        let vector = sample();
        let bytes = vector.into_bytes();
        let mut view = ExpandedView::new(&bytes).unwrap();
        assert_eq!(view.find(b"cherry").unwrap(), Some(2));
        assert_eq!(view.find(b"apple").unwrap(), Some(0));
        assert_eq!(view.find(b"banana").unwrap(), None);
        assert_eq!(view.find(b"zzz").unwrap(), None);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let bytes = sample().into_bytes();
        let mut view = ExpandedView::new(&bytes).unwrap();
        assert_eq!(view.lexeme_at(4).unwrap_err().kind, ErrorKind::InvalidArgument);

        let empty = CompactVector::empty().into_bytes();
        let mut view = ExpandedView::new(&empty).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.position_of(0).unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn flatten_returns_the_stored_vector() {
        let vector = sample();
        let bytes = vector.clone().into_bytes();
        let view = ExpandedView::new(&bytes).unwrap();
        assert_eq!(view.flat_size().unwrap(), vector.byte_len());
        assert_eq!(view.flatten().unwrap(), vector);
    }

    #[test]
    fn legacy_sources_are_refused() {
        let raw = crate::vector::legacy::tests::legacy_buffer(vec![("a", vec![])]);
        let err = ExpandedView::new(&raw).err().unwrap();
        assert_eq!(err.kind, ErrorKind::LegacyFormat);
    }
}
