//! Backing storage for packed vectors.
//!
//! An expanded view never needs the whole buffer; it asks its source for the
//! exact byte ranges it is about to decode.

pub mod file;
pub mod mmap_file;

use std::borrow::Cow;
use bytes::Bytes;
use crate::core::error::{Error, ErrorKind, Result};

/// Random-access byte source that can hand out arbitrary slices.
pub trait SliceSource {
    /// Full length of the stored vector in bytes.
    fn total_len(&self) -> Result<usize>;

    /// Exactly `len` bytes starting at `offset`.
    fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>>;
}

/// Bounds check shared by the in-memory sources.
pub(crate) fn slice_of(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(Error::new(
            ErrorKind::InsufficientData,
            format!("slice {}+{} is past the end of a {} byte vector", offset, len, data.len()),
        )),
    }
}

impl SliceSource for [u8] {
    fn total_len(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        slice_of(self, offset, len).map(Cow::Borrowed)
    }
}

impl SliceSource for Vec<u8> {
    fn total_len(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        slice_of(self, offset, len).map(Cow::Borrowed)
    }
}

impl SliceSource for Bytes {
    fn total_len(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        slice_of(self, offset, len).map(Cow::Borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_slices() {
        let data = Bytes::from_static(b"0123456789");
        assert_eq!(&*data.read_slice(2, 3).unwrap(), b"234");
        assert_eq!(data.total_len().unwrap(), 10);
        assert_eq!(&*data.read_slice(10, 0).unwrap(), b"");
    }

    #[test]
    fn out_of_range_is_insufficient() {
        let data = b"abc".to_vec();
        assert_eq!(data.read_slice(2, 2).unwrap_err().kind, ErrorKind::InsufficientData);
        assert_eq!(data.read_slice(usize::MAX, 2).unwrap_err().kind, ErrorKind::InsufficientData);
    }
}
