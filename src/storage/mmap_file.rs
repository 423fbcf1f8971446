use std::borrow::Cow;
use std::fs::File;
use std::path::Path;
use log::debug;
use memmap2::{Mmap, MmapOptions};
use crate::core::error::Result;
use crate::storage::{slice_of, SliceSource};

/// Memory-mapped vector file for zero-copy slice reads.
pub struct MmapSource {
    pub mmap: Option<Mmap>,
    pub len: usize,
}

impl MmapSource {
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len() as usize;

        // Zero-length files cannot be mapped on every platform
        let mmap = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().len(len).map(&file)? })
        };
        debug!("mapped {} ({} bytes)", path.as_ref().display(), len);

        Ok(MmapSource { mmap, len })
    }

    pub fn data(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

impl SliceSource for MmapSource {
    fn total_len(&self) -> Result<usize> {
        Ok(self.len)
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        slice_of(self.data(), offset, len).map(Cow::Borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::core::error::ErrorKind;

    #[test]
    fn maps_and_slices_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello mapped world").unwrap();
        file.flush().unwrap();

        let source = MmapSource::open_read_only(file.path()).unwrap();
        assert_eq!(source.total_len().unwrap(), 18);
        assert_eq!(&*source.read_slice(6, 6).unwrap(), b"mapped");
        assert_eq!(source.read_slice(15, 10).unwrap_err().kind, ErrorKind::InsufficientData);
    }

    #[test]
    fn empty_file_has_no_bytes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = MmapSource::open_read_only(file.path()).unwrap();
        assert_eq!(source.total_len().unwrap(), 0);
        assert!(source.data().is_empty());
    }
}
