use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::SliceSource;

/// File-backed source that loads only the requested range on each call.
/// Nothing is cached; every slice is a fresh read.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub file_path: PathBuf,
    pub len: usize,
}

impl FileSource {
    pub fn open(path: PathBuf) -> Result<Self> {
        let len = std::fs::metadata(&path)?.len() as usize;
        Ok(FileSource { file_path: path, len })
    }
}

impl SliceSource for FileSource {
    fn total_len(&self) -> Result<usize> {
        Ok(self.len)
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        if offset.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(Error::new(
                ErrorKind::InsufficientData,
                format!("slice {}+{} is past the end of {}", offset, len, self.file_path.display()),
            ));
        }

        let mut file = File::open(&self.file_path)?;
        file.seek(SeekFrom::Start(offset as u64))?;

        let mut data = vec![0u8; len];
        file.read_exact(&mut data)?;
        Ok(Cow::Owned(data))
    }
}
