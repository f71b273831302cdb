//! # Chunked Mapper
//!
//! Read-only memory-mapped windows over the input file, produced lazily in
//! file order. A window may start and end mid-line; boundary handling is
//! the pipeline's concern. Each window advises the kernel that access is
//! sequential and is unmapped when dropped.

use crate::error::TallyError;
use memmap2::{Advice, Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Host page size, with the conventional fallback when unavailable.
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if ret > 0 {
            return ret as usize;
        }
    }
    4096
}

/// One mapped byte window `[offset, offset + len)` of the input.
#[derive(Debug)]
pub struct MappedChunk {
    map: Mmap,
    // The mmap offset must be page-aligned; `lead` is the padding between
    // the aligned mapping start and the logical window start.
    lead: usize,
    len: usize,
    offset: u64,
}

impl MappedChunk {
    /// Logical file offset of the first byte of the window.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map[self.lead..self.lead + self.len]
    }
}

impl Deref for MappedChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

/// Read-only handle on the input file.
#[derive(Debug)]
pub struct ChunkedReader {
    file: File,
    len: u64,
    path: PathBuf,
}

impl ChunkedReader {
    /// Open `path` read-only. Fails fast when the path is missing or not a
    /// regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TallyError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TallyError::InputNotFound { path: path.clone() },
            _ => TallyError::InputNotReadable {
                path: path.clone(),
                source,
            },
        })?;
        let metadata = file.metadata().map_err(|source| TallyError::InputNotReadable {
            path: path.clone(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(TallyError::InputNotFound { path });
        }
        debug!(path = %path.display(), len = metadata.len(), "opened input");
        Ok(Self {
            len: metadata.len(),
            file,
            path,
        })
    }

    /// Total input length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map one window. `offset` may be unaligned; the mapping is aligned
    /// down to a page boundary internally so any stride works.
    pub fn map_range(&self, offset: u64, len: usize) -> Result<MappedChunk, TallyError> {
        let page = page_size() as u64;
        let aligned = offset - (offset % page);
        let lead = (offset - aligned) as usize;
        let map = unsafe {
            MmapOptions::new()
                .offset(aligned)
                .len(lead + len)
                .map(&self.file)
        }
        .map_err(|source| TallyError::MapFailed { offset, source })?;
        let _ = map.advise(Advice::Sequential);
        Ok(MappedChunk {
            map,
            lead,
            len,
            offset,
        })
    }

    /// Map the whole file as a single window. The file must be non-empty.
    pub fn map_all(&self) -> Result<MappedChunk, TallyError> {
        self.map_range(0, self.len as usize)
    }

    /// Lazy sequence of windows of `stride` bytes, in file order; the final
    /// window may be shorter.
    pub fn chunks(&self, stride: usize) -> Chunks<'_> {
        Chunks {
            reader: self,
            stride: stride.max(1) as u64,
            offset: 0,
        }
    }
}

/// Iterator of mapped windows over a [`ChunkedReader`].
#[derive(Debug)]
pub struct Chunks<'a> {
    reader: &'a ChunkedReader,
    stride: u64,
    offset: u64,
}

impl Iterator for Chunks<'_> {
    type Item = Result<MappedChunk, TallyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.reader.len {
            return None;
        }
        let len = (self.reader.len - self.offset).min(self.stride) as usize;
        let chunk = self.reader.map_range(self.offset, len);
        self.offset += len as u64;
        Some(chunk)
    }
}
