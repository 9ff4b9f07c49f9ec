//! The page I/O layer (C1).
//!
//! Two variants, collapsed into one tagged enum rather than a trait object:
//! a [`FileDriver`] backed by a regular file, and a [`MemoryDriver`] that
//! never touches disk. Both speak the same "read exactly one page-sized
//! slice at this page number" protocol; everything above this module is
//! unaware of which one it's talking to.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{
    error::{DbResult, Error},
    page::{default_page_size, PageId},
};

/// The special path that selects the in-memory driver instead of a file.
pub const MEMORY_PATH: &str = ":memory:";

/// Open-mode bitmask, mirroring the reference engine's flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenFlags(u8);

impl OpenFlags {
    /// Permit mutation and `commit`.
    pub const READWRITE: OpenFlags = OpenFlags(1 << 0);
    /// Initialize a fresh file if missing.
    pub const CREATE: OpenFlags = OpenFlags(1 << 1);

    pub const fn empty() -> Self {
        OpenFlags(0)
    }

    pub const fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 | rhs.0)
    }
}

/// The page I/O driver. Either a real file or a throwaway in-memory image.
pub enum Driver {
    File(FileDriver),
    Memory(MemoryDriver),
}

impl Driver {
    /// Opens `path` under `flags`, selecting the memory driver when `path`
    /// is the literal string [`MEMORY_PATH`].
    pub fn open(path: &Path, flags: OpenFlags) -> DbResult<Self> {
        if path == Path::new(MEMORY_PATH) {
            debug!("opening in-memory database");
            return Ok(Driver::Memory(MemoryDriver::new()));
        }

        if !flags.contains(OpenFlags::CREATE) && !path.exists() {
            return Err(Error::InvalidParameters(format!(
                "{} does not exist and CREATE was not requested",
                path.display()
            )));
        }

        debug!(path = %path.display(), "opening file-backed database");
        Ok(Driver::File(FileDriver::new(path, flags)?))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Driver::Memory(_))
    }

    pub fn page_size(&self) -> u32 {
        match self {
            Driver::File(d) => d.page_size,
            Driver::Memory(d) => d.page_size,
        }
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        match self {
            Driver::File(d) => d.page_size = page_size,
            Driver::Memory(d) => d.page_size = page_size,
        }
    }

    /// Reads the page at `page_id`, filling `buf` (which must be exactly
    /// `page_size` bytes). A short read is reported as
    /// [`Error::PageOutOfBounds`] (if `page_id` is non-zero, signalling "not
    /// yet written") or [`Error::ReadIncompletePage`] (if `page_id` is the
    /// header, signalling "no header yet").
    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> DbResult<()> {
        match self {
            Driver::File(d) => d.read_page(page_id, buf),
            Driver::Memory(d) => d.read_page(page_id, buf),
        }
    }

    pub fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> DbResult<()> {
        match self {
            Driver::File(d) => d.write_page(page_id, buf),
            Driver::Memory(d) => d.write_page(page_id, buf),
        }
    }

    /// Number of whole `page_size`-sized slots currently backed by storage.
    /// Used on open to figure out where the next unallocated page starts.
    pub fn page_count(&mut self) -> DbResult<u32> {
        let page_size = self.page_size() as u64;
        let len = match self {
            Driver::File(d) => match d.file() {
                Ok(file) => file.metadata()?.len(),
                Err(_) => 0,
            },
            Driver::Memory(d) => d.pages.len() as u64,
        };
        Ok((len / page_size) as u32)
    }
}

pub struct FileDriver {
    path: PathBuf,
    file: Option<File>,
    flags: OpenFlags,
    page_size: u32,
}

impl FileDriver {
    fn new(path: &Path, flags: OpenFlags) -> DbResult<Self> {
        Ok(FileDriver {
            path: path.to_path_buf(),
            file: None,
            flags,
            page_size: default_page_size(),
        })
    }

    fn file(&mut self) -> DbResult<&mut File> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .read(true)
                .write(self.flags.contains(OpenFlags::READWRITE))
                .create(self.flags.contains(OpenFlags::CREATE))
                .open(&self.path)?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just inserted"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> DbResult<()> {
        let page_size = self.page_size;
        let offset = page_id.offset(page_size);
        let file = self.file()?;

        let len = file.metadata()?.len();
        if offset >= len {
            trace!(?page_id, "page not present");
            return Err(Error::PageOutOfBounds(page_id));
        }

        file.seek(SeekFrom::Start(offset))?;
        match file.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(Error::ReadIncompletePage(page_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> DbResult<()> {
        let page_size = self.page_size;
        let offset = page_id.offset(page_size);
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        let written = file.write(buf)?;
        if written != buf.len() {
            return Err(Error::Unexpected(format!(
                "short write at page {page_id:?}: wrote {written} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }
}

/// An in-memory page store. Pages are simply concatenated `Vec<u8>` slots;
/// `commit` never touches this driver since the transaction manager treats
/// memory-driver mutations as already authoritative.
pub struct MemoryDriver {
    pages: Vec<u8>,
    page_size: u32,
}

impl MemoryDriver {
    fn new() -> Self {
        MemoryDriver {
            pages: Vec::new(),
            page_size: default_page_size(),
        }
    }

    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> DbResult<()> {
        let offset = page_id.offset(self.page_size) as usize;
        let end = offset + buf.len();
        if end > self.pages.len() {
            return Err(Error::PageOutOfBounds(page_id));
        }
        buf.copy_from_slice(&self.pages[offset..end]);
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> DbResult<()> {
        let offset = page_id.offset(self.page_size) as usize;
        let end = offset + buf.len();
        if end > self.pages.len() {
            self.pages.resize(end, 0);
        }
        self.pages[offset..end].copy_from_slice(buf);
        Ok(())
    }
}
