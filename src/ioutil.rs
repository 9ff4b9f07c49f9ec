//! Buffer helpers layered on top of [`buff::Buff`].
//!
//! Every on-disk page object implements [`Serde`] directly against a
//! fixed-size `Buff`.

use buff::Buff;

use crate::{
    error::{DbResult, Error},
    page::PageId,
};

/// A type that can be written to and read from a page-sized buffer.
pub trait Serde: Sized {
    fn serialize(&self, buf: &mut Buff<'_>) -> DbResult<()>;
    fn deserialize(buf: &mut Buff<'_>) -> DbResult<Self>;
}

/// Extra `Buff` operations this crate needs beyond what `buff` ships with.
pub trait BuffExt {
    /// Reads an optional page id. A stored `0` decodes to `None`.
    fn read_page_id(&mut self) -> Option<PageId>;

    /// Writes an optional page id. `None` encodes as `0`.
    fn write_page_id(&mut self, page: Option<PageId>);

    /// Reads a length-prefixed (`u16`) byte string.
    fn read_bytes_vec(&mut self) -> DbResult<Vec<u8>>;

    /// Writes a length-prefixed (`u16`) byte string.
    ///
    /// Named `write_bytes_vec` (rather than `write_bytes`) because `Buff`
    /// already has an inherent `write_bytes(count, val)` that fills
    /// repeated bytes; an inherent method always shadows a trait method of
    /// the same name, so reusing the name here would silently fail to
    /// resolve to this impl.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than `u16::MAX`.
    fn write_bytes_vec(&mut self, bytes: &[u8]);

    /// Reads exactly `N` raw bytes into a fixed-size array.
    fn read_array<const N: usize>(&mut self) -> [u8; N];

    /// Writes exactly `N` raw bytes from a fixed-size array.
    fn write_array<const N: usize>(&mut self, bytes: &[u8; N]);
}

impl BuffExt for Buff<'_> {
    fn read_page_id(&mut self) -> Option<PageId> {
        match self.read::<4, u32>() {
            0 => None,
            num => Some(PageId::new(num)),
        }
    }

    fn write_page_id(&mut self, page: Option<PageId>) {
        let num = page.map(PageId::get).unwrap_or(0);
        self.write(num);
    }

    fn read_bytes_vec(&mut self) -> DbResult<Vec<u8>> {
        let len: u16 = self.read();
        let mut data = vec![0; len as usize];
        self.read_slice(&mut data);
        Ok(data)
    }

    fn write_bytes_vec(&mut self, bytes: &[u8]) {
        let len = u16::try_from(bytes.len()).expect("byte string longer than u16::MAX");
        self.write(len);
        self.write_slice(bytes);
    }

    fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut data = [0; N];
        self.read_slice(&mut data);
        data
    }

    fn write_array<const N: usize>(&mut self, bytes: &[u8; N]) {
        self.write_slice(bytes);
    }
}

/// Decodes a stored UTF-8 string, surfacing [`Error::CorruptedUtf8`] instead
/// of panicking on invalid input.
pub fn bytes_to_string(bytes: Vec<u8>) -> DbResult<String> {
    String::from_utf8(bytes).map_err(|_| Error::CorruptedUtf8)
}
