//! Chained-page storage for arbitrary-length values.
//!
//! The key directory only ever stores a fixed-width `i64` per key (a page
//! id), never the value itself, so a user value of any length is written as
//! a chain of [`BlobPage`]s and the directory points at the chain's head.
//! This is the same page-chaining idea as [`super::set`] and
//! [`super::list`], just for one contiguous byte string instead of a
//! collection of separately addressable members.

use buff::Buff;

use crate::{
    error::DbResult,
    ioutil::{BuffExt, Serde},
    page::PageId,
};

pub trait BlobStore {
    fn read_blob_page(&mut self, page: PageId) -> DbResult<BlobPage>;
    fn write_blob_page(&mut self, page: PageId, page_obj: BlobPage) -> DbResult<()>;
    fn alloc_page(&mut self) -> PageId;
}

#[derive(Debug, Clone, Default)]
pub struct BlobPage {
    pub data: Vec<u8>,
    pub next: Option<PageId>,
}

impl Serde for BlobPage {
    fn serialize(&self, buf: &mut Buff<'_>) -> DbResult<()> {
        buf.write_page_id(self.next);
        buf.write_bytes_vec(&self.data);
        Ok(())
    }

    fn deserialize(buf: &mut Buff<'_>) -> DbResult<Self> {
        let next = buf.read_page_id();
        let data = buf.read_bytes_vec()?;
        Ok(BlobPage { data, next })
    }
}

/// Header overhead of a serialized [`BlobPage`]: 4 bytes for `next`, 2 for
/// the length prefix `write_bytes_vec` adds.
const CHUNK_OVERHEAD: usize = 4 + 2;

/// Writes `value` as a chain of pages, each holding as many bytes as fit in
/// `page_size`, and returns the head page id.
pub fn write<S: BlobStore>(store: &mut S, value: &[u8], page_size: u32) -> DbResult<PageId> {
    let chunk_size = (page_size as usize).saturating_sub(CHUNK_OVERHEAD).max(1);
    let head = store.alloc_page();

    let mut chunks = value.chunks(chunk_size).peekable();
    if chunks.peek().is_none() {
        store.write_blob_page(head, BlobPage::default())?;
        return Ok(head);
    }

    let mut current = head;
    while let Some(chunk) = chunks.next() {
        let next = if chunks.peek().is_some() {
            Some(store.alloc_page())
        } else {
            None
        };
        store.write_blob_page(
            current,
            BlobPage {
                data: chunk.to_vec(),
                next,
            },
        )?;
        if let Some(next) = next {
            current = next;
        }
    }
    Ok(head)
}

/// Reads the full value back out of the chain rooted at `head`.
pub fn read<S: BlobStore>(store: &mut S, head: PageId) -> DbResult<Vec<u8>> {
    let mut value = Vec::new();
    let mut current = Some(head);
    while let Some(page_id) = current {
        let page = store.read_blob_page(page_id)?;
        value.extend(page.data);
        current = page.next;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeStore {
        pages: HashMap<u32, BlobPage>,
        next: u32,
    }

    impl FakeStore {
        fn new() -> Self {
            FakeStore {
                pages: HashMap::new(),
                next: 1,
            }
        }
    }

    impl BlobStore for FakeStore {
        fn read_blob_page(&mut self, page: PageId) -> DbResult<BlobPage> {
            Ok(self.pages[&page.get()].clone())
        }

        fn write_blob_page(&mut self, page: PageId, page_obj: BlobPage) -> DbResult<()> {
            self.pages.insert(page.get(), page_obj);
            Ok(())
        }

        fn alloc_page(&mut self) -> PageId {
            let id = PageId::new(self.next);
            self.next += 1;
            id
        }
    }

    #[test]
    fn round_trips_a_value_smaller_than_one_page() {
        let mut store = FakeStore::new();
        let head = write(&mut store, b"hello world", 1024).unwrap();
        assert_eq!(read(&mut store, head).unwrap(), b"hello world");
    }

    #[test]
    fn round_trips_an_empty_value() {
        let mut store = FakeStore::new();
        let head = write(&mut store, b"", 1024).unwrap();
        assert_eq!(read(&mut store, head).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn splits_across_multiple_pages() {
        let mut store = FakeStore::new();
        let value: Vec<u8> = (0..500u32).map(|i| (i % 256) as u8).collect();
        let head = write(&mut store, &value, 64).unwrap();
        assert_eq!(read(&mut store, head).unwrap(), value);
        assert!(store.pages.len() > 1);
    }
}
