//! The write-through page cache (C2).
//!
//! Two sorted vectors, exactly as the reference engine keeps them: a read
//! set of pages fetched from disk and a write set of pages staged by the
//! current transaction but not yet flushed. Lookups binary-search the write
//! set first so an uncommitted write always shadows whatever is on disk.

use crate::{
    catalog::{PageKind, PageObject},
    config::{DEFAULT_READ_PAGES_LEN, DEFAULT_WRITE_PAGES_LEN},
    page::PageId,
};

pub struct CachedEntry {
    pub page_id: PageId,
    pub kind: PageKind,
    pub object: PageObject,
}

pub struct PageCache {
    read_set: Vec<CachedEntry>,
    write_set: Vec<CachedEntry>,
}

impl PageCache {
    pub fn new() -> Self {
        PageCache {
            read_set: Vec::with_capacity(DEFAULT_READ_PAGES_LEN),
            write_set: Vec::with_capacity(DEFAULT_WRITE_PAGES_LEN),
        }
    }

    /// Looks up `page_id`, preferring an uncommitted write over whatever is
    /// cached from disk.
    pub fn search(&self, page_id: PageId) -> Option<&PageObject> {
        if let Ok(i) = self.write_set.binary_search_by_key(&page_id, |e| e.page_id) {
            return Some(&self.write_set[i].object);
        }
        if let Ok(i) = self.read_set.binary_search_by_key(&page_id, |e| e.page_id) {
            return Some(&self.read_set[i].object);
        }
        None
    }

    pub fn cache_read(&mut self, page_id: PageId, kind: PageKind, object: PageObject) {
        Self::upsert(&mut self.read_set, page_id, kind, object);
    }

    pub fn cache_write(&mut self, page_id: PageId, kind: PageKind, object: PageObject) {
        Self::upsert(&mut self.write_set, page_id, kind, object);
    }

    fn upsert(set: &mut Vec<CachedEntry>, page_id: PageId, kind: PageKind, object: PageObject) {
        match set.binary_search_by_key(&page_id, |e| e.page_id) {
            Ok(i) => set[i] = CachedEntry { page_id, kind, object },
            Err(i) => set.insert(i, CachedEntry { page_id, kind, object }),
        }
    }

    /// Every staged write, in page-id order. The caller is expected to
    /// flush each one to the driver and then call [`Self::discard`].
    pub fn dirty_pages(&self) -> impl Iterator<Item = &CachedEntry> {
        self.write_set.iter()
    }

    /// Drops every cached entry, read or written, and shrinks both sets
    /// back down to their default capacity, so a transaction that staged an
    /// unusually large number of pages doesn't leave the cache permanently
    /// bloated. Called after a commit (the write set has been flushed and
    /// both sets must now be re-read from disk on next access) and on an
    /// explicit discard.
    pub fn discard(&mut self) {
        self.read_set.clear();
        self.read_set.shrink_to(DEFAULT_READ_PAGES_LEN);
        self.write_set.clear();
        self.write_set.shrink_to(DEFAULT_WRITE_PAGES_LEN);
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}
