//! A chained-page byte-string set.
//!
//! Backs the internal directories that need "does this collection contain
//! this member" semantics without a B-tree's ordering (subscriber ids
//! belonging to a channel, channels a subscriber is on). Each page holds as
//! many members as fit and links to a continuation page via `next` once
//! full; membership is a linear scan across the chain, which is fine since
//! these sets are expected to stay small (the original engine uses exactly
//! this kind of unordered list for the same bookkeeping).

use buff::Buff;

use crate::{
    error::DbResult,
    ioutil::{BuffExt, Serde},
    page::PageId,
};

/// The storage surface the set-chain operations need.
pub trait SetStore {
    fn read_set(&mut self, page: PageId) -> DbResult<SetPage>;
    fn write_set(&mut self, page: PageId, page_obj: SetPage) -> DbResult<()>;
    fn alloc_page(&mut self) -> PageId;
}

#[derive(Debug, Clone, Default)]
pub struct SetPage {
    pub items: Vec<Vec<u8>>,
    pub next: Option<PageId>,
}

impl SetPage {
    pub fn empty() -> Self {
        SetPage::default()
    }

    /// Serialized size this page would occupy, in bytes.
    fn encoded_len(&self) -> usize {
        4 + 2 + self.items.iter().map(|i| 2 + i.len()).sum::<usize>()
    }

    /// Returns `true` if one more member of `len` bytes still fits within
    /// `page_size`.
    fn fits(&self, extra_len: usize, page_size: u32) -> bool {
        self.encoded_len() + 2 + extra_len <= page_size as usize
    }
}

impl Serde for SetPage {
    fn serialize(&self, buf: &mut Buff<'_>) -> DbResult<()> {
        buf.write_page_id(self.next);
        buf.write(self.items.len() as u16);
        for item in &self.items {
            buf.write_bytes_vec(item);
        }
        Ok(())
    }

    fn deserialize(buf: &mut Buff<'_>) -> DbResult<Self> {
        let next = buf.read_page_id();
        let count: u16 = buf.read();
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(buf.read_bytes_vec()?);
        }
        Ok(SetPage { items, next })
    }
}

/// Returns `true` if `member` is present anywhere in the chain rooted at
/// `head`.
pub fn contains<S: SetStore>(store: &mut S, head: PageId, member: &[u8]) -> DbResult<bool> {
    let mut current = Some(head);
    while let Some(page) = current {
        let set = store.read_set(page)?;
        if set.items.iter().any(|i| i == member) {
            return Ok(true);
        }
        current = set.next;
    }
    Ok(false)
}

/// Collects every member across the whole chain rooted at `head`.
pub fn all<S: SetStore>(store: &mut S, head: PageId) -> DbResult<Vec<Vec<u8>>> {
    let mut members = Vec::new();
    let mut current = Some(head);
    while let Some(page) = current {
        let set = store.read_set(page)?;
        current = set.next;
        members.extend(set.items);
    }
    Ok(members)
}

/// Adds `member` to the set rooted at `head`, allocating a continuation page
/// if every existing page is full. A no-op if `member` is already present.
pub fn add<S: SetStore>(
    store: &mut S,
    head: PageId,
    member: &[u8],
    page_size: u32,
) -> DbResult<()> {
    let mut current = head;
    loop {
        let mut set = store.read_set(current)?;
        if set.items.iter().any(|i| i == member) {
            return Ok(());
        }
        if set.fits(member.len(), page_size) {
            set.items.push(member.to_vec());
            store.write_set(current, set)?;
            return Ok(());
        }
        match set.next {
            Some(next) => current = next,
            None => {
                let new_page = store.alloc_page();
                set.next = Some(new_page);
                store.write_set(current, set)?;
                let mut tail = SetPage::empty();
                tail.items.push(member.to_vec());
                store.write_set(new_page, tail)?;
                return Ok(());
            }
        }
    }
}

/// Removes `member` from the chain rooted at `head`. Returns whether it was
/// present. The now-possibly-empty page is kept in the chain rather than
/// unlinked, matching this engine's no-rebalancing policy for directory
/// structures.
pub fn remove<S: SetStore>(store: &mut S, head: PageId, member: &[u8]) -> DbResult<bool> {
    let mut current = Some(head);
    while let Some(page) = current {
        let mut set = store.read_set(page)?;
        if let Some(idx) = set.items.iter().position(|i| i == member) {
            set.items.remove(idx);
            current = set.next;
            store.write_set(page, set)?;
            return Ok(true);
        }
        current = set.next;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeStore {
        pages: HashMap<u32, SetPage>,
        next: u32,
    }

    impl FakeStore {
        fn new() -> Self {
            let mut pages = HashMap::new();
            pages.insert(10, SetPage::empty());
            FakeStore { pages, next: 11 }
        }
    }

    impl SetStore for FakeStore {
        fn read_set(&mut self, page: PageId) -> DbResult<SetPage> {
            Ok(self.pages[&page.get()].clone())
        }

        fn write_set(&mut self, page: PageId, page_obj: SetPage) -> DbResult<()> {
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
    fn add_contains_remove_roundtrip() {
        let mut store = FakeStore::new();
        let head = PageId::new(10);
        add(&mut store, head, b"sub-a", 1024).unwrap();
        add(&mut store, head, b"sub-b", 1024).unwrap();
        assert!(contains(&mut store, head, b"sub-a").unwrap());
        assert!(contains(&mut store, head, b"sub-b").unwrap());
        assert!(!contains(&mut store, head, b"sub-c").unwrap());

        assert!(remove(&mut store, head, b"sub-a").unwrap());
        assert!(!contains(&mut store, head, b"sub-a").unwrap());
        assert!(!remove(&mut store, head, b"sub-a").unwrap());
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = FakeStore::new();
        let head = PageId::new(10);
        add(&mut store, head, b"x", 1024).unwrap();
        add(&mut store, head, b"x", 1024).unwrap();
        assert_eq!(all(&mut store, head).unwrap(), vec![b"x".to_vec()]);
    }

    #[test]
    fn overflowing_members_chain_to_a_new_page() {
        let mut store = FakeStore::new();
        let head = PageId::new(10);
        // A tiny page size forces every member into its own page.
        for i in 0..5u8 {
            add(&mut store, head, &[i; 8], 24).unwrap();
        }
        let members = all(&mut store, head).unwrap();
        assert_eq!(members.len(), 5);
        for i in 0..5u8 {
            assert!(members.contains(&vec![i; 8]));
        }
    }
}
