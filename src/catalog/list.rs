//! A chained-page FIFO queue of element groups.
//!
//! Backs the per-subscriber pending-message queue: each queued message is a
//! "group" of byte strings (mirroring the reference engine's multi-bulk
//! `[channel-kind, channel, payload]` style replies), appended at the tail
//! and consumed from the head. Like [`super::set`], a page that fills up
//! links to a freshly allocated continuation page rather than ever being
//! resized, and a page drained to empty is left in place instead of being
//! unlinked.

use buff::Buff;

use crate::{
    error::DbResult,
    ioutil::{BuffExt, Serde},
    page::PageId,
};

pub trait ListStore {
    fn read_list(&mut self, page: PageId) -> DbResult<ListPage>;
    fn write_list(&mut self, page: PageId, page_obj: ListPage) -> DbResult<()>;
    fn alloc_page(&mut self) -> PageId;
}

pub type Group = Vec<Vec<u8>>;

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub groups: Vec<Group>,
    pub next: Option<PageId>,
}

impl ListPage {
    pub fn empty() -> Self {
        ListPage::default()
    }

    fn group_len(group: &Group) -> usize {
        2 + group.iter().map(|e| 2 + e.len()).sum::<usize>()
    }

    fn encoded_len(&self) -> usize {
        4 + 2 + self.groups.iter().map(Self::group_len).sum::<usize>()
    }

    fn fits(&self, group: &Group, page_size: u32) -> bool {
        self.encoded_len() + Self::group_len(group) <= page_size as usize
    }
}

impl Serde for ListPage {
    fn serialize(&self, buf: &mut Buff<'_>) -> DbResult<()> {
        buf.write_page_id(self.next);
        buf.write(self.groups.len() as u16);
        for group in &self.groups {
            buf.write(group.len() as u16);
            for elem in group {
                buf.write_bytes_vec(elem);
            }
        }
        Ok(())
    }

    fn deserialize(buf: &mut Buff<'_>) -> DbResult<Self> {
        let next = buf.read_page_id();
        let count: u16 = buf.read();
        let mut groups = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let elem_count: u16 = buf.read();
            let mut group = Vec::with_capacity(elem_count as usize);
            for _ in 0..elem_count {
                group.push(buf.read_bytes_vec()?);
            }
            groups.push(group);
        }
        Ok(ListPage { groups, next })
    }
}

/// Appends `group` to the tail of the chain rooted at `head`.
pub fn push_back<S: ListStore>(
    store: &mut S,
    head: PageId,
    group: Group,
    page_size: u32,
) -> DbResult<()> {
    let mut current = head;
    loop {
        let mut page = store.read_list(current)?;
        if page.fits(&group, page_size) {
            page.groups.push(group);
            store.write_list(current, page)?;
            return Ok(());
        }
        match page.next {
            Some(next) => current = next,
            None => {
                let new_page = store.alloc_page();
                page.next = Some(new_page);
                store.write_list(current, page)?;
                let mut tail = ListPage::empty();
                tail.groups.push(group);
                store.write_list(new_page, tail)?;
                return Ok(());
            }
        }
    }
}

/// Pops the oldest group in the chain rooted at `head`, skipping any
/// already-drained pages.
pub fn pop_front<S: ListStore>(store: &mut S, head: PageId) -> DbResult<Option<Group>> {
    let mut current = Some(head);
    while let Some(page_id) = current {
        let mut page = store.read_list(page_id)?;
        if !page.groups.is_empty() {
            let group = page.groups.remove(0);
            store.write_list(page_id, page)?;
            return Ok(Some(group));
        }
        current = page.next;
    }
    Ok(None)
}

/// Returns `true` if the chain rooted at `head` has no pending groups.
pub fn is_empty<S: ListStore>(store: &mut S, head: PageId) -> DbResult<bool> {
    let mut current = Some(head);
    while let Some(page_id) = current {
        let page = store.read_list(page_id)?;
        if !page.groups.is_empty() {
            return Ok(false);
        }
        current = page.next;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeStore {
        pages: HashMap<u32, ListPage>,
        next: u32,
    }

    impl FakeStore {
        fn new() -> Self {
            let mut pages = HashMap::new();
            pages.insert(20, ListPage::empty());
            FakeStore { pages, next: 21 }
        }
    }

    impl ListStore for FakeStore {
        fn read_list(&mut self, page: PageId) -> DbResult<ListPage> {
            Ok(self.pages[&page.get()].clone())
        }

        fn write_list(&mut self, page: PageId, page_obj: ListPage) -> DbResult<()> {
            self.pages.insert(page.get(), page_obj);
            Ok(())
        }

        fn alloc_page(&mut self) -> PageId {
            let id = PageId::new(self.next);
            self.next += 1;
            id
        }
    }

    fn group(tag: &str, channel: &str, data: &str) -> Group {
        vec![
            tag.as_bytes().to_vec(),
            channel.as_bytes().to_vec(),
            data.as_bytes().to_vec(),
        ]
    }

    #[test]
    fn fifo_ordering_is_preserved() {
        let mut store = FakeStore::new();
        let head = PageId::new(20);
        push_back(&mut store, head, group("message", "chan", "one"), 1024).unwrap();
        push_back(&mut store, head, group("message", "chan", "two"), 1024).unwrap();

        assert_eq!(
            pop_front(&mut store, head).unwrap(),
            Some(group("message", "chan", "one"))
        );
        assert_eq!(
            pop_front(&mut store, head).unwrap(),
            Some(group("message", "chan", "two"))
        );
        assert_eq!(pop_front(&mut store, head).unwrap(), None);
    }

    #[test]
    fn overflowing_groups_chain_to_a_new_page() {
        let mut store = FakeStore::new();
        let head = PageId::new(20);
        for i in 0..10 {
            push_back(&mut store, head, group("message", "chan", &i.to_string()), 40).unwrap();
        }
        for i in 0..10 {
            assert_eq!(
                pop_front(&mut store, head).unwrap(),
                Some(group("message", "chan", &i.to_string()))
            );
        }
        assert!(is_empty(&mut store, head).unwrap());
    }
}
