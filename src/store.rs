//! The transaction manager (C4): the single surface everything else in this
//! crate reads and writes pages through.
//!
//! A [`Store`] owns a [`Driver`] and a [`PageCache`]. Reads consult the
//! cache before touching the driver; writes only ever land in the cache's
//! write set. [`Store::commit`] is the only place bytes reach disk, and it
//! discards the whole cache once the flush succeeds; [`Store::discard`]
//! throws the cache away without flushing. Neither leaves a stale read
//! behind, matching the reference engine's `rl_commit`/`rl_discard`, which
//! never did partial flushes either.

use std::path::Path;

use buff::Buff;
use tracing::{debug, trace};

use crate::{
    cache::PageCache,
    catalog::{
        blob::{BlobPage, BlobStore},
        btree::{BTreeNode, NodeStore},
        header::HeaderPage,
        list::{ListPage, ListStore},
        set::{SetPage, SetStore},
        PageKind, PageObject,
    },
    config::HEADER_SIZE,
    driver::{Driver, OpenFlags},
    error::DbResult,
    page::PageId,
};

pub struct Store {
    driver: Driver,
    cache: PageCache,
    next_page: u32,
}

impl Store {
    /// Opens (and, if requested, initializes) a database at `path`.
    ///
    /// A brand new file gets a header page and an empty root key-directory
    /// leaf written immediately, so every subsequent `read(PageId::ROOT,
    /// ..)` succeeds without a special "not created yet" case.
    pub fn open(path: &Path, flags: OpenFlags, page_size: u32) -> DbResult<Self> {
        let mut driver = Driver::open(path, flags)?;
        let existing = driver.page_count()? > 0;

        let mut store = Store {
            driver,
            cache: PageCache::new(),
            next_page: 2,
        };

        if existing {
            let header = store.read_header()?;
            store.driver.set_page_size(header.page_size);
            store.next_page = store.driver.page_count()?.max(2);
            debug!(page_size = header.page_size, next_page = store.next_page, "opened existing database");
        } else {
            store.driver.set_page_size(page_size);
            store.write_header(HeaderPage { page_size })?;
            store.write_node(PageId::ROOT, BTreeNode::new_leaf())?;
            store.commit()?;
            debug!(page_size, "initialized new database");
        }

        Ok(store)
    }

    pub fn page_size(&self) -> u32 {
        self.driver.page_size()
    }

    pub fn is_memory(&self) -> bool {
        self.driver.is_memory()
    }

    /// Allocates a fresh page number. The page is not written until the
    /// caller calls one of the `write_*` helpers and commits.
    pub fn allocate_page(&mut self) -> PageId {
        let id = PageId::new(self.next_page);
        self.next_page += 1;
        id
    }

    /// Reads and deserializes the page at `page_id` as `kind`, consulting
    /// the cache first.
    pub fn read(&mut self, page_id: PageId, kind: PageKind) -> DbResult<PageObject> {
        if let Some(object) = self.cache.search(page_id) {
            return Ok(object.clone());
        }
        let page_size = self.driver.page_size();
        let mut raw = vec![0u8; page_size as usize];
        self.driver.read_page(page_id, &mut raw)?;
        let mut buf = Buff::new(&mut raw);
        let object = PageObject::deserialize(kind, &mut buf)?;
        self.cache.cache_read(page_id, kind, object.clone());
        Ok(object)
    }

    /// Reads the header page directly through the driver. Bypasses the
    /// ordinary page-size-wide read path, since before the header has been
    /// read the driver doesn't actually know the real page size yet.
    pub fn read_header(&mut self) -> DbResult<HeaderPage> {
        if let Some(object) = self.cache.search(PageId::HEADER) {
            return object.clone().into_header(PageId::HEADER);
        }
        let mut raw = vec![0u8; HEADER_SIZE];
        self.driver.read_page(PageId::HEADER, &mut raw)?;
        let mut buf = Buff::new(&mut raw);
        let header = HeaderPage::deserialize(&mut buf)?;
        self.cache
            .cache_read(PageId::HEADER, PageKind::Header, PageObject::Header(header));
        Ok(header)
    }

    pub fn write_header(&mut self, header: HeaderPage) -> DbResult<()> {
        self.cache
            .cache_write(PageId::HEADER, PageKind::Header, PageObject::Header(header));
        Ok(())
    }

    /// Stages `object` to be written at `page_id` on the next commit.
    pub fn write(&mut self, page_id: PageId, object: PageObject) -> DbResult<()> {
        self.cache.cache_write(page_id, object.kind(), object);
        Ok(())
    }

    /// Flushes every staged write to the driver, in page-id order, and then
    /// discards the cache entirely. Nothing is written to disk outside of
    /// this call. The read set is dropped along with the write set so that
    /// a page mutated by another handle since it was last read is re-read
    /// from disk rather than served stale.
    pub fn commit(&mut self) -> DbResult<()> {
        let page_size = self.driver.page_size() as usize;
        let dirty: Vec<(PageId, PageObject)> = self
            .cache
            .dirty_pages()
            .map(|e| (e.page_id, e.object.clone()))
            .collect();
        trace!(count = dirty.len(), "committing dirty pages");
        for (page_id, object) in &dirty {
            let mut raw = vec![0u8; page_size];
            let mut buf = Buff::new(&mut raw);
            object.serialize(&mut buf)?;
            self.driver.write_page(*page_id, &raw)?;
        }
        self.cache.discard();
        Ok(())
    }

    /// Drops every uncommitted write.
    pub fn discard(&mut self) {
        self.cache.discard();
    }

    /// Allocates a new, empty key-directory root (an empty B-tree leaf) and
    /// returns its page id. Used to lazily create the internal directories
    /// pub/sub bookkeeping needs.
    pub fn create_db(&mut self) -> DbResult<PageId> {
        let page_id = self.allocate_page();
        self.write_node(page_id, BTreeNode::new_leaf())?;
        Ok(page_id)
    }

    /// Allocates a fresh page initialized as an empty [`SetPage`].
    pub fn create_empty_set(&mut self) -> DbResult<PageId> {
        let id = self.allocate_page();
        self.write_set(id, SetPage::default())?;
        Ok(id)
    }

    /// Allocates a fresh page initialized as an empty [`ListPage`].
    pub fn create_empty_list(&mut self) -> DbResult<PageId> {
        let id = self.allocate_page();
        self.write_list(id, ListPage::default())?;
        Ok(id)
    }

    /// Ensures an empty B-tree leaf exists at the fixed page id `page_id`,
    /// creating and committing one if the page has never been written.
    /// Bumps the allocation counter past `page_id` so it's never handed out
    /// by [`Self::allocate_page`]. Idempotent.
    pub fn ensure_node_exists(&mut self, page_id: PageId) -> DbResult<()> {
        match self.read_node(page_id) {
            Ok(_) => Ok(()),
            Err(crate::error::Error::PageOutOfBounds(_)) => {
                self.write_node(page_id, BTreeNode::new_leaf())?;
                self.commit()?;
                if self.next_page <= page_id.get() {
                    self.next_page = page_id.get() + 1;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl NodeStore for Store {
    fn read_node(&mut self, page: PageId) -> DbResult<BTreeNode> {
        self.read(page, PageKind::BTreeNode)?.into_btree_node(page)
    }

    fn write_node(&mut self, page: PageId, node: BTreeNode) -> DbResult<()> {
        self.write(page, PageObject::BTreeNode(node))
    }

    fn alloc_page(&mut self) -> PageId {
        self.allocate_page()
    }
}

impl SetStore for Store {
    fn read_set(&mut self, page: PageId) -> DbResult<SetPage> {
        self.read(page, PageKind::Set)?.into_set(page)
    }

    fn write_set(&mut self, page: PageId, page_obj: SetPage) -> DbResult<()> {
        self.write(page, PageObject::Set(page_obj))
    }

    fn alloc_page(&mut self) -> PageId {
        self.allocate_page()
    }
}

impl ListStore for Store {
    fn read_list(&mut self, page: PageId) -> DbResult<ListPage> {
        self.read(page, PageKind::List)?.into_list(page)
    }

    fn write_list(&mut self, page: PageId, page_obj: ListPage) -> DbResult<()> {
        self.write(page, PageObject::List(page_obj))
    }

    fn alloc_page(&mut self) -> PageId {
        self.allocate_page()
    }
}

impl BlobStore for Store {
    fn read_blob_page(&mut self, page: PageId) -> DbResult<BlobPage> {
        self.read(page, PageKind::Blob)?.into_blob(page)
    }

    fn write_blob_page(&mut self, page: PageId, page_obj: BlobPage) -> DbResult<()> {
        self.write(page, PageObject::Blob(page_obj))
    }

    fn alloc_page(&mut self) -> PageId {
        self.allocate_page()
    }
}
