//! Internal directories and scoped-mutation cleanup (C6).
//!
//! The reference engine keeps pub/sub bookkeeping in extra "databases"
//! beyond the user's main key directory, selected with a `SELECT`-like call
//! before each operation and always restored afterwards via a C `goto
//! cleanup`, even on error paths. This engine sidesteps the select/restore
//! dance entirely by giving those directories fixed page ids that exist for
//! the lifetime of the file, and replaces the goto-cleanup with
//! [`NamespaceGuard`]: any multi-step mutation that borrows a guard and
//! returns early via `?` has its partial writes discarded automatically
//! when the guard drops.

use crate::{error::DbResult, page::PageId, store::Store};

/// Directory mapping a channel name to the set of subscriber ids listening
/// on it.
pub const CHANNEL_SUBSCRIBERS_DIR: PageId = PageId::new(2);

/// Directory mapping a subscriber id to the set of channel names it's
/// listening on.
pub const SUBSCRIBER_CHANNELS_DIR: PageId = PageId::new(3);

/// Directory mapping a subscriber id to its pending-message queue.
pub const SUBSCRIBER_MESSAGES_DIR: PageId = PageId::new(4);

/// Creates the internal directories if this is a freshly initialized
/// database. Safe to call on every open.
pub fn init(store: &mut Store) -> DbResult<()> {
    store.ensure_node_exists(CHANNEL_SUBSCRIBERS_DIR)?;
    store.ensure_node_exists(SUBSCRIBER_CHANNELS_DIR)?;
    store.ensure_node_exists(SUBSCRIBER_MESSAGES_DIR)?;
    Ok(())
}

/// Scopes a sequence of staged writes against a [`Store`]: unless
/// [`NamespaceGuard::finish`] is called, dropping the guard discards
/// anything staged through it. This is the RAII replacement for the
/// reference engine's "on any error, goto cleanup and discard" pattern.
pub struct NamespaceGuard<'a> {
    store: &'a mut Store,
    finished: bool,
}

impl<'a> NamespaceGuard<'a> {
    pub fn new(store: &'a mut Store) -> Self {
        NamespaceGuard {
            store,
            finished: false,
        }
    }

    pub fn store(&mut self) -> &mut Store {
        self.store
    }

    /// Marks the sequence of writes staged through this guard as complete.
    /// The caller is still responsible for calling [`Store::commit`] to
    /// flush them; this only stops the guard from discarding on drop.
    pub fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for NamespaceGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::btree::{BTreeNode, NodeStore}, driver::{OpenFlags, MEMORY_PATH}};
    use std::path::Path;

    fn open_memory() -> Store {
        Store::open(Path::new(MEMORY_PATH), OpenFlags::READWRITE | OpenFlags::CREATE, 1024).unwrap()
    }

    #[test]
    fn init_creates_both_directories() {
        let mut store = open_memory();
        init(&mut store).unwrap();
        assert!(store.read_node(CHANNEL_SUBSCRIBERS_DIR).is_ok());
        assert!(store.read_node(SUBSCRIBER_CHANNELS_DIR).is_ok());
        assert!(store.read_node(SUBSCRIBER_MESSAGES_DIR).is_ok());
    }

    #[test]
    fn init_is_idempotent() {
        let mut store = open_memory();
        init(&mut store).unwrap();
        init(&mut store).unwrap();
    }

    #[test]
    fn guard_discards_on_early_return() {
        let mut store = open_memory();
        init(&mut store).unwrap();

        let attempt = |store: &mut Store| -> DbResult<()> {
            let mut guard = NamespaceGuard::new(store);
            guard.store().write_node(PageId::new(50), BTreeNode::new_leaf())?;
            Err(crate::error::Error::InvalidState("boom"))?;
            guard.finish();
            Ok(())
        };
        assert!(attempt(&mut store).is_err());
        // The staged write never got finish()'d, so it was discarded and
        // page 50 was never committed.
        assert!(store.read_node(PageId::new(50)).is_err());
    }

    #[test]
    fn guard_keeps_writes_on_finish() {
        let mut store = open_memory();
        init(&mut store).unwrap();

        {
            let mut guard = NamespaceGuard::new(&mut store);
            guard.store().write_node(PageId::new(50), BTreeNode::new_leaf()).unwrap();
            guard.finish();
        }
        store.commit().unwrap();
        assert!(store.read_node(PageId::new(50)).is_ok());
    }
}
