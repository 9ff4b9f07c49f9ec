//! The key-directory B-tree (C5's on-disk structure).
//!
//! The page layout itself is explicitly out of scope for this engine (it is
//! treated as an opaque plug-in per the top-level spec), but *something*
//! concrete has to back `set_key`/`get_key` and the internal-database
//! directories, so this module implements a small, real B+tree: leaves hold
//! `(key, value)` pairs, internal nodes hold separator keys and child page
//! ids, and a node that grows past `max_size` entries splits, promoting its
//! middle key to the parent. Root splits relocate the root's old content to
//! a fresh page and rewrite the root page itself as a new internal node, so
//! the root's page id never changes.
//!
//! Deletion of directory entries is not implemented: nothing in this engine
//! ever removes a user key or a channel/subscriber-id mapping from these
//! trees (subscriber *set membership*, which does shrink, lives in
//! [`super::set`], not here).

use buff::Buff;

use crate::{
    config::HASH_KEY_LEN,
    error::{DbResult, Error},
    ioutil::{BuffExt, Serde},
    page::PageId,
};

/// A fixed-width directory key (an MD5 digest, in this engine's usage).
pub type Key = [u8; HASH_KEY_LEN];

/// A single B-tree page: either a leaf carrying `(key, value)` pairs or an
/// internal node carrying separator keys and child page ids.
#[derive(Debug, Clone)]
pub enum BTreeNode {
    Leaf { keys: Vec<Key>, values: Vec<i64> },
    Internal { keys: Vec<Key>, children: Vec<PageId> },
}

/// The storage surface the B-tree algorithms need: allocate a page number
/// and read/write whatever [`BTreeNode`] lives at a page. Implemented by the
/// transaction manager ([`crate::store::Store`]); kept as a trait so the
/// B-tree code doesn't need to know about the page cache or driver.
pub trait NodeStore {
    fn read_node(&mut self, page: PageId) -> DbResult<BTreeNode>;
    fn write_node(&mut self, page: PageId, node: BTreeNode) -> DbResult<()>;
    fn alloc_page(&mut self) -> PageId;
}

impl BTreeNode {
    pub fn new_leaf() -> Self {
        BTreeNode::Leaf {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    fn keys(&self) -> &[Key] {
        match self {
            BTreeNode::Leaf { keys, .. } | BTreeNode::Internal { keys, .. } => keys,
        }
    }

    /// Looks up `key`, descending from `root`.
    pub fn find<S: NodeStore>(store: &mut S, root: PageId, key: &Key) -> DbResult<Option<i64>> {
        let mut current = root;
        loop {
            match store.read_node(current)? {
                BTreeNode::Leaf { keys, values } => {
                    return Ok(keys.binary_search(key).ok().map(|i| values[i]));
                }
                BTreeNode::Internal { keys, children } => {
                    let idx = match keys.binary_search(key) {
                        Ok(i) => i + 1,
                        Err(i) => i,
                    };
                    current = children[idx];
                }
            }
        }
    }

    /// Inserts (or overwrites) `key -> value`, descending from `root`.
    pub fn insert<S: NodeStore>(
        store: &mut S,
        root: PageId,
        key: Key,
        value: i64,
        max_size: usize,
    ) -> DbResult<()> {
        if let Some((promoted, right)) = Self::insert_into(store, root, key, value, max_size)? {
            // `root`'s page id now holds the trimmed left half (written by
            // insert_into below). Relocate it so the root page can become a
            // fresh internal node without changing its page id.
            let left_content = store.read_node(root)?;
            let left_id = store.alloc_page();
            store.write_node(left_id, left_content)?;
            let new_root = BTreeNode::Internal {
                keys: vec![promoted],
                children: vec![left_id, right],
            };
            store.write_node(root, new_root)?;
        }
        Ok(())
    }

    fn insert_into<S: NodeStore>(
        store: &mut S,
        page: PageId,
        key: Key,
        value: i64,
        max_size: usize,
    ) -> DbResult<Option<(Key, PageId)>> {
        let mut node = store.read_node(page)?;
        match &mut node {
            BTreeNode::Leaf { keys, values } => match keys.binary_search(&key) {
                Ok(i) => values[i] = value,
                Err(i) => {
                    keys.insert(i, key);
                    values.insert(i, value);
                }
            },
            BTreeNode::Internal { keys, children } => {
                let idx = match keys.binary_search(&key) {
                    Ok(i) => i + 1,
                    Err(i) => i,
                };
                let child = children[idx];
                if let Some((promoted, new_child)) =
                    Self::insert_into(store, child, key, value, max_size)?
                {
                    keys.insert(idx, promoted);
                    children.insert(idx + 1, new_child);
                }
            }
        }

        if node.keys().len() > max_size {
            let (promoted, right_node) = node.split();
            store.write_node(page, node)?;
            let right_id = store.alloc_page();
            store.write_node(right_id, right_node)?;
            Ok(Some((promoted, right_id)))
        } else {
            store.write_node(page, node)?;
            Ok(None)
        }
    }

    /// Splits `self` in place into its trimmed left half, returning the
    /// promoted separator key and the new right sibling.
    fn split(&mut self) -> (Key, BTreeNode) {
        match self {
            BTreeNode::Leaf { keys, values } => {
                let mid = keys.len() / 2;
                let right_keys = keys.split_off(mid);
                let right_values = values.split_off(mid);
                let promoted = right_keys[0];
                (
                    promoted,
                    BTreeNode::Leaf {
                        keys: right_keys,
                        values: right_values,
                    },
                )
            }
            BTreeNode::Internal { keys, children } => {
                let mid = keys.len() / 2;
                let promoted = keys[mid];
                let right_keys = keys.split_off(mid + 1);
                keys.truncate(mid);
                let right_children = children.split_off(mid + 1);
                (
                    promoted,
                    BTreeNode::Internal {
                        keys: right_keys,
                        children: right_children,
                    },
                )
            }
        }
    }
}

impl Serde for BTreeNode {
    fn serialize(&self, buf: &mut Buff<'_>) -> DbResult<()> {
        match self {
            BTreeNode::Leaf { keys, values } => {
                buf.write(0u8);
                buf.write(keys.len() as u16);
                for key in keys {
                    buf.write_array(key);
                }
                for value in values {
                    buf.write(*value);
                }
            }
            BTreeNode::Internal { keys, children } => {
                buf.write(1u8);
                buf.write(keys.len() as u16);
                for key in keys {
                    buf.write_array(key);
                }
                for child in children {
                    buf.write(child.get());
                }
            }
        }
        Ok(())
    }

    fn deserialize(buf: &mut Buff<'_>) -> DbResult<Self> {
        let tag: u8 = buf.read();
        let count: usize = buf.read::<2, u16>() as usize;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(buf.read_array::<HASH_KEY_LEN>());
        }
        match tag {
            0 => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(buf.read());
                }
                Ok(BTreeNode::Leaf { keys, values })
            }
            1 => {
                let mut children = Vec::with_capacity(count + 1);
                for _ in 0..=count {
                    children.push(PageId::new(buf.read()));
                }
                Ok(BTreeNode::Internal { keys, children })
            }
            _ => Err(Error::Unexpected(format!("corrupted btree node tag {tag}"))),
        }
    }
}
