//! The user-facing key directory (C5): `key -> value` backed by an MD5
//! digest of the key as the B-tree's fixed-width key, and a chained
//! [`crate::catalog::blob`] for the (arbitrarily long) value.
//!
//! The B-tree here never deletes a key structurally (see
//! [`crate::catalog::btree`]); `delete_key` instead overwrites the entry
//! with [`TOMBSTONE`], a sentinel no real blob page id can ever equal since
//! page ids are non-negative.

use md5::{Digest, Md5};

use crate::{
    catalog::{blob, btree::BTreeNode},
    config::{btree_max_node_size, HASH_KEY_LEN},
    error::DbResult,
    page::PageId,
    store::Store,
};

/// Sentinel stored in place of a page id to mark a deleted key.
const TOMBSTONE: i64 = -1;

/// Hashes an arbitrary user key down to the B-tree's fixed-width key type.
pub fn hash(key: &[u8]) -> [u8; HASH_KEY_LEN] {
    let mut hasher = Md5::new();
    hasher.update(key);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_KEY_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Sets `key` to `value`, overwriting any existing value.
pub fn set_key(store: &mut Store, key: &[u8], value: &[u8]) -> DbResult<()> {
    let head = blob::write(store, value, store.page_size())?;
    let max_size = btree_max_node_size(store.page_size());
    BTreeNode::insert(store, PageId::ROOT, hash(key), head.get() as i64, max_size)
}

/// Looks up `key`. Returns `None` both when the key was never set and when
/// it was deleted.
pub fn get_key(store: &mut Store, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
    match BTreeNode::find(store, PageId::ROOT, &hash(key))? {
        None | Some(TOMBSTONE) => Ok(None),
        Some(page_number) => Ok(Some(blob::read(store, PageId::new(page_number as u32))?)),
    }
}

/// Deletes `key`. Returns whether it was previously present.
pub fn delete_key(store: &mut Store, key: &[u8]) -> DbResult<bool> {
    let hashed = hash(key);
    let was_present = !matches!(
        BTreeNode::find(store, PageId::ROOT, &hashed)?,
        None | Some(TOMBSTONE)
    );
    if was_present {
        let max_size = btree_max_node_size(store.page_size());
        BTreeNode::insert(store, PageId::ROOT, hashed, TOMBSTONE, max_size)?;
    }
    Ok(was_present)
}

/// Finds the page id of the member-set rooted under `dir_root` for `name`,
/// allocating an empty [`crate::catalog::SetPage`] and recording it in the
/// directory if this is the first time `name` has been seen. Used by the
/// pub/sub layer to back both "subscribers of a channel" and "channels a
/// subscriber is on".
pub fn dir_set_root(store: &mut Store, dir_root: PageId, name: &[u8]) -> DbResult<PageId> {
    let hashed = hash(name);
    if let Some(page_number) = BTreeNode::find(store, dir_root, &hashed)? {
        return Ok(PageId::new(page_number as u32));
    }
    let set_root = store.create_empty_set()?;
    let max_size = btree_max_node_size(store.page_size());
    BTreeNode::insert(store, dir_root, hashed, set_root.get() as i64, max_size)?;
    Ok(set_root)
}

/// Like [`dir_set_root`], but rooted on an allocated [`crate::catalog::ListPage`]
/// instead, for the per-subscriber pending-message queue.
pub fn dir_list_root(store: &mut Store, dir_root: PageId, name: &[u8]) -> DbResult<PageId> {
    let hashed = hash(name);
    if let Some(page_number) = BTreeNode::find(store, dir_root, &hashed)? {
        return Ok(PageId::new(page_number as u32));
    }
    let list_root = store.create_empty_list()?;
    let max_size = btree_max_node_size(store.page_size());
    BTreeNode::insert(store, dir_root, hashed, list_root.get() as i64, max_size)?;
    Ok(list_root)
}

/// Looks up the chain root rooted under `dir_root` for `name`, without
/// creating one when `name` has never been seen. Agnostic to whether the
/// chain is a set or a list: the directory only ever stores a page number.
pub fn existing_dir_root(
    store: &mut Store,
    dir_root: PageId,
    name: &[u8],
) -> DbResult<Option<PageId>> {
    Ok(BTreeNode::find(store, dir_root, &hash(name))?.map(|n| PageId::new(n as u32)))
}
