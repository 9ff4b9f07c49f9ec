//! The closed set of page-level data types (C3).
//!
//! The reference engine keeps a registry of `rl_data_type` records, each
//! carrying function pointers for `serialize`/`deserialize`/`destroy` plus a
//! name used for runtime sanity checks. Per the design notes, this
//! implementation replaces that registry with a closed Rust enum: every page
//! object is a variant of [`PageObject`], tagged by [`PageKind`], and a
//! mismatch between the kind a caller expects and the kind actually cached
//! is an exhaustive pattern-match failure rather than a pointer comparison.

pub mod blob;
pub mod btree;
pub mod header;
pub mod list;
pub mod set;

use crate::{
    error::DbResult,
    ioutil::Serde,
    page::PageId,
};

pub use blob::BlobPage;
pub use btree::BTreeNode;
pub use header::HeaderPage;
pub use list::ListPage;
pub use set::SetPage;

/// The tag identifying which variant a cached or on-disk page holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PageKind {
    Header,
    BTreeNode,
    Set,
    List,
    Blob,
}

impl PageKind {
    pub const fn name(self) -> &'static str {
        match self {
            PageKind::Header => "header",
            PageKind::BTreeNode => "btree_node",
            PageKind::Set => "set",
            PageKind::List => "list",
            PageKind::Blob => "blob",
        }
    }
}

/// A deserialized page, tagged by the variant it was read as.
#[derive(Debug, Clone)]
pub enum PageObject {
    Header(HeaderPage),
    BTreeNode(BTreeNode),
    Set(SetPage),
    List(ListPage),
    Blob(BlobPage),
}

impl PageObject {
    pub const fn kind(&self) -> PageKind {
        match self {
            PageObject::Header(_) => PageKind::Header,
            PageObject::BTreeNode(_) => PageKind::BTreeNode,
            PageObject::Set(_) => PageKind::Set,
            PageObject::List(_) => PageKind::List,
            PageObject::Blob(_) => PageKind::Blob,
        }
    }

    pub fn serialize(&self, buf: &mut buff::Buff<'_>) -> DbResult<()> {
        match self {
            PageObject::Header(p) => p.serialize(buf),
            PageObject::BTreeNode(p) => p.serialize(buf),
            PageObject::Set(p) => p.serialize(buf),
            PageObject::List(p) => p.serialize(buf),
            PageObject::Blob(p) => p.serialize(buf),
        }
    }

    pub fn deserialize(kind: PageKind, buf: &mut buff::Buff<'_>) -> DbResult<Self> {
        Ok(match kind {
            PageKind::Header => PageObject::Header(HeaderPage::deserialize(buf)?),
            PageKind::BTreeNode => PageObject::BTreeNode(BTreeNode::deserialize(buf)?),
            PageKind::Set => PageObject::Set(SetPage::deserialize(buf)?),
            PageKind::List => PageObject::List(ListPage::deserialize(buf)?),
            PageKind::Blob => PageObject::Blob(BlobPage::deserialize(buf)?),
        })
    }

    pub fn into_header(self, page: PageId) -> DbResult<HeaderPage> {
        match self {
            PageObject::Header(h) => Ok(h),
            other => Err(mismatch(page, PageKind::Header, other.kind())),
        }
    }

    pub fn into_btree_node(self, page: PageId) -> DbResult<BTreeNode> {
        match self {
            PageObject::BTreeNode(n) => Ok(n),
            other => Err(mismatch(page, PageKind::BTreeNode, other.kind())),
        }
    }

    pub fn into_set(self, page: PageId) -> DbResult<SetPage> {
        match self {
            PageObject::Set(s) => Ok(s),
            other => Err(mismatch(page, PageKind::Set, other.kind())),
        }
    }

    pub fn into_list(self, page: PageId) -> DbResult<ListPage> {
        match self {
            PageObject::List(l) => Ok(l),
            other => Err(mismatch(page, PageKind::List, other.kind())),
        }
    }

    pub fn into_blob(self, page: PageId) -> DbResult<BlobPage> {
        match self {
            PageObject::Blob(b) => Ok(b),
            other => Err(mismatch(page, PageKind::Blob, other.kind())),
        }
    }

    pub fn as_btree_node(&self, page: PageId) -> DbResult<&BTreeNode> {
        match self {
            PageObject::BTreeNode(n) => Ok(n),
            other => Err(mismatch(page, PageKind::BTreeNode, other.kind())),
        }
    }
}

fn mismatch(page: PageId, expected: PageKind, found: PageKind) -> crate::error::Error {
    crate::error::Error::TypeMismatch {
        page,
        expected: expected.name(),
        found: found.name(),
    }
}
