//! Engine-wide constants.
//!
//! Mirrors the reference engine's compile-time knobs; nothing here is meant
//! to be tunable per-handle yet.

/// Default page size, in bytes, used for every page but the header.
pub const DEFAULT_PAGE_SIZE: u32 = 1024;

/// Size, in bytes, of the header page (page 0). Distinct from the regular
/// page size: the header is always this many bytes regardless of the
/// configured page size.
pub const HEADER_SIZE: usize = 100;

/// The 8-byte magic identifier every valid database file must start with.
pub const MAGIC: &[u8; 8] = b"rlite0.0";

/// Initial capacity of the read-set cache vector.
pub const DEFAULT_READ_PAGES_LEN: usize = 16;

/// Initial capacity of the write-set cache vector.
pub const DEFAULT_WRITE_PAGES_LEN: usize = 8;

/// Length, in bytes, of an MD5 digest used as the key-directory's key type.
pub const HASH_KEY_LEN: usize = 16;

/// Length, in ASCII hex characters, of a subscriber id.
pub const SUBSCRIBER_ID_LEN: usize = 40;

/// Number of times subscriber id generation is retried on an (extremely
/// unlikely) collision before giving up and using the colliding id anyway.
pub const SUBSCRIBER_ID_COLLISION_RETRIES: u32 = 3;

/// Maximum number of keys held by a single B-tree node, derived from the
/// page size the same way the reference engine derives it: `(page_size - 8)
/// / 8`. One 16-byte key plus an 8-byte value (or 4-byte child pointer,
/// rounded up) roughly accounts for each slot.
pub const fn btree_max_node_size(page_size: u32) -> usize {
    ((page_size - 8) / 8) as usize
}
