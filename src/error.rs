use std::io;

use crate::page::PageId;

pub type DbResult<T, E = Error> = Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The given page ID was out of bounds of the database file.
    #[error("page out of bounds ({0:?})")]
    PageOutOfBounds(PageId),

    /// Read an incomplete raw page, i.e., read less than the page size.
    #[error("incomplete page ({0:?})")]
    ReadIncompletePage(PageId),

    /// The header page didn't carry the expected magic identifier.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A caller-supplied argument was rejected before any I/O took place.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A cache hit found a page tagged with a different kind than the one
    /// the caller asked for. This is always a fatal consistency error.
    #[error("page {page:?} cached as {found}, expected {expected}")]
    TypeMismatch {
        page: PageId,
        expected: &'static str,
        found: &'static str,
    },

    /// UTF-8 error while decoding a stored string.
    #[error("utf-8 error while decoding string")]
    CorruptedUtf8,

    /// Any other invariant breach: short write, unknown driver, corrupted
    /// tag, capacity overflow. Not recoverable within the transaction.
    #[error("unexpected: {0}")]
    Unexpected(String),

    /// A generic IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
