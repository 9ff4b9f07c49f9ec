//! A small embeddable key-value database engine with a page-based store, a
//! write-through page cache, a B-tree key directory, and cross-process
//! pub/sub layered on POSIX FIFOs.
//!
//! [`Db`] is the entry point; everything else is implementation detail kept
//! public for testing and for embedders who need to reach past it (e.g. to
//! drive the B-tree or page chain primitives directly against a custom
//! [`store::Store`]).

pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod fifo;
pub mod ioutil;
pub mod keydir;
pub mod namespace;
pub mod page;
pub mod store;
pub mod subscriber;

pub use db::Db;
pub use driver::{OpenFlags, MEMORY_PATH};
pub use error::{DbResult, Error};
