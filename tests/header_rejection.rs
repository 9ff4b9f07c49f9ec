//! Scenario 4: a file whose header doesn't carry the expected magic
//! identifier is rejected rather than silently reinitialized.

use std::fs;

use ridb::{Db, Error, OpenFlags};

#[test]
fn mismatched_magic_is_invalid_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_header.db");

    let mut header = vec![0u8; 100];
    header[..8].copy_from_slice(b"rlite9.9");
    fs::write(&path, &header).unwrap();

    let err = Db::open(&path, OpenFlags::READWRITE | OpenFlags::CREATE).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "got {err:?}");
}
