use std::{
    ops::{Deref, DerefMut},
    path::PathBuf,
};

use ridb::{Db, DbResult, OpenFlags, MEMORY_PATH};
use tempfile::TempDir;

/// A file-backed test database. Keeps its owning [`TempDir`] alive so the
/// backing file (and any FIFOs created beside it) are cleaned up on drop.
pub struct TestDb {
    db: Db,
    _dir: TempDir,
}

impl TestDb {
    /// Opens a fresh file-backed database in a throwaway directory.
    pub fn new_temp() -> DbResult<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.db");
        let db = Db::open(&path, OpenFlags::READWRITE | OpenFlags::CREATE)?;
        Ok(TestDb { db, _dir: dir })
    }

    pub fn path(&self) -> PathBuf {
        self._dir.path().join("test.db")
    }
}

impl Deref for TestDb {
    type Target = Db;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl DerefMut for TestDb {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

/// Opens a throwaway in-memory database.
#[allow(dead_code)]
pub fn open_memory() -> Db {
    Db::open(MEMORY_PATH, OpenFlags::READWRITE | OpenFlags::CREATE).unwrap()
}
