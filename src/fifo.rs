//! Cross-process subscriber wakeup (C7), backed by POSIX named pipes.
//!
//! Every subscriber gets a FIFO alongside the database file. `publish`
//! (potentially from another process) writes a single byte to wake up
//! whoever is parked in [`wait_for_signal`]; the payload itself always
//! travels through the on-disk message queue ([`crate::catalog::list`]),
//! never through the FIFO, which only ever carries a wakeup.

use std::{
    fs::OpenOptions,
    io::{Read, Write},
    os::fd::FromRawFd,
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
    time::Duration,
};

use nix::{
    errno::Errno,
    fcntl::{open, OFlag},
    sys::stat::Mode,
    unistd::mkfifo,
};
use tracing::{debug, trace};

use crate::error::{DbResult, Error};

/// Derives a subscriber's wakeup FIFO path from the database path and its
/// subscriber id.
pub fn fifo_path(db_path: &Path, subscriber_id: &str) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push(format!(".{subscriber_id}"));
    PathBuf::from(name)
}

/// Creates the FIFO at `path` if it doesn't already exist. Idempotent.
pub fn ensure_fifo(path: &Path) -> DbResult<()> {
    match mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(e) => Err(Error::Unexpected(format!(
            "mkfifo {}: {e}",
            path.display()
        ))),
    }
}

/// Wakes up whatever is blocked in [`wait_for_signal`] on `path`. A
/// non-blocking open that finds no reader (`ENXIO`) is not an error: the
/// wakeup is simply dropped, matching the reference engine's fire-and-forget
/// publish semantics.
pub fn signal(path: &Path) -> DbResult<()> {
    ensure_fifo(path)?;
    match open(path, OFlag::O_WRONLY | OFlag::O_NONBLOCK, Mode::empty()) {
        Ok(fd) => {
            let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
            if let Err(e) = file.write_all(&[1u8]) {
                trace!(path = %path.display(), error = %e, "fifo wakeup write failed");
            }
            Ok(())
        }
        Err(Errno::ENXIO) => {
            debug!(path = %path.display(), "no reader waiting on fifo, dropping wakeup");
            Ok(())
        }
        Err(e) => Err(Error::Unexpected(format!(
            "open fifo {}: {e}",
            path.display()
        ))),
    }
}

/// Blocks until `path`'s FIFO delivers a wakeup byte, or `timeout` elapses
/// (`None` blocks forever). The actual open+read happens on a helper
/// thread: a FIFO open for reading blocks until a writer shows up, which
/// would otherwise make this call impossible to bound with a timeout.
pub fn wait_for_signal(path: &Path, timeout: Option<Duration>) -> DbResult<bool> {
    ensure_fifo(path)?;
    let path = path.to_path_buf();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let woke = OpenOptions::new()
            .read(true)
            .open(&path)
            .and_then(|mut f| {
                let mut byte = [0u8; 1];
                f.read_exact(&mut byte)
            })
            .is_ok();
        let _ = tx.send(woke);
    });

    match timeout {
        Some(duration) => match rx.recv_timeout(duration) {
            Ok(woke) => Ok(woke),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(false),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(false),
        },
        None => Ok(rx.recv().unwrap_or(false)),
    }
}
