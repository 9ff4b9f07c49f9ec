//! The public, embeddable database handle.
//!
//! [`Db`] is the only type most callers need: it wires the transaction
//! manager ([`crate::store::Store`]), the key directory
//! ([`crate::keydir`]), and the pub/sub bookkeeping
//! ([`crate::namespace`], [`crate::subscriber`], [`crate::fifo`]) together
//! behind a single synchronous, single-threaded API.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::instrument;

use crate::{
    catalog::{list, set},
    driver::OpenFlags,
    error::{DbResult, Error},
    fifo, keydir,
    namespace::{self, NamespaceGuard},
    page::default_page_size,
    store::Store,
    subscriber,
};

pub struct Db {
    store: Store,
    path: PathBuf,
}

impl Db {
    /// Opens (or creates, if `flags` includes [`OpenFlags::CREATE`]) the
    /// database at `path`. Pass [`crate::driver::MEMORY_PATH`] for a
    /// throwaway in-memory database.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Store::open(&path, flags, default_page_size())?;
        namespace::init(&mut store)?;
        store.commit()?;
        Ok(Db { store, path })
    }

    pub fn is_memory(&self) -> bool {
        self.store.is_memory()
    }

    /// Flushes every staged mutation to disk.
    pub fn commit(&mut self) -> DbResult<()> {
        self.store.commit()
    }

    /// Drops every staged, uncommitted mutation.
    pub fn discard(&mut self) {
        self.store.discard()
    }

    /// Sets `key` to `value`, replacing any existing value. Staged until
    /// the next [`Self::commit`].
    pub fn set_key(&mut self, key: &[u8], value: &[u8]) -> DbResult<()> {
        keydir::set_key(&mut self.store, key, value)
    }

    /// Looks up `key`. `None` both when the key was never set and when it
    /// was deleted.
    pub fn get_key(&mut self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        keydir::get_key(&mut self.store, key)
    }

    /// Deletes `key`, returning whether it was previously present.
    pub fn delete_key(&mut self, key: &[u8]) -> DbResult<bool> {
        keydir::delete_key(&mut self.store, key)
    }

    /// Allocates a new subscriber id and, for file-backed databases, its
    /// wakeup FIFO.
    pub fn create_subscriber(&mut self) -> DbResult<String> {
        let id = subscriber::generate_subscriber_id(&mut self.store)?;
        if !self.is_memory() {
            fifo::ensure_fifo(&self.fifo_path(&id))?;
        }
        Ok(id)
    }

    /// Subscribes `subscriber_id` to `channel`.
    pub fn subscribe(&mut self, subscriber_id: &str, channel: &[u8]) -> DbResult<()> {
        let page_size = self.store.page_size();
        let mut guard = NamespaceGuard::new(&mut self.store);

        let channel_subscribers =
            keydir::dir_set_root(guard.store(), namespace::CHANNEL_SUBSCRIBERS_DIR, channel)?;
        set::add(
            guard.store(),
            channel_subscribers,
            subscriber_id.as_bytes(),
            page_size,
        )?;

        let subscriber_channels = keydir::dir_set_root(
            guard.store(),
            namespace::SUBSCRIBER_CHANNELS_DIR,
            subscriber_id.as_bytes(),
        )?;
        set::add(guard.store(), subscriber_channels, channel, page_size)?;

        guard.finish();
        self.store.commit()
    }

    /// Unsubscribes `subscriber_id` from `channel`. A no-op if it wasn't
    /// subscribed.
    pub fn unsubscribe(&mut self, subscriber_id: &str, channel: &[u8]) -> DbResult<()> {
        let mut guard = NamespaceGuard::new(&mut self.store);

        if let Some(channel_subscribers) = keydir::existing_dir_root(
            guard.store(),
            namespace::CHANNEL_SUBSCRIBERS_DIR,
            channel,
        )? {
            set::remove(guard.store(), channel_subscribers, subscriber_id.as_bytes())?;
        }
        if let Some(subscriber_channels) = keydir::existing_dir_root(
            guard.store(),
            namespace::SUBSCRIBER_CHANNELS_DIR,
            subscriber_id.as_bytes(),
        )? {
            set::remove(guard.store(), subscriber_channels, channel)?;
        }

        guard.finish();
        self.store.commit()
    }

    /// Queues `message` for every subscriber currently on `channel` and
    /// wakes each of them up. Returns how many subscribers were notified.
    #[instrument(skip(self, message), fields(channel = %String::from_utf8_lossy(channel)))]
    pub fn publish(&mut self, channel: &[u8], message: &[u8]) -> DbResult<usize> {
        let Some(channel_subscribers) = keydir::existing_dir_root(
            &mut self.store,
            namespace::CHANNEL_SUBSCRIBERS_DIR,
            channel,
        )?
        else {
            return Ok(0);
        };

        let subscribers = set::all(&mut self.store, channel_subscribers)?;
        let page_size = self.store.page_size();

        for subscriber_id in &subscribers {
            let mut guard = NamespaceGuard::new(&mut self.store);
            let queue = keydir::dir_list_root(
                guard.store(),
                namespace::SUBSCRIBER_MESSAGES_DIR,
                subscriber_id,
            )?;
            let group = vec![b"message".to_vec(), channel.to_vec(), message.to_vec()];
            list::push_back(guard.store(), queue, group, page_size)?;
            guard.finish();
        }
        self.store.commit()?;

        for subscriber_id in &subscribers {
            let subscriber_id = String::from_utf8_lossy(subscriber_id).into_owned();
            // A subscriber's FIFO wakeup is best-effort: a reader that
            // isn't currently parked in poll_wait just misses the nudge
            // and will see the message on its next poll anyway.
            let _ = fifo::signal(&self.fifo_path(&subscriber_id));
        }

        Ok(subscribers.len())
    }

    /// Pops the oldest pending message for `subscriber_id`, if any, without
    /// blocking.
    pub fn poll(&mut self, subscriber_id: &str) -> DbResult<Option<(Vec<u8>, Vec<u8>)>> {
        // Another handle may have published since this handle last read the
        // subscriber's queue page; discard first so the lookup below always
        // goes to disk rather than a stale cached leaf.
        self.store.discard();
        let Some(queue) = keydir::existing_dir_root(
            &mut self.store,
            namespace::SUBSCRIBER_MESSAGES_DIR,
            subscriber_id.as_bytes(),
        )?
        else {
            return Ok(None);
        };

        let Some(mut group) = list::pop_front(&mut self.store, queue)? else {
            return Ok(None);
        };
        self.store.commit()?;

        if group.len() != 3 {
            return Err(Error::Unexpected(
                "corrupted pub/sub message group".to_string(),
            ));
        }
        let message = group.swap_remove(2);
        let channel = group.swap_remove(1);
        Ok(Some((channel, message)))
    }

    /// Like [`Self::poll`], but blocks up to `timeout` (or forever, if
    /// `None`) for a message to arrive if the queue is currently empty.
    /// Always returns immediately for an in-memory database, since there is
    /// no cross-process FIFO to wait on.
    pub fn poll_wait(
        &mut self,
        subscriber_id: &str,
        timeout: Option<Duration>,
    ) -> DbResult<Option<(Vec<u8>, Vec<u8>)>> {
        if let Some(message) = self.poll(subscriber_id)? {
            return Ok(Some(message));
        }
        if self.is_memory() {
            return Ok(None);
        }
        // Release everything cached before parking on the FIFO: a signal
        // only means "something happened," not "this page is still what we
        // last read," and the wait itself must not hold the read cache
        // hostage against a concurrent committer.
        self.store.discard();
        if !fifo::wait_for_signal(&self.fifo_path(subscriber_id), timeout)? {
            return Ok(None);
        }
        self.poll(subscriber_id)
    }

    fn fifo_path(&self, subscriber_id: &str) -> PathBuf {
        fifo::fifo_path(&self.path, subscriber_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MEMORY_PATH;
    use tempfile::tempdir;

    fn open_memory() -> Db {
        Db::open(MEMORY_PATH, OpenFlags::READWRITE | OpenFlags::CREATE).unwrap()
    }

    #[test]
    fn set_get_delete_round_trip() {
        let mut db = open_memory();
        db.set_key(b"a", b"1").unwrap();
        db.commit().unwrap();
        assert_eq!(db.get_key(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(db.delete_key(b"a").unwrap());
        db.commit().unwrap();
        assert_eq!(db.get_key(b"a").unwrap(), None);
    }

    #[test]
    fn publish_before_any_subscriber_notifies_nobody() {
        let mut db = open_memory();
        let notified = db.publish(b"news", b"hello").unwrap();
        assert_eq!(notified, 0);
    }

    #[test]
    fn subscribe_publish_poll_round_trip() {
        let mut db = open_memory();
        let sub = db.create_subscriber().unwrap();
        db.subscribe(&sub, b"news").unwrap();

        let notified = db.publish(b"news", b"hello").unwrap();
        assert_eq!(notified, 1);

        let (channel, message) = db.poll(&sub).unwrap().expect("message should be queued");
        assert_eq!(channel, b"news");
        assert_eq!(message, b"hello");
        assert_eq!(db.poll(&sub).unwrap(), None);
    }

    #[test]
    fn unsubscribed_channel_receives_nothing() {
        let mut db = open_memory();
        let sub = db.create_subscriber().unwrap();
        db.subscribe(&sub, b"news").unwrap();
        db.unsubscribe(&sub, b"news").unwrap();
        db.publish(b"news", b"hello").unwrap();
        assert_eq!(db.poll(&sub).unwrap(), None);
    }

    #[test]
    fn poll_wait_returns_immediately_for_memory_db_with_no_message() {
        let mut db = open_memory();
        let sub = db.create_subscriber().unwrap();
        let result = db.poll_wait(&sub, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn file_backed_db_subscriber_wakes_on_publish() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pubsub.db");
        let mut db = Db::open(&path, OpenFlags::READWRITE | OpenFlags::CREATE).unwrap();
        let sub = db.create_subscriber().unwrap();
        db.subscribe(&sub, b"news").unwrap();
        db.publish(b"news", b"hello").unwrap();

        let (channel, message) = db
            .poll_wait(&sub, Some(Duration::from_secs(1)))
            .unwrap()
            .expect("message should already be queued");
        assert_eq!(channel, b"news");
        assert_eq!(message, b"hello");
    }
}
