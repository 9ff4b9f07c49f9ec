//! Property-based checks for spec §8's testable invariants P1-P6, driven
//! through the public [`ridb::Db`] API and a couple of lower-level handles
//! for the cache-shape properties (P1, P2) that aren't otherwise observable
//! from outside the crate.

mod test_utils;

use std::time::{Duration, Instant};

use proptest::prelude::*;
use ridb::{
    cache::PageCache,
    catalog::{header::HeaderPage, PageKind, PageObject},
    page::PageId,
};

fn arb_page_id() -> impl Strategy<Value = u32> {
    2u32..200
}

proptest! {
    /// P1: after any sequence of writes/discards, both caches are empty.
    #[test]
    fn p1_discard_always_empties_both_caches(pages in prop::collection::vec(arb_page_id(), 0..50)) {
        let mut cache = PageCache::new();
        for p in &pages {
            cache.cache_write(PageId::new(*p), PageKind::Header, PageObject::Header(HeaderPage { page_size: 1024 }));
        }
        cache.discard();
        prop_assert_eq!(cache.dirty_pages().count(), 0);
    }

    /// P2: the write set stays strictly sorted and page-unique regardless of
    /// insertion order.
    #[test]
    fn p2_write_set_stays_sorted_and_deduplicated(pages in prop::collection::vec(arb_page_id(), 0..100)) {
        let mut cache = PageCache::new();
        for p in &pages {
            cache.cache_write(PageId::new(*p), PageKind::Header, PageObject::Header(HeaderPage { page_size: 1024 }));
        }
        let ids: Vec<u32> = cache.dirty_pages().map(|e| e.page_id.get()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(&ids, &sorted);
    }

    /// P3: a value survives a write/commit/read cycle byte-for-byte.
    #[test]
    fn p3_set_commit_get_round_trips(key in "[a-z]{1,12}", value in prop::collection::vec(any::<u8>(), 0..300)) {
        let mut db = test_utils::open_memory();
        db.set_key(key.as_bytes(), &value).unwrap();
        db.commit().unwrap();
        prop_assert_eq!(db.get_key(key.as_bytes()).unwrap(), Some(value));
    }

    /// P4: subscribe then unsubscribe from the same channels leaves the
    /// subscriber set membership exactly as it was before, verified by an
    /// `observer` subscriber that was on those channels the whole time and
    /// whose recipient count must stay unchanged.
    #[test]
    fn p4_subscribe_unsubscribe_is_a_no_op(channels in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let mut db = test_utils::open_memory();
        let observer = db.create_subscriber().unwrap();
        for c in &channels {
            db.subscribe(&observer, c.as_bytes()).unwrap();
        }

        let before: Vec<usize> = channels.iter().map(|c| db.publish(c.as_bytes(), b"probe").unwrap()).collect();
        for c in &channels {
            // Drain so the next publish's recipient count isn't affected by
            // an already-full queue.
            while db.poll(&observer).unwrap().is_some() {}
        }

        let sub = db.create_subscriber().unwrap();
        for c in &channels {
            db.subscribe(&sub, c.as_bytes()).unwrap();
        }
        for c in &channels {
            db.unsubscribe(&sub, c.as_bytes()).unwrap();
        }

        let after: Vec<usize> = channels.iter().map(|c| db.publish(c.as_bytes(), b"probe").unwrap()).collect();
        prop_assert_eq!(before, after);
    }

    /// P6: `poll_wait` always returns within `timeout + epsilon`, even when
    /// no publisher ever shows up.
    #[test]
    fn p6_poll_wait_honors_its_timeout(millis in 1u64..80) {
        let mut db = test_utils::open_memory();
        let sub = db.create_subscriber().unwrap();
        let timeout = Duration::from_millis(millis);

        let start = Instant::now();
        let result = db.poll_wait(&sub, Some(timeout)).unwrap();
        let elapsed = start.elapsed();

        prop_assert_eq!(result, None);
        // In-memory databases have no FIFO to wait on and return
        // immediately; this is strictly within budget either way.
        prop_assert!(elapsed < timeout + Duration::from_secs(1));
    }
}

/// P5, as a concrete (non-proptest) scenario: every live subscriber to a
/// channel receives exactly one copy of a published message.
#[test]
fn p5_every_live_subscriber_receives_the_message_once() {
    let mut db = test_utils::open_memory();
    let subs: Vec<String> = (0..4).map(|_| db.create_subscriber().unwrap()).collect();
    for s in &subs {
        db.subscribe(s, b"broadcast").unwrap();
    }

    let recipients = db.publish(b"broadcast", b"hi everyone").unwrap();
    assert_eq!(recipients, subs.len());

    for s in &subs {
        let (channel, message) = db.poll(s).unwrap().expect("every subscriber should have a message");
        assert_eq!(channel, b"broadcast");
        assert_eq!(message, b"hi everyone");
        assert_eq!(db.poll(s).unwrap(), None, "message should be delivered exactly once");
    }
}
