//! Subscriber id generation (C8).
//!
//! Mirrors the reference engine's `generate_subscriptor_id`: SHA-1 over the
//! current time plus random bytes, rendered as a lowercase hex string. A
//! SHA-1 digest is 20 bytes, so the rendered id is exactly
//! [`crate::config::SUBSCRIBER_ID_LEN`] characters, with no truncation
//! needed. Collisions are astronomically unlikely; the retry loop exists
//! purely to match the reference engine's defensive posture.

use rand::RngCore;
use sha1::{Digest, Sha1};
use tracing::warn;

use crate::{
    config::SUBSCRIBER_ID_COLLISION_RETRIES, keydir, namespace::SUBSCRIBER_CHANNELS_DIR,
    store::Store,
};

/// Generates a subscriber id guaranteed not to collide with one already in
/// use, retrying up to [`SUBSCRIBER_ID_COLLISION_RETRIES`] times before
/// giving up and handing back a colliding id anyway.
pub fn generate_subscriber_id(store: &mut Store) -> crate::error::DbResult<String> {
    let mut id = random_id();
    for attempt in 0..SUBSCRIBER_ID_COLLISION_RETRIES {
        let taken = keydir::existing_dir_root(store, SUBSCRIBER_CHANNELS_DIR, id.as_bytes())?
            .is_some();
        if !taken {
            return Ok(id);
        }
        warn!(attempt, %id, "subscriber id collision, regenerating");
        id = random_id();
    }
    Ok(id)
}

fn random_id() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();

    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha1::new();
    hasher.update(now.as_nanos().to_be_bytes());
    hasher.update(salt);
    let digest = hasher.finalize();

    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        driver::{OpenFlags, MEMORY_PATH},
        namespace,
    };
    use std::path::Path;

    #[test]
    fn generated_id_has_the_expected_length() {
        let id = random_id();
        assert_eq!(id.len(), crate::config::SUBSCRIBER_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_unique_across_many_generations() {
        let mut store = Store::open(
            Path::new(MEMORY_PATH),
            OpenFlags::READWRITE | OpenFlags::CREATE,
            1024,
        )
        .unwrap();
        namespace::init(&mut store).unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let id = generate_subscriber_id(&mut store).unwrap();
            assert!(seen.insert(id), "generated a duplicate subscriber id");
        }
    }
}
