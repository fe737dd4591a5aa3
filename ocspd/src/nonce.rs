//! Bounded anti-replay tracking for OCSP request nonces

use std::collections::VecDeque;
use std::sync::Mutex;

use log::debug;

use crate::error::{Error, Result};

/// NonceCache remembers previously accepted request nonces so that a request replaying an
/// already-seen nonce value can be rejected before any response is produced.
///
/// Capacity is fixed at construction; once the cache is full, accepting a new nonce evicts the
/// oldest remembered value. A long-lived daemon must not grow this set without bound. A zero
/// capacity disables tracking entirely.
pub struct NonceCache {
    capacity: usize,
    seen: Mutex<VecDeque<Vec<u8>>>,
}

impl NonceCache {
    /// Instantiates a cache that remembers up to `capacity` nonce values.
    pub fn new(capacity: usize) -> Self {
        NonceCache {
            capacity,
            seen: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// `check_and_insert` records the presented nonce value, failing with
    /// [`Error::ReplayDetected`] if an identical value was already accepted. The membership
    /// check and the insertion happen under a single lock so two concurrent requests bearing
    /// the same nonce cannot both be accepted.
    pub fn check_and_insert(&self, nonce: &[u8]) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        let mut seen = if let Ok(g) = self.seen.lock() {
            g
        } else {
            return Err(Error::Unrecognized);
        };
        if seen.iter().any(|n| n == nonce) {
            return Err(Error::ReplayDetected);
        }
        if seen.len() >= self.capacity {
            seen.pop_front();
        }
        seen.push_back(nonce.to_vec());
        debug!("Recorded request nonce ({} tracked)", seen.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replayed_nonce_rejected() {
        let cache = NonceCache::new(8);
        assert!(cache.check_and_insert(&[1, 2, 3]).is_ok());
        assert_eq!(
            Some(Error::ReplayDetected),
            cache.check_and_insert(&[1, 2, 3]).err()
        );
        assert!(cache.check_and_insert(&[1, 2, 4]).is_ok());
    }

    #[test]
    fn oldest_nonce_evicted_at_capacity() {
        let cache = NonceCache::new(2);
        assert!(cache.check_and_insert(&[1]).is_ok());
        assert!(cache.check_and_insert(&[2]).is_ok());
        assert!(cache.check_and_insert(&[3]).is_ok());
        // the oldest value was evicted and is accepted again; newer values are still tracked
        assert!(cache.check_and_insert(&[1]).is_ok());
        assert_eq!(Some(Error::ReplayDetected), cache.check_and_insert(&[3]).err());
    }

    #[test]
    fn zero_capacity_disables_tracking() {
        let cache = NonceCache::new(0);
        assert!(cache.check_and_insert(&[9]).is_ok());
        assert!(cache.check_and_insert(&[9]).is_ok());
    }
}
