//! Short-lived cache of interactively verified credentials.
//!
//! Entries are keyed by identity and hold a digest of the verified secret, so
//! a repeated request with the same password skips the backend round trip for
//! [`CacheConfig::ttl`]. Stale entries are dropped on lookup and by a bounded
//! sweep that runs every [`CacheConfig::sweep_interval`] operations.
//!
//! The lock is only held for the table operation itself; callers must never
//! hold it across a backend call, and the API doesn't allow it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::config::CacheConfig;
use crate::crypto::constant_time_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
}

#[derive(Debug)]
struct CacheEntry {
    secret_digest: String,
    last_verified_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    ops_until_sweep: u32,
}

#[derive(Debug)]
pub struct CredentialCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CredentialCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(config.capacity),
                ops_until_sweep: config.sweep_interval.max(1),
            }),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn lookup(&self, identity: &str, secret_digest: &str) -> CacheLookup {
        self.lookup_at(identity, secret_digest, Utc::now())
    }

    /// A stale entry is evicted. A wrong digest misses and leaves the entry alone.
    pub fn lookup_at(&self, identity: &str, secret_digest: &str, now: DateTime<Utc>) -> CacheLookup {
        let Some(mut state) = self.lock() else {
            return CacheLookup::Miss;
        };

        let outcome = match state.entries.get(identity) {
            Some(entry) if self.is_stale(entry, now) => {
                state.entries.remove(identity);
                log::debug!(target: "shuebox_auth::cache", "msg=\"evicted stale entry\" identity=\"{identity}\"");
                CacheLookup::Miss
            }
            Some(entry)
                if constant_time_eq(entry.secret_digest.as_bytes(), secret_digest.as_bytes()) =>
            {
                CacheLookup::Hit
            }
            _ => CacheLookup::Miss,
        };

        self.tick(&mut state, now);
        outcome
    }

    pub fn insert(&self, identity: &str, secret_digest: &str) {
        self.insert_at(identity, secret_digest, Utc::now());
    }

    pub fn insert_at(&self, identity: &str, secret_digest: &str, now: DateTime<Utc>) {
        let Some(mut state) = self.lock() else {
            return;
        };
        state.entries.insert(
            identity.to_owned(),
            CacheEntry {
                secret_digest: secret_digest.to_owned(),
                last_verified_at: now,
            },
        );
        self.tick(&mut state, now);
    }

    /// Evicts up to `capacity` stale entries and returns how many went.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        match self.lock() {
            Some(mut state) => self.sweep_locked(&mut state, now),
            None => 0,
        }
    }

    pub fn clear(&self) {
        if let Some(mut state) = self.lock() {
            state.entries.clear();
            state.ops_until_sweep = self.config.sweep_interval.max(1);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |state| state.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Option<MutexGuard<'_, CacheState>> {
        match self.state.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                log::error!(target: "shuebox_auth::cache", "msg=\"credential cache lock poisoned, treating as miss\"");
                None
            }
        }
    }

    fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.last_verified_at) >= self.config.ttl
    }

    fn tick(&self, state: &mut CacheState, now: DateTime<Utc>) {
        state.ops_until_sweep = state.ops_until_sweep.saturating_sub(1);
        if state.ops_until_sweep == 0 {
            let evicted = self.sweep_locked(state, now);
            if evicted > 0 {
                log::debug!(target: "shuebox_auth::cache", "msg=\"periodic sweep\" evicted=\"{evicted}\"");
            }
            state.ops_until_sweep = self.config.sweep_interval.max(1);
        }
    }

    fn sweep_locked(&self, state: &mut CacheState, now: DateTime<Utc>) -> usize {
        let stale: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| self.is_stale(entry, now))
            .take(self.config.capacity)
            .map(|(identity, _)| identity.clone())
            .collect();
        for identity in &stale {
            state.entries.remove(identity);
        }
        stale.len()
    }
}
