//! Bounded, TTL-expiring scratch buffers.
//!
//! The HTTP ingestion path writes the latest submission per provider here;
//! the flush worker drains entries with [`ScratchBuffer::release`]. This is
//! the only mutable state shared between handlers and workers: one mutex
//! over a hash map, expiry checked on read, plus a janitor task that evicts
//! what nobody released.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use mtp_observability::{record_buffer_entries, record_buffer_expired};
use tokio_util::sync::CancellationToken;

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

pub(crate) struct ScratchBuffer<T> {
    name: &'static str,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> ScratchBuffer<T> {
    pub(crate) fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores the latest value under `key`, resetting its TTL.
    pub(crate) fn set(&self, key: &str, value: T) {
        let mut entries = self.entries.lock().expect("scratch buffer lock poisoned");
        entries.insert(
            key.to_lowercase(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        record_buffer_entries(self.name, entries.len());
    }

    /// Removes and returns the entry under `key`. Expired entries are
    /// dropped rather than returned, so a worker never persists stale data.
    pub(crate) fn release(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().expect("scratch buffer lock poisoned");
        let entry = entries.remove(&key.to_lowercase())?;
        record_buffer_entries(self.name, entries.len());

        if entry.expires_at < Instant::now() {
            return None;
        }

        Some(entry.value)
    }

    /// Snapshot of all live entries, skipping expired ones.
    pub(crate) fn get_all(&self) -> Vec<(String, T)> {
        let entries = self.entries.lock().expect("scratch buffer lock poisoned");
        let now = Instant::now();

        entries
            .iter()
            .filter(|(_, entry)| entry.expires_at >= now)
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Evicts expired entries; returns how many were dropped.
    pub(crate) fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().expect("scratch buffer lock poisoned");
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);

        let expired = before - entries.len();
        if expired > 0 {
            record_buffer_expired(self.name, expired);
        }
        record_buffer_entries(self.name, entries.len());

        expired
    }

    /// Janitor loop evicting expired entries until shutdown. Runs at the
    /// buffer's own TTL cadence; precision does not matter since readers
    /// also check expiry.
    pub(crate) async fn run_janitor(&self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.ttl) => {
                    let expired = self.sweep();
                    if expired > 0 {
                        tracing::debug!(buffer = self.name, expired, "evicted expired scratch entries");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::debug!(buffer = self.name, "scratch janitor shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn release_removes_entry() {
        let buffer = ScratchBuffer::new("test", Duration::from_secs(60));
        buffer.set("KEY", 42u32);

        assert_eq!(buffer.release("key"), Some(42));
        assert_eq!(buffer.release("key"), None);
    }

    #[test]
    fn keys_are_case_normalized() {
        let buffer = ScratchBuffer::new("test", Duration::from_secs(60));
        buffer.set("AbCd", 1u32);
        assert_eq!(buffer.release("aBcD"), Some(1));
    }

    #[test]
    fn set_replaces_previous_value() {
        let buffer = ScratchBuffer::new("test", Duration::from_secs(60));
        buffer.set("key", 1u32);
        buffer.set("key", 2u32);
        assert_eq!(buffer.release("key"), Some(2));
    }

    #[tokio::test]
    async fn expired_entries_are_not_released() {
        let buffer = ScratchBuffer::new("test", Duration::from_millis(10));
        buffer.set("key", 1u32);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(buffer.release("key"), None);
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired() {
        let buffer = ScratchBuffer::new("test", Duration::from_millis(20));
        buffer.set("old", 1u32);

        tokio::time::sleep(Duration::from_millis(40)).await;
        buffer.set("fresh", 2u32);

        assert_eq!(buffer.sweep(), 1);
        assert_eq!(buffer.get_all().len(), 1);
        assert_eq!(buffer.release("fresh"), Some(2));
    }
}
