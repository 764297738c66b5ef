/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store implementation.
//!
//! Nothing survives a restart; this is the acceptor's default strategy.

use crate::traits::MessageStore;
use async_trait::async_trait;
use bytes::Bytes;
use fixboot_core::error::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// In-memory message store backed by a `BTreeMap` for range queries.
#[derive(Debug)]
pub struct MemoryStore {
    /// Stored messages indexed by sequence number.
    messages: RwLock<BTreeMap<u64, Bytes>>,
    /// Next sender sequence number.
    next_sender_seq: AtomicU64,
    /// Next expected target sequence number.
    next_target_seq: AtomicU64,
    /// Creation time, reset by [`MessageStore::reset`].
    creation_time: RwLock<SystemTime>,
}

impl MemoryStore {
    /// Creates a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial_seqs(1, 1)
    }

    /// Creates a new memory store with initial sequence numbers.
    #[must_use]
    pub fn with_initial_seqs(sender_seq: u64, target_seq: u64) -> Self {
        Self {
            messages: RwLock::new(BTreeMap::new()),
            next_sender_seq: AtomicU64::new(sender_seq),
            next_target_seq: AtomicU64::new(target_seq),
            creation_time: RwLock::new(SystemTime::now()),
        }
    }

    /// Returns the number of stored messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.read().len()
    }

    /// Checks if a message with the given sequence number exists.
    #[must_use]
    pub fn contains(&self, seq_num: u64) -> bool {
        self.messages.read().contains_key(&seq_num)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        self.messages
            .write()
            .insert(seq_num, Bytes::copy_from_slice(message));
        Ok(())
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        let end = if end == 0 { u64::MAX } else { end };
        if begin > end {
            return Err(StoreError::RangeNotAvailable {
                range: begin..end.saturating_add(1),
            });
        }
        Ok(self
            .messages
            .read()
            .range(begin..=end)
            .map(|(_, bytes)| bytes.clone())
            .collect())
    }

    fn next_sender_seq(&self) -> u64 {
        self.next_sender_seq.load(Ordering::SeqCst)
    }

    fn next_target_seq(&self) -> u64 {
        self.next_target_seq.load(Ordering::SeqCst)
    }

    fn set_next_sender_seq(&self, seq: u64) {
        self.next_sender_seq.store(seq, Ordering::SeqCst);
    }

    fn set_next_target_seq(&self, seq: u64) {
        self.next_target_seq.store(seq, Ordering::SeqCst);
    }

    fn incr_next_sender_seq(&self) -> u64 {
        self.next_sender_seq.fetch_add(1, Ordering::SeqCst)
    }

    fn incr_next_target_seq(&self) {
        self.next_target_seq.fetch_add(1, Ordering::SeqCst);
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.messages.write().clear();
        self.next_sender_seq.store(1, Ordering::SeqCst);
        self.next_target_seq.store(1, Ordering::SeqCst);
        *self.creation_time.write() = SystemTime::now();
        Ok(())
    }

    fn creation_time(&self) -> SystemTime {
        *self.creation_time.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_new() {
        let store = MemoryStore::new();
        assert_eq!(store.next_sender_seq(), 1);
        assert_eq!(store.next_target_seq(), 1);
        assert_eq!(store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_get_range() {
        let store = MemoryStore::new();
        store.store(1, b"msg1").await.unwrap();
        store.store(2, b"msg2").await.unwrap();
        store.store(3, b"msg3").await.unwrap();
        store.store(5, b"msg5").await.unwrap();

        assert_eq!(store.get_range(1, 3).await.unwrap().len(), 3);
        let tail = store.get_range(3, 0).await.unwrap();
        assert_eq!(tail, vec![Bytes::from_static(b"msg3"), Bytes::from_static(b"msg5")]);
        assert!(store.get_range(10, 20).await.unwrap().is_empty());
        assert!(store.get_range(5, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_increments() {
        let store = MemoryStore::with_initial_seqs(10, 20);
        assert_eq!(store.incr_next_sender_seq(), 10);
        assert_eq!(store.next_sender_seq(), 11);
        store.incr_next_target_seq();
        assert_eq!(store.next_target_seq(), 21);
    }

    #[tokio::test]
    async fn test_memory_store_reset() {
        let store = MemoryStore::new();
        store.store(1, b"msg1").await.unwrap();
        store.set_next_sender_seq(10);
        store.set_next_target_seq(20);
        let created = store.creation_time();

        store.reset().await.unwrap();

        assert_eq!(store.message_count(), 0);
        assert!(!store.contains(1));
        assert_eq!(store.next_sender_seq(), 1);
        assert_eq!(store.next_target_seq(), 1);
        assert!(store.creation_time() >= created);
    }
}
