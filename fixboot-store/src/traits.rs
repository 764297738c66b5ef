/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message store trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use fixboot_core::error::StoreError;

/// Storage for one session's outgoing messages and sequence numbers.
///
/// The acceptor writes every message it sends so it can be replayed on a
/// resend request, and keeps both sequence counters here.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores an outgoing message under its sequence number.
    ///
    /// # Errors
    /// Returns `StoreError` if the message cannot be stored.
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError>;

    /// Retrieves stored messages in `begin..=end`; an `end` of 0 means
    /// "through the last stored message".
    ///
    /// # Errors
    /// Returns `StoreError` if messages cannot be retrieved.
    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError>;

    /// Returns the next sender sequence number.
    fn next_sender_seq(&self) -> u64;

    /// Returns the next expected target sequence number.
    fn next_target_seq(&self) -> u64;

    /// Sets the next sender sequence number.
    fn set_next_sender_seq(&self, seq: u64);

    /// Sets the next expected target sequence number.
    fn set_next_target_seq(&self, seq: u64);

    /// Returns the current sender sequence number and advances it.
    fn incr_next_sender_seq(&self) -> u64 {
        let seq = self.next_sender_seq();
        self.set_next_sender_seq(seq + 1);
        seq
    }

    /// Advances the expected target sequence number.
    fn incr_next_target_seq(&self) {
        self.set_next_target_seq(self.next_target_seq() + 1);
    }

    /// Clears stored messages and resets both sequence numbers to 1.
    ///
    /// # Errors
    /// Returns `StoreError` if the reset fails.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Returns the creation time of the store/session.
    fn creation_time(&self) -> std::time::SystemTime;

    /// Reloads state from persistent storage.
    ///
    /// # Errors
    /// Returns `StoreError` if the refresh fails.
    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
