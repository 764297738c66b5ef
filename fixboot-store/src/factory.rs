/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Store factories.
//!
//! The acceptor asks its factory for one store per configured session.

use crate::memory::MemoryStore;
use crate::traits::MessageStore;
use fixboot_core::session_id::SessionId;
use std::fmt::Debug;
use std::sync::Arc;

/// Creates a [`MessageStore`] for each session.
pub trait MessageStoreFactory: Send + Sync + Debug {
    /// Creates the store for `session_id`.
    fn create(&self, session_id: &SessionId) -> Arc<dyn MessageStore>;
}

/// Factory producing [`MemoryStore`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryStoreFactory;

impl MemoryStoreFactory {
    /// Creates the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MessageStoreFactory for MemoryStoreFactory {
    fn create(&self, _session_id: &SessionId) -> Arc<dyn MessageStore> {
        Arc::new(MemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_factory_creates_independent_stores() {
        let factory = MemoryStoreFactory::new();
        let a = factory.create(&SessionId::new("FIX.4.4", "S", "A"));
        let b = factory.create(&SessionId::new("FIX.4.4", "S", "B"));

        a.set_next_sender_seq(42);
        a.store(1, b"x").await.unwrap();

        assert_eq!(b.next_sender_seq(), 1);
        assert!(b.get_range(1, 0).await.unwrap().is_empty());
    }
}
