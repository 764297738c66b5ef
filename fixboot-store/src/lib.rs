/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixboot Store
//!
//! Message persistence strategies for the fixboot acceptor.
//!
//! This crate provides:
//! - **MessageStore trait**: per-session storage of sent messages and sequence numbers
//! - **MessageStoreFactory trait**: creates one store per session
//! - **MemoryStore / MemoryStoreFactory**: the in-memory default

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::{MemoryStoreFactory, MessageStoreFactory};
pub use memory::MemoryStore;
pub use traits::MessageStore;
