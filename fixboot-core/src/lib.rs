/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixboot Core
//!
//! Core types and error definitions shared by every fixboot crate.
//!
//! This crate provides:
//! - **Error types**: `ConfigError`, `SessionError`, `StoreError` and the `FixError` umbrella
//! - **Session identity**: `SessionId`
//! - **Messages**: owned tag=value `Message` with parsing and encoding
//! - **Framing**: `FixCodec` for splitting a byte stream into messages

pub mod checksum;
pub mod codec;
pub mod error;
pub mod message;
pub mod session_id;

pub use checksum::{calculate_checksum, format_checksum, parse_checksum};
pub use codec::{CodecError, FixCodec};
pub use error::{ConfigError, FixError, Result, SessionError, StoreError};
pub use message::{Message, MsgType, SOH, tags};
pub use session_id::SessionId;
