/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message construction strategy.

use fixboot_core::message::{Message, MsgType};
use std::fmt::Debug;

/// Builds empty messages for the session layer.
pub trait MessageFactory: Send + Sync + Debug {
    /// Creates a message of `msg_type` for the given FIX version.
    fn create(&self, begin_string: &str, msg_type: MsgType) -> Message;
}

/// Factory that stamps only BeginString and MsgType.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMessageFactory;

impl MessageFactory for DefaultMessageFactory {
    fn create(&self, begin_string: &str, msg_type: MsgType) -> Message {
        Message::new(begin_string, msg_type)
    }
}
