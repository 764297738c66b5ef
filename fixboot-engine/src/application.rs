/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! The acceptor drives these callbacks for every session event and every
//! message crossing the session boundary.

use async_trait::async_trait;
use fixboot_core::message::Message;
use fixboot_core::session_id::SessionId;

/// Reason for rejecting an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason {
    /// Rejection reason code (SessionRejectReason, tag 373).
    pub code: u32,
    /// Human-readable rejection text.
    pub text: String,
    /// Reference tag that caused the rejection.
    pub ref_tag: Option<u32>,
}

impl RejectReason {
    /// Creates a new rejection reason.
    #[must_use]
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            ref_tag: None,
        }
    }

    /// Sets the reference tag.
    #[must_use]
    pub const fn with_ref_tag(mut self, tag: u32) -> Self {
        self.ref_tag = Some(tag);
        self
    }
}

/// Application callback interface for handling FIX messages.
#[async_trait]
pub trait Application: Send + Sync {
    /// Called once per configured session when the acceptor starts.
    async fn on_create(&self, session_id: &SessionId);

    /// Called on successful logon.
    async fn on_logon(&self, session_id: &SessionId);

    /// Called when a session logs out or its connection drops.
    async fn on_logout(&self, session_id: &SessionId);

    /// Called before sending an admin message; the message may be modified.
    async fn to_admin(&self, message: &mut Message, session_id: &SessionId);

    /// Called when an admin message is received.
    ///
    /// Rejecting a Logon refuses the connection.
    #[allow(clippy::wrong_self_convention)]
    async fn from_admin(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;

    /// Called before sending an application message; the message may be
    /// modified.
    async fn to_app(&self, message: &mut Message, session_id: &SessionId);

    /// Called when an application message is received.
    ///
    /// Returning `Err` answers the counterparty with a session Reject.
    #[allow(clippy::wrong_self_convention)]
    async fn from_app(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;
}

/// Application that accepts everything and does nothing.
///
/// This is what the server assembles when no application is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationAdapter;

#[async_trait]
impl Application for ApplicationAdapter {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_logon(&self, _session_id: &SessionId) {}

    async fn on_logout(&self, _session_id: &SessionId) {}

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }

    async fn to_app(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }
}
