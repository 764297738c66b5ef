/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session logging strategies.
//!
//! Each session gets its own [`Log`] from the configured [`LogFactory`].
//! The default [`ScreenLogFactory`] writes through `tracing`.

use fixboot_core::session_id::SessionId;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{error, info};

/// Per-session log sink.
pub trait Log: Send + Sync + Debug {
    /// Records a message received from the counterparty.
    fn on_incoming(&self, message: &str);

    /// Records a message sent to the counterparty.
    fn on_outgoing(&self, message: &str);

    /// Records a session event.
    fn on_event(&self, text: &str);

    /// Records a session error. Never filtered.
    fn on_error_event(&self, text: &str);
}

/// Creates a [`Log`] for each session.
pub trait LogFactory: Send + Sync + Debug {
    /// Creates the log for `session_id`.
    fn create(&self, session_id: &SessionId) -> Arc<dyn Log>;
}

/// Console log routed through `tracing`.
#[derive(Debug, Clone)]
pub struct ScreenLog {
    session: String,
    incoming: bool,
    outgoing: bool,
    events: bool,
}

impl ScreenLog {
    /// Returns whether incoming messages are logged.
    #[must_use]
    pub const fn logs_incoming(&self) -> bool {
        self.incoming
    }

    /// Returns whether outgoing messages are logged.
    #[must_use]
    pub const fn logs_outgoing(&self) -> bool {
        self.outgoing
    }

    /// Returns whether events are logged.
    #[must_use]
    pub const fn logs_events(&self) -> bool {
        self.events
    }
}

impl Log for ScreenLog {
    fn on_incoming(&self, message: &str) {
        if self.incoming {
            info!(target: "fixboot::session", session = %self.session, "incoming: {message}");
        }
    }

    fn on_outgoing(&self, message: &str) {
        if self.outgoing {
            info!(target: "fixboot::session", session = %self.session, "outgoing: {message}");
        }
    }

    fn on_event(&self, text: &str) {
        if self.events {
            info!(target: "fixboot::session", session = %self.session, "event: {text}");
        }
    }

    fn on_error_event(&self, text: &str) {
        error!(target: "fixboot::session", session = %self.session, "error: {text}");
    }
}

/// Factory for [`ScreenLog`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLogFactory {
    incoming: bool,
    outgoing: bool,
    events: bool,
}

impl ScreenLogFactory {
    /// Creates a factory with explicit category switches.
    #[must_use]
    pub const fn new(incoming: bool, outgoing: bool, events: bool) -> Self {
        Self {
            incoming,
            outgoing,
            events,
        }
    }
}

impl Default for ScreenLogFactory {
    /// Everything enabled.
    fn default() -> Self {
        Self::new(true, true, true)
    }
}

impl LogFactory for ScreenLogFactory {
    fn create(&self, session_id: &SessionId) -> Arc<dyn Log> {
        Arc::new(self.create_screen_log(session_id))
    }
}

impl ScreenLogFactory {
    /// Creates a concrete [`ScreenLog`] for `session_id`.
    #[must_use]
    pub fn create_screen_log(&self, session_id: &SessionId) -> ScreenLog {
        ScreenLog {
            session: session_id.to_string(),
            incoming: self.incoming,
            outgoing: self.outgoing,
            events: self.events,
        }
    }
}
