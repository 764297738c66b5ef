/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Socket acceptors.
//!
//! Two implementations share one construction signature:
//! - [`SocketAcceptor`]: every session and connection is served by a single
//!   dedicated thread
//! - [`ThreadedSocketAcceptor`]: connections are spread over a multi-threaded
//!   runtime, one task per connection

mod session;
mod socket;

pub use socket::{SocketAcceptor, ThreadedSocketAcceptor};

use crate::application::Application;
use crate::log::LogFactory;
use crate::message_factory::MessageFactory;
use fixboot_core::error::ConfigError;
use fixboot_core::session_id::SessionId;
use fixboot_settings::SessionSettings;
use fixboot_store::MessageStoreFactory;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Threading model of an acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptorKind {
    /// One thread serves every session.
    SingleThreaded,
    /// A pool of threads serves connections concurrently.
    MultiThreaded,
}

impl AcceptorKind {
    /// Maps the `concurrent.enabled` switch to a kind.
    #[must_use]
    pub const fn from_concurrent(enabled: bool) -> Self {
        if enabled {
            Self::MultiThreaded
        } else {
            Self::SingleThreaded
        }
    }

    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleThreaded => "single-threaded",
            Self::MultiThreaded => "multi-threaded",
        }
    }
}

impl fmt::Display for AcceptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-side FIX connector.
pub trait Acceptor: Send + Sync + fmt::Debug {
    /// Binds every configured listener and starts serving.
    ///
    /// Starting a running acceptor does nothing.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a listener cannot be bound or the
    /// runtime cannot be created.
    fn start(&self) -> Result<(), ConfigError>;

    /// Stops serving. Unless `force` is set, logged on sessions are sent a
    /// Logout first.
    fn stop(&self, force: bool);

    /// Returns true between a successful `start` and `stop`.
    fn is_running(&self) -> bool;

    /// Returns the sessions this acceptor serves.
    fn session_ids(&self) -> Vec<SessionId>;

    /// Returns true when the session has an active, logged on connection.
    fn is_logged_on(&self, session_id: &SessionId) -> bool;

    /// Returns the threading model.
    fn kind(&self) -> AcceptorKind;

    /// Returns the bound listener addresses while running.
    fn endpoints(&self) -> Vec<SocketAddr>;
}

/// The strategies an acceptor is built from.
#[derive(Clone)]
pub struct AcceptorParts {
    /// Application callbacks.
    pub application: Arc<dyn Application>,
    /// Store strategy.
    pub store_factory: Arc<dyn MessageStoreFactory>,
    /// Session settings.
    pub settings: Arc<SessionSettings>,
    /// Log strategy.
    pub log_factory: Arc<dyn LogFactory>,
    /// Message construction strategy.
    pub message_factory: Arc<dyn MessageFactory>,
}

impl AcceptorParts {
    /// Groups the parts in the conventional argument order.
    #[must_use]
    pub fn new(
        application: Arc<dyn Application>,
        store_factory: Arc<dyn MessageStoreFactory>,
        settings: Arc<SessionSettings>,
        log_factory: Arc<dyn LogFactory>,
        message_factory: Arc<dyn MessageFactory>,
    ) -> Self {
        Self {
            application,
            store_factory,
            settings,
            log_factory,
            message_factory,
        }
    }
}

impl fmt::Debug for AcceptorParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptorParts")
            .field("store_factory", &self.store_factory)
            .field("sessions", &self.settings.session_count())
            .field("log_factory", &self.log_factory)
            .field("message_factory", &self.message_factory)
            .finish_non_exhaustive()
    }
}

/// Builds the acceptor of the requested kind.
///
/// # Errors
/// Returns [`ConfigError`] when the settings do not describe a usable
/// acceptor.
pub fn new_acceptor(kind: AcceptorKind, parts: AcceptorParts) -> Result<Arc<dyn Acceptor>, ConfigError> {
    Ok(match kind {
        AcceptorKind::SingleThreaded => Arc::new(SocketAcceptor::new(parts)?),
        AcceptorKind::MultiThreaded => Arc::new(ThreadedSocketAcceptor::new(parts)?),
    })
}
