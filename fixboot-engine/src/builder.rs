/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Acceptor builder for fluent configuration.
//!
//! Every strategy starts at its stock implementation and can be swapped
//! before [`AcceptorBuilder::build`].

use crate::acceptor::{Acceptor, AcceptorKind, AcceptorParts, new_acceptor};
use crate::application::{Application, ApplicationAdapter};
use crate::log::{LogFactory, ScreenLogFactory};
use crate::message_factory::{DefaultMessageFactory, MessageFactory};
use fixboot_core::error::ConfigError;
use fixboot_settings::SessionSettings;
use fixboot_store::{MemoryStoreFactory, MessageStoreFactory};
use std::fmt;
use std::sync::Arc;

/// Builder for configuring an acceptor.
#[derive(Clone)]
pub struct AcceptorBuilder {
    application: Arc<dyn Application>,
    store_factory: Arc<dyn MessageStoreFactory>,
    log_factory: Arc<dyn LogFactory>,
    message_factory: Arc<dyn MessageFactory>,
    kind: AcceptorKind,
}

impl fmt::Debug for AcceptorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptorBuilder")
            .field("store_factory", &self.store_factory)
            .field("log_factory", &self.log_factory)
            .field("message_factory", &self.message_factory)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Default for AcceptorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceptorBuilder {
    /// Creates a builder with the stock strategies and a single-threaded
    /// acceptor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            application: Arc::new(ApplicationAdapter),
            store_factory: Arc::new(MemoryStoreFactory::new()),
            log_factory: Arc::new(ScreenLogFactory::default()),
            message_factory: Arc::new(DefaultMessageFactory),
            kind: AcceptorKind::SingleThreaded,
        }
    }

    /// Sets the application callback handler.
    #[must_use]
    pub fn with_application(mut self, application: Arc<dyn Application>) -> Self {
        self.application = application;
        self
    }

    /// Sets the message store factory.
    #[must_use]
    pub fn with_store_factory(mut self, factory: Arc<dyn MessageStoreFactory>) -> Self {
        self.store_factory = factory;
        self
    }

    /// Sets the log factory.
    #[must_use]
    pub fn with_log_factory(mut self, factory: Arc<dyn LogFactory>) -> Self {
        self.log_factory = factory;
        self
    }

    /// Sets the message factory.
    #[must_use]
    pub fn with_message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.message_factory = factory;
        self
    }

    /// Sets the threading model.
    #[must_use]
    pub const fn with_kind(mut self, kind: AcceptorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Selects the multi-threaded acceptor when `enabled`.
    #[must_use]
    pub const fn concurrent(self, enabled: bool) -> Self {
        self.with_kind(AcceptorKind::from_concurrent(enabled))
    }

    /// Returns the configured threading model.
    #[must_use]
    pub const fn kind(&self) -> AcceptorKind {
        self.kind
    }

    /// Returns the strategies bound to `settings`.
    #[must_use]
    pub fn parts(&self, settings: Arc<SessionSettings>) -> AcceptorParts {
        AcceptorParts::new(
            Arc::clone(&self.application),
            Arc::clone(&self.store_factory),
            settings,
            Arc::clone(&self.log_factory),
            Arc::clone(&self.message_factory),
        )
    }

    /// Builds the acceptor.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the settings do not describe a usable
    /// acceptor.
    pub fn build(&self, settings: Arc<SessionSettings>) -> Result<Arc<dyn Acceptor>, ConfigError> {
        new_acceptor(self.kind, self.parts(settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = "\
[DEFAULT]
ConnectionType=acceptor
SocketAcceptPort=0

[SESSION]
BeginString=FIX.4.4
SenderCompID=SERVER
TargetCompID=CLIENT
";

    #[test]
    fn test_builder_default() {
        let builder = AcceptorBuilder::new();
        assert_eq!(builder.kind(), AcceptorKind::SingleThreaded);
        let acceptor = builder
            .build(Arc::new(SessionSettings::parse(SETTINGS).unwrap()))
            .unwrap();
        assert_eq!(acceptor.kind(), AcceptorKind::SingleThreaded);
    }

    #[test]
    fn test_builder_concurrent() {
        let acceptor = AcceptorBuilder::new()
            .concurrent(true)
            .with_log_factory(Arc::new(ScreenLogFactory::new(false, false, true)))
            .build(Arc::new(SessionSettings::parse(SETTINGS).unwrap()))
            .unwrap();
        assert_eq!(acceptor.kind(), AcceptorKind::MultiThreaded);
        assert_eq!(acceptor.session_ids().len(), 1);
    }

    #[test]
    fn test_builder_propagates_settings_error() {
        let err = AcceptorBuilder::new()
            .build(Arc::new(SessionSettings::new()))
            .unwrap_err();
        assert_eq!(err, ConfigError::NoSessions("acceptor".to_string()));
    }
}
