/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Lifecycle management for connectors.
//!
//! [`ConnectorManager`] owns an [`Acceptor`] and exposes the start/stop
//! contract a host uses to bring components up in `phase` order.

use crate::acceptor::Acceptor;
use fixboot_core::error::ConfigError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Phase used when none is configured; runs last on start, first on stop.
pub const DEFAULT_PHASE: i32 = i32::MAX;

/// A component with an ordered start/stop lifecycle.
pub trait Lifecycle: Send + Sync + fmt::Debug {
    /// Starts the component.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the component cannot be started.
    fn start(&self) -> Result<(), ConfigError>;

    /// Stops the component.
    fn stop(&self);

    /// Stops the component, then runs `callback`.
    fn stop_with(&self, callback: Box<dyn FnOnce() + Send>) {
        self.stop();
        callback();
    }

    /// Returns true while started.
    fn is_running(&self) -> bool;

    /// Returns true when the host should start the component on its own.
    fn is_auto_startup(&self) -> bool {
        true
    }

    /// Ordering key; lower phases start first and stop last.
    fn phase(&self) -> i32 {
        DEFAULT_PHASE
    }
}

/// Starts and stops an acceptor on behalf of the host.
pub struct ConnectorManager {
    connector: Arc<dyn Acceptor>,
    auto_startup: bool,
    phase: i32,
    force_disconnect: bool,
}

impl ConnectorManager {
    /// Wraps `connector` with auto-startup enabled and the default phase.
    #[must_use]
    pub fn new(connector: Arc<dyn Acceptor>) -> Self {
        Self {
            connector,
            auto_startup: true,
            phase: DEFAULT_PHASE,
            force_disconnect: false,
        }
    }

    /// Sets whether the host starts the connector automatically.
    #[must_use]
    pub const fn with_auto_startup(mut self, auto_startup: bool) -> Self {
        self.auto_startup = auto_startup;
        self
    }

    /// Sets the lifecycle phase.
    #[must_use]
    pub const fn with_phase(mut self, phase: i32) -> Self {
        self.phase = phase;
        self
    }

    /// Drops sessions without a Logout on stop.
    #[must_use]
    pub const fn with_force_disconnect(mut self, force: bool) -> Self {
        self.force_disconnect = force;
        self
    }

    /// Returns the managed connector.
    #[must_use]
    pub fn connector(&self) -> &Arc<dyn Acceptor> {
        &self.connector
    }

    /// Returns true when stop drops sessions without a Logout.
    #[must_use]
    pub const fn is_force_disconnect(&self) -> bool {
        self.force_disconnect
    }
}

impl Lifecycle for ConnectorManager {
    fn start(&self) -> Result<(), ConfigError> {
        if self.connector.is_running() {
            debug!(kind = %self.connector.kind(), "connector already running");
            return Ok(());
        }
        info!(kind = %self.connector.kind(), phase = self.phase, "starting connector");
        self.connector.start()
    }

    fn stop(&self) {
        if !self.connector.is_running() {
            return;
        }
        info!(
            kind = %self.connector.kind(),
            force = self.force_disconnect,
            "stopping connector"
        );
        self.connector.stop(self.force_disconnect);
    }

    fn is_running(&self) -> bool {
        self.connector.is_running()
    }

    fn is_auto_startup(&self) -> bool {
        self.auto_startup
    }

    fn phase(&self) -> i32 {
        self.phase
    }
}

impl fmt::Debug for ConnectorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorManager")
            .field("connector", &self.connector)
            .field("auto_startup", &self.auto_startup)
            .field("phase", &self.phase)
            .field("force_disconnect", &self.force_disconnect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptor::AcceptorKind;
    use fixboot_core::session_id::SessionId;
    use parking_lot::Mutex;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FakeAcceptor {
        running: AtomicBool,
        starts: AtomicUsize,
        stops: Mutex<Vec<bool>>,
    }

    impl Acceptor for FakeAcceptor {
        fn start(&self) -> Result<(), ConfigError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self, force: bool) {
            self.stops.lock().push(force);
            self.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn session_ids(&self) -> Vec<SessionId> {
            Vec::new()
        }

        fn is_logged_on(&self, _session_id: &SessionId) -> bool {
            false
        }

        fn kind(&self) -> AcceptorKind {
            AcceptorKind::SingleThreaded
        }

        fn endpoints(&self) -> Vec<SocketAddr> {
            Vec::new()
        }
    }

    #[test]
    fn test_defaults() {
        let manager = ConnectorManager::new(Arc::new(FakeAcceptor::default()));
        assert!(manager.is_auto_startup());
        assert_eq!(manager.phase(), i32::MAX);
        assert!(!manager.is_force_disconnect());
        assert!(!manager.is_running());
    }

    #[test]
    fn test_start_is_idempotent() {
        let acceptor = Arc::new(FakeAcceptor::default());
        let manager = ConnectorManager::new(acceptor.clone());
        manager.start().unwrap();
        manager.start().unwrap();
        assert!(manager.is_running());
        assert_eq!(acceptor.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let acceptor = Arc::new(FakeAcceptor::default());
        let manager = ConnectorManager::new(acceptor.clone()).with_force_disconnect(true);
        manager.stop();
        assert!(acceptor.stops.lock().is_empty());

        manager.start().unwrap();
        manager.stop();
        assert_eq!(*acceptor.stops.lock(), vec![true]);
        assert!(!manager.is_running());
    }

    #[test]
    fn test_stop_with_runs_callback() {
        let manager = ConnectorManager::new(Arc::new(FakeAcceptor::default()))
            .with_auto_startup(false)
            .with_phase(10);
        assert!(!manager.is_auto_startup());
        assert_eq!(manager.phase(), 10);

        manager.start().unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        manager.stop_with(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(called.load(Ordering::SeqCst));
        assert!(!manager.is_running());
    }
}
