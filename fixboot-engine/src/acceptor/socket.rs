/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! TCP acceptors backed by a private tokio runtime.

use super::session::{self, MAX_HEART_BT_INT, SessionContext, Shared, StopSignal};
use super::{Acceptor, AcceptorKind, AcceptorParts};
use fixboot_core::error::ConfigError;
use fixboot_core::session_id::SessionId;
use fixboot_settings::keys;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use tokio::net::TcpListener;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const SUPPORTED_BEGIN_STRINGS: [&str; 6] = [
    "FIX.4.0", "FIX.4.1", "FIX.4.2", "FIX.4.3", "FIX.4.4", "FIXT.1.1",
];
const DEFAULT_HEART_BT_INT: u64 = 30;
const DEFAULT_ACCEPT_ADDRESS: &str = "0.0.0.0";

#[derive(Default)]
struct RunState {
    shutdown: Option<watch::Sender<Option<bool>>>,
    worker: Option<JoinHandle<()>>,
    endpoints: Vec<SocketAddr>,
}

/// Shared implementation behind both acceptor kinds.
struct AcceptorCore {
    kind: AcceptorKind,
    shared: Arc<Shared>,
    listeners: BTreeMap<SocketAddr, Vec<SessionId>>,
    state: Mutex<RunState>,
}

impl AcceptorCore {
    fn new(parts: AcceptorParts, kind: AcceptorKind) -> Result<Self, ConfigError> {
        let settings = &parts.settings;
        let mut sessions = BTreeMap::new();
        let mut listeners: BTreeMap<SocketAddr, Vec<SessionId>> = BTreeMap::new();

        for id in settings.session_ids() {
            let connection_type = settings.get_string(id, keys::CONNECTION_TYPE)?;
            if !connection_type.eq_ignore_ascii_case("acceptor") {
                debug!(session = %id, connection_type, "skipping non-acceptor session");
                continue;
            }
            if !SUPPORTED_BEGIN_STRINGS.contains(&id.begin_string.as_str()) {
                return Err(ConfigError::InvalidSetting {
                    section: id.to_string(),
                    key: keys::BEGIN_STRING.to_string(),
                    value: id.begin_string.clone(),
                });
            }

            let port: u16 = settings.get_parsed(id, keys::SOCKET_ACCEPT_PORT)?;
            let host = if settings.has(id, keys::SOCKET_ACCEPT_ADDRESS) {
                settings.get_string(id, keys::SOCKET_ACCEPT_ADDRESS)?
            } else {
                DEFAULT_ACCEPT_ADDRESS
            };
            let addr = resolve(id, host, port)?;

            let heartbeat_interval = if settings.has(id, keys::HEART_BT_INT) {
                settings.get_parsed(id, keys::HEART_BT_INT)?
            } else {
                DEFAULT_HEART_BT_INT
            };
            if heartbeat_interval > MAX_HEART_BT_INT {
                return Err(ConfigError::InvalidSetting {
                    section: id.to_string(),
                    key: keys::HEART_BT_INT.to_string(),
                    value: heartbeat_interval.to_string(),
                });
            }
            let reset_on_logon = settings.get_bool_or(id, keys::RESET_ON_LOGON, false)?;
            let validate_checksum = settings.get_bool_or(id, keys::VALIDATE_CHECKSUM, true)?;

            let context = SessionContext {
                id: id.clone(),
                store: parts.store_factory.create(id),
                log: parts.log_factory.create(id),
                heartbeat_interval,
                reset_on_logon,
                validate_checksum,
                logged_on: Default::default(),
            };
            sessions.insert(id.clone(), Arc::new(context));
            listeners.entry(addr).or_default().push(id.clone());
        }

        if sessions.is_empty() {
            return Err(ConfigError::NoSessions("acceptor".to_string()));
        }

        Ok(Self {
            kind,
            shared: Arc::new(Shared {
                application: parts.application,
                message_factory: parts.message_factory,
                sessions,
            }),
            listeners,
            state: Mutex::new(RunState::default()),
        })
    }

    fn runtime(&self) -> Result<Runtime, ConfigError> {
        let mut builder = match self.kind {
            AcceptorKind::SingleThreaded => Builder::new_current_thread(),
            AcceptorKind::MultiThreaded => {
                let mut builder = Builder::new_multi_thread();
                builder.thread_name("fixboot-acceptor-worker");
                builder
            }
        };
        builder
            .enable_all()
            .build()
            .map_err(|err| ConfigError::Settings(format!("unable to create runtime: {err}")))
    }

    fn start(&self) -> Result<(), ConfigError> {
        let mut state = self.state.lock();
        if state.shutdown.is_some() {
            return Ok(());
        }

        let mut bound = Vec::with_capacity(self.listeners.len());
        for (addr, ids) in &self.listeners {
            let listener = std::net::TcpListener::bind(addr).map_err(|err| ConfigError::Bind {
                addr: addr.to_string(),
                reason: err.to_string(),
            })?;
            listener.set_nonblocking(true)?;
            let local = listener.local_addr()?;
            bound.push((listener, local, Arc::<[SessionId]>::from(ids.clone())));
        }

        let runtime = self.runtime()?;
        let (tx, rx) = watch::channel(None);
        let endpoints: Vec<SocketAddr> = bound.iter().map(|(_, addr, _)| *addr).collect();
        let shared = Arc::clone(&self.shared);
        let kind = self.kind;

        let worker = thread::Builder::new()
            .name(format!("fixboot-acceptor-{kind}"))
            .spawn(move || runtime.block_on(serve(bound, shared, rx)))?;

        info!(%kind, endpoints = ?endpoints, "acceptor started");
        state.shutdown = Some(tx);
        state.worker = Some(worker);
        state.endpoints = endpoints;
        Ok(())
    }

    fn stop(&self, force: bool) {
        let (shutdown, worker) = {
            let mut state = self.state.lock();
            state.endpoints.clear();
            (state.shutdown.take(), state.worker.take())
        };
        let Some(shutdown) = shutdown else {
            return;
        };
        // Receivers are gone once the worker has already exited.
        let _ = shutdown.send(Some(force));
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            warn!(kind = %self.kind, "acceptor worker panicked");
        }
        info!(kind = %self.kind, force, "acceptor stopped");
    }

    fn is_running(&self) -> bool {
        self.state.lock().shutdown.is_some()
    }

    fn session_ids(&self) -> Vec<SessionId> {
        self.shared.sessions.keys().cloned().collect()
    }

    fn is_logged_on(&self, session_id: &SessionId) -> bool {
        self.shared
            .sessions
            .get(session_id)
            .is_some_and(|ctx| ctx.logged_on.load(Ordering::SeqCst))
    }

    fn endpoints(&self) -> Vec<SocketAddr> {
        self.state.lock().endpoints.clone()
    }
}

impl Drop for AcceptorCore {
    fn drop(&mut self) {
        self.stop(true);
    }
}

impl fmt::Debug for AcceptorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptorCore")
            .field("kind", &self.kind)
            .field("sessions", &self.shared.sessions.len())
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn resolve(id: &SessionId, host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConfigError::InvalidSetting {
            section: id.to_string(),
            key: keys::SOCKET_ACCEPT_ADDRESS.to_string(),
            value: host.to_string(),
        })
}

async fn serve(
    bound: Vec<(std::net::TcpListener, SocketAddr, Arc<[SessionId]>)>,
    shared: Arc<Shared>,
    stop: StopSignal,
) {
    for id in shared.sessions.keys() {
        shared.application.on_create(id).await;
    }

    let mut accept_loops = JoinSet::new();
    for (listener, addr, ids) in bound {
        match TcpListener::from_std(listener) {
            Ok(listener) => {
                accept_loops.spawn(accept_loop(
                    listener,
                    addr,
                    ids,
                    Arc::clone(&shared),
                    stop.clone(),
                ));
            }
            Err(err) => warn!(%addr, %err, "unable to register listener"),
        }
    }
    while accept_loops.join_next().await.is_some() {}
}

async fn accept_loop(
    listener: TcpListener,
    addr: SocketAddr,
    ids: Arc<[SessionId]>,
    shared: Arc<Shared>,
    mut stop: StopSignal,
) {
    let mut connections = JoinSet::new();
    debug!(%addr, sessions = ids.len(), "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%addr, %peer, "accepted connection");
                    if let Err(err) = stream.set_nodelay(true) {
                        debug!(%peer, %err, "unable to set TCP_NODELAY");
                    }
                    connections.spawn(session::serve_connection(
                        stream,
                        peer,
                        Arc::clone(&ids),
                        Arc::clone(&shared),
                        stop.clone(),
                    ));
                }
                Err(err) => warn!(%addr, %err, "accept failed"),
            },
            _ = stop.changed() => break,
        }
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    while connections.join_next().await.is_some() {}
    debug!(%addr, "listener closed");
}

/// Acceptor serving every session on one thread.
#[derive(Debug)]
pub struct SocketAcceptor {
    core: AcceptorCore,
}

impl SocketAcceptor {
    /// Validates the settings and prepares the listeners.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a session section is incomplete or no
    /// acceptor session is configured.
    pub fn new(parts: AcceptorParts) -> Result<Self, ConfigError> {
        Ok(Self {
            core: AcceptorCore::new(parts, AcceptorKind::SingleThreaded)?,
        })
    }
}

/// Acceptor serving connections on a thread pool.
#[derive(Debug)]
pub struct ThreadedSocketAcceptor {
    core: AcceptorCore,
}

impl ThreadedSocketAcceptor {
    /// Validates the settings and prepares the listeners.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a session section is incomplete or no
    /// acceptor session is configured.
    pub fn new(parts: AcceptorParts) -> Result<Self, ConfigError> {
        Ok(Self {
            core: AcceptorCore::new(parts, AcceptorKind::MultiThreaded)?,
        })
    }
}

macro_rules! delegate_acceptor {
    ($ty:ty) => {
        impl Acceptor for $ty {
            fn start(&self) -> Result<(), ConfigError> {
                self.core.start()
            }

            fn stop(&self, force: bool) {
                self.core.stop(force);
            }

            fn is_running(&self) -> bool {
                self.core.is_running()
            }

            fn session_ids(&self) -> Vec<SessionId> {
                self.core.session_ids()
            }

            fn is_logged_on(&self, session_id: &SessionId) -> bool {
                self.core.is_logged_on(session_id)
            }

            fn kind(&self) -> AcceptorKind {
                self.core.kind
            }

            fn endpoints(&self) -> Vec<SocketAddr> {
                self.core.endpoints()
            }
        }
    };
}

delegate_acceptor!(SocketAcceptor);
delegate_acceptor!(ThreadedSocketAcceptor);
