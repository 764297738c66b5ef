/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-process management registry.
//!
//! Registered acceptors are exposed under an [`ObjectName`] of the form
//! `domain:key=value,...` and can be inspected through [`ConnectorSnapshot`].

use crate::acceptor::{Acceptor, AcceptorKind};
use fixboot_core::session_id::SessionId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info};

/// Domain used by the process-wide exporter.
pub const DEFAULT_DOMAIN: &str = "org.fixboot";

/// Errors raised by the management registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManagementError {
    /// The name or the connector is already registered.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// Nothing is registered under the name.
    #[error("not registered: {0}")]
    NotRegistered(String),

    /// The name is not of the form `domain:key=value[,key=value...]`.
    #[error("invalid object name: {0}")]
    InvalidName(String),
}

/// Name of a managed object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Creates a name with no key properties.
    ///
    /// # Errors
    /// Returns [`ManagementError::InvalidName`] when the domain is empty or
    /// contains `:`.
    pub fn new(domain: impl Into<String>) -> Result<Self, ManagementError> {
        let domain = domain.into();
        if domain.is_empty() || domain.contains(':') {
            return Err(ManagementError::InvalidName(domain));
        }
        Ok(Self {
            domain,
            properties: Vec::new(),
        })
    }

    /// Appends a key property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the value of a key property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectName {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ManagementError::InvalidName(s.to_string());
        let (domain, props) = s.split_once(':').ok_or_else(invalid)?;
        let mut name = Self::new(domain).map_err(|_| invalid())?;
        for pair in props.split(',') {
            let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
            if key.is_empty() || value.is_empty() {
                return Err(invalid());
            }
            name = name.with_property(key, value);
        }
        Ok(name)
    }
}

/// Point-in-time view of a registered connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSnapshot {
    /// Threading model.
    pub kind: AcceptorKind,
    /// Whether the connector is started.
    pub running: bool,
    /// Configured sessions.
    pub sessions: Vec<SessionId>,
    /// Sessions with a logged on connection.
    pub logged_on: Vec<SessionId>,
    /// Bound listener addresses.
    pub endpoints: Vec<SocketAddr>,
}

impl ConnectorSnapshot {
    fn capture(acceptor: &dyn Acceptor) -> Self {
        let sessions = acceptor.session_ids();
        let logged_on = sessions
            .iter()
            .filter(|id| acceptor.is_logged_on(id))
            .cloned()
            .collect();
        Self {
            kind: acceptor.kind(),
            running: acceptor.is_running(),
            sessions,
            logged_on,
            endpoints: acceptor.endpoints(),
        }
    }
}

/// Registry of managed connectors.
#[derive(Debug)]
pub struct ManagementExporter {
    domain: String,
    next_id: AtomicU64,
    registered: RwLock<BTreeMap<ObjectName, Arc<dyn Acceptor>>>,
}

impl ManagementExporter {
    /// Creates an empty exporter naming objects under `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            next_id: AtomicU64::new(1),
            registered: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the process-wide exporter.
    #[must_use]
    pub fn platform() -> Arc<Self> {
        static PLATFORM: OnceLock<Arc<ManagementExporter>> = OnceLock::new();
        Arc::clone(PLATFORM.get_or_init(|| Arc::new(Self::new(DEFAULT_DOMAIN))))
    }

    /// Returns the naming domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Registers an acceptor under a generated name.
    ///
    /// # Errors
    /// Returns [`ManagementError::AlreadyRegistered`] when the same acceptor
    /// instance is registered already.
    pub fn register(&self, acceptor: Arc<dyn Acceptor>) -> Result<ObjectName, ManagementError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = ObjectName::new(self.domain.as_str())?
            .with_property("type", "Connector")
            .with_property("role", "Acceptor")
            .with_property("id", id.to_string());
        self.register_as(name, acceptor)
    }

    /// Registers an acceptor under an explicit name.
    ///
    /// # Errors
    /// Returns [`ManagementError::AlreadyRegistered`] when the name or the
    /// acceptor instance is taken.
    pub fn register_as(
        &self,
        name: ObjectName,
        acceptor: Arc<dyn Acceptor>,
    ) -> Result<ObjectName, ManagementError> {
        let mut registered = self.registered.write();
        if registered.contains_key(&name) {
            return Err(ManagementError::AlreadyRegistered(name.to_string()));
        }
        if let Some((existing, _)) = registered
            .iter()
            .find(|(_, other)| Arc::ptr_eq(other, &acceptor))
        {
            return Err(ManagementError::AlreadyRegistered(existing.to_string()));
        }
        info!(name = %name, kind = %acceptor.kind(), "registered connector for management");
        registered.insert(name.clone(), acceptor);
        Ok(name)
    }

    /// Returns a snapshot of the connector registered under `name`.
    #[must_use]
    pub fn lookup(&self, name: &ObjectName) -> Option<ConnectorSnapshot> {
        self.registered
            .read()
            .get(name)
            .map(|acceptor| ConnectorSnapshot::capture(acceptor.as_ref()))
    }

    /// Removes a registration.
    ///
    /// # Errors
    /// Returns [`ManagementError::NotRegistered`] when nothing is registered
    /// under `name`.
    pub fn unregister(&self, name: &ObjectName) -> Result<(), ManagementError> {
        match self.registered.write().remove(name) {
            Some(_) => {
                debug!(name = %name, "unregistered connector");
                Ok(())
            }
            None => Err(ManagementError::NotRegistered(name.to_string())),
        }
    }

    /// Returns every registered name.
    #[must_use]
    pub fn registered(&self) -> Vec<ObjectName> {
        self.registered.read().keys().cloned().collect()
    }
}

impl Default for ManagementExporter {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN)
    }
}
