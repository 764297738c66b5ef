/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Server assembly.
//!
//! [`assemble`] produces every role of a FIX acceptor server exactly once.
//! Each role is taken from [`ServerOverrides`] when supplied, otherwise the
//! stock implementation is built:
//!
//! | Role                  | Default                                   |
//! |-----------------------|-------------------------------------------|
//! | session settings      | first available settings source           |
//! | application           | [`ApplicationAdapter`]                    |
//! | message store factory | [`MemoryStoreFactory`]                    |
//! | log factory           | [`ScreenLogFactory`] logging everything   |
//! | message factory       | [`DefaultMessageFactory`]                 |
//! | acceptor              | single or multi-threaded, per properties  |
//! | connector manager     | [`ConnectorManager`] with auto-startup    |
//! | management name       | registration when `jmx-enabled`           |

use crate::error::{ConfigurationError, Result};
use crate::properties::ServerProperties;
use fixboot_engine::{
    Acceptor, AcceptorBuilder, Application, ApplicationAdapter, ConnectorManager,
    DefaultMessageFactory, Lifecycle, LogFactory, ManagementExporter, MessageFactory, ObjectName,
    ScreenLogFactory,
};
use fixboot_settings::{SessionSettings, SettingsLocator};
use fixboot_store::{MemoryStoreFactory, MessageStoreFactory};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// User-supplied replacements for the assembled roles.
#[derive(Default, Clone)]
pub struct ServerOverrides {
    /// Session settings to use instead of locating a settings file.
    pub session_settings: Option<Arc<SessionSettings>>,
    /// Application callbacks.
    pub application: Option<Arc<dyn Application>>,
    /// Message store strategy.
    pub message_store_factory: Option<Arc<dyn MessageStoreFactory>>,
    /// Log strategy.
    pub log_factory: Option<Arc<dyn LogFactory>>,
    /// Message construction strategy.
    pub message_factory: Option<Arc<dyn MessageFactory>>,
    /// A ready-made acceptor.
    pub acceptor: Option<Arc<dyn Acceptor>>,
    /// A ready-made connector manager.
    pub connector_manager: Option<Arc<ConnectorManager>>,
    /// A management registration made elsewhere; suppresses registration.
    pub management_name: Option<ObjectName>,
    /// Exporter to register with instead of the process-wide one.
    pub management_exporter: Option<Arc<ManagementExporter>>,
    /// Settings text used when no settings file is found.
    pub bundled_settings: Option<&'static str>,
}

impl ServerOverrides {
    /// Creates overrides that replace nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the session settings.
    #[must_use]
    pub fn with_session_settings(mut self, settings: SessionSettings) -> Self {
        self.session_settings = Some(Arc::new(settings));
        self
    }

    /// Replaces the application.
    #[must_use]
    pub fn with_application(mut self, application: Arc<dyn Application>) -> Self {
        self.application = Some(application);
        self
    }

    /// Replaces the message store factory.
    #[must_use]
    pub fn with_message_store_factory(mut self, factory: Arc<dyn MessageStoreFactory>) -> Self {
        self.message_store_factory = Some(factory);
        self
    }

    /// Replaces the log factory.
    #[must_use]
    pub fn with_log_factory(mut self, factory: Arc<dyn LogFactory>) -> Self {
        self.log_factory = Some(factory);
        self
    }

    /// Replaces the message factory.
    #[must_use]
    pub fn with_message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.message_factory = Some(factory);
        self
    }

    /// Replaces the acceptor.
    #[must_use]
    pub fn with_acceptor(mut self, acceptor: Arc<dyn Acceptor>) -> Self {
        self.acceptor = Some(acceptor);
        self
    }

    /// Replaces the connector manager.
    #[must_use]
    pub fn with_connector_manager(mut self, manager: Arc<ConnectorManager>) -> Self {
        self.connector_manager = Some(manager);
        self
    }

    /// Supplies an existing management registration.
    #[must_use]
    pub fn with_management_name(mut self, name: ObjectName) -> Self {
        self.management_name = Some(name);
        self
    }

    /// Registers with `exporter` instead of the process-wide exporter.
    #[must_use]
    pub fn with_management_exporter(mut self, exporter: Arc<ManagementExporter>) -> Self {
        self.management_exporter = Some(exporter);
        self
    }

    /// Supplies settings text used as the last resort.
    #[must_use]
    pub const fn with_bundled_settings(mut self, contents: &'static str) -> Self {
        self.bundled_settings = Some(contents);
        self
    }
}

impl fmt::Debug for ServerOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOverrides")
            .field("session_settings", &self.session_settings.is_some())
            .field("application", &self.application.is_some())
            .field("message_store_factory", &self.message_store_factory)
            .field("log_factory", &self.log_factory)
            .field("message_factory", &self.message_factory)
            .field("acceptor", &self.acceptor)
            .field("connector_manager", &self.connector_manager)
            .field("management_name", &self.management_name)
            .field("bundled_settings", &self.bundled_settings.is_some())
            .finish_non_exhaustive()
    }
}

/// An assembled acceptor server.
///
/// Dropping the server removes the management registration it made.
pub struct FixServer {
    properties: ServerProperties,
    session_settings: Arc<SessionSettings>,
    application: Arc<dyn Application>,
    message_store_factory: Arc<dyn MessageStoreFactory>,
    log_factory: Arc<dyn LogFactory>,
    message_factory: Arc<dyn MessageFactory>,
    acceptor: Arc<dyn Acceptor>,
    connector_manager: Arc<ConnectorManager>,
    management_name: Option<ObjectName>,
    registered_with: Option<Arc<ManagementExporter>>,
}

impl FixServer {
    /// Returns the properties the server was assembled from.
    #[must_use]
    pub fn properties(&self) -> &ServerProperties {
        &self.properties
    }

    /// Returns the session settings.
    #[must_use]
    pub fn session_settings(&self) -> &Arc<SessionSettings> {
        &self.session_settings
    }

    /// Returns the application callbacks.
    #[must_use]
    pub fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }

    /// Returns the message store factory.
    #[must_use]
    pub fn message_store_factory(&self) -> &Arc<dyn MessageStoreFactory> {
        &self.message_store_factory
    }

    /// Returns the log factory.
    #[must_use]
    pub fn log_factory(&self) -> &Arc<dyn LogFactory> {
        &self.log_factory
    }

    /// Returns the message factory.
    #[must_use]
    pub fn message_factory(&self) -> &Arc<dyn MessageFactory> {
        &self.message_factory
    }

    /// Returns the acceptor.
    #[must_use]
    pub fn acceptor(&self) -> &Arc<dyn Acceptor> {
        &self.acceptor
    }

    /// Returns the connector manager.
    #[must_use]
    pub fn connector_manager(&self) -> &Arc<ConnectorManager> {
        &self.connector_manager
    }

    /// Returns the management registration, if one was made or supplied.
    #[must_use]
    pub fn management_name(&self) -> Option<&ObjectName> {
        self.management_name.as_ref()
    }

    /// Starts the connector.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when a listener cannot be bound.
    pub fn start(&self) -> Result<()> {
        self.connector_manager.start().map_err(ConfigurationError::wrap)
    }

    /// Starts the connector when auto-startup is set. Returns true when the
    /// connector is running afterwards.
    ///
    /// # Errors
    /// See [`FixServer::start`].
    pub fn start_if_auto(&self) -> Result<bool> {
        if self.connector_manager.is_auto_startup() {
            self.start()?;
        } else {
            info!("auto-startup disabled, connector left stopped");
        }
        Ok(self.is_running())
    }

    /// Stops the connector.
    ///
    /// Blocks until the acceptor's worker thread has exited; async callers
    /// use [`FixServer::shutdown`].
    pub fn stop(&self) {
        self.connector_manager.stop();
    }

    /// Stops the connector on the blocking pool and releases the server.
    pub async fn shutdown(self) {
        let stopped = tokio::task::spawn_blocking(move || {
            self.stop();
            drop(self);
        })
        .await;
        if let Err(err) = stopped {
            warn!(%err, "connector shutdown task failed");
        }
    }

    /// Returns true while the connector runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.connector_manager.is_running()
    }
}

impl fmt::Debug for FixServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixServer")
            .field("properties", &self.properties)
            .field("sessions", &self.session_settings.session_count())
            .field("acceptor", &self.acceptor)
            .field("connector_manager", &self.connector_manager)
            .field("management_name", &self.management_name)
            .finish_non_exhaustive()
    }
}

impl Drop for FixServer {
    fn drop(&mut self) {
        let (Some(exporter), Some(name)) = (self.registered_with.take(), &self.management_name)
        else {
            return;
        };
        match exporter.unregister(name) {
            Ok(()) => debug!(%name, "management registration removed"),
            Err(err) => debug!(%err, "management registration already removed"),
        }
    }
}

/// Reports whether session settings can be found for `properties`.
///
/// A configured `config` location counts as available even when the file is
/// missing; [`assemble`] then falls through the remaining sources and fails
/// when none exists.
#[must_use]
pub fn server_config_available(properties: &ServerProperties, bundled: Option<&'static str>) -> bool {
    properties.config.is_some() || SettingsLocator::for_server(None, bundled).is_available()
}

/// Assembles a server from `properties`, preferring every role supplied in
/// `overrides`.
///
/// # Errors
/// Returns [`ConfigurationError`] carrying the original message when the
/// settings are missing or malformed, the acceptor cannot be built, or the
/// management registration fails.
pub fn assemble(properties: &ServerProperties, overrides: ServerOverrides) -> Result<FixServer> {
    let session_settings = match overrides.session_settings {
        Some(settings) => {
            debug!("using supplied session settings");
            settings
        }
        None => Arc::new(load_settings(properties, overrides.bundled_settings)?),
    };

    let application = overrides.application.unwrap_or_else(|| {
        debug!("using default application adapter");
        Arc::new(ApplicationAdapter)
    });
    let message_store_factory = overrides.message_store_factory.unwrap_or_else(|| {
        debug!("using in-memory message store factory");
        Arc::new(MemoryStoreFactory::new())
    });
    let log_factory = overrides.log_factory.unwrap_or_else(|| {
        debug!("using screen log factory");
        Arc::new(ScreenLogFactory::new(true, true, true))
    });
    let message_factory = overrides.message_factory.unwrap_or_else(|| {
        debug!("using default message factory");
        Arc::new(DefaultMessageFactory)
    });

    let acceptor = match overrides.acceptor {
        Some(acceptor) => {
            debug!(kind = %acceptor.kind(), "using supplied acceptor");
            acceptor
        }
        None => {
            let kind = properties.acceptor_kind();
            info!(%kind, sessions = session_settings.session_count(), "creating acceptor");
            AcceptorBuilder::new()
                .with_application(Arc::clone(&application))
                .with_store_factory(Arc::clone(&message_store_factory))
                .with_log_factory(Arc::clone(&log_factory))
                .with_message_factory(Arc::clone(&message_factory))
                .with_kind(kind)
                .build(Arc::clone(&session_settings))?
        }
    };

    let connector_manager = match overrides.connector_manager {
        Some(manager) => manager,
        None => Arc::new(
            ConnectorManager::new(Arc::clone(&acceptor))
                .with_auto_startup(properties.auto_startup)
                .with_phase(properties.phase),
        ),
    };

    let mut registered_with = None;
    let management_name = if !properties.jmx_enabled {
        debug!("management registration disabled");
        overrides.management_name
    } else if let Some(name) = overrides.management_name {
        debug!(%name, "using supplied management registration");
        Some(name)
    } else {
        let exporter = overrides
            .management_exporter
            .unwrap_or_else(ManagementExporter::platform);
        let name = exporter.register(Arc::clone(&acceptor))?;
        info!(%name, "acceptor registered for management");
        registered_with = Some(exporter);
        Some(name)
    };

    Ok(FixServer {
        properties: properties.clone(),
        session_settings,
        application,
        message_store_factory,
        log_factory,
        message_factory,
        acceptor,
        connector_manager,
        management_name,
        registered_with,
    })
}

fn load_settings(
    properties: &ServerProperties,
    bundled: Option<&'static str>,
) -> Result<SessionSettings> {
    let locator = SettingsLocator::for_server(properties.config.as_deref(), bundled);
    let settings = locator.load()?;
    Ok(settings)
}
