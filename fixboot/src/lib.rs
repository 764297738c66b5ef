/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixboot
//!
//! Property-driven assembly of FIX acceptor servers.
//!
//! fixboot reads a small TOML properties table and a session settings file,
//! then wires a FIX acceptor together from pluggable strategies: application
//! callbacks, message store, log and message factories. Any strategy can be
//! replaced before assembly; everything not replaced gets a stock default.
//!
//! ## Features
//!
//! - **Settings discovery**: explicit path, system variable, working
//!   directory file, then bundled text
//! - **Threading choice**: single-threaded or multi-threaded acceptor from
//!   one boolean property
//! - **Lifecycle**: auto-startup and ordering phase for the connector
//! - **Management**: optional registration of the running acceptor
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fixboot::prelude::*;
//!
//! let properties = ServerProperties::from_toml_str(r#"
//!     [quickfixj.server]
//!     config = "quickfixj-server.cfg"
//!
//!     [quickfixj.server.concurrent]
//!     enabled = true
//! "#)?;
//! let server = assemble(&properties, ServerOverrides::new())?;
//! server.start_if_auto()?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Session ids, messages, framing codec and error types
//! - [`settings`]: Session settings parsing and discovery
//! - [`store`]: Message store strategies
//! - [`engine`]: Acceptors, strategies, lifecycle and management
//! - [`server`]: Property binding and server assembly

pub mod core {
    //! Session ids, messages, framing codec and error types.
    pub use fixboot_core::*;
}

pub mod settings {
    //! Session settings parsing and discovery.
    pub use fixboot_settings::*;
}

pub mod store {
    //! Message store strategies.
    pub use fixboot_store::*;
}

pub mod engine {
    //! Acceptors, strategies, lifecycle and management.
    pub use fixboot_engine::*;
}

pub mod server {
    //! Property binding and server assembly.
    pub use fixboot_server::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fixboot_core::{ConfigError, FixCodec, FixError, Message, MsgType, SessionId, tags};

    // Settings
    pub use fixboot_settings::{SessionSettings, SettingsLocator};

    // Store
    pub use fixboot_store::{MemoryStoreFactory, MessageStore, MessageStoreFactory};

    // Engine
    pub use fixboot_engine::{
        Acceptor, AcceptorBuilder, AcceptorKind, Application, ApplicationAdapter,
        ConnectorManager, DefaultMessageFactory, Lifecycle, LogFactory, ManagementExporter,
        MessageFactory, RejectReason, ScreenLogFactory,
    };

    // Server
    pub use fixboot_server::{
        ConfigurationError, FixServer, ServerOverrides, ServerProperties, assemble,
        server_config_available,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let id = SessionId::new("FIX.4.4", "SERVER", "CLIENT");
        assert_eq!(id.reversed().sender_comp_id, "CLIENT");
        assert_eq!(
            ServerProperties::default().acceptor_kind(),
            AcceptorKind::SingleThreaded
        );
    }

    #[test]
    fn test_assemble_through_prelude() {
        let settings = SessionSettings::parse(
            "[DEFAULT]\nConnectionType=acceptor\nSocketAcceptPort=0\n\
             [SESSION]\nBeginString=FIX.4.4\nSenderCompID=SERVER\nTargetCompID=CLIENT\n",
        )
        .unwrap();
        let server = assemble(
            &ServerProperties::default().with_concurrent(true),
            ServerOverrides::new().with_session_settings(settings),
        )
        .unwrap();
        assert_eq!(server.acceptor().kind(), AcceptorKind::MultiThreaded);
    }
}
