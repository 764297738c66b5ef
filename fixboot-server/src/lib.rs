/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixboot Server
//!
//! Assembles a FIX acceptor server from TOML properties and a session
//! settings file.
//!
//! This crate provides:
//! - **ServerProperties**: the `[quickfixj.server]` properties table
//! - **ServerOverrides**: user replacements for any assembled role
//! - **assemble**: builds the settings, strategies, acceptor, connector
//!   manager and management registration
//! - **ConfigurationError**: the single failure type of assembly
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fixboot_server::{ServerOverrides, ServerProperties, assemble};
//!
//! let properties = ServerProperties::load_or_default("fixboot.toml")?;
//! let server = assemble(&properties, ServerOverrides::new())?;
//! server.start_if_auto()?;
//! ```

pub mod assembly;
pub mod error;
pub mod properties;

pub use assembly::{FixServer, ServerOverrides, assemble, server_config_available};
pub use error::{ConfigurationError, Result};
pub use properties::{ConcurrentProperties, ServerProperties};
