/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixboot Settings
//!
//! Session settings for the fixboot acceptor.
//!
//! This crate provides:
//! - **SessionSettings**: parser and typed lookups for the `.cfg` format
//!   (`[DEFAULT]` plus one `[SESSION]` section per counterparty)
//! - **SettingsLocator**: resolves which settings source to load, in order of
//!   precedence

pub mod locator;
pub mod settings;

pub use locator::{
    DEFAULT_SETTINGS_FILE, LocatedSettings, SYSTEM_VARIABLE, SYSTEM_VARIABLE_ENV, SettingsLocator,
    SettingsSource,
};
pub use settings::{SessionSettings, keys};
