/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The single error type raised while assembling a server.
//!
//! Every failure from the lower crates is wrapped with its message kept
//! verbatim, so the host sees the original cause text.

use fixboot_core::error::ConfigError;
use fixboot_engine::ManagementError;
use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias using [`ConfigurationError`].
pub type Result<T> = std::result::Result<T, ConfigurationError>;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Configuration or initialization failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl ConfigurationError {
    /// Creates an error without an underlying cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `source`, keeping its message.
    #[must_use]
    pub fn wrap<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the wrapped cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl From<ConfigError> for ConfigurationError {
    fn from(err: ConfigError) -> Self {
        Self::wrap(err)
    }
}

impl From<ManagementError> for ConfigurationError {
    fn from(err: ManagementError) -> Self {
        Self::wrap(err)
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(err: toml::de::Error) -> Self {
        Self::wrap(err)
    }
}

impl From<std::io::Error> for ConfigurationError {
    fn from(err: std::io::Error) -> Self {
        Self::wrap(err)
    }
}
