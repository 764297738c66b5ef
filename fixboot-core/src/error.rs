/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the fixboot crates.
//!
//! Each concern gets its own `thiserror` enum; [`FixError`] unifies them for
//! callers that do not care which layer failed.

use std::ops::Range;
use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for fixboot operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error in session layer handling.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading settings or constructing engine components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Settings source could not be parsed or resolved.
    #[error("{0}")]
    Settings(String),

    /// A session section lacks a required key.
    #[error("missing setting '{key}' in {section}")]
    MissingSetting {
        /// Session id or section name the key was looked up in.
        section: String,
        /// The missing key.
        key: String,
    },

    /// A key exists but its value cannot be used.
    #[error("invalid value '{value}' for setting '{key}' in {section}")]
    InvalidSetting {
        /// Session id or section name.
        section: String,
        /// The offending key.
        key: String,
        /// The raw value found.
        value: String,
    },

    /// No session is configured for the requested role.
    #[error("no sessions configured for {0}")]
    NoSessions(String),

    /// Listener could not be bound.
    #[error("unable to bind {addr}: {reason}")]
    Bind {
        /// Socket address that was requested.
        addr: String,
        /// Underlying failure.
        reason: String,
    },

    /// I/O failure while reading a settings source.
    #[error("settings i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors in session layer handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Inbound message does not match any configured session.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Message is structurally invalid.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// First message on a connection was not a Logon.
    #[error("expected logon, received msg type {0}")]
    NotLoggedOn(String),

    /// Logon was rejected by the application.
    #[error("logon rejected: {reason}")]
    LogonRejected {
        /// Reason for rejection.
        reason: String,
    },

    /// Connection level failure.
    #[error("connection error: {0}")]
    Connection(String),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Errors in message store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to store message.
    #[error("failed to store message seq={seq_num}: {reason}")]
    StoreFailed {
        /// Sequence number of the message.
        seq_num: u64,
        /// Reason for failure.
        reason: String,
    },

    /// Range of messages not available.
    #[error("messages not available for range: {range:?}")]
    RangeNotAvailable {
        /// The requested range of sequence numbers.
        range: Range<u64>,
    },

    /// I/O error in a persistent store.
    #[error("store i/o error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_setting_display() {
        let err = ConfigError::MissingSetting {
            section: "FIX.4.4:SERVER->CLIENT".to_string(),
            key: "SocketAcceptPort".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing setting 'SocketAcceptPort' in FIX.4.4:SERVER->CLIENT"
        );
    }

    #[test]
    fn test_settings_error_keeps_message() {
        let err = ConfigError::Settings("line 3: expected key=value".to_string());
        assert_eq!(err.to_string(), "line 3: expected key=value");
    }

    #[test]
    fn test_fix_error_from_config() {
        let fix_err: FixError = ConfigError::NoSessions("acceptor".to_string()).into();
        assert!(matches!(fix_err, FixError::Config(ConfigError::NoSessions(_))));
    }

    #[test]
    fn test_io_error_into_config_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io.into();
        assert_eq!(err, ConfigError::Io("gone".to_string()));
    }
}
