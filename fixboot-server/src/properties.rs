/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Server properties read from the `[quickfixj.server]` TOML table.
//!
//! ```toml
//! [quickfixj.server]
//! config = "conf/quickfixj-server.cfg"
//! auto-startup = true
//! phase = 100
//! jmx-enabled = false
//!
//! [quickfixj.server.concurrent]
//! enabled = true
//! ```

use crate::error::{ConfigurationError, Result};
use fixboot_engine::{AcceptorKind, DEFAULT_PHASE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Threading switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConcurrentProperties {
    /// Serve connections on a thread pool.
    pub enabled: bool,
}

/// Properties controlling server assembly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerProperties {
    /// Session settings location; searched for when absent.
    pub config: Option<PathBuf>,
    /// Start the connector as soon as the server is assembled.
    pub auto_startup: bool,
    /// Lifecycle phase of the connector.
    pub phase: i32,
    /// Register the acceptor with the management exporter.
    pub jmx_enabled: bool,
    /// Threading switch.
    pub concurrent: ConcurrentProperties,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            config: None,
            auto_startup: true,
            phase: DEFAULT_PHASE,
            jmx_enabled: false,
            concurrent: ConcurrentProperties::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    quickfixj: QuickfixjTable,
}

#[derive(Debug, Default, Deserialize)]
struct QuickfixjTable {
    #[serde(default)]
    server: ServerProperties,
}

impl ServerProperties {
    /// Parses properties from TOML text. Keys outside `[quickfixj.server]`
    /// are ignored.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when the text is not valid TOML or a
    /// server key has the wrong type or an unknown name.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let document: Document = toml::from_str(text)?;
        Ok(document.quickfixj.server)
    }

    /// Reads properties from a TOML file.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ConfigurationError::new(format!("unable to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reads properties from `path`, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when the file exists but cannot be read
    /// or parsed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "properties file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Sets the session settings location.
    #[must_use]
    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// Sets the threading switch.
    #[must_use]
    pub const fn with_concurrent(mut self, enabled: bool) -> Self {
        self.concurrent.enabled = enabled;
        self
    }

    /// Sets auto-startup.
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

    /// Sets management registration.
    #[must_use]
    pub const fn with_jmx_enabled(mut self, enabled: bool) -> Self {
        self.jmx_enabled = enabled;
        self
    }

    /// Returns the acceptor kind selected by the threading switch.
    #[must_use]
    pub const fn acceptor_kind(&self) -> AcceptorKind {
        AcceptorKind::from_concurrent(self.concurrent.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let props = ServerProperties::default();
        assert_eq!(props.config, None);
        assert!(props.auto_startup);
        assert_eq!(props.phase, i32::MAX);
        assert!(!props.jmx_enabled);
        assert!(!props.concurrent.enabled);
        assert_eq!(props.acceptor_kind(), AcceptorKind::SingleThreaded);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(ServerProperties::from_toml_str("").unwrap(), ServerProperties::default());
        assert_eq!(
            ServerProperties::from_toml_str("[other]\nkey = 1\n").unwrap(),
            ServerProperties::default()
        );
    }

    #[test]
    fn test_full_document() {
        let props = ServerProperties::from_toml_str(
            r#"
[quickfixj.server]
config = "conf/server.cfg"
auto-startup = false
phase = 5
jmx-enabled = true

[quickfixj.server.concurrent]
enabled = true
"#,
        )
        .unwrap();
        assert_eq!(props.config, Some(PathBuf::from("conf/server.cfg")));
        assert!(!props.auto_startup);
        assert_eq!(props.phase, 5);
        assert!(props.jmx_enabled);
        assert_eq!(props.acceptor_kind(), AcceptorKind::MultiThreaded);
    }

    #[test]
    fn test_rejects_wrong_type_and_unknown_key() {
        assert!(ServerProperties::from_toml_str("[quickfixj.server]\nphase = \"high\"\n").is_err());
        let err =
            ServerProperties::from_toml_str("[quickfixj.server]\njmx_enabled = true\n").unwrap_err();
        assert!(err.message().contains("jmx_enabled"));
    }

    #[test]
    fn test_load_and_load_or_default() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[quickfixj.server.concurrent]\nenabled = true").unwrap();
        let props = ServerProperties::load(file.path()).unwrap();
        assert!(props.concurrent.enabled);

        let missing = file.path().with_extension("absent");
        assert!(ServerProperties::load(&missing).is_err());
        assert_eq!(
            ServerProperties::load_or_default(&missing).unwrap(),
            ServerProperties::default()
        );
    }

    #[test]
    fn test_builders() {
        let props = ServerProperties::default()
            .with_config("a.cfg")
            .with_concurrent(true)
            .with_auto_startup(false)
            .with_phase(-1)
            .with_jmx_enabled(true);
        assert_eq!(props.config, Some(PathBuf::from("a.cfg")));
        assert!(props.concurrent.enabled && props.jmx_enabled && !props.auto_startup);
        assert_eq!(props.phase, -1);
    }
}
