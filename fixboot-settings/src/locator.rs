/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Settings source resolution.
//!
//! The acceptor's settings come from the first source that exists, in this
//! order:
//!
//! 1. the explicit path configured as `quickfixj.server.config`
//! 2. the path named by the system variable (`QUICKFIXJ_SERVER_CONFIG`)
//! 3. `./quickfixj-server.cfg`
//! 4. a `quickfixj-server.cfg` resource bundled into the binary
//!
//! A configured path that does not exist is skipped, not treated as an error.

use crate::settings::SessionSettings;
use fixboot_core::error::ConfigError;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the local settings file and of the bundled resource.
pub const DEFAULT_SETTINGS_FILE: &str = "quickfixj-server.cfg";

/// Property key naming the settings location.
pub const SYSTEM_VARIABLE: &str = "quickfixj.server.config";

/// Environment variable mirroring [`SYSTEM_VARIABLE`].
pub const SYSTEM_VARIABLE_ENV: &str = "QUICKFIXJ_SERVER_CONFIG";

/// A candidate settings source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Path given explicitly in the server properties.
    Path(PathBuf),
    /// Path read from a system variable; `value` is `None` when unset.
    SystemVariable {
        /// Variable name, for diagnostics.
        name: String,
        /// Path held by the variable.
        value: Option<String>,
    },
    /// Conventional file on disk.
    File(PathBuf),
    /// Settings text embedded in the binary.
    Bundled {
        /// Resource name, for diagnostics.
        name: String,
        /// Settings text.
        contents: Cow<'static, str>,
    },
}

impl SettingsSource {
    fn resolve(&self) -> Option<LocatedSettings> {
        match self {
            Self::Path(path) | Self::File(path) => {
                path.is_file().then(|| LocatedSettings::File(path.clone()))
            }
            Self::SystemVariable { value, .. } => value
                .as_deref()
                .map(PathBuf::from)
                .filter(|path| path.is_file())
                .map(LocatedSettings::File),
            Self::Bundled { name, contents } => Some(LocatedSettings::Bundled {
                name: name.clone(),
                contents: contents.clone(),
            }),
        }
    }
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path {}", path.display()),
            Self::SystemVariable { name, value } => match value {
                Some(value) => write!(f, "system variable {name}={value}"),
                None => write!(f, "system variable {name} (unset)"),
            },
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Bundled { name, .. } => write!(f, "bundled resource {name}"),
        }
    }
}

/// The source that was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedSettings {
    /// A file on disk.
    File(PathBuf),
    /// An embedded resource.
    Bundled {
        /// Resource name.
        name: String,
        /// Settings text.
        contents: Cow<'static, str>,
    },
}

impl LocatedSettings {
    /// Parses the located settings.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when reading or parsing fails.
    pub fn load(&self) -> Result<SessionSettings, ConfigError> {
        match self {
            Self::File(path) => SessionSettings::from_path(path),
            Self::Bundled { contents, .. } => SessionSettings::parse(contents),
        }
    }
}

impl fmt::Display for LocatedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Bundled { name, .. } => write!(f, "bundled:{name}"),
        }
    }
}

/// Ordered list of settings sources.
#[derive(Debug, Clone, Default)]
pub struct SettingsLocator {
    sources: Vec<SettingsSource>,
}

impl SettingsLocator {
    /// Creates a locator without sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the acceptor's standard locator rooted at the working
    /// directory, reading the system variable from the environment.
    #[must_use]
    pub fn for_server(explicit: Option<&Path>, bundled: Option<&'static str>) -> Self {
        Self::for_server_in(
            Path::new("."),
            explicit,
            std::env::var(SYSTEM_VARIABLE_ENV).ok(),
            bundled,
        )
    }

    /// Creates the acceptor's standard locator with the local file resolved
    /// against `base_dir` and an explicit system variable value.
    #[must_use]
    pub fn for_server_in(
        base_dir: &Path,
        explicit: Option<&Path>,
        system_variable: Option<String>,
        bundled: Option<&'static str>,
    ) -> Self {
        let mut locator = Self::new();
        if let Some(path) = explicit {
            locator = locator.with_source(SettingsSource::Path(path.to_path_buf()));
        }
        locator = locator
            .with_source(SettingsSource::SystemVariable {
                name: SYSTEM_VARIABLE.to_string(),
                value: system_variable,
            })
            .with_source(SettingsSource::File(base_dir.join(DEFAULT_SETTINGS_FILE)));
        if let Some(contents) = bundled {
            locator = locator.with_source(SettingsSource::Bundled {
                name: DEFAULT_SETTINGS_FILE.to_string(),
                contents: Cow::Borrowed(contents),
            });
        }
        locator
    }

    /// Appends a source with the lowest precedence so far.
    #[must_use]
    pub fn with_source(mut self, source: SettingsSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Returns the sources in precedence order.
    #[must_use]
    pub fn sources(&self) -> &[SettingsSource] {
        &self.sources
    }

    /// Returns the first source that exists.
    #[must_use]
    pub fn locate(&self) -> Option<LocatedSettings> {
        self.sources.iter().find_map(|source| {
            let located = source.resolve();
            if located.is_none() {
                debug!(%source, "settings source not available");
            }
            located
        })
    }

    /// Returns true when some source exists.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.locate().is_some()
    }

    /// Loads settings from the first existing source.
    ///
    /// # Errors
    /// Returns [`ConfigError::Settings`] when no source exists, or the
    /// error raised while reading or parsing the selected source.
    pub fn load(&self) -> Result<SessionSettings, ConfigError> {
        let Some(located) = self.locate() else {
            let tried: Vec<String> = self.sources.iter().map(ToString::to_string).collect();
            return Err(ConfigError::Settings(format!(
                "settings file not found, tried: {}",
                tried.join(", ")
            )));
        };
        info!(source = %located, "loading session settings");
        located.load()
    }
}
