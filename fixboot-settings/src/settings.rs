/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session settings.
//!
//! Settings are read from the line based `.cfg` format:
//!
//! ```text
//! [DEFAULT]
//! ConnectionType=acceptor
//! SocketAcceptPort=9876
//!
//! [SESSION]
//! BeginString=FIX.4.4
//! SenderCompID=SERVER
//! TargetCompID=CLIENT
//! ```
//!
//! Every `[SESSION]` section inherits the `[DEFAULT]` values and may override
//! them. `${name}` placeholders in values are expanded from a variable map.

use fixboot_core::error::ConfigError;
use fixboot_core::session_id::SessionId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Well known setting keys.
pub mod keys {
    /// FIX version of the session.
    pub const BEGIN_STRING: &str = "BeginString";
    /// Local CompID.
    pub const SENDER_COMP_ID: &str = "SenderCompID";
    /// Counterparty CompID.
    pub const TARGET_COMP_ID: &str = "TargetCompID";
    /// Optional qualifier.
    pub const SESSION_QUALIFIER: &str = "SessionQualifier";
    /// `acceptor` or `initiator`.
    pub const CONNECTION_TYPE: &str = "ConnectionType";
    /// Port the acceptor listens on.
    pub const SOCKET_ACCEPT_PORT: &str = "SocketAcceptPort";
    /// Local address the acceptor binds.
    pub const SOCKET_ACCEPT_ADDRESS: &str = "SocketAcceptAddress";
    /// Heartbeat interval in seconds.
    pub const HEART_BT_INT: &str = "HeartBtInt";
    /// Reset sequence numbers when a Logon is received.
    pub const RESET_ON_LOGON: &str = "ResetOnLogon";
    /// Validate the CheckSum of inbound messages.
    pub const VALIDATE_CHECKSUM: &str = "ValidateChecksum";
}

type Section = BTreeMap<String, String>;

/// Parsed session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Values of the `[DEFAULT]` section.
    defaults: Section,
    /// Values declared in each `[SESSION]` section (without inherited defaults).
    sessions: BTreeMap<SessionId, Section>,
}

impl SessionSettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a settings file, expanding placeholders from the
    /// process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read, or a parse
    /// error as described in [`SessionSettings::parse_with_variables`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::parse(&text)
    }

    /// Parses settings text, expanding placeholders from the process
    /// environment.
    ///
    /// # Errors
    /// See [`SessionSettings::parse_with_variables`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let variables: HashMap<String, String> = std::env::vars().collect();
        Self::parse_with_variables(text, &variables)
    }

    /// Parses settings text, expanding `${name}` placeholders from
    /// `variables`. Unknown placeholders are kept verbatim.
    ///
    /// # Errors
    /// Returns [`ConfigError::Settings`] for syntax errors (with the line
    /// number), unknown section names, values outside any section and
    /// duplicate sessions; [`ConfigError::MissingSetting`] when a session
    /// cannot be identified.
    pub fn parse_with_variables(
        text: &str,
        variables: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        enum Current {
            None,
            Default,
            Session(usize),
        }

        let mut defaults = Section::new();
        let mut raw_sessions: Vec<(usize, Section)> = Vec::new();
        let mut current = Current::None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = match name.trim().to_ascii_uppercase().as_str() {
                    "DEFAULT" => Current::Default,
                    "SESSION" => {
                        raw_sessions.push((line_no, Section::new()));
                        Current::Session(raw_sessions.len() - 1)
                    }
                    other => {
                        return Err(ConfigError::Settings(format!(
                            "line {line_no}: unknown section [{other}]"
                        )));
                    }
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Settings(format!(
                    "line {line_no}: expected key=value, found '{line}'"
                )));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Settings(format!(
                    "line {line_no}: empty key"
                )));
            }
            let value = expand_variables(value.trim(), variables);

            let section = match current {
                Current::Default => &mut defaults,
                Current::Session(i) => &mut raw_sessions[i].1,
                Current::None => {
                    return Err(ConfigError::Settings(format!(
                        "line {line_no}: '{key}' appears before any section"
                    )));
                }
            };
            section.insert(key.to_string(), value);
        }

        let mut settings = Self {
            defaults,
            sessions: BTreeMap::new(),
        };
        for (line_no, section) in raw_sessions {
            let session_id = settings.identify(&section, line_no)?;
            if settings.sessions.contains_key(&session_id) {
                return Err(ConfigError::Settings(format!(
                    "line {line_no}: duplicate session {session_id}"
                )));
            }
            settings.sessions.insert(session_id, section);
        }
        Ok(settings)
    }

    fn identify(&self, section: &Section, line_no: usize) -> Result<SessionId, ConfigError> {
        let lookup = |key: &str| -> Result<String, ConfigError> {
            section
                .get(key)
                .or_else(|| self.defaults.get(key))
                .cloned()
                .ok_or_else(|| ConfigError::MissingSetting {
                    section: format!("[SESSION] at line {line_no}"),
                    key: key.to_string(),
                })
        };
        let mut session_id = SessionId::new(
            lookup(keys::BEGIN_STRING)?,
            lookup(keys::SENDER_COMP_ID)?,
            lookup(keys::TARGET_COMP_ID)?,
        );
        if let Some(qualifier) = section
            .get(keys::SESSION_QUALIFIER)
            .filter(|q| !q.is_empty())
        {
            session_id = session_id.with_qualifier(qualifier.clone());
        }
        Ok(session_id)
    }

    /// Returns the configured session ids in sorted order.
    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// Returns the number of configured sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when `key` resolves for the session (directly or through
    /// `[DEFAULT]`).
    #[must_use]
    pub fn has(&self, session_id: &SessionId, key: &str) -> bool {
        self.lookup(session_id, key).is_some()
    }

    /// Returns the `[DEFAULT]` value for `key`.
    #[must_use]
    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.defaults.get(key).map(String::as_str)
    }

    /// Returns the value of `key` for the session.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingSetting`] when neither the session nor
    /// `[DEFAULT]` defines it.
    pub fn get_string(&self, session_id: &SessionId, key: &str) -> Result<&str, ConfigError> {
        self.lookup(session_id, key)
            .ok_or_else(|| ConfigError::MissingSetting {
                section: session_id.to_string(),
                key: key.to_string(),
            })
    }

    /// Returns the value of `key` parsed as `T`.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingSetting`] or
    /// [`ConfigError::InvalidSetting`].
    pub fn get_parsed<T: FromStr>(
        &self,
        session_id: &SessionId,
        key: &str,
    ) -> Result<T, ConfigError> {
        let value = self.get_string(session_id, key)?;
        value.parse().map_err(|_| ConfigError::InvalidSetting {
            section: session_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Returns the value of `key` as an integer.
    ///
    /// # Errors
    /// See [`SessionSettings::get_parsed`].
    pub fn get_long(&self, session_id: &SessionId, key: &str) -> Result<i64, ConfigError> {
        self.get_parsed(session_id, key)
    }

    /// Returns the value of `key` as a boolean. Accepts `Y`/`N` as well as
    /// `true`/`false`, case-insensitively.
    ///
    /// # Errors
    /// See [`SessionSettings::get_parsed`].
    pub fn get_bool(&self, session_id: &SessionId, key: &str) -> Result<bool, ConfigError> {
        let value = self.get_string(session_id, key)?;
        match value.to_ascii_uppercase().as_str() {
            "Y" | "YES" | "TRUE" => Ok(true),
            "N" | "NO" | "FALSE" => Ok(false),
            _ => Err(ConfigError::InvalidSetting {
                section: session_id.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Returns the boolean value of `key`, or `default` when it is absent.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSetting`] when present but not boolean.
    pub fn get_bool_or(
        &self,
        session_id: &SessionId,
        key: &str,
        default: bool,
    ) -> Result<bool, ConfigError> {
        if self.has(session_id, key) {
            self.get_bool(session_id, key)
        } else {
            Ok(default)
        }
    }

    /// Sets a `[DEFAULT]` value.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.defaults.insert(key.into(), value.into());
    }

    /// Sets a session value, creating the session when needed.
    pub fn set_session(
        &mut self,
        session_id: &SessionId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.sessions
            .entry(session_id.clone())
            .or_default()
            .insert(key.into(), value.into());
    }

    fn lookup(&self, session_id: &SessionId, key: &str) -> Option<&str> {
        self.sessions
            .get(session_id)
            .and_then(|section| section.get(key))
            .or_else(|| self.defaults.get(key))
            .map(String::as_str)
    }
}

impl fmt::Display for SessionSettings {
    /// Writes the settings back in `.cfg` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[DEFAULT]")?;
        for (key, value) in &self.defaults {
            writeln!(f, "{key}={value}")?;
        }
        for (session_id, section) in &self.sessions {
            writeln!(f)?;
            writeln!(f, "[SESSION]")?;
            writeln!(f, "{}={}", keys::BEGIN_STRING, session_id.begin_string)?;
            writeln!(f, "{}={}", keys::SENDER_COMP_ID, session_id.sender_comp_id)?;
            writeln!(f, "{}={}", keys::TARGET_COMP_ID, session_id.target_comp_id)?;
            for (key, value) in section {
                if !matches!(
                    key.as_str(),
                    keys::BEGIN_STRING | keys::SENDER_COMP_ID | keys::TARGET_COMP_ID
                ) {
                    writeln!(f, "{key}={value}")?;
                }
            }
        }
        Ok(())
    }
}

fn expand_variables(value: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match variables.get(name) {
                    Some(replacement) => out.push_str(replacement),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# acceptor settings
[DEFAULT]
ConnectionType=acceptor
SocketAcceptPort=9876
HeartBtInt=30
ResetOnLogon=Y

[SESSION]
BeginString=FIX.4.4
SenderCompID=SERVER
TargetCompID=CLIENT1

[session]
BeginString=FIX.4.2
SenderCompID=SERVER
TargetCompID=CLIENT2
SocketAcceptPort=9877
HeartBtInt=abc
";

    fn no_vars() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_parse_sessions_and_inheritance() {
        let settings = SessionSettings::parse_with_variables(SAMPLE, &no_vars()).unwrap();
        assert_eq!(settings.session_count(), 2);

        let first = SessionId::new("FIX.4.4", "SERVER", "CLIENT1");
        let second = SessionId::new("FIX.4.2", "SERVER", "CLIENT2");
        assert_eq!(
            settings.get_string(&first, keys::CONNECTION_TYPE).unwrap(),
            "acceptor"
        );
        assert_eq!(settings.get_long(&first, keys::SOCKET_ACCEPT_PORT).unwrap(), 9876);
        assert_eq!(settings.get_long(&second, keys::SOCKET_ACCEPT_PORT).unwrap(), 9877);
        assert!(settings.get_bool(&first, keys::RESET_ON_LOGON).unwrap());
        assert_eq!(settings.default_value(keys::HEART_BT_INT), Some("30"));
    }

    #[test]
    fn test_invalid_and_missing_values() {
        let settings = SessionSettings::parse_with_variables(SAMPLE, &no_vars()).unwrap();
        let second = SessionId::new("FIX.4.2", "SERVER", "CLIENT2");

        let err = settings.get_long(&second, keys::HEART_BT_INT).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { ref value, .. } if value == "abc"));

        let err = settings.get_string(&second, "DataDictionary").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting { ref key, .. } if key == "DataDictionary"));

        assert!(!settings.get_bool_or(&second, keys::VALIDATE_CHECKSUM, false).unwrap());
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = SessionSettings::parse_with_variables("[DEFAULT]\nnot a pair\n", &no_vars())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Settings("line 2: expected key=value, found 'not a pair'".to_string())
        );
    }

    #[test]
    fn test_rejects_unknown_section_and_orphan_values() {
        assert!(SessionSettings::parse_with_variables("[OTHER]\n", &no_vars()).is_err());
        assert!(SessionSettings::parse_with_variables("Key=Value\n", &no_vars()).is_err());
    }

    #[test]
    fn test_session_without_identity_fails() {
        let err = SessionSettings::parse_with_variables(
            "[SESSION]\nBeginString=FIX.4.4\nSenderCompID=S\n",
            &no_vars(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting { ref key, .. } if key == "TargetCompID"));
    }

    #[test]
    fn test_duplicate_session_fails() {
        let text = "[DEFAULT]\nBeginString=FIX.4.4\nSenderCompID=S\n\
                    [SESSION]\nTargetCompID=T\n[SESSION]\nTargetCompID=T\n";
        let err = SessionSettings::parse_with_variables(text, &no_vars()).unwrap_err();
        assert!(err.to_string().contains("duplicate session FIX.4.4:S->T"));
    }

    #[test]
    fn test_qualifier_distinguishes_sessions() {
        let text = "[DEFAULT]\nBeginString=FIX.4.4\nSenderCompID=S\nTargetCompID=T\n\
                    [SESSION]\nSessionQualifier=a\n[SESSION]\nSessionQualifier=b\n";
        let settings = SessionSettings::parse_with_variables(text, &no_vars()).unwrap();
        let ids: Vec<String> = settings.session_ids().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["FIX.4.4:S->T:a", "FIX.4.4:S->T:b"]);
    }

    #[test]
    fn test_variable_expansion() {
        let mut vars = HashMap::new();
        vars.insert("FIX_PORT".to_string(), "7001".to_string());
        let text = "[DEFAULT]\nSocketAcceptPort=${FIX_PORT}\nFileStorePath=${HOME_DIR}/store\n";
        let settings = SessionSettings::parse_with_variables(text, &vars).unwrap();
        assert_eq!(settings.default_value("SocketAcceptPort"), Some("7001"));
        assert_eq!(settings.default_value("FileStorePath"), Some("${HOME_DIR}/store"));
    }

    #[test]
    fn test_display_reparses() {
        let settings = SessionSettings::parse_with_variables(SAMPLE, &no_vars()).unwrap();
        let reparsed =
            SessionSettings::parse_with_variables(&settings.to_string(), &no_vars()).unwrap();
        assert_eq!(reparsed, settings);
    }

    #[test]
    fn test_programmatic_settings() {
        let id = SessionId::new("FIX.4.4", "SERVER", "CLIENT");
        let mut settings = SessionSettings::new();
        settings.set_default(keys::CONNECTION_TYPE, "acceptor");
        settings.set_session(&id, keys::SOCKET_ACCEPT_PORT, "5001");
        assert_eq!(settings.session_count(), 1);
        assert_eq!(settings.get_long(&id, keys::SOCKET_ACCEPT_PORT).unwrap(), 5001);
        assert_eq!(settings.get_string(&id, keys::CONNECTION_TYPE).unwrap(), "acceptor");
    }
}
