//! Hook configuration.
//!
//! A single directive, `calltrace.enable`, read once when the module is
//! activated. Changing it afterwards has no effect: the dispatch entry
//! points are only swapped at activation.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Directive controlling whether calls are traced.
pub const ENABLE_DIRECTIVE: &str = "calltrace.enable";
/// Default value of [`ENABLE_DIRECTIVE`].
pub const ENABLE_DEFAULT: &str = "0";
/// Environment variable overriding [`ENABLE_DIRECTIVE`].
pub const ENABLE_ENV: &str = "CALLTRACE_ENABLE";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: expected `key = value`")]
    Syntax { line: usize },
    #[error("line {line}: invalid value {value:?} for {key}")]
    InvalidValue {
        key: String,
        value: String,
        line: usize,
    },
}

/// Trace configuration snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceConfig {
    /// Install the tracing wrappers at activation.
    pub enable: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enable: parse_flag(ENABLE_DEFAULT).unwrap_or(false),
        }
    }
}

impl TraceConfig {
    #[must_use]
    pub const fn enabled() -> Self {
        Self { enable: true }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { enable: false }
    }

    /// Parse INI-style `key = value` text.
    ///
    /// Section headers are ignored, as are keys this hook does not own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] for lines without `=` and
    /// [`ConfigError::InvalidValue`] for unparseable flag values.
    pub fn parse_ini(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let entry = raw.trim();
            if entry.is_empty()
                || entry.starts_with(';')
                || entry.starts_with('#')
                || entry.starts_with('[')
            {
                continue;
            }
            let (key, value) = entry.split_once('=').ok_or(ConfigError::Syntax { line })?;
            let key = key.trim();
            let value = unquote(value.trim());
            if key != ENABLE_DIRECTIVE {
                debug!(key, line, "ignoring unknown directive");
                continue;
            }
            config.enable = parse_flag(value).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
                line,
            })?;
        }
        Ok(config)
    }

    /// Read and parse an INI file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// whatever [`TraceConfig::parse_ini`] reports.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_ini(&text)
    }

    /// Apply the [`ENABLE_ENV`] override, if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the variable is not a flag.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Configuration from defaults plus the environment.
    ///
    /// # Errors
    ///
    /// See [`TraceConfig::with_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    fn with_env_from<F>(self, lookup: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(ENABLE_ENV) {
            Some(value) => self.with_override(&value),
            None => Ok(self),
        }
    }

    fn with_override(mut self, value: &str) -> Result<Self, ConfigError> {
        self.enable = parse_flag(value.trim()).ok_or_else(|| ConfigError::InvalidValue {
            key: ENABLE_ENV.to_owned(),
            value: value.to_owned(),
            line: 0,
        })?;
        Ok(self)
    }

    /// `(directive, value)` pairs for display.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![(ENABLE_DIRECTIVE, u8::from(self.enable).to_string())]
    }
}

impl fmt::Display for TraceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ENABLE_DIRECTIVE} = {}", u8::from(self.enable))
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Integer flags (non-zero is on) plus the usual boolean words.
fn parse_flag(value: &str) -> Option<bool> {
    if value.is_empty() {
        return Some(false);
    }
    if let Ok(n) = value.parse::<i64>() {
        return Some(n != 0);
    }
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" | "none" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disabled() {
        assert!(!TraceConfig::default().enable);
        assert_eq!(TraceConfig::default().entries(), vec![(ENABLE_DIRECTIVE, ENABLE_DEFAULT.to_owned())]);
        assert_eq!(TraceConfig::parse_ini("").unwrap(), TraceConfig::disabled());
    }

    #[test]
    fn test_parse_enable() {
        let config = TraceConfig::parse_ini("calltrace.enable = 1\n").unwrap();
        assert!(config.enable);

        let config = TraceConfig::parse_ini("[calltrace]\ncalltrace.enable=On").unwrap();
        assert!(config.enable);

        let config = TraceConfig::parse_ini("calltrace.enable = \"0\"").unwrap();
        assert!(!config.enable);
    }

    #[test]
    fn test_parse_skips_comments_and_unknown_keys() {
        let text = "; comment\n# another\nmemory_limit = 128M\n\ncalltrace.enable = yes\n";
        assert!(TraceConfig::parse_ini(text).unwrap().enable);
    }

    #[test]
    fn test_last_value_wins() {
        let text = "calltrace.enable = 1\ncalltrace.enable = off\n";
        assert!(!TraceConfig::parse_ini(text).unwrap().enable);
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let err = TraceConfig::parse_ini("\ncalltrace.enable = maybe").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, line } => {
                assert_eq!(key, ENABLE_DIRECTIVE);
                assert_eq!(value, "maybe");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = TraceConfig::parse_ini("calltrace.enable").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1 }));
    }

    #[test]
    fn test_override() {
        let config = TraceConfig::disabled().with_override("1").unwrap();
        assert!(config.enable);
        assert!(TraceConfig::enabled().with_override("bogus").is_err());
    }

    #[test]
    fn test_env_override() {
        let unset = TraceConfig::enabled().with_env_from(|_| None).unwrap();
        assert!(unset.enable);

        let config = TraceConfig::disabled()
            .with_env_from(|key| (key == ENABLE_ENV).then(|| "On".to_owned()))
            .unwrap();
        assert!(config.enable);

        let config = TraceConfig::enabled()
            .with_env_from(|_| Some(" 0 ".to_owned()))
            .unwrap();
        assert!(!config.enable);

        let err = TraceConfig::disabled()
            .with_env_from(|_| Some("sometimes".to_owned()))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, line } => {
                assert_eq!(key, ENABLE_ENV);
                assert_eq!(value, "sometimes");
                assert_eq!(line, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = TraceConfig::load(Path::new("/nonexistent/calltrace.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_entries_and_display() {
        let config = TraceConfig::enabled();
        assert_eq!(config.entries(), vec![(ENABLE_DIRECTIVE, "1".to_owned())]);
        assert_eq!(config.to_string(), "calltrace.enable = 1");
    }
}
