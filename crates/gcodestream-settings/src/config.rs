//! Configuration file handling for GCodeStream
//!
//! Supports JSON and TOML file formats. The default file lives in the
//! platform config directory (`~/.config/gcodestream/config.toml` on Linux)
//! and is only read when it exists.
//!
//! Configuration is organized into two sections:
//! - Connection settings (descriptor, drain window)
//! - Streaming settings (error policy, echo, progress formatting)

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use gcodestream_core::constants::{
    DEFAULT_DESCRIPTOR, DEFAULT_RETRY_LIMIT, DRAIN_WINDOW_MS, RESPONSE_BUFFER_LEN,
};
use gcodestream_core::ErrorPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for the response line buffer
const MAX_RESPONSE_BUFFER_LEN: usize = 64 * 1024;

/// Upper bound for the drain window (milliseconds)
const MAX_DRAIN_TIMEOUT_MS: u64 = 60_000;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Connection string used when none is given on the command line
    pub descriptor: String,
    /// Quiet window for discarding stale device output, in milliseconds
    pub drain_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
            drain_timeout_ms: DRAIN_WINDOW_MS,
        }
    }
}

/// Streaming settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// What to do when the device answers with an error
    pub error_policy: ErrorPolicy,
    /// Retransmissions per line under the `retry` policy
    pub retry_limit: u32,
    /// Mirror device output to stdout
    pub echo_responses: bool,
    /// Digit grouping character for progress line numbers, none to disable
    pub thousands_separator: Option<char>,
    /// Response line buffer length in bytes
    pub response_buffer_len: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            echo_responses: false,
            thousands_separator: Some(','),
            response_buffer_len: RESPONSE_BUFFER_LEN,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Streaming settings
    pub streaming: StreamingSettings,
}

/// Supported on-disk formats
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path, content).map_err(|e| SettingsError::SaveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Load the default config file if there is one, defaults otherwise
    pub fn load_default() -> SettingsResult<Self> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load `path` if given, the default config file otherwise
    pub fn load(path: Option<&Path>) -> SettingsResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.connection.descriptor.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "connection.descriptor".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.connection.drain_timeout_ms == 0
            || self.connection.drain_timeout_ms > MAX_DRAIN_TIMEOUT_MS
        {
            return Err(ConfigError::ValueOutOfRange {
                key: "connection.drain_timeout_ms".to_string(),
                value: self.connection.drain_timeout_ms.to_string(),
            });
        }

        // one byte of the buffer is reserved, so a line needs at least two
        if self.streaming.response_buffer_len < 2
            || self.streaming.response_buffer_len > MAX_RESPONSE_BUFFER_LEN
        {
            return Err(ConfigError::ValueOutOfRange {
                key: "streaming.response_buffer_len".to_string(),
                value: self.streaming.response_buffer_len.to_string(),
            });
        }

        if let Some(separator) = self.streaming.thousands_separator {
            if separator.is_ascii_digit() || separator.is_control() {
                return Err(ConfigError::InvalidValue {
                    key: "streaming.thousands_separator".to_string(),
                    reason: format!("'{}' is not a usable separator", separator.escape_default()),
                });
            }
        }

        Ok(())
    }
}

/// Location of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gcodestream").join("config.toml"))
}
