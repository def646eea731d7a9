//! GCodeStream Settings Crate
//!
//! Handles the configuration file: connection defaults and streaming
//! behaviour, loaded from TOML or JSON in the platform config directory.

pub mod config;
pub mod error;

pub use config::{default_config_path, Config, ConnectionSettings, StreamingSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
