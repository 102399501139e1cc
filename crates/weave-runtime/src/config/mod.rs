//! Configuration module for the Weave runtime.
//!
//! TOML-based, profile-aware configuration loading for logging and
//! dispatch settings.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, WeaveConfig};
