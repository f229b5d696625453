//! Configuration module for the Plume runtime.
//!
//! Configuration is layered with figment from defaults, files, environment
//! variables and programmatic overrides. See [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PlumeConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
