//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`plume.toml`)
//! - `yaml-config`: enables YAML configuration files (`plume.yaml`, `plume.yml`)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`plume.{profile}.toml` / `plume.{profile}.yaml`)
//! 3. Main config file (`plume.toml` / `plume.yaml`)
//! 4. Environment variables (`PLUME_*`)
//! 5. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `PLUME_` prefix with `__` as
//! separator:
//!
//! - `PLUME_BOT__NAME=EchoBot` → `bot.name = "EchoBot"`
//! - `PLUME_BOT__ACCESS_KEY=xxx` → `bot.access_key = "xxx"`
//! - `PLUME_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! `PLUME_PROFILE` selects the profile and is not part of the configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use plume_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/plume.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::PlumeConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "PLUME_";
const PROFILE_ENV: &str = "PLUME_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `PLUME_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic overrides, merged last.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Without any, the current directory and the user config directory
    /// (`~/.config/plume` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration values on top of every other source.
    pub fn merge(mut self, config: PlumeConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<PlumeConfig> {
        let profile = self.profile.clone();
        let config: PlumeConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            bot = %config.bot.name,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(PlumeConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file, dispatching on its extension.
    #[allow(unused_variables)]
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("plume"));
        }
        paths
    }

    /// Searches each path for `plume.*` files of the enabled formats. The
    /// first path holding a main file wins; its profile file is merged below
    /// it.
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let extensions: &[&str] = &[
            #[cfg(feature = "toml-config")]
            "toml",
            #[cfg(feature = "yaml-config")]
            "yaml",
            #[cfg(feature = "yaml-config")]
            "yml",
        ];

        for dir in self.resolve_search_paths() {
            let mut found = false;
            for ext in extensions {
                let profile_path = dir.join(format!("plume.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = Self::merge_by_extension(figment, &profile_path, ext);
                }
                let main_path = dir.join(format!("plume.{ext}"));
                if main_path.exists() {
                    info!(path = %main_path.display(), "Loading configuration file");
                    figment = Self::merge_by_extension(figment, &main_path, ext);
                    found = true;
                }
            }
            if found {
                return figment;
            }
        }

        debug!("No configuration file found, using defaults");
        figment
    }

    #[allow(unused_variables)]
    fn merge_by_extension(figment: Figment, path: &Path, ext: &str) -> Figment {
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => figment.merge(Yaml::file(path)),
            _ => figment,
        }
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<PlumeConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<PlumeConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::{LogFormat, LogLevel};

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config, PlumeConfig::default());
            assert_eq!(config.bot.name, "PlumeBot");
            assert_eq!(config.logging.level, LogLevel::Info);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_reported() {
        let err = ConfigLoader::new()
            .file("/nonexistent/plume.toml")
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("plume.ini", "name = x")?;

            let err = ConfigLoader::new().file("plume.ini").load().unwrap_err();

            assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "ini"));
            Ok(())
        });
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_layered_sources() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "plume.staging.toml",
                r#"
                [bot]
                name = "StagingBot"

                [logging]
                format = "pretty"
                "#,
            )?;
            jail.create_file(
                "plume.toml",
                r#"
                [bot]
                name = "EchoBot"
                access_key = "file-key"

                [logging]
                level = "debug"
                "#,
            )?;
            jail.set_env("PLUME_BOT__ACCESS_KEY", "env-key");

            let config = ConfigLoader::new()
                .profile("staging")
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.bot.name, "EchoBot");
            assert_eq!(config.bot.access_key.as_deref(), Some("env-key"));
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.logging.format, LogFormat::Pretty);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_programmatic_merge_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("plume.toml", "[bot]\nname = \"FileBot\"\n")?;
            jail.set_env("PLUME_BOT__NAME", "EnvBot");

            let mut overrides = PlumeConfig::default();
            overrides.bot.name = "CodeBot".to_string();
            let config = ConfigLoader::new()
                .file("plume.toml")
                .merge(overrides)
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.bot.name, "CodeBot");
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_file_rejected_by_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("plume.toml", "[bot]\nname = \"\"\n")?;

            let err = ConfigLoader::new()
                .file("plume.toml")
                .without_env()
                .load()
                .unwrap_err();

            assert!(matches!(err, ConfigError::MissingField { .. }));
            Ok(())
        });
    }
}
