//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, PlumeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PlumeConfig) -> ConfigResult<()> {
    if config.bot.name.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.name"));
    }
    if config.bot.access_key.as_deref() == Some("") {
        return Err(ConfigError::validation(
            "bot.access_key must not be empty when set",
        ));
    }

    validate_logging_config(&config.logging)
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {target:?}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PlumeConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_bot_name_rejected() {
        let mut config = PlumeConfig::default();
        config.bot.name = "  ".to_string();

        let err = validate_config(&config).unwrap_err();

        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "bot.name"));
    }

    #[test]
    fn test_empty_access_key_rejected() {
        let mut config = PlumeConfig::default();
        config.bot.access_key = Some(String::new());

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = PlumeConfig::default();
        config.logging.output = LogOutput::File;

        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("plume.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_filter_target_with_whitespace_rejected() {
        let mut config = PlumeConfig::default();
        config
            .logging
            .filters
            .insert("plume core".to_string(), LogLevel::Trace);

        assert!(validate_config(&config).is_err());
    }
}
