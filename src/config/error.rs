//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// `base.toml` (or an explicitly named file) does not exist
    #[error("Configuration file not found, looked for: {searched_paths:?}")]
    ConfigFileNotFound { searched_paths: Vec<PathBuf> },

    /// Layered sources could not be merged
    #[error("Could not parse configuration from {source_name}: {reason}")]
    ParseError { source_name: String, reason: String },

    /// Merged sources did not deserialize for the selected environment
    #[error("Configuration for environment '{environment}' is malformed: {reason}")]
    EnvironmentConfigError { environment: String, reason: String },

    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    #[error("Invalid value '{value}' for '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

impl ConfigurationError {
    pub fn config_file_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched_paths }
    }

    pub fn parse_error(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ParseError {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn environment_config_error(environment: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::EnvironmentConfigError {
            environment: environment.into(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Dotted path of the offending field, when the error names one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field, .. } | Self::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }
}
