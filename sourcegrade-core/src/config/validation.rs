//! Configuration validation module

use crate::config::{CacheConfig, FetchConfig, LoggingConfig};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Fetch configuration error: {message}")]
    Fetch { message: String },

    #[error("Cache configuration error: {message}")]
    Cache { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.default_clone_depth == 0 {
            return Err(ValidationError::fetch(
                "default_clone_depth must be at least 1",
            ));
        }

        if self.git_fetch_timeout_seconds == 0 || self.http_timeout_seconds == 0 {
            return Err(ValidationError::fetch("timeouts must be greater than 0"));
        }

        if self.max_archive_bytes == 0 {
            return Err(ValidationError::fetch(
                "max_archive_bytes must be greater than 0",
            ));
        }

        if !self.registry_url.starts_with("http://") && !self.registry_url.starts_with("https://")
        {
            return Err(ValidationError::fetch(format!(
                "registry_url must start with http:// or https://, got: {}",
                self.registry_url
            )));
        }

        if self.registry_tool.trim().is_empty() {
            return Err(ValidationError::fetch("registry_tool cannot be empty"));
        }

        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.max_age_seconds == 0 {
            return Err(ValidationError::cache(
                "max_age_seconds must be greater than 0 when the cache is enabled",
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.format.as_str(), "json" | "pretty" | "compact") {
            return Err(ValidationError::logging(format!(
                "format must be one of json, pretty, compact; got: {}",
                self.format
            )));
        }

        if self.level.trim().is_empty() {
            return Err(ValidationError::logging("level cannot be empty"));
        }

        Ok(())
    }
}
