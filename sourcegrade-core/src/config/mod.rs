//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Source acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Parent directory for acquisition directories. Defaults to `$TMPDIR/sourcegrade`.
    pub workspace_root: Option<PathBuf>,
    /// Clone depth used when a descriptor does not set one
    pub default_clone_depth: u32,
    /// Network timeout passed down to libgit2
    pub git_fetch_timeout_seconds: u64,
    /// Timeout for archive and registry HTTP requests
    pub http_timeout_seconds: u64,
    /// Archives larger than this are rejected mid-stream
    pub max_archive_bytes: u64,
    /// Registry base URL used for version resolution
    pub registry_url: String,
    /// Packaging tool invoked to fetch registry tarballs
    pub registry_tool: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            default_clone_depth: 1,
            git_fetch_timeout_seconds: 30,
            http_timeout_seconds: 60,
            max_archive_bytes: 512 * 1024 * 1024, // 512 MiB
            registry_url: "https://registry.npmjs.org".to_string(),
            registry_tool: "npm".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("sourcegrade"))
    }

    pub fn git_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.git_fetch_timeout_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entries older than this are recomputed
    pub max_age_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_seconds: 24 * 3600,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json`, `pretty` or `compact`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.fetch.validate()?;
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SOURCEGRADE").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a single TOML file, ignoring the environment
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigLoadError> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[fetch]
workspace_root = "/srv/sourcegrade"
default_clone_depth = 5

[cache]
max_age_seconds = 60
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.fetch.workspace_root(), PathBuf::from("/srv/sourcegrade"));
        assert_eq!(config.fetch.default_clone_depth, 5);
        assert_eq!(config.fetch.registry_tool, "npm");
        assert_eq!(config.cache.max_age(), Duration::from_secs(60));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nformat = \"xml\"").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }

    #[test]
    fn test_default_workspace_root_is_under_temp_dir() {
        let root = FetchConfig::default().workspace_root();
        assert!(root.starts_with(std::env::temp_dir()));
        assert!(root.ends_with("sourcegrade"));
    }
}
