//! Sourcegrade Core - Foundation crate shared by the acquisition and analysis crates
//!
//! # Modules
//!
//! - [`config`] - Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] - Source descriptors, workspaces, fingerprints and analysis entities
//! - [`application`] - Error taxonomy and the result cache contract
//! - [`infrastructure`] - In-memory result cache
//! - [`logging`] - Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! sourcegrade-core/
//! ├── domain/
//! │   ├── source/       # SourceDescriptor, Workspace, SourceFingerprint
//! │   └── analysis/     # Analyzer trait, AnalyzerConfig, AnalyzerResult
//! ├── application/
//! │   ├── errors.rs     # AcquisitionError, AnalysisError
//! │   └── cache.rs      # ResultCache trait, CacheEntry
//! ├── infrastructure/
//! │   └── cache/        # InMemoryResultCache
//! └── config/           # Configuration management
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use sourcegrade_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `SOURCEGRADE__` prefix with double underscore separators:
//!
//! ```bash
//! SOURCEGRADE__FETCH__DEFAULT_CLONE_DEPTH=5
//! SOURCEGRADE__CACHE__MAX_AGE_SECONDS=3600
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
