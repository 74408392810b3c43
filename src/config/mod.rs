//! Configuration management
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `RELIEFWEB__<section>__<key>`
//!
//! Examples:
//! - `RELIEFWEB__API__URL=https://api.reliefweb.int/v1`
//! - `RELIEFWEB__CACHE__LIFETIME=15m`
//! - `RELIEFWEB__SERVER__BIND_ADDR=0.0.0.0:9000`
//!
//! The POST API key is only ever read from `RELIEFWEB_POST_API_KEY`; the
//! provider id may come from the file or `RELIEFWEB_POST_API_PROVIDER`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/reliefweb.toml`.
//! This can be overridden using the `RELIEFWEB_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    ApiConfig, CacheBackendKind, CacheConfig, Config, PostApiConfig, ServerConfig,
    StorageConfig, StorageProvider,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
