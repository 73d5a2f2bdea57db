//! Configuration management for imgmend
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use imgmend::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `IMGMEND__<section>__<key>`
//!
//! Examples:
//! - `IMGMEND__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `IMGMEND__ORIGIN__BASE_URL=https://blog.example.com`
//! - `IMGMEND__UPSTREAM__REQUEST_TIMEOUT_SECS=30`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/imgmend.toml`.
//! This can be overridden using the `IMGMEND_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use models::{Config, OriginConfig, ServerConfig, UpstreamConfig};
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
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`IMGMEND__*`)
    /// 2. TOML file (default: `config/imgmend.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed or the origin section is missing
    /// - Validation fails (bad origin URL, zero timeouts)
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
