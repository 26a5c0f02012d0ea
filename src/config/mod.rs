//! Configuration management for mediafetch
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use mediafetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Downloads land in: {}", config.downloader.output_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `MEDIAFETCH__<section>__<key>`:
//! - `MEDIAFETCH__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `MEDIAFETCH__DOWNLOADER__OUTPUT_DIR=/srv/media`
//! - `MEDIAFETCH__DOWNLOADER__MAX_FILESIZE=2GB`
//!
//! # Configuration File
//!
//! By default the file is `config/mediafetch.toml`; `MEDIAFETCH_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, DownloaderConfig, ServerConfig, TelemetryConfig};
pub use validation::{SUPPORTED_AUDIO_FORMATS, ValidationError};

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
    /// Returns an error if the file is malformed or a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
