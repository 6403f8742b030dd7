//! Configuration module
//!
//! Handles the tools' own settings and persisted device configurations

mod device;
mod settings;

pub use settings::AppSettings;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File content is not well formed
    #[error("{path}: {message}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Value could not be serialized
    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "uul", "uul-tools").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of the settings file
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("settings.toml"))
}
