//! Tool settings
//!
//! Optional `settings.toml` in the platform config directory. Every key may
//! be omitted; command-line flags take precedence over the file.

use super::ConfigError;
use crate::core::discovery::{DiscoveryConfig, DEFAULT_PORT};
use crate::core::stream::{StreamConfig, DEFAULT_MAX_DATAGRAM};
use crate::core::transport::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Device UDP port
    pub udp_port: u16,
    /// Receive window per discovery candidate, milliseconds
    pub discovery_timeout_ms: u64,
    /// Streaming receive timeout, milliseconds
    pub receive_timeout_ms: u64,
    /// Streaming receive buffer, bytes
    pub max_datagram: usize,
    /// Serial line speed
    pub baud_rate: u32,
    /// Serial response deadline in seconds; absent waits forever
    pub serial_timeout_secs: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_PORT,
            discovery_timeout_ms: 3000,
            receive_timeout_ms: 3000,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            baud_rate: DEFAULT_BAUD_RATE,
            serial_timeout_secs: None,
        }
    }
}

impl AppSettings {
    /// Load from the platform config directory, or defaults if there is none
    pub fn load() -> Result<Self, ConfigError> {
        match super::settings_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.validate().map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(settings)
    }

    /// Reject values the protocol loops cannot run with
    pub fn validate(&self) -> Result<(), String> {
        let zero = [
            ("discovery_timeout_ms", self.discovery_timeout_ms == 0),
            ("receive_timeout_ms", self.receive_timeout_ms == 0),
            ("max_datagram", self.max_datagram == 0),
            ("baud_rate", self.baud_rate == 0),
            ("serial_timeout_secs", self.serial_timeout_secs == Some(0)),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((key, _)) => Err(format!("{key} must be greater than zero")),
            None => Ok(()),
        }
    }

    /// Save to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Discovery settings, optionally pinned to one host
    pub fn discovery(&self, host: Option<std::net::IpAddr>) -> DiscoveryConfig {
        DiscoveryConfig {
            host,
            port: self.udp_port,
            timeout: Duration::from_millis(self.discovery_timeout_ms),
        }
    }

    /// Streaming settings
    pub fn stream(&self) -> StreamConfig {
        StreamConfig {
            max_datagram: self.max_datagram,
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
        }
    }

    /// Serial response deadline
    pub fn serial_timeout(&self) -> Option<Duration> {
        self.serial_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol() {
        let s = AppSettings::default();
        assert_eq!(s.udp_port, 60606);
        assert_eq!(s.baud_rate, 115_200);
        assert_eq!(s.discovery(None).timeout, Duration::from_secs(3));
        assert_eq!(s.stream().max_datagram, 512);
        assert_eq!(s.serial_timeout(), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "udp_port = 5000\nserial_timeout_secs = 4\n").unwrap();

        let s = AppSettings::load_from(&path).unwrap();
        assert_eq!(s.udp_port, 5000);
        assert_eq!(s.serial_timeout(), Some(Duration::from_secs(4)));
        assert_eq!(s.receive_timeout_ms, 3000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let s = AppSettings {
            discovery_timeout_ms: 500,
            ..AppSettings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path).unwrap(), s);
    }

    #[test]
    fn test_zero_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        for content in [
            "discovery_timeout_ms = 0",
            "receive_timeout_ms = 0",
            "max_datagram = 0",
            "serial_timeout_secs = 0",
        ] {
            std::fs::write(&path, content).unwrap();
            match AppSettings::load_from(&path) {
                Err(ConfigError::Parse { message, .. }) => {
                    assert!(message.contains(content.split(' ').next().unwrap()));
                }
                other => panic!("{content}: {other:?}"),
            }
        }
        assert!(AppSettings::default().validate().is_ok());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "udp_port = \"many\"").unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
