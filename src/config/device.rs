//! Persisted device configurations (JSON)
//!
//! ```json
//! {
//!     "ssid": "workshop",
//!     "port": 60606,
//!     "uarts": [4, 16, 17],
//!     "screen": [21, 22],
//!     "ina": [21, 22]
//! }
//! ```

use super::ConfigError;
use crate::core::codec::DeviceConfig;
use std::path::Path;

impl DeviceConfig {
    /// Load a configuration file
    ///
    /// Only structure is checked: all keys present, arrays of the right
    /// length, bytes within 0..=255.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write a configuration file in the same layout as [`DeviceConfig::to_display_text`]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut content = self.to_display_text();
        content.push('\n');
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_file() {
        let (_dir, path) = write(
            r#"{"ssid": "workshop", "port": 60606, "uarts": [4, 16, 17], "screen": [21, 22], "ina": [21, 22]}"#,
        );
        let cfg = DeviceConfig::load(&path).unwrap();
        assert_eq!(cfg.ssid, "workshop");
        assert_eq!(cfg.uarts, [4, 16, 17]);
        assert_eq!(
            cfg.serialize_for_write("pw"),
            "workshop:pw:60606:1118212:5653:5653"
        );
    }

    #[test]
    fn test_read_output_can_be_saved_and_loaded() {
        let cfg = DeviceConfig::parse("config:MyWifi:8080:65535:511:1023").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        cfg.save(&path).unwrap();
        assert_eq!(DeviceConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn test_structural_errors() {
        let (_dir, path) = write(r#"{"ssid": "x", "port": 1, "uarts": [1, 2], "screen": [1, 2], "ina": [1, 2]}"#);
        assert!(matches!(DeviceConfig::load(&path), Err(ConfigError::Parse { .. })));

        let (_dir, path) = write(r#"{"ssid": "x", "port": 1, "uarts": [1, 2, 300], "screen": [1, 2], "ina": [1, 2]}"#);
        assert!(matches!(DeviceConfig::load(&path), Err(ConfigError::Parse { .. })));

        let (_dir, path) = write(r#"{"ssid": "x", "port": 1}"#);
        assert!(matches!(DeviceConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeviceConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
