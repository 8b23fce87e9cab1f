//! Configuration file support for isrmond
//!
//! Loads and validates isrmond configuration from TOML files.
//! Default location: /etc/isrmond/isrmond.toml

use gpio_hal::{EdgeMode, LineId, PinMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{IsrError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/isrmond/isrmond.toml";

/// GPIO backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Kernel sysfs GPIO interface (Linux)
    #[default]
    Sysfs,
    /// In-process simulation with no hardware attached
    Simulated,
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub backend: Backend,

    /// sysfs GPIO class directory
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Kernel GPIO number behind each logical line
    #[serde(default)]
    pub pin_map: PinMap,
}

/// Monitored lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinesConfig {
    /// Logical line ids to arm
    #[serde(default = "default_line_ids")]
    pub ids: Vec<LineId>,

    /// Edge that fires the interrupt
    #[serde(default)]
    pub edge: EdgeMode,
}

/// Observer loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Longest idle period between two counter scans
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Complete isrmond configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsrmondConfig {
    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub lines: LinesConfig,

    #[serde(default)]
    pub observer: ObserverConfig,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

fn default_line_ids() -> Vec<LineId> {
    (0..8).map(LineId::new).collect()
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            sysfs_root: default_sysfs_root(),
            pin_map: PinMap::default(),
        }
    }
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            ids: default_line_ids(),
            edge: EdgeMode::default(),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl IsrmondConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                IsrError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(IsrError::Io(e)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.observer.poll_interval_ms)
    }

    /// Monitored lines in ascending order.
    pub fn line_ids(&self) -> Vec<LineId> {
        let mut ids = self.lines.ids.clone();
        ids.sort();
        ids
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.lines.ids.is_empty() {
            return Err(IsrError::Configuration(
                "at least one line must be monitored".to_string(),
            ));
        }

        if self.platform.pin_map.len() > PinMap::MAX_LINES {
            return Err(IsrError::Configuration(format!(
                "pin_map has {} entries, at most {} are supported",
                self.platform.pin_map.len(),
                PinMap::MAX_LINES
            )));
        }

        let mut seen = BTreeSet::new();
        for line in &self.lines.ids {
            if !seen.insert(*line) {
                return Err(IsrError::Configuration(format!(
                    "line {line} is listed more than once"
                )));
            }
            if !self.platform.pin_map.contains(*line) {
                return Err(IsrError::Configuration(format!(
                    "line {} is outside the pin map ({} lines)",
                    line,
                    self.platform.pin_map.len()
                )));
            }
        }

        if self.observer.poll_interval_ms == 0 {
            return Err(IsrError::Configuration(
                "poll_interval_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = IsrmondConfig::default();
        assert_eq!(config.platform.backend, Backend::Sysfs);
        assert_eq!(config.platform.sysfs_root, PathBuf::from("/sys/class/gpio"));
        assert_eq!(config.platform.pin_map, PinMap::wiringpi());
        assert_eq!(config.lines.ids.len(), 8);
        assert_eq!(config.lines.edge, EdgeMode::Falling);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(IsrmondConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_lines() {
        let mut config = IsrmondConfig::default();
        config.lines.ids.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_line() {
        let mut config = IsrmondConfig::default();
        config.lines.ids = vec![LineId::new(1), LineId::new(1)];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_line_outside_map() {
        let mut config = IsrmondConfig::default();
        config.lines.ids = vec![LineId::new(8)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_oversized_pin_map() {
        let mut config = IsrmondConfig::default();
        config.platform.pin_map = PinMap::new(0..257);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at most 256"));

        config.platform.pin_map = PinMap::new(0..256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = IsrmondConfig::default();
        config.observer.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_line_ids_sorted() {
        let mut config = IsrmondConfig::default();
        config.lines.ids = vec![LineId::new(5), LineId::new(0), LineId::new(3)];
        assert_eq!(
            config.line_ids(),
            vec![LineId::new(0), LineId::new(3), LineId::new(5)]
        );
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[platform]
backend = "simulated"
pin_map = [5, 6, 13]

[lines]
ids = [0, 2]
edge = "both"
"#;
        let config: IsrmondConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.platform.backend, Backend::Simulated);
        assert_eq!(config.platform.pin_map, PinMap::new([5, 6, 13]));
        assert_eq!(config.lines.ids, vec![LineId::new(0), LineId::new(2)]);
        assert_eq!(config.lines.edge, EdgeMode::Both);
        // Unspecified values should use defaults
        assert_eq!(config.observer.poll_interval_ms, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_rejects_unknown_edge() {
        let result: std::result::Result<IsrmondConfig, _> =
            toml::from_str("[lines]\nedge = \"sideways\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = IsrmondConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("falling"));
        assert_eq!(toml::from_str::<IsrmondConfig>(&text).unwrap(), config);
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = IsrmondConfig::load_or_default("/nonexistent/isrmond.toml").unwrap();
        assert_eq!(config, IsrmondConfig::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isrmond.toml");
        fs::write(&path, "[observer]\npoll_interval_ms = \"fast\"\n").unwrap();
        let err = IsrmondConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, IsrError::Configuration(_)));
    }
}
