//! Configuration Module
//!
//! This module provides the wire constants, default settings and the optional
//! TOML configuration file for the plugin binaries.
//!
//! A plugin looks for its configuration in this order:
//! 1. the path given with `--config` (must exist),
//! 2. `<plugin>.toml` next to the plugin executable,
//! 3. built-in defaults.

use crate::lighting::DeviceKind;
use crate::utils::error::{PluginError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Size of the command read buffer; one byte is reserved, so 4095 are usable per read
pub const MAX_MESSAGE_SIZE: usize = 4096;
/// Sentinel written after every outbound document
pub const END_TOKEN: &str = "<<END>>";

/// Constants for default settings
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_BRIGHTNESS_STEP: u8 = 10;
pub const DEFAULT_MAX_ZONES: usize = 10;
pub const DEFAULT_CONNECT_ATTEMPT_LIMIT: u32 = 5;
pub const DEFAULT_SIMULATED_LEDS: usize = 16;

/// Top-level plugin configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    pub logging: LoggingConfig,
    pub lighting: LightingConfig,
    pub simulation: SimulationConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    /// Log file; defaults to `<temp dir>/<plugin>.log`
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// `[lighting]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightingConfig {
    /// Brightness change applied by `bright_up` / `bright_down`
    pub brightness_step: u8,
    /// Number of zones written by zone-addressed SDKs
    pub max_zones: usize,
    /// Session timeouts tolerated before an LED SDK session is dropped
    pub connect_attempt_limit: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            brightness_step: DEFAULT_BRIGHTNESS_STEP,
            max_zones: DEFAULT_MAX_ZONES,
            connect_attempt_limit: DEFAULT_CONNECT_ATTEMPT_LIMIT,
        }
    }
}

/// `[simulation]` section, used by the in-memory SDK the binaries ship with
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Refuse every connection attempt, as if the vendor app were not running
    pub unreachable: bool,
    /// Zones each device exposes
    pub zones: usize,
    /// LEDs each device exposes
    pub leds: usize,
    /// Devices attached to the simulated SDK
    pub devices: Vec<DeviceKind>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            unreachable: false,
            zones: DEFAULT_MAX_ZONES,
            leds: DEFAULT_SIMULATED_LEDS,
            devices: DeviceKind::ALL.to_vec(),
        }
    }
}

impl PluginConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PluginConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolve the configuration for a plugin
    ///
    /// # Arguments
    /// * `explicit` - Path passed on the command line, if any
    /// * `plugin_name` - Name used for the default file next to the executable
    ///
    /// # Returns
    /// * `Result<PluginConfig>` - The loaded configuration, or defaults when no file exists
    pub fn resolve(explicit: Option<&Path>, plugin_name: &str) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path(plugin_name) {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Log file for a plugin, honouring `[logging] file`
    pub fn log_file(&self, plugin_name: &str) -> PathBuf {
        self.logging
            .file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{plugin_name}.log")))
    }

    fn validate(&self) -> Result<()> {
        if self.lighting.brightness_step == 0 {
            return Err(PluginError::InvalidArguments(
                "lighting.brightness_step must be greater than 0".to_string(),
            ));
        }
        if self.lighting.max_zones == 0 {
            return Err(PluginError::InvalidArguments(
                "lighting.max_zones must be greater than 0".to_string(),
            ));
        }
        if self.lighting.connect_attempt_limit == 0 {
            return Err(PluginError::InvalidArguments(
                "lighting.connect_attempt_limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path(plugin_name: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(|dir| dir.join(format!("{plugin_name}.toml")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.lighting.brightness_step, 10);
        assert_eq!(config.lighting.max_zones, 10);
        assert_eq!(config.lighting.connect_attempt_limit, 5);
        assert!(!config.simulation.unreachable);
        assert_eq!(config.simulation.devices.len(), 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = PluginConfig::from_toml_str(
            r#"
            [lighting]
            brightness_step = 25

            [simulation]
            devices = ["keyboard"]
            "#,
        )
        .unwrap();

        assert_eq!(config.lighting.brightness_step, 25);
        assert_eq!(config.lighting.max_zones, DEFAULT_MAX_ZONES);
        assert_eq!(config.simulation.devices, vec![DeviceKind::Keyboard]);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = PluginConfig::from_toml_str("[lighting]\nbrightness = 3\n");
        match result {
            Err(PluginError::Config(_)) => (),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_step_is_rejected() {
        let result = PluginConfig::from_toml_str("[lighting]\nbrightness_step = 0\n");
        assert!(matches!(result, Err(PluginError::InvalidArguments(_))));
    }

    #[test]
    fn test_zero_attempt_limit_is_rejected() {
        let result = PluginConfig::from_toml_str("[lighting]\nconnect_attempt_limit = 0\n");
        match result {
            Err(PluginError::InvalidArguments(message)) => {
                assert!(message.contains("connect_attempt_limit"))
            }
            other => panic!("Expected InvalidArguments error, got {:?}", other),
        }
        assert!(PluginConfig::from_toml_str("[lighting]\nconnect_attempt_limit = 1\n").is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\nfile = \"/tmp/x.log\"").unwrap();

        let config = PluginConfig::resolve(Some(file.path()), "logiled").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.log_file("logiled"), PathBuf::from("/tmp/x.log"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PluginConfig::resolve(Some(&dir.path().join("missing.toml")), "logiled");
        assert!(matches!(result, Err(PluginError::Io(_))));
    }

    #[test]
    fn test_default_log_file_uses_plugin_name() {
        let config = PluginConfig::default();
        let path = config.log_file("corsair-plugin");
        assert!(path.ends_with("corsair-plugin.log"));
    }
}
