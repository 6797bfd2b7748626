//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::frame::codec::MAX_FRAME_SIZE;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub transport: TransportConfig,
    pub monitor: MonitorConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty enables auto-detection of common USB paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Transport layer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_rx_buffer_size")]
    pub rx_buffer_size: usize,

    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,

    /// CRC-16 generator polynomial; both link ends must agree
    #[serde(default = "default_crc_polynomial")]
    pub crc_polynomial: u16,

    #[serde(default = "default_crc_initial")]
    pub crc_initial: u16,

    #[serde(default = "default_crc_final_xor")]
    pub crc_final_xor: u16,
}

/// Monitor binary configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,

    /// Number of received messages between status log lines
    #[serde(default = "default_status_interval")]
    pub status_interval: u64,
}

// Default value functions
fn default_baud_rate() -> u32 { 115_200 }

fn default_rx_buffer_size() -> usize { 1024 }
fn default_stall_timeout_ms() -> u64 { 20 }
fn default_crc_polynomial() -> u16 { 0x1021 }
fn default_crc_initial() -> u16 { 0xFFFF }
fn default_crc_final_xor() -> u16 { 0x0000 }

fn default_receipt_timeout_ms() -> u64 { 200 }
fn default_status_interval() -> u64 { 100 }

/// Baud rates supported by common controller USB serial stacks
const VALID_BAUD_RATES: &[u32] = &[
    9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Serial port may be empty (auto-detect), but the baud rate must be
        // one the controller USB stacks actually support
        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(crate::error::LinkError::Config(toml::de::Error::custom(
                format!(
                    "baud_rate must be one of: {:?}",
                    VALID_BAUD_RATES
                ),
            )));
        }

        // The reception buffer must hold at least one whole frame
        if self.transport.rx_buffer_size < MAX_FRAME_SIZE {
            return Err(crate::error::LinkError::Config(toml::de::Error::custom(
                format!(
                    "rx_buffer_size must be at least {} bytes",
                    MAX_FRAME_SIZE
                ),
            )));
        }

        if self.transport.stall_timeout_ms == 0 || self.transport.stall_timeout_ms > 10_000 {
            return Err(crate::error::LinkError::Config(toml::de::Error::custom(
                "stall_timeout_ms must be between 1 and 10000",
            )));
        }

        if self.monitor.receipt_timeout_ms == 0 || self.monitor.receipt_timeout_ms > 60_000 {
            return Err(crate::error::LinkError::Config(toml::de::Error::custom(
                "receipt_timeout_ms must be between 1 and 60000",
            )));
        }

        if self.monitor.status_interval == 0 {
            return Err(crate::error::LinkError::Config(toml::de::Error::custom(
                "status_interval must be greater than 0",
            )));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig {
                port: String::new(),
                baud_rate: default_baud_rate(),
            },
            transport: TransportConfig {
                rx_buffer_size: default_rx_buffer_size(),
                stall_timeout_ms: default_stall_timeout_ms(),
                crc_polynomial: default_crc_polynomial(),
                crc_initial: default_crc_initial(),
                crc_final_xor: default_crc_final_xor(),
            },
            monitor: MonitorConfig {
                receipt_timeout_ms: default_receipt_timeout_ms(),
                status_interval: default_status_interval(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 230400

[transport]

[monitor]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 230_400);
        // Unspecified sections fall back to defaults
        assert_eq!(config.transport.crc_polynomial, 0x1021);
        assert_eq!(config.monitor.receipt_timeout_ms, 200);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/nonexistent/mcu-link.toml").is_err());
    }

    #[test]
    fn test_empty_port_is_valid() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 12_345;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in VALID_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_rx_buffer_too_small() {
        let mut config = Config::default();
        config.transport.rx_buffer_size = MAX_FRAME_SIZE - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stall_timeout_zero() {
        let mut config = Config::default();
        config.transport.stall_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stall_timeout_too_high() {
        let mut config = Config::default();
        config.transport.stall_timeout_ms = 10_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_receipt_timeout_zero() {
        let mut config = Config::default();
        config.monitor.receipt_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_receipt_timeout_too_high() {
        let mut config = Config::default();
        config.monitor.receipt_timeout_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_interval_zero() {
        let mut config = Config::default();
        config.monitor.status_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_crc_parameters_accepted() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]

[transport]
crc_polynomial = 0x8005
crc_initial = 0
crc_final_xor = 0xFFFF

[monitor]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.transport.crc_polynomial, 0x8005);
        assert_eq!(config.transport.crc_initial, 0);
        assert_eq!(config.transport.crc_final_xor, 0xFFFF);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_baud_rate(), 115_200);
        assert_eq!(default_rx_buffer_size(), 1024);
        assert_eq!(default_stall_timeout_ms(), 20);
        assert_eq!(default_crc_polynomial(), 0x1021);
        assert_eq!(default_crc_initial(), 0xFFFF);
        assert_eq!(default_crc_final_xor(), 0x0000);
        assert_eq!(default_receipt_timeout_ms(), 200);
        assert_eq!(default_status_interval(), 100);
    }
}
