//! Configuration for the mip-ahrs client
//!
//! Loads configuration from a TOML file. Every section has defaults matching
//! a 3DM-GX5-AHRS on `/dev/ttyACM0` streaming at 100 Hz.

use crate::channels::ChannelField;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub sampling: SamplingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Serial connection to the node
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port path (e.g., "/dev/ttyACM0")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// How long to wait for an ACK/NACK after sending a command
    pub command_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            command_timeout_ms: 1000,
        }
    }
}

/// Data channels requested from the node
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Output rate of every requested channel
    pub sample_rate_hz: u16,
    /// Channel fields to stream, e.g. `["euler_angles", "scaled_accel"]`
    pub channels: Vec<ChannelField>,
    /// Upper bound on how long `update` waits for a data packet
    pub read_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100,
            channels: vec![
                ChannelField::EulerAngles,
                ChannelField::ScaledAccel,
                ChannelField::ScaledGyro,
            ],
            read_timeout_ms: 500,
        }
    }
}

/// Which reading the demo loop prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowReading {
    #[default]
    Rpy,
    Raw,
    Both,
}

/// Line format of the demo loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Single status line rewritten in place
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Demo loop output
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report roll/pitch/yaw in degrees instead of radians
    pub degrees: bool,
    pub show: ShowReading,
    pub format: OutputFormat,
    /// Pause between updates
    pub interval_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            degrees: true,
            show: ShowReading::Rpy,
            format: OutputFormat::Text,
            interval_ms: 2,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use mip_ahrs::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("mip-ahrs.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load and validate configuration
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the node cannot be configured with
    pub fn validate(&self) -> Result<()> {
        if self.device.baud_rate == 0 {
            return Err(Error::InvalidParameter("baud_rate must be > 0".to_string()));
        }
        if self.sampling.sample_rate_hz == 0 {
            return Err(Error::InvalidParameter(
                "sample_rate_hz must be > 0".to_string(),
            ));
        }
        if self.sampling.channels.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one channel must be requested".to_string(),
            ));
        }
        Ok(())
    }
}
