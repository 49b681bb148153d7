//! mip-ahrs - Polling client for Parker-LORD MicroStrain AHRS IMUs
//!
//! Talks the MicroStrain Inertial Protocol (MIP) over a serial port,
//! streams Euler angles and scaled accelerometer/gyroscope vectors, and
//! exposes the latest values by channel name.
//!
//! ## Layers
//!
//! - [`transport`]: serial port and in-memory mock
//! - [`mip`]: packet framing, checksum, reply decoding
//! - [`channels`]: IMU data fields and their named data points
//! - [`node`]: command/ACK exchange and data packet collection
//! - [`ahrs`]: roll/pitch/yaw and raw IMU readings

pub mod ahrs;
pub mod channels;
pub mod config;
pub mod error;
pub mod mip;
pub mod node;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use ahrs::Ahrs;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::{RawImu, Rpy};
