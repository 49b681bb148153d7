//! Polling AHRS client
//!
//! Opens the node, requests the configured channels and, on every
//! [`Ahrs::update`], reads the latest data packets and extracts roll/pitch/yaw
//! and the scaled accelerometer/gyroscope vectors by channel name.

use crate::channels::{DataPacket, MipChannel, SampleRate};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::mip::DeviceInfo;
use crate::node::InertialNode;
use crate::transport::{SerialTransport, Transport};
use crate::types::{RawImu, Rpy};
use std::time::Duration;

const RPY_CHANNELS: [&str; 3] = ["roll", "pitch", "yaw"];
const ACCEL_CHANNELS: [&str; 3] = ["scaledAccelX", "scaledAccelY", "scaledAccelZ"];
const GYRO_CHANNELS: [&str; 3] = ["scaledGyroX", "scaledGyroY", "scaledGyroZ"];

/// MicroStrain AHRS polled from the caller's thread
///
/// # Example
///
/// ```no_run
/// use mip_ahrs::{Ahrs, AppConfig};
///
/// # fn main() -> mip_ahrs::Result<()> {
/// let mut ahrs = Ahrs::open(&AppConfig::default())?;
/// let (rpy, raw) = ahrs.update(true)?;
/// println!("{}", rpy);
/// println!("{}", raw);
/// # Ok(())
/// # }
/// ```
pub struct Ahrs<T: Transport = SerialTransport> {
    node: InertialNode<T>,
    read_timeout: Duration,
    /// Packets from the last read; `None` until the first read
    latest_packets: Option<Vec<DataPacket>>,
}

impl Ahrs<SerialTransport> {
    /// Open the serial port from `config` and start streaming
    pub fn open(config: &AppConfig) -> Result<Self> {
        let transport = SerialTransport::open(&config.device.port, config.device.baud_rate)?;
        Self::with_transport(transport, config)
    }
}

impl<T: Transport> Ahrs<T> {
    /// Start streaming over an already opened transport
    ///
    /// Sequence: ping, idle, message format, enable stream, resume.
    pub fn with_transport(transport: T, config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let mut node = InertialNode::new(
            transport,
            Duration::from_millis(config.device.command_timeout_ms),
        );

        if !node.ping()? {
            return Err(Error::ConnectionFailed(
                "Unable to establish a connection with the Microstrain AHRS.".to_string(),
            ));
        }
        log::info!("Connected to node on {}", config.device.port);

        node.set_to_idle()?;

        let rate = SampleRate::hertz(config.sampling.sample_rate_hz);
        let channels: Vec<MipChannel> = config
            .sampling
            .channels
            .iter()
            .map(|&field| MipChannel::new(field, rate))
            .collect();
        node.set_active_channel_fields(&channels)?;
        node.enable_data_stream(true)?;
        node.resume()?;

        Ok(Self {
            node,
            read_timeout: Duration::from_millis(config.sampling.read_timeout_ms),
            latest_packets: None,
        })
    }

    /// Query model, serial number and firmware version
    pub fn device_info(&mut self) -> Result<DeviceInfo> {
        self.node.get_device_info()
    }

    /// Borrow the node for commands this client does not wrap
    pub fn node_mut(&mut self) -> &mut InertialNode<T> {
        &mut self.node
    }

    /// Read the latest packets from the node
    pub fn read(&mut self) -> Result<()> {
        let packets = self.node.get_data_packets(self.read_timeout)?;
        log::trace!("Read {} data packets", packets.len());
        self.latest_packets = Some(packets);
        Ok(())
    }

    /// Read the latest packets and return (attitude, raw IMU)
    ///
    /// Channels missing from the read are reported as 0.0.
    pub fn update(&mut self, degrees: bool) -> Result<(Rpy, RawImu)> {
        self.read()?;

        let rpy = if degrees {
            self.get_rpy_deg()
        } else {
            self.get_rpy_rad()
        };
        let raw = self.get_raw_data();

        Ok((rpy.unwrap_or_default(), raw.unwrap_or_default()))
    }

    /// Values for `names` from the last read
    ///
    /// `None` before the first read. Each channel defaults to 0.0; when a
    /// channel appears in several packets the last one wins.
    pub fn latest_data(&self, names: &[&str]) -> Option<Vec<f64>> {
        let packets = self.latest_packets.as_ref()?;

        let mut measurements = vec![0.0; names.len()];
        for point in packets.iter().flat_map(|p| p.data()) {
            for (slot, &name) in measurements.iter_mut().zip(names) {
                if name == point.channel_name() {
                    *slot = point.as_float();
                }
            }
        }
        Some(measurements)
    }

    /// Roll, pitch and yaw in radians
    pub fn get_rpy_rad(&self) -> Option<Rpy> {
        let data = self.latest_data(&RPY_CHANNELS)?;
        Some(Rpy::new(data[0], data[1], data[2]))
    }

    /// Roll, pitch and yaw in degrees
    pub fn get_rpy_deg(&self) -> Option<Rpy> {
        self.get_rpy_rad().map(|rpy| rpy.to_degrees())
    }

    /// Scaled accelerometer and gyroscope vectors
    pub fn get_raw_data(&self) -> Option<RawImu> {
        let accel = self.latest_data(&ACCEL_CHANNELS)?;
        let gyro = self.latest_data(&GYRO_CHANNELS)?;
        Some(RawImu::new(
            [accel[0], accel[1], accel[2]],
            [gyro[0], gyro[1], gyro[2]],
        ))
    }

    /// Stop streaming and idle the node
    pub fn shutdown(&mut self) -> Result<()> {
        self.node.enable_data_stream(false)?;
        self.node.set_to_idle()?;
        log::info!("AHRS stream stopped");
        Ok(())
    }
}

impl<T: Transport> Drop for Ahrs<T> {
    fn drop(&mut self) {
        if let Err(e) = self.node.send_idle() {
            log::debug!("Failed to idle node on drop: {}", e);
        }
    }
}
