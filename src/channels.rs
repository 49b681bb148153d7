//! IMU data channels (descriptor set 0x80)
//!
//! A channel field is one MIP data field (e.g. Euler angles) that expands to
//! one or more named scalar data points (`roll`, `pitch`, `yaw`).

use crate::error::{Error, Result};
use crate::mip::RxPacket;
use crate::mip::constants::DESC_SET_IMU_DATA;
use serde::{Deserialize, Serialize};

/// IMU data set field that can be streamed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelField {
    /// Scaled accelerometer vector (g)
    ScaledAccel,
    /// Scaled gyroscope vector (rad/s)
    ScaledGyro,
    /// Scaled magnetometer vector (Gauss)
    ScaledMag,
    /// Delta theta vector (rad)
    DeltaTheta,
    /// Delta velocity vector (g*s)
    DeltaVelocity,
    /// Orientation quaternion (w, x, y, z)
    OrientationQuaternion,
    /// Roll, pitch, yaw (rad)
    EulerAngles,
    /// Internal timestamp (ticks)
    InternalTimestamp,
    /// Scaled ambient pressure (mBar)
    ScaledAmbientPressure,
}

/// How the field data is laid out on the wire
#[derive(Clone, Copy)]
enum Encoding {
    /// Big-endian IEEE-754 f32 per channel
    Float,
    /// Big-endian u32 per channel
    Unsigned,
}

impl ChannelField {
    pub const ALL: [ChannelField; 9] = [
        ChannelField::ScaledAccel,
        ChannelField::ScaledGyro,
        ChannelField::ScaledMag,
        ChannelField::DeltaTheta,
        ChannelField::DeltaVelocity,
        ChannelField::OrientationQuaternion,
        ChannelField::EulerAngles,
        ChannelField::InternalTimestamp,
        ChannelField::ScaledAmbientPressure,
    ];

    /// Field descriptor within the IMU data set
    pub const fn descriptor(self) -> u8 {
        match self {
            ChannelField::ScaledAccel => 0x04,
            ChannelField::ScaledGyro => 0x05,
            ChannelField::ScaledMag => 0x06,
            ChannelField::DeltaTheta => 0x07,
            ChannelField::DeltaVelocity => 0x08,
            ChannelField::OrientationQuaternion => 0x0A,
            ChannelField::EulerAngles => 0x0C,
            ChannelField::InternalTimestamp => 0x0E,
            ChannelField::ScaledAmbientPressure => 0x17,
        }
    }

    pub fn from_descriptor(descriptor: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.descriptor() == descriptor)
    }

    /// Names of the data points this field expands to, in wire order
    pub const fn channel_names(self) -> &'static [&'static str] {
        match self {
            ChannelField::ScaledAccel => &["scaledAccelX", "scaledAccelY", "scaledAccelZ"],
            ChannelField::ScaledGyro => &["scaledGyroX", "scaledGyroY", "scaledGyroZ"],
            ChannelField::ScaledMag => &["scaledMagX", "scaledMagY", "scaledMagZ"],
            ChannelField::DeltaTheta => &["deltaThetaX", "deltaThetaY", "deltaThetaZ"],
            ChannelField::DeltaVelocity => &["deltaVelX", "deltaVelY", "deltaVelZ"],
            ChannelField::OrientationQuaternion => &[
                "orientQuaternionW",
                "orientQuaternionX",
                "orientQuaternionY",
                "orientQuaternionZ",
            ],
            ChannelField::EulerAngles => &["roll", "pitch", "yaw"],
            ChannelField::InternalTimestamp => &["internalTimestamp"],
            ChannelField::ScaledAmbientPressure => &["scaledAmbientPressure"],
        }
    }

    fn encoding(self) -> Encoding {
        match self {
            ChannelField::InternalTimestamp => Encoding::Unsigned,
            _ => Encoding::Float,
        }
    }

    /// Expected length of the field data
    pub fn data_len(self) -> usize {
        self.channel_names().len() * 4
    }

    /// Decode field data into named data points
    pub fn decode(self, data: &[u8]) -> Result<Vec<DataPoint>> {
        if data.len() != self.data_len() {
            return Err(Error::InvalidPacket(format!(
                "{:?} field has {} bytes, expected {}",
                self,
                data.len(),
                self.data_len()
            )));
        }

        let encoding = self.encoding();
        Ok(self
            .channel_names()
            .iter()
            .zip(data.chunks_exact(4))
            .map(|(&channel_name, chunk)| {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                let value = match encoding {
                    Encoding::Float => f64::from(f32::from_be_bytes(raw)),
                    Encoding::Unsigned => f64::from(u32::from_be_bytes(raw)),
                };
                DataPoint {
                    channel_name,
                    value,
                }
            })
            .collect())
    }
}

/// Requested sample rate for a channel field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRate {
    hertz: u16,
}

impl SampleRate {
    pub const fn hertz(hertz: u16) -> Self {
        Self { hertz }
    }

    pub const fn as_hertz(self) -> u16 {
        self.hertz
    }

    /// Rate decimation relative to the node's base rate
    ///
    /// Rates that do not divide the base rate are rounded down to the next
    /// achievable rate.
    pub fn decimation(self, base_rate: u16) -> Result<u16> {
        if self.hertz == 0 || self.hertz > base_rate {
            return Err(Error::InvalidParameter(format!(
                "sample rate {} Hz not achievable with base rate {} Hz",
                self.hertz, base_rate
            )));
        }
        let decimation = base_rate / self.hertz;
        if base_rate % self.hertz != 0 {
            log::warn!(
                "{} Hz does not divide base rate {} Hz, streaming at {} Hz",
                self.hertz,
                base_rate,
                base_rate / decimation
            );
        }
        Ok(decimation)
    }
}

/// A channel field requested at a sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipChannel {
    pub field: ChannelField,
    pub rate: SampleRate,
}

impl MipChannel {
    pub const fn new(field: ChannelField, rate: SampleRate) -> Self {
        Self { field, rate }
    }
}

/// One named scalar from a data packet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub channel_name: &'static str,
    pub value: f64,
}

impl DataPoint {
    #[inline]
    pub fn channel_name(&self) -> &'static str {
        self.channel_name
    }

    #[inline]
    pub fn as_float(&self) -> f64 {
        self.value
    }
}

/// Decoded IMU data packet
#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
    points: Vec<DataPoint>,
}

impl DataPacket {
    /// Decode every known field of an IMU data packet
    ///
    /// Unknown descriptors and fields with the wrong length are skipped.
    pub fn from_rx(packet: &RxPacket) -> Self {
        debug_assert_eq!(packet.descriptor_set(), DESC_SET_IMU_DATA);

        let mut points = Vec::new();
        for field in packet.fields() {
            let Some(channel) = ChannelField::from_descriptor(field.descriptor) else {
                log::trace!("Ignoring IMU data field 0x{:02X}", field.descriptor);
                continue;
            };
            match channel.decode(field.data) {
                Ok(decoded) => points.extend(decoded),
                Err(e) => log::warn!("Dropping field: {}", e),
            }
        }

        Self { points }
    }

    /// Data points in wire order
    #[inline]
    pub fn data(&self) -> &[DataPoint] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn test_descriptor_lookup() {
        for field in ChannelField::ALL {
            assert_eq!(ChannelField::from_descriptor(field.descriptor()), Some(field));
        }
        assert_eq!(ChannelField::from_descriptor(0xFF), None);
    }

    #[test]
    fn test_decode_euler_angles() {
        let points = ChannelField::EulerAngles
            .decode(&floats(&[0.1, -0.2, 3.0]))
            .unwrap();
        let names: Vec<_> = points.iter().map(|p| p.channel_name()).collect();
        assert_eq!(names, ["roll", "pitch", "yaw"]);
        assert!((points[1].as_float() + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_timestamp_is_unsigned() {
        let points = ChannelField::InternalTimestamp
            .decode(&0xFFFF_FFF0u32.to_be_bytes())
            .unwrap();
        assert_eq!(points[0].as_float(), 4_294_967_280.0);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(ChannelField::ScaledGyro.decode(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_decimation() {
        assert_eq!(SampleRate::hertz(100).decimation(1000).unwrap(), 10);
        assert_eq!(SampleRate::hertz(1000).decimation(1000).unwrap(), 1);
        assert_eq!(SampleRate::hertz(300).decimation(1000).unwrap(), 3);
        assert!(SampleRate::hertz(0).decimation(1000).is_err());
        assert!(SampleRate::hertz(2000).decimation(1000).is_err());
    }

    #[test]
    fn test_data_packet_skips_unknown_and_bad_fields() {
        let mut payload = vec![14, 0x04];
        payload.extend(floats(&[0.0, 0.0, -1.0]));
        payload.extend([4, 0x99, 0xAA, 0xBB]); // unknown descriptor
        payload.extend([6, 0x05, 0, 0, 0, 0]); // gyro with truncated data
        let rx = RxPacket::from_payload(DESC_SET_IMU_DATA, &payload);

        let packet = DataPacket::from_rx(&rx);
        assert_eq!(packet.data().len(), 3);
        assert_eq!(packet.data()[2].channel_name, "scaledAccelZ");
        assert_eq!(packet.data()[2].value, -1.0);
    }

    #[test]
    fn test_channel_field_serde_names() {
        let json = serde_json::to_string(&ChannelField::OrientationQuaternion).unwrap();
        assert_eq!(json, "\"orientation_quaternion\"");
    }
}
