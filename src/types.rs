//! Reading types returned by the AHRS client

use serde::Serialize;
use std::fmt;

/// Radians to degrees
pub const RAD_TO_DEG: f64 = 57.295779513;

/// Roll, pitch and yaw
///
/// Radians unless produced by [`Rpy::to_degrees`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rpy {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Rpy {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Same attitude expressed in degrees
    pub fn to_degrees(&self) -> Self {
        Self {
            roll: self.roll * RAD_TO_DEG,
            pitch: self.pitch * RAD_TO_DEG,
            yaw: self.yaw * RAD_TO_DEG,
        }
    }
}

impl fmt::Display for Rpy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AHRS RPY | Roll: {:3.4}, Pitch: {:3.4}, Yaw: {:3.4}",
            self.roll, self.pitch, self.yaw
        )
    }
}

/// Scaled accelerometer (g) and gyroscope (rad/s) vectors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RawImu {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl RawImu {
    pub fn new(accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self {
            ax: accel[0],
            ay: accel[1],
            az: accel[2],
            gx: gyro[0],
            gy: gyro[1],
            gz: gyro[2],
        }
    }
}

impl fmt::Display for RawImu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AHRS Raw | AX: {:3.2}, AY: {:3.2}, AZ: {:3.2}, GX: {:3.2}, GY: {:3.2}, GZ: {:3.2}",
            self.ax, self.ay, self.az, self.gx, self.gy, self.gz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_degrees() {
        let rpy = Rpy::new(std::f64::consts::FRAC_PI_2, -1.0, 0.0).to_degrees();
        assert!((rpy.roll - 90.0).abs() < 1e-6);
        assert!((rpy.pitch + 57.295779513).abs() < 1e-12);
        assert_eq!(rpy.yaw, 0.0);
    }

    #[test]
    fn test_rpy_display() {
        let rpy = Rpy::new(1.5, -0.25, 180.0);
        assert_eq!(
            rpy.to_string(),
            "AHRS RPY | Roll: 1.5000, Pitch: -0.2500, Yaw: 180.0000"
        );
    }

    #[test]
    fn test_raw_display() {
        let raw = RawImu::new([0.0, 0.01, -1.0], [0.1, 0.2, 0.3]);
        assert_eq!(
            raw.to_string(),
            "AHRS Raw | AX: 0.00, AY: 0.01, AZ: -1.00, GX: 0.10, GY: 0.20, GZ: 0.30"
        );
    }
}
