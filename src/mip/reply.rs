//! Decoding of command reply fields
//!
//! Every command reply carries an ACK/NACK field (0xF1) echoing the command
//! descriptor. Some commands add a data field after it.

use super::constants::*;
use super::protocol::RxPacket;
use crate::error::{Error, Result};
use serde::Serialize;

/// ACK/NACK field contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckNack {
    /// Echoed command descriptor
    pub command: u8,
    /// 0x00 on success, MIP error code otherwise
    pub code: u8,
}

impl AckNack {
    #[inline]
    pub fn is_ack(&self) -> bool {
        self.code == ACK_OK
    }

    /// Human readable error code
    pub fn code_name(&self) -> &'static str {
        match self.code {
            ACK_OK => "ok",
            NACK_UNKNOWN_COMMAND => "unknown command",
            NACK_INVALID_CHECKSUM => "invalid checksum",
            NACK_INVALID_PARAMETER => "invalid parameter",
            NACK_COMMAND_FAILED => "command failed",
            NACK_COMMAND_TIMEOUT => "command timed out",
            _ => "unknown error",
        }
    }
}

/// Find the ACK/NACK for `command` in a reply packet of `descriptor_set`
pub fn find_ack(packet: &RxPacket, descriptor_set: u8, command: u8) -> Option<AckNack> {
    if packet.descriptor_set() != descriptor_set {
        return None;
    }
    packet
        .fields()
        .filter(|f| f.descriptor == FIELD_ACK_NACK && f.data.len() >= 2)
        .map(|f| AckNack {
            command: f.data[0],
            code: f.data[1],
        })
        .find(|ack| ack.command == command)
}

/// Device information (Get Device Information reply)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub firmware_version: u16,
    pub model_name: String,
    pub model_number: String,
    pub serial_number: String,
    pub lot_number: String,
    pub device_options: String,
}

impl DeviceInfo {
    /// Parse the 0x81 reply field
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < DEVICE_INFO_REPLY_SIZE {
            return Err(Error::InvalidPacket(format!(
                "device info field too short: {} bytes",
                data.len()
            )));
        }

        let text = |index: usize| {
            let start = 2 + index * DEVICE_INFO_STRING_LEN;
            let raw = &data[start..start + DEVICE_INFO_STRING_LEN];
            String::from_utf8_lossy(raw)
                .trim_matches(|c: char| c == ' ' || c == '\0')
                .to_string()
        };

        Ok(Self {
            firmware_version: u16::from_be_bytes([data[0], data[1]]),
            model_name: text(0),
            model_number: text(1),
            serial_number: text(2),
            lot_number: text(3),
            device_options: text(4),
        })
    }

    /// Firmware version as major.minor.patch (e.g. 8118 -> "8.1.18")
    pub fn firmware_version_string(&self) -> String {
        let v = self.firmware_version;
        format!("{}.{}.{:02}", v / 1000, (v / 100) % 10, v % 100)
    }
}

/// Parse the 0x83 IMU base rate reply field
pub fn parse_base_rate(data: &[u8]) -> Result<u16> {
    match data {
        [hi, lo, ..] => {
            let rate = u16::from_be_bytes([*hi, *lo]);
            if rate == 0 {
                Err(Error::InvalidPacket("IMU base rate of 0 Hz".to_string()))
            } else {
                Ok(rate)
            }
        }
        _ => Err(Error::InvalidPacket(format!(
            "base rate field too short: {} bytes",
            data.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(s: &str) -> [u8; DEVICE_INFO_STRING_LEN] {
        let mut out = [b' '; DEVICE_INFO_STRING_LEN];
        out[..s.len()].copy_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_find_ack_matches_command() {
        let packet = RxPacket::from_payload(
            DESC_SET_3DM,
            &[0x04, FIELD_ACK_NACK, CMD_CONTINUOUS_DATA_STREAM, NACK_INVALID_PARAMETER],
        );

        let ack = find_ack(&packet, DESC_SET_3DM, CMD_CONTINUOUS_DATA_STREAM).unwrap();
        assert!(!ack.is_ack());
        assert_eq!(ack.code_name(), "invalid parameter");

        assert!(find_ack(&packet, DESC_SET_3DM, CMD_IMU_MESSAGE_FORMAT).is_none());
        assert!(find_ack(&packet, DESC_SET_BASE, CMD_CONTINUOUS_DATA_STREAM).is_none());
    }

    #[test]
    fn test_device_info_parse() {
        let mut data = Vec::new();
        data.extend_from_slice(&8118u16.to_be_bytes());
        data.extend_from_slice(&padded("3DM-GX5-25"));
        data.extend_from_slice(&padded("6251-4220"));
        data.extend_from_slice(&padded("6251.12345"));
        data.extend_from_slice(&padded("I042Y"));
        data.extend_from_slice(&padded("5g, 300dps"));

        let info = DeviceInfo::parse(&data).unwrap();
        assert_eq!(info.model_name, "3DM-GX5-25");
        assert_eq!(info.serial_number, "6251.12345");
        assert_eq!(info.device_options, "5g, 300dps");
        assert_eq!(info.firmware_version_string(), "8.1.18");
    }

    #[test]
    fn test_device_info_too_short() {
        assert!(matches!(
            DeviceInfo::parse(&[0x1F, 0xB6]),
            Err(Error::InvalidPacket(_))
        ));
    }

    #[test]
    fn test_base_rate() {
        assert_eq!(parse_base_rate(&[0x03, 0xE8]).unwrap(), 1000);
        assert!(parse_base_rate(&[0x00, 0x00]).is_err());
        assert!(parse_base_rate(&[0x03]).is_err());
    }
}
