//! Outgoing MIP packets
//!
//! Packet format: [0x75 0x65] [DESC_SET] [PAYLOAD_LEN] [FIELDS...] [CK_MSB] [CK_LSB]
//!
//! Each field inside the payload is [FIELD_LEN] [FIELD_DESC] [DATA], where
//! FIELD_LEN counts its own two header bytes.
//!
//! # Pattern
//!
//! ```ignore
//! let mut pkt = TxPacket::new();   // Create once per node
//! pkt.set_ping();
//! pkt.send_to(&mut transport)?;
//! pkt.set_continuous_stream(true); // Reuse for the next command
//! pkt.send_to(&mut transport)?;
//! ```

use super::constants::*;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// 16-bit Fletcher checksum used by MIP
///
/// Computed over every packet byte from the first sync byte up to (not
/// including) the checksum itself. The MSB is the running sum, the LSB the
/// sum of sums.
pub fn checksum(data: &[u8]) -> u16 {
    let (sum, sum_of_sums) = data.iter().fold((0u8, 0u8), |(a, b), &byte| {
        let a = a.wrapping_add(byte);
        (a, b.wrapping_add(a))
    });
    u16::from_be_bytes([sum, sum_of_sums])
}

/// Reusable TX packet buffer for all MIP commands
pub struct TxPacket {
    data: [u8; MAX_PACKET_SIZE],
    len: usize,
}

impl TxPacket {
    /// Create new packet with sync bytes pre-filled
    pub const fn new() -> Self {
        let mut data = [0u8; MAX_PACKET_SIZE];
        data[0] = SYNC_BYTE_1;
        data[1] = SYNC_BYTE_2;
        Self { data, len: 0 }
    }

    /// Get packet bytes for sending
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Descriptor set of the packet currently held
    #[inline]
    pub fn descriptor_set(&self) -> u8 {
        self.data[2]
    }

    /// Send packet to a transport
    #[inline]
    pub fn send_to<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<()> {
        transport.write_all(self.as_bytes())
    }

    // ========================================================================
    // Generic building
    // ========================================================================

    /// Start an empty packet for `descriptor_set`
    pub fn begin(&mut self, descriptor_set: u8) {
        self.data[2] = descriptor_set;
        self.data[3] = 0;
        self.len = HEADER_SIZE;
    }

    /// Append a field to the payload
    pub fn push_field(&mut self, descriptor: u8, field_data: &[u8]) -> Result<()> {
        let field_len = FIELD_HEADER_SIZE + field_data.len();
        let payload_len = self.data[3] as usize;
        if field_len > u8::MAX as usize || payload_len + field_len > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidParameter(format!(
                "field 0x{:02X} of {} bytes does not fit in the payload ({} bytes used)",
                descriptor,
                field_data.len(),
                payload_len
            )));
        }
        self.write_field(descriptor, field_data);
        Ok(())
    }

    /// Append the checksum; the packet is ready to send afterwards
    pub fn finish(&mut self) {
        let crc = checksum(&self.data[..self.len]);
        self.data[self.len..self.len + CHECKSUM_SIZE].copy_from_slice(&crc.to_be_bytes());
        self.len += CHECKSUM_SIZE;
    }

    /// Caller guarantees the field fits
    #[inline]
    fn write_field(&mut self, descriptor: u8, field_data: &[u8]) {
        let field_len = FIELD_HEADER_SIZE + field_data.len();
        let start = self.len;
        self.data[start] = field_len as u8;
        self.data[start + 1] = descriptor;
        self.data[start + FIELD_HEADER_SIZE..start + field_len].copy_from_slice(field_data);
        self.len += field_len;
        self.data[3] += field_len as u8;
    }

    #[inline]
    fn set_command(&mut self, descriptor_set: u8, command: u8, field_data: &[u8]) {
        self.begin(descriptor_set);
        self.write_field(command, field_data);
        self.finish();
    }

    // ========================================================================
    // Base Commands (0x01)
    // ========================================================================

    /// Ping (0x01, 0x01)
    #[inline]
    pub fn set_ping(&mut self) {
        self.set_command(DESC_SET_BASE, CMD_PING, &[]);
    }

    /// Set To Idle (0x01, 0x02) - stops streaming, node accepts configuration
    #[inline]
    pub fn set_idle(&mut self) {
        self.set_command(DESC_SET_BASE, CMD_SET_IDLE, &[]);
    }

    /// Get Device Information (0x01, 0x03)
    #[inline]
    pub fn set_device_info_request(&mut self) {
        self.set_command(DESC_SET_BASE, CMD_GET_DEVICE_INFO, &[]);
    }

    /// Resume (0x01, 0x06) - return to the mode active before idle
    #[inline]
    pub fn set_resume(&mut self) {
        self.set_command(DESC_SET_BASE, CMD_RESUME, &[]);
    }

    // ========================================================================
    // 3DM Commands (0x0C)
    // ========================================================================

    /// Get IMU Data Base Rate (0x0C, 0x06)
    #[inline]
    pub fn set_imu_base_rate_request(&mut self) {
        self.set_command(DESC_SET_3DM, CMD_GET_IMU_BASE_RATE, &[]);
    }

    /// IMU Message Format (0x0C, 0x08), function "use new settings"
    ///
    /// Each entry is (IMU data field descriptor, rate decimation).
    pub fn set_imu_message_format(&mut self, fields: &[(u8, u16)]) -> Result<()> {
        let mut field_data = [0u8; MAX_PAYLOAD_SIZE];
        let data_len = 2 + fields.len() * 3;
        if data_len + FIELD_HEADER_SIZE > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidParameter(format!(
                "too many channel fields in one message format: {}",
                fields.len()
            )));
        }

        field_data[0] = FUNCTION_APPLY;
        field_data[1] = fields.len() as u8;
        for (i, &(descriptor, decimation)) in fields.iter().enumerate() {
            let at = 2 + i * 3;
            field_data[at] = descriptor;
            field_data[at + 1..at + 3].copy_from_slice(&decimation.to_be_bytes());
        }

        self.set_command(
            DESC_SET_3DM,
            CMD_IMU_MESSAGE_FORMAT,
            &field_data[..data_len],
        );
        Ok(())
    }

    /// Enable/Disable Continuous Data Stream (0x0C, 0x11) for the IMU
    #[inline]
    pub fn set_continuous_stream(&mut self, enable: bool) {
        self.set_command(
            DESC_SET_3DM,
            CMD_CONTINUOUS_DATA_STREAM,
            &[FUNCTION_APPLY, STREAM_DEVICE_IMU, u8::from(enable)],
        );
    }
}

impl Default for TxPacket {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_value() {
        // Ping as documented for the 3DM-GX5: 75 65 01 02 02 01 E0 C6
        assert_eq!(checksum(&[0x75, 0x65, 0x01, 0x02, 0x02, 0x01]), 0xE0C6);
        assert_eq!(checksum(&[]), 0x0000);
    }

    #[test]
    fn test_ping_packet() {
        let mut pkt = TxPacket::new();
        pkt.set_ping();
        assert_eq!(
            pkt.as_bytes(),
            &[0x75, 0x65, 0x01, 0x02, 0x02, 0x01, 0xE0, 0xC6]
        );
    }

    #[test]
    fn test_idle_and_resume_packets() {
        let mut pkt = TxPacket::new();
        pkt.set_idle();
        assert_eq!(
            pkt.as_bytes(),
            &[0x75, 0x65, 0x01, 0x02, 0x02, 0x02, 0xE1, 0xC7]
        );

        pkt.set_resume();
        assert_eq!(
            pkt.as_bytes(),
            &[0x75, 0x65, 0x01, 0x02, 0x02, 0x06, 0xE5, 0xCB]
        );
    }

    #[test]
    fn test_enable_stream_packet() {
        let mut pkt = TxPacket::new();
        pkt.set_continuous_stream(true);
        assert_eq!(
            pkt.as_bytes(),
            &[0x75, 0x65, 0x0C, 0x05, 0x05, 0x11, 0x01, 0x01, 0x01, 0x04, 0x1A]
        );
    }

    #[test]
    fn test_message_format_layout() {
        let mut pkt = TxPacket::new();
        pkt.set_imu_message_format(&[(0x0C, 10), (0x04, 10), (0x05, 10)])
            .unwrap();
        let bytes = pkt.as_bytes();

        // Header + field(2 + 2 + 3*3) + checksum
        assert_eq!(bytes.len(), 4 + 13 + 2);
        assert_eq!(bytes[2], DESC_SET_3DM);
        assert_eq!(bytes[3], 13); // payload length
        assert_eq!(bytes[4], 13); // field length
        assert_eq!(bytes[5], CMD_IMU_MESSAGE_FORMAT);
        assert_eq!(bytes[6], FUNCTION_APPLY);
        assert_eq!(bytes[7], 3);
        assert_eq!(&bytes[8..11], &[0x0C, 0x00, 0x0A]);

        let crc = checksum(&bytes[..bytes.len() - 2]);
        assert_eq!(&bytes[bytes.len() - 2..], &crc.to_be_bytes());
    }

    #[test]
    fn test_generic_multi_field_packet() {
        let mut pkt = TxPacket::new();
        pkt.begin(DESC_SET_BASE);
        pkt.push_field(FIELD_ACK_NACK, &[CMD_GET_DEVICE_INFO, ACK_OK])
            .unwrap();
        pkt.push_field(REPLY_DEVICE_INFO, &[0u8; DEVICE_INFO_REPLY_SIZE])
            .unwrap();
        pkt.finish();

        assert_eq!(pkt.descriptor_set(), DESC_SET_BASE);
        assert_eq!(
            pkt.as_bytes()[3] as usize,
            4 + 2 + DEVICE_INFO_REPLY_SIZE
        );
    }

    #[test]
    fn test_push_field_rejects_overflow() {
        let mut pkt = TxPacket::new();
        pkt.begin(DESC_SET_IMU_DATA);
        pkt.push_field(0x04, &[0u8; 200]).unwrap();
        assert!(matches!(
            pkt.push_field(0x05, &[0u8; 60]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_packet_reuse() {
        let mut pkt = TxPacket::new();
        pkt.set_imu_message_format(&[(0x0C, 1), (0x04, 1)]).unwrap();
        assert_eq!(pkt.as_bytes().len(), 16);

        pkt.set_ping();
        assert_eq!(pkt.as_bytes().len(), 8);
        assert_eq!(pkt.as_bytes()[3], 0x02);
    }
}
