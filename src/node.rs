//! Inertial node: command/reply exchange and data packet collection
//!
//! All I/O happens on the caller's thread. A command is written, then the
//! reader is pumped until the matching ACK/NACK arrives or the command
//! timeout expires. Data packets that arrive meanwhile are queued and handed
//! out by the next [`InertialNode::get_data_packets`] call.

use crate::channels::{DataPacket, MipChannel};
use crate::error::{Error, Result};
use crate::mip::constants::*;
use crate::mip::reply::{self, DeviceInfo};
use crate::mip::{PacketReader, RxPacket, TxPacket};
use crate::transport::Transport;
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

/// Sleep between reads when the transport has nothing buffered
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Data packets kept while nobody polls (about 10 s at 100 Hz)
const MAX_PENDING_PACKETS: usize = 1000;

/// Non-data packets kept while searching for a reply
const MAX_PENDING_REPLIES: usize = 32;

/// A MIP node reached through a transport
pub struct InertialNode<T: Transport> {
    transport: T,
    reader: PacketReader,
    tx: TxPacket,
    command_timeout: Duration,
    /// IMU data packets not yet handed out
    pending: VecDeque<DataPacket>,
    /// Reply packets not yet matched to a command
    replies: VecDeque<RxPacket>,
}

impl<T: Transport> InertialNode<T> {
    pub fn new(transport: T, command_timeout: Duration) -> Self {
        Self {
            transport,
            reader: PacketReader::new(),
            tx: TxPacket::new(),
            command_timeout,
            pending: VecDeque::new(),
            replies: VecDeque::new(),
        }
    }

    /// Packets dropped by the reader on checksum mismatch
    pub fn checksum_errors(&self) -> u64 {
        self.reader.checksum_errors()
    }

    // ========================================================================
    // Base commands
    // ========================================================================

    /// Check that the node answers
    ///
    /// A NACK or a missing reply yields `Ok(false)`; only transport failures
    /// are errors.
    pub fn ping(&mut self) -> Result<bool> {
        self.tx.set_ping();
        match self.exchange(DESC_SET_BASE, CMD_PING) {
            Ok(_) => Ok(true),
            Err(e @ (Error::Timeout | Error::Nack { .. })) => {
                log::warn!("Ping failed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Put the node in idle; streaming stops until resumed
    pub fn set_to_idle(&mut self) -> Result<()> {
        self.tx.set_idle();
        self.exchange(DESC_SET_BASE, CMD_SET_IDLE)?;
        log::debug!("Node set to idle");
        Ok(())
    }

    /// Return the node to the mode it was in before idle
    pub fn resume(&mut self) -> Result<()> {
        self.tx.set_resume();
        self.exchange(DESC_SET_BASE, CMD_RESUME)?;
        log::debug!("Node resumed");
        Ok(())
    }

    /// Send Set To Idle without waiting for the reply
    pub fn send_idle(&mut self) -> Result<()> {
        self.tx.set_idle();
        self.tx.send_to(&mut self.transport)
    }

    pub fn get_device_info(&mut self) -> Result<DeviceInfo> {
        self.tx.set_device_info_request();
        let packet = self.exchange(DESC_SET_BASE, CMD_GET_DEVICE_INFO)?;
        let field = packet
            .field(REPLY_DEVICE_INFO)
            .ok_or_else(|| Error::InvalidPacket("device info reply field missing".to_string()))?;
        DeviceInfo::parse(field.data)
    }

    // ========================================================================
    // 3DM commands
    // ========================================================================

    /// Rate (Hz) that IMU decimations are relative to
    pub fn get_imu_base_rate(&mut self) -> Result<u16> {
        self.tx.set_imu_base_rate_request();
        let packet = self.exchange(DESC_SET_3DM, CMD_GET_IMU_BASE_RATE)?;
        let field = packet
            .field(REPLY_IMU_BASE_RATE)
            .ok_or_else(|| Error::InvalidPacket("base rate reply field missing".to_string()))?;
        reply::parse_base_rate(field.data)
    }

    /// Replace the IMU message format with `channels`
    pub fn set_active_channel_fields(&mut self, channels: &[MipChannel]) -> Result<()> {
        if channels.is_empty() {
            return Err(Error::InvalidParameter(
                "no channel fields requested".to_string(),
            ));
        }

        let base_rate = self.get_imu_base_rate()?;
        log::debug!("IMU base rate: {} Hz", base_rate);

        let fields = channels
            .iter()
            .map(|ch| Ok((ch.field.descriptor(), ch.rate.decimation(base_rate)?)))
            .collect::<Result<Vec<_>>>()?;

        self.tx.set_imu_message_format(&fields)?;
        self.exchange(DESC_SET_3DM, CMD_IMU_MESSAGE_FORMAT)?;

        for ch in channels {
            log::info!(
                "Channel {:?} active at {} Hz",
                ch.field,
                ch.rate.as_hertz()
            );
        }
        Ok(())
    }

    /// Enable or disable the continuous IMU data stream
    pub fn enable_data_stream(&mut self, enable: bool) -> Result<()> {
        self.tx.set_continuous_stream(enable);
        self.exchange(DESC_SET_3DM, CMD_CONTINUOUS_DATA_STREAM)?;
        log::info!(
            "IMU data stream {}",
            if enable { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Collect every data packet received so far
    ///
    /// Returns as soon as at least one packet is available; waits up to
    /// `timeout` otherwise and returns an empty list if none arrived.
    pub fn get_data_packets(&mut self, timeout: Duration) -> Result<Vec<DataPacket>> {
        let deadline = Instant::now() + timeout;
        loop {
            let received = self.pump()?;
            if !self.pending.is_empty() {
                return Ok(self.pending.drain(..).collect());
            }
            if Instant::now() >= deadline {
                log::debug!("No data packet within {:?}", timeout);
                return Ok(Vec::new());
            }
            if received == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Send the command held in `self.tx` and wait for its ACK/NACK
    ///
    /// Returns the whole reply packet so callers can read data fields.
    fn exchange(&mut self, descriptor_set: u8, command: u8) -> Result<RxPacket> {
        log::trace!("TX {:02X?}", self.tx.as_bytes());
        self.tx.send_to(&mut self.transport)?;

        let deadline = Instant::now() + self.command_timeout;
        loop {
            let received = self.pump()?;

            let matched = self
                .replies
                .iter()
                .position(|p| reply::find_ack(p, descriptor_set, command).is_some())
                .and_then(|index| self.replies.remove(index));

            if let Some(packet) = matched {
                let Some(ack) = reply::find_ack(&packet, descriptor_set, command) else {
                    continue;
                };
                if ack.is_ack() {
                    return Ok(packet);
                }
                log::warn!(
                    "Command 0x{:02X}/0x{:02X} NACK: {}",
                    descriptor_set,
                    command,
                    ack.code_name()
                );
                return Err(Error::Nack {
                    descriptor_set,
                    command,
                    code: ack.code,
                });
            }

            if Instant::now() >= deadline {
                log::warn!(
                    "No reply to command 0x{:02X}/0x{:02X} within {:?}",
                    descriptor_set,
                    command,
                    self.command_timeout
                );
                return Err(Error::Timeout);
            }
            if received == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Read what the transport has and sort parsed packets
    ///
    /// Keeps reading while full chunks come back so a backlog is drained in
    /// one call. Returns the number of bytes read.
    fn pump(&mut self) -> Result<usize> {
        let mut total = 0;
        loop {
            let n = self.reader.fill(&mut self.transport)?;
            total += n;

            while let Some(packet) = self.reader.next_packet() {
                self.dispatch(packet);
            }

            if n < READ_CHUNK_SIZE {
                return Ok(total);
            }
        }
    }

    fn dispatch(&mut self, packet: RxPacket) {
        if packet.descriptor_set() == DESC_SET_IMU_DATA {
            if self.pending.len() >= MAX_PENDING_PACKETS {
                self.pending.pop_front();
                log::debug!("Pending data queue full, dropped oldest packet");
            }
            self.pending.push_back(DataPacket::from_rx(&packet));
        } else {
            if self.replies.len() >= MAX_PENDING_REPLIES {
                self.replies.pop_front();
            }
            self.replies.push_back(packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelField, SampleRate};
    use crate::transport::MockTransport;

    fn reply(descriptor_set: u8, command: u8, code: u8, extra: Option<(u8, &[u8])>) -> Vec<u8> {
        let mut pkt = TxPacket::new();
        pkt.begin(descriptor_set);
        pkt.push_field(FIELD_ACK_NACK, &[command, code]).unwrap();
        if let Some((descriptor, data)) = extra {
            pkt.push_field(descriptor, data).unwrap();
        }
        pkt.finish();
        pkt.as_bytes().to_vec()
    }

    fn node(mock: &MockTransport) -> InertialNode<MockTransport> {
        InertialNode::new(mock.clone(), Duration::from_millis(20))
    }

    #[test]
    fn test_ping_ack() {
        let mock = MockTransport::new();
        mock.inject_read(&reply(DESC_SET_BASE, CMD_PING, ACK_OK, None));

        let mut node = node(&mock);
        assert!(node.ping().unwrap());
        assert_eq!(
            mock.get_written(),
            vec![0x75, 0x65, 0x01, 0x02, 0x02, 0x01, 0xE0, 0xC6]
        );
    }

    #[test]
    fn test_ping_without_reply_is_false() {
        let mock = MockTransport::new();
        let mut node = node(&mock);
        assert!(!node.ping().unwrap());
    }

    #[test]
    fn test_nack_is_error() {
        let mock = MockTransport::new();
        mock.inject_read(&reply(
            DESC_SET_3DM,
            CMD_CONTINUOUS_DATA_STREAM,
            NACK_INVALID_PARAMETER,
            None,
        ));

        let mut node = node(&mock);
        let err = node.enable_data_stream(true).unwrap_err();
        assert!(matches!(
            err,
            Error::Nack {
                descriptor_set: DESC_SET_3DM,
                command: CMD_CONTINUOUS_DATA_STREAM,
                code: NACK_INVALID_PARAMETER
            }
        ));
    }

    #[test]
    fn test_set_active_channel_fields_uses_base_rate() {
        let mock = MockTransport::new();
        mock.inject_read(&reply(
            DESC_SET_3DM,
            CMD_GET_IMU_BASE_RATE,
            ACK_OK,
            Some((REPLY_IMU_BASE_RATE, &500u16.to_be_bytes())),
        ));
        mock.inject_read(&reply(DESC_SET_3DM, CMD_IMU_MESSAGE_FORMAT, ACK_OK, None));

        let mut node = node(&mock);
        let channels = [
            MipChannel::new(ChannelField::EulerAngles, SampleRate::hertz(100)),
            MipChannel::new(ChannelField::ScaledAccel, SampleRate::hertz(50)),
        ];
        node.set_active_channel_fields(&channels).unwrap();

        let mut expected = TxPacket::new();
        expected.set_imu_base_rate_request();
        let mut written = expected.as_bytes().to_vec();
        expected
            .set_imu_message_format(&[(0x0C, 5), (0x04, 10)])
            .unwrap();
        written.extend_from_slice(expected.as_bytes());
        assert_eq!(mock.get_written(), written);
    }

    #[test]
    fn test_data_packets_received_during_command_are_kept() {
        let mock = MockTransport::new();
        let mut data = TxPacket::new();
        data.begin(DESC_SET_IMU_DATA);
        data.push_field(0x0C, &[0u8; 12]).unwrap();
        data.finish();

        mock.inject_read(data.as_bytes());
        mock.inject_read(&reply(DESC_SET_BASE, CMD_RESUME, ACK_OK, None));
        mock.inject_read(data.as_bytes());

        let mut node = node(&mock);
        node.resume().unwrap();

        let packets = node.get_data_packets(Duration::from_millis(5)).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].data()[0].channel_name, "roll");
    }

    #[test]
    fn test_get_data_packets_times_out_empty() {
        let mock = MockTransport::new();
        let mut node = node(&mock);
        let start = Instant::now();
        let packets = node.get_data_packets(Duration::from_millis(10)).unwrap();
        assert!(packets.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    fn euler_rx(roll: f32) -> RxPacket {
        let mut payload = vec![14, 0x0C];
        for v in [roll, 0.0, 0.0] {
            payload.extend(v.to_be_bytes());
        }
        RxPacket::from_payload(DESC_SET_IMU_DATA, &payload)
    }

    #[test]
    fn test_pending_data_drops_oldest() {
        let mock = MockTransport::new();
        let mut node = node(&mock);
        let extra = 5;
        for i in 0..MAX_PENDING_PACKETS + extra {
            node.dispatch(euler_rx(i as f32));
        }
        assert_eq!(node.pending.len(), MAX_PENDING_PACKETS);

        let packets = node.get_data_packets(Duration::from_millis(1)).unwrap();
        assert_eq!(packets.len(), MAX_PENDING_PACKETS);
        assert_eq!(packets[0].data()[0].value, extra as f64);
        let newest = packets[MAX_PENDING_PACKETS - 1].data()[0].value;
        assert_eq!(newest, (MAX_PENDING_PACKETS + extra - 1) as f64);
    }

    #[test]
    fn test_unmatched_replies_are_bounded() {
        let mock = MockTransport::new();
        let mut node = node(&mock);
        let extra = 8;
        for command in 0..(MAX_PENDING_REPLIES + extra) as u8 {
            let payload = [4, FIELD_ACK_NACK, command, ACK_OK];
            node.dispatch(RxPacket::from_payload(DESC_SET_BASE, &payload));
        }
        assert_eq!(node.replies.len(), MAX_PENDING_REPLIES);

        let oldest = &node.replies[0];
        assert!(reply::find_ack(oldest, DESC_SET_BASE, extra as u8).is_some());
        assert!(
            node.replies
                .iter()
                .all(|p| reply::find_ack(p, DESC_SET_BASE, 0).is_none())
        );
    }
}
