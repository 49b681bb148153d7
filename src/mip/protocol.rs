//! Incoming MIP packet parsing
//!
//! This module provides:
//! - `PacketReader`: Ring-buffer based parser that resynchronises on sync bytes
//! - `RxPacket`: Parsed packet with fixed-size payload buffer
//! - `Fields`: Iterator over the fields of a payload
//!
//! For sending commands, use `TxPacket` from `packet.rs`.

use super::constants::{
    CHECKSUM_SIZE, FIELD_HEADER_SIZE, HEADER_SIZE, MAX_PAYLOAD_SIZE, MIN_PACKET_SIZE,
    READ_CHUNK_SIZE, RX_BUFFER_SIZE, SYNC_BYTE_1, SYNC_BYTE_2,
};
use super::packet::checksum;
use super::ring_buffer::RingBuffer;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Parsed packet from the node
#[derive(Debug, Clone, Copy)]
pub struct RxPacket {
    descriptor_set: u8,
    payload: [u8; MAX_PAYLOAD_SIZE],
    payload_len: usize,
}

impl RxPacket {
    /// Create a new empty packet
    #[inline]
    pub const fn new() -> Self {
        Self {
            descriptor_set: 0,
            payload: [0u8; MAX_PAYLOAD_SIZE],
            payload_len: 0,
        }
    }

    /// Build a packet from a descriptor set and a raw payload
    pub fn from_payload(descriptor_set: u8, data: &[u8]) -> Self {
        let mut packet = Self::new();
        packet.set(descriptor_set, data);
        packet
    }

    #[inline]
    pub fn descriptor_set(&self) -> u8 {
        self.descriptor_set
    }

    /// Get the payload as a slice
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// Iterate over the fields of the payload
    #[inline]
    pub fn fields(&self) -> Fields<'_> {
        Fields {
            payload: self.payload(),
            pos: 0,
        }
    }

    /// First field with the given descriptor
    pub fn field(&self, descriptor: u8) -> Option<Field<'_>> {
        self.fields().find(|f| f.descriptor == descriptor)
    }

    #[inline]
    fn set(&mut self, descriptor_set: u8, data: &[u8]) {
        self.descriptor_set = descriptor_set;
        let len = data.len().min(MAX_PAYLOAD_SIZE);
        self.payload[..len].copy_from_slice(&data[..len]);
        self.payload_len = len;
    }
}

impl Default for RxPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// One field of a packet payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub descriptor: u8,
    pub data: &'a [u8],
}

/// Iterator over payload fields
///
/// Stops at the first field whose length byte is inconsistent with the
/// payload; the fields before it are still yielded.
pub struct Fields<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.payload.len().saturating_sub(self.pos);
        if remaining < FIELD_HEADER_SIZE {
            return None;
        }

        let field_len = self.payload[self.pos] as usize;
        if field_len < FIELD_HEADER_SIZE || field_len > remaining {
            log::warn!(
                "Malformed field at offset {}: len={}, remaining={}",
                self.pos,
                field_len,
                remaining
            );
            self.pos = self.payload.len();
            return None;
        }

        let field = Field {
            descriptor: self.payload[self.pos + 1],
            data: &self.payload[self.pos + FIELD_HEADER_SIZE..self.pos + field_len],
        };
        self.pos += field_len;
        Some(field)
    }
}

/// Ring-buffer based packet reader
pub struct PacketReader {
    buffer: RingBuffer<RX_BUFFER_SIZE>,
    checksum_errors: u64,
}

impl PacketReader {
    pub fn new() -> Self {
        Self {
            buffer: RingBuffer::new(),
            checksum_errors: 0,
        }
    }

    /// Read whatever the transport has into the buffer
    ///
    /// Returns the number of bytes read (0 on timeout).
    pub fn fill<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize> {
        let mut temp_buf = [0u8; READ_CHUNK_SIZE];
        let n = transport.read(&mut temp_buf)?;
        if n > 0 {
            self.extend(&temp_buf[..n]);
        }
        Ok(n)
    }

    /// Feed raw bytes directly (replay, tests)
    pub fn extend(&mut self, bytes: &[u8]) {
        let dropped = self.buffer.extend(bytes);
        if dropped > 0 {
            log::warn!("RX buffer full, dropped {} bytes", dropped);
        }
    }

    /// Number of packets discarded because of a checksum mismatch
    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors
    }

    /// Parse the next complete packet from the buffer
    pub fn next_packet(&mut self) -> Option<RxPacket> {
        loop {
            if self.buffer.len() < MIN_PACKET_SIZE {
                return None;
            }

            let Some(sync_idx) = self.buffer.find_pattern_2(SYNC_BYTE_1, SYNC_BYTE_2) else {
                // Keep the last byte in case it is the first half of a sync pair
                let keep = usize::from(self.buffer.get(self.buffer.len() - 1) == Some(SYNC_BYTE_1));
                self.buffer.advance(self.buffer.len() - keep);
                return None;
            };

            if sync_idx > 0 {
                log::trace!("Skipping {} bytes before sync", sync_idx);
                self.buffer.advance(sync_idx);
            }

            let payload_len = usize::from(self.buffer.get(3)?);
            let total_len = HEADER_SIZE + payload_len + CHECKSUM_SIZE;

            // Wait for complete packet
            if self.buffer.len() < total_len {
                return None;
            }

            if let Err(e) = self.verify_checksum(total_len) {
                self.checksum_errors += 1;
                log::warn!("{}", e);
                // Only skip the first sync byte; the length byte may be corrupt
                self.buffer.advance(1);
                continue;
            }

            let descriptor_set = self.buffer.get(2).unwrap_or(0);
            let packet = match self.buffer.get_slice(HEADER_SIZE, payload_len) {
                Some(payload) => RxPacket::from_payload(descriptor_set, payload),
                None => RxPacket::from_payload(descriptor_set, &[]),
            };

            self.buffer.advance(total_len);
            return Some(packet);
        }
    }

    fn verify_checksum(&mut self, total_len: usize) -> Result<()> {
        let received = u16::from_be_bytes([
            self.buffer.get(total_len - 2).unwrap_or(0),
            self.buffer.get(total_len - 1).unwrap_or(0),
        ]);

        let expected = self
            .buffer
            .get_slice(0, total_len - CHECKSUM_SIZE)
            .map(checksum)
            .unwrap_or(0);

        if expected == received {
            Ok(())
        } else {
            Err(Error::ChecksumError {
                expected,
                actual: received,
            })
        }
    }
}

impl Default for PacketReader {
    fn default() -> Self {
        Self::new()
    }
}
