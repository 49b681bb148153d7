//! MIP protocol constants (3DM-GX5 family)

// Sync bytes
pub const SYNC_BYTE_1: u8 = 0x75; // 'u'
pub const SYNC_BYTE_2: u8 = 0x65; // 'e'

// Packet layout
pub const HEADER_SIZE: usize = 4; // SYNC(2) + DESC_SET(1) + PAYLOAD_LEN(1)
pub const CHECKSUM_SIZE: usize = 2;
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;
pub const MAX_PAYLOAD_SIZE: usize = 255;
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CHECKSUM_SIZE;
pub const FIELD_HEADER_SIZE: usize = 2; // FIELD_LEN(1) + FIELD_DESC(1)

// Descriptor sets
pub const DESC_SET_BASE: u8 = 0x01;
pub const DESC_SET_3DM: u8 = 0x0C;
pub const DESC_SET_IMU_DATA: u8 = 0x80;

// Base command set (0x01)
pub const CMD_PING: u8 = 0x01;
pub const CMD_SET_IDLE: u8 = 0x02;
pub const CMD_GET_DEVICE_INFO: u8 = 0x03;
pub const CMD_RESUME: u8 = 0x06;
pub const REPLY_DEVICE_INFO: u8 = 0x81;

// 3DM command set (0x0C)
pub const CMD_GET_IMU_BASE_RATE: u8 = 0x06;
pub const CMD_IMU_MESSAGE_FORMAT: u8 = 0x08;
pub const CMD_CONTINUOUS_DATA_STREAM: u8 = 0x11;
pub const REPLY_IMU_BASE_RATE: u8 = 0x83;

// Reply field present in every command response
pub const FIELD_ACK_NACK: u8 = 0xF1;

// Function selectors
pub const FUNCTION_APPLY: u8 = 0x01;

// Continuous data stream device selector
pub const STREAM_DEVICE_IMU: u8 = 0x01;

// ACK/NACK error codes
pub const ACK_OK: u8 = 0x00;
pub const NACK_UNKNOWN_COMMAND: u8 = 0x01;
pub const NACK_INVALID_CHECKSUM: u8 = 0x02;
pub const NACK_INVALID_PARAMETER: u8 = 0x03;
pub const NACK_COMMAND_FAILED: u8 = 0x04;
pub const NACK_COMMAND_TIMEOUT: u8 = 0x05;

// Device info reply layout
pub const DEVICE_INFO_STRING_LEN: usize = 16;
pub const DEVICE_INFO_REPLY_SIZE: usize = 2 + 5 * DEVICE_INFO_STRING_LEN;

// Reader sizing
pub const READ_CHUNK_SIZE: usize = 512;
pub const RX_BUFFER_SIZE: usize = 4096;
