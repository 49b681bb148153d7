//! MicroStrain Inertial Protocol (MIP) framing
//!
//! Only the subset needed to configure and stream the IMU data set:
//! base commands (ping, idle, resume, device info), 3DM message format and
//! continuous stream control, and reply/ACK decoding.

pub mod constants;
pub mod packet;
pub mod protocol;
pub mod reply;
mod ring_buffer;

pub use packet::{TxPacket, checksum};
pub use protocol::{Field, PacketReader, RxPacket};
pub use reply::{AckNack, DeviceInfo};
