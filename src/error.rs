//! Error types for mip-ahrs

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mip-ahrs error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or written
    #[error("Config error: {0}")]
    Config(String),

    /// No reply from the node before the command timeout
    #[error("Communication timeout")]
    Timeout,

    /// Fletcher checksum mismatch
    #[error("Checksum error: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumError {
        /// Checksum computed over the received bytes
        expected: u16,
        /// Checksum carried by the packet
        actual: u16,
    },

    /// Invalid packet or reply field
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Node rejected a command
    #[error(
        "Command 0x{descriptor_set:02X}/0x{command:02X} rejected by node (error code 0x{code:02X})"
    )]
    Nack {
        /// Command descriptor set
        descriptor_set: u8,
        /// Command field descriptor
        command: u8,
        /// MIP error code from the ACK/NACK field
        code: u8,
    },

    /// Node did not answer the initial ping
    #[error("{0}")]
    ConnectionFailed(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON serialization failed: {}", e))
    }
}
