//! # Error Types
//!
//! Custom error types for mcu-link using `thiserror`.

use thiserror::Error;

/// Main error type for mcu-link
#[derive(Debug, Error)]
pub enum LinkError {
    /// COBS encoding/decoding errors
    #[error("COBS error: {0}")]
    Cobs(String),

    /// Checksum mismatch on a received frame
    #[error("CRC mismatch: expected 0x{expected:04X}, got 0x{received:04X}")]
    CrcMismatch { expected: u16, received: u16 },

    /// Frame construction/parsing errors
    #[error("frame error: {0}")]
    Frame(String),

    /// Frame reception timed out mid-packet
    #[error("packet reception stalled: {0}")]
    Timeout(String),

    /// Message-layer errors (unknown protocol codes, malformed payloads)
    #[error("message error: {0}")]
    Message(String),

    /// Serial port errors
    #[error("serial error: {0}")]
    Serial(String),

    /// No usable serial device found among the candidate paths
    #[error("no serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for mcu-link
pub type Result<T> = std::result::Result<T, LinkError>;
