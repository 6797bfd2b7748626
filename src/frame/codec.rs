//! # Frame Codec
//!
//! Builds and parses complete serial frames.
//!
//! Frame layout on the wire:
//!
//! ```text
//! | start byte | payload size | overhead | encoded payload ... | delimiter | crc lo | crc hi |
//! ```
//!
//! The start byte (129) and the payload size byte form the preamble. The
//! COBS packet (overhead byte through delimiter) carries the payload, and
//! the CRC-16 checksum of that packet follows as a little-endian postamble.
//! The payload size byte always holds the *decoded* payload size.

use super::cobs;
use super::crc::Crc16;
use crate::error::{LinkError, Result};

/// Start byte marking the beginning of every frame (0x81)
pub const START_BYTE: u8 = 129;

/// Minimum payload size carried by a frame, in bytes
pub const MIN_PAYLOAD_SIZE: usize = cobs::COBS_MIN_PAYLOAD_SIZE;

/// Maximum payload size carried by a frame, in bytes
pub const MAX_PAYLOAD_SIZE: usize = cobs::COBS_MAX_PAYLOAD_SIZE;

/// Preamble size: start byte + payload size byte
pub const PREAMBLE_SIZE: usize = 2;

/// Postamble size: the serialized CRC-16 checksum
pub const POSTAMBLE_SIZE: usize = 2;

/// Smallest complete frame: preamble + encoded 1-byte payload + postamble
pub const MIN_FRAME_SIZE: usize =
    PREAMBLE_SIZE + MIN_PAYLOAD_SIZE + cobs::COBS_OVERHEAD + POSTAMBLE_SIZE;

/// Largest complete frame: preamble + encoded 254-byte payload + postamble
pub const MAX_FRAME_SIZE: usize =
    PREAMBLE_SIZE + MAX_PAYLOAD_SIZE + cobs::COBS_OVERHEAD + POSTAMBLE_SIZE;

/// Frame codec pairing the COBS transform with a CRC engine
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    crc: Crc16,
}

impl FrameCodec {
    /// Create a codec using the given CRC engine
    pub fn new(crc: Crc16) -> Self {
        Self { crc }
    }

    /// The CRC engine used for frame postambles
    pub fn crc(&self) -> &Crc16 {
        &self.crc
    }

    /// Encode a payload into a complete, transmittable frame
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Cobs`] if the payload is empty or exceeds
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let packet = cobs::encode(payload)?;
        let checksum = self.crc.checksum(&packet);

        let mut frame = Vec::with_capacity(PREAMBLE_SIZE + packet.len() + POSTAMBLE_SIZE);
        frame.push(START_BYTE);
        frame.push(payload.len() as u8);
        frame.extend_from_slice(&packet);
        frame.extend_from_slice(&checksum.to_le_bytes());

        Ok(frame)
    }

    /// Decode a complete frame back into its payload
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The frame is shorter than [`MIN_FRAME_SIZE`] or truncated
    /// - The start byte is incorrect
    /// - The payload size byte is zero
    /// - The CRC check fails
    /// - COBS decoding fails
    pub fn decode(&self, frame: &[u8]) -> Result<Vec<u8>> {
        if frame.len() < MIN_FRAME_SIZE {
            return Err(LinkError::Frame(format!(
                "frame too short: {} bytes, minimum is {}",
                frame.len(),
                MIN_FRAME_SIZE
            )));
        }

        if frame[0] != START_BYTE {
            return Err(LinkError::Frame(format!(
                "invalid start byte: 0x{:02X}, expected 0x{:02X}",
                frame[0], START_BYTE
            )));
        }

        let payload_size = frame[1] as usize;
        if payload_size < MIN_PAYLOAD_SIZE {
            return Err(LinkError::Frame(
                "payload size byte is zero".to_string(),
            ));
        }

        let packet_size = payload_size + cobs::COBS_OVERHEAD;
        let expected = PREAMBLE_SIZE + packet_size + POSTAMBLE_SIZE;
        if frame.len() != expected {
            return Err(LinkError::Frame(format!(
                "frame size mismatch: expected {} bytes, got {}",
                expected,
                frame.len()
            )));
        }

        let packet = &frame[PREAMBLE_SIZE..PREAMBLE_SIZE + packet_size];
        let checksum_bytes = &frame[PREAMBLE_SIZE + packet_size..expected];
        let received = u16::from_le_bytes([checksum_bytes[0], checksum_bytes[1]]);
        let expected_crc = self.crc.checksum(packet);

        if received != expected_crc {
            return Err(LinkError::CrcMismatch {
                expected: expected_crc,
                received,
            });
        }

        cobs::decode(packet)
    }
}
