//! # Frame Reception State Machine
//!
//! Incremental, byte-by-byte frame parser. Bytes arrive in arbitrary
//! chunks from the serial port; the receiver tracks reception progress
//! across calls and emits a complete, CRC-validated payload once the
//! whole frame has been consumed.
//!
//! Reception stages: start-byte search, payload size byte, COBS packet
//! accumulation, checksum postamble, validation. A stall timeout bounds
//! how long a partially received frame may sit in flight before the
//! receiver resynchronizes on the next start byte.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use super::ring::RingBuffer;
use crate::error::{LinkError, Result};
use crate::frame::cobs;
use crate::frame::codec::{FrameCodec, MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE, POSTAMBLE_SIZE, START_BYTE};

/// Default stall timeout for partially received frames
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(20);

/// Reception progress of the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Scanning the stream for the start byte
    AwaitStart,
    /// Start byte found, waiting for the payload size byte
    AwaitSize,
    /// Accumulating the COBS packet (overhead through delimiter)
    AwaitPacket,
    /// Packet complete, collecting the checksum postamble
    AwaitPostamble,
}

/// Incremental frame receiver
#[derive(Debug)]
pub struct FrameReceiver {
    codec: FrameCodec,
    stall_timeout: Duration,
    stage: Stage,
    packet: Vec<u8>,
    packet_size: usize,
    postamble: [u8; POSTAMBLE_SIZE],
    postamble_len: usize,
    last_byte_at: Option<Instant>,
}

impl FrameReceiver {
    /// Create a receiver using the given codec and stall timeout
    pub fn new(codec: FrameCodec, stall_timeout: Duration) -> Self {
        Self {
            codec,
            stall_timeout,
            stage: Stage::AwaitStart,
            packet: Vec::with_capacity(MAX_PAYLOAD_SIZE + cobs::COBS_OVERHEAD),
            packet_size: 0,
            postamble: [0; POSTAMBLE_SIZE],
            postamble_len: 0,
            last_byte_at: None,
        }
    }

    /// Whether a frame is partially received
    pub fn mid_frame(&self) -> bool {
        self.stage != Stage::AwaitStart
    }

    /// Discard any partially received frame and resynchronize
    pub fn reset(&mut self) {
        self.stage = Stage::AwaitStart;
        self.packet.clear();
        self.packet_size = 0;
        self.postamble_len = 0;
        self.last_byte_at = None;
    }

    /// Consume buffered bytes, returning a validated payload if a frame
    /// completed
    ///
    /// Returns `Ok(None)` when the buffer is drained without completing a
    /// frame. Reception state is kept across calls, so the next call picks
    /// up where this one stopped.
    ///
    /// # Errors
    ///
    /// On any error the partial frame is discarded and the receiver
    /// resynchronizes on the next start byte. Errors are:
    /// - [`LinkError::Timeout`] if a partial frame stalled longer than the
    ///   configured timeout with no new bytes available
    /// - [`LinkError::Frame`] for an invalid payload size byte
    /// - [`LinkError::CrcMismatch`] for a corrupted packet
    /// - [`LinkError::Cobs`] if the validated packet fails to decode
    pub fn consume(&mut self, ring: &mut RingBuffer) -> Result<Option<Bytes>> {
        if self.mid_frame() && ring.is_empty() {
            if let Some(last) = self.last_byte_at {
                if last.elapsed() > self.stall_timeout {
                    self.reset();
                    return Err(LinkError::Timeout(format!(
                        "no frame bytes received for over {:?}",
                        self.stall_timeout
                    )));
                }
            }
            return Ok(None);
        }

        while let Some(byte) = ring.pop() {
            self.last_byte_at = Some(Instant::now());

            match self.stage {
                Stage::AwaitStart => {
                    if byte == START_BYTE {
                        self.stage = Stage::AwaitSize;
                    } else {
                        // Noise between frames is expected and silently dropped
                        trace!("discarded non-start byte 0x{:02X}", byte);
                    }
                }

                Stage::AwaitSize => {
                    let size = byte as usize;
                    if !(MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&size) {
                        self.reset();
                        return Err(LinkError::Frame(format!(
                            "invalid payload size byte: {}",
                            size
                        )));
                    }
                    self.packet_size = size + cobs::COBS_OVERHEAD;
                    self.stage = Stage::AwaitPacket;
                }

                Stage::AwaitPacket => {
                    self.packet.push(byte);
                    if self.packet.len() == self.packet_size {
                        self.stage = Stage::AwaitPostamble;
                    }
                }

                Stage::AwaitPostamble => {
                    self.postamble[self.postamble_len] = byte;
                    self.postamble_len += 1;
                    if self.postamble_len == POSTAMBLE_SIZE {
                        let result = self.finish_frame();
                        self.reset();
                        return result.map(Some);
                    }
                }
            }
        }

        Ok(None)
    }

    /// Validate and decode the fully accumulated frame
    fn finish_frame(&mut self) -> Result<Bytes> {
        let received = u16::from_le_bytes(self.postamble);
        let expected = self.codec.crc().checksum(&self.packet);
        if received != expected {
            return Err(LinkError::CrcMismatch { expected, received });
        }

        let payload = cobs::decode(&self.packet)?;
        trace!("received validated {}-byte payload", payload.len());
        Ok(Bytes::from(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver() -> FrameReceiver {
        FrameReceiver::new(FrameCodec::default(), DEFAULT_STALL_TIMEOUT)
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        FrameCodec::default().encode(payload).unwrap()
    }

    #[test]
    fn test_receive_complete_frame() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(64);
        ring.extend(&frame(&[8, 88, 221, 2, 0]));

        let payload = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&payload[..], &[8, 88, 221, 2, 0]);
        assert!(!rx.mid_frame());
    }

    #[test]
    fn test_receive_across_chunks() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(64);
        let bytes = frame(&[1, 2, 3, 4]);

        // Deliver the frame one byte at a time
        for &byte in &bytes[..bytes.len() - 1] {
            ring.push(byte);
            assert!(rx.consume(&mut ring).unwrap().is_none());
        }
        ring.push(bytes[bytes.len() - 1]);

        let payload = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&payload[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_resynchronizes_after_noise() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(64);
        ring.extend(&[0x00, 0x55, 0xAA]);
        ring.extend(&frame(&[9, 9, 9]));

        let payload = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&payload[..], &[9, 9, 9]);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(128);
        ring.extend(&frame(&[1]));
        ring.extend(&frame(&[2, 2]));

        let first = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&first[..], &[1]);
        let second = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&second[..], &[2, 2]);
        assert!(rx.consume(&mut ring).unwrap().is_none());
    }

    #[test]
    fn test_rejects_invalid_size_byte() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(16);
        ring.extend(&[START_BYTE, 0]);

        assert!(matches!(rx.consume(&mut ring), Err(LinkError::Frame(_))));
        assert!(!rx.mid_frame());
    }

    #[test]
    fn test_rejects_corrupted_frame_then_recovers() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(128);

        let mut bad = frame(&[5, 6, 7]);
        let index = bad.len() - 1;
        bad[index] ^= 0xFF;
        ring.extend(&bad);
        ring.extend(&frame(&[10, 20]));

        assert!(matches!(
            rx.consume(&mut ring),
            Err(LinkError::CrcMismatch { .. })
        ));

        // The good frame behind the corrupted one still comes through
        let payload = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&payload[..], &[10, 20]);
    }

    #[test]
    fn test_stall_timeout_resets_partial_frame() {
        let mut rx = FrameReceiver::new(FrameCodec::default(), Duration::from_millis(5));
        let mut ring = RingBuffer::with_capacity(64);

        let bytes = frame(&[1, 2, 3]);
        ring.extend(&bytes[..4]); // partial frame
        assert!(rx.consume(&mut ring).unwrap().is_none());
        assert!(rx.mid_frame());

        std::thread::sleep(Duration::from_millis(10));
        assert!(matches!(rx.consume(&mut ring), Err(LinkError::Timeout(_))));
        assert!(!rx.mid_frame());

        // A fresh complete frame is received normally afterwards
        ring.extend(&frame(&[4, 5]));
        let payload = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&payload[..], &[4, 5]);
    }

    #[test]
    fn test_no_timeout_when_idle_between_frames() {
        let mut rx = FrameReceiver::new(FrameCodec::default(), Duration::from_millis(1));
        let mut ring = RingBuffer::with_capacity(16);

        std::thread::sleep(Duration::from_millis(5));
        // Idle with no partial frame in flight is not an error
        assert!(rx.consume(&mut ring).unwrap().is_none());
    }

    #[test]
    fn test_empty_buffer_returns_none() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(16);
        assert!(rx.consume(&mut ring).unwrap().is_none());
    }

    #[test]
    fn test_maximum_size_frame() {
        let mut rx = receiver();
        let mut ring = RingBuffer::with_capacity(512);
        let payload = vec![0xAB; MAX_PAYLOAD_SIZE];
        ring.extend(&frame(&payload));

        let received = rx.consume(&mut ring).unwrap().unwrap();
        assert_eq!(&received[..], &payload[..]);
    }
}
