//! # Transport Module
//!
//! Byte-level transport between the serial port and the message layer.
//!
//! This module handles:
//! - Buffering raw serial reads in a fixed-capacity ring buffer
//! - Incremental frame reception with stall-timeout recovery
//! - Encoding outbound payloads into transmittable frames

pub mod receiver;
pub mod ring;

use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::error::Result;
use crate::frame::codec::FrameCodec;
use receiver::{FrameReceiver, DEFAULT_STALL_TIMEOUT};
use ring::RingBuffer;

/// Default reception buffer capacity in bytes
///
/// Sized to hold several maximum-size frames so a slow poll loop does not
/// immediately drop bytes.
pub const DEFAULT_RX_BUFFER_SIZE: usize = 1024;

/// Bidirectional transport layer
///
/// Owns the reception path (ring buffer plus frame receiver) and the frame
/// codec used for both directions. The transport is I/O-agnostic: the
/// caller feeds it raw received bytes and writes the frames it encodes.
#[derive(Debug)]
pub struct TransportLayer {
    codec: FrameCodec,
    rx_buffer: RingBuffer,
    receiver: FrameReceiver,
}

impl Default for TransportLayer {
    fn default() -> Self {
        Self::new(
            FrameCodec::default(),
            DEFAULT_RX_BUFFER_SIZE,
            DEFAULT_STALL_TIMEOUT,
        )
    }
}

impl TransportLayer {
    /// Create a transport layer
    ///
    /// # Arguments
    ///
    /// * `codec` - Frame codec shared by the send and receive paths
    /// * `rx_capacity` - Reception ring buffer capacity in bytes
    /// * `stall_timeout` - How long a partial frame may stall before being
    ///   discarded
    pub fn new(codec: FrameCodec, rx_capacity: usize, stall_timeout: Duration) -> Self {
        Self {
            receiver: FrameReceiver::new(codec.clone(), stall_timeout),
            rx_buffer: RingBuffer::with_capacity(rx_capacity),
            codec,
        }
    }

    /// Encode a payload into a complete frame ready for transmission
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.codec.encode(payload)
    }

    /// Feed raw bytes read from the serial port into the reception buffer
    ///
    /// Returns the number of bytes accepted. Bytes that do not fit are
    /// dropped; the resulting torn frame will fail its CRC check and be
    /// discarded by the receiver.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.rx_buffer.extend(bytes);
        if accepted < bytes.len() {
            warn!(
                "reception buffer full, dropped {} of {} bytes",
                bytes.len() - accepted,
                bytes.len()
            );
        }
        accepted
    }

    /// Advance reception and return the next validated payload, if any
    ///
    /// See [`FrameReceiver::consume`] for the error contract; after any
    /// error the transport has already resynchronized and can keep
    /// receiving.
    pub fn poll(&mut self) -> Result<Option<Bytes>> {
        self.receiver.consume(&mut self.rx_buffer)
    }

    /// Number of buffered bytes not yet consumed by the receiver
    pub fn pending_bytes(&self) -> usize {
        self.rx_buffer.len()
    }

    /// Whether a frame is partially received
    pub fn mid_frame(&self) -> bool {
        self.receiver.mid_frame()
    }

    /// Discard all buffered bytes and any partial frame
    pub fn reset(&mut self) {
        self.rx_buffer.clear();
        self.receiver.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback() {
        let mut transport = TransportLayer::default();
        let frame = transport.encode(&[8, 88, 221, 2, 0]).unwrap();

        assert_eq!(transport.feed(&frame), frame.len());
        let payload = transport.poll().unwrap().unwrap();
        assert_eq!(&payload[..], &[8, 88, 221, 2, 0]);
        assert_eq!(transport.pending_bytes(), 0);
    }

    #[test]
    fn test_feed_reports_dropped_bytes() {
        let mut transport = TransportLayer::new(
            FrameCodec::default(),
            8,
            DEFAULT_STALL_TIMEOUT,
        );
        assert_eq!(transport.feed(&[0; 16]), 8);
    }

    #[test]
    fn test_poll_empty_transport() {
        let mut transport = TransportLayer::default();
        assert!(transport.poll().unwrap().is_none());
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut transport = TransportLayer::default();
        let frame = transport.encode(&[1, 2, 3]).unwrap();

        transport.feed(&frame[..4]);
        assert!(transport.poll().unwrap().is_none());
        assert!(transport.mid_frame());

        transport.reset();
        assert!(!transport.mid_frame());
        assert_eq!(transport.pending_bytes(), 0);

        // Reception works normally after a reset
        transport.feed(&frame);
        let payload = transport.poll().unwrap().unwrap();
        assert_eq!(&payload[..], &[1, 2, 3]);
    }

    #[test]
    fn test_multiple_frames_one_feed() {
        let mut transport = TransportLayer::default();
        let mut stream = transport.encode(&[1]).unwrap();
        stream.extend(transport.encode(&[2, 3]).unwrap());
        stream.extend(transport.encode(&[4, 5, 6]).unwrap());

        transport.feed(&stream);
        assert_eq!(&transport.poll().unwrap().unwrap()[..], &[1]);
        assert_eq!(&transport.poll().unwrap().unwrap()[..], &[2, 3]);
        assert_eq!(&transport.poll().unwrap().unwrap()[..], &[4, 5, 6]);
        assert!(transport.poll().unwrap().is_none());
    }
}
