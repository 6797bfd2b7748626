//! # Link Session
//!
//! High-level bidirectional message exchange with the controller. A
//! session owns a serial port and a transport layer and moves typed
//! messages across them: outgoing messages are encoded and written as
//! frames, incoming frames are validated and decoded on demand.
//!
//! Messages with a non-zero return code request a delivery receipt; the
//! session can block on that receipt while preserving any unrelated
//! messages that arrive in the meantime.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{LinkError, Result};
use crate::message::{decode_message, encode_message, IncomingMessage, OutgoingMessage};
use crate::serial::port_trait::SerialPortIO;
use crate::transport::TransportLayer;

/// Serial read chunk size in bytes
///
/// Large enough to drain a full maximum-size frame in one read.
const READ_CHUNK_SIZE: usize = 512;

/// Default time to wait for a requested delivery receipt
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_millis(200);

/// Bidirectional message session over a serial port
pub struct LinkSession<P: SerialPortIO> {
    port: P,
    transport: TransportLayer,
    /// Messages received while waiting for a delivery receipt
    deferred: VecDeque<IncomingMessage>,
}

impl<P: SerialPortIO> LinkSession<P> {
    /// Create a session over an opened port
    pub fn new(port: P, transport: TransportLayer) -> Self {
        Self {
            port,
            transport,
            deferred: VecDeque::new(),
        }
    }

    /// Encode and transmit an outgoing message
    ///
    /// Fire-and-forget: a requested delivery receipt is not awaited here,
    /// it will surface through [`receive`](Self::receive) like any other
    /// incoming message.
    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<()> {
        let payload = encode_message(message)?;
        let frame = self.transport.encode(&payload)?;

        self.port.write_all(&frame).await?;
        self.port.flush().await?;
        debug!("sent {}-byte message frame", frame.len());
        Ok(())
    }

    /// Transmit a message and wait for its delivery receipt
    ///
    /// The message must carry a non-zero return code. Incoming messages
    /// that are not the awaited receipt are deferred and returned by
    /// later [`receive`](Self::receive) calls in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Timeout`] if the receipt does not arrive
    /// within `timeout`, and [`LinkError::Message`] if the controller
    /// echoes a different receipt code than requested.
    pub async fn send_with_receipt(
        &mut self,
        message: &OutgoingMessage,
        timeout: Duration,
    ) -> Result<()> {
        let expected = message.return_code();
        if expected == 0 {
            return Err(LinkError::Message(
                "a zero return code does not request a receipt".to_string(),
            ));
        }

        self.send(message).await?;

        tokio::time::timeout(timeout, self.await_receipt(expected))
            .await
            .map_err(|_| {
                LinkError::Timeout(format!(
                    "no delivery receipt for return code {} within {:?}",
                    expected, timeout
                ))
            })?
    }

    /// Receive the next incoming message
    ///
    /// Returns deferred messages first, then drains buffered frames, then
    /// awaits new serial data. Frame-level errors (CRC mismatch, stall
    /// timeout) propagate to the caller; the transport has already
    /// resynchronized, so the session stays usable.
    pub async fn receive(&mut self) -> Result<IncomingMessage> {
        if let Some(message) = self.deferred.pop_front() {
            return Ok(message);
        }
        self.receive_from_port().await
    }

    /// Consume incoming messages until the expected receipt arrives
    async fn await_receipt(&mut self, expected: u8) -> Result<()> {
        loop {
            match self.receive_from_port().await? {
                IncomingMessage::ReceptionCode(code) if code == expected => {
                    trace!("delivery receipt {} confirmed", code);
                    return Ok(());
                }
                IncomingMessage::ReceptionCode(code) => {
                    return Err(LinkError::Message(format!(
                        "unexpected delivery receipt: requested {}, got {}",
                        expected, code
                    )));
                }
                other => self.deferred.push_back(other),
            }
        }
    }

    /// Poll the transport, reading more serial data as needed
    async fn receive_from_port(&mut self) -> Result<IncomingMessage> {
        loop {
            if let Some(payload) = self.transport.poll()? {
                return decode_message(&payload);
            }

            let mut buf = [0u8; READ_CHUNK_SIZE];
            let count = self.port.read(&mut buf).await?;
            if count == 0 {
                return Err(LinkError::Serial("serial port closed".to_string()));
            }
            self.transport.feed(&buf[..count]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::protocol::{KernelCommand, KernelState, ModuleState};
    use crate::serial::port_trait::mocks::MockSerialPort;

    fn session(port: MockSerialPort) -> LinkSession<MockSerialPort> {
        LinkSession::new(port, TransportLayer::default())
    }

    /// Frame an incoming-message payload the way the controller would
    fn controller_frame(payload: &[u8]) -> Vec<u8> {
        TransportLayer::default().encode(payload).unwrap()
    }

    #[tokio::test]
    async fn test_send_writes_encoded_frame() {
        let port = MockSerialPort::new();
        let mut session = session(port.clone());

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 0,
            command: 2,
        });
        session.send(&message).await.unwrap();

        let written = port.get_written_data();
        assert_eq!(written.len(), 1);
        // The written frame decodes back to the message payload
        assert_eq!(written[0], controller_frame(&[4, 0, 2]));
    }

    #[tokio::test]
    async fn test_receive_decodes_incoming_frame() {
        let port = MockSerialPort::new();
        port.queue_read_data(&controller_frame(&[10, 2, 60]));
        let mut session = session(port);

        let message = session.receive().await.unwrap();
        assert_eq!(
            message,
            IncomingMessage::KernelState(KernelState { command: 2, event: 60 })
        );
    }

    #[tokio::test]
    async fn test_receive_across_split_reads() {
        let port = MockSerialPort::new();
        let frame = controller_frame(&[11, 42]);
        port.queue_read_data(&frame[..3]);
        port.queue_read_data(&frame[3..]);
        let mut session = session(port);

        let message = session.receive().await.unwrap();
        assert_eq!(message, IncomingMessage::ReceptionCode(42));
    }

    #[tokio::test]
    async fn test_send_with_receipt_confirms() {
        let port = MockSerialPort::new();
        port.queue_read_data(&controller_frame(&[11, 7]));
        let mut session = session(port);

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 7,
            command: 1,
        });
        session
            .send_with_receipt(&message, DEFAULT_RECEIPT_TIMEOUT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_with_receipt_defers_other_messages() {
        let port = MockSerialPort::new();
        // A state message arrives before the receipt
        port.queue_read_data(&controller_frame(&[9, 2, 1, 4, 105]));
        port.queue_read_data(&controller_frame(&[11, 7]));
        let mut session = session(port);

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 7,
            command: 1,
        });
        session
            .send_with_receipt(&message, DEFAULT_RECEIPT_TIMEOUT)
            .await
            .unwrap();

        // The deferred state message is still delivered, in order
        let deferred = session.receive().await.unwrap();
        assert_eq!(
            deferred,
            IncomingMessage::ModuleState(ModuleState {
                module_type: 2,
                module_id: 1,
                command: 4,
                event: 105,
            })
        );
    }

    #[tokio::test]
    async fn test_send_with_receipt_times_out() {
        let port = MockSerialPort::new();
        let mut session = session(port);

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 7,
            command: 1,
        });
        let result = session
            .send_with_receipt(&message, Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(LinkError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_send_with_receipt_rejects_zero_return_code() {
        let port = MockSerialPort::new();
        let mut session = session(port);

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 0,
            command: 1,
        });
        let result = session
            .send_with_receipt(&message, DEFAULT_RECEIPT_TIMEOUT)
            .await;
        assert!(matches!(result, Err(LinkError::Message(_))));
    }

    #[tokio::test]
    async fn test_send_with_receipt_mismatched_code() {
        let port = MockSerialPort::new();
        port.queue_read_data(&controller_frame(&[11, 9]));
        let mut session = session(port);

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 7,
            command: 1,
        });
        let result = session
            .send_with_receipt(&message, DEFAULT_RECEIPT_TIMEOUT)
            .await;
        assert!(matches!(result, Err(LinkError::Message(_))));
    }

    #[tokio::test]
    async fn test_receive_propagates_corrupted_frame() {
        let port = MockSerialPort::new();
        let mut bad = controller_frame(&[10, 2, 60]);
        let index = bad.len() - 1;
        bad[index] ^= 0xFF;
        port.queue_read_data(&bad);
        port.queue_read_data(&controller_frame(&[11, 3]));
        let mut session = session(port);

        assert!(matches!(
            session.receive().await,
            Err(LinkError::CrcMismatch { .. })
        ));

        // The session stays usable after a corrupted frame
        let message = session.receive().await.unwrap();
        assert_eq!(message, IncomingMessage::ReceptionCode(3));
    }

    #[tokio::test]
    async fn test_send_write_error_propagates() {
        let port = MockSerialPort::new();
        port.set_write_error(std::io::ErrorKind::BrokenPipe);
        let mut session = session(port);

        let message = OutgoingMessage::KernelCommand(KernelCommand {
            return_code: 0,
            command: 1,
        });
        assert!(matches!(
            session.send(&message).await,
            Err(LinkError::Io(_))
        ));
    }
}
