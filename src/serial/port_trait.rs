//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;

/// Trait for serial port I/O operations
///
/// Implemented by [`ControllerPort`](super::ControllerPort) for real
/// hardware and by the mock below for tests.
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read available bytes into the buffer, returning the count read
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
