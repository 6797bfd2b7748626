//! # Serial Communication Module
//!
//! Handles serial communication with the microcontroller.
//!
//! This module handles:
//! - Opening the controller serial port with 8N1 settings
//! - Device auto-detection across common USB serial paths
//! - Async frame transmission and raw byte reads

pub mod port_trait;

use crate::error::{LinkError, Result};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default controller baud rate
///
/// Matches the USB CDC serial rate most controller boards enumerate at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default controller device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (most controller boards)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Controller Serial Port Handler
///
/// Manages the USB serial connection to the microcontroller.
pub struct ControllerPort {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for ControllerPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerPort")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ControllerPort {
    /// Open a connection to the controller
    ///
    /// Auto-detects the device by trying common paths.
    ///
    /// # Arguments
    ///
    /// * `baud_rate` - Serial baud rate, typically [`DEFAULT_BAUD_RATE`]
    ///
    /// # Returns
    ///
    /// * `Result<ControllerPort>` - Connected serial port or error
    ///
    /// # Errors
    ///
    /// Returns error if no controller device is found or connection fails
    pub fn open(baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
    }

    /// Open a connection to the controller with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Serial baud rate
    ///
    /// # Returns
    ///
    /// * `Result<ControllerPort>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened controller device at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(LinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Serial baud rate
    ///
    /// # Returns
    ///
    /// * `Result<SerialStream>` - Opened serial port
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| LinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Send an encoded frame to the controller
    ///
    /// # Arguments
    ///
    /// * `frame` - Complete frame bytes (start byte through checksum)
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Success or error
    pub async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        self.port
            .write_all(frame)
            .await
            .map_err(|e| LinkError::Serial(format!("Failed to write frame: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| LinkError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent frame ({} bytes)", frame.len());
        Ok(())
    }

    /// Read available bytes from the controller
    ///
    /// Waits until at least one byte is available, then returns as many
    /// bytes as the port had buffered, up to `buf.len()`.
    ///
    /// # Arguments
    ///
    /// * `buf` - Destination buffer
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of bytes read
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        use tokio::io::AsyncReadExt;

        let count = self
            .port
            .read(buf)
            .await
            .map_err(|e| LinkError::Serial(format!("Failed to read from serial port: {}", e)))?;

        Ok(count)
    }

    /// Get the device path of the opened serial port
    ///
    /// Returns the path to the serial device that was successfully opened
    /// (e.g., "/dev/ttyACM0" or "/dev/ttyUSB0").
    ///
    /// # Returns
    ///
    /// * `&str` - Reference to the device path string
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait::async_trait]
impl port_trait::SerialPortIO for ControllerPort {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.port.read(buf).await
    }
}
