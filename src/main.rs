//! # MCU Link Monitor
//!
//! Command-line monitor for a microcontroller connected over USB serial.
//!
//! Opens the controller port, then logs every message the controller
//! sends (identification, state and data events, delivery receipts)
//! until interrupted with Ctrl+C.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

mod config;
mod error;
mod frame;
mod message;
mod serial;
mod session;
mod transport;

use config::Config;
use error::LinkError;
use frame::codec::FrameCodec;
use frame::crc::Crc16;
use message::IncomingMessage;
use serial::ControllerPort;
use session::LinkSession;
use transport::TransportLayer;

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the MCU link monitor
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (file path from the first CLI argument, the
///      default path, or built-in defaults)
///    - Open the controller serial port
///
/// 2. **Main Loop**
///    - Receive and log incoming controller messages
///    - Log a status line every `status_interval` messages
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or no controller
/// device can be opened. Frame-level reception errors (checksum
/// mismatches, stalled frames) are logged and do not stop the monitor.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("MCU Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    // Open the controller port, honoring a configured path over
    // auto-detection
    let port = if config.serial.port.is_empty() {
        ControllerPort::open(config.serial.baud_rate)?
    } else {
        ControllerPort::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)?
    };
    info!("Controller port opened at: {}", port.device_path());

    let codec = FrameCodec::new(Crc16::new(
        config.transport.crc_polynomial,
        config.transport.crc_initial,
        config.transport.crc_final_xor,
    ));
    let transport = TransportLayer::new(
        codec,
        config.transport.rx_buffer_size,
        Duration::from_millis(config.transport.stall_timeout_ms),
    );
    let mut session = LinkSession::new(port, transport);

    info!("Listening for controller messages");
    info!("Press Ctrl+C to exit");

    let mut message_count: u64 = 0;
    let mut error_count: u64 = 0;

    // Main monitor loop
    loop {
        tokio::select! {
            result = session.receive() => {
                match result {
                    Ok(message) => {
                        message_count += 1;
                        log_message(&message);

                        if message_count % config.monitor.status_interval == 0 {
                            info!(
                                "Received {} messages ({} reception errors)",
                                message_count, error_count
                            );
                        }
                    }
                    // Reception errors leave the session resynchronized
                    Err(e @ (LinkError::CrcMismatch { .. }
                        | LinkError::Cobs(_)
                        | LinkError::Frame(_)
                        | LinkError::Timeout(_)
                        | LinkError::Message(_))) => {
                        error_count += 1;
                        warn!("Reception error: {}", e);
                    }
                    Err(e) => {
                        // Serial-level failures are fatal
                        return Err(e.into());
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!(
                    "Total messages received: {} ({} reception errors)",
                    message_count, error_count
                );
                break;
            }
        }
    }

    Ok(())
}

/// Load configuration from the CLI argument, the default path, or defaults
fn load_config() -> Result<Config> {
    if let Some(path) = std::env::args().nth(1) {
        info!("Loading configuration from {}", path);
        return Ok(Config::load(&path)?);
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
        return Ok(Config::load(DEFAULT_CONFIG_PATH)?);
    }

    info!("No configuration file found, using defaults");
    Ok(Config::default())
}

/// Log one incoming controller message at the appropriate level
fn log_message(message: &IncomingMessage) {
    match message {
        IncomingMessage::Identification(id) => {
            info!("Controller identified: id={}", id);
        }
        IncomingMessage::ModuleState(state) => {
            info!(
                "Module state: type={} id={} command={} event={}",
                state.module_type, state.module_id, state.command, state.event
            );
        }
        IncomingMessage::KernelState(state) => {
            info!("Kernel state: command={} event={}", state.command, state.event);
        }
        IncomingMessage::ModuleData(data) => {
            info!(
                "Module data: type={} id={} command={} event={} object={:02X?}",
                data.module_type,
                data.module_id,
                data.command,
                data.event,
                &data.object[..]
            );
        }
        IncomingMessage::KernelData(data) => {
            info!(
                "Kernel data: command={} event={} object={:02X?}",
                data.command,
                data.event,
                &data.object[..]
            );
        }
        IncomingMessage::ReceptionCode(code) => {
            info!("Delivery receipt: code={}", code);
        }
    }
}
