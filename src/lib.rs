//! # MCU Link Library
//!
//! Host-side implementation of a serialized transfer protocol for
//! microcontroller communication over USB serial.
//!
//! This library provides frame encoding with COBS byte stuffing and
//! CRC-16 validation, incremental frame reception, a typed message
//! layer for controller commands and telemetry, and an async session
//! that ties them to a serial port.

pub mod config;
pub mod error;
pub mod frame;
pub mod message;
pub mod serial;
pub mod session;
pub mod transport;
