//! # Frame Module
//!
//! Serialization of payloads into length-delimited, checksum-protected
//! serial frames.
//!
//! This module handles:
//! - COBS payload encoding and decoding
//! - CRC-16 checksum calculation over encoded packets
//! - Frame construction and whole-frame validation

pub mod cobs;
pub mod codec;
pub mod crc;

pub use codec::{FrameCodec, MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE, START_BYTE};
