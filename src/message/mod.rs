//! # Message Module
//!
//! Typed message layer carried inside frame payloads.
//!
//! This module handles:
//! - Protocol codes, message structs, and data-object prototypes
//! - Encoding host-to-controller command and parameter messages
//! - Decoding controller-to-host data, state, and service messages

pub mod decoder;
pub mod encoder;
pub mod protocol;

pub use decoder::decode_message;
pub use encoder::encode_message;
pub use protocol::{IncomingMessage, OutgoingMessage, Protocol, Prototype, ScalarKind};
