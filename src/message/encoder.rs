//! # Outgoing Message Encoder
//!
//! Serializes host-to-controller messages into frame payloads. The first
//! payload byte is always the protocol code; multi-byte fields are
//! little-endian, matching the byte order of the controller platforms.

use super::protocol::*;
use crate::error::{LinkError, Result};
use crate::frame::codec::MAX_PAYLOAD_SIZE;

/// Encode an outgoing message into a frame payload
///
/// # Arguments
///
/// * `message` - Message to serialize
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Payload bytes ready for frame encoding
///
/// # Errors
///
/// Returns an error if a parameters message carries an empty or oversized
/// object. Fixed-layout messages always fit and cannot fail.
pub fn encode_message(message: &OutgoingMessage) -> Result<Vec<u8>> {
    let payload = match message {
        OutgoingMessage::RepeatedModuleCommand(m) => encode_repeated_command(m),
        OutgoingMessage::OneOffModuleCommand(m) => encode_one_off_command(m),
        OutgoingMessage::DequeueModuleCommand(m) => encode_dequeue_command(m),
        OutgoingMessage::KernelCommand(m) => encode_kernel_command(m),
        OutgoingMessage::ModuleParameters(m) => encode_module_parameters(m)?,
        OutgoingMessage::KernelParameters(m) => encode_kernel_parameters(m),
    };

    debug_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
    Ok(payload)
}

/// Encode a repeated module command (10 bytes)
///
/// Layout: protocol + module_type + module_id + return_code + command +
/// noblock + cycle_delay (4 bytes, little-endian).
fn encode_repeated_command(m: &RepeatedModuleCommand) -> Vec<u8> {
    let mut payload = Vec::with_capacity(10);
    payload.push(Protocol::RepeatedModuleCommand as u8);
    payload.push(m.module_type);
    payload.push(m.module_id);
    payload.push(m.return_code);
    payload.push(m.command);
    payload.push(m.noblock as u8);
    payload.extend_from_slice(&m.cycle_delay_us.to_le_bytes());
    payload
}

/// Encode a one-off module command (6 bytes)
fn encode_one_off_command(m: &OneOffModuleCommand) -> Vec<u8> {
    vec![
        Protocol::OneOffModuleCommand as u8,
        m.module_type,
        m.module_id,
        m.return_code,
        m.command,
        m.noblock as u8,
    ]
}

/// Encode a dequeue module command (4 bytes)
fn encode_dequeue_command(m: &DequeueModuleCommand) -> Vec<u8> {
    vec![
        Protocol::DequeueModuleCommand as u8,
        m.module_type,
        m.module_id,
        m.return_code,
    ]
}

/// Encode a kernel command (3 bytes)
fn encode_kernel_command(m: &KernelCommand) -> Vec<u8> {
    vec![Protocol::KernelCommand as u8, m.return_code, m.command]
}

/// Encode a module parameters message (4 bytes + object)
///
/// The parameter object is opaque to the link and appended verbatim; the
/// receiving module interprets it against its own parameter structure.
fn encode_module_parameters(m: &ModuleParameters) -> Result<Vec<u8>> {
    if m.object.is_empty() {
        return Err(LinkError::Message(
            "module parameters object cannot be empty".to_string(),
        ));
    }
    if m.object.len() > MAX_PARAMETER_OBJECT_SIZE {
        return Err(LinkError::Message(format!(
            "module parameters object too large: {} bytes (maximum {})",
            m.object.len(),
            MAX_PARAMETER_OBJECT_SIZE
        )));
    }

    let mut payload = Vec::with_capacity(4 + m.object.len());
    payload.push(Protocol::ModuleParameters as u8);
    payload.push(m.module_type);
    payload.push(m.module_id);
    payload.push(m.return_code);
    payload.extend_from_slice(&m.object);
    Ok(payload)
}

/// Encode a kernel parameters message (4 bytes)
fn encode_kernel_parameters(m: &KernelParameters) -> Vec<u8> {
    vec![
        Protocol::KernelParameters as u8,
        m.return_code,
        m.action_lock as u8,
        m.ttl_lock as u8,
    ]
}
