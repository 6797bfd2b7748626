//! # Incoming Message Decoder
//!
//! Deserializes controller-to-host frame payloads into typed messages.
//! The first payload byte selects the protocol; data-message objects are
//! validated against the byte size their prototype code declares.

use bytes::Bytes;

use super::protocol::*;
use crate::error::{LinkError, Result};

/// Decode a received frame payload into a typed message
///
/// # Arguments
///
/// * `payload` - Validated frame payload (protocol code first)
///
/// # Returns
///
/// * `Result<IncomingMessage>` - Decoded message
///
/// # Errors
///
/// Returns an error if:
/// - The payload is empty or its protocol code is unknown
/// - The protocol code belongs to a host-to-controller message
/// - The payload is shorter than the protocol's fixed layout
/// - A data object's size disagrees with its prototype code
pub fn decode_message(payload: &[u8]) -> Result<IncomingMessage> {
    let (&code, body) = payload.split_first().ok_or_else(|| {
        LinkError::Message("cannot decode an empty payload".to_string())
    })?;

    match Protocol::try_from(code)? {
        Protocol::ModuleData => decode_module_data(body),
        Protocol::KernelData => decode_kernel_data(body),
        Protocol::ModuleState => decode_module_state(body),
        Protocol::KernelState => decode_kernel_state(body),
        Protocol::ReceptionCode => decode_reception_code(body),
        Protocol::Identification => decode_identification(body),
        outbound => Err(LinkError::Message(format!(
            "protocol {:?} is host-to-controller and cannot be received",
            outbound
        ))),
    }
}

/// Decode a module data message (5-byte header + object)
fn decode_module_data(body: &[u8]) -> Result<IncomingMessage> {
    let (header, object) = split_header(body, 5, "module data")?;
    let prototype = Prototype::from_code(header[4])?;
    Ok(IncomingMessage::ModuleData(ModuleData {
        module_type: header[0],
        module_id: header[1],
        command: header[2],
        event: header[3],
        prototype,
        object: check_object(prototype, object, "module data")?,
    }))
}

/// Decode a kernel data message (3-byte header + object)
fn decode_kernel_data(body: &[u8]) -> Result<IncomingMessage> {
    let (header, object) = split_header(body, 3, "kernel data")?;
    let prototype = Prototype::from_code(header[2])?;
    Ok(IncomingMessage::KernelData(KernelData {
        command: header[0],
        event: header[1],
        prototype,
        object: check_object(prototype, object, "kernel data")?,
    }))
}

/// Decode a module state message (exactly 4 bytes after the code)
fn decode_module_state(body: &[u8]) -> Result<IncomingMessage> {
    let header = exact_body(body, 4, "module state")?;
    Ok(IncomingMessage::ModuleState(ModuleState {
        module_type: header[0],
        module_id: header[1],
        command: header[2],
        event: header[3],
    }))
}

/// Decode a kernel state message (exactly 2 bytes after the code)
fn decode_kernel_state(body: &[u8]) -> Result<IncomingMessage> {
    let header = exact_body(body, 2, "kernel state")?;
    Ok(IncomingMessage::KernelState(KernelState {
        command: header[0],
        event: header[1],
    }))
}

/// Decode a reception code receipt (exactly 1 byte after the code)
fn decode_reception_code(body: &[u8]) -> Result<IncomingMessage> {
    let header = exact_body(body, 1, "reception code")?;
    Ok(IncomingMessage::ReceptionCode(header[0]))
}

/// Decode a controller identification message
///
/// Controllers may use 8, 16, or 32-bit IDs; the value is widened to u32.
fn decode_identification(body: &[u8]) -> Result<IncomingMessage> {
    let id = match body.len() {
        1 => body[0] as u32,
        2 => u16::from_le_bytes([body[0], body[1]]) as u32,
        4 => u32::from_le_bytes([body[0], body[1], body[2], body[3]]),
        other => {
            return Err(LinkError::Message(format!(
                "invalid identification payload size: {} bytes",
                other
            )))
        }
    };
    Ok(IncomingMessage::Identification(id))
}

/// Split a variable-size body into its fixed header and trailing object
fn split_header<'a>(
    body: &'a [u8],
    header_size: usize,
    what: &str,
) -> Result<(&'a [u8], &'a [u8])> {
    if body.len() < header_size {
        return Err(LinkError::Message(format!(
            "{} message truncated: {} of {} header bytes",
            what,
            body.len(),
            header_size
        )));
    }
    Ok(body.split_at(header_size))
}

/// Require an exact fixed-layout body size
fn exact_body<'a>(body: &'a [u8], size: usize, what: &str) -> Result<&'a [u8]> {
    if body.len() != size {
        return Err(LinkError::Message(format!(
            "{} message must be {} bytes, got {}",
            what,
            size,
            body.len()
        )));
    }
    Ok(body)
}

/// Validate a data object's size against its prototype
fn check_object(prototype: Prototype, object: &[u8], what: &str) -> Result<Bytes> {
    if object.len() != prototype.byte_size() {
        return Err(LinkError::Message(format!(
            "{} object size mismatch: prototype declares {} bytes, got {}",
            what,
            prototype.byte_size(),
            object.len()
        )));
    }
    Ok(Bytes::copy_from_slice(object))
}
