//! # COBS Codec
//!
//! Consistent Overhead Byte Stuffing for frame payloads.
//!
//! This is the single-block COBS variant used on the microcontroller side of
//! the link: the encoded packet starts with an overhead byte holding the
//! distance to the first zero in the payload (or to the delimiter when the
//! payload contains no zeros), every zero payload byte is replaced with the
//! distance to the next zero, and an unencoded zero delimiter terminates the
//! packet. Capping payloads at 254 bytes keeps every distance within a u8.

use crate::error::{LinkError, Result};

/// Delimiter byte terminating every encoded packet
pub const COBS_DELIMITER: u8 = 0x00;

/// Minimum payload size that can be encoded, in bytes
pub const COBS_MIN_PAYLOAD_SIZE: usize = 1;

/// Maximum payload size that can be encoded, in bytes
pub const COBS_MAX_PAYLOAD_SIZE: usize = 254;

/// Number of bytes COBS adds to a payload (overhead byte + delimiter)
pub const COBS_OVERHEAD: usize = 2;

/// Encode a payload into a COBS packet
///
/// The returned packet is `payload.len() + 2` bytes: the overhead byte,
/// the payload with every zero replaced by a distance pointer, and the
/// trailing zero delimiter.
///
/// # Errors
///
/// Returns [`LinkError::Cobs`] if the payload is empty or larger than
/// [`COBS_MAX_PAYLOAD_SIZE`].
pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < COBS_MIN_PAYLOAD_SIZE {
        return Err(LinkError::Cobs("cannot encode an empty payload".to_string()));
    }
    if payload.len() > COBS_MAX_PAYLOAD_SIZE {
        return Err(LinkError::Cobs(format!(
            "payload size {} exceeds the maximum of {} bytes",
            payload.len(),
            COBS_MAX_PAYLOAD_SIZE
        )));
    }

    let mut packet = Vec::with_capacity(payload.len() + COBS_OVERHEAD);
    packet.push(0); // overhead placeholder
    packet.extend_from_slice(payload);
    packet.push(COBS_DELIMITER);

    // Walk backwards, replacing every zero with the distance to the next one.
    // The delimiter acts as the final zero of the chain.
    let mut last_zero = packet.len() - 1;
    for index in (1..packet.len() - 1).rev() {
        if packet[index] == 0 {
            packet[index] = (last_zero - index) as u8;
            last_zero = index;
        }
    }
    packet[0] = last_zero as u8;

    Ok(packet)
}

/// Decode a COBS packet back into its payload
///
/// Follows the pointer chain from the overhead byte, restoring every
/// encoded zero, and verifies that the chain terminates exactly on the
/// trailing delimiter.
///
/// # Errors
///
/// Returns [`LinkError::Cobs`] if the packet is too small or too large, the
/// overhead byte is zero (packet already decoded), the pointer chain jumps
/// past the packet end, or a delimiter is found before the packet end.
pub fn decode(packet: &[u8]) -> Result<Vec<u8>> {
    if packet.len() < COBS_MIN_PAYLOAD_SIZE + COBS_OVERHEAD {
        return Err(LinkError::Cobs(format!(
            "packet size {} is below the minimum of {} bytes",
            packet.len(),
            COBS_MIN_PAYLOAD_SIZE + COBS_OVERHEAD
        )));
    }
    if packet.len() > COBS_MAX_PAYLOAD_SIZE + COBS_OVERHEAD {
        return Err(LinkError::Cobs(format!(
            "packet size {} exceeds the maximum of {} bytes",
            packet.len(),
            COBS_MAX_PAYLOAD_SIZE + COBS_OVERHEAD
        )));
    }
    if packet[0] == 0 {
        return Err(LinkError::Cobs(
            "overhead byte is zero, packet is already decoded".to_string(),
        ));
    }

    let delimiter_index = packet.len() - 1;
    let mut buffer = packet.to_vec();
    let mut index = 0;

    loop {
        let jump = buffer[index] as usize;
        if index != 0 {
            buffer[index] = 0; // restore the encoded zero
        }
        if jump == 0 {
            return Err(LinkError::Cobs(
                "delimiter found before the end of the packet".to_string(),
            ));
        }

        let next = index + jump;
        if next > delimiter_index {
            return Err(LinkError::Cobs(
                "pointer chain jumped past the packet end, delimiter not found".to_string(),
            ));
        }
        if next == delimiter_index {
            if buffer[next] != COBS_DELIMITER {
                return Err(LinkError::Cobs(
                    "packet does not end with the delimiter byte".to_string(),
                ));
            }
            break;
        }
        index = next;
    }

    Ok(buffer[1..delimiter_index].to_vec())
}
