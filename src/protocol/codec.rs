//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - PUT:    id_len (4) + id + data
//! - APPEND: id_len (4) + id + data
//! - READ:   id_len (4) + id + offset (8) + has_len (1) + len (8)
//! - DELETE: id_len (4) + id
//! - INFO:   id_len (4) + id
//! - PING:   empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Reply Payloads
//! - APPEND: offset (8) + len (8)
//! - INFO:   len (8)
//! - READ:   object bytes

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use super::{Command, Response, Status};
use crate::error::{BlobError, Result};
use crate::range::ByteRange;

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the range trailer in a READ payload
const RANGE_SIZE: usize = 8 + 1 + 8;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    // Build payload based on command type
    let mut payload = Vec::new();
    match command {
        Command::Put { id, data } | Command::Append { id, data } => {
            payload.reserve(4 + id.len() + data.len());
            put_id(&mut payload, id);
            payload.put_slice(data);
        }
        Command::Read { id, range } => {
            payload.reserve(4 + id.len() + RANGE_SIZE);
            put_id(&mut payload, id);
            payload.put_u64(range.offset);
            payload.put_u8(range.length.is_some() as u8);
            payload.put_u64(range.length.unwrap_or(0));
        }
        Command::Delete { id } | Command::Info { id } => {
            payload.reserve(4 + id.len());
            put_id(&mut payload, id);
        }
        Command::Ping => {}
    }

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, mut payload) = split_frame(bytes, "command")?;

    // Parse command based on type
    match cmd_type {
        0x01 => {
            let id = take_id(&mut payload, "PUT")?;
            Ok(Command::Put {
                id,
                data: payload.to_vec(),
            })
        }
        0x02 => {
            let id = take_id(&mut payload, "APPEND")?;
            Ok(Command::Append {
                id,
                data: payload.to_vec(),
            })
        }
        0x03 => decode_read_command(payload),
        0x04 => {
            let id = take_id(&mut payload, "DELETE")?;
            expect_end(payload, "DELETE")?;
            Ok(Command::Delete { id })
        }
        0x05 => {
            let id = take_id(&mut payload, "INFO")?;
            expect_end(payload, "INFO")?;
            Ok(Command::Info { id })
        }
        0x06 => {
            expect_end(payload, "PING")?;
            Ok(Command::Ping)
        }
        _ => Err(BlobError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode READ command payload
fn decode_read_command(mut payload: &[u8]) -> Result<Command> {
    let id = take_id(&mut payload, "READ")?;

    if payload.remaining() != RANGE_SIZE {
        return Err(BlobError::Protocol(format!(
            "READ command: expected {} range bytes, got {}",
            RANGE_SIZE,
            payload.remaining()
        )));
    }

    let offset = payload.get_u64();
    let has_len = payload.get_u8();
    let len = payload.get_u64();

    let length = match has_len {
        0 => None,
        1 => Some(len),
        other => {
            return Err(BlobError::Protocol(format!(
                "READ command: invalid length flag 0x{:02x}",
                other
            )))
        }
    };

    Ok(Command::Read {
        id,
        range: ByteRange::new(offset, length),
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::from_u8(status_byte).ok_or_else(|| {
        BlobError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

/// Encode the reply to an APPEND: offset (8) + len (8)
pub fn encode_range_reply(range: &ByteRange) -> Vec<u8> {
    let mut payload = Vec::with_capacity(16);
    payload.put_u64(range.offset);
    payload.put_u64(range.length.unwrap_or(0));
    payload
}

/// Decode the reply to an APPEND
pub fn decode_range_reply(mut payload: &[u8]) -> Result<ByteRange> {
    if payload.len() != 16 {
        return Err(BlobError::Protocol(format!(
            "Range reply: expected 16 bytes, got {}",
            payload.len()
        )));
    }
    let offset = payload.get_u64();
    let length = payload.get_u64();
    Ok(ByteRange::new(offset, Some(length)))
}

/// Encode the reply to an INFO: len (8)
pub fn encode_length_reply(length: u64) -> Vec<u8> {
    length.to_be_bytes().to_vec()
}

/// Decode the reply to an INFO
pub fn decode_length_reply(mut payload: &[u8]) -> Result<u64> {
    if payload.len() != 8 {
        return Err(BlobError::Protocol(format!(
            "Length reply: expected 8 bytes, got {}",
            payload.len()
        )));
    }
    Ok(payload.get_u64())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader)?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader)?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message
}

/// Validate a frame and split it into tag and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(BlobError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let tag = header.get_u8();
    let payload_len = header.get_u32() as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(BlobError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(BlobError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

/// Read header + payload from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(BlobError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

fn put_id(payload: &mut Vec<u8>, id: &[u8]) {
    payload.put_u32(id.len() as u32);
    payload.put_slice(id);
}

/// Split a length-prefixed object id off the front of `payload`
fn take_id(payload: &mut &[u8], name: &str) -> Result<Vec<u8>> {
    if payload.remaining() < 4 {
        return Err(BlobError::Protocol(format!(
            "{} command: missing id length",
            name
        )));
    }

    let id_len = payload.get_u32() as usize;
    if payload.remaining() < id_len {
        return Err(BlobError::Protocol(format!(
            "{} command: incomplete id (expected {}, got {})",
            name,
            id_len,
            payload.remaining()
        )));
    }

    let id = payload[..id_len].to_vec();
    payload.advance(id_len);
    Ok(id)
}

fn expect_end(payload: &[u8], name: &str) -> Result<()> {
    if !payload.is_empty() {
        return Err(BlobError::Protocol(format!(
            "{} command: unexpected {} trailing bytes",
            name,
            payload.len()
        )));
    }
    Ok(())
}
