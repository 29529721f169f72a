//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: PUT    - Payload: id_len (4) + id + data
//! - 0x02: APPEND - Payload: id_len (4) + id + data
//! - 0x03: READ   - Payload: id_len (4) + id + range
//! - 0x04: DELETE - Payload: id_len (4) + id
//! - 0x05: INFO   - Payload: id_len (4) + id
//! - 0x06: PING   - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: CONFLICT
//! - 0x04: NOT_IMPLEMENTED
//! - 0x05: BAD_REQUEST
//! - 0x06: CREATED
//! - 0x07: ACCEPTED

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_length_reply, decode_range_reply, decode_response, encode_command,
    encode_length_reply, encode_range_reply, encode_response, read_command, read_response,
    write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
