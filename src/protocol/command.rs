//! Command definitions
//!
//! Represents commands from clients.

use crate::range::ByteRange;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Put = 0x01,
    Append = 0x02,
    Read = 0x03,
    Delete = 0x04,
    Info = 0x05,
    Ping = 0x06,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an object with the given content
    Put { id: Vec<u8>, data: Vec<u8> },

    /// Append to an object, creating it if absent
    Append { id: Vec<u8>, data: Vec<u8> },

    /// Read a byte range of an object
    Read { id: Vec<u8>, range: ByteRange },

    /// Delete an object
    Delete { id: Vec<u8> },

    /// Get the length of an object
    Info { id: Vec<u8> },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Put { .. } => CommandType::Put,
            Command::Append { .. } => CommandType::Append,
            Command::Read { .. } => CommandType::Read,
            Command::Delete { .. } => CommandType::Delete,
            Command::Info { .. } => CommandType::Info,
            Command::Ping => CommandType::Ping,
        }
    }

    /// Whether the command leaves objects untouched
    ///
    /// Decides how `Busy` is reported: reads treat an object being deleted
    /// as already gone.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Command::Read { .. } | Command::Info { .. } | Command::Ping
        )
    }
}
