//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{BlobError, ErrorKind};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Conflict = 0x03,
    NotImplemented = 0x04,
    BadRequest = 0x05,
    Created = 0x06,
    Accepted = 0x07,
}

impl Status {
    /// Parse a status byte
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::Conflict),
            0x04 => Some(Status::NotImplemented),
            0x05 => Some(Status::BadRequest),
            0x06 => Some(Status::Created),
            0x07 => Some(Status::Accepted),
            _ => None,
        }
    }

    /// Map an error kind to a status.
    ///
    /// `Busy` reads as not-found for readers and as a server error for
    /// mutations.
    pub fn for_error(kind: ErrorKind, is_read: bool) -> Self {
        match kind {
            ErrorKind::Unsupported => Status::NotImplemented,
            ErrorKind::AccessDenied | ErrorKind::IoFailure => Status::Error,
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::AlreadyExists => Status::Conflict,
            ErrorKind::Busy if is_read => Status::NotFound,
            ErrorKind::Busy => Status::Error,
            ErrorKind::BadRequest => Status::BadRequest,
            ErrorKind::Unknown => Status::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Ok | Status::Created | Status::Accepted)
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (object bytes, range, length, or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a CREATED response with optional payload
    pub fn created(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Created,
            payload,
        }
    }

    /// Create an ACCEPTED response
    pub fn accepted() -> Self {
        Self {
            status: Status::Accepted,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Build the response for a failed command.
    ///
    /// Payload is `<reason>: <message>`.
    pub fn from_error(err: &BlobError, is_read: bool) -> Self {
        let kind = err.kind();
        Self {
            status: Status::for_error(kind, is_read),
            payload: Some(format!("{}: {}", kind.as_str(), err).into_bytes()),
        }
    }

    /// The error reason tag, if this is an error response
    pub fn reason(&self) -> Option<&str> {
        if self.status.is_success() {
            return None;
        }
        let payload = self.payload.as_deref()?;
        let text = std::str::from_utf8(payload).ok()?;
        text.split_once(':').map(|(reason, _)| reason)
    }
}
