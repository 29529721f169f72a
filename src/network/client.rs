//! Blocking client
//!
//! Sends commands to a server and turns error responses back into
//! [`BlobError`]s.

use std::io::{self, BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{BlobError, Result};
use crate::protocol::{
    decode_length_reply, decode_range_reply, read_response, write_command, Command, Response,
    Status,
};
use crate::range::ByteRange;

/// A single client connection
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| BlobError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for its raw response
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Create an object
    pub fn put(&mut self, id: &[u8], data: &[u8]) -> Result<()> {
        self.expect_success(&Command::Put {
            id: id.to_vec(),
            data: data.to_vec(),
        })?;
        Ok(())
    }

    /// Append to an object, returning the written range
    pub fn append(&mut self, id: &[u8], data: &[u8]) -> Result<ByteRange> {
        let payload = self.expect_success(&Command::Append {
            id: id.to_vec(),
            data: data.to_vec(),
        })?;
        decode_range_reply(&payload.unwrap_or_default())
    }

    /// Read a byte range of an object
    pub fn read(&mut self, id: &[u8], range: ByteRange) -> Result<Vec<u8>> {
        let payload = self.expect_success(&Command::Read {
            id: id.to_vec(),
            range,
        })?;
        Ok(payload.unwrap_or_default())
    }

    /// Delete an object
    pub fn delete(&mut self, id: &[u8]) -> Result<()> {
        self.expect_success(&Command::Delete { id: id.to_vec() })?;
        Ok(())
    }

    /// Length of an object
    pub fn info(&mut self, id: &[u8]) -> Result<u64> {
        let payload = self.expect_success(&Command::Info { id: id.to_vec() })?;
        decode_length_reply(&payload.unwrap_or_default())
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        self.expect_success(&Command::Ping)?;
        Ok(())
    }

    fn expect_success(&mut self, command: &Command) -> Result<Option<Vec<u8>>> {
        let response = self.request(command)?;
        if response.status.is_success() {
            return Ok(response.payload);
        }
        Err(response_error(&response))
    }
}

/// Rebuild an error from a failed response
fn response_error(response: &Response) -> BlobError {
    let message = response
        .payload
        .as_deref()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .unwrap_or_default();

    match response.reason() {
        Some("not_supported") => BlobError::Unsupported,
        Some("access_denied") => BlobError::AccessDenied,
        Some("disk_failure") => BlobError::IoFailure(io::Error::new(io::ErrorKind::Other, message)),
        Some("already_exists") => BlobError::AlreadyExists,
        Some("not_found") => BlobError::NotFound,
        Some("being_deleted") => BlobError::Busy,
        Some("bad_request") => BlobError::Protocol(message),
        _ if response.status == Status::NotFound => BlobError::NotFound,
        _ => BlobError::Network(message),
    }
}
