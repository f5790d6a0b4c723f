//! Request buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented requests:
//! - `WaitingForCount`: Need the 4-digit field count
//! - `WaitingForLength`: Need the next 20-digit field length
//! - `WaitingForField`: Length parsed, need N more field bytes
//!
//! This is the server side of the request framing. It is what a mock server
//! or protocol proxy feeds socket reads into.
//!
//! # Example
//!
//! ```
//! use nws_client::protocol::{ops, Request, RequestBuffer};
//!
//! let bytes = Request::new(ops::LIST_WSS).encode();
//! let mut buffer = RequestBuffer::new();
//!
//! assert!(buffer.push(&bytes[..10]).unwrap().is_empty());
//! let requests = buffer.push(&bytes[10..]).unwrap();
//! assert_eq!(requests[0].op(), b"list wss");
//! ```

use bytes::{Bytes, BytesMut};

use super::request::Request;
use super::wire_format::{decode_decimal, COUNT_WIDTH, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_WIDTH};
use crate::error::{NwsError, Result};

/// State machine for request parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the field count.
    WaitingForCount,
    /// Waiting for the length prefix of the next field.
    WaitingForLength { remaining: usize },
    /// Length parsed, waiting for field bytes.
    WaitingForField { remaining: usize, length: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete requests.
pub struct RequestBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Fields of the request being assembled.
    fields: Vec<Bytes>,
    /// Current parsing state.
    state: State,
    /// Maximum allowed field size.
    max_field_size: u64,
}

impl RequestBuffer {
    /// Create a new request buffer with default settings.
    ///
    /// Default capacity: 64KB, max field: 1GB.
    pub fn new() -> Self {
        Self::with_max_field_size(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new request buffer with a custom max field size.
    pub fn with_max_field_size(max_field_size: u64) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            fields: Vec::new(),
            state: State::WaitingForCount,
            max_field_size,
        }
    }

    /// Push data into the buffer and extract all complete requests.
    ///
    /// Partial data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns error on a malformed numeric prefix or an oversized field.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Request>> {
        self.buffer.extend_from_slice(data);

        let mut requests = Vec::new();
        while let Some(request) = self.try_extract_one()? {
            requests.push(request);
        }
        Ok(requests)
    }

    fn try_extract_one(&mut self) -> Result<Option<Request>> {
        loop {
            match self.state {
                State::WaitingForCount => {
                    if self.buffer.len() < COUNT_WIDTH {
                        return Ok(None);
                    }
                    let count = decode_decimal(&self.buffer[..COUNT_WIDTH])? as usize;
                    let _ = self.buffer.split_to(COUNT_WIDTH);

                    if count == 0 {
                        return Ok(Some(Request::default()));
                    }
                    self.fields = Vec::with_capacity(count);
                    self.state = State::WaitingForLength { remaining: count };
                }

                State::WaitingForLength { remaining } => {
                    if self.buffer.len() < LENGTH_WIDTH {
                        return Ok(None);
                    }
                    let length = decode_decimal(&self.buffer[..LENGTH_WIDTH])?;
                    if length > self.max_field_size {
                        return Err(NwsError::Protocol(format!(
                            "Field size {} exceeds maximum {}",
                            length, self.max_field_size
                        )));
                    }
                    let _ = self.buffer.split_to(LENGTH_WIDTH);
                    self.state = State::WaitingForField {
                        remaining,
                        length: length as usize,
                    };
                }

                State::WaitingForField { remaining, length } => {
                    if self.buffer.len() < length {
                        return Ok(None);
                    }
                    self.fields.push(self.buffer.split_to(length).freeze());

                    if remaining > 1 {
                        self.state = State::WaitingForLength {
                            remaining: remaining - 1,
                        };
                    } else {
                        self.state = State::WaitingForCount;
                        let fields = std::mem::take(&mut self.fields);
                        return Ok(Some(Request::from_fields(fields)));
                    }
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.fields.clear();
        self.state = State::WaitingForCount;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForCount => "WaitingForCount",
            State::WaitingForLength { .. } => "WaitingForLength",
            State::WaitingForField { .. } => "WaitingForField",
        }
    }
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}
