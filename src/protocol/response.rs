//! Response frames.
//!
//! Whether a response carries a value block after its status depends on the
//! operation, so both sides derive the shape from the op token with
//! [`ResponseKind::for_op`].

use bytes::{BufMut, Bytes, BytesMut};

use super::request::ops;
use super::wire_format::{
    encode_status, Cookie, Descriptor, ValueHeader, STATUS_OK, STATUS_WIDTH, VALUE_HEADER_SIZE,
};

/// Shape of the response to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Status only.
    Status,
    /// Status, value header and payload.
    Value,
}

impl ResponseKind {
    /// Response shape for an operation token.
    pub fn for_op(op: &[u8]) -> Self {
        const VALUE_OPS: [&str; 11] = [
            ops::FETCH,
            ops::FETCH_TRY,
            ops::FIND,
            ops::FIND_TRY,
            ops::IFETCH,
            ops::IFETCH_TRY,
            ops::IFIND,
            ops::IFIND_TRY,
            ops::LIST_VARS,
            ops::LIST_WSS,
            ops::MKTEMP_WS,
        ];
        if VALUE_OPS.iter().any(|v| v.as_bytes() == op) {
            ResponseKind::Value
        } else {
            ResponseKind::Status
        }
    }
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// 0 on success, anything else is an undifferentiated failure.
    pub status: u32,
    /// Payload descriptor (default for status-only responses).
    pub descriptor: Descriptor,
    /// Cookie returned by cursor operations.
    pub cookie: Cookie,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Response {
    /// A status-only response.
    pub fn status(status: u32) -> Self {
        Self {
            status,
            descriptor: Descriptor::default(),
            cookie: Cookie::initial(),
            payload: Bytes::new(),
        }
    }

    /// A value-bearing response.
    pub fn value(status: u32, descriptor: Descriptor, cookie: Cookie, payload: Bytes) -> Self {
        Self {
            status,
            descriptor,
            cookie,
            payload,
        }
    }

    /// Assemble a response from a decoded status, value header and payload.
    pub fn from_parts(status: u32, header: ValueHeader, payload: Bytes) -> Self {
        Self {
            status,
            descriptor: header.descriptor,
            cookie: header.cookie,
            payload,
        }
    }

    /// Whether the status signals success.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Payload as lossy UTF-8 text (listings, generated names).
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Encode the response in the given shape.
    pub fn encode(&self, kind: ResponseKind) -> Bytes {
        let mut buf = BytesMut::with_capacity(match kind {
            ResponseKind::Status => STATUS_WIDTH,
            ResponseKind::Value => STATUS_WIDTH + VALUE_HEADER_SIZE + self.payload.len(),
        });
        buf.put_slice(&encode_status(self.status));
        if kind == ResponseKind::Value {
            let header = ValueHeader::new(
                self.descriptor,
                self.cookie.clone(),
                self.payload.len() as u64,
            );
            buf.put_slice(&header.encode());
            buf.put_slice(&self.payload);
        }
        buf.freeze()
    }
}
