//! Request frames.
//!
//! A request is an ordered list of fields. The first field is always the
//! operation token, usually followed by the workspace name.
//!
//! # Example
//!
//! ```
//! use nws_client::protocol::{ops, Request};
//!
//! let request = Request::new(ops::DELETE_VAR).text("work").text("x");
//! let bytes = request.encode();
//! assert!(bytes.starts_with(b"000300000000000000000010delete var"));
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{encode_decimal, COUNT_WIDTH, LENGTH_WIDTH, MAX_FIELDS};

/// Operation tokens understood by the server.
pub mod ops {
    /// Declare a variable with a mode.
    pub const DECLARE_VAR: &str = "declare var";
    /// Delete a variable.
    pub const DELETE_VAR: &str = "delete var";
    /// Store a value.
    pub const STORE: &str = "store";
    /// Blocking destructive read.
    pub const FETCH: &str = "fetch";
    /// Non-blocking destructive read.
    pub const FETCH_TRY: &str = "fetchTry";
    /// Blocking read.
    pub const FIND: &str = "find";
    /// Non-blocking read.
    pub const FIND_TRY: &str = "findTry";
    /// Cursor form of `fetch`.
    pub const IFETCH: &str = "ifetch";
    /// Cursor form of `fetchTry`.
    pub const IFETCH_TRY: &str = "ifetchTry";
    /// Cursor form of `find`.
    pub const IFIND: &str = "ifind";
    /// Cursor form of `findTry`.
    pub const IFIND_TRY: &str = "ifindTry";
    /// List the variables of a workspace.
    pub const LIST_VARS: &str = "list vars";
    /// List the workspaces on the server.
    pub const LIST_WSS: &str = "list wss";
    /// Delete a workspace.
    pub const DELETE_WS: &str = "delete ws";
    /// Open a workspace, claiming ownership.
    pub const OPEN_WS: &str = "open ws";
    /// Use a workspace without claiming ownership.
    pub const USE_WS: &str = "use ws";
    /// Create a uniquely named workspace from a template.
    pub const MKTEMP_WS: &str = "mktemp ws";
}

/// A request frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    fields: Vec<Bytes>,
}

impl Request {
    /// Start a request with the given operation token.
    pub fn new(op: &str) -> Self {
        Self {
            fields: vec![Bytes::copy_from_slice(op.as_bytes())],
        }
    }

    /// Build a request from already split fields.
    pub fn from_fields(fields: Vec<Bytes>) -> Self {
        Self { fields }
    }

    /// Append a text field (names, modes, flags).
    pub fn text(mut self, value: &str) -> Self {
        self.fields.push(Bytes::copy_from_slice(value.as_bytes()));
        self
    }

    /// Append a 20-digit decimal field (descriptor, value index).
    pub fn number(mut self, value: u64) -> Self {
        self.fields
            .push(Bytes::copy_from_slice(&encode_decimal::<LENGTH_WIDTH>(value)));
        self
    }

    /// Append a raw field (payloads, cookie ids).
    pub fn bytes(mut self, value: Bytes) -> Self {
        self.fields.push(value);
        self
    }

    /// The operation token.
    pub fn op(&self) -> &[u8] {
        self.fields.first().map(|f| &f[..]).unwrap_or_default()
    }

    /// All fields, operation token first.
    pub fn fields(&self) -> &[Bytes] {
        &self.fields
    }

    /// Field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&Bytes> {
        self.fields.get(index)
    }

    /// Field at `index` as UTF-8 text, if present and valid.
    pub fn text_field(&self, index: usize) -> Option<&str> {
        self.field(index).and_then(|f| std::str::from_utf8(f).ok())
    }

    /// Number of fields.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Size of the encoded request in bytes.
    pub fn encoded_len(&self) -> usize {
        COUNT_WIDTH
            + self
                .fields
                .iter()
                .map(|f| LENGTH_WIDTH + f.len())
                .sum::<usize>()
    }

    /// Encode the request into a contiguous buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode the request into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        debug_assert!(self.fields.len() <= MAX_FIELDS);
        buf.reserve(self.encoded_len());
        buf.put_slice(&encode_decimal::<COUNT_WIDTH>(self.fields.len() as u64));
        for field in &self.fields {
            buf.put_slice(&encode_decimal::<LENGTH_WIDTH>(field.len() as u64));
            buf.put_slice(field);
        }
    }
}
