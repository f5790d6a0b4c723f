//! Protocol module - wire format, request and response framing.
//!
//! This module implements the NWS wire protocol:
//! - Fixed-width ASCII decimal numbers (counts, lengths, status, descriptor)
//! - Request frames (field count + length-prefixed fields)
//! - Response frames (status, optionally a value header and payload)
//! - Request buffer for accumulating partial reads

mod request;
mod request_buffer;
mod response;
mod wire_format;

pub use request::{ops, Request};
pub use request_buffer::RequestBuffer;
pub use response::{Response, ResponseKind};
pub use wire_format::{
    decode_decimal, decode_status, encode_decimal, encode_status, flags, Cookie, Descriptor,
    ValueHeader, COOKIE_SIZE, COUNT_WIDTH, DEFAULT_MAX_PAYLOAD_SIZE, HANDSHAKE_REQUEST,
    LEGACY_PROTOCOL_REPLY, LENGTH_WIDTH, MAX_FIELDS, STATUS_OK, STATUS_WIDTH, VALUE_HEADER_SIZE,
    VAR_ID_WIDTH,
};
