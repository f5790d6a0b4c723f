//! Values as they travel between client and server.
//!
//! A [`Value`] is an opaque descriptor plus payload. Turning it into a Rust
//! type is an explicit step where the caller names both the target type and
//! the serializer, so nothing is cast behind the caller's back.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{RawCodec, Serializer};
use crate::error::{NwsError, Result};
use crate::protocol::Descriptor;

/// A retrieved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    descriptor: Descriptor,
    payload: Bytes,
}

impl Value {
    /// Create a value from a descriptor and payload.
    pub fn new(descriptor: Descriptor, payload: Bytes) -> Self {
        Self {
            descriptor,
            payload,
        }
    }

    /// Descriptor flags.
    #[inline]
    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    /// Whether this value was stored as raw bytes.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.descriptor.is_raw()
    }

    /// Payload bytes, undecoded.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Take the payload bytes, undecoded.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }

    /// Whether the payload is empty and encoded, i.e. the server reported
    /// a missing value rather than an empty one.
    #[inline]
    pub fn is_missing(&self) -> bool {
        !self.is_raw() && self.payload.is_empty()
    }

    /// Decode into `T` using serializer `S`.
    ///
    /// # Errors
    ///
    /// `Deserialize` if the payload cannot be reconstructed as `T`, or if the
    /// value is missing.
    pub fn decode<S: Serializer, T: DeserializeOwned>(&self) -> Result<T> {
        ValueCodec::<S>::decode(self.descriptor, &self.payload)?
            .ok_or_else(|| NwsError::Deserialize("value has an empty payload".to_string()))
    }
}

/// Descriptor-aware encoding on top of a [`Serializer`].
pub struct ValueCodec<S> {
    _serializer: PhantomData<fn() -> S>,
}

impl<S: Serializer> ValueCodec<S> {
    /// Encode a value with the serializer.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the value encodes to null, `Serialize` if the
    /// serializer fails.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<(Descriptor, Bytes)> {
        let encoded = S::encode(value)?;
        if S::is_null(&encoded) {
            return Err(NwsError::InvalidArgument(
                "null value is not supported".to_string(),
            ));
        }
        Ok((Descriptor::encoded(S::FORMAT_TAG), Bytes::from(encoded)))
    }

    /// Pass bytes through with the raw flag set.
    pub fn encode_raw(data: Bytes) -> (Descriptor, Bytes) {
        (
            Descriptor::raw(S::FORMAT_TAG),
            RawCodec::serialize_bytes(data),
        )
    }

    /// Decode a payload.
    ///
    /// Returns `Ok(None)` for an empty encoded payload (missing value).
    pub fn decode<T: DeserializeOwned>(descriptor: Descriptor, payload: &[u8]) -> Result<Option<T>> {
        if descriptor.is_raw() {
            return RawCodec::decode_as(payload).map(Some);
        }
        if payload.is_empty() {
            return Ok(None);
        }
        let tag = descriptor.format_tag();
        if tag != 0 && tag != S::FORMAT_TAG {
            return Err(NwsError::Deserialize(format!(
                "value was encoded with format tag 0x{:08X}, not {}",
                tag,
                S::NAME
            )));
        }
        S::decode(payload).map(Some)
    }
}
