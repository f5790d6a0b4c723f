//! Raw codec - pass-through for byte values.
//!
//! Byte values skip the serializer entirely: they are stored with the
//! raw flag set and come back exactly as they went in.
//!
//! # Example
//!
//! ```
//! use nws_client::codec::RawCodec;
//! use bytes::Bytes;
//!
//! let bytes = Bytes::from_static(b"zero copy");
//! let passed = RawCodec::serialize_bytes(bytes.clone());
//! assert_eq!(passed.as_ptr(), bytes.as_ptr()); // Same memory
//!
//! let text: String = RawCodec::decode_as(&passed).unwrap();
//! assert_eq!(text, "zero copy");
//! ```

use bytes::Bytes;
use serde::de::value::{BytesDeserializer, Error as ValueError, SeqDeserializer};
use serde::de::DeserializeOwned;

use crate::error::{NwsError, Result};

/// Raw codec that passes bytes through without transformation.
pub struct RawCodec;

impl RawCodec {
    /// Serialize Bytes (true zero-copy, just returns the input).
    #[inline]
    pub fn serialize_bytes(data: Bytes) -> Bytes {
        data
    }

    /// Hand raw bytes to a byte-oriented `Deserialize` type.
    ///
    /// Types that accept a byte buffer (`serde_bytes::ByteBuf`, `String`
    /// for valid UTF-8) get it directly. Anything else is offered the bytes
    /// as a sequence of `u8`, which covers `Vec<u8>` and fixed arrays.
    pub fn decode_as<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
        T::deserialize(BytesDeserializer::<ValueError>::new(data)).or_else(|bytes_err| {
            T::deserialize(SeqDeserializer::<_, ValueError>::new(data.iter().copied()))
                .map_err(|_| NwsError::Deserialize(format!("raw value: {}", bytes_err)))
        })
    }
}
