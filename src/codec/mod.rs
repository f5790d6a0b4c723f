//! Codec module - how stored values become payload bytes and back.
//!
//! - [`Serializer`] - the injected encoding capability
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (default)
//! - [`JsonCodec`] - JSON using `serde_json`
//! - [`RawCodec`] - pass-through for raw bytes (zero-copy)
//! - [`ValueCodec`] / [`Value`] - descriptor handling on top of a serializer
//!
//! # Design
//!
//! Serializers are marker structs with static methods rather than trait
//! objects. A workspace picks its serializer as a type parameter, so codec
//! selection happens at compile time.
//!
//! # Example
//!
//! ```
//! use nws_client::codec::{MsgPackCodec, Serializer, ValueCodec};
//!
//! let (descriptor, bytes) = ValueCodec::<MsgPackCodec>::encode(&"hello").unwrap();
//! assert!(!descriptor.is_raw());
//!
//! let decoded: Option<String> = ValueCodec::<MsgPackCodec>::decode(descriptor, &bytes).unwrap();
//! assert_eq!(decoded.as_deref(), Some("hello"));
//! ```

mod json;
mod msgpack;
mod raw;
mod value;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use raw::RawCodec;
pub use value::{Value, ValueCodec};

use crate::error::Result;

/// Encoding capability used for every value that is not raw bytes.
pub trait Serializer {
    /// Tag stored in the high byte of the descriptor of values this
    /// serializer produced. Must only use bits of `flags::FORMAT_MASK`.
    ///
    /// [`flags::FORMAT_MASK`]: crate::protocol::flags::FORMAT_MASK
    const FORMAT_TAG: u32;

    /// Short name used in error messages.
    const NAME: &'static str;

    /// Encode a value to bytes.
    fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>>;

    /// Decode bytes to a value.
    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T>;

    /// Whether `encoded` is this format's null (`None`, `()`).
    fn is_null(encoded: &[u8]) -> bool;
}
