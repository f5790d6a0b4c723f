//! MsgPack codec using `rmp-serde`.
//!
//! Always uses `to_vec_named`: structs are written as maps with field names,
//! which is what clients in other languages sharing a workspace can read.
//! `to_vec` would write them as positional arrays.
//!
//! # Example
//!
//! ```
//! use nws_client::codec::{MsgPackCodec, Serializer};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Task {
//!     id: u32,
//!     input: String,
//! }
//!
//! let task = Task { id: 42, input: "hello".to_string() };
//! let encoded = MsgPackCodec::encode(&task).unwrap();
//! let decoded: Task = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, task);
//! ```

use super::Serializer;
use crate::error::{NwsError, Result};

/// MessagePack serializer for structured data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

/// msgpack nil.
const NIL: u8 = 0xc0;

impl Serializer for MsgPackCodec {
    const FORMAT_TAG: u32 = 0x0B00_0000;
    const NAME: &'static str = "msgpack";

    #[inline]
    fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| NwsError::Serialize(e.to_string()))
    }

    #[inline]
    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        rmp_serde::from_slice(bytes).map_err(|e| NwsError::Deserialize(e.to_string()))
    }

    #[inline]
    fn is_null(encoded: &[u8]) -> bool {
        *encoded == [NIL]
    }
}
