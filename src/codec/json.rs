//! JSON codec using `serde_json`.
//!
//! Slower and larger than MessagePack, but payloads stay human readable in
//! server listings and are easy to produce from scripting clients.

use super::Serializer;
use crate::error::{NwsError, Result};

/// JSON serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Serializer for JsonCodec {
    const FORMAT_TAG: u32 = 0x0C00_0000;
    const NAME: &'static str = "json";

    #[inline]
    fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| NwsError::Serialize(e.to_string()))
    }

    #[inline]
    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| NwsError::Deserialize(e.to_string()))
    }

    #[inline]
    fn is_null(encoded: &[u8]) -> bool {
        encoded == b"null"
    }
}
