//! Wire format encoding and decoding.
//!
//! Every number on the wire is fixed-width, zero-padded ASCII decimal.
//!
//! Request:
//! ```text
//! ┌─────────┬──────────────┬─────────┬──────────────┬─────────┬───
//! │ Count   │ Length 1     │ Field 1 │ Length 2     │ Field 2 │ ...
//! │ 4 digits│ 20 digits    │ N bytes │ 20 digits    │ N bytes │
//! └─────────┴──────────────┴─────────┴──────────────┴─────────┴───
//! ```
//!
//! Response:
//! ```text
//! ┌─────────┬────────────┬──────────────────────────┬───────────┬─────────┐
//! │ Status  │ Descriptor │ Cookie                   │ Length    │ Payload │
//! │ 4 digits│ 20 digits  │ 20-byte id + 20-byte idx │ 20 digits │ N bytes │
//! └─────────┴────────────┴──────────────────────────┴───────────┴─────────┘
//! ```
//!
//! Status-only responses stop after the status.

use bytes::Bytes;

use crate::error::{NwsError, Result};

/// Width of the field count prefix of a request.
pub const COUNT_WIDTH: usize = 4;

/// Width of every length prefix and 20-digit numeric field.
pub const LENGTH_WIDTH: usize = 20;

/// Width of the response status.
pub const STATUS_WIDTH: usize = 4;

/// Width of the variable id half of a cookie.
pub const VAR_ID_WIDTH: usize = 20;

/// Size of a cookie (variable id + value index).
pub const COOKIE_SIZE: usize = VAR_ID_WIDTH + LENGTH_WIDTH;

/// Size of the block following the status in value-bearing responses.
pub const VALUE_HEADER_SIZE: usize = LENGTH_WIDTH + COOKIE_SIZE + LENGTH_WIDTH;

/// Maximum number of fields a request can carry.
pub const MAX_FIELDS: usize = 9999;

/// Default maximum payload size accepted from the server (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 1_073_741_824;

/// Token sent by the client to announce the cookie protocol.
pub const HANDSHAKE_REQUEST: &[u8; 4] = b"1112";

/// Reply from servers that only speak the legacy protocol.
pub const LEGACY_PROTOCOL_REPLY: &[u8; 4] = b"2222";

/// Status value meaning success.
pub const STATUS_OK: u32 = 0;

/// Descriptor flag constants.
pub mod flags {
    /// Payload is raw bytes and must not be decoded.
    pub const DIRECT_STRING: u32 = 0x0000_0001;

    /// Mask of the byte naming the encoding that produced the payload.
    pub const FORMAT_MASK: u32 = 0xFF00_0000;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(descriptor: u32, flag: u32) -> bool {
        descriptor & flag != 0
    }
}

/// Per-value flag set carried next to every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor(pub u32);

impl Descriptor {
    /// Descriptor for raw bytes produced under the given format tag.
    pub fn raw(format_tag: u32) -> Self {
        Self((format_tag & flags::FORMAT_MASK) | flags::DIRECT_STRING)
    }

    /// Descriptor for a payload encoded under the given format tag.
    pub fn encoded(format_tag: u32) -> Self {
        Self(format_tag & flags::FORMAT_MASK)
    }

    /// Whether the payload is raw bytes.
    #[inline]
    pub fn is_raw(&self) -> bool {
        flags::has_flag(self.0, flags::DIRECT_STRING)
    }

    /// The format tag byte (already shifted in place).
    #[inline]
    pub fn format_tag(&self) -> u32 {
        self.0 & flags::FORMAT_MASK
    }

    /// Raw descriptor bits.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Opaque server-issued iteration position.
///
/// The client never looks inside; it keeps the last cookie it was given and
/// replays both halves byte for byte on the next cursor request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Variable instance id, empty before the first response.
    pub var_id: Bytes,
    /// Position of the last value handed out, as the server wrote it.
    pub value_index: Bytes,
}

impl Cookie {
    /// A cookie from its two wire halves.
    pub fn new(var_id: impl Into<Bytes>, value_index: impl Into<Bytes>) -> Self {
        Self {
            var_id: var_id.into(),
            value_index: value_index.into(),
        }
    }

    /// The initial cookie of a fresh cursor: no id, index zero.
    pub fn initial() -> Self {
        Self::new(
            Bytes::new(),
            Bytes::copy_from_slice(&encode_decimal::<LENGTH_WIDTH>(0)),
        )
    }

    /// Encode into the 40-byte wire form.
    ///
    /// Each half is left-padded with `'0'` (or truncated) to 20 bytes.
    pub fn encode(&self) -> [u8; COOKIE_SIZE] {
        let mut buf = [b'0'; COOKIE_SIZE];
        pad_into(&mut buf[..VAR_ID_WIDTH], &self.var_id);
        pad_into(&mut buf[VAR_ID_WIDTH..], &self.value_index);
        buf
    }

    /// Split the 40-byte wire form into its halves without interpreting them.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < COOKIE_SIZE {
            return Err(NwsError::Protocol(format!(
                "cookie needs {} bytes, got {}",
                COOKIE_SIZE,
                buf.len()
            )));
        }
        Ok(Self::new(
            Bytes::copy_from_slice(&buf[..VAR_ID_WIDTH]),
            Bytes::copy_from_slice(&buf[VAR_ID_WIDTH..COOKIE_SIZE]),
        ))
    }
}

impl Default for Cookie {
    fn default() -> Self {
        Self::initial()
    }
}

fn pad_into(slot: &mut [u8], data: &[u8]) {
    let data = &data[..data.len().min(slot.len())];
    let offset = slot.len() - data.len();
    slot[offset..].copy_from_slice(data);
}

/// The block that follows the status in value-bearing responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueHeader {
    /// Descriptor of the payload.
    pub descriptor: Descriptor,
    /// Cookie (only meaningful for cursor operations).
    pub cookie: Cookie,
    /// Payload length in bytes.
    pub payload_length: u64,
}

impl ValueHeader {
    /// Create a new value header.
    pub fn new(descriptor: Descriptor, cookie: Cookie, payload_length: u64) -> Self {
        Self {
            descriptor,
            cookie,
            payload_length,
        }
    }

    /// Encode into the 80-byte wire form.
    pub fn encode(&self) -> [u8; VALUE_HEADER_SIZE] {
        let mut buf = [0u8; VALUE_HEADER_SIZE];
        buf[..LENGTH_WIDTH].copy_from_slice(&encode_decimal::<LENGTH_WIDTH>(u64::from(
            self.descriptor.bits(),
        )));
        buf[LENGTH_WIDTH..LENGTH_WIDTH + COOKIE_SIZE].copy_from_slice(&self.cookie.encode());
        buf[LENGTH_WIDTH + COOKIE_SIZE..]
            .copy_from_slice(&encode_decimal::<LENGTH_WIDTH>(self.payload_length));
        buf
    }

    /// Decode from the 80-byte wire form.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < VALUE_HEADER_SIZE {
            return Err(NwsError::Protocol(format!(
                "value header needs {} bytes, got {}",
                VALUE_HEADER_SIZE,
                buf.len()
            )));
        }
        let descriptor = decode_decimal(&buf[..LENGTH_WIDTH])?;
        let descriptor = u32::try_from(descriptor).map_err(|_| {
            NwsError::Protocol(format!("descriptor {} does not fit 32 bits", descriptor))
        })?;
        Ok(Self {
            descriptor: Descriptor(descriptor),
            cookie: Cookie::decode(&buf[LENGTH_WIDTH..LENGTH_WIDTH + COOKIE_SIZE])?,
            payload_length: decode_decimal(&buf[LENGTH_WIDTH + COOKIE_SIZE..VALUE_HEADER_SIZE])?,
        })
    }

    /// Check the payload length against a maximum.
    pub fn validate(&self, max_payload_size: u64) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(NwsError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }
}

/// Encode `value` as exactly `N` zero-padded ASCII digits.
///
/// Values wider than `N` digits keep their low-order digits; callers keep
/// values in range (counts < 10^4, lengths < 10^20).
pub fn encode_decimal<const N: usize>(mut value: u64) -> [u8; N] {
    let mut buf = [b'0'; N];
    for slot in buf.iter_mut().rev() {
        *slot = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    buf
}

/// Decode a fixed-width ASCII decimal field.
pub fn decode_decimal(buf: &[u8]) -> Result<u64> {
    if buf.is_empty() {
        return Err(NwsError::Protocol("empty numeric field".to_string()));
    }
    buf.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(NwsError::Protocol(format!(
                "non-digit byte 0x{:02X} in numeric field {:?}",
                b,
                String::from_utf8_lossy(buf)
            )));
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or_else(|| NwsError::Protocol("numeric field overflows u64".to_string()))
    })
}

/// Encode a response status.
#[inline]
pub fn encode_status(status: u32) -> [u8; STATUS_WIDTH] {
    encode_decimal::<STATUS_WIDTH>(u64::from(status))
}

/// Decode a response status.
pub fn decode_status(buf: &[u8]) -> Result<u32> {
    if buf.len() != STATUS_WIDTH {
        return Err(NwsError::Protocol(format!(
            "status needs {} bytes, got {}",
            STATUS_WIDTH,
            buf.len()
        )));
    }
    // 4 digits always fit
    Ok(decode_decimal(buf)? as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decimal_zero_padded() {
        assert_eq!(&encode_decimal::<4>(5), b"0005");
        assert_eq!(&encode_decimal::<4>(0), b"0000");
        assert_eq!(&encode_decimal::<20>(20), b"00000000000000000020");
        assert_eq!(&encode_decimal::<20>(u64::MAX), b"18446744073709551615");
    }

    #[test]
    fn test_decode_decimal() {
        assert_eq!(decode_decimal(b"0005").unwrap(), 5);
        assert_eq!(decode_decimal(b"00000000000117440513").unwrap(), 117_440_513);
    }

    #[test]
    fn test_decode_decimal_rejects_non_digits() {
        let err = decode_decimal(b"00a5").unwrap_err();
        assert!(err.to_string().contains("non-digit"));
        assert!(decode_decimal(b" 005").is_err());
        assert!(decode_decimal(b"").is_err());
    }

    #[test]
    fn test_decode_decimal_overflow() {
        assert!(decode_decimal(b"99999999999999999999").is_err());
    }

    #[test]
    fn test_status() {
        assert_eq!(&encode_status(0), b"0000");
        assert_eq!(decode_status(b"0000").unwrap(), STATUS_OK);
        assert_eq!(decode_status(b"0001").unwrap(), 1);
        assert!(decode_status(b"001").is_err());
    }

    #[test]
    fn test_descriptor_flags() {
        let raw = Descriptor::raw(0x0B00_0000);
        assert!(raw.is_raw());
        assert_eq!(raw.bits(), 0x0B00_0001);
        assert_eq!(raw.format_tag(), 0x0B00_0000);

        let enc = Descriptor::encoded(0x0B00_0000);
        assert!(!enc.is_raw());
        assert_eq!(enc.bits(), 0x0B00_0000);
    }

    #[test]
    fn test_cookie_wire_form() {
        let cookie = Cookie::new(
            Bytes::from_static(b"00000000000000000042"),
            Bytes::from_static(b"00000000000000000007"),
        );
        let encoded = cookie.encode();
        assert_eq!(&encoded[..], b"0000000000000000004200000000000000000007");
        assert_eq!(Cookie::decode(&encoded).unwrap(), cookie);
    }

    #[test]
    fn test_initial_cookie() {
        let cookie = Cookie::initial();
        assert!(cookie.var_id.is_empty());
        assert_eq!(&cookie.value_index[..], b"00000000000000000000");
        assert_eq!(&cookie.encode()[..], &[b'0'; COOKIE_SIZE][..]);
    }

    #[test]
    fn test_cookie_is_not_interpreted() {
        let cookie = Cookie::decode(&[b' '; COOKIE_SIZE]).unwrap();
        assert_eq!(&cookie.var_id[..], &[b' '; VAR_ID_WIDTH][..]);
        assert_eq!(&cookie.value_index[..], &[b' '; LENGTH_WIDTH][..]);
        assert_eq!(&cookie.encode()[..], &[b' '; COOKIE_SIZE][..]);

        let mut header = ValueHeader::new(Descriptor::default(), Cookie::initial(), 0).encode();
        header[20..60].copy_from_slice(b"var-id-with-letters!index:not-a-number!!");
        assert!(ValueHeader::decode(&header).is_ok());
    }

    #[test]
    fn test_value_header_layout() {
        let header = ValueHeader::new(
            Descriptor(0x0700_0001),
            Cookie::new(
                Bytes::from_static(b"abcdefghijklmnopqrst"),
                Bytes::from_static(b"00000000000000000003"),
            ),
            11,
        );
        let bytes = header.encode();
        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[..20], b"00000000000117440513");
        assert_eq!(&bytes[20..40], b"abcdefghijklmnopqrst");
        assert_eq!(&bytes[40..60], b"00000000000000000003");
        assert_eq!(&bytes[60..], b"00000000000000000011");

        assert_eq!(ValueHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_value_header_too_short() {
        assert!(ValueHeader::decode(&[b'0'; 79]).is_err());
    }

    #[test]
    fn test_value_header_validate() {
        let header = ValueHeader::new(Descriptor::default(), Cookie::initial(), 1000);
        assert!(header.validate(1000).is_ok());
        let err = header.validate(999).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_descriptor_too_wide() {
        let mut bytes = ValueHeader::new(Descriptor::default(), Cookie::initial(), 0).encode();
        bytes[..20].copy_from_slice(b"00000000009999999999");
        assert!(ValueHeader::decode(&bytes).is_err());
    }
}
