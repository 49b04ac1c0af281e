//! PackStream serialization format.
//!
//! PackStream is the binary serialization format used by the Bolt protocol
//! to encode values for transmission between client and server.
//!
//! # Supported Types
//!
//! - **Null**: Single byte marker
//! - **Boolean**: True/False markers
//! - **Integer**: Variable-length encoding (-2^63 to 2^63-1)
//! - **Float**: 64-bit IEEE 754
//! - **String**: UTF-8 encoded, variable length prefix
//! - **Bytes**: Raw bytes, variable length prefix
//! - **List**: Heterogeneous collections
//! - **Map**: String keys to arbitrary values
//! - **Structure**: Tagged structures (graph and temporal types)
//!
//! Structures are kept untyped at this level. The tag constants for the
//! graph and temporal types live in [`marker`]; their interpretation lives in
//! [`crate::driver::types`].

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod types;

pub use decoder::{decode, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use types::{PackStreamStructure, PackStreamValue};

use std::fmt;

/// PackStream errors.
#[derive(Debug, Clone)]
pub enum PackStreamError {
    /// Unexpected end of input
    UnexpectedEof,
    /// Unknown marker byte
    UnknownMarker(u8),
    /// Invalid UTF-8 in string
    InvalidUtf8(String),
    /// Invalid map key (must be string)
    InvalidMapKey,
    /// Value too large to encode
    ValueTooLarge(&'static str, usize),
    /// Invalid structure format
    InvalidStructure(String),
    /// Bytes left over after a complete value
    TrailingBytes(usize),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "Unexpected end of PackStream data"),
            PackStreamError::UnknownMarker(m) => write!(f, "Unknown PackStream marker: 0x{:02X}", m),
            PackStreamError::InvalidUtf8(e) => write!(f, "Invalid UTF-8 in string: {}", e),
            PackStreamError::InvalidMapKey => write!(f, "Map keys must be strings"),
            PackStreamError::ValueTooLarge(t, s) => write!(f, "{} too large: {} entries", t, s),
            PackStreamError::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
            PackStreamError::TrailingBytes(n) => {
                write!(f, "{} trailing bytes after PackStream value", n)
            }
        }
    }
}

impl std::error::Error for PackStreamError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn roundtrip(value: &PackStreamValue) -> PackStreamValue {
        decode(&encode(value).unwrap()).unwrap()
    }

    #[test]
    fn test_roundtrip_size_boundaries() {
        for len in [0usize, 15, 16, 255, 256, 65_535, 65_536] {
            let s = PackStreamValue::String("s".repeat(len));
            assert_eq!(roundtrip(&s), s, "string of {}", len);
        }
        for len in [15usize, 16, 300] {
            let l = PackStreamValue::List(vec![PackStreamValue::Null; len]);
            assert_eq!(roundtrip(&l), l, "list of {}", len);
        }
    }

    #[test]
    fn test_roundtrip_int_boundaries() {
        for v in [
            -16i64, -17, 127, 128, -128, -129, 32_767, 32_768, -32_769,
            i32::MAX as i64 + 1, i64::MAX, i64::MIN,
        ] {
            let value = PackStreamValue::Integer(v);
            assert_eq!(roundtrip(&value), value, "int {}", v);
        }
    }

    #[test]
    fn test_roundtrip_nested_structure() {
        let mut props = HashMap::new();
        props.insert("name".to_string(), PackStreamValue::from("Alice"));
        props.insert("tags".to_string(), PackStreamValue::List(vec![1.into(), 2.into()]));

        let node = PackStreamStructure::new(
            marker::NODE_TAG,
            vec![
                PackStreamValue::Integer(1),
                PackStreamValue::List(vec!["Person".into()]),
                PackStreamValue::Map(props),
            ],
        );
        let value = PackStreamValue::List(vec![node.into(), PackStreamValue::Float(0.5)]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_roundtrip_bytes() {
        let value = PackStreamValue::Bytes(vec![0u8, 1, 2, 255]);
        assert_eq!(roundtrip(&value), value);
    }
}
