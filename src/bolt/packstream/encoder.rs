//! PackStream encoder.

use bytes::{BufMut, BytesMut};

use super::marker::{self, Container};
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Writes PackStream values into a growable buffer.
#[derive(Debug, Default)]
pub struct PackStreamEncoder {
    buffer: BytesMut,
}

impl PackStreamEncoder {
    /// Create an encoder with a small initial buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(128),
        }
    }

    /// Consume the encoder and return the written bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Append one value.
    pub fn encode(&mut self, value: &PackStreamValue) -> Result<(), PackStreamError> {
        match value {
            PackStreamValue::Null => self.buffer.put_u8(marker::NULL),
            PackStreamValue::Boolean(b) => {
                self.buffer.put_u8(if *b { marker::TRUE } else { marker::FALSE })
            }
            PackStreamValue::Integer(i) => self.put_int(*i),
            PackStreamValue::Float(f) => {
                self.buffer.put_u8(marker::FLOAT_64);
                self.buffer.put_f64(*f);
            }
            PackStreamValue::Bytes(b) => {
                self.put_bytes_header(b.len())?;
                self.buffer.put_slice(b);
            }
            PackStreamValue::String(s) => {
                self.put_header(Container::String, s.len())?;
                self.buffer.put_slice(s.as_bytes());
            }
            PackStreamValue::List(items) => {
                self.put_header(Container::List, items.len())?;
                for item in items {
                    self.encode(item)?;
                }
            }
            PackStreamValue::Map(entries) => {
                self.put_header(Container::Map, entries.len())?;
                for (key, item) in entries {
                    self.put_header(Container::String, key.len())?;
                    self.buffer.put_slice(key.as_bytes());
                    self.encode(item)?;
                }
            }
            PackStreamValue::Structure(s) => self.encode_structure(s)?,
        }
        Ok(())
    }

    /// Append a structure header followed by its fields.
    pub fn encode_structure(&mut self, s: &PackStreamStructure) -> Result<(), PackStreamError> {
        self.put_header(Container::Struct, s.fields.len())?;
        self.buffer.put_u8(s.tag);
        for field in &s.fields {
            self.encode(field)?;
        }
        Ok(())
    }

    fn put_int(&mut self, value: i64) {
        if marker::TINY_INT_RANGE.contains(&value) {
            self.buffer.put_i8(value as i8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buffer.put_u8(marker::INT_8);
            self.buffer.put_i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buffer.put_u8(marker::INT_16);
            self.buffer.put_i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buffer.put_u8(marker::INT_32);
            self.buffer.put_i32(v);
        } else {
            self.buffer.put_u8(marker::INT_64);
            self.buffer.put_i64(value);
        }
    }

    fn put_bytes_header(&mut self, len: usize) -> Result<(), PackStreamError> {
        if let Ok(n) = u8::try_from(len) {
            self.buffer.put_u8(marker::BYTES_8);
            self.buffer.put_u8(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.buffer.put_u8(marker::BYTES_16);
            self.buffer.put_u16(n);
        } else if let Ok(n) = u32::try_from(len) {
            self.buffer.put_u8(marker::BYTES_32);
            self.buffer.put_u32(n);
        } else {
            return Err(PackStreamError::ValueTooLarge("bytes", len));
        }
        Ok(())
    }

    /// Smallest header that can describe a container of `len` entries.
    fn put_header(&mut self, kind: Container, len: usize) -> Result<(), PackStreamError> {
        let (m8, m16, m32) = marker::sized_markers(kind);

        if len <= marker::TINY_MAX {
            self.buffer.put_u8(marker::tiny_base(kind) | len as u8);
        } else if let Ok(n) = u8::try_from(len) {
            self.buffer.put_u8(m8);
            self.buffer.put_u8(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.buffer.put_u8(m16);
            self.buffer.put_u16(n);
        } else {
            match (m32, u32::try_from(len)) {
                (Some(m), Ok(n)) => {
                    self.buffer.put_u8(m);
                    self.buffer.put_u32(n);
                }
                _ => return Err(PackStreamError::ValueTooLarge(container_name(kind), len)),
            }
        }
        Ok(())
    }
}

fn container_name(kind: Container) -> &'static str {
    match kind {
        Container::String => "string",
        Container::List => "list",
        Container::Map => "map",
        Container::Struct => "structure",
    }
}

/// Encode a single value into a fresh buffer.
pub fn encode(value: &PackStreamValue) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(value: PackStreamValue) -> Vec<u8> {
        encode(&value).unwrap().to_vec()
    }

    #[test]
    fn test_int_uses_smallest_form() {
        assert_eq!(bytes_of(PackStreamValue::Integer(1)), vec![0x01]);
        assert_eq!(bytes_of(PackStreamValue::Integer(-16)), vec![0xF0]);
        assert_eq!(bytes_of(PackStreamValue::Integer(-17)), vec![0xC8, 0xEF]);
        assert_eq!(bytes_of(PackStreamValue::Integer(128)), vec![0xC9, 0x00, 0x80]);
        assert_eq!(
            bytes_of(PackStreamValue::Integer(70_000)),
            vec![0xCA, 0x00, 0x01, 0x11, 0x70]
        );
        assert_eq!(bytes_of(PackStreamValue::Integer(i64::MIN))[0], marker::INT_64);
    }

    #[test]
    fn test_string_headers() {
        assert_eq!(bytes_of(PackStreamValue::from("")), vec![0x80]);
        assert_eq!(bytes_of(PackStreamValue::from("ab")), vec![0x82, b'a', b'b']);

        let long = "x".repeat(16);
        let out = bytes_of(PackStreamValue::String(long));
        assert_eq!(&out[..2], &[marker::STRING_8, 16]);

        let longer = "y".repeat(300);
        let out = bytes_of(PackStreamValue::String(longer));
        assert_eq!(&out[..3], &[marker::STRING_16, 0x01, 0x2C]);
    }

    #[test]
    fn test_structure_header() {
        let s = PackStreamStructure::new(0x44, vec![PackStreamValue::Integer(10)]);
        assert_eq!(bytes_of(s.into()), vec![0xB1, 0x44, 0x0A]);
    }

    #[test]
    fn test_oversized_structure_rejected() {
        let s = PackStreamStructure::new(0x01, vec![PackStreamValue::Null; 70_000]);
        let err = encode(&s.into()).unwrap_err();
        assert!(matches!(err, PackStreamError::ValueTooLarge("structure", 70_000)));
    }

    #[test]
    fn test_float_is_always_64_bit() {
        let out = bytes_of(PackStreamValue::Float(1.5));
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], marker::FLOAT_64);
    }
}
