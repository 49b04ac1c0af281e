//! PackStream decoder.

use bytes::Buf;
use std::collections::HashMap;

use super::marker::{self, Container, Marker};
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Nesting limit for lists, maps and structures.
pub const MAX_DEPTH: usize = 256;

/// Reads PackStream values from a borrowed byte slice.
///
/// The slice is consumed from the front as values are read, so
/// [`remaining`](Self::remaining) always reports the unread tail.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    depth: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a decoder over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, depth: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let m = self.take::<1>()?[0];

        match marker::classify(m) {
            Marker::TinyInt(i) => Ok(PackStreamValue::Integer(i as i64)),
            Marker::Tiny(kind, len) => self.read_container(kind, len),
            Marker::Wide(m) => self.read_wide(m),
        }
    }

    fn read_wide(&mut self, m: u8) -> Result<PackStreamValue, PackStreamError> {
        use marker::*;

        let value = match m {
            NULL => PackStreamValue::Null,
            TRUE => PackStreamValue::Boolean(true),
            FALSE => PackStreamValue::Boolean(false),
            FLOAT_64 => PackStreamValue::Float(f64::from_be_bytes(self.take::<8>()?)),

            INT_8 => PackStreamValue::Integer(i8::from_be_bytes(self.take::<1>()?) as i64),
            INT_16 => PackStreamValue::Integer(i16::from_be_bytes(self.take::<2>()?) as i64),
            INT_32 => PackStreamValue::Integer(i32::from_be_bytes(self.take::<4>()?) as i64),
            INT_64 => PackStreamValue::Integer(i64::from_be_bytes(self.take::<8>()?)),

            BYTES_8 | BYTES_16 | BYTES_32 => {
                let len = self.read_size(m - BYTES_8)?;
                PackStreamValue::Bytes(self.take_slice(len)?.to_vec())
            }

            STRING_8 | STRING_16 | STRING_32 => {
                let len = self.read_size(m - STRING_8)?;
                return self.read_container(Container::String, len);
            }
            LIST_8 | LIST_16 | LIST_32 => {
                let len = self.read_size(m - LIST_8)?;
                return self.read_container(Container::List, len);
            }
            MAP_8 | MAP_16 | MAP_32 => {
                let len = self.read_size(m - MAP_8)?;
                return self.read_container(Container::Map, len);
            }
            STRUCT_8 | STRUCT_16 => {
                let len = self.read_size(m - STRUCT_8)?;
                return self.read_container(Container::Struct, len);
            }

            other => return Err(PackStreamError::UnknownMarker(other)),
        };
        Ok(value)
    }

    /// Read a big-endian size whose width is selected by the marker offset
    /// (0 = u8, 1 = u16, 2 = u32).
    fn read_size(&mut self, width: u8) -> Result<usize, PackStreamError> {
        Ok(match width {
            0 => self.take::<1>()?[0] as usize,
            1 => u16::from_be_bytes(self.take::<2>()?) as usize,
            _ => u32::from_be_bytes(self.take::<4>()?) as usize,
        })
    }

    fn read_container(
        &mut self,
        kind: Container,
        len: usize,
    ) -> Result<PackStreamValue, PackStreamError> {
        if kind == Container::String {
            let raw = self.take_slice(len)?;
            return std::str::from_utf8(raw)
                .map(|s| PackStreamValue::String(s.to_string()))
                .map_err(|e| PackStreamError::InvalidUtf8(e.to_string()));
        }

        if self.depth >= MAX_DEPTH {
            return Err(PackStreamError::InvalidStructure(format!(
                "nesting deeper than {}",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let result = match kind {
            Container::List => self.read_list(len),
            Container::Map => self.read_map(len),
            _ => self.read_struct(len),
        };
        self.depth -= 1;
        result
    }

    fn read_list(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        // Each element needs at least one byte, so `len` is bounded by input.
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(PackStreamValue::List(items))
    }

    fn read_map(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let mut entries = HashMap::with_capacity(len.min(self.remaining() / 2));
        for _ in 0..len {
            let key = match self.decode()? {
                PackStreamValue::String(s) => s,
                _ => return Err(PackStreamError::InvalidMapKey),
            };
            let value = self.decode()?;
            entries.insert(key, value);
        }
        Ok(PackStreamValue::Map(entries))
    }

    fn read_struct(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let tag = self.take::<1>()?[0];
        let mut fields = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            fields.push(self.decode()?);
        }
        Ok(PackStreamValue::Structure(PackStreamStructure::new(tag, fields)))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], PackStreamError> {
        if self.data.remaining() < N {
            return Err(PackStreamError::UnexpectedEof);
        }
        let mut out = [0u8; N];
        self.data.copy_to_slice(&mut out);
        Ok(out)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.data.len() < len {
            return Err(PackStreamError::UnexpectedEof);
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }
}

/// Decode exactly one value from `data`.
pub fn decode(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    let value = decoder.decode()?;
    if decoder.remaining() > 0 {
        return Err(PackStreamError::TrailingBytes(decoder.remaining()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(&[0xC0]).unwrap(), PackStreamValue::Null);
        assert_eq!(decode(&[0xC3]).unwrap(), PackStreamValue::Boolean(true));
        assert_eq!(decode(&[0xF0]).unwrap(), PackStreamValue::Integer(-16));
        assert_eq!(decode(&[0xC8, 0xEF]).unwrap(), PackStreamValue::Integer(-17));
        assert_eq!(
            decode(&[0xC9, 0x01, 0x00]).unwrap(),
            PackStreamValue::Integer(256)
        );
    }

    #[test]
    fn test_decode_wide_string() {
        let mut data = vec![0xD0, 20];
        data.extend(std::iter::repeat(b'z').take(20));
        assert_eq!(
            decode(&data).unwrap(),
            PackStreamValue::String("z".repeat(20))
        );
    }

    #[test]
    fn test_decode_struct() {
        let value = decode(&[0xB1, 0x44, 0x0A]).unwrap();
        let s = value.as_structure().unwrap();
        assert_eq!(s.tag, 0x44);
        assert_eq!(s.fields, vec![PackStreamValue::Integer(10)]);
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(decode(&[0xCB, 0x00]), Err(PackStreamError::UnexpectedEof)));
        assert!(matches!(decode(&[0x83, b'a']), Err(PackStreamError::UnexpectedEof)));
        assert!(matches!(decode(&[0x92, 0x01]), Err(PackStreamError::UnexpectedEof)));
    }

    #[test]
    fn test_non_string_map_key() {
        assert!(matches!(
            decode(&[0xA1, 0x01, 0x02]),
            Err(PackStreamError::InvalidMapKey)
        ));
    }

    #[test]
    fn test_unknown_marker() {
        assert!(matches!(
            decode(&[0xC4]),
            Err(PackStreamError::UnknownMarker(0xC4))
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        assert!(matches!(
            decode(&[0x01, 0x02]),
            Err(PackStreamError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let data = vec![0x91; MAX_DEPTH + 1];
        assert!(matches!(
            decode(&data),
            Err(PackStreamError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_sequential_values() {
        let mut decoder = PackStreamDecoder::new(&[0x01, 0x81, b'a', 0xC0]);
        assert_eq!(decoder.decode().unwrap(), PackStreamValue::Integer(1));
        assert_eq!(decoder.decode().unwrap(), PackStreamValue::from("a"));
        assert_eq!(decoder.decode().unwrap(), PackStreamValue::Null);
        assert_eq!(decoder.remaining(), 0);
    }
}
