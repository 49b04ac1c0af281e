//! PackStream marker bytes.
//!
//! Every PackStream value starts with a marker byte. Small values (tiny ints)
//! and short containers carry their payload or size in the low nibble of the
//! marker itself; everything else is followed by a fixed-width size or body.

/// Null marker
pub const NULL: u8 = 0xC0;
/// 64-bit IEEE 754 float
pub const FLOAT_64: u8 = 0xC1;
/// Boolean false
pub const FALSE: u8 = 0xC2;
/// Boolean true
pub const TRUE: u8 = 0xC3;

/// Integer markers (tiny ints -16..=127 are inline)
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// Byte array markers
pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

/// String markers
pub const TINY_STRING: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

/// List markers
pub const TINY_LIST: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Map markers
pub const TINY_MAP: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structure markers
pub const TINY_STRUCT: u8 = 0xB0;
pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;

/// Largest size that fits in a tiny marker's low nibble.
pub const TINY_MAX: usize = 15;

/// Range of integers encoded directly in the marker byte.
pub const TINY_INT_RANGE: std::ops::RangeInclusive<i64> = -16..=127;

/// Structure tags for graph types
pub const NODE_TAG: u8 = 0x4E; // 'N'
pub const RELATIONSHIP_TAG: u8 = 0x52; // 'R'
pub const UNBOUND_RELATIONSHIP_TAG: u8 = 0x72; // 'r'
pub const PATH_TAG: u8 = 0x50; // 'P'

/// Structure tags for temporal types
pub const DATE_TAG: u8 = 0x44; // 'D'
pub const LOCAL_TIME_TAG: u8 = 0x74; // 't'
pub const LOCAL_DATE_TIME_TAG: u8 = 0x64; // 'd'
pub const DURATION_TAG: u8 = 0x45; // 'E'

/// Container kinds that share the tiny/8/16/32 size layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    String,
    List,
    Map,
    Struct,
}

/// Classification of a marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Integer stored in the marker itself
    TinyInt(i8),
    /// Container whose size is stored in the low nibble
    Tiny(Container, usize),
    /// Any other marker; size or payload follows
    Wide(u8),
}

/// Classify a marker byte.
#[inline]
pub fn classify(marker: u8) -> Marker {
    match marker {
        0x00..=0x7F | 0xF0..=0xFF => Marker::TinyInt(marker as i8),
        0x80..=0x8F => Marker::Tiny(Container::String, (marker & 0x0F) as usize),
        0x90..=0x9F => Marker::Tiny(Container::List, (marker & 0x0F) as usize),
        0xA0..=0xAF => Marker::Tiny(Container::Map, (marker & 0x0F) as usize),
        0xB0..=0xBF => Marker::Tiny(Container::Struct, (marker & 0x0F) as usize),
        other => Marker::Wide(other),
    }
}

/// Base marker for the tiny form of a container.
#[inline]
pub fn tiny_base(kind: Container) -> u8 {
    match kind {
        Container::String => TINY_STRING,
        Container::List => TINY_LIST,
        Container::Map => TINY_MAP,
        Container::Struct => TINY_STRUCT,
    }
}

/// Wide markers for a container in (8, 16, 32)-bit size order.
/// Structures have no 32-bit form.
#[inline]
pub fn sized_markers(kind: Container) -> (u8, u8, Option<u8>) {
    match kind {
        Container::String => (STRING_8, STRING_16, Some(STRING_32)),
        Container::List => (LIST_8, LIST_16, Some(LIST_32)),
        Container::Map => (MAP_8, MAP_16, Some(MAP_32)),
        Container::Struct => (STRUCT_8, STRUCT_16, None),
    }
}
