//! Raw PackStream values.
//!
//! This is the untyped layer: graph and temporal values are plain
//! [`PackStreamStructure`]s here and only get their meaning in
//! [`crate::driver::types`].

use std::collections::HashMap;

/// A raw PackStream value.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// List of values
    List(Vec<PackStreamValue>),
    /// Map of string keys to values
    Map(HashMap<String, PackStreamValue>),
    /// Tagged structure
    Structure(PackStreamStructure),
}

/// A tagged structure: one signature byte plus positional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStreamStructure {
    /// Signature byte identifying the structure
    pub tag: u8,
    /// Positional fields
    pub fields: Vec<PackStreamValue>,
}

impl PackStreamStructure {
    /// Create a structure.
    pub fn new(tag: u8, fields: Vec<PackStreamValue>) -> Self {
        Self { tag, fields }
    }

    /// Field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&PackStreamValue> {
        self.fields.get(index)
    }
}

impl PackStreamValue {
    /// Integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PackStreamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PackStreamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackStreamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// List payload, if this is a list.
    pub fn as_list(&self) -> Option<&[PackStreamValue]> {
        match self {
            PackStreamValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map payload, if this is a map.
    pub fn as_map(&self) -> Option<&HashMap<String, PackStreamValue>> {
        match self {
            PackStreamValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Structure payload, if this is a structure.
    pub fn as_structure(&self) -> Option<&PackStreamStructure> {
        match self {
            PackStreamValue::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PackStreamValue::Null => "Null",
            PackStreamValue::Boolean(_) => "Boolean",
            PackStreamValue::Integer(_) => "Integer",
            PackStreamValue::Float(_) => "Float",
            PackStreamValue::Bytes(_) => "Bytes",
            PackStreamValue::String(_) => "String",
            PackStreamValue::List(_) => "List",
            PackStreamValue::Map(_) => "Map",
            PackStreamValue::Structure(_) => "Structure",
        }
    }
}

impl From<&str> for PackStreamValue {
    fn from(v: &str) -> Self {
        PackStreamValue::String(v.to_string())
    }
}

impl From<String> for PackStreamValue {
    fn from(v: String) -> Self {
        PackStreamValue::String(v)
    }
}

impl From<i64> for PackStreamValue {
    fn from(v: i64) -> Self {
        PackStreamValue::Integer(v)
    }
}

impl From<PackStreamStructure> for PackStreamValue {
    fn from(v: PackStreamStructure) -> Self {
        PackStreamValue::Structure(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        assert_eq!(PackStreamValue::Integer(7).as_int(), Some(7));
        assert_eq!(PackStreamValue::Boolean(true).as_bool(), Some(true));
        assert_eq!(PackStreamValue::from("x").as_str(), Some("x"));
        assert!(PackStreamValue::Null.as_int().is_none());
        assert!(PackStreamValue::Float(1.0).as_int().is_none());
    }

    #[test]
    fn test_structure_field() {
        let s = PackStreamStructure::new(0x44, vec![PackStreamValue::Integer(3)]);
        assert_eq!(s.field(0), Some(&PackStreamValue::Integer(3)));
        assert_eq!(s.field(1), None);

        let v: PackStreamValue = s.into();
        assert_eq!(v.type_name(), "Structure");
        assert_eq!(v.as_structure().map(|s| s.tag), Some(0x44));
    }
}
