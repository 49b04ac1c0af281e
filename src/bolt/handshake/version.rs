//! Bolt protocol version definitions.

use std::fmt;

/// A Bolt protocol version.
///
/// On the wire a version occupies four bytes: `[0, range, minor, major]`.
/// The range byte lets a client propose several consecutive minor versions
/// at once; this client always proposes exact versions, so it is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoltVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl BoltVersion {
    /// Bolt 4.0
    pub const V4_0: BoltVersion = BoltVersion::new(4, 0);
    /// Bolt 4.3
    pub const V4_3: BoltVersion = BoltVersion::new(4, 3);
    /// Bolt 4.4
    pub const V4_4: BoltVersion = BoltVersion::new(4, 4);
    /// Bolt 5.0 (nodes and relationships carry element ids)
    pub const V5_0: BoltVersion = BoltVersion::new(5, 0);

    /// Create a version.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Encode as a proposal slot.
    pub fn to_bytes(self) -> [u8; 4] {
        [0, 0, self.minor, self.major]
    }

    /// Decode a server response. All-zero means the server accepted none
    /// of the proposals.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        match bytes {
            [0, 0, 0, 0] => None,
            [_, _, minor, major] => Some(Self::new(major, minor)),
        }
    }

    /// Whether graph entities carry a trailing element-id field.
    pub fn uses_element_ids(self) -> bool {
        self.major >= 5
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bytes() {
        assert_eq!(BoltVersion::V4_3.to_bytes(), [0x00, 0x00, 0x03, 0x04]);
        assert_eq!(
            BoltVersion::from_bytes([0x00, 0x00, 0x04, 0x04]),
            Some(BoltVersion::V4_4)
        );
        assert_eq!(BoltVersion::from_bytes([0, 0, 0, 0]), None);
    }

    #[test]
    fn test_version_ordering() {
        assert!(BoltVersion::V5_0 > BoltVersion::V4_4);
        assert!(BoltVersion::V4_4 > BoltVersion::V4_3);
        assert!(BoltVersion::V4_3 > BoltVersion::V4_0);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(BoltVersion::V4_0.to_string(), "4.0");
        assert_eq!(BoltVersion::V5_0.to_string(), "5.0");
    }

    #[test]
    fn test_uses_element_ids() {
        assert!(!BoltVersion::V4_4.uses_element_ids());
        assert!(BoltVersion::V5_0.uses_element_ids());
    }
}
