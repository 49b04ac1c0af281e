//! Client side of the Bolt protocol.
//!
//! ```text
//! Session
//!   └── BoltConnection (blocking Read + Write)
//!         ├── handshake (version negotiation)
//!         └── BoltResponseCodec (chunk framing + PackStream)
//! ```

pub mod connection;

pub use connection::BoltConnection;

use crate::bolt::BoltVersion;

/// Supported Bolt versions (highest first)
pub const SUPPORTED_VERSIONS: [BoltVersion; 4] = [
    BoltVersion::V5_0,
    BoltVersion::V4_4,
    BoltVersion::V4_3,
    BoltVersion::V4_0,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_versions() {
        // Highest version first
        assert!(SUPPORTED_VERSIONS.windows(2).all(|w| w[0] > w[1]));
    }
}
