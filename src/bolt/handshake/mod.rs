//! Bolt protocol handshake.
//!
//! The Bolt handshake consists of:
//! 1. Client sends 4-byte magic number (0x6060B017)
//! 2. Client sends 4 x 4-byte version proposals (highest first)
//! 3. Server responds with 4-byte agreed version (or 0 if none)

mod version;

pub use version::BoltVersion;

pub use super::error::HandshakeError;

/// Bolt protocol magic number: 0x6060B017
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Size of the complete handshake message from client (magic + 4 versions)
pub const HANDSHAKE_SIZE: usize = 20;

/// Size of server response (negotiated version)
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// Number of proposal slots in the handshake.
pub const PROPOSAL_SLOTS: usize = 4;

/// Build the client handshake: magic followed by up to four proposals.
/// Unused slots are zero.
pub fn client_handshake(proposals: &[BoltVersion]) -> [u8; HANDSHAKE_SIZE] {
    let mut buf = [0u8; HANDSHAKE_SIZE];
    buf[..4].copy_from_slice(&BOLT_MAGIC);
    for (slot, version) in proposals.iter().take(PROPOSAL_SLOTS).enumerate() {
        let offset = 4 + slot * 4;
        buf[offset..offset + 4].copy_from_slice(&version.to_bytes());
    }
    buf
}

/// Interpret the server's 4-byte answer against what was proposed.
pub fn agreed_version(
    response: [u8; HANDSHAKE_RESPONSE_SIZE],
    proposals: &[BoltVersion],
) -> Result<BoltVersion, HandshakeError> {
    let version =
        BoltVersion::from_bytes(response).ok_or(HandshakeError::NoCompatibleVersion)?;
    if proposals.iter().take(PROPOSAL_SLOTS).any(|p| *p == version) {
        Ok(version)
    } else {
        Err(HandshakeError::UnexpectedVersion(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPOSALS: [BoltVersion; 4] = [
        BoltVersion::V5_0,
        BoltVersion::V4_4,
        BoltVersion::V4_3,
        BoltVersion::V4_0,
    ];

    #[test]
    fn test_client_handshake_layout() {
        let buf = client_handshake(&PROPOSALS);
        assert_eq!(&buf[..4], &BOLT_MAGIC);
        assert_eq!(&buf[4..8], &[0, 0, 0, 5]);
        assert_eq!(&buf[8..12], &[0, 0, 4, 4]);
        assert_eq!(&buf[16..20], &[0, 0, 0, 4]);
    }

    #[test]
    fn test_short_proposal_list_is_zero_padded() {
        let buf = client_handshake(&[BoltVersion::V4_4]);
        assert_eq!(&buf[8..], &[0u8; 12]);
    }

    #[test]
    fn test_agreed_version() {
        assert_eq!(
            agreed_version([0, 0, 4, 4], &PROPOSALS),
            Ok(BoltVersion::V4_4)
        );
        assert_eq!(
            agreed_version([0, 0, 0, 0], &PROPOSALS),
            Err(HandshakeError::NoCompatibleVersion)
        );
        assert_eq!(
            agreed_version([0, 0, 1, 4], &PROPOSALS),
            Err(HandshakeError::UnexpectedVersion([0, 0, 1, 4]))
        );
    }
}
