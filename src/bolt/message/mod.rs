//! Bolt protocol message types.
//!
//! Only the messages a plain auto-commit/explicit-statement client needs are
//! modelled: HELLO, GOODBYE, RUN, PULL and DISCARD going out, and
//! SUCCESS, RECORD, IGNORED and FAILURE coming back.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use super::packstream::PackStreamStructure;

/// Anything that travels as a single top-level Bolt structure.
pub trait BoltMessage {
    /// Build the wire structure.
    fn to_structure(&self) -> PackStreamStructure;
}

/// Bolt message tags.
pub mod tag {
    /// HELLO message tag (0x01)
    pub const HELLO: u8 = 0x01;
    /// GOODBYE message tag (0x02)
    pub const GOODBYE: u8 = 0x02;
    /// RUN message tag (0x10)
    pub const RUN: u8 = 0x10;
    /// DISCARD message tag (0x2F)
    pub const DISCARD: u8 = 0x2F;
    /// PULL message tag (0x3F)
    pub const PULL: u8 = 0x3F;

    /// SUCCESS response tag (0x70)
    pub const SUCCESS: u8 = 0x70;
    /// RECORD response tag (0x71)
    pub const RECORD: u8 = 0x71;
    /// IGNORED response tag (0x7E)
    pub const IGNORED: u8 = 0x7E;
    /// FAILURE response tag (0x7F)
    pub const FAILURE: u8 = 0x7F;
}
