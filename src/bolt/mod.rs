//! # Bolt Protocol Implementation
//!
//! Low-level Bolt protocol pieces for talking to Bolt-compatible graph
//! databases.
//!
//! ## Overview
//!
//! - **PackStream** - Binary serialization format for all data types
//! - **Message Types** - Request/response message handling
//! - **Handshake** - Protocol version negotiation
//! - **Codec** - Chunked message framing
//!
//! ## Submodules
//!
//! - [`packstream`] - Binary serialization/deserialization
//! - [`message`] - Bolt message types (HELLO, RUN, PULL, etc.)
//! - [`handshake`] - Version negotiation
//! - [`codec`] - tokio_util codecs for message framing
//! - [`error`] - Protocol error types
//!
//! ## Note
//!
//! Most users should use the high-level [`crate::driver`] module instead of
//! interacting with the Bolt protocol directly.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::{BoltResponseCodec, ChunkCodec};
pub use error::{BoltError, BoltResult, HandshakeError};
pub use handshake::{BoltVersion, BOLT_MAGIC, HANDSHAKE_RESPONSE_SIZE};
pub use message::{
    AuthToken, BoltMessage, BoltRequest, BoltResponse, FailureMessage, HelloMessage,
    RecordMessage, RunMessage, SuccessMessage,
};
pub use packstream::{PackStreamDecoder, PackStreamEncoder, PackStreamError, PackStreamStructure, PackStreamValue};
