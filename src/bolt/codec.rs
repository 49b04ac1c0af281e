//! Bolt chunked message framing for tokio_util.
//!
//! Messages are split into chunks with a 2-byte big-endian length prefix
//! and terminated by a zero-length chunk. The codecs here only touch
//! in-memory buffers, so they are driven just as well by a blocking socket
//! loop as by a `Framed` stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::message::{BoltMessage, BoltResponse};
use super::packstream::{decode, PackStreamEncoder};
use super::BoltError;

/// Maximum chunk size (16KB)
pub const MAX_CHUNK_SIZE: usize = 16384;

/// End of message marker (0x00 0x00)
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Default upper bound for a reassembled message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Chunk framing: reassembles chunks into whole message payloads and splits
/// outgoing payloads into chunks.
#[derive(Debug)]
pub struct ChunkCodec {
    max_message_size: usize,
    message_buffer: BytesMut,
}

impl ChunkCodec {
    /// Create a framer with the default size limit.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a framer with a custom size limit.
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            message_buffer: BytesMut::with_capacity(4096),
        }
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkCodec {
    type Item = Bytes;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_size = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_size == 0 {
                src.advance(2);
                if self.message_buffer.is_empty() {
                    // NOOP keep-alive
                    continue;
                }
                return Ok(Some(self.message_buffer.split().freeze()));
            }

            if src.len() < 2 + chunk_size {
                src.reserve(2 + chunk_size - src.len());
                return Ok(None);
            }

            let size = self.message_buffer.len() + chunk_size;
            if size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
        }
    }
}

impl Encoder<&[u8]> for ChunkCodec {
    type Error = BoltError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        let chunks = payload.len().div_ceil(MAX_CHUNK_SIZE);
        dst.reserve(payload.len() + chunks * 2 + END_MARKER.len());

        for chunk in payload.chunks(MAX_CHUNK_SIZE) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&END_MARKER);
        Ok(())
    }
}

/// Client-side codec: decodes [`BoltResponse`]s and encodes any
/// [`BoltMessage`].
///
/// Encoding responses is what a server does; it is supported so scripted
/// peers can be built from the same code.
#[derive(Debug, Default)]
pub struct BoltResponseCodec {
    framing: ChunkCodec,
}

impl BoltResponseCodec {
    /// Create a new response codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for BoltResponseCodec {
    type Item = BoltResponse;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(payload) = self.framing.decode(src)? else {
            return Ok(None);
        };

        let value = decode(&payload)?;
        let structure = value.as_structure().ok_or_else(|| {
            BoltError::Protocol(format!("Expected message structure, got {}", value.type_name()))
        })?;

        BoltResponse::from_structure(structure).map(Some)
    }
}

impl<M: BoltMessage> Encoder<&M> for BoltResponseCodec {
    type Error = BoltError;

    fn encode(&mut self, item: &M, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut encoder = PackStreamEncoder::new();
        encoder.encode_structure(&item.to_structure())?;
        self.framing.encode(&encoder.into_bytes()[..], dst)
    }
}
