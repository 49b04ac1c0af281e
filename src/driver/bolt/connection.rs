//! Bolt protocol connection for client-side use.
//!
//! Handles the handshake and message framing over any blocking byte stream.

use std::io::{self, Read, Write};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::bolt::codec::BoltResponseCodec;
use crate::bolt::handshake::{self, HandshakeError, HANDSHAKE_RESPONSE_SIZE};
use crate::bolt::{BoltError, BoltRequest, BoltResponse, BoltResult, BoltVersion};

use super::SUPPORTED_VERSIONS;

const READ_CHUNK: usize = 8192;

/// A blocking byte stream a session can run over.
pub trait BoltStream: Read + Write {
    /// Release the underlying socket. The default does nothing.
    fn shutdown(&mut self) {}
}

/// Bolt connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoltConnectionState {
    /// Stream open, not handshaked
    Connected,
    /// Handshake completed
    Ready,
    /// Handshake or I/O failed
    Failed,
    /// Closed
    Closed,
}

/// Client-side Bolt connection.
///
/// Owns the stream, performs the handshake, and frames messages.
pub struct BoltConnection<S> {
    /// Byte stream
    stream: S,
    /// Response codec (decodes responses, encodes requests)
    codec: BoltResponseCodec,
    /// Read buffer
    read_buffer: BytesMut,
    /// Write buffer
    write_buffer: BytesMut,
    /// Negotiated protocol version
    protocol_version: Option<BoltVersion>,
    /// Connection state
    state: BoltConnectionState,
}

impl<S: BoltStream> BoltConnection<S> {
    /// Wrap an open stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            codec: BoltResponseCodec::new(),
            read_buffer: BytesMut::with_capacity(READ_CHUNK),
            write_buffer: BytesMut::with_capacity(READ_CHUNK),
            protocol_version: None,
            state: BoltConnectionState::Connected,
        }
    }

    /// Perform the Bolt handshake.
    ///
    /// Sends magic number and version proposals, receives negotiated version.
    pub fn handshake(&mut self) -> BoltResult<BoltVersion> {
        if self.state != BoltConnectionState::Connected {
            return Err(BoltError::Protocol(format!(
                "Cannot handshake in state {:?}",
                self.state
            )));
        }

        let result = self.exchange_versions();
        match &result {
            Ok(version) => {
                debug!("Negotiated Bolt {}", version);
                self.protocol_version = Some(*version);
                self.state = BoltConnectionState::Ready;
            }
            Err(e) => {
                debug!("Bolt handshake failed: {}", e);
                self.state = BoltConnectionState::Failed;
            }
        }
        result
    }

    fn exchange_versions(&mut self) -> BoltResult<BoltVersion> {
        let request = handshake::client_handshake(&SUPPORTED_VERSIONS);
        self.stream.write_all(&request)?;
        self.stream.flush()?;

        let mut response = [0u8; HANDSHAKE_RESPONSE_SIZE];
        self.stream.read_exact(&mut response).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                BoltError::Handshake(HandshakeError::ConnectionClosed)
            } else {
                BoltError::Io(e)
            }
        })?;

        Ok(handshake::agreed_version(response, &SUPPORTED_VERSIONS)?)
    }

    /// Send a Bolt request message.
    pub fn send(&mut self, request: &BoltRequest) -> BoltResult<()> {
        self.ensure_ready("send")?;
        debug!("C: {}", request.name());

        self.write_buffer.clear();
        self.codec.encode(request, &mut self.write_buffer)?;

        let written = self
            .stream
            .write_all(&self.write_buffer)
            .and_then(|_| self.stream.flush());
        if let Err(e) = written {
            self.state = BoltConnectionState::Failed;
            return Err(e.into());
        }
        Ok(())
    }

    /// Receive a Bolt response message.
    pub fn recv(&mut self) -> BoltResult<BoltResponse> {
        self.ensure_ready("receive")?;

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(response)) => {
                    match &response {
                        BoltResponse::Record(_) => trace!("S: RECORD"),
                        other => debug!("S: {}", other.name()),
                    }
                    return Ok(response);
                }
                Ok(None) => {}
                Err(e) => {
                    self.state = BoltConnectionState::Failed;
                    return Err(e);
                }
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.state = BoltConnectionState::Failed;
                    return Err(e.into());
                }
            };

            if n == 0 {
                self.state = BoltConnectionState::Closed;
                return Err(BoltError::ConnectionClosed);
            }
            self.read_buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Send a request and receive a single response.
    pub fn request(&mut self, request: &BoltRequest) -> BoltResult<BoltResponse> {
        self.send(request)?;
        self.recv()
    }

    /// Close the connection, sending GOODBYE if it is still usable.
    pub fn close(&mut self) {
        if self.state == BoltConnectionState::Ready {
            if let Err(e) = self.send(&BoltRequest::Goodbye) {
                warn!("GOODBYE failed: {}", e);
            }
        }
        self.state = BoltConnectionState::Closed;
        self.stream.shutdown();
    }

    fn ensure_ready(&self, action: &str) -> BoltResult<()> {
        if self.state == BoltConnectionState::Ready {
            Ok(())
        } else {
            Err(BoltError::Protocol(format!(
                "Cannot {} in state {:?}",
                action, self.state
            )))
        }
    }

    /// Get the negotiated protocol version.
    pub fn protocol_version(&self) -> Option<BoltVersion> {
        self.protocol_version
    }

    /// Get the connection state.
    pub fn state(&self) -> BoltConnectionState {
        self.state
    }

    /// Check if connection is ready for messages.
    pub fn is_ready(&self) -> bool {
        self.state == BoltConnectionState::Ready
    }

    /// Underlying stream.
    pub fn stream(&self) -> &S {
        &self.stream
    }
}

impl<S> std::fmt::Debug for BoltConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltConnection")
            .field("state", &self.state)
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::handshake::BOLT_MAGIC;
    use crate::bolt::SuccessMessage;
    use crate::driver::mock::ScriptedStream;

    #[test]
    fn test_handshake_sends_proposals() {
        let stream = ScriptedStream::new(BoltVersion::V4_4);
        let mut conn = BoltConnection::new(stream.clone());

        assert_eq!(conn.handshake().unwrap(), BoltVersion::V4_4);
        assert!(conn.is_ready());

        let sent = stream.written();
        assert_eq!(&sent[..4], &BOLT_MAGIC);
        assert_eq!(&sent[4..8], &[0, 0, 0, 5]);
        assert_eq!(&sent[8..12], &[0, 0, 4, 4]);
    }

    #[test]
    fn test_handshake_no_version() {
        let mut conn = BoltConnection::new(ScriptedStream::rejecting());
        let err = conn.handshake().unwrap_err();
        assert!(matches!(
            err,
            BoltError::Handshake(HandshakeError::NoCompatibleVersion)
        ));
        assert_eq!(conn.state(), BoltConnectionState::Failed);
    }

    #[test]
    fn test_handshake_server_hangs_up() {
        let mut conn = BoltConnection::new(ScriptedStream::empty());
        assert!(matches!(
            conn.handshake(),
            Err(BoltError::Handshake(HandshakeError::ConnectionClosed))
        ));
    }

    #[test]
    fn test_send_before_handshake() {
        let mut conn = BoltConnection::new(ScriptedStream::new(BoltVersion::V4_4));
        assert!(matches!(
            conn.send(&BoltRequest::Goodbye),
            Err(BoltError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_response() {
        let stream = ScriptedStream::new(BoltVersion::V5_0)
            .reply(BoltResponse::Success(SuccessMessage::with_fields(vec!["n".into()])));
        let mut conn = BoltConnection::new(stream.clone());
        conn.handshake().unwrap();

        let response = conn.request(&BoltRequest::pull_all()).unwrap();
        match response {
            BoltResponse::Success(s) => assert_eq!(s.fields(), vec!["n".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(stream.sent_requests(), vec![BoltRequest::pull_all()]);
    }

    #[test]
    fn test_recv_eof_closes() {
        let mut conn = BoltConnection::new(ScriptedStream::new(BoltVersion::V4_4));
        conn.handshake().unwrap();
        assert!(matches!(conn.recv(), Err(BoltError::ConnectionClosed)));
        assert_eq!(conn.state(), BoltConnectionState::Closed);
    }

    #[test]
    fn test_close_sends_goodbye() {
        let stream = ScriptedStream::new(BoltVersion::V4_4);
        let mut conn = BoltConnection::new(stream.clone());
        conn.handshake().unwrap();
        conn.close();
        conn.close();

        assert_eq!(stream.sent_requests(), vec![BoltRequest::Goodbye]);
        assert_eq!(conn.state(), BoltConnectionState::Closed);
    }
}
