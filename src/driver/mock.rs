//! Scripted in-memory server for unit tests.
//!
//! Every server byte is queued up front; the client reads only what it
//! needs since nothing is pipelined.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio_util::codec::{Decoder, Encoder};

use super::bolt::connection::BoltStream;
use crate::bolt::codec::{BoltResponseCodec, ChunkCodec};
use crate::bolt::handshake::HANDSHAKE_SIZE;
use crate::bolt::packstream::{decode, PackStreamValue};
use crate::bolt::{
    BoltRequest, BoltResponse, BoltVersion, FailureMessage, RecordMessage, SuccessMessage,
};

#[derive(Debug, Default)]
struct Script {
    input: Cursor<Vec<u8>>,
    written: Vec<u8>,
    fail_reads: bool,
}

/// Shared handle: clones see the same script and the same written bytes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStream {
    script: Arc<Mutex<Script>>,
}

impl ScriptedStream {
    /// Server that agrees on `version`.
    pub fn new(version: BoltVersion) -> Self {
        Self::empty().raw(&version.to_bytes())
    }

    /// Server that accepts none of the proposals.
    pub fn rejecting() -> Self {
        Self::empty().raw(&[0, 0, 0, 0])
    }

    /// Server that sends nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Server that already accepted HELLO.
    pub fn ready() -> Self {
        Self::new(BoltVersion::V4_4).success(SuccessMessage::new())
    }

    /// Queue raw bytes.
    pub fn raw(self, bytes: &[u8]) -> Self {
        self.script.lock().input.get_mut().extend_from_slice(bytes);
        self
    }

    /// Queue a response message.
    pub fn reply(self, response: BoltResponse) -> Self {
        let mut buf = BytesMut::new();
        BoltResponseCodec::new()
            .encode(&response, &mut buf)
            .expect("encode scripted response");
        self.raw(&buf)
    }

    /// Queue SUCCESS.
    pub fn success(self, success: SuccessMessage) -> Self {
        self.reply(BoltResponse::Success(success))
    }

    /// Queue a RUN answer with these columns.
    pub fn fields(self, names: &[&str]) -> Self {
        self.success(SuccessMessage::with_fields(
            names.iter().map(|s| s.to_string()).collect(),
        ))
    }

    /// Queue RECORD.
    pub fn record(self, fields: Vec<PackStreamValue>) -> Self {
        self.reply(BoltResponse::Record(RecordMessage::new(fields)))
    }

    /// Queue FAILURE.
    pub fn failure(self, code: &str, message: &str) -> Self {
        self.reply(BoltResponse::Failure(FailureMessage::new(code, message)))
    }

    /// Queue a full `RUN; PULL` exchange for a control statement.
    pub fn control_ok(self) -> Self {
        self.fields(&[]).success(SuccessMessage::new())
    }

    /// Make reads fail once the queued bytes are consumed.
    pub fn then_fail_reads(self) -> Self {
        self.script.lock().fail_reads = true;
        self
    }

    /// Everything the client wrote.
    pub fn written(&self) -> Vec<u8> {
        self.script.lock().written.clone()
    }

    /// Requests the client sent after the handshake.
    pub fn sent_requests(&self) -> Vec<BoltRequest> {
        let written = self.written();
        let mut buf = BytesMut::from(&written[HANDSHAKE_SIZE.min(written.len())..]);
        let mut framing = ChunkCodec::new();
        let mut requests = Vec::new();
        while let Some(payload) = framing.decode(&mut buf).expect("framed request") {
            let value = decode(&payload).expect("packstream request");
            let structure = value.as_structure().expect("request structure");
            requests.push(BoltRequest::from_structure(structure).expect("known request"));
        }
        requests
    }

    /// Names of the sent requests, for compact assertions.
    pub fn sent_names(&self) -> Vec<&'static str> {
        self.sent_requests().iter().map(BoltRequest::name).collect()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script.lock();
        let n = script.input.read(buf)?;
        if n == 0 && script.fail_reads {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted reset"));
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.script.lock().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl BoltStream for ScriptedStream {}
