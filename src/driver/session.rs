//! Session: one connection, one result stream at a time.
//!
//! ```text
//!              run              pull
//!   Ready ──────────► Executing ─────► Fetching ──┐ fetch(row)
//!     ▲  ▲                ▲               │  ▲────┘
//!     │  │                └── has_more ───┤
//!     │  └──────────── fetch(summary) ────┘
//!     │ commit/rollback
//!   InTransaction (run/pull/fetch cycle returns here)
//! ```
//!
//! Any protocol failure moves the session to `Bad`, which only `close`
//! leaves. Misuse is caught before anything touches the wire and leaves the
//! state unchanged.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::bolt::connection::{BoltConnection, BoltStream};
use super::config::SessionParams;
use super::error::{DriverError, DriverResult};
use super::host::{self, ValueError};
use super::record::{Columns, Fetched, PullToken, Record, Summary};
use super::tls::{self, Transport};
use crate::bolt::{
    AuthToken, BoltRequest, BoltResponse, BoltVersion, FailureMessage, HelloMessage,
    PackStreamValue, RunMessage,
};

// ============================================================================
// SessionState
// ============================================================================

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle, no transaction
    Ready,
    /// RUN accepted, columns known, nothing pulled yet
    Executing,
    /// PULL sent, records pending
    Fetching,
    /// Idle inside an explicit transaction
    InTransaction,
    /// A protocol error happened; only `close` is allowed
    Bad,
    /// Closed
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Session
// ============================================================================

/// A blocking Bolt session.
pub struct Session<S: BoltStream = Transport> {
    connection: BoltConnection<S>,
    state: SessionState,
    in_transaction: bool,
    columns: Columns,
    server: Option<String>,
    connection_id: Option<String>,
}

impl Session<Transport> {
    /// Connect, negotiate and authenticate.
    ///
    /// On error every partially built resource has been released.
    pub fn connect(params: SessionParams) -> DriverResult<Self> {
        debug!("Connecting to {}", params.socket_target());
        let transport = tls::open(&params)?;
        if let Some(ip) = tls::peer_ip(&transport) {
            debug!("Connected to {}", ip);
        }
        let hello = HelloMessage::new(params.user_agent.clone()).with_auth(params.auth());
        Session::from_stream(transport, hello)
    }
}

impl<S: BoltStream> Session<S> {
    /// Run the handshake and HELLO over an already open stream.
    pub fn from_stream(stream: S, hello: HelloMessage) -> DriverResult<Self> {
        let mut connection = BoltConnection::new(stream);
        connection
            .handshake()
            .map_err(|e| DriverError::connection(format!("Bolt handshake failed: {}", e)))?;

        debug!(
            "HELLO as {} ({} auth)",
            hello.user_agent,
            hello.auth.scheme()
        );
        let response = connection
            .request(&BoltRequest::Hello(hello))
            .map_err(|e| DriverError::connection(format!("HELLO failed: {}", e)))?;

        let success = match response {
            BoltResponse::Success(success) => success,
            BoltResponse::Failure(FailureMessage { code, message }) => {
                return Err(DriverError::connection(format!(
                    "HELLO rejected: {} - {}",
                    code, message
                )))
            }
            other => {
                return Err(DriverError::connection(format!(
                    "Unexpected {} in response to HELLO",
                    other.name()
                )))
            }
        };

        let server = success.server().map(str::to_string);
        let connection_id = success.connection_id().map(str::to_string);
        debug!(
            "Session ready (server: {}, connection: {})",
            server.as_deref().unwrap_or("unknown"),
            connection_id.as_deref().unwrap_or("unknown"),
        );

        Ok(Self {
            connection,
            state: SessionState::Ready,
            in_transaction: false,
            columns: Columns::default(),
            server,
            connection_id,
        })
    }

    /// Connect with basic or no auth over an open stream.
    pub fn from_stream_with_auth(
        stream: S,
        user_agent: impl Into<String>,
        auth: AuthToken,
    ) -> DriverResult<Self> {
        Self::from_stream(stream, HelloMessage::new(user_agent).with_auth(auth))
    }

    // ===== Accessors =====

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an explicit transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Columns of the current or last result stream.
    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Server agent reported in HELLO.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Connection id reported in HELLO.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Negotiated Bolt version.
    pub fn protocol_version(&self) -> Option<BoltVersion> {
        self.connection.protocol_version()
    }

    // ===== Query execution =====

    /// Send RUN and return the result columns.
    pub fn run(&mut self, query: &str, params: Option<&Value>) -> DriverResult<Columns> {
        self.ensure_usable()?;
        if !matches!(self.state, SessionState::Ready | SessionState::InTransaction) {
            return Err(DriverError::contract(format!(
                "cannot run a query while a result stream is open (state {})",
                self.state
            )));
        }

        let parameters: HashMap<String, PackStreamValue> = host::encode_params(params)?
            .into_iter()
            .map(|(k, v)| (k, v.into()))
            .collect();

        debug!("RUN {}", query);
        let request = BoltRequest::Run(RunMessage::new(query).with_parameters(parameters));
        let response = self.exchange(&request)?;

        match response {
            BoltResponse::Success(success) => {
                self.columns = Columns::new(success.fields());
                self.set_state(SessionState::Executing);
                Ok(self.columns.clone())
            }
            other => Err(self.unexpected(other, "RUN")),
        }
    }

    /// Send `PULL {n: -1}`.
    pub fn pull(&mut self) -> DriverResult<PullToken> {
        self.ensure_usable()?;
        if self.state != SessionState::Executing {
            return Err(DriverError::contract(format!(
                "pull requires an executed query (state {})",
                self.state
            )));
        }

        let request = BoltRequest::pull_all();
        self.send(&request)?;
        self.set_state(SessionState::Fetching);
        Ok(PullToken { n: -1 })
    }

    /// Read the next row or the summary.
    pub fn fetch(&mut self) -> DriverResult<Fetched> {
        self.ensure_usable()?;
        if self.state != SessionState::Fetching {
            return Err(DriverError::contract(format!(
                "fetch requires a pulled result stream (state {})",
                self.state
            )));
        }

        match self.receive()? {
            BoltResponse::Record(record) => {
                trace!("RECORD with {} fields", record.fields.len());
                let values = record
                    .fields
                    .into_iter()
                    .map(host::decode_raw)
                    .collect::<Result<Vec<_>, ValueError>>();
                match values {
                    Ok(values) => Ok(Fetched::Row(Record::new(self.columns.clone(), values))),
                    Err(e) => {
                        self.set_state(SessionState::Bad);
                        Err(e.into())
                    }
                }
            }
            BoltResponse::Success(success) => {
                let summary = match Summary::from_success(success) {
                    Ok(summary) => summary,
                    Err(e) => {
                        self.set_state(SessionState::Bad);
                        return Err(e.into());
                    }
                };
                if summary.has_more() {
                    self.set_state(SessionState::Executing);
                } else {
                    self.finish_stream();
                }
                Ok(Fetched::Summary(summary))
            }
            other => Err(self.unexpected(other, "PULL")),
        }
    }

    /// Throw away the rest of the current result stream.
    ///
    /// From `Fetching` the pending records are read and dropped undecoded;
    /// from `Executing` a DISCARD is sent.
    pub fn discard_all(&mut self) -> DriverResult<Summary> {
        self.ensure_usable()?;
        match self.state {
            SessionState::Fetching => {}
            SessionState::Executing => {
                self.send(&BoltRequest::discard_all())?;
                self.set_state(SessionState::Fetching);
            }
            state => {
                return Err(DriverError::contract(format!(
                    "nothing to discard (state {})",
                    state
                )))
            }
        }

        let mut dropped = 0usize;
        loop {
            match self.receive()? {
                BoltResponse::Record(_) => dropped += 1,
                BoltResponse::Success(success) if success.has_more() => {
                    self.send(&BoltRequest::discard_all())?;
                }
                BoltResponse::Success(success) => {
                    trace!("Discarded {} records", dropped);
                    let summary = match Summary::from_success(success) {
                        Ok(summary) => summary,
                        Err(e) => {
                            self.set_state(SessionState::Bad);
                            return Err(e.into());
                        }
                    };
                    self.finish_stream();
                    return Ok(summary);
                }
                other => return Err(self.unexpected(other, "DISCARD")),
            }
        }
    }

    /// Next record, pulling first if needed. `None` once the stream ends.
    pub fn fetch_one(&mut self) -> DriverResult<Option<Record>> {
        self.ensure_usable()?;
        loop {
            match self.state {
                SessionState::Executing => {
                    self.pull()?;
                }
                SessionState::Fetching => match self.fetch()? {
                    Fetched::Row(record) => return Ok(Some(record)),
                    Fetched::Summary(_) if self.state == SessionState::Executing => {}
                    Fetched::Summary(_) => return Ok(None),
                },
                state => {
                    return Err(DriverError::contract(format!(
                        "no result stream to fetch from (state {})",
                        state
                    )))
                }
            }
        }
    }

    /// Every remaining record.
    pub fn fetch_all(&mut self) -> DriverResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.fetch_one()? {
            records.push(record);
        }
        Ok(records)
    }

    /// `run` followed by `fetch_all`.
    pub fn execute_and_fetch_all(
        &mut self,
        query: &str,
        params: Option<&Value>,
    ) -> DriverResult<Vec<Record>> {
        self.run(query, params)?;
        self.fetch_all()
    }

    // ===== Transaction control =====

    /// Open an explicit transaction.
    pub fn begin(&mut self) -> DriverResult<()> {
        self.ensure_usable()?;
        if self.in_transaction {
            return Err(DriverError::contract("a transaction is already open"));
        }
        if self.state != SessionState::Ready {
            return Err(DriverError::contract(format!(
                "cannot begin while a result stream is open (state {})",
                self.state
            )));
        }

        self.control("BEGIN")?;
        self.in_transaction = true;
        self.set_state(SessionState::InTransaction);
        Ok(())
    }

    /// Commit the open transaction.
    pub fn commit(&mut self) -> DriverResult<()> {
        self.end_transaction("COMMIT")
    }

    /// Roll back the open transaction.
    pub fn rollback(&mut self) -> DriverResult<()> {
        self.end_transaction("ROLLBACK")
    }

    fn end_transaction(&mut self, statement: &str) -> DriverResult<()> {
        self.ensure_usable()?;
        if !self.in_transaction {
            return Err(DriverError::contract(format!(
                "{} without an open transaction",
                statement
            )));
        }
        if self.state != SessionState::InTransaction {
            return Err(DriverError::contract(format!(
                "cannot {} while a result stream is open (state {})",
                statement, self.state
            )));
        }

        self.control(statement)?;
        self.in_transaction = false;
        self.set_state(SessionState::Ready);
        Ok(())
    }

    // Run a statement that must not produce rows and drain it.
    fn control(&mut self, statement: &str) -> DriverResult<()> {
        self.run(statement, None)?;
        self.pull()?;
        loop {
            match self.fetch()? {
                Fetched::Row(_) => {
                    self.set_state(SessionState::Bad);
                    return Err(DriverError::UnexpectedData(format!(
                        "{} returned rows",
                        statement
                    )));
                }
                Fetched::Summary(_) if self.state == SessionState::Executing => {
                    self.pull()?;
                }
                Fetched::Summary(_) => return Ok(()),
            }
        }
    }

    // ===== Close =====

    /// Send GOODBYE and release the connection. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.in_transaction {
            debug!("Closing with an open transaction; the server rolls it back");
        }
        self.connection.close();
        self.in_transaction = false;
        self.set_state(SessionState::Closed);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    // ===== Internals =====

    fn ensure_usable(&self) -> DriverResult<()> {
        match self.state {
            SessionState::Bad | SessionState::Closed => {
                Err(DriverError::SessionUnusable(self.state))
            }
            _ => Ok(()),
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn finish_stream(&mut self) {
        let next = if self.in_transaction {
            SessionState::InTransaction
        } else {
            SessionState::Ready
        };
        self.set_state(next);
    }

    fn send(&mut self, request: &BoltRequest) -> DriverResult<()> {
        self.connection.send(request).map_err(|e| {
            self.set_state(SessionState::Bad);
            DriverError::from(e)
        })
    }

    fn receive(&mut self) -> DriverResult<BoltResponse> {
        self.connection.recv().map_err(|e| {
            self.set_state(SessionState::Bad);
            DriverError::from(e)
        })
    }

    fn exchange(&mut self, request: &BoltRequest) -> DriverResult<BoltResponse> {
        self.send(request)?;
        self.receive()
    }

    // Any response that does not fit the protocol step poisons the session.
    fn unexpected(&mut self, response: BoltResponse, step: &str) -> DriverError {
        self.set_state(SessionState::Bad);
        match response {
            BoltResponse::Failure(FailureMessage { code, message }) => {
                debug!("{} failed: {} - {}", step, code, message);
                DriverError::Server { code, message }
            }
            BoltResponse::Ignored => {
                DriverError::protocol(format!("{} was ignored by the server", step))
            }
            other => DriverError::protocol(format!(
                "Unexpected {} in response to {}",
                other.name(),
                step
            )),
        }
    }
}

impl<S: BoltStream> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("in_transaction", &self.in_transaction)
            .field("server", &self.server)
            .field("connection", &self.connection)
            .finish()
    }
}

impl<S: BoltStream> Drop for Session<S> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            if self.state == SessionState::Bad {
                warn!("Dropping session in Bad state");
            }
            self.close();
        }
    }
}
