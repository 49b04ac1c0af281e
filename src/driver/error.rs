//! Driver error types.

use std::io;
use thiserror::Error;

use super::host::ValueError;
use super::session::SessionState;
use crate::bolt::BoltError;

// ============================================================================
// DriverError
// ============================================================================

/// Errors surfaced by the driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Bad parameters, detected before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// TCP, TLS, handshake or HELLO failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// The trust callback rejected the server certificate
    #[error("Untrusted server: {0}")]
    UntrustedServer(String),

    /// FAILURE reported by the server
    #[error("Server error: {code} - {message}")]
    Server {
        /// Server error code, e.g. `Neo.ClientError.Statement.SyntaxError`
        code: String,
        /// Server message
        message: String,
    },

    /// Malformed or unexpected message, IGNORED, or I/O failure mid-stream
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Value marshalling failure
    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    /// API misuse for the current session state
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Operation attempted on a `Bad` or `Closed` session
    #[error("Session unusable: session is {0}")]
    SessionUnusable(SessionState),

    /// A control statement produced rows
    #[error("Unexpected data: {0}")]
    UnexpectedData(String),

    /// Worker failure (panic or cancellation of a blocking task)
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error outside a session, e.g. reading certificate files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DriverError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a contract violation.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Create a server error.
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for misuse of the session API.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_) | Self::SessionUnusable(_))
    }

    /// True for failures reported by or while talking to the server.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Protocol(_))
    }
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Handshake(e) => DriverError::Connection(e.to_string()),
            other => DriverError::Protocol(other.to_string()),
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Driver result type.
pub type DriverResult<T> = Result<T, DriverError>;
