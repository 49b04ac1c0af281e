//! Bolt protocol request messages.
//!
//! Request messages are sent from the client to the server.

use std::collections::HashMap;

use super::{tag, BoltMessage};
use crate::bolt::error::BoltError;
use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};

/// Authentication token carried in HELLO.
#[derive(Clone, PartialEq)]
pub enum AuthToken {
    /// No authentication
    None,
    /// Username and password
    Basic {
        /// Principal (username)
        principal: String,
        /// Credentials (password)
        credentials: String,
    },
}

impl AuthToken {
    /// Create a basic auth token.
    pub fn basic(principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        AuthToken::Basic {
            principal: principal.into(),
            credentials: credentials.into(),
        }
    }

    /// Scheme name as sent on the wire.
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthToken::None => "none",
            AuthToken::Basic { .. } => "basic",
        }
    }

    fn write_into(&self, map: &mut HashMap<String, PackStreamValue>) {
        map.insert("scheme".to_string(), self.scheme().into());
        if let AuthToken::Basic {
            principal,
            credentials,
        } = self
        {
            map.insert("principal".to_string(), principal.as_str().into());
            map.insert("credentials".to_string(), credentials.as_str().into());
        }
    }
}

// Keep credentials out of logs.
impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthToken::None => f.write_str("AuthToken::None"),
            AuthToken::Basic { principal, .. } => f
                .debug_struct("AuthToken::Basic")
                .field("principal", principal)
                .field("credentials", &"***")
                .finish(),
        }
    }
}

/// HELLO message - Initialize connection.
#[derive(Debug, Clone, PartialEq)]
pub struct HelloMessage {
    /// User agent string
    pub user_agent: String,
    /// Authentication token
    pub auth: AuthToken,
}

impl HelloMessage {
    /// Create a HELLO without authentication.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            auth: AuthToken::None,
        }
    }

    /// Set authentication.
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.auth = auth;
        self
    }
}

/// RUN message - Execute a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMessage {
    /// Query string
    pub query: String,
    /// Query parameters
    pub parameters: HashMap<String, PackStreamValue>,
}

impl RunMessage {
    /// Create a RUN with no parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: HashMap::new(),
        }
    }

    /// Set query parameters.
    pub fn with_parameters(mut self, parameters: HashMap<String, PackStreamValue>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// All Bolt request messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltRequest {
    /// HELLO - Initialize connection
    Hello(HelloMessage),
    /// GOODBYE - Close connection gracefully
    Goodbye,
    /// RUN - Execute a query
    Run(RunMessage),
    /// PULL - Pull `n` records (-1 for all)
    Pull { n: i64 },
    /// DISCARD - Discard `n` records (-1 for all)
    Discard { n: i64 },
}

impl BoltRequest {
    /// PULL every remaining record.
    pub fn pull_all() -> Self {
        BoltRequest::Pull { n: -1 }
    }

    /// DISCARD every remaining record.
    pub fn discard_all() -> Self {
        BoltRequest::Discard { n: -1 }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Hello(_) => "HELLO",
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Pull { .. } => "PULL",
            BoltRequest::Discard { .. } => "DISCARD",
        }
    }

    /// Parse a request structure. Used by scripted peers to check what a
    /// client sent.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, BoltError> {
        let map_field = |i: usize| {
            s.field(i)
                .and_then(PackStreamValue::as_map)
                .ok_or_else(|| BoltError::Protocol(format!("field {} of 0x{:02X} must be a map", i, s.tag)))
        };
        let string = |m: &HashMap<String, PackStreamValue>, k: &str| {
            m.get(k).and_then(PackStreamValue::as_str).map(str::to_string)
        };
        let n_of = |m: &HashMap<String, PackStreamValue>| {
            m.get("n").and_then(PackStreamValue::as_int).unwrap_or(-1)
        };

        match s.tag {
            tag::HELLO => {
                let extra = map_field(0)?;
                let auth = match (string(extra, "principal"), string(extra, "credentials")) {
                    (Some(principal), Some(credentials)) => AuthToken::Basic {
                        principal,
                        credentials,
                    },
                    _ => AuthToken::None,
                };
                Ok(BoltRequest::Hello(HelloMessage {
                    user_agent: string(extra, "user_agent").unwrap_or_default(),
                    auth,
                }))
            }
            tag::GOODBYE => Ok(BoltRequest::Goodbye),
            tag::RUN => {
                let query = s
                    .field(0)
                    .and_then(PackStreamValue::as_str)
                    .ok_or_else(|| BoltError::Protocol("RUN query must be a string".to_string()))?;
                Ok(BoltRequest::Run(
                    RunMessage::new(query).with_parameters(map_field(1)?.clone()),
                ))
            }
            tag::PULL => Ok(BoltRequest::Pull { n: n_of(map_field(0)?) }),
            tag::DISCARD => Ok(BoltRequest::Discard { n: n_of(map_field(0)?) }),
            other => Err(BoltError::Protocol(format!(
                "Unknown request message tag: 0x{:02X}",
                other
            ))),
        }
    }
}

impl BoltMessage for BoltRequest {
    fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltRequest::Hello(hello) => {
                let mut extra = HashMap::new();
                extra.insert("user_agent".to_string(), hello.user_agent.as_str().into());
                hello.auth.write_into(&mut extra);
                PackStreamStructure::new(tag::HELLO, vec![PackStreamValue::Map(extra)])
            }
            BoltRequest::Goodbye => PackStreamStructure::new(tag::GOODBYE, vec![]),
            BoltRequest::Run(run) => PackStreamStructure::new(
                tag::RUN,
                vec![
                    run.query.as_str().into(),
                    PackStreamValue::Map(run.parameters.clone()),
                    PackStreamValue::Map(HashMap::new()),
                ],
            ),
            BoltRequest::Pull { n } => stream_control(tag::PULL, *n),
            BoltRequest::Discard { n } => stream_control(tag::DISCARD, *n),
        }
    }
}

fn stream_control(tag: u8, n: i64) -> PackStreamStructure {
    let mut extra = HashMap::new();
    extra.insert("n".to_string(), PackStreamValue::Integer(n));
    PackStreamStructure::new(tag, vec![PackStreamValue::Map(extra)])
}
