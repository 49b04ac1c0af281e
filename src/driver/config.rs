//! Session configuration.
//!
//! [`ConnectOptions`] is the loosely-typed form a host hands over (usually
//! straight out of JSON). [`validate`] turns it into [`SessionParams`], the
//! only form [`Session::connect`](super::Session::connect) accepts.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::error::{DriverError, DriverResult};
use crate::bolt::AuthToken;

/// Default Bolt port.
pub const DEFAULT_PORT: u16 = 7687;

/// Default user agent sent in HELLO.
pub fn default_user_agent() -> String {
    format!("graphbolt/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Raw options
// ============================================================================

/// Connection options as supplied by the host. Every field is optional;
/// misspelled fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectOptions {
    /// Server host name
    pub host: Option<String>,
    /// Server numeric IP address
    pub address: Option<String>,
    /// Server port
    pub port: Option<i64>,
    /// Username for basic auth
    pub username: Option<String>,
    /// Password for basic auth
    pub password: Option<String>,
    /// User agent sent in HELLO
    pub client_name: Option<String>,
    /// Whether TLS is required
    pub use_ssl: Option<bool>,
    /// PEM client certificate
    pub ssl_cert: Option<PathBuf>,
    /// PEM client private key
    pub ssl_key: Option<PathBuf>,
}

impl ConnectOptions {
    /// Parse options from a JSON object.
    pub fn from_json(value: &Value) -> DriverResult<Self> {
        if !value.is_object() {
            return Err(DriverError::configuration(
                "connect options have to be an object",
            ));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| DriverError::configuration(format!("invalid connect options: {}", e)))
    }
}

// ============================================================================
// Validated parameters
// ============================================================================

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Host name, resolved at connect time
    Host(String),
    /// Numeric address
    Address(IpAddr),
}

impl Endpoint {
    /// Name used for TLS server-name checks and logging.
    pub fn server_name(&self) -> String {
        match self {
            Endpoint::Host(host) => host.clone(),
            Endpoint::Address(ip) => ip.to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Host(host) => write!(f, "{}", host),
            Endpoint::Address(IpAddr::V6(ip)) => write!(f, "[{}]", ip),
            Endpoint::Address(ip) => write!(f, "{}", ip),
        }
    }
}

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Plain TCP
    Disabled,
    /// TLS is mandatory
    #[default]
    Required,
}

/// Facts about the server certificate handed to a [`TrustCallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustInfo {
    /// Name the client connected to
    pub hostname: String,
    /// Peer IP address
    pub ip: String,
    /// Leaf public key algorithm: `rsa`, `ec`, `ed25519` or `unknown`
    pub key_type: String,
    /// Lowercase hex SHA-512 of the leaf certificate DER
    pub fingerprint: String,
}

type TrustFn = dyn Fn(&TrustInfo) -> Result<bool, String> + Send + Sync;

/// User decision on an unverified server certificate.
///
/// Returning `Ok(false)`, returning an error or panicking all reject the
/// server.
#[derive(Clone)]
pub struct TrustCallback(Arc<TrustFn>);

impl TrustCallback {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TrustInfo) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Ask the callback.
    pub fn call(&self, info: &TrustInfo) -> Result<bool, String> {
        (self.0)(info)
    }
}

impl fmt::Debug for TrustCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrustCallback(..)")
    }
}

/// Validated session parameters.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Server endpoint
    pub endpoint: Endpoint,
    /// Server port
    pub port: u16,
    /// Username for basic auth
    pub username: Option<String>,
    /// Password for basic auth
    pub password: Option<String>,
    /// User agent sent in HELLO
    pub user_agent: String,
    /// Transport security
    pub tls: TlsMode,
    /// Client certificate and key
    pub client_cert: Option<(PathBuf, PathBuf)>,
    /// Custom certificate trust decision
    pub trust_callback: Option<TrustCallback>,
    /// TCP connect timeout
    pub connect_timeout: Option<Duration>,
}

impl SessionParams {
    /// Start a builder.
    pub fn builder() -> SessionParamsBuilder {
        SessionParamsBuilder::default()
    }

    /// Auth token for HELLO.
    pub fn auth(&self) -> AuthToken {
        match &self.username {
            Some(user) => AuthToken::basic(user, self.password.clone().unwrap_or_default()),
            None => AuthToken::None,
        }
    }

    /// `host:port` as understood by `ToSocketAddrs`.
    pub fn socket_target(&self) -> String {
        format!("{}:{}", self.endpoint, self.port)
    }
}

/// Validate raw options. No I/O happens here.
pub fn validate(options: ConnectOptions) -> DriverResult<SessionParams> {
    validate_with(options, None, None)
}

fn validate_with(
    options: ConnectOptions,
    trust_callback: Option<TrustCallback>,
    connect_timeout: Option<Duration>,
) -> DriverResult<SessionParams> {
    let endpoint = match (options.host, options.address) {
        (Some(_), Some(_)) => {
            return Err(DriverError::configuration(
                "only one of `host` and `address` may be given",
            ))
        }
        (None, None) => {
            return Err(DriverError::configuration(
                "one of `host` or `address` is required",
            ))
        }
        (Some(host), None) => {
            if host.is_empty() {
                return Err(DriverError::configuration("`host` must not be empty"));
            }
            Endpoint::Host(host)
        }
        (None, Some(address)) => {
            let ip = address.parse::<IpAddr>().map_err(|_| {
                DriverError::configuration(format!(
                    "`address` has to be a numeric IP address, got '{}'",
                    address
                ))
            })?;
            Endpoint::Address(ip)
        }
    };

    let port = match options.port {
        None => DEFAULT_PORT,
        Some(port) => u16::try_from(port).map_err(|_| {
            DriverError::configuration(format!(
                "`port` out of range, expected 0-65535, got {}",
                port
            ))
        })?,
    };

    let client_cert = match (options.ssl_cert, options.ssl_key) {
        (Some(cert), Some(key)) => Some((cert, key)),
        (None, None) => None,
        _ => {
            return Err(DriverError::configuration(
                "`ssl_cert` and `ssl_key` have to be given together",
            ))
        }
    };

    let tls = match options.use_ssl {
        Some(false) => TlsMode::Disabled,
        Some(true) | None => TlsMode::Required,
    };

    if trust_callback.is_some() && tls == TlsMode::Disabled {
        return Err(DriverError::configuration(
            "a trust callback requires TLS to be enabled",
        ));
    }
    if client_cert.is_some() && tls == TlsMode::Disabled {
        return Err(DriverError::configuration(
            "a client certificate requires TLS to be enabled",
        ));
    }

    Ok(SessionParams {
        endpoint,
        port,
        username: options.username,
        password: options.password,
        user_agent: options.client_name.unwrap_or_else(default_user_agent),
        tls,
        client_cert,
        trust_callback,
        connect_timeout,
    })
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`SessionParams`]; `build` runs the same checks as
/// [`validate`].
#[derive(Debug, Default)]
pub struct SessionParamsBuilder {
    options: ConnectOptions,
    trust_callback: Option<TrustCallback>,
    connect_timeout: Option<Duration>,
}

impl SessionParamsBuilder {
    /// Start from already parsed options.
    pub fn from_options(options: ConnectOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Set host name.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.options.host = Some(host.into());
        self
    }

    /// Set numeric address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.options.address = Some(address.into());
        self
    }

    /// Set port.
    pub fn with_port(mut self, port: i64) -> Self {
        self.options.port = Some(port);
        self
    }

    /// Set basic auth credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.options.username = Some(username.into());
        self.options.password = Some(password.into());
        self
    }

    /// Set user agent.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.options.client_name = Some(name.into());
        self
    }

    /// Enable or disable TLS.
    pub fn with_tls(mut self, enabled: bool) -> Self {
        self.options.use_ssl = Some(enabled);
        self
    }

    /// Set client certificate and key paths.
    pub fn with_client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.options.ssl_cert = Some(cert.into());
        self.options.ssl_key = Some(key.into());
        self
    }

    /// Set trust callback.
    pub fn with_trust_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&TrustInfo) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.trust_callback = Some(TrustCallback::new(f));
        self
    }

    /// Set connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Validate and build.
    pub fn build(self) -> DriverResult<SessionParams> {
        validate_with(self.options, self.trust_callback, self.connect_timeout)
    }
}
