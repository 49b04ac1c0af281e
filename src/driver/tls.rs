//! Socket setup: TCP connect and optional rustls upgrade.
//!
//! Without a trust callback the server chain is checked against the webpki
//! roots. With one, chain validation is replaced by the callback, which sees
//! the leaf certificate's key type and SHA-512 fingerprint. Handshake
//! signatures are still verified in both cases.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::{
    CertificateError, ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore,
    SignatureScheme, StreamOwned,
};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use sha2::{Digest, Sha512};
use tracing::{debug, warn};

use super::bolt::connection::BoltStream;
use super::config::{SessionParams, TlsMode, TrustCallback, TrustInfo};
use super::error::{DriverError, DriverResult};

// ============================================================================
// Transport
// ============================================================================

/// Byte stream under a session.
#[derive(Debug)]
pub enum Transport {
    /// Plain TCP
    Plain(TcpStream),
    /// TLS over TCP
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl BoltStream for Transport {
    fn shutdown(&mut self) {
        match self {
            Transport::Plain(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
            Transport::Tls(s) => {
                s.conn.send_close_notify();
                let _ = s.flush();
                let _ = s.sock.shutdown(Shutdown::Both);
            }
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.flush(),
        }
    }
}

/// Open the socket described by `params`, upgrading to TLS when required.
pub fn open(params: &SessionParams) -> DriverResult<Transport> {
    let tcp = connect_tcp(params)?;
    match params.tls {
        TlsMode::Disabled => Ok(Transport::Plain(tcp)),
        TlsMode::Required => upgrade(tcp, params).map(|s| Transport::Tls(Box::new(s))),
    }
}

fn connect_tcp(params: &SessionParams) -> DriverResult<TcpStream> {
    let target = params.socket_target();
    let addrs: Vec<SocketAddr> = target
        .to_socket_addrs()
        .map_err(|e| DriverError::connection(format!("Failed to resolve {}: {}", target, e)))?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        let attempt = match params.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                debug!("TCP connected to {}", addr);
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) => {
                debug!("TCP connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(DriverError::connection(match last_error {
        Some(e) => format!("Failed to connect to {}: {}", target, e),
        None => format!("No addresses found for {}", target),
    }))
}

fn upgrade(
    mut tcp: TcpStream,
    params: &SessionParams,
) -> DriverResult<StreamOwned<ClientConnection, TcpStream>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| DriverError::connection(format!("TLS setup failed: {}", e)))?;

    let hostname = params.endpoint.server_name();
    let rejected = Arc::new(AtomicBool::new(false));

    let builder = match &params.trust_callback {
        Some(callback) => {
            let ip = tcp
                .peer_addr()
                .map(|a| a.ip().to_string())
                .unwrap_or_default();
            let verifier = CallbackVerifier {
                callback: callback.clone(),
                hostname: hostname.clone(),
                ip,
                rejected: rejected.clone(),
                provider: provider.clone(),
            };
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
        }
        None => {
            let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots)
        }
    };

    let config = match &params.client_cert {
        Some((cert, key)) => {
            let certs = load_certs(cert)?;
            let key = load_key(key)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| DriverError::configuration(format!("Invalid client certificate: {}", e)))?
        }
        None => builder.with_no_client_auth(),
    };

    let server_name = ServerName::try_from(hostname.clone())
        .map_err(|_| DriverError::configuration(format!("Invalid TLS server name: {}", hostname)))?;
    let mut conn = ClientConnection::new(Arc::new(config), server_name)
        .map_err(|e| DriverError::connection(format!("TLS setup failed: {}", e)))?;

    while conn.is_handshaking() {
        if let Err(e) = conn.complete_io(&mut tcp) {
            if rejected.load(Ordering::SeqCst) {
                return Err(DriverError::UntrustedServer(format!(
                    "certificate of {} was rejected",
                    hostname
                )));
            }
            return Err(DriverError::connection(format!("TLS handshake failed: {}", e)));
        }
    }

    debug!(
        "TLS established with {} ({:?})",
        hostname,
        conn.protocol_version()
    );
    Ok(StreamOwned::new(conn, tcp))
}

fn open_pem(path: &Path) -> DriverResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| unreadable(path, e))
}

fn unreadable(path: &Path, e: io::Error) -> DriverError {
    DriverError::configuration(format!("cannot read {}: {}", path.display(), e))
}

fn load_certs(path: &Path) -> DriverResult<Vec<CertificateDer<'static>>> {
    let mut reader = open_pem(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| unreadable(path, e))?;
    if certs.is_empty() {
        return Err(DriverError::configuration(format!(
            "No certificate found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> DriverResult<PrivateKeyDer<'static>> {
    let mut reader = open_pem(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| unreadable(path, e))?
        .ok_or_else(|| {
            DriverError::configuration(format!("No private key found in {}", path.display()))
        })
}

// ============================================================================
// Certificate inspection
// ============================================================================

const RSA_OID: &[u8] = &[0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01];
const EC_OID: &[u8] = &[0x06, 0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01];
const ED25519_OID: &[u8] = &[0x06, 0x03, 0x2B, 0x65, 0x70];

/// Public key algorithm of a DER certificate.
pub fn key_type(der: &[u8]) -> &'static str {
    let contains = |oid: &[u8]| der.windows(oid.len()).any(|w| w == oid);
    if contains(RSA_OID) {
        "rsa"
    } else if contains(EC_OID) {
        "ec"
    } else if contains(ED25519_OID) {
        "ed25519"
    } else {
        "unknown"
    }
}

/// Lowercase hex SHA-512 of a DER certificate.
pub fn fingerprint(der: &[u8]) -> String {
    hex::encode(Sha512::digest(der))
}

// ============================================================================
// Trust callback verifier
// ============================================================================

#[derive(Debug)]
struct CallbackVerifier {
    callback: TrustCallback,
    hostname: String,
    ip: String,
    rejected: Arc<AtomicBool>,
    provider: Arc<CryptoProvider>,
}

impl CallbackVerifier {
    fn ask(&self, info: &TrustInfo) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.callback.call(info))) {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                warn!("Trust callback rejected {}", info.hostname);
                false
            }
            Ok(Err(e)) => {
                warn!("Trust callback failed for {}: {}", info.hostname, e);
                false
            }
            Err(_) => {
                warn!("Trust callback panicked for {}", info.hostname);
                false
            }
        }
    }
}

impl ServerCertVerifier for CallbackVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let info = TrustInfo {
            hostname: self.hostname.clone(),
            ip: self.ip.clone(),
            key_type: key_type(end_entity).to_string(),
            fingerprint: fingerprint(end_entity),
        };
        if self.ask(&info) {
            Ok(ServerCertVerified::assertion())
        } else {
            self.rejected.store(true, Ordering::SeqCst);
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Peer IP of a connected endpoint, for logging.
pub fn peer_ip(transport: &Transport) -> Option<IpAddr> {
    let tcp = match transport {
        Transport::Plain(s) => s,
        Transport::Tls(s) => &s.sock,
    };
    tcp.peer_addr().ok().map(|a| a.ip())
}
