//! # graphbolt
//!
//! A blocking client core for graph databases that speak the Bolt protocol.
//!
//! ## Features
//!
//! - **Bolt 4.0 - 5.0** - Handshake, chunked framing and PackStream
//! - **Session state machine** - Misuse is reported before any I/O
//! - **Host values** - Parameters and rows are `serde_json::Value`, including
//!   nodes, relationships, paths and temporal values
//! - **TLS** - rustls with webpki roots or a custom trust callback
//! - **Async hosts** - [`driver::AsyncSession`] runs sessions on Tokio's blocking pool
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use graphbolt::{Session, SessionParams};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = SessionParams::builder()
//!         .with_host("localhost")
//!         .with_port(7687)
//!         .with_basic_auth("user", "password")
//!         .build()?;
//!     let mut session = Session::connect(params)?;
//!
//!     let records = session.execute_and_fetch_all(
//!         "CREATE (n:Person {name: $name}) RETURN n",
//!         Some(&json!({"name": "Alice"})),
//!     )?;
//!     for record in &records {
//!         println!("{}", record);
//!     }
//!
//!     session.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration from JSON
//!
//! ```rust
//! use graphbolt::{validate, ConnectOptions};
//! use serde_json::json;
//!
//! let options = ConnectOptions::from_json(&json!({
//!     "host": "localhost",
//!     "use_ssl": false,
//!     "client_name": "my-app/1.0"
//! })).unwrap();
//! let params = validate(options).unwrap();
//! assert_eq!(params.port, 7687);
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! # use graphbolt::{DriverError, Session, SessionParams};
//! # fn example(params: SessionParams) {
//! match Session::connect(params) {
//!     Ok(_) => println!("Connected!"),
//!     Err(DriverError::Connection(msg)) => eprintln!("Connection failed: {}", msg),
//!     Err(DriverError::UntrustedServer(msg)) => eprintln!("Rejected: {}", msg),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Sessions, configuration and value marshalling
//! - [`bolt`] - Low-level Bolt protocol implementation
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

#[doc(hidden)]
pub use serde_json;

// Re-exports for convenience
pub use driver::{
    validate, AsyncSession, Columns, ConnectOptions, DriverError, DriverResult, Fetched,
    Record, Session, SessionParams, SessionState, Summary, TlsMode, ValueError, WireValue,
};

pub use bolt::{BoltError, BoltVersion, PackStreamValue};
