//! Driver Module
//!
//! Blocking sessions over Bolt with values exchanged as `serde_json::Value`.
//!
//! # Example
//!
//! ```no_run
//! use graphbolt::driver::{Fetched, Session, SessionParams};
//! use serde_json::json;
//!
//! # fn main() -> graphbolt::DriverResult<()> {
//! let params = SessionParams::builder()
//!     .with_host("localhost")
//!     .with_basic_auth("user", "secret")
//!     .with_tls(false)
//!     .build()?;
//! let mut session = Session::connect(params)?;
//!
//! // Step by step
//! session.run("MATCH (n:Person) WHERE n.age > $age RETURN n.name AS name", Some(&json!({"age": 30})))?;
//! session.pull()?;
//! while let Fetched::Row(record) = session.fetch()? {
//!     println!("{}", record);
//! }
//!
//! // Transactions
//! session.begin()?;
//! session.execute_and_fetch_all("CREATE (:Person {name: 'Ann'})", None)?;
//! session.commit()?;
//!
//! session.close();
//! # Ok(())
//! # }
//! ```
//!
//! Temporal values travel as tagged objects; see [`temporal`].

pub mod bolt;
pub mod config;
pub mod host;
pub mod temporal;
pub mod tls;
pub mod types;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod record;
mod session;
mod worker;

// Re-exports
pub use bolt::connection::BoltStream;
pub use config::{
    validate, ConnectOptions, Endpoint, SessionParams, SessionParamsBuilder, TlsMode,
    TrustCallback, TrustInfo, DEFAULT_PORT,
};
pub use error::{DriverError, DriverResult};
pub use host::ValueError;
pub use record::{Columns, Fetched, PullToken, Record, Summary};
pub use session::{Session, SessionState};
pub use tls::Transport;
pub use types::{
    Date, Duration, LocalDateTime, LocalTime, Node, Path, Relationship, UnboundRelationship,
    WireValue,
};
pub use worker::AsyncSession;

/// Build a query parameter object.
///
/// ```
/// let params = graphbolt::params! { "name" => "Ann", "age" => 42 };
/// assert_eq!(params["age"], 42);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::serde_json::Value::Object($crate::serde_json::Map::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::serde_json::Map::new();
        $(
            map.insert(($key).to_string(), $crate::serde_json::json!($value));
        )+
        $crate::serde_json::Value::Object(map)
    }};
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn test_params_macro() {
        assert_eq!(crate::params! {}, json!({}));
        let params = crate::params! { "name" => "Ann", "tags" => vec!["a", "b"] };
        assert_eq!(params, json!({"name": "Ann", "tags": ["a", "b"]}));
    }
}
