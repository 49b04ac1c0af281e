//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client.

use std::collections::HashMap;

use super::{tag, BoltMessage};
use crate::bolt::error::BoltError;
use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};

/// All Bolt response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Operation completed successfully
    Success(SuccessMessage),
    /// RECORD - Query result record
    Record(RecordMessage),
    /// FAILURE - Operation failed
    Failure(FailureMessage),
    /// IGNORED - Message was ignored (connection in FAILED state)
    Ignored,
}

impl BoltResponse {
    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, BoltError> {
        match s.tag {
            tag::SUCCESS => Ok(BoltResponse::Success(SuccessMessage {
                metadata: s.field(0).and_then(|v| v.as_map()).cloned().unwrap_or_default(),
            })),
            tag::RECORD => {
                let fields = s
                    .field(0)
                    .and_then(|v| v.as_list())
                    .ok_or_else(|| BoltError::Protocol("RECORD requires a field list".to_string()))?;
                Ok(BoltResponse::Record(RecordMessage::new(fields.to_vec())))
            }
            tag::FAILURE => {
                let metadata = s.field(0).and_then(|v| v.as_map());
                let text = |key: &str| {
                    metadata
                        .and_then(|m| m.get(key))
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                };
                Ok(BoltResponse::Failure(FailureMessage {
                    code: text("code").unwrap_or_else(|| "Unknown".to_string()),
                    message: text("message").unwrap_or_default(),
                }))
            }
            tag::IGNORED => Ok(BoltResponse::Ignored),
            other => Err(BoltError::Protocol(format!(
                "Unknown response message tag: 0x{:02X}",
                other
            ))),
        }
    }
}

impl BoltMessage for BoltResponse {
    fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltResponse::Success(msg) => PackStreamStructure::new(
                tag::SUCCESS,
                vec![PackStreamValue::Map(msg.metadata.clone())],
            ),
            BoltResponse::Record(msg) => PackStreamStructure::new(
                tag::RECORD,
                vec![PackStreamValue::List(msg.fields.clone())],
            ),
            BoltResponse::Failure(msg) => {
                let mut metadata = HashMap::new();
                metadata.insert("code".to_string(), msg.code.as_str().into());
                metadata.insert("message".to_string(), msg.message.as_str().into());
                PackStreamStructure::new(tag::FAILURE, vec![PackStreamValue::Map(metadata)])
            }
            BoltResponse::Ignored => PackStreamStructure::new(tag::IGNORED, vec![]),
        }
    }
}

/// SUCCESS message - Operation completed successfully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: HashMap<String, PackStreamValue>,
}

impl SuccessMessage {
    /// Create a SUCCESS message with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a RUN-style SUCCESS carrying column names.
    pub fn with_fields(fields: Vec<String>) -> Self {
        Self::new().with_entry(
            "fields",
            PackStreamValue::List(fields.into_iter().map(PackStreamValue::String).collect()),
        )
    }

    /// Add a metadata entry.
    pub fn with_entry(mut self, key: &str, value: PackStreamValue) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Get metadata entry.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    /// Server agent string from a HELLO reply.
    pub fn server(&self) -> Option<&str> {
        self.get("server").and_then(|v| v.as_str())
    }

    /// Connection id from a HELLO reply.
    pub fn connection_id(&self) -> Option<&str> {
        self.get("connection_id").and_then(|v| v.as_str())
    }

    /// Column names from a RUN reply. Missing or empty `fields` gives an
    /// empty list.
    pub fn fields(&self) -> Vec<String> {
        self.get("fields")
            .and_then(|v| v.as_list())
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether more records remain after a partial PULL.
    pub fn has_more(&self) -> bool {
        self.get("has_more").and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

/// RECORD message - Query result record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMessage {
    /// Field values, in column order
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// Create a record.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }
}

/// FAILURE message - Operation failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureMessage {
    /// Server error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl FailureMessage {
    /// Create a failure.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reparse(response: &BoltResponse) -> BoltResponse {
        BoltResponse::from_structure(&response.to_structure()).unwrap()
    }

    #[test]
    fn test_success_fields() {
        let msg = SuccessMessage::with_fields(vec!["a".into(), "b".into()]);
        assert_eq!(msg.fields(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(SuccessMessage::new().fields(), Vec::<String>::new());
    }

    #[test]
    fn test_success_has_more() {
        assert!(!SuccessMessage::new().has_more());
        let msg = SuccessMessage::new().with_entry("has_more", PackStreamValue::Boolean(true));
        assert!(msg.has_more());
    }

    #[test]
    fn test_success_without_metadata_field() {
        let s = PackStreamStructure::new(tag::SUCCESS, vec![]);
        assert_eq!(
            BoltResponse::from_structure(&s).unwrap(),
            BoltResponse::Success(SuccessMessage::new())
        );
    }

    #[test]
    fn test_failure_roundtrip() {
        let failure = BoltResponse::Failure(FailureMessage::new(
            "Neo.ClientError.Statement.SyntaxError",
            "bad query",
        ));
        assert_eq!(reparse(&failure), failure);
    }

    #[test]
    fn test_record_roundtrip() {
        let record = BoltResponse::Record(RecordMessage::new(vec![1.into(), "x".into()]));
        assert_eq!(reparse(&record), record);
        assert_eq!(record.name(), "RECORD");
    }

    #[test]
    fn test_record_requires_list() {
        let s = PackStreamStructure::new(tag::RECORD, vec![PackStreamValue::Null]);
        assert!(matches!(
            BoltResponse::from_structure(&s),
            Err(BoltError::Protocol(_))
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let s = PackStreamStructure::new(0x55, vec![]);
        assert!(BoltResponse::from_structure(&s).is_err());
    }
}
