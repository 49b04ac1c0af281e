//! Query results: columns, records and summaries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{DriverError, DriverResult};
use super::host::{self, ValueError};
use crate::bolt::message::SuccessMessage;

// ============================================================================
// Columns
// ============================================================================

/// Column names of a result stream in server order.
///
/// Cloning is cheap; every [`Record`] of a stream shares one instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    inner: Arc<ColumnIndex>,
}

#[derive(Debug, Default, PartialEq)]
struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Columns {
    /// Build from server-ordered names.
    pub fn new(names: Vec<String>) -> Self {
        let positions = names
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        Self {
            inner: Arc::new(ColumnIndex { names, positions }),
        }
    }

    /// Names in server order.
    pub fn names(&self) -> &[String] {
        &self.inner.names
    }

    /// Position of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.inner.positions.get(name).copied()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.inner.names.len()
    }

    /// Whether the statement returns no columns.
    pub fn is_empty(&self) -> bool {
        self.inner.names.is_empty()
    }

    /// Whether two handles share the same index.
    pub fn ptr_eq(&self, other: &Columns) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// Record
// ============================================================================

/// One row of a result, fully decoded to host values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Columns,
    values: Vec<Value>,
}

impl Record {
    /// Create a record. `values` must follow `columns` order.
    pub fn new(columns: Columns, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column names.
    pub fn keys(&self) -> &[String] {
        self.columns.names()
    }

    /// Shared column index.
    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Record length
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by column name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns.index_of(key).and_then(|i| self.values.get(i))
    }

    /// Value by position.
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Deserialize a column into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> DriverResult<T> {
        let value = self.get(key).ok_or_else(|| {
            DriverError::Value(ValueError::UnsupportedValue(format!("no column '{}'", key)))
        })?;
        T::deserialize(value).map_err(|e| {
            DriverError::Value(ValueError::UnsupportedValue(format!("column '{}': {}", key, e)))
        })
    }

    /// Column name to value object.
    pub fn to_map(&self) -> Map<String, Value> {
        self.keys()
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// Consume into values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys()
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.names().iter().zip(self.values.iter())
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Metadata of the SUCCESS that ends a result stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    metadata: Map<String, Value>,
}

impl Summary {
    /// Decode SUCCESS metadata.
    pub fn from_success(success: SuccessMessage) -> Result<Self, ValueError> {
        let metadata = success
            .metadata
            .into_iter()
            .map(|(k, v)| Ok((k, host::decode_raw(v)?)))
            .collect::<Result<_, ValueError>>()?;
        Ok(Self { metadata })
    }

    /// Raw metadata entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Whether the server holds back further records.
    pub fn has_more(&self) -> bool {
        self.get("has_more").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Bookmark after a committed unit of work.
    pub fn bookmark(&self) -> Option<&str> {
        self.get("bookmark").and_then(Value::as_str)
    }

    /// Statement type (`r`, `w`, `rw`, `s`).
    pub fn query_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    /// Update counters.
    pub fn stats(&self) -> Option<&Map<String, Value>> {
        self.get("stats").and_then(Value::as_object)
    }

    /// Milliseconds until the first record was available.
    pub fn t_first(&self) -> Option<i64> {
        self.get("t_first").and_then(Value::as_i64)
    }

    /// Milliseconds until the last record was consumed.
    pub fn t_last(&self) -> Option<i64> {
        self.get("t_last").and_then(Value::as_i64)
    }

    /// Whole metadata object.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

// ============================================================================
// Fetch results
// ============================================================================

/// Outcome of one `fetch` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// A decoded row
    Row(Record),
    /// End of the stream
    Summary(Summary),
}

/// Acknowledgement of a PULL: how many records were requested (-1 is all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullToken {
    /// Requested batch size
    pub n: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::PackStreamValue;
    use serde_json::json;

    fn create_test_record() -> Record {
        let columns = Columns::new(vec!["name".into(), "age".into(), "active".into()]);
        Record::new(columns, vec![json!("Alice"), json!(30), json!(true)])
    }

    #[test]
    fn test_record_get() {
        let record = create_test_record();
        assert_eq!(record.get("name"), Some(&json!("Alice")));
        assert_eq!(record.get("age"), Some(&json!(30)));
        assert_eq!(record.get("unknown"), None);
        assert_eq!(record.get_by_index(2), Some(&json!(true)));
        assert_eq!(record.get_by_index(3), None);
    }

    #[test]
    fn test_record_get_as() {
        let record = create_test_record();
        assert_eq!(record.get_as::<String>("name").unwrap(), "Alice");
        assert_eq!(record.get_as::<i64>("age").unwrap(), 30);
        assert!(record.get_as::<i64>("name").is_err());
        assert!(record.get_as::<i64>("missing").is_err());
    }

    #[test]
    fn test_records_share_columns() {
        let columns = Columns::new(vec!["x".into()]);
        let a = Record::new(columns.clone(), vec![json!(1)]);
        let b = Record::new(columns.clone(), vec![json!(2)]);
        assert!(a.columns().ptr_eq(b.columns()));
        assert_eq!(columns.index_of("x"), Some(0));
    }

    #[test]
    fn test_record_display_and_map() {
        let record = create_test_record();
        assert_eq!(record.to_string(), r#"{name: "Alice", age: 30, active: true}"#);
        assert_eq!(record.to_map()["active"], json!(true));

        let keys: Vec<&String> = (&record).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_empty_columns() {
        let columns = Columns::new(vec![]);
        assert!(columns.is_empty());
        assert_eq!(columns.names(), &[] as &[String]);
    }

    #[test]
    fn test_summary_accessors() {
        let mut stats = HashMap::new();
        stats.insert("nodes-created".to_string(), PackStreamValue::Integer(2));
        let success = SuccessMessage::new()
            .with_entry("bookmark", "bm:1".into())
            .with_entry("type", "w".into())
            .with_entry("t_last", PackStreamValue::Integer(4))
            .with_entry("stats", PackStreamValue::Map(stats));

        let summary = Summary::from_success(success).unwrap();
        assert_eq!(summary.bookmark(), Some("bm:1"));
        assert_eq!(summary.query_type(), Some("w"));
        assert_eq!(summary.t_last(), Some(4));
        assert_eq!(summary.t_first(), None);
        assert!(!summary.has_more());
        assert_eq!(summary.stats().and_then(|s| s.get("nodes-created")), Some(&json!(2)));
    }

    #[test]
    fn test_summary_rejects_bytes() {
        let success = SuccessMessage::new().with_entry("blob", PackStreamValue::Bytes(vec![1]));
        assert!(Summary::from_success(success).is_err());
    }
}
