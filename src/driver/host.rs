//! Host value marshalling.
//!
//! The host value model is [`serde_json::Value`]. [`encode`] turns a host
//! value into a [`WireValue`] ready to be sent as a query parameter and
//! [`decode`] turns a received [`WireValue`] back into a host value.
//!
//! Graph entities decode to plain objects:
//!
//! | Wire | Host |
//! |---|---|
//! | Node | `{id, labels, properties}` |
//! | Relationship | `{id, startNodeId, endNodeId, type, properties}` |
//! | UnboundRelationship | same as Relationship with both ids `-1` |
//! | Path | `{nodes, relationships}` with endpoints resolved |
//! | temporal | `{objectType, <components>, display}` |

use std::collections::HashMap;

use serde_json::{json, Map, Number, Value};
use thiserror::Error;

use super::temporal::{TemporalKind, OBJECT_TYPE_KEY};
use super::types::{
    Date, Duration, LocalDateTime, LocalTime, Node, Relationship, UnboundRelationship, WireValue,
    UNBOUND_NODE_ID,
};
use crate::bolt::packstream::PackStreamValue;

/// Largest magnitude at which every integer is exactly representable in f64.
/// Whole-number floats in temporal components are accepted up to this bound.
pub const MAX_SAFE_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0; // 2^53

/// Value marshalling errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// A number cannot be carried as i64 or f64 without changing it
    #[error("precision loss: {0}")]
    PrecisionLoss(String),

    /// A temporal object is missing a component or has a non-integer one
    #[error("invalid temporal shape: {0}")]
    InvalidTemporalShape(String),

    /// The value has no counterpart on the other side
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// The server sent a type this client does not understand
    #[error("unknown wire type: {0}")]
    UnknownWireType(String),

    /// Path indices do not describe a valid traversal
    #[error("unresolved path: {0}")]
    UnresolvedPath(String),
}

// ============================================================================
// Host -> wire
// ============================================================================

/// Encode a host value.
pub fn encode(value: &Value) -> Result<WireValue, ValueError> {
    Ok(match value {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Number(n) => encode_number(n)?,
        Value::String(s) => WireValue::String(s.clone()),
        Value::Array(items) => {
            WireValue::List(items.iter().map(encode).collect::<Result<_, _>>()?)
        }
        Value::Object(map) => {
            let kind = map
                .get(OBJECT_TYPE_KEY)
                .and_then(Value::as_str)
                .and_then(TemporalKind::parse);
            match kind {
                Some(kind) => encode_temporal(kind, map)?,
                None => WireValue::Map(encode_map(map)?),
            }
        }
    })
}

/// Encode top-level query parameters. `None` means no parameters.
pub fn encode_params(params: Option<&Value>) -> Result<HashMap<String, WireValue>, ValueError> {
    match params {
        None | Some(Value::Null) => Ok(HashMap::new()),
        Some(Value::Object(map)) => encode_map(map),
        Some(other) => Err(ValueError::UnsupportedValue(format!(
            "query parameters must be an object, got {}",
            json_type(other)
        ))),
    }
}

fn encode_map(map: &Map<String, Value>) -> Result<HashMap<String, WireValue>, ValueError> {
    map.iter().map(|(k, v)| Ok((k.clone(), encode(v)?))).collect()
}

fn encode_number(n: &Number) -> Result<WireValue, ValueError> {
    if let Some(i) = n.as_i64() {
        return Ok(WireValue::Integer(i));
    }
    if n.is_u64() {
        return Err(ValueError::PrecisionLoss(format!("{} exceeds the i64 range", n)));
    }

    // Floats stay floats, whole or not, so a received Float encodes back unchanged.
    n.as_f64()
        .map(WireValue::Float)
        .ok_or_else(|| ValueError::UnsupportedValue(format!("number {}", n)))
}

fn encode_temporal(kind: TemporalKind, map: &Map<String, Value>) -> Result<WireValue, ValueError> {
    let component = |key: &str| -> Result<i64, ValueError> {
        map.get(key).and_then(integral).ok_or_else(|| {
            ValueError::InvalidTemporalShape(format!(
                "{} requires an integer '{}'",
                kind.as_str(),
                key
            ))
        })
    };

    Ok(match kind {
        TemporalKind::Date => WireValue::Date(Date {
            days: component("days")?,
        }),
        TemporalKind::LocalTime => WireValue::LocalTime(LocalTime {
            nanoseconds: component("nanoseconds")?,
        }),
        TemporalKind::LocalDateTime => WireValue::LocalDateTime(LocalDateTime {
            seconds: component("seconds")?,
            nanoseconds: component("nanoseconds")?,
        }),
        TemporalKind::Duration => WireValue::Duration(Duration {
            months: match map.get("months") {
                None => 0,
                Some(_) => component("months")?,
            },
            days: component("days")?,
            seconds: component("seconds")?,
            nanoseconds: component("nanoseconds")?,
        }),
    })
}

/// Integer view of a JSON number, accepting exactly-integral floats.
fn integral(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_SAFE_FLOAT_INTEGER)
            .map(|f| f as i64)
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Wire -> host
// ============================================================================

/// Decode a wire value.
pub fn decode(value: &WireValue) -> Result<Value, ValueError> {
    Ok(match value {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Integer(i) => Value::from(*i),
        WireValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| ValueError::UnsupportedValue(format!("non-finite float {}", f)))?,
        WireValue::String(s) => Value::String(s.clone()),
        WireValue::List(items) => {
            Value::Array(items.iter().map(decode).collect::<Result<_, _>>()?)
        }
        WireValue::Map(map) => Value::Object(decode_map(map)?),
        WireValue::Node(n) => decode_node(n)?,
        WireValue::Relationship(r) => decode_relationship(r)?,
        WireValue::UnboundRelationship(r) => r.to_host()?,
        WireValue::Path(p) => {
            let nodes: Vec<Value> = p.nodes().iter().map(decode_node).collect::<Result<_, _>>()?;
            let relationships: Vec<Value> = p
                .relationships()
                .iter()
                .map(decode_relationship)
                .collect::<Result<_, _>>()?;
            json!({ "nodes": nodes, "relationships": relationships })
        }
        WireValue::Date(d) => json!({
            OBJECT_TYPE_KEY: TemporalKind::Date.as_str(),
            "days": d.days,
            "display": d.display(),
        }),
        WireValue::LocalTime(t) => json!({
            OBJECT_TYPE_KEY: TemporalKind::LocalTime.as_str(),
            "nanoseconds": t.nanoseconds,
            "display": t.display(),
        }),
        WireValue::LocalDateTime(dt) => json!({
            OBJECT_TYPE_KEY: TemporalKind::LocalDateTime.as_str(),
            "seconds": dt.seconds,
            "nanoseconds": dt.nanoseconds,
            "display": dt.display(),
        }),
        WireValue::Duration(d) => json!({
            OBJECT_TYPE_KEY: TemporalKind::Duration.as_str(),
            "months": d.months,
            "days": d.days,
            "seconds": d.seconds,
            "nanoseconds": d.nanoseconds,
            "display": d.display(),
        }),
    })
}

/// Decode a raw PackStream value received from the server.
pub fn decode_raw(value: PackStreamValue) -> Result<Value, ValueError> {
    decode(&WireValue::try_from(value)?)
}

fn decode_map(map: &HashMap<String, WireValue>) -> Result<Map<String, Value>, ValueError> {
    map.iter().map(|(k, v)| Ok((k.clone(), decode(v)?))).collect()
}

fn decode_node(n: &Node) -> Result<Value, ValueError> {
    Ok(json!({
        "id": n.id,
        "labels": n.labels,
        "properties": decode_map(&n.properties)?,
    }))
}

fn decode_relationship(r: &Relationship) -> Result<Value, ValueError> {
    Ok(json!({
        "id": r.id,
        "startNodeId": r.start_node_id,
        "endNodeId": r.end_node_id,
        "type": r.rel_type,
        "properties": decode_map(&r.properties)?,
    }))
}

impl UnboundRelationship {
    /// Host object for a relationship seen outside any path.
    pub fn to_host(&self) -> Result<Value, ValueError> {
        decode_relationship(&self.bind(UNBOUND_NODE_ID, UNBOUND_NODE_ID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::temporal;
    use crate::driver::types::Path;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&json!(null)).unwrap(), WireValue::Null);
        assert_eq!(encode(&json!(true)).unwrap(), WireValue::Bool(true));
        assert_eq!(encode(&json!(-5)).unwrap(), WireValue::Integer(-5));
        assert_eq!(encode(&json!(1.5)).unwrap(), WireValue::Float(1.5));
        assert_eq!(encode(&json!("hi")).unwrap(), WireValue::String("hi".into()));
    }

    #[test]
    fn test_whole_floats_stay_floats() {
        assert_eq!(encode(&json!(3.0)).unwrap(), WireValue::Float(3.0));
        assert_eq!(encode(&json!(1e300)).unwrap(), WireValue::Float(1e300));
        match encode(&json!(-0.0)).unwrap() {
            WireValue::Float(f) => assert!(f == 0.0 && f.is_sign_negative()),
            other => panic!("expected float, got {:?}", other),
        }

        // Temporal components still accept exact whole floats
        assert_eq!(
            encode(&json!({"objectType": "date", "days": 9_007_199_254_740_992.0})).unwrap(),
            WireValue::Date(Date { days: 1 << 53 })
        );
        assert!(matches!(
            encode(&json!({"objectType": "date", "days": 1e300})),
            Err(ValueError::InvalidTemporalShape(_))
        ));
    }

    #[test]
    fn test_u64_above_i64_max() {
        assert!(matches!(
            encode(&json!(u64::MAX)),
            Err(ValueError::PrecisionLoss(_))
        ));
        assert_eq!(encode(&json!(i64::MAX)).unwrap(), WireValue::Integer(i64::MAX));
    }

    #[test]
    fn test_list_fails_fast() {
        let err = encode(&json!([1, u64::MAX, {"objectType": "date"}])).unwrap_err();
        assert!(matches!(err, ValueError::PrecisionLoss(_)));
    }

    #[test]
    fn test_encode_temporals() {
        assert_eq!(
            encode(&temporal::date(18_628)).unwrap(),
            WireValue::Date(Date { days: 18_628 })
        );
        assert_eq!(
            encode(&json!({"objectType": "duration", "days": 1, "seconds": 2, "nanoseconds": 3}))
                .unwrap(),
            WireValue::Duration(Duration {
                months: 0,
                days: 1,
                seconds: 2,
                nanoseconds: 3
            })
        );
        assert_eq!(
            encode(&json!({"objectType": "local_time", "nanoseconds": 10.0})).unwrap(),
            WireValue::LocalTime(LocalTime { nanoseconds: 10 })
        );
    }

    #[test]
    fn test_invalid_temporal_shape() {
        for bad in [
            json!({"objectType": "date"}),
            json!({"objectType": "date", "days": "3"}),
            json!({"objectType": "local_time", "nanoseconds": 1.5}),
            json!({"objectType": "local_date_time", "seconds": 1}),
            json!({"objectType": "duration", "months": null, "days": 0, "seconds": 0, "nanoseconds": 0}),
        ] {
            assert!(
                matches!(encode(&bad), Err(ValueError::InvalidTemporalShape(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_unknown_object_type_is_plain_map() {
        let value = encode(&json!({"objectType": "point", "x": 1})).unwrap();
        match value {
            WireValue::Map(m) => {
                assert_eq!(m.get("objectType"), Some(&WireValue::String("point".into())));
                assert_eq!(m.get("x"), Some(&WireValue::Integer(1)));
            }
            other => panic!("expected map, got {:?}", other),
        }

        // Non-string objectType is an ordinary key too
        assert!(matches!(
            encode(&json!({"objectType": 7})).unwrap(),
            WireValue::Map(_)
        ));
    }

    #[test]
    fn test_encode_params() {
        assert!(encode_params(None).unwrap().is_empty());
        let params = encode_params(Some(&json!({"a": 1, "b": [true]}))).unwrap();
        assert_eq!(params.len(), 2);
        assert!(matches!(
            encode_params(Some(&json!([1, 2]))),
            Err(ValueError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_decode_non_finite_float() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                decode(&WireValue::Float(f)),
                Err(ValueError::UnsupportedValue(_))
            ));
        }
        let nested = WireValue::List(vec![WireValue::Integer(1), WireValue::Float(f64::NAN)]);
        assert!(decode(&nested).is_err());
    }

    #[test]
    fn test_decode_graph_entities() {
        let mut props = HashMap::new();
        props.insert("name".to_string(), WireValue::String("Ann".into()));
        let node = Node::new(1, vec!["Person".into()], props);
        assert_eq!(
            decode(&WireValue::Node(node)).unwrap(),
            json!({"id": 1, "labels": ["Person"], "properties": {"name": "Ann"}})
        );

        let unbound = UnboundRelationship::new(9, "KNOWS", HashMap::new());
        assert_eq!(
            decode(&WireValue::UnboundRelationship(unbound.clone())).unwrap(),
            json!({"id": 9, "startNodeId": -1, "endNodeId": -1, "type": "KNOWS", "properties": {}})
        );
        assert_eq!(unbound.to_host().unwrap()["endNodeId"], -1);
    }

    #[test]
    fn test_decode_path() {
        let nodes = vec![
            Node::new(1, vec![], HashMap::new()),
            Node::new(2, vec![], HashMap::new()),
        ];
        let rels = vec![UnboundRelationship::new(5, "R", HashMap::new())];
        let path = Path::from_wire(&nodes, &rels, &[-1, 1]).unwrap();

        let host = decode(&WireValue::Path(path)).unwrap();
        assert_eq!(host["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(host["relationships"][0]["startNodeId"], 2);
        assert_eq!(host["relationships"][0]["endNodeId"], 1);
    }

    #[test]
    fn test_duration_fidelity() {
        let d = Duration {
            months: 13,
            days: 40,
            seconds: 90_061,
            nanoseconds: 1,
        };
        let host = decode(&WireValue::Duration(d)).unwrap();
        assert_eq!(host["months"], 13);
        assert_eq!(host["nanoseconds"], 1);
        assert_eq!(host["display"], "P13M40DT90061.000S");

        // display is ignored on the way back; raw components win
        assert_eq!(encode(&host).unwrap(), WireValue::Duration(d));
    }

    #[test]
    fn test_temporal_display_out_of_range() {
        let host = decode(&WireValue::Date(Date { days: i64::MIN })).unwrap();
        assert_eq!(host["days"], i64::MIN);
        assert!(host["display"].is_null());
    }

    #[test]
    fn test_decode_raw_rejects_bytes() {
        assert!(matches!(
            decode_raw(PackStreamValue::Bytes(vec![1])),
            Err(ValueError::UnknownWireType(_))
        ));
    }

    fn assert_host_round_trip(wire: WireValue) {
        let host = decode(&wire).unwrap();
        let encoded = encode(&host).unwrap();
        assert_eq!(encoded, wire, "host form {}", host);
        assert_eq!(decode(&encoded).unwrap(), host);
    }

    #[test]
    fn test_host_round_trip() {
        let mut inner = HashMap::new();
        inner.insert("deep".to_string(), WireValue::List(vec![WireValue::Float(0.5)]));
        let mut middle = HashMap::new();
        middle.insert("inner".to_string(), WireValue::Map(inner));
        middle.insert("flag".to_string(), WireValue::Bool(false));
        let mut outer = HashMap::new();
        outer.insert("middle".to_string(), WireValue::Map(middle));
        outer.insert("name".to_string(), WireValue::String("x".into()));

        let values = vec![
            WireValue::Null,
            WireValue::Bool(true),
            WireValue::Integer(0),
            WireValue::Integer(-42),
            WireValue::Integer(i64::MIN),
            WireValue::Integer(i64::MAX),
            WireValue::Float(0.0),
            WireValue::Float(2.0),
            WireValue::Float(-1e15),
            WireValue::Float(f64::MAX),
            WireValue::Float(f64::MIN_POSITIVE),
            WireValue::String(String::new()),
            WireValue::String("héllo".into()),
            WireValue::List(vec![]),
            WireValue::List(vec![WireValue::Integer(1), WireValue::Float(1.0), WireValue::Null]),
            WireValue::Map(HashMap::new()),
            WireValue::Map(outer),
            WireValue::Date(Date { days: -719_162 }),
            WireValue::LocalTime(LocalTime { nanoseconds: 86_399_999_999_999 }),
            WireValue::LocalDateTime(LocalDateTime {
                seconds: -1,
                nanoseconds: 999_999_999,
            }),
            WireValue::Duration(Duration {
                months: -3,
                days: 0,
                seconds: i64::MAX,
                nanoseconds: 0,
            }),
        ];
        for wire in values {
            assert_host_round_trip(wire);
        }
    }

    #[test]
    fn test_negative_zero_keeps_sign() {
        let host = decode(&WireValue::Float(-0.0)).unwrap();
        match encode(&host).unwrap() {
            WireValue::Float(f) => assert_eq!(f.to_bits(), (-0.0f64).to_bits()),
            other => panic!("expected float, got {:?}", other),
        }
    }
}
