//! Typed wire values.
//!
//! [`WireValue`] is the strongly-typed view of everything a Bolt server can
//! put in a record: PackStream scalars and containers plus the graph and
//! temporal structures. Conversions to and from raw [`PackStreamValue`]
//! live here; conversions to and from host values live in
//! [`crate::driver::host`].

use std::collections::HashMap;
use std::fmt;

use super::host::ValueError;
use crate::bolt::packstream::marker::{
    DATE_TAG, DURATION_TAG, LOCAL_DATE_TIME_TAG, LOCAL_TIME_TAG, NODE_TAG, PATH_TAG,
    RELATIONSHIP_TAG, UNBOUND_RELATIONSHIP_TAG,
};
use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};

/// Start and end id of an [`UnboundRelationship`] outside a path.
pub const UNBOUND_NODE_ID: i64 = -1;

// ============================================================================
// WireValue
// ============================================================================

/// A value as it travels between client and server.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// List
    List(Vec<WireValue>),
    /// Map with unique string keys
    Map(HashMap<String, WireValue>),
    /// Node
    Node(Node),
    /// Relationship with both endpoints
    Relationship(Relationship),
    /// Relationship without endpoints, as it appears inside a path
    UnboundRelationship(UnboundRelationship),
    /// Path in traversal order
    Path(Path),
    /// Date
    Date(Date),
    /// Local time
    LocalTime(LocalTime),
    /// Local date-time
    LocalDateTime(LocalDateTime),
    /// Duration
    Duration(Duration),
}

impl WireValue {
    /// Type name
    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::Null => "Null",
            WireValue::Bool(_) => "Bool",
            WireValue::Integer(_) => "Integer",
            WireValue::Float(_) => "Float",
            WireValue::String(_) => "String",
            WireValue::List(_) => "List",
            WireValue::Map(_) => "Map",
            WireValue::Node(_) => "Node",
            WireValue::Relationship(_) => "Relationship",
            WireValue::UnboundRelationship(_) => "UnboundRelationship",
            WireValue::Path(_) => "Path",
            WireValue::Date(_) => "Date",
            WireValue::LocalTime(_) => "LocalTime",
            WireValue::LocalDateTime(_) => "LocalDateTime",
            WireValue::Duration(_) => "Duration",
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Null => write!(f, "null"),
            WireValue::Bool(b) => write!(f, "{}", b),
            WireValue::Integer(i) => write!(f, "{}", i),
            WireValue::Float(x) => write!(f, "{}", x),
            WireValue::String(s) => write!(f, "\"{}\"", s),
            WireValue::List(l) => write!(f, "[{} items]", l.len()),
            WireValue::Map(m) => write!(f, "{{{} entries}}", m.len()),
            WireValue::Node(n) => write!(f, "{}", n),
            WireValue::Relationship(r) => write!(f, "{}", r),
            WireValue::UnboundRelationship(r) => write!(f, "-[:{}]-  [id: {}]", r.rel_type, r.id),
            WireValue::Path(p) => write!(f, "{}", p),
            other => write!(f, "<{}>", other.type_name()),
        }
    }
}

// ============================================================================
// Graph entities
// ============================================================================

/// Graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node id
    pub id: i64,
    /// Labels
    pub labels: Vec<String>,
    /// Properties
    pub properties: HashMap<String, WireValue>,
    /// Element id (Bolt 5)
    pub element_id: Option<String>,
}

impl Node {
    /// Create a node without an element id.
    pub fn new(id: i64, labels: Vec<String>, properties: HashMap<String, WireValue>) -> Self {
        Self {
            id,
            labels,
            properties,
            element_id: None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.id, labels)
    }
}

/// Graph relationship with both endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Relationship id
    pub id: i64,
    /// Start node id
    pub start_node_id: i64,
    /// End node id
    pub end_node_id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Properties
    pub properties: HashMap<String, WireValue>,
    /// Element ids of the relationship, start and end node (Bolt 5)
    pub element_ids: Option<[String; 3]>,
}

impl Relationship {
    /// Create a relationship without element ids.
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: impl Into<String>,
        properties: HashMap<String, WireValue>,
    ) -> Self {
        Self {
            id,
            start_node_id,
            end_node_id,
            rel_type: rel_type.into(),
            properties,
            element_ids: None,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})  [id: {}]",
            self.start_node_id, self.rel_type, self.end_node_id, self.id
        )
    }
}

/// Relationship whose endpoints are given by its position in a path.
#[derive(Debug, Clone, PartialEq)]
pub struct UnboundRelationship {
    /// Relationship id
    pub id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Properties
    pub properties: HashMap<String, WireValue>,
    /// Element id (Bolt 5)
    pub element_id: Option<String>,
}

impl UnboundRelationship {
    /// Create an unbound relationship without an element id.
    pub fn new(id: i64, rel_type: impl Into<String>, properties: HashMap<String, WireValue>) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            properties,
            element_id: None,
        }
    }

    /// Attach endpoints.
    pub fn bind(&self, start_node_id: i64, end_node_id: i64) -> Relationship {
        Relationship {
            id: self.id,
            start_node_id,
            end_node_id,
            rel_type: self.rel_type.clone(),
            properties: self.properties.clone(),
            element_ids: None,
        }
    }
}

// ============================================================================
// Path
// ============================================================================

/// A path in traversal order.
///
/// `nodes` has exactly one more entry than `relationships`, and every
/// relationship carries a `reversed` flag saying whether it points against
/// the direction of travel.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    nodes: Vec<Node>,
    relationships: Vec<UnboundRelationship>,
    reversed: Vec<bool>,
}

impl Path {
    /// Build a path from traversal-order parts.
    pub fn new(
        nodes: Vec<Node>,
        relationships: Vec<UnboundRelationship>,
        reversed: Vec<bool>,
    ) -> Result<Self, ValueError> {
        if nodes.len() != relationships.len() + 1 || reversed.len() != relationships.len() {
            return Err(ValueError::UnresolvedPath(format!(
                "{} nodes, {} relationships, {} direction flags",
                nodes.len(),
                relationships.len(),
                reversed.len()
            )));
        }
        Ok(Self {
            nodes,
            relationships,
            reversed,
        })
    }

    /// Resolve the wire form: unique nodes, unique relationships and the
    /// alternating index sequence. Any bad index fails the whole path.
    pub fn from_wire(
        unique_nodes: &[Node],
        unique_rels: &[UnboundRelationship],
        indices: &[i64],
    ) -> Result<Self, ValueError> {
        let unresolved = |why: String| ValueError::UnresolvedPath(why);

        if indices.len() % 2 != 0 {
            return Err(unresolved(format!("odd index sequence length {}", indices.len())));
        }
        let first = unique_nodes
            .first()
            .ok_or_else(|| unresolved("path without nodes".to_string()))?;

        let steps = indices.len() / 2;
        let mut nodes = Vec::with_capacity(steps + 1);
        let mut relationships = Vec::with_capacity(steps);
        let mut reversed = Vec::with_capacity(steps);
        nodes.push(first.clone());

        for pair in indices.chunks_exact(2) {
            let (rel_index, node_index) = (pair[0], pair[1]);

            let rel_pos = usize::try_from(rel_index.unsigned_abs())
                .ok()
                .filter(|&i| i >= 1 && i <= unique_rels.len())
                .ok_or_else(|| unresolved(format!("relationship index {} out of range", rel_index)))?;
            let node_pos = usize::try_from(node_index)
                .ok()
                .filter(|&i| i < unique_nodes.len())
                .ok_or_else(|| unresolved(format!("node index {} out of range", node_index)))?;

            relationships.push(unique_rels[rel_pos - 1].clone());
            reversed.push(rel_index < 0);
            nodes.push(unique_nodes[node_pos].clone());
        }

        Ok(Self {
            nodes,
            relationships,
            reversed,
        })
    }

    /// Inverse of [`from_wire`](Self::from_wire): deduplicate entities by id
    /// and rebuild the index sequence.
    pub fn to_wire(&self) -> (Vec<Node>, Vec<UnboundRelationship>, Vec<i64>) {
        let mut unique_nodes: Vec<Node> = Vec::new();
        let mut unique_rels: Vec<UnboundRelationship> = Vec::new();
        let mut indices = Vec::with_capacity(self.relationships.len() * 2);

        if let Some(first) = self.nodes.first() {
            unique_nodes.push(first.clone());
        }

        for (i, rel) in self.relationships.iter().enumerate() {
            let rel_pos = position_or_push(&mut unique_rels, rel, |r| r.id) as i64 + 1;
            indices.push(if self.reversed[i] { -rel_pos } else { rel_pos });

            let node = &self.nodes[i + 1];
            indices.push(position_or_push(&mut unique_nodes, node, |n| n.id) as i64);
        }

        (unique_nodes, unique_rels, indices)
    }

    /// Nodes in traversal order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Relationships in traversal order, without endpoints.
    pub fn unbound_relationships(&self) -> &[UnboundRelationship] {
        &self.relationships
    }

    /// Whether relationship `i` points against the direction of travel.
    pub fn is_reversed(&self, i: usize) -> Option<bool> {
        self.reversed.get(i).copied()
    }

    /// Relationships in traversal order with endpoints resolved from the
    /// neighbouring nodes.
    pub fn relationships(&self) -> Vec<Relationship> {
        self.relationships
            .iter()
            .enumerate()
            .map(|(i, rel)| {
                let before = self.nodes[i].id;
                let after = self.nodes[i + 1].id;
                if self.reversed[i] {
                    rel.bind(after, before)
                } else {
                    rel.bind(before, after)
                }
            })
            .collect()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the path is a single node.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Path: {} nodes, {} rels>", self.nodes.len(), self.relationships.len())
    }
}

fn position_or_push<T: Clone>(items: &mut Vec<T>, item: &T, key: impl Fn(&T) -> i64) -> usize {
    let id = key(item);
    match items.iter().position(|existing| key(existing) == id) {
        Some(pos) => pos,
        None => {
            items.push(item.clone());
            items.len() - 1
        }
    }
}

// ============================================================================
// Temporal values
// ============================================================================

/// Days since 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    /// Days since the epoch
    pub days: i64,
}

/// Nanoseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    /// Nanoseconds since midnight
    pub nanoseconds: i64,
}

/// Seconds and nanoseconds since 1970-01-01T00:00:00, no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDateTime {
    /// Seconds since the epoch
    pub seconds: i64,
    /// Nanosecond adjustment
    pub nanoseconds: i64,
}

/// Calendar duration, components kept as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    /// Months
    pub months: i64,
    /// Days
    pub days: i64,
    /// Seconds
    pub seconds: i64,
    /// Nanoseconds
    pub nanoseconds: i64,
}

// ============================================================================
// PackStreamValue conversions
// ============================================================================

impl From<WireValue> for PackStreamValue {
    fn from(value: WireValue) -> Self {
        let structure = |tag: u8, fields: Vec<PackStreamValue>| {
            PackStreamValue::Structure(PackStreamStructure::new(tag, fields))
        };

        match value {
            WireValue::Null => PackStreamValue::Null,
            WireValue::Bool(b) => PackStreamValue::Boolean(b),
            WireValue::Integer(i) => PackStreamValue::Integer(i),
            WireValue::Float(f) => PackStreamValue::Float(f),
            WireValue::String(s) => PackStreamValue::String(s),
            WireValue::List(l) => PackStreamValue::List(l.into_iter().map(Into::into).collect()),
            WireValue::Map(m) => PackStreamValue::Map(properties_to_wire(m)),
            WireValue::Node(n) => node_to_wire(n),
            WireValue::Relationship(r) => {
                let mut fields = vec![
                    r.id.into(),
                    r.start_node_id.into(),
                    r.end_node_id.into(),
                    r.rel_type.into(),
                    PackStreamValue::Map(properties_to_wire(r.properties)),
                ];
                if let Some(ids) = r.element_ids {
                    fields.extend(ids.into_iter().map(PackStreamValue::String));
                }
                structure(RELATIONSHIP_TAG, fields)
            }
            WireValue::UnboundRelationship(r) => unbound_to_wire(r),
            WireValue::Path(p) => {
                let (nodes, rels, indices) = p.to_wire();
                structure(
                    PATH_TAG,
                    vec![
                        PackStreamValue::List(nodes.into_iter().map(node_to_wire).collect()),
                        PackStreamValue::List(rels.into_iter().map(unbound_to_wire).collect()),
                        PackStreamValue::List(indices.into_iter().map(Into::into).collect()),
                    ],
                )
            }
            WireValue::Date(d) => structure(DATE_TAG, vec![d.days.into()]),
            WireValue::LocalTime(t) => structure(LOCAL_TIME_TAG, vec![t.nanoseconds.into()]),
            WireValue::LocalDateTime(dt) => structure(
                LOCAL_DATE_TIME_TAG,
                vec![dt.seconds.into(), dt.nanoseconds.into()],
            ),
            WireValue::Duration(d) => structure(
                DURATION_TAG,
                vec![d.months.into(), d.days.into(), d.seconds.into(), d.nanoseconds.into()],
            ),
        }
    }
}

fn properties_to_wire(map: HashMap<String, WireValue>) -> HashMap<String, PackStreamValue> {
    map.into_iter().map(|(k, v)| (k, v.into())).collect()
}

fn node_to_wire(n: Node) -> PackStreamValue {
    let mut fields = vec![
        n.id.into(),
        PackStreamValue::List(n.labels.into_iter().map(PackStreamValue::String).collect()),
        PackStreamValue::Map(properties_to_wire(n.properties)),
    ];
    if let Some(element_id) = n.element_id {
        fields.push(element_id.into());
    }
    PackStreamValue::Structure(PackStreamStructure::new(NODE_TAG, fields))
}

fn unbound_to_wire(r: UnboundRelationship) -> PackStreamValue {
    let mut fields = vec![
        r.id.into(),
        r.rel_type.into(),
        PackStreamValue::Map(properties_to_wire(r.properties)),
    ];
    if let Some(element_id) = r.element_id {
        fields.push(element_id.into());
    }
    PackStreamValue::Structure(PackStreamStructure::new(UNBOUND_RELATIONSHIP_TAG, fields))
}

impl TryFrom<PackStreamValue> for WireValue {
    type Error = ValueError;

    fn try_from(value: PackStreamValue) -> Result<Self, Self::Error> {
        Ok(match value {
            PackStreamValue::Null => WireValue::Null,
            PackStreamValue::Boolean(b) => WireValue::Bool(b),
            PackStreamValue::Integer(i) => WireValue::Integer(i),
            PackStreamValue::Float(f) => WireValue::Float(f),
            PackStreamValue::String(s) => WireValue::String(s),
            PackStreamValue::Bytes(b) => {
                return Err(ValueError::UnknownWireType(format!("byte array of {} bytes", b.len())))
            }
            PackStreamValue::List(l) => WireValue::List(
                l.into_iter().map(WireValue::try_from).collect::<Result<_, _>>()?,
            ),
            PackStreamValue::Map(m) => WireValue::Map(properties_from_wire(m)?),
            PackStreamValue::Structure(s) => structure_from_wire(s)?,
        })
    }
}

fn properties_from_wire(
    map: HashMap<String, PackStreamValue>,
) -> Result<HashMap<String, WireValue>, ValueError> {
    map.into_iter()
        .map(|(k, v)| Ok((k, WireValue::try_from(v)?)))
        .collect()
}

/// Positional field reader for a structure of a known tag.
struct Fields {
    name: &'static str,
    fields: std::vec::IntoIter<PackStreamValue>,
}

impl Fields {
    fn new(
        name: &'static str,
        s: PackStreamStructure,
        arities: &[usize],
    ) -> Result<Self, ValueError> {
        if !arities.contains(&s.fields.len()) {
            return Err(ValueError::UnknownWireType(format!(
                "{} structure with {} fields",
                name,
                s.fields.len()
            )));
        }
        Ok(Self {
            name,
            fields: s.fields.into_iter(),
        })
    }

    fn malformed(&self, what: &str) -> ValueError {
        ValueError::UnknownWireType(format!("{} structure with malformed {}", self.name, what))
    }

    fn int(&mut self, what: &str) -> Result<i64, ValueError> {
        match self.fields.next() {
            Some(PackStreamValue::Integer(i)) => Ok(i),
            _ => Err(self.malformed(what)),
        }
    }

    fn string(&mut self, what: &str) -> Result<String, ValueError> {
        match self.fields.next() {
            Some(PackStreamValue::String(s)) => Ok(s),
            _ => Err(self.malformed(what)),
        }
    }

    fn list(&mut self, what: &str) -> Result<Vec<PackStreamValue>, ValueError> {
        match self.fields.next() {
            Some(PackStreamValue::List(l)) => Ok(l),
            _ => Err(self.malformed(what)),
        }
    }

    fn properties(&mut self) -> Result<HashMap<String, WireValue>, ValueError> {
        match self.fields.next() {
            Some(PackStreamValue::Map(m)) => properties_from_wire(m),
            _ => Err(self.malformed("properties")),
        }
    }

    fn optional_string(&mut self, what: &str) -> Result<Option<String>, ValueError> {
        match self.fields.next() {
            None => Ok(None),
            Some(PackStreamValue::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.malformed(what)),
        }
    }
}

fn structure_from_wire(s: PackStreamStructure) -> Result<WireValue, ValueError> {
    Ok(match s.tag {
        NODE_TAG => WireValue::Node(node_from_wire(s)?),
        RELATIONSHIP_TAG => {
            let mut f = Fields::new("Relationship", s, &[5, 8])?;
            let id = f.int("id")?;
            let start_node_id = f.int("start node id")?;
            let end_node_id = f.int("end node id")?;
            let rel_type = f.string("type")?;
            let properties = f.properties()?;
            let element_ids = match f.optional_string("element id")? {
                Some(own) => Some([
                    own,
                    f.string("start element id")?,
                    f.string("end element id")?,
                ]),
                None => None,
            };
            WireValue::Relationship(Relationship {
                id,
                start_node_id,
                end_node_id,
                rel_type,
                properties,
                element_ids,
            })
        }
        UNBOUND_RELATIONSHIP_TAG => WireValue::UnboundRelationship(unbound_from_wire(s)?),
        PATH_TAG => {
            let mut f = Fields::new("Path", s, &[3])?;
            let nodes = f
                .list("nodes")?
                .into_iter()
                .map(|v| match v {
                    PackStreamValue::Structure(s) if s.tag == NODE_TAG => node_from_wire(s),
                    _ => Err(ValueError::UnresolvedPath("path node is not a Node".to_string())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let rels = f
                .list("relationships")?
                .into_iter()
                .map(|v| match v {
                    PackStreamValue::Structure(s) if s.tag == UNBOUND_RELATIONSHIP_TAG => {
                        unbound_from_wire(s)
                    }
                    _ => Err(ValueError::UnresolvedPath(
                        "path relationship is not an UnboundRelationship".to_string(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let indices = f
                .list("indices")?
                .into_iter()
                .map(|v| {
                    v.as_int()
                        .ok_or_else(|| ValueError::UnresolvedPath("non-integer path index".to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            WireValue::Path(Path::from_wire(&nodes, &rels, &indices)?)
        }
        DATE_TAG => {
            let mut f = Fields::new("Date", s, &[1])?;
            WireValue::Date(Date { days: f.int("days")? })
        }
        LOCAL_TIME_TAG => {
            let mut f = Fields::new("LocalTime", s, &[1])?;
            WireValue::LocalTime(LocalTime {
                nanoseconds: f.int("nanoseconds")?,
            })
        }
        LOCAL_DATE_TIME_TAG => {
            let mut f = Fields::new("LocalDateTime", s, &[2])?;
            WireValue::LocalDateTime(LocalDateTime {
                seconds: f.int("seconds")?,
                nanoseconds: f.int("nanoseconds")?,
            })
        }
        DURATION_TAG => {
            let mut f = Fields::new("Duration", s, &[4])?;
            WireValue::Duration(Duration {
                months: f.int("months")?,
                days: f.int("days")?,
                seconds: f.int("seconds")?,
                nanoseconds: f.int("nanoseconds")?,
            })
        }
        other => {
            return Err(ValueError::UnknownWireType(format!(
                "structure tag 0x{:02X}",
                other
            )))
        }
    })
}

fn node_from_wire(s: PackStreamStructure) -> Result<Node, ValueError> {
    let mut f = Fields::new("Node", s, &[3, 4])?;
    let id = f.int("id")?;
    let labels = f
        .list("labels")?
        .into_iter()
        .map(|v| match v {
            PackStreamValue::String(s) => Ok(s),
            _ => Err(ValueError::UnknownWireType("Node label is not a string".to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let properties = f.properties()?;
    let element_id = f.optional_string("element id")?;
    Ok(Node {
        id,
        labels,
        properties,
        element_id,
    })
}

fn unbound_from_wire(s: PackStreamStructure) -> Result<UnboundRelationship, ValueError> {
    let mut f = Fields::new("UnboundRelationship", s, &[3, 4])?;
    Ok(UnboundRelationship {
        id: f.int("id")?,
        rel_type: f.string("type")?,
        properties: f.properties()?,
        element_id: f.optional_string("element id")?,
    })
}
