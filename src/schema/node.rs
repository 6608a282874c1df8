//! Lexicon Type Nodes
//!
//! The closed set of node kinds a lexicon `defs` entry (or any nested shape)
//! can take. Parsing is purely structural: references stay as strings and
//! nested anonymous shapes stay nested. Naming and resolution happen later in
//! the graph walker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Node Kind
// =============================================================================

/// Discriminant of a [`TypeNode`], matching the lexicon `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Token,
    Null,
    Boolean,
    Integer,
    Blob,
    Bytes,
    String,
    Union,
    Array,
    Object,
    Reference,
    Permission,
    PermissionSet,
    Unknown,
    CidLink,
    Procedure,
    Query,
    Subscription,
    Record,
}

impl NodeKind {
    /// The wire spelling of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Blob => "blob",
            Self::Bytes => "bytes",
            Self::String => "string",
            Self::Union => "union",
            Self::Array => "array",
            Self::Object => "object",
            Self::Reference => "ref",
            Self::Permission => "permission",
            Self::PermissionSet => "permission-set",
            Self::Unknown => "unknown",
            Self::CidLink => "cid-link",
            Self::Procedure => "procedure",
            Self::Query => "query",
            Self::Subscription => "subscription",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Type Node
// =============================================================================

/// A single lexicon schema node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TypeNode {
    Token(TokenNode),
    Null(NullNode),
    Boolean(BooleanNode),
    Integer(IntegerNode),
    Blob(BlobNode),
    Bytes(BytesNode),
    String(StringNode),
    Union(UnionNode),
    Array(ArrayNode),
    Object(ObjectNode),
    #[serde(rename = "ref")]
    Reference(RefNode),
    Permission(PermissionNode),
    PermissionSet(PermissionSetNode),
    Unknown(UnknownNode),
    CidLink(CidLinkNode),
    Procedure(ProcedureNode),
    Query(QueryNode),
    Subscription(SubscriptionNode),
    Record(RecordNode),
}

impl TypeNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Token(_) => NodeKind::Token,
            Self::Null(_) => NodeKind::Null,
            Self::Boolean(_) => NodeKind::Boolean,
            Self::Integer(_) => NodeKind::Integer,
            Self::Blob(_) => NodeKind::Blob,
            Self::Bytes(_) => NodeKind::Bytes,
            Self::String(_) => NodeKind::String,
            Self::Union(_) => NodeKind::Union,
            Self::Array(_) => NodeKind::Array,
            Self::Object(_) => NodeKind::Object,
            Self::Reference(_) => NodeKind::Reference,
            Self::Permission(_) => NodeKind::Permission,
            Self::PermissionSet(_) => NodeKind::PermissionSet,
            Self::Unknown(_) => NodeKind::Unknown,
            Self::CidLink(_) => NodeKind::CidLink,
            Self::Procedure(_) => NodeKind::Procedure,
            Self::Query(_) => NodeKind::Query,
            Self::Subscription(_) => NodeKind::Subscription,
            Self::Record(_) => NodeKind::Record,
        }
    }

    pub fn description(&self) -> Option<&str> {
        let description = match self {
            Self::Token(n) => &n.description,
            Self::Null(n) => &n.description,
            Self::Boolean(n) => &n.description,
            Self::Integer(n) => &n.description,
            Self::Blob(n) => &n.description,
            Self::Bytes(n) => &n.description,
            Self::String(n) => &n.description,
            Self::Union(n) => &n.description,
            Self::Array(n) => &n.description,
            Self::Object(n) => &n.description,
            Self::Reference(n) => &n.description,
            Self::Permission(n) => &n.description,
            Self::PermissionSet(n) => &n.description,
            Self::Unknown(n) => &n.description,
            Self::CidLink(n) => &n.description,
            Self::Procedure(n) => &n.description,
            Self::Query(n) => &n.description,
            Self::Subscription(n) => &n.description,
            Self::Record(n) => &n.description,
        };
        description.as_deref()
    }

    /// Object, array and union nodes are structural: when nested anonymously
    /// they need a synthesized name of their own.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_) | Self::Union(_))
    }

    /// A string with `enum`/`knownValues`, or an integer with `enum`.
    ///
    /// Closed scalars become enumeration types; everything else scalar maps
    /// straight onto a built-in type.
    pub fn is_closed_scalar(&self) -> bool {
        match self {
            Self::String(s) => s.is_closed(),
            Self::Integer(i) => i.is_closed(),
            _ => false,
        }
    }

    /// Whether this node is an RPC endpoint or a permission declaration
    /// rather than a data shape.
    pub fn is_data_type(&self) -> bool {
        !matches!(
            self,
            Self::Procedure(_)
                | Self::Query(_)
                | Self::Subscription(_)
                | Self::Permission(_)
                | Self::PermissionSet(_)
        )
    }
}

// =============================================================================
// Scalar Nodes
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NullNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegerNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<i64>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IntegerNode {
    pub fn is_closed(&self) -> bool {
        self.enum_values.as_ref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_graphemes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_graphemes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_values: Option<Vec<String>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The vocabulary of a closed string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary<'a> {
    /// `enum`: only these literals are legal
    Closed(&'a [String]),
    /// `knownValues`: recognized literals, anything else is still legal
    Open(&'a [String]),
}

impl StringNode {
    pub fn is_closed(&self) -> bool {
        self.vocabulary().is_some()
    }

    /// `enum` wins over `knownValues` when a node carries both.
    pub fn vocabulary(&self) -> Option<Vocabulary<'_>> {
        if let Some(values) = self.enum_values.as_deref().filter(|v| !v.is_empty()) {
            return Some(Vocabulary::Closed(values));
        }
        self.known_values
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(Vocabulary::Open)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytesNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CidLinkNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnknownNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// Composite Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefNode {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionNode {
    pub refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayNode {
    pub items: Box<TypeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub properties: BTreeMap<String, TypeNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nullable: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ObjectNode {
    /// A property is optional unless listed in `required`, and a `nullable`
    /// listing makes it optional even when required.
    pub fn is_optional(&self, property: &str) -> bool {
        !self.required.iter().any(|r| r == property) || self.nullable.iter().any(|n| n == property)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub record: ObjectNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionSetNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// RPC Nodes
// =============================================================================

/// `parameters` block of a query, procedure or subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamsNode {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, TypeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamsNode {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// `input` or `output` body of an RPC endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcBody {
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Box<TypeNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A declared RPC error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<RpcBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcErrorDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcedureNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<RpcBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<RpcBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcErrorDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `message` block of a subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Box<TypeNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamsNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcErrorDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Query and procedure share one RPC shape: (parameters, input, output, errors)
#[derive(Debug, Clone, Copy)]
pub struct RpcShape<'a> {
    pub is_procedure: bool,
    pub parameters: Option<&'a ParamsNode>,
    pub input: Option<&'a RpcBody>,
    pub output: Option<&'a RpcBody>,
    pub errors: &'a [RpcErrorDef],
    pub description: Option<&'a str>,
}

impl TypeNode {
    /// The RPC shape of a query or procedure, computed on demand
    pub fn rpc_shape(&self) -> Option<RpcShape<'_>> {
        match self {
            Self::Query(q) => Some(RpcShape {
                is_procedure: false,
                parameters: q.parameters.as_ref(),
                input: None,
                output: q.output.as_ref(),
                errors: &q.errors,
                description: q.description.as_deref(),
            }),
            Self::Procedure(p) => Some(RpcShape {
                is_procedure: true,
                parameters: p.parameters.as_ref(),
                input: p.input.as_ref(),
                output: p.output.as_ref(),
                errors: &p.errors,
                description: p.description.as_deref(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object_with_nested_shapes() {
        let node: TypeNode = serde_json::from_value(json!({
            "type": "object",
            "required": ["text"],
            "properties": {
                "text": { "type": "string", "maxLength": 300 },
                "tags": { "type": "array", "items": { "type": "string" } },
                "reply": { "type": "ref", "ref": "#replyRef" }
            }
        }))
        .unwrap();

        let TypeNode::Object(obj) = &node else {
            panic!("Expected object, got {:?}", node.kind());
        };
        assert_eq!(obj.properties.len(), 3);
        assert!(!obj.is_optional("text"));
        assert!(obj.is_optional("tags"));
        assert!(obj.properties["tags"].is_structural());
        assert!(!obj.properties["reply"].is_structural());
    }

    #[test]
    fn test_nullable_overrides_required() {
        let obj: ObjectNode = serde_json::from_value(json!({
            "properties": { "a": { "type": "string" } },
            "required": ["a"],
            "nullable": ["a"]
        }))
        .unwrap();
        assert!(obj.is_optional("a"));
    }

    #[test]
    fn test_kebab_case_kinds() {
        let node: TypeNode = serde_json::from_value(json!({ "type": "cid-link" })).unwrap();
        assert_eq!(node.kind(), NodeKind::CidLink);

        let node: TypeNode =
            serde_json::from_value(json!({ "type": "permission-set", "title": "t" })).unwrap();
        assert_eq!(node.kind(), NodeKind::PermissionSet);
    }

    #[test]
    fn test_union_requires_refs() {
        let err = serde_json::from_value::<TypeNode>(json!({ "type": "union" })).unwrap_err();
        assert!(err.to_string().contains("refs"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(serde_json::from_value::<TypeNode>(json!({ "type": "float" })).is_err());
    }

    #[test]
    fn test_string_vocabulary() {
        let known: StringNode =
            serde_json::from_value(json!({ "knownValues": ["a", "b"] })).unwrap();
        assert!(matches!(known.vocabulary(), Some(Vocabulary::Open(v)) if v.len() == 2));

        let both: StringNode =
            serde_json::from_value(json!({ "knownValues": ["a"], "enum": ["x"] })).unwrap();
        assert!(matches!(both.vocabulary(), Some(Vocabulary::Closed(v)) if v[0] == "x"));

        let plain = StringNode::default();
        assert!(!plain.is_closed());
    }

    #[test]
    fn test_rpc_shape() {
        let node: TypeNode = serde_json::from_value(json!({
            "type": "procedure",
            "input": { "encoding": "application/json", "schema": { "type": "object", "properties": {} } },
            "errors": [{ "name": "InvalidSwap" }]
        }))
        .unwrap();
        let shape = node.rpc_shape().unwrap();
        assert!(shape.is_procedure);
        assert!(shape.input.is_some());
        assert!(shape.output.is_none());
        assert_eq!(shape.errors[0].name, "InvalidSwap");
    }
}
