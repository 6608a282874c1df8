//! Abstract Declarations
//!
//! The language-agnostic output of synthesis. A rendering backend turns each
//! declaration into concrete source text; nothing here is specific to a
//! target language. Identifiers are logical names, not yet keyword-escaped.

use serde::{Deserialize, Serialize};

use crate::graph::{TypeExpr, TypeName};
use crate::runtime::{HttpMethod, OutputShape};

/// One output declaration of a group module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    Struct(StructDecl),
    Union(UnionDecl),
    Enum(EnumDecl),
    Method(MethodDecl),
    Error(ErrorDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(d) => &d.name,
            Self::Union(d) => &d.name,
            Self::Enum(d) => &d.name,
            Self::Method(d) => &d.name,
            Self::Error(d) => &d.name,
        }
    }

    /// Def key (or RPC nsid) this declaration was synthesized from
    pub fn origin(&self) -> &str {
        match self {
            Self::Struct(d) => &d.key,
            Self::Union(d) => &d.key,
            Self::Enum(d) => &d.key,
            Self::Method(d) => &d.nsid,
            Self::Error(d) => &d.nsid,
        }
    }

    /// Methods live in the RPC client context; everything else is a type of
    /// the group module and shares its namespace.
    pub fn is_type(&self) -> bool {
        !matches!(self, Self::Method(_))
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match self {
            Self::Struct(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionDecl> {
        match self {
            Self::Union(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDecl> {
        match self {
            Self::Enum(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDecl> {
        match self {
            Self::Method(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorDecl> {
        match self {
            Self::Error(d) => Some(d),
            _ => None,
        }
    }
}

// =============================================================================
// Product Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDecl>,
    /// Set for records: storage key type and NSID constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordInfo>,
    /// Constant discriminator written on encode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<TypeTag>,
    /// Unrecognized input keys survive decode/encode in a side map
    pub preserves_unknown_fields: bool,
}

impl StructDecl {
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    /// JSON key on the wire
    pub wire_name: String,
    pub ty: TypeExpr,
    pub optional: bool,
    /// Needs indirection: the field's type reaches back to its owner
    pub boxed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    pub nsid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTag {
    pub field: String,
    pub value: String,
}

// =============================================================================
// Sum Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDecl {
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub variants: Vec<UnionVariant>,
    /// Case holding an unknown record; present even for `closed` unions
    pub catch_all: String,
    pub closed: bool,
    /// Wire key decode dispatches on
    pub tag_field: String,
}

impl UnionDecl {
    /// Case a decoder picks for a `$type` value
    pub fn case_for(&self, type_id: &str) -> &str {
        self.variants
            .iter()
            .find(|v| v.type_id == type_id)
            .map(|v| v.case_name.as_str())
            .unwrap_or(&self.catch_all)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionVariant {
    pub case_name: String,
    /// `$type` literal matched on decode and written on encode
    pub type_id: String,
    pub ty: TypeExpr,
    pub boxed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cases: Vec<EnumCase>,
    /// Open enums decode unknown literals into `fallback_case` instead of failing
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_case: Option<String>,
}

impl EnumDecl {
    pub fn case_names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumCase {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    String(String),
    Integer(i64),
}

// =============================================================================
// RPC
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name, the NSID-derived type name
    pub name: String,
    /// Endpoint passed to the fetch contract
    pub nsid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub http_method: HttpMethod,
    /// Request content type; set whenever there is an input body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputDecl>,
    pub parameters: Vec<ParamDecl>,
    pub output: OutputDecl,
    /// `<Name>_Error` when the method declares errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<TypeName>,
    pub retry: bool,
}

impl MethodDecl {
    pub fn parameter(&self, name: &str) -> Option<&ParamDecl> {
        self.parameters.iter().find(|p| p.wire_name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecl {
    pub encoding: String,
    pub body: BodyKind,
}

/// How an input body is passed to the method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "type", rename_all = "lowercase")]
pub enum BodyKind {
    Json(TypeExpr),
    Text,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub wire_name: String,
    pub ty: TypeExpr,
    pub kind: ParamKind,
    /// Listed in `required` and without a default
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Wrapping applied when a parameter goes into the parameter bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Boolean,
    Integer,
    Array,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Decided here so generated code never inspects the response at runtime
    pub shape: OutputShape,
    /// Decoded type for `Json` outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDecl {
    pub name: String,
    pub nsid: String,
    pub variants: Vec<ErrorVariant>,
    /// Catch-all case for error names the schema does not declare
    pub unexpected_case: String,
}

impl ErrorDecl {
    /// Case a server error name maps onto
    pub fn case_for(&self, error_name: &str) -> &str {
        self.variants
            .iter()
            .find(|v| v.error_name == error_name)
            .map(|v| v.case_name.as_str())
            .unwrap_or(&self.unexpected_case)
    }

    pub fn error_names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.error_name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorVariant {
    pub case_name: String,
    /// Symbolic name as sent by the server
    pub error_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
