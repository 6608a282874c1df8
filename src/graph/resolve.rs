//! Reference Resolution
//!
//! Turns reference strings (`#local`, `nsid`, `nsid#def`) into output type
//! expressions, deciding per use-site whether the produced name needs its
//! group's module qualifier.
//!
//! Resolution is a lookup into the completed [`ExtDefMap`]; it never mutates
//! the table and never looks at the flattened view.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DefContext, DefEntry, ExtDefMap};
use crate::codegen::config::CodegenConfig;
use crate::codegen::names::{self, ELEMENT_SEGMENT};
use crate::error::{LexiconError, Result};
use crate::schema::{TypeNode, MAIN_DEF};

/// Alias chains (`ref` defs pointing at `ref` defs) longer than this are
/// treated as unresolvable.
const MAX_ALIAS_DEPTH: usize = 16;

// =============================================================================
// Type Expressions
// =============================================================================

/// Built-in scalar a primitive node maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scalar {
    String,
    Integer,
    Boolean,
    Bytes,
    Blob,
    CidLink,
    Unknown,
    Null,
}

impl Scalar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Bytes => "bytes",
            Self::Blob => "blob",
            Self::CidLink => "cid-link",
            Self::Unknown => "unknown",
            Self::Null => "null",
        }
    }

    /// Scalar of a primitive node; `None` for everything that needs a name
    pub fn of(node: &TypeNode) -> Option<Self> {
        match node {
            TypeNode::Token(_) => Some(Self::String),
            TypeNode::Null(_) => Some(Self::Null),
            TypeNode::Boolean(_) => Some(Self::Boolean),
            TypeNode::Integer(i) if !i.is_closed() => Some(Self::Integer),
            TypeNode::String(s) if !s.is_closed() => Some(Self::String),
            TypeNode::Blob(_) => Some(Self::Blob),
            TypeNode::Bytes(_) => Some(Self::Bytes),
            TypeNode::CidLink(_) => Some(Self::CidLink),
            TypeNode::Unknown(_) => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A named output type, optionally qualified by its group's module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub name: String,
}

impl TypeName {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            module: None,
            name: name.into(),
        }
    }

    pub fn qualified(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}.{}", module, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Type of a field, parameter, body or union variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeExpr {
    Scalar(Scalar),
    Named(TypeName),
    /// Arrays are never named; their element type is
    Array(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(&self) -> Option<&TypeName> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.write_str(s.as_str()),
            Self::Named(name) => write!(f, "{}", name),
            Self::Array(elem) => write!(f, "[{}]", elem),
        }
    }
}

// =============================================================================
// Use-Site Description
// =============================================================================

/// Whether a same-group name may drop its module qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualification {
    /// Bare name when the target lives in the site's group
    Contextual,
    /// Always qualified; RPC signatures are emitted outside the group module
    Always,
}

/// The group a resolved name will be written into
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    pub prefix: &'a str,
    pub qualification: Qualification,
}

impl<'a> Site<'a> {
    pub fn contextual(prefix: &'a str) -> Self {
        Self {
            prefix,
            qualification: Qualification::Contextual,
        }
    }

    pub fn always(prefix: &'a str) -> Self {
        Self {
            prefix,
            qualification: Qualification::Always,
        }
    }
}

/// Names of a nested position.
///
/// `recorded` is where the walker stored anonymous shapes (in group
/// `prefix`); `inline` is the per-use name given to closed enums that the
/// walker never records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePath {
    pub prefix: String,
    pub recorded: String,
    pub inline: String,
}

impl NamePath {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            prefix: prefix.into(),
            recorded: name.clone(),
            inline: name,
        }
    }

    pub fn child(&self, segment: &str) -> Self {
        Self {
            prefix: self.prefix.clone(),
            recorded: names::nested_name(&self.recorded, segment),
            inline: names::nested_name(&self.inline, segment),
        }
    }
}

// =============================================================================
// Resolution Results
// =============================================================================

/// Per-use enumeration to be emitted next to the declaration that uses it
#[derive(Debug, Clone, PartialEq)]
pub struct InlineEnum {
    pub name: String,
    /// The closed string or integer node supplying the cases
    pub node: TypeNode,
    /// Key of the def the cases come from, for diagnostics
    pub origin: String,
}

/// A resolved type plus the inline enums it asks for
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub ty: TypeExpr,
    pub inline_enums: Vec<InlineEnum>,
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedRef {
    Type(FieldType),
    /// Target is a closed enum: not shared, the use-site inlines its own copy
    InlineEnum { key: String, node: TypeNode },
}

/// Fully-qualified key of `reference` as seen from document `owning_id`
pub fn qualify_key(reference: &str, owning_id: &str) -> String {
    let key = if reference.starts_with('#') {
        format!("{}{}", owning_id, reference)
    } else {
        reference.to_string()
    };
    match key.strip_suffix(&format!("#{}", MAIN_DEF)) {
        Some(bare) => bare.to_string(),
        None => key,
    }
}

// =============================================================================
// Resolver
// =============================================================================

pub struct Resolver<'a> {
    defs: &'a ExtDefMap,
    config: &'a CodegenConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(defs: &'a ExtDefMap, config: &'a CodegenConfig) -> Self {
        Self { defs, config }
    }

    /// Resolve `reference` written inside `from`, for use at `site`
    pub fn resolve(&self, reference: &str, from: &DefContext, site: Site<'_>) -> Result<ResolvedRef> {
        self.resolve_depth(reference, from, site, 0)
    }

    fn resolve_depth(
        &self,
        reference: &str,
        from: &DefContext,
        site: Site<'_>,
        depth: usize,
    ) -> Result<ResolvedRef> {
        let key = qualify_key(reference, &from.owning_id);
        let entry = match self.defs.get(&key) {
            Some(entry) if depth < MAX_ALIAS_DEPTH => entry,
            _ => {
                return Err(LexiconError::UnresolvedReference {
                    owning_id: from.owning_id.clone(),
                    def_name: from.def_name.clone(),
                    reference: reference.to_string(),
                })
            }
        };

        let ty = match &entry.node {
            TypeNode::Record(_) => TypeExpr::Named(TypeName::qualified(
                self.config.module_name_for(&entry.context.namespace_prefix),
                entry.type_name(),
            )),
            TypeNode::Object(_) => TypeExpr::Named(self.name_at(
                &entry.context.namespace_prefix,
                entry.type_name(),
                site,
            )),
            TypeNode::Union(u) if u.refs.is_empty() => TypeExpr::Scalar(Scalar::Unknown),
            TypeNode::Union(_) => TypeExpr::Named(self.name_at(
                &entry.context.namespace_prefix,
                entry.type_name(),
                site,
            )),
            node if node.is_closed_scalar() => {
                return Ok(ResolvedRef::InlineEnum {
                    key,
                    node: node.clone(),
                })
            }
            TypeNode::Array(array) => {
                let path = NamePath::new(
                    entry.context.namespace_prefix.clone(),
                    names::nested_name(&entry.type_name(), ELEMENT_SEGMENT),
                );
                let mut inline_enums = Vec::new();
                let elem = self.expr(&array.items, &entry.context, &path, site, &mut inline_enums, depth + 1)?;
                return Ok(ResolvedRef::Type(FieldType {
                    ty: TypeExpr::Array(Box::new(elem)),
                    inline_enums,
                }));
            }
            TypeNode::Reference(alias) => {
                return self.resolve_depth(&alias.reference, &entry.context, site, depth + 1)
            }
            node if !node.is_data_type() => {
                return Err(not_a_data_type(from, reference, entry));
            }
            node => TypeExpr::Scalar(Scalar::of(node).unwrap_or(Scalar::Unknown)),
        };

        Ok(ResolvedRef::Type(FieldType {
            ty,
            inline_enums: Vec::new(),
        }))
    }

    /// Type of a property, parameter or body node declared inside `owner`.
    ///
    /// A closed scalar directly at this position becomes a per-use enum named
    /// after the position; deeper closed scalars were recorded by the walker.
    pub fn field_type(
        &self,
        node: &TypeNode,
        owner: &DefContext,
        path: &NamePath,
        site: Site<'_>,
    ) -> Result<FieldType> {
        let mut inline_enums = Vec::new();
        let ty = if node.is_closed_scalar() {
            inline_enums.push(InlineEnum {
                name: path.inline.clone(),
                node: node.clone(),
                origin: owner.key(),
            });
            TypeExpr::Named(self.local_name(&path.inline, site))
        } else {
            self.expr(node, owner, path, site, &mut inline_enums, 0)?
        };
        Ok(FieldType { ty, inline_enums })
    }

    fn expr(
        &self,
        node: &TypeNode,
        owner: &DefContext,
        path: &NamePath,
        site: Site<'_>,
        inline_enums: &mut Vec<InlineEnum>,
        depth: usize,
    ) -> Result<TypeExpr> {
        let ty = match node {
            TypeNode::Object(_) => TypeExpr::Named(self.name_at(&path.prefix, path.recorded.clone(), site)),
            TypeNode::Union(u) if u.refs.is_empty() => TypeExpr::Scalar(Scalar::Unknown),
            TypeNode::Union(_) => TypeExpr::Named(self.name_at(&path.prefix, path.recorded.clone(), site)),
            node if node.is_closed_scalar() => {
                TypeExpr::Named(self.name_at(&path.prefix, path.recorded.clone(), site))
            }
            TypeNode::Array(array) => TypeExpr::Array(Box::new(self.expr(
                &array.items,
                owner,
                &path.child(ELEMENT_SEGMENT),
                site,
                inline_enums,
                depth,
            )?)),
            TypeNode::Reference(r) => match self.resolve_depth(&r.reference, owner, site, depth)? {
                ResolvedRef::Type(field) => {
                    inline_enums.extend(field.inline_enums);
                    field.ty
                }
                ResolvedRef::InlineEnum { key, node } => {
                    inline_enums.push(InlineEnum {
                        name: path.inline.clone(),
                        node,
                        origin: key,
                    });
                    TypeExpr::Named(self.local_name(&path.inline, site))
                }
            },
            // Records are only meaningful as top-level defs
            TypeNode::Record(_) => TypeExpr::Scalar(Scalar::Unknown),
            node if !node.is_data_type() => {
                return Err(LexiconError::NotADataType {
                    owning_id: owner.owning_id.clone(),
                    def_name: owner.def_name.clone(),
                    reference: path.recorded.clone(),
                    kind: node.kind().to_string(),
                })
            }
            node => TypeExpr::Scalar(Scalar::of(node).unwrap_or(Scalar::Unknown)),
        };
        Ok(ty)
    }

    /// Name of a type living in group `target_prefix`, as written at `site`
    fn name_at(&self, target_prefix: &str, name: String, site: Site<'_>) -> TypeName {
        if site.qualification == Qualification::Always || target_prefix != site.prefix {
            TypeName::qualified(self.config.module_name_for(target_prefix), name)
        } else {
            TypeName::bare(name)
        }
    }

    /// Name of an inline enum, which is always emitted into the site's group
    fn local_name(&self, name: &str, site: Site<'_>) -> TypeName {
        self.name_at(site.prefix, name.to_string(), site)
    }
}

fn not_a_data_type(from: &DefContext, reference: &str, target: &DefEntry) -> LexiconError {
    LexiconError::NotADataType {
        owning_id: from.owning_id.clone(),
        def_name: from.def_name.clone(),
        reference: reference.to_string(),
        kind: target.node.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NamespaceGroups;
    use crate::schema::LexiconDocument;
    use serde_json::json;

    fn corpus() -> ExtDefMap {
        let docs = vec![
            LexiconDocument::from_value(
                "a",
                json!({
                    "lexicon": 1,
                    "id": "com.example.a",
                    "defs": {
                        "main": { "type": "record", "key": "tid", "record": { "type": "object", "properties": {} } },
                        "view": { "type": "object", "properties": {} },
                        "kind": { "type": "string", "knownValues": ["x", "y"] },
                        "list": { "type": "array", "items": { "type": "ref", "ref": "#view" } },
                        "handle": { "type": "string", "format": "handle" },
                        "alias": { "type": "ref", "ref": "#view" },
                        "nothing": { "type": "union", "refs": [] }
                    }
                }),
            )
            .unwrap(),
            LexiconDocument::from_value(
                "b",
                json!({
                    "lexicon": 1,
                    "id": "com.example.b",
                    "defs": { "main": { "type": "query" } }
                }),
            )
            .unwrap(),
            LexiconDocument::from_value(
                "c",
                json!({
                    "lexicon": 1,
                    "id": "org.other.c",
                    "defs": { "thing": { "type": "object", "properties": {} } }
                }),
            )
            .unwrap(),
            LexiconDocument::from_value(
                "d",
                json!({ "lexicon": 1, "id": "org.other.d", "defs": {} }),
            )
            .unwrap(),
        ];
        let groups = NamespaceGroups::compute(docs.iter().map(|d| d.id.as_str()));
        ExtDefMap::build(&docs, &groups)
    }

    fn ctx() -> DefContext {
        DefContext::new("com.example", "com.example.a", "main")
    }

    fn resolve_type(defs: &ExtDefMap, reference: &str, site: Site<'_>) -> TypeExpr {
        let config = CodegenConfig::default();
        match Resolver::new(defs, &config).resolve(reference, &ctx(), site).unwrap() {
            ResolvedRef::Type(field) => field.ty,
            other => panic!("Expected a type, got {:?}", other),
        }
    }

    #[test]
    fn test_qualify_key() {
        assert_eq!(qualify_key("#view", "com.example.a"), "com.example.a#view");
        assert_eq!(qualify_key("#main", "com.example.a"), "com.example.a");
        assert_eq!(qualify_key("com.example.b#main", "com.example.a"), "com.example.b");
        assert_eq!(qualify_key("org.other.c#thing", "com.example.a"), "org.other.c#thing");
    }

    #[test]
    fn test_same_group_is_bare() {
        let defs = corpus();
        let ty = resolve_type(&defs, "#view", Site::contextual("com.example"));
        assert_eq!(ty.to_string(), "AView");
    }

    #[test]
    fn test_other_group_is_qualified() {
        let defs = corpus();
        let ty = resolve_type(&defs, "org.other.c#thing", Site::contextual("com.example"));
        assert_eq!(ty.to_string(), "orgothertypes.CThing");
    }

    #[test]
    fn test_record_always_qualified() {
        let defs = corpus();
        let ty = resolve_type(&defs, "com.example.a", Site::contextual("com.example"));
        assert_eq!(ty.to_string(), "comexampletypes.A");
    }

    #[test]
    fn test_always_qualification_keeps_module() {
        let defs = corpus();
        let ty = resolve_type(&defs, "#view", Site::always("com.example"));
        assert_eq!(ty.to_string(), "comexampletypes.AView");
    }

    #[test]
    fn test_closed_enum_is_sentinel() {
        let defs = corpus();
        let config = CodegenConfig::default();
        let resolved = Resolver::new(&defs, &config)
            .resolve("#kind", &ctx(), Site::contextual("com.example"))
            .unwrap();
        assert!(matches!(resolved, ResolvedRef::InlineEnum { ref key, .. } if key == "com.example.a#kind"));
    }

    #[test]
    fn test_array_def_and_alias_and_primitive() {
        let defs = corpus();
        let site = Site::contextual("com.example");
        assert_eq!(resolve_type(&defs, "#list", site).to_string(), "[AView]");
        assert_eq!(resolve_type(&defs, "#alias", site).to_string(), "AView");
        assert_eq!(resolve_type(&defs, "#handle", site), TypeExpr::Scalar(Scalar::String));
        assert_eq!(resolve_type(&defs, "#nothing", site), TypeExpr::Scalar(Scalar::Unknown));
    }

    #[test]
    fn test_unresolved_reports_everything() {
        let defs = corpus();
        let config = CodegenConfig::default();
        let err = Resolver::new(&defs, &config)
            .resolve("#missing", &ctx(), Site::contextual("com.example"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("#missing"));
        assert!(message.contains("com.example.a"));
        assert!(message.contains("main"));
    }

    #[test]
    fn test_rpc_target_is_not_a_data_type() {
        let defs = corpus();
        let config = CodegenConfig::default();
        let err = Resolver::new(&defs, &config)
            .resolve("com.example.b", &ctx(), Site::contextual("com.example"))
            .unwrap_err();
        assert!(matches!(err, LexiconError::NotADataType { ref kind, .. } if kind == "query"));
    }

    #[test]
    fn test_inline_closed_property_requests_enum() {
        let defs = corpus();
        let config = CodegenConfig::default();
        let node: TypeNode = serde_json::from_value(json!({ "type": "string", "enum": ["a", "b"] })).unwrap();
        let field = Resolver::new(&defs, &config)
            .field_type(
                &node,
                &ctx(),
                &NamePath::new("com.example", "AView_Mode"),
                Site::contextual("com.example"),
            )
            .unwrap();
        assert_eq!(field.ty.to_string(), "AView_Mode");
        assert_eq!(field.inline_enums.len(), 1);
        assert_eq!(field.inline_enums[0].name, "AView_Mode");
    }

    #[test]
    fn test_array_of_closed_ref_names_elem() {
        let defs = corpus();
        let config = CodegenConfig::default();
        let node: TypeNode =
            serde_json::from_value(json!({ "type": "array", "items": { "type": "ref", "ref": "#kind" } })).unwrap();
        let field = Resolver::new(&defs, &config)
            .field_type(&node, &ctx(), &NamePath::new("com.example", "A_Kinds"), Site::contextual("com.example"))
            .unwrap();
        assert_eq!(field.ty.to_string(), "[A_Kinds_Elem]");
        assert_eq!(field.inline_enums[0].origin, "com.example.a#kind");
    }
}
