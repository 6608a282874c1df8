//! Synthesis Rules
//!
//! Decides, for every flattened node and every RPC def of one group, which
//! declarations it becomes. Groups are independent once the global table is
//! complete, so each runs on its own [`GroupSynthesizer`].

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::config::CodegenConfig;
use super::decl::{
    BodyKind, Declaration, EnumCase, EnumDecl, EnumValue, ErrorDecl, ErrorVariant, FieldDecl,
    InputDecl, MethodDecl, OutputDecl, ParamDecl, ParamKind, RecordInfo, StructDecl, TypeTag,
    UnionDecl, UnionVariant,
};
use super::names;
use crate::error::{LexiconError, Result};
use crate::graph::resolve::qualify_key;
use crate::graph::{
    DefEntry, DiagnosticCode, Diagnostics, FieldType, FlatDef, InlineEnum, NamePath, ResolvedRef,
    Resolver, Scalar, Site, TypeExpr, TypeName,
};
use crate::runtime::{HttpMethod, OutputShape};
use crate::schema::{ObjectNode, RpcBody, TypeNode, UnionNode, Vocabulary};

/// Name of the fallback case of open enumerations
pub const OPEN_ENUM_FALLBACK: &str = "other";

const JSON_ENCODING: &str = "application/json";

/// Classification of a body encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Text,
    Binary,
}

impl Encoding {
    pub fn classify(encoding: &str) -> Self {
        let media_type = encoding.split(';').next().unwrap_or_default().trim();
        if media_type.eq_ignore_ascii_case(JSON_ENCODING) {
            Self::Json
        } else if media_type.to_ascii_lowercase().starts_with("text/") {
            Self::Text
        } else {
            Self::Binary
        }
    }
}

/// Synthesizes the declarations of one namespace-prefix group
pub struct GroupSynthesizer<'a> {
    prefix: &'a str,
    resolver: &'a Resolver<'a>,
    config: &'a CodegenConfig,
    declarations: Vec<Declaration>,
    /// Emitted inline enums by name, so repeated requests are emitted once
    inline_emitted: BTreeMap<String, InlineEnum>,
    diagnostics: Diagnostics,
}

impl<'a> GroupSynthesizer<'a> {
    pub fn new(prefix: &'a str, resolver: &'a Resolver<'a>, config: &'a CodegenConfig) -> Self {
        Self {
            prefix,
            resolver,
            config,
            declarations: Vec::new(),
            inline_emitted: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Run the group: flattened defs in name order, then RPC methods in key
    /// order. Fails on unresolved references and type-name collisions.
    pub fn run<'d>(
        mut self,
        flat: impl IntoIterator<Item = &'d FlatDef>,
        rpc: impl IntoIterator<Item = &'d DefEntry>,
    ) -> Result<(Vec<Declaration>, Diagnostics)> {
        for def in flat {
            self.flat_def(def)?;
        }
        for entry in rpc {
            self.method(entry)?;
        }
        self.check_names()?;

        debug!(
            group = %self.prefix,
            declarations = self.declarations.len(),
            "Synthesized group"
        );
        Ok((self.declarations, self.diagnostics))
    }

    fn site(&self) -> Site<'a> {
        Site::contextual(self.prefix)
    }

    fn flat_def(&mut self, def: &FlatDef) -> Result<()> {
        match &def.node {
            TypeNode::Object(object) => self.struct_decl(def, object),
            TypeNode::Union(union) => self.union_decl(def, union),
            node if node.is_closed_scalar() => {
                if let Some(decl) = self.enum_decl(&def.type_name, node, &def.key()) {
                    self.declarations.push(Declaration::Enum(decl));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Structs
    // =========================================================================

    fn struct_decl(&mut self, def: &FlatDef, object: &ObjectNode) -> Result<()> {
        let mut fields = Vec::with_capacity(object.properties.len());
        let mut pending = Vec::new();

        for (property, node) in &object.properties {
            let path = NamePath::new(self.prefix, names::nested_name(&def.type_name, property));
            let FieldType { ty, inline_enums } =
                self.resolver.field_type(node, &def.context, &path, self.site())?;
            pending.extend(inline_enums);

            let name = names::camel_case(property);
            fields.push(FieldDecl {
                name: if name.is_empty() { property.clone() } else { name },
                wire_name: property.clone(),
                ty,
                optional: object.is_optional(property),
                boxed: false,
                description: node.description().map(str::to_string),
            });
        }
        self.check_unique(
            &def.key(),
            fields.iter().map(|f| (f.name.as_str(), f.wire_name.as_str())),
        );

        let key = def.key();
        let type_tag = (def.is_record || def.needs_type_tag).then(|| TypeTag {
            field: self.config.type_tag_field.clone(),
            value: key.clone(),
        });
        let record = def.is_record.then(|| RecordInfo {
            nsid: key.clone(),
            key: def.record_key.clone(),
        });

        self.declarations.push(Declaration::Struct(StructDecl {
            name: def.type_name.clone(),
            key,
            description: object.description.clone(),
            fields,
            record,
            type_tag,
            preserves_unknown_fields: true,
        }));
        self.emit_inline_enums(pending)
    }

    // =========================================================================
    // Unions
    // =========================================================================

    fn union_decl(&mut self, def: &FlatDef, union: &UnionNode) -> Result<()> {
        let key = def.key();
        let mut seen = BTreeSet::new();
        let mut variants = Vec::with_capacity(union.refs.len());
        let mut pending = Vec::new();

        for reference in &union.refs {
            let type_id = qualify_key(reference, &def.context.owning_id);
            if !seen.insert(type_id.clone()) {
                self.diagnostics.report(
                    key.clone(),
                    DiagnosticCode::DuplicateUnionRef,
                    format!("'{}' listed more than once", reference),
                );
                continue;
            }

            let case_name = names::avoid_reserved(
                names::case_name_from_id(&type_id, self.prefix),
                &self.config.catch_all_case,
            );
            let ty = match self.resolver.resolve(reference, &def.context, self.site())? {
                ResolvedRef::Type(field) => {
                    pending.extend(field.inline_enums);
                    field.ty
                }
                ResolvedRef::InlineEnum { key: origin, node } => {
                    let name = names::nested_name(&def.type_name, &case_name);
                    pending.push(InlineEnum {
                        name: name.clone(),
                        node,
                        origin,
                    });
                    TypeExpr::Named(TypeName::bare(name))
                }
            };

            variants.push(UnionVariant {
                case_name,
                type_id,
                ty,
                boxed: false,
            });
        }

        let catch_all = self.config.catch_all_case.clone();
        self.check_unique(
            &key,
            variants
                .iter()
                .map(|v| (v.case_name.as_str(), v.type_id.as_str()))
                .chain(std::iter::once((catch_all.as_str(), "<catch-all>"))),
        );

        self.declarations.push(Declaration::Union(UnionDecl {
            name: def.type_name.clone(),
            key,
            description: union.description.clone(),
            variants,
            catch_all,
            closed: union.closed.unwrap_or(false),
            tag_field: self.config.type_tag_field.clone(),
        }));
        self.emit_inline_enums(pending)
    }

    // =========================================================================
    // Enums
    // =========================================================================

    fn enum_decl(&mut self, name: &str, node: &TypeNode, origin: &str) -> Option<EnumDecl> {
        let (cases, open, description) = match node {
            TypeNode::String(string) => {
                let vocabulary = string.vocabulary()?;
                if string.enum_values.is_some() && string.known_values.is_some() {
                    self.diagnostics.report(
                        origin,
                        DiagnosticCode::EnumAndKnownValues,
                        format!("{}: 'enum' wins over 'knownValues'", name),
                    );
                }
                let (values, open) = match vocabulary {
                    Vocabulary::Closed(values) => (values, false),
                    Vocabulary::Open(values) => (values, true),
                };
                let mut unique = BTreeSet::new();
                let cases: Vec<EnumCase> = values
                    .iter()
                    .filter(|v| unique.insert(v.as_str()))
                    .map(|v| {
                        let case = names::string_case_name(v);
                        EnumCase {
                            name: if open { names::avoid_reserved(case, OPEN_ENUM_FALLBACK) } else { case },
                            value: EnumValue::String(v.clone()),
                        }
                    })
                    .collect();
                (cases, open, string.description.clone())
            }
            TypeNode::Integer(integer) => {
                let mut unique = BTreeSet::new();
                let cases: Vec<EnumCase> = integer
                    .enum_values
                    .as_deref()?
                    .iter()
                    .filter(|v| unique.insert(**v))
                    .map(|v| EnumCase {
                        name: names::integer_case_name(*v),
                        value: EnumValue::Integer(*v),
                    })
                    .collect();
                (cases, false, integer.description.clone())
            }
            _ => return None,
        };

        let fallback_case = open.then(|| OPEN_ENUM_FALLBACK.to_string());
        let literals: Vec<String> = cases
            .iter()
            .map(|c| match &c.value {
                EnumValue::String(s) => s.clone(),
                EnumValue::Integer(i) => i.to_string(),
            })
            .collect();
        self.check_unique(
            origin,
            cases
                .iter()
                .zip(&literals)
                .map(|(c, literal)| (c.name.as_str(), literal.as_str()))
                .chain(fallback_case.as_deref().map(|f| (f, "<fallback>"))),
        );

        Some(EnumDecl {
            name: name.to_string(),
            key: origin.to_string(),
            description,
            cases,
            open,
            fallback_case,
        })
    }

    fn emit_inline_enums(&mut self, pending: Vec<InlineEnum>) -> Result<()> {
        for inline in pending {
            if let Some(existing) = self.inline_emitted.get(&inline.name) {
                if existing.node == inline.node {
                    continue;
                }
                return Err(LexiconError::NamingCollision {
                    group: self.prefix.to_string(),
                    name: inline.name.clone(),
                    first: existing.origin.clone(),
                    second: inline.origin.clone(),
                });
            }
            if let Some(decl) = self.enum_decl(&inline.name, &inline.node, &inline.origin) {
                self.declarations.push(Declaration::Enum(decl));
            }
            self.inline_emitted.insert(inline.name.clone(), inline);
        }
        Ok(())
    }

    // =========================================================================
    // RPC Methods
    // =========================================================================

    fn method(&mut self, entry: &DefEntry) -> Result<()> {
        let Some(shape) = entry.node.rpc_shape() else {
            return Ok(());
        };
        let name = entry.type_name();
        let nsid = entry.context.owning_id.clone();
        let base = NamePath::new(self.prefix, name.clone());
        // RPC signatures are emitted into the client context, outside the module.
        let site = Site::always(self.prefix);
        let mut pending = Vec::new();

        let input = match shape.input {
            Some(body) => {
                let kind = match Encoding::classify(&body.encoding) {
                    Encoding::Json => {
                        BodyKind::Json(self.body_type(body, entry, &base.child("input"), site, &mut pending)?)
                    }
                    Encoding::Text => BodyKind::Text,
                    Encoding::Binary => BodyKind::Binary,
                };
                Some(InputDecl {
                    encoding: body.encoding.clone(),
                    body: kind,
                })
            }
            None => None,
        };

        let mut parameters = Vec::new();
        if let Some(params) = shape.parameters {
            for (param, node) in &params.properties {
                let FieldType { ty, inline_enums } =
                    self.resolver
                        .field_type(node, &entry.context, &base.child(param), site)?;
                let kind = param_kind(&ty, &inline_enums);
                pending.extend(inline_enums);

                let default = default_value(node);
                parameters.push(ParamDecl {
                    name: names::camel_case(param),
                    wire_name: param.clone(),
                    ty,
                    kind,
                    required: params.is_required(param) && default.is_none(),
                    default,
                    description: node.description().map(str::to_string),
                });
            }
        }

        let output = match shape.output {
            None => OutputDecl {
                encoding: None,
                shape: OutputShape::Empty,
                ty: None,
            },
            Some(body) => match Encoding::classify(&body.encoding) {
                Encoding::Json => OutputDecl {
                    encoding: Some(body.encoding.clone()),
                    shape: OutputShape::Json,
                    ty: Some(self.body_type(body, entry, &base.child("output"), site, &mut pending)?),
                },
                Encoding::Text => OutputDecl {
                    encoding: Some(body.encoding.clone()),
                    shape: OutputShape::Text,
                    ty: None,
                },
                Encoding::Binary => OutputDecl {
                    encoding: Some(body.encoding.clone()),
                    shape: OutputShape::Bytes,
                    ty: None,
                },
            },
        };

        let error = self.error_decl(&name, &nsid, shape.errors);
        let error_type = error
            .as_ref()
            .map(|e| TypeName::qualified(self.config.module_name_for(self.prefix), e.name.clone()));

        self.declarations.push(Declaration::Method(MethodDecl {
            name,
            http_method: HttpMethod::for_kind(shape.is_procedure),
            content_type: input.as_ref().map(|i| i.encoding.clone()),
            nsid,
            description: shape.description.map(str::to_string),
            input,
            parameters,
            output,
            error_type,
            retry: true,
        }));
        self.emit_inline_enums(pending)?;
        if let Some(error) = error {
            self.declarations.push(Declaration::Error(error));
        }
        Ok(())
    }

    /// JSON body type: the referenced type for a bare ref, else `<Name>_Input`
    /// / `<Name>_Output`. A JSON body without a schema is an unknown value.
    fn body_type(
        &self,
        body: &RpcBody,
        entry: &DefEntry,
        path: &NamePath,
        site: Site<'_>,
        pending: &mut Vec<InlineEnum>,
    ) -> Result<TypeExpr> {
        let Some(schema) = body.schema.as_deref() else {
            return Ok(TypeExpr::Scalar(Scalar::Unknown));
        };
        let field = self.resolver.field_type(schema, &entry.context, path, site)?;
        pending.extend(field.inline_enums);
        Ok(field.ty)
    }

    fn error_decl(&mut self, method: &str, nsid: &str, errors: &[crate::schema::RpcErrorDef]) -> Option<ErrorDecl> {
        if errors.is_empty() {
            return None;
        }
        let mut seen = BTreeSet::new();
        let mut variants = Vec::with_capacity(errors.len());
        for error in errors {
            if !seen.insert(error.name.as_str()) {
                self.diagnostics.report(
                    nsid,
                    DiagnosticCode::DuplicateErrorName,
                    format!("Error '{}' declared more than once", error.name),
                );
                continue;
            }
            variants.push(ErrorVariant {
                case_name: names::avoid_reserved(names::camel_case(&error.name), &self.config.unexpected_error_case),
                error_name: error.name.clone(),
                description: error.description.clone(),
            });
        }

        let unexpected_case = self.config.unexpected_error_case.clone();
        self.check_unique(
            nsid,
            variants
                .iter()
                .map(|v| (v.case_name.as_str(), v.error_name.as_str()))
                .chain(std::iter::once((unexpected_case.as_str(), "<unexpected>"))),
        );

        Some(ErrorDecl {
            name: names::nested_name(method, "error"),
            nsid: nsid.to_string(),
            variants,
            unexpected_case,
        })
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// Report identifiers produced by more than one input within one declaration
    fn check_unique<'i>(&mut self, origin: &str, pairs: impl IntoIterator<Item = (&'i str, &'i str)>) {
        let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, original) in pairs {
            by_name.entry(name).or_default().push(original);
        }
        for (name, originals) in by_name {
            if originals.len() > 1 {
                self.diagnostics.case_name_conflict(origin, name, &originals);
            }
        }
    }

    /// Types share the module namespace; methods share the client context
    fn check_names(&self) -> Result<()> {
        let mut types: BTreeMap<&str, &str> = BTreeMap::new();
        let mut methods: BTreeMap<&str, &str> = BTreeMap::new();
        for decl in &self.declarations {
            let seen = if decl.is_type() { &mut types } else { &mut methods };
            if let Some(first) = seen.insert(decl.name(), decl.origin()) {
                return Err(LexiconError::NamingCollision {
                    group: self.prefix.to_string(),
                    name: decl.name().to_string(),
                    first: first.to_string(),
                    second: decl.origin().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn param_kind(ty: &TypeExpr, inline_enums: &[InlineEnum]) -> ParamKind {
    match ty {
        TypeExpr::Array(_) => ParamKind::Array,
        TypeExpr::Scalar(Scalar::String) => ParamKind::String,
        TypeExpr::Scalar(Scalar::Integer) => ParamKind::Integer,
        TypeExpr::Scalar(Scalar::Boolean) => ParamKind::Boolean,
        TypeExpr::Named(name) => match inline_enums.iter().find(|e| e.name == name.name) {
            Some(InlineEnum { node: TypeNode::String(_), .. }) => ParamKind::String,
            Some(InlineEnum { node: TypeNode::Integer(_), .. }) => ParamKind::Integer,
            _ => ParamKind::Unknown,
        },
        TypeExpr::Scalar(_) => ParamKind::Unknown,
    }
}

fn default_value(node: &TypeNode) -> Option<serde_json::Value> {
    match node {
        TypeNode::String(s) => s.default.clone().map(serde_json::Value::from),
        TypeNode::Integer(i) => i.default.map(serde_json::Value::from),
        TypeNode::Boolean(b) => b.default.map(serde_json::Value::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{flatten, ExtDefMap, NamespaceGroups};
    use crate::schema::LexiconDocument;
    use serde_json::json;

    struct Fixture {
        defs: ExtDefMap,
        prefix: String,
        config: CodegenConfig,
    }

    impl Fixture {
        fn new(doc: serde_json::Value) -> Self {
            let doc = LexiconDocument::from_value("test", doc).unwrap();
            let groups = NamespaceGroups::compute([doc.id.as_str()]);
            let prefix = groups.prefix_for(&doc.id).unwrap().to_string();
            Self {
                defs: ExtDefMap::build(&[doc], &groups),
                prefix,
                config: CodegenConfig::default(),
            }
        }

        fn run(&self) -> (Vec<Declaration>, Diagnostics) {
            let (table, _) = flatten(&self.defs).unwrap();
            let resolver = Resolver::new(&self.defs, &self.config);
            let rpc: Vec<&DefEntry> = self
                .defs
                .iter()
                .map(|(_, e)| e)
                .filter(|e| e.node.rpc_shape().is_some())
                .collect();
            GroupSynthesizer::new(&self.prefix, &resolver, &self.config)
                .run(table.iter(), rpc)
                .unwrap()
        }
    }

    fn find<'d>(decls: &'d [Declaration], name: &str) -> &'d Declaration {
        decls
            .iter()
            .find(|d| d.name() == name)
            .unwrap_or_else(|| panic!("No declaration named {}", name))
    }

    #[test]
    fn test_encoding_classification() {
        assert_eq!(Encoding::classify("application/json"), Encoding::Json);
        assert_eq!(Encoding::classify("application/json; charset=utf-8"), Encoding::Json);
        assert_eq!(Encoding::classify("text/plain"), Encoding::Text);
        assert_eq!(Encoding::classify("*/*"), Encoding::Binary);
        assert_eq!(Encoding::classify("application/vnd.ipld.car"), Encoding::Binary);
    }

    #[test]
    fn test_struct_optionality_and_inline_enum() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.post",
            "defs": {
                "main": {
                    "type": "object",
                    "required": ["text", "lang"],
                    "nullable": ["lang"],
                    "properties": {
                        "text": { "type": "string" },
                        "lang": { "type": "string" },
                        "mode": { "type": "string", "knownValues": ["fast", "slow"] }
                    }
                }
            }
        }));
        let (decls, diagnostics) = fixture.run();
        assert!(diagnostics.is_empty());

        let post = find(&decls, "ExamplePost").as_struct().unwrap();
        assert!(!post.field("text").unwrap().optional);
        assert!(post.field("lang").unwrap().optional);
        assert!(post.preserves_unknown_fields);
        assert!(post.type_tag.is_none());
        assert_eq!(post.field("mode").unwrap().ty.to_string(), "ExamplePost_Mode");

        let mode = find(&decls, "ExamplePost_Mode").as_enum().unwrap();
        assert!(mode.open);
        assert_eq!(mode.fallback_case.as_deref(), Some("other"));
        assert_eq!(mode.case_names(), vec!["fast", "slow"]);
    }

    #[test]
    fn test_record_gets_type_tag() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.like",
            "defs": {
                "main": {
                    "type": "record",
                    "key": "tid",
                    "record": { "type": "object", "properties": { "subject": { "type": "string" } } }
                }
            }
        }));
        let (decls, _) = fixture.run();
        let like = find(&decls, "ExampleLike").as_struct().unwrap();
        assert_eq!(
            like.type_tag,
            Some(TypeTag {
                field: "$type".into(),
                value: "com.example.like".into()
            })
        );
        assert_eq!(like.record.as_ref().unwrap().key.as_deref(), Some("tid"));
    }

    #[test]
    fn test_closed_enum_and_integer_enum() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.prefs",
            "defs": {
                "sort": { "type": "string", "enum": ["oldest-first", "newest-first"] },
                "level": { "type": "integer", "enum": [-1, 0, 2] }
            }
        }));
        let (decls, _) = fixture.run();

        let sort = find(&decls, "ExamplePrefsSort").as_enum().unwrap();
        assert!(!sort.open);
        assert_eq!(sort.case_names(), vec!["oldestFirst", "newestFirst"]);

        let level = find(&decls, "ExamplePrefsLevel").as_enum().unwrap();
        assert_eq!(level.case_names(), vec!["valueMinus1", "value0", "value2"]);
    }

    #[test]
    fn test_enum_case_conflict_is_an_error() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.prefs",
            "defs": { "kind": { "type": "string", "knownValues": ["foo-bar", "foo_bar"] } }
        }));
        let (_, diagnostics) = fixture.run();
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.errors().next().unwrap().code, DiagnosticCode::CaseNameConflict);
    }

    #[test]
    fn test_known_value_named_like_fallback_is_escaped() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.prefs",
            "defs": { "kind": { "type": "string", "knownValues": ["spam", "other"] } }
        }));
        let (decls, diagnostics) = fixture.run();
        assert!(!diagnostics.has_errors());

        let kind = find(&decls, "ExamplePrefsKind").as_enum().unwrap();
        assert_eq!(kind.case_names(), vec!["spam", "other_"]);
        assert_eq!(kind.fallback_case.as_deref(), Some("other"));
    }

    #[test]
    fn test_closed_enum_keeps_other_case() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.prefs",
            "defs": { "kind": { "type": "string", "enum": ["spam", "other"] } }
        }));
        let (decls, _) = fixture.run();
        assert_eq!(find(&decls, "ExamplePrefsKind").as_enum().unwrap().case_names(), vec!["spam", "other"]);
    }

    #[test]
    fn test_error_named_like_unexpected_case_is_escaped() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.ping",
            "defs": {
                "main": {
                    "type": "query",
                    "errors": [{ "name": "Unexpected" }, { "name": "NotFound" }]
                }
            }
        }));
        let (decls, diagnostics) = fixture.run();
        assert!(!diagnostics.has_errors());

        let error = find(&decls, "ExamplePing_Error").as_error().unwrap();
        assert_eq!(error.case_for("Unexpected"), "unexpected_");
        assert_eq!(error.case_for("NotFound"), "notFound");
        assert_eq!(error.case_for("RateLimited"), "unexpected");
    }

    #[test]
    fn test_union_case_named_like_catch_all_is_escaped() {
        let mut fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.feed",
            "defs": {
                "main": { "type": "union", "refs": ["#one"] },
                "one": { "type": "object", "properties": {} }
            }
        }));
        fixture.config.catch_all_case = "exampleFeedOne".to_string();
        let (decls, diagnostics) = fixture.run();
        assert!(!diagnostics.has_errors());

        let union = find(&decls, "ExampleFeed").as_union().unwrap();
        assert_eq!(union.case_for("com.example.feed#one"), "exampleFeedOne_");
        assert_eq!(union.case_for("com.example.feed#two"), "exampleFeedOne");
    }

    #[test]
    fn test_union_variants_and_catch_all() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.feed",
            "defs": {
                "main": { "type": "union", "refs": ["#one", "#two", "#one"], "closed": true },
                "one": { "type": "object", "properties": {} },
                "two": { "type": "object", "properties": {} }
            }
        }));
        let (decls, diagnostics) = fixture.run();
        let union = find(&decls, "ExampleFeed").as_union().unwrap();

        let cases: Vec<&str> = union.variants.iter().map(|v| v.case_name.as_str()).collect();
        assert_eq!(cases, vec!["exampleFeedOne", "exampleFeedTwo"]);
        assert_eq!(union.catch_all, "unknown");
        assert!(union.closed);
        assert_eq!(union.case_for("com.example.feed#two"), "exampleFeedTwo");
        assert_eq!(union.case_for("com.example.other"), "unknown");
        assert_eq!(diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_procedure_method() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.upload",
            "defs": {
                "main": {
                    "type": "procedure",
                    "parameters": {
                        "type": "params",
                        "required": ["repo", "validate"],
                        "properties": {
                            "repo": { "type": "string" },
                            "validate": { "type": "boolean", "default": true },
                            "mode": { "type": "string", "enum": ["a", "b"] }
                        }
                    },
                    "input": { "encoding": "*/*" },
                    "output": { "encoding": "text/plain" },
                    "errors": [{ "name": "BlobTooLarge", "description": "Too big" }]
                }
            }
        }));
        let (decls, _) = fixture.run();

        let method = find(&decls, "ExampleUpload").as_method().unwrap();
        assert_eq!(method.http_method, HttpMethod::Post);
        assert_eq!(method.content_type.as_deref(), Some("*/*"));
        assert_eq!(method.input.as_ref().unwrap().body, BodyKind::Binary);
        assert_eq!(method.output.shape, OutputShape::Text);
        assert!(method.retry);

        assert!(method.parameter("repo").unwrap().required);
        let validate = method.parameter("validate").unwrap();
        assert!(!validate.required);
        assert_eq!(validate.kind, ParamKind::Boolean);
        assert_eq!(validate.default, Some(json!(true)));

        let mode = method.parameter("mode").unwrap();
        assert_eq!(mode.kind, ParamKind::String);
        assert_eq!(mode.ty.to_string(), "comtypes.ExampleUpload_Mode");
        assert!(find(&decls, "ExampleUpload_Mode").as_enum().is_some());

        let error = find(&decls, "ExampleUpload_Error").as_error().unwrap();
        assert_eq!(error.case_for("BlobTooLarge"), "blobTooLarge");
        assert_eq!(error.case_for("Nope"), "unexpected");
        assert_eq!(method.error_type.as_ref().unwrap().to_string(), "comtypes.ExampleUpload_Error");
    }

    #[test]
    fn test_query_without_output_is_empty() {
        let fixture = Fixture::new(json!({
            "lexicon": 1,
            "id": "com.example.ping",
            "defs": { "main": { "type": "query" } }
        }));
        let (decls, _) = fixture.run();
        let method = find(&decls, "ExamplePing").as_method().unwrap();
        assert_eq!(method.http_method, HttpMethod::Get);
        assert_eq!(method.output.shape, OutputShape::Empty);
        assert!(method.error_type.is_none());
        assert!(decls.iter().all(|d| d.as_error().is_none()));
    }
}
