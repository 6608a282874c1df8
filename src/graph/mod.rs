//! Lexicon Definition Graph
//!
//! The global definition table and the flattened, named view of it.
//!
//! Definitions are addressed by fully-qualified key strings, never by
//! pointer, so forward, cross-document and cyclic references are just
//! lookups into a map that is complete before resolution starts.

pub mod analysis;
pub mod diagnostics;
pub mod groups;
pub mod loader;
pub mod resolve;
pub mod walker;

pub use analysis::{mark_boxed_fields, BoxedEdge, CycleAnalysis, ReferenceGraph, SccGroup, TypeNodeId};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use groups::NamespaceGroups;
pub use loader::{load_from_directory, load_from_sources, LoadConfig, LoadedCorpus, SourceFile};
pub use resolve::{
    FieldType, InlineEnum, NamePath, Qualification, ResolvedRef, Resolver, Scalar, Site, TypeExpr,
    TypeName,
};
pub use walker::flatten;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::codegen::names;
use crate::error::{LexiconError, Result};
use crate::schema::{LexiconDocument, TypeNode, MAIN_DEF};

/// Fully-qualified key of a def: the bare NSID for `main`, `nsid#def` otherwise
pub fn def_key(id: &str, def_name: &str) -> String {
    if def_name == MAIN_DEF {
        id.to_string()
    } else {
        format!("{}#{}", id, def_name)
    }
}

// =============================================================================
// Resolution Context
// =============================================================================

/// Where a node lives: its group, its document, and its (possibly
/// synthesized) def name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DefContext {
    pub namespace_prefix: String,
    pub owning_id: String,
    pub def_name: String,
}

impl DefContext {
    pub fn new(
        namespace_prefix: impl Into<String>,
        owning_id: impl Into<String>,
        def_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into(),
            owning_id: owning_id.into(),
            def_name: def_name.into(),
        }
    }

    pub fn key(&self) -> String {
        def_key(&self.owning_id, &self.def_name)
    }

    /// Context of an anonymous shape nested under `segment`
    pub fn child(&self, segment: &str) -> Self {
        Self {
            namespace_prefix: self.namespace_prefix.clone(),
            owning_id: self.owning_id.clone(),
            def_name: names::nested_name(&self.def_name, segment),
        }
    }
}

// =============================================================================
// Global Definition Table
// =============================================================================

/// A top-level def together with its resolution context
#[derive(Debug, Clone, PartialEq)]
pub struct DefEntry {
    pub context: DefContext,
    pub node: TypeNode,
}

impl DefEntry {
    /// Type name of this def inside its group
    pub fn type_name(&self) -> String {
        names::type_name_for_def(
            &self.context.owning_id,
            &self.context.def_name,
            &self.context.namespace_prefix,
        )
    }
}

/// Every top-level def of the corpus, keyed by fully-qualified key
#[derive(Debug, Clone, Default)]
pub struct ExtDefMap {
    entries: BTreeMap<String, DefEntry>,
}

impl ExtDefMap {
    /// Fold every document's defs into one table.
    ///
    /// Documents whose id has no group assignment are grouped on their own.
    pub fn build(documents: &[LexiconDocument], groups: &NamespaceGroups) -> Self {
        let mut entries = BTreeMap::new();
        for doc in documents {
            let prefix = groups.prefix_for(&doc.id).unwrap_or_default();
            for (name, node) in &doc.defs {
                let context = DefContext::new(prefix, doc.id.as_str(), name.as_str());
                entries.insert(
                    context.key(),
                    DefEntry {
                        context,
                        node: node.clone(),
                    },
                );
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&DefEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DefEntry)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Flattened Table
// =============================================================================

/// A named node ready for synthesis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatDef {
    pub context: DefContext,
    /// Synthesized type name, unique within the group
    pub type_name: String,
    /// The node itself; a record is stored as its inner object
    pub node: TypeNode,
    pub is_record: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_key: Option<String>,
    /// Empty objects carry an explicit type tag to stay distinguishable
    pub needs_type_tag: bool,
}

impl FlatDef {
    pub fn key(&self) -> String {
        self.context.key()
    }
}

/// Flattened defs partitioned by namespace-prefix group, each group keyed by
/// type name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTable {
    groups: BTreeMap<String, BTreeMap<String, FlatDef>>,
}

impl FlatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a def; a second def with the same name in the same group is fatal.
    pub fn insert(&mut self, def: FlatDef) -> Result<()> {
        let group = self
            .groups
            .entry(def.context.namespace_prefix.clone())
            .or_default();
        if let Some(existing) = group.get(&def.type_name) {
            return Err(LexiconError::NamingCollision {
                group: def.context.namespace_prefix.clone(),
                name: def.type_name.clone(),
                first: existing.key(),
                second: def.key(),
            });
        }
        group.insert(def.type_name.clone(), def);
        Ok(())
    }

    pub fn get(&self, prefix: &str, type_name: &str) -> Option<&FlatDef> {
        self.groups.get(prefix)?.get(type_name)
    }

    pub fn group(&self, prefix: &str) -> Option<&BTreeMap<String, FlatDef>> {
        self.groups.get(prefix)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, FlatDef>)> {
        self.groups.iter()
    }

    /// All defs, group by group, in name order
    pub fn iter(&self) -> impl Iterator<Item = &FlatDef> {
        self.groups.values().flat_map(|group| group.values())
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{TokenNode, TypeNode};

    fn token_def(prefix: &str, id: &str, def: &str, name: &str) -> FlatDef {
        FlatDef {
            context: DefContext::new(prefix, id, def),
            type_name: name.to_string(),
            node: TypeNode::Token(TokenNode::default()),
            is_record: false,
            record_key: None,
            needs_type_tag: false,
        }
    }

    #[test]
    fn test_def_key() {
        assert_eq!(def_key("com.example.foo", "main"), "com.example.foo");
        assert_eq!(def_key("com.example.foo", "widget"), "com.example.foo#widget");
    }

    #[test]
    fn test_child_context() {
        let ctx = DefContext::new("com.example", "com.example.foo", "main");
        let child = ctx.child("reply").child("elem");
        assert_eq!(child.def_name, "main_Reply_Elem");
        assert_eq!(child.key(), "com.example.foo#main_Reply_Elem");
    }

    #[test]
    fn test_flat_table_detects_collision() {
        let mut table = FlatTable::new();
        table
            .insert(token_def("com.example", "com.example.fooBar", "main", "FooBar"))
            .unwrap();
        let err = table
            .insert(token_def("com.example", "com.example.foo", "bar", "FooBar"))
            .unwrap_err();

        match err {
            LexiconError::NamingCollision { name, first, second, .. } => {
                assert_eq!(name, "FooBar");
                assert_eq!(first, "com.example.fooBar");
                assert_eq!(second, "com.example.foo#bar");
            }
            other => panic!("Expected NamingCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_same_name_in_different_groups_is_fine() {
        let mut table = FlatTable::new();
        table.insert(token_def("com.a", "com.a.post", "main", "Post")).unwrap();
        table.insert(token_def("org.b", "org.b.post", "main", "Post")).unwrap();
        assert_eq!(table.len(), 2);
    }
}
