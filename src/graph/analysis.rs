//! Reference Cycle Analysis
//!
//! Builds the graph of named types referencing each other directly (struct
//! fields and union variants, not through arrays), computes strongly
//! connected components, and marks every field or variant whose type points
//! back into its owner's own component as boxed.
//!
//! Arrays already provide indirection in every target, so edges through an
//! array never force boxing.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::codegen::decl::Declaration;
use crate::codegen::GeneratedModule;
use crate::graph::{TypeExpr, TypeName};

// =============================================================================
// Graph Nodes and Edges
// =============================================================================

/// A named type: (module, type name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeNodeId {
    pub module: String,
    pub name: String,
}

impl TypeNodeId {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Node a name written inside `module` refers to
    fn of(name: &TypeName, module: &str) -> Self {
        Self::new(name.module.as_deref().unwrap_or(module), name.name.as_str())
    }
}

impl fmt::Display for TypeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Position inside a declaration that references another type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeSite {
    /// Index into a struct's fields
    Field(usize),
    /// Index into a union's variants
    Variant(usize),
}

/// A direct reference that closes a cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxedEdge {
    pub from: TypeNodeId,
    pub site: EdgeSite,
    pub to: TypeNodeId,
    pub scc_id: usize,
}

/// A strongly connected component with more than one member, or a single
/// self-referential type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SccGroup {
    pub id: usize,
    pub members: Vec<TypeNodeId>,
    pub is_self_referential: bool,
}

/// Result of the cycle analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleAnalysis {
    pub groups: Vec<SccGroup>,
    pub boxed_edges: Vec<BoxedEdge>,
}

impl CycleAnalysis {
    pub fn is_cyclic(&self, node: &TypeNodeId) -> bool {
        self.groups.iter().any(|g| g.members.contains(node))
    }
}

// =============================================================================
// Reference Graph
// =============================================================================

/// Graph of direct references between named struct and union declarations
pub struct ReferenceGraph {
    pub graph: DiGraph<TypeNodeId, EdgeSite>,
    pub indices: HashMap<TypeNodeId, NodeIndex>,
}

impl ReferenceGraph {
    pub fn build(modules: &[GeneratedModule]) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        for module in modules {
            for decl in &module.declarations {
                if matches!(decl, Declaration::Struct(_) | Declaration::Union(_)) {
                    let id = TypeNodeId::new(&module.module_name, decl.name());
                    let index = graph.add_node(id.clone());
                    indices.insert(id, index);
                }
            }
        }

        for module in modules {
            for decl in &module.declarations {
                let from = TypeNodeId::new(&module.module_name, decl.name());
                let Some(&from_index) = indices.get(&from) else {
                    continue;
                };
                for (site, ty) in direct_references(decl) {
                    let to = TypeNodeId::of(ty, &module.module_name);
                    if let Some(&to_index) = indices.get(&to) {
                        graph.add_edge(from_index, to_index, site);
                    }
                }
            }
        }

        Self { graph, indices }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Export the reference graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph LexiconTypes {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        let mut nodes: Vec<&TypeNodeId> = self.indices.keys().collect();
        nodes.sort();
        for id in nodes {
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}\", fillcolor=\"#E3F2FD\"];\n",
                id, id.name, id.module
            ));
        }

        output.push('\n');

        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].to_string(),
                    self.graph[edge.target()].to_string(),
                )
            })
            .collect();
        edges.sort();
        edges.dedup();
        for (from, to) in edges {
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
        }

        output.push_str("}\n");
        output
    }
}

/// Named types a declaration mentions directly, without array indirection
fn direct_references(decl: &Declaration) -> Vec<(EdgeSite, &TypeName)> {
    match decl {
        Declaration::Struct(s) => s
            .fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match &f.ty {
                TypeExpr::Named(name) => Some((EdgeSite::Field(i), name)),
                _ => None,
            })
            .collect(),
        Declaration::Union(u) => u
            .variants
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match &v.ty {
                TypeExpr::Named(name) => Some((EdgeSite::Variant(i), name)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Compute SCCs over all modules and set `boxed` on every cycle-closing
/// field and variant
pub fn mark_boxed_fields(modules: &mut [GeneratedModule]) -> CycleAnalysis {
    let reference_graph = ReferenceGraph::build(modules);
    let graph = &reference_graph.graph;

    let mut scc_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut analysis = CycleAnalysis::default();

    for scc in kosaraju_scc(graph) {
        let is_self_referential = scc.len() == 1
            && graph
                .edges(scc[0])
                .any(|e| e.target() == scc[0]);
        if scc.len() == 1 && !is_self_referential {
            continue;
        }

        let id = analysis.groups.len();
        let mut members: Vec<TypeNodeId> = scc.iter().map(|&i| graph[i].clone()).collect();
        members.sort();
        for &index in &scc {
            scc_of.insert(index, id);
        }
        analysis.groups.push(SccGroup {
            id,
            members,
            is_self_referential,
        });
    }

    for edge in graph.edge_references() {
        let (Some(&from_scc), Some(&to_scc)) = (scc_of.get(&edge.source()), scc_of.get(&edge.target())) else {
            continue;
        };
        if from_scc == to_scc {
            analysis.boxed_edges.push(BoxedEdge {
                from: graph[edge.source()].clone(),
                site: *edge.weight(),
                to: graph[edge.target()].clone(),
                scc_id: from_scc,
            });
        }
    }

    for module in modules.iter_mut() {
        for decl in module.declarations.iter_mut() {
            let owner = TypeNodeId::new(&module.module_name, decl.name());
            for edge in analysis.boxed_edges.iter().filter(|e| e.from == owner) {
                match (&mut *decl, edge.site) {
                    (Declaration::Struct(s), EdgeSite::Field(i)) => {
                        if let Some(field) = s.fields.get_mut(i) {
                            field.boxed = true;
                        }
                    }
                    (Declaration::Union(u), EdgeSite::Variant(i)) => {
                        if let Some(variant) = u.variants.get_mut(i) {
                            variant.boxed = true;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::decl::{FieldDecl, StructDecl, UnionDecl, UnionVariant};

    fn field(name: &str, ty: TypeExpr) -> FieldDecl {
        FieldDecl {
            name: name.into(),
            wire_name: name.into(),
            ty,
            optional: true,
            boxed: false,
            description: None,
        }
    }

    fn strukt(name: &str, fields: Vec<FieldDecl>) -> Declaration {
        Declaration::Struct(StructDecl {
            name: name.into(),
            key: name.into(),
            description: None,
            fields,
            record: None,
            type_tag: None,
            preserves_unknown_fields: true,
        })
    }

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named(TypeName::bare(name))
    }

    fn module(declarations: Vec<Declaration>) -> GeneratedModule {
        GeneratedModule {
            prefix: "com.example".into(),
            module_name: "comexampletypes".into(),
            declarations,
        }
    }

    #[test]
    fn test_self_reference_is_boxed_but_array_is_not() {
        let mut modules = vec![module(vec![strukt(
            "Node",
            vec![
                field("parent", named("Node")),
                field("children", TypeExpr::Array(Box::new(named("Node")))),
            ],
        )])];

        let analysis = mark_boxed_fields(&mut modules);
        assert_eq!(analysis.groups.len(), 1);
        assert!(analysis.groups[0].is_self_referential);

        let node = modules[0].declarations[0].as_struct().unwrap();
        assert!(node.field("parent").unwrap().boxed);
        assert!(!node.field("children").unwrap().boxed);
    }

    #[test]
    fn test_mutual_recursion_through_union() {
        let mut modules = vec![module(vec![
            strukt("Post", vec![field("embed", named("Embed")), field("tag", named("Tag"))]),
            Declaration::Union(UnionDecl {
                name: "Embed".into(),
                key: "Embed".into(),
                description: None,
                variants: vec![UnionVariant {
                    case_name: "post".into(),
                    type_id: "com.example.post".into(),
                    ty: named("Post"),
                    boxed: false,
                }],
                catch_all: "unknown".into(),
                closed: false,
                tag_field: "$type".into(),
            }),
            strukt("Tag", vec![]),
        ])];

        let analysis = mark_boxed_fields(&mut modules);
        assert_eq!(analysis.groups.len(), 1);
        assert_eq!(analysis.groups[0].members.len(), 2);
        assert!(!analysis.is_cyclic(&TypeNodeId::new("comexampletypes", "Tag")));

        let post = modules[0].declarations[0].as_struct().unwrap();
        assert!(post.field("embed").unwrap().boxed);
        assert!(!post.field("tag").unwrap().boxed);
        assert!(modules[0].declarations[1].as_union().unwrap().variants[0].boxed);
    }

    #[test]
    fn test_qualified_names_cross_modules() {
        let mut a = module(vec![strukt(
            "A",
            vec![field("b", TypeExpr::Named(TypeName::qualified("orgtypes", "B")))],
        )]);
        a.module_name = "comtypes".into();
        let mut b = module(vec![strukt(
            "B",
            vec![field("a", TypeExpr::Named(TypeName::qualified("comtypes", "A")))],
        )]);
        b.module_name = "orgtypes".into();

        let mut modules = vec![a, b];
        let analysis = mark_boxed_fields(&mut modules);
        assert_eq!(analysis.boxed_edges.len(), 2);

        let dot = ReferenceGraph::build(&modules).to_dot();
        assert!(dot.contains("\"comtypes.A\" -> \"orgtypes.B\""));
    }
}
