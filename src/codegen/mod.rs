//! Code Generation
//!
//! Turns a loaded lexicon corpus into per-group abstract declarations.
//!
//! Architecture:
//! - CodegenContext: immutable after build(); holds the global def table,
//!   the namespace groups and the flattened table
//! - GroupSynthesizer: one per namespace-prefix group, run in parallel
//! - Backends: consume `GeneratedModule` declarations, never raw lexicon JSON
//!
//! The def table is complete before any reference is resolved, and nothing
//! is returned once a fatal error has been seen.

pub mod config;
pub mod decl;
pub mod names;
pub mod synth;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub use config::CodegenConfig;
pub use decl::Declaration;
pub use synth::GroupSynthesizer;

use crate::checksum::Checksum;
use crate::error::{LexiconError, Result};
use crate::graph::{
    flatten, load_from_directory, mark_boxed_fields, CycleAnalysis, DefEntry, Diagnostics,
    ExtDefMap, FlatTable, LoadConfig, LoadedCorpus, NamespaceGroups, ReferenceGraph, Resolver,
};
use crate::schema::LexiconDocument;

// =============================================================================
// Output
// =============================================================================

/// Declarations of one namespace-prefix group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModule {
    pub prefix: String,
    pub module_name: String,
    pub declarations: Vec<Declaration>,
}

impl GeneratedModule {
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name() == name)
    }
}

/// Result of a full generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedOutput {
    pub modules: Vec<GeneratedModule>,
    /// Checksum of the lexicon corpus the output was generated from
    pub checksum: Checksum,
    /// Non-fatal findings (warnings only; errors reject the run)
    pub diagnostics: Diagnostics,
    pub cycles: CycleAnalysis,
}

impl GeneratedOutput {
    pub fn module(&self, prefix: &str) -> Option<&GeneratedModule> {
        self.modules.iter().find(|m| m.prefix == prefix)
    }

    pub fn declaration_count(&self) -> usize {
        self.modules.iter().map(|m| m.declarations.len()).sum()
    }
}

// =============================================================================
// CodegenContext
// =============================================================================

/// Immutable codegen context, frozen after build().
pub struct CodegenContext<'c> {
    config: &'c CodegenConfig,
    groups: NamespaceGroups,
    defs: ExtDefMap,
    flat: FlatTable,
    /// Diagnostics collected while flattening
    diagnostics: Diagnostics,
}

impl<'c> CodegenContext<'c> {
    /// Build the global def table and flatten it.
    pub fn build(documents: &[LexiconDocument], config: &'c CodegenConfig) -> Result<Self> {
        let groups = NamespaceGroups::compute(documents.iter().map(|d| d.id.as_str()));
        let defs = ExtDefMap::build(documents, &groups);
        let (flat, diagnostics) = flatten(&defs)?;

        info!(
            documents = documents.len(),
            groups = groups.prefixes().len(),
            defs = defs.len(),
            flattened = flat.len(),
            "Built codegen context"
        );

        Ok(Self {
            config,
            groups,
            defs,
            flat,
            diagnostics,
        })
    }

    pub fn groups(&self) -> &NamespaceGroups {
        &self.groups
    }

    pub fn defs(&self) -> &ExtDefMap {
        &self.defs
    }

    pub fn flat(&self) -> &FlatTable {
        &self.flat
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Queries and procedures owned by a group, in key order
    fn rpc_entries<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a DefEntry> + 'a {
        self.defs
            .iter()
            .map(|(_, entry)| entry)
            .filter(move |entry| {
                entry.context.namespace_prefix == prefix && entry.node.rpc_shape().is_some()
            })
    }

    /// Synthesize every group, then mark cycle-closing fields as boxed.
    ///
    /// Groups are independent once the def table exists and run in parallel.
    /// Any error diagnostic rejects the whole run.
    pub fn synthesize(&self) -> Result<(Vec<GeneratedModule>, Diagnostics, CycleAnalysis)> {
        let resolver = Resolver::new(&self.defs, self.config);
        let prefixes: Vec<&str> = self.groups.prefixes().into_iter().collect();

        let results = prefixes
            .par_iter()
            .map(|&prefix| -> Result<(GeneratedModule, Diagnostics)> {
                let flat = self.flat.group(prefix).into_iter().flat_map(|group| group.values());
                let (declarations, diagnostics) =
                    GroupSynthesizer::new(prefix, &resolver, self.config).run(flat, self.rpc_entries(prefix))?;
                Ok((
                    GeneratedModule {
                        prefix: prefix.to_string(),
                        module_name: self.config.module_name_for(prefix),
                        declarations,
                    },
                    diagnostics,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut diagnostics = self.diagnostics.clone();
        let mut modules = Vec::with_capacity(results.len());
        for (module, group_diagnostics) in results {
            diagnostics.merge(group_diagnostics);
            modules.push(module);
        }
        diagnostics.sort();

        if diagnostics.has_errors() {
            return Err(LexiconError::Rejected(diagnostics));
        }

        let cycles = mark_boxed_fields(&mut modules);
        info!(
            modules = modules.len(),
            cycles = cycles.groups.len(),
            boxed = cycles.boxed_edges.len(),
            warnings = diagnostics.warning_count(),
            "Synthesized declarations"
        );
        Ok((modules, diagnostics, cycles))
    }

    /// Export the named-type reference graph to GraphViz DOT format
    pub fn to_dot(&self) -> Result<String> {
        let (modules, _, _) = self.synthesize()?;
        Ok(ReferenceGraph::build(&modules).to_dot())
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Run the whole pipeline over a loaded corpus
pub fn generate(corpus: &LoadedCorpus, config: &CodegenConfig) -> Result<GeneratedOutput> {
    let context = CodegenContext::build(&corpus.documents, config)?;
    let (modules, diagnostics, cycles) = context.synthesize()?;
    Ok(GeneratedOutput {
        modules,
        checksum: corpus.checksum.clone(),
        diagnostics,
        cycles,
    })
}

/// Load a lexicon directory and run the pipeline over it
pub fn generate_from_directory(
    root: &Path,
    load_config: &LoadConfig,
    config: &CodegenConfig,
) -> Result<GeneratedOutput> {
    let corpus = load_from_directory(root, load_config)?;
    generate(&corpus, config)
}
