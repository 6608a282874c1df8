//! Lexicon Loading
//!
//! Discovers `*.json` lexicon files under a directory, parses them in
//! parallel, and computes a checksum of the whole corpus.
//!
//! Parsing is independent per file. The join at the end of the parallel
//! parse is the barrier before any flattening or resolution starts.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::checksum::{Checksum, CorpusHasher};
use crate::error::{LexiconError, Result};
use crate::schema::LexiconDocument;

/// Configuration for lexicon loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip files whose path relative to the root starts with one of these
    pub skip_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                ".git/".to_string(),
                "node_modules/".to_string(),
            ],
        }
    }
}

/// One lexicon source: a display name (relative path) and its raw content
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Every document of a corpus, ordered by source name
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub documents: Vec<LexiconDocument>,
    pub checksum: Checksum,
    /// Source name of each document, same order as `documents`
    pub sources: Vec<String>,
}

impl LoadedCorpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn source_of(&self, id: &str) -> Option<&str> {
        self.documents
            .iter()
            .position(|doc| doc.id == id)
            .map(|i| self.sources[i].as_str())
    }
}

/// Load every lexicon file under `root`
pub fn load_from_directory(root: &Path, config: &LoadConfig) -> Result<LoadedCorpus> {
    let mut paths: Vec<(String, PathBuf)> = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p)) {
            debug!(file = %relative_str, "Skipping lexicon file");
            continue;
        }
        paths.push((relative_str, path.to_path_buf()));
    }
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    let sources = paths
        .par_iter()
        .map(|(name, path)| -> Result<SourceFile> {
            Ok(SourceFile::new(name.clone(), fs::read_to_string(path)?))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(root = %root.display(), files = sources.len(), "Discovered lexicon files");
    load_from_sources(sources)
}

/// Parse in-memory sources. Order of the result follows source name order.
pub fn load_from_sources(mut sources: Vec<SourceFile>) -> Result<LoadedCorpus> {
    sources.sort_by(|a, b| a.name.cmp(&b.name));

    let documents = sources
        .par_iter()
        .map(|source| LexiconDocument::from_json_str(&source.name, &source.content))
        .collect::<Result<Vec<_>>>()?;

    let mut hasher = CorpusHasher::new();
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (source, doc) in sources.iter().zip(&documents) {
        if seen.insert(doc.id.as_str(), source.name.as_str()).is_some() {
            return Err(LexiconError::DuplicateDocument { id: doc.id.clone() });
        }
        hasher.add(&source.name, &source.content);
        debug!(id = %doc.id, source = %source.name, defs = doc.defs.len(), "Parsed lexicon");
    }

    Ok(LoadedCorpus {
        checksum: hasher.finish(),
        sources: sources.into_iter().map(|s| s.name).collect(),
        documents,
    })
}
