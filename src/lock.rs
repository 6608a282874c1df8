//! Lock File
//!
//! Records the revision each configured lexicon source resolved to and the
//! checksum of the corpus the last generation ran over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::checksum::Checksum;
use crate::config::LexiconSource;
use crate::error::Result;
use crate::graph::LoadedCorpus;

/// Default lock file name, next to `lexgen.toml`
pub const LOCK_FILE_NAME: &str = "lexgen.lock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedSource {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Exact revision the tag resolved to
    pub revision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    pub generated_at: DateTime<Utc>,
    pub lexicon_checksum: Checksum,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<LockedSource>,
}

impl LockFile {
    pub fn new(lexicon_checksum: Checksum) -> Self {
        Self {
            generated_at: Utc::now(),
            lexicon_checksum,
            sources: Vec::new(),
        }
    }

    /// Lock a loaded corpus
    pub fn for_corpus(corpus: &LoadedCorpus) -> Self {
        Self::new(corpus.checksum.clone())
    }

    /// Record the revision a source resolved to, replacing an earlier entry
    pub fn lock_source(&mut self, source: &LexiconSource, revision: impl Into<String>) {
        let locked = LockedSource {
            location: source.location.clone(),
            tag: source.tag.clone(),
            revision: revision.into(),
        };
        match self.sources.iter_mut().find(|s| s.location == locked.location) {
            Some(existing) => *existing = locked,
            None => self.sources.push(locked),
        }
    }

    pub fn locked_revision(&self, location: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.location == location)
            .map(|s| s.revision.as_str())
    }

    /// Was the lock written for exactly this corpus?
    pub fn is_current(&self, corpus: &LoadedCorpus) -> bool {
        self.lexicon_checksum == corpus.checksum
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{load_from_sources, SourceFile};
    use std::collections::BTreeMap;

    fn corpus(description: &str) -> LoadedCorpus {
        let content = format!(
            r#"{{"lexicon":1,"id":"com.example.a","description":"{}","defs":{{}}}}"#,
            description
        );
        load_from_sources(vec![SourceFile::new("a.json", content)]).unwrap()
    }

    #[test]
    fn test_lock_tracks_corpus_checksum() {
        let lock = LockFile::for_corpus(&corpus("one"));
        assert!(lock.is_current(&corpus("one")));
        assert!(!lock.is_current(&corpus("two")));
    }

    #[test]
    fn test_lock_source_replaces_revision() {
        let source = LexiconSource {
            location: "https://example.com/lexicons.git".into(),
            tag: Some("v1".into()),
            paths: BTreeMap::new(),
        };
        let mut lock = LockFile::new(Checksum::from_content("x"));
        lock.lock_source(&source, "abc123");
        lock.lock_source(&source, "def456");
        assert_eq!(lock.sources.len(), 1);
        assert_eq!(lock.locked_revision(&source.location), Some("def456"));
        assert_eq!(lock.locked_revision("elsewhere"), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        let mut lock = LockFile::for_corpus(&corpus("one"));
        lock.sources.push(LockedSource {
            location: "../lexicons".into(),
            tag: None,
            revision: "0123".into(),
        });
        lock.save(&path).unwrap();

        let loaded = LockFile::load(&path).unwrap();
        assert_eq!(loaded, lock);
    }
}
