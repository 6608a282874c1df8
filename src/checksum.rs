//! Corpus checksums, recorded in the lock file and in generated output

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_content(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental checksum over a whole corpus.
///
/// Each file contributes its relative name and its content, so renaming a
/// file changes the checksum just like editing it does. Feed files in a
/// stable order.
#[derive(Clone, Default)]
pub struct CorpusHasher {
    hasher: Sha256,
}

impl CorpusHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, content: &str) {
        self.hasher.update(name.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(content.as_bytes());
        self.hasher.update([0u8]);
    }

    pub fn finish(self) -> Checksum {
        Checksum(format!("{:x}", self.hasher.finalize()))
    }
}
