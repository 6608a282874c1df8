//! Error types for lexicon code generation

use thiserror::Error;

use crate::graph::Diagnostics;

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, LexiconError>;

/// Generator errors.
///
/// Every variant is fatal for a generation run: nothing is written once one of
/// these has been returned.
#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Invalid lexicon document {source_name}: {message}")]
    SchemaParse { source_name: String, message: String },

    #[error("Unresolved reference '{reference}' in {owning_id}#{def_name}")]
    UnresolvedReference {
        owning_id: String,
        def_name: String,
        reference: String,
    },

    #[error("Reference '{reference}' in {owning_id}#{def_name} points at a {kind} definition, which is not a data type")]
    NotADataType {
        owning_id: String,
        def_name: String,
        reference: String,
        kind: String,
    },

    #[error("Naming collision in group '{group}': '{name}' is produced by both {first} and {second}")]
    NamingCollision {
        group: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("Duplicate lexicon document: {id}")]
    DuplicateDocument { id: String },

    #[error("Generation rejected with {} error(s)", .0.error_count())]
    Rejected(Diagnostics),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl LexiconError {
    /// Build a parse error for a named source (file path or document id)
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaParse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
