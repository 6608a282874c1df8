//! Lexicon Code Generator
//!
//! Reads a corpus of lexicon schema documents (records, queries, procedures,
//! subscriptions and the data types they compose), resolves every cross
//! document reference into one flat namespace per namespace-prefix group,
//! and synthesizes language-agnostic type and client-method declarations
//! for a rendering backend.
//!
//! ## Pipeline
//!
//! ```text
//! lexicons/**/*.json
//!   └─ graph::loader      parse (parallel), checksum
//!      └─ ExtDefMap        every def by fully-qualified key
//!         └─ graph::walker    name every nested shape  → FlatTable
//!            └─ codegen::synth   per group (parallel)   → Declarations
//!               └─ graph::analysis  box cycle-closing fields
//! ```
//!
//! The `runtime` module is the contract generated clients bind against:
//! parameter encoding, the fetch routine with session-refresh retry, and the
//! decode rules for unions and enumerations.

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod error;
pub mod graph;
pub mod lock;
pub mod runtime;
pub mod schema;

pub use checksum::Checksum;
pub use codegen::{generate, generate_from_directory, CodegenConfig, CodegenContext, GeneratedModule, GeneratedOutput};
pub use config::GeneratorConfig;
pub use error::{LexiconError, Result};
pub use graph::{load_from_directory, Diagnostics, LoadConfig, LoadedCorpus};
pub use lock::LockFile;
pub use schema::{LexiconDocument, TypeNode};
