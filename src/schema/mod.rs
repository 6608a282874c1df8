//! Lexicon Documents
//!
//! One parsed schema file: an NSID plus its named definitions. Parsing is
//! structural only; nothing here looks at other documents.

pub mod node;

pub use node::{
    ArrayNode, BlobNode, BooleanNode, BytesNode, CidLinkNode, IntegerNode, MessageNode, NodeKind,
    NullNode, ObjectNode, ParamsNode, PermissionNode, PermissionSetNode, ProcedureNode, QueryNode,
    RecordNode, RefNode, RpcBody, RpcErrorDef, RpcShape, StringNode, SubscriptionNode, TokenNode,
    TypeNode, UnionNode, UnknownNode, Vocabulary,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{LexiconError, Result};

/// Name of the canonical definition of a document
pub const MAIN_DEF: &str = "main";

const NSID_PATTERN: &str = r"^[a-zA-Z]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+\.[a-zA-Z][a-zA-Z0-9]{0,62}$";

fn nsid_regex() -> &'static Regex {
    static NSID: OnceLock<Regex> = OnceLock::new();
    NSID.get_or_init(|| Regex::new(NSID_PATTERN).unwrap())
}

/// Whether `id` is a well-formed NSID (at least three dotted segments)
pub fn is_valid_nsid(id: &str) -> bool {
    nsid_regex().is_match(id)
}

/// A parsed lexicon document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconDocument {
    pub lexicon: u32,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub defs: BTreeMap<String, TypeNode>,
}

/// Field-by-field view used to report which required key is missing
#[derive(Deserialize)]
struct RawDocument {
    lexicon: Option<u32>,
    id: Option<String>,
    revision: Option<u32>,
    description: Option<String>,
    defs: Option<BTreeMap<String, serde_json::Value>>,
}

impl LexiconDocument {
    /// Parse a document from JSON text.
    ///
    /// `source_name` is what parse errors report: a file path when loading
    /// from disk, anything descriptive otherwise.
    pub fn from_json_str(source_name: &str, content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| LexiconError::parse(source_name, format!("invalid JSON: {}", e)))?;
        Self::from_value(source_name, value)
    }

    pub fn from_value(source_name: &str, value: serde_json::Value) -> Result<Self> {
        let raw: RawDocument = serde_json::from_value(value)
            .map_err(|e| LexiconError::parse(source_name, e.to_string()))?;

        let lexicon = raw
            .lexicon
            .ok_or_else(|| LexiconError::parse(source_name, "missing 'lexicon' version field"))?;
        let id = raw
            .id
            .ok_or_else(|| LexiconError::parse(source_name, "missing 'id' field"))?;
        if !is_valid_nsid(&id) {
            return Err(LexiconError::parse(source_name, format!("'{}' is not a valid NSID", id)));
        }
        let raw_defs = raw
            .defs
            .ok_or_else(|| LexiconError::parse(source_name, format!("{}: missing 'defs' field", id)))?;

        let mut defs = BTreeMap::new();
        for (name, def) in raw_defs {
            let node: TypeNode = serde_json::from_value(def).map_err(|e| {
                LexiconError::parse(source_name, format!("{}#{}: {}", id, name, e))
            })?;
            defs.insert(name, node);
        }

        Ok(Self {
            lexicon,
            id,
            revision: raw.revision,
            description: raw.description,
            defs,
        })
    }

    pub fn def(&self, name: &str) -> Option<&TypeNode> {
        self.defs.get(name)
    }

    pub fn main(&self) -> Option<&TypeNode> {
        self.def(MAIN_DEF)
    }
}
