//! Codegen Configuration
//!
//! Naming knobs for the synthesized declarations. Flattening and resolution
//! are config-free; only module names and the fixed case names a backend sees
//! come from here.

use serde::{Deserialize, Serialize};

/// Global codegen configuration (`[codegen]` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Appended to the dot-less group prefix to form a module name
    pub module_suffix: String,

    /// Case name of the forward-compatible union variant
    pub catch_all_case: String,

    /// Case name of the unrecognized-error variant of every error type
    pub unexpected_error_case: String,

    /// Wire key carrying a union member's or record's type id
    pub type_tag_field: String,
}

fn default_module_suffix() -> String {
    "types".to_string()
}

fn default_catch_all_case() -> String {
    "unknown".to_string()
}

fn default_unexpected_error_case() -> String {
    "unexpected".to_string()
}

fn default_type_tag_field() -> String {
    "$type".to_string()
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            module_suffix: default_module_suffix(),
            catch_all_case: default_catch_all_case(),
            unexpected_error_case: default_unexpected_error_case(),
            type_tag_field: default_type_tag_field(),
        }
    }
}

impl CodegenConfig {
    pub fn module_name_for(&self, prefix: &str) -> String {
        super::names::module_name_for(prefix, &self.module_suffix)
    }
}
