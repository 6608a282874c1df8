//! Configuration management for the lexicon generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (lexgen.toml)
//! - Environment variables (LEXGEN__*)
//!
//! ## Example config file (lexgen.toml):
//! ```toml
//! [input]
//! lexicons = "./lexicons"
//! skip_prefixes = [".git/", "node_modules/"]
//!
//! [output]
//! dir = "./generated"
//! format = "pretty"
//!
//! [codegen]
//! module_suffix = "types"
//!
//! [[sources]]
//! location = "https://github.com/example/lexicons.git"
//! tag = "v1.2.0"
//! paths = { "lexicons/com/example" = "com.example" }
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codegen::CodegenConfig;
use crate::error::Result;
use crate::graph::LoadConfig;

/// Main configuration for the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Naming and synthesis settings
    #[serde(default)]
    pub codegen: CodegenConfig,

    /// Remote lexicon repositories, fetched into `input.lexicons` before a run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<LexiconSource>,
}

/// Where lexicon documents are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_lexicons_dir")]
    pub lexicons: PathBuf,

    /// Relative path prefixes to skip while walking the lexicon tree
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

/// Where generated declarations are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Pretty => serde_json::to_string_pretty(value)?,
            Self::Compact => serde_json::to_string(value)?,
        })
    }
}

/// A remote lexicon repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconSource {
    /// Repository location (URL or local path)
    pub location: String,

    /// Pinned tag or revision
    #[serde(default)]
    pub tag: Option<String>,

    /// Path selector inside the repository → namespace prefix it provides
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

impl LexiconSource {
    /// Namespace prefixes this source provides
    pub fn prefixes(&self) -> Vec<&str> {
        self.paths.values().map(String::as_str).collect()
    }
}

// Default value functions
fn default_lexicons_dir() -> PathBuf {
    PathBuf::from("lexicons")
}

fn default_skip_prefixes() -> Vec<String> {
    LoadConfig::default().skip_prefixes
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            lexicons: default_lexicons_dir(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::Pretty,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["lexgen.toml", ".lexgen.toml", "config/lexgen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "lexgen") {
            let xdg_config = config_dir.config_dir().join("lexgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (LEXGEN__OUTPUT__DIR etc.)
        builder = builder.add_source(
            Environment::with_prefix("LEXGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            skip_prefixes: self.input.skip_prefixes.clone(),
        }
    }

    /// Source providing a namespace prefix, if any
    pub fn source_for_prefix(&self, prefix: &str) -> Option<&LexiconSource> {
        self.sources
            .iter()
            .find(|source| source.paths.values().any(|p| p == prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.input.lexicons, PathBuf::from("lexicons"));
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert_eq!(config.codegen.module_suffix, "types");
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_serialize_config() {
        let config = GeneratorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[codegen]"));
    }

    #[test]
    fn test_load_sources_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[output]
format = "compact"

[codegen]
catch_all_case = "other"

[[sources]]
location = "https://example.com/lexicons.git"
tag = "v1"
paths = { "lexicons/com/example" = "com.example" }
"#,
        )
        .unwrap();

        let config = GeneratorConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert_eq!(config.codegen.catch_all_case, "other");
        assert_eq!(config.codegen.module_suffix, "types");
        assert_eq!(
            config.source_for_prefix("com.example").map(|s| s.tag.as_deref()),
            Some(Some("v1"))
        );
    }

    #[test]
    fn test_save_round_trips_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexgen.toml");
        let mut config = GeneratorConfig::default();
        config.sources.push(LexiconSource {
            location: "../lexicons".into(),
            tag: None,
            paths: BTreeMap::from([("com".to_string(), "com.example".to_string())]),
        });
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[[sources]]"));
        let reloaded: GeneratorConfig = toml::from_str(&content).unwrap();
        assert_eq!(reloaded.sources, config.sources);
    }
}
