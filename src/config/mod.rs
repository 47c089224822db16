//! Configuration
//!
//! [`IndexerConfig`] is the raw, serde-facing configuration. It is layered by
//! [`ConfigLoader`] (defaults, global file, explicit file, environment), adjusted by
//! CLI flags, then validated once into a [`ResolvedConfig`] before any traversal.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;

use crate::error::ConfigError;
use crate::extractor::{DEFAULT_IGNORED_KEYS, DEFAULT_PROGRAM, DEFAULT_TIMEOUT_MS};
use crate::logging::LoggingConfig;
use crate::sidecar::{default_rules, RuleTable, SidecarClassifier, SidecarRule};
use crate::sink::{DIRECTORY_META_SUFFIX, FILE_META_SUFFIX};
use crate::tree::hasher::IdentityEngine;
use crate::tree::walker::{Exclusions, WalkerConfig};
use crate::types::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "FSDEX";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Algorithm whose digest becomes the identity string.
    pub primary: HashAlgorithm,
    /// Optional algorithms computed alongside the mandatory ones.
    pub extra: Vec<HashAlgorithm>,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            primary: HashAlgorithm::Sha256,
            extra: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Exact names, compared case-insensitively.
    pub names: Vec<String>,
    /// Glob patterns, matched case-insensitively against the name.
    pub globs: Vec<String>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            names: [
                ".DS_Store",
                "Thumbs.db",
                "desktop.ini",
                ".Spotlight-V100",
                ".Trashes",
                "$RECYCLE.BIN",
                "System Volume Information",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            globs: vec!["*meta.json.tmp".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Fold sidecars into the entry they describe.
    pub merge: bool,
    /// Remove merged sidecars after the output is written.
    pub delete: bool,
    /// Globs for siblings never treated as sidecars.
    pub exclude: Vec<String>,
    pub rules: Vec<SidecarRule>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            merge: false,
            delete: false,
            exclude: Vec::new(),
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub enabled: bool,
    pub program: String,
    pub timeout_ms: u64,
    /// Extensions never handed to the extractor.
    pub excluded_extensions: Vec<String>,
    /// Keys removed from extractor output; `*` wildcards allowed.
    pub ignored_keys: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_PROGRAM.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            excluded_extensions: ["json", "yaml", "yml", "txt", "md", "srt", "vtt", "nfo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_keys: DEFAULT_IGNORED_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pretty: bool,
    /// Write `<name>_meta.json` next to every item instead of one tree.
    pub inplace: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            inplace: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Rename indexed files to `<_id><.ext>` after output is written.
    pub enabled: bool,
    pub dry_run: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub recursive: bool,
    pub hashing: HashingConfig,
    pub exclusions: ExclusionConfig,
    pub sidecar: SidecarConfig,
    pub extractor: ExtractorConfig,
    pub output: OutputConfig,
    pub rename: RenameConfig,
    pub logging: LoggingConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            hashing: HashingConfig::default(),
            exclusions: ExclusionConfig::default(),
            sidecar: SidecarConfig::default(),
            extractor: ExtractorConfig::default(),
            output: OutputConfig::default(),
            rename: RenameConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Validated configuration with compiled filters and rules.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub engine: IdentityEngine,
    pub walker: WalkerConfig,
    /// Present when sidecar merging is enabled.
    pub sidecars: Option<SidecarClassifier>,
    pub extractor: ExtractorConfig,
    pub output: OutputConfig,
    pub rename: RenameConfig,
}

impl IndexerConfig {
    /// Check every section and compile what needs compiling.
    pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
        let engine = IdentityEngine::new(self.hashing.primary, &self.hashing.extra)?;
        let mut globs = self.exclusions.globs.clone();
        if self.output.inplace && !self.sidecar.merge {
            // Records from earlier in-place runs are neither items nor sidecars.
            globs.push(format!("*{}", FILE_META_SUFFIX));
            globs.push(format!("*{}", DIRECTORY_META_SUFFIX));
        }
        let exclusions = Exclusions::new(&self.exclusions.names, &globs)?;

        if self.sidecar.delete && !self.sidecar.merge {
            return Err(ConfigError::Invalid(
                "sidecar.delete requires sidecar.merge".to_string(),
            ));
        }
        let rules = RuleTable::new(self.sidecar.rules.clone())?;
        let classifier = SidecarClassifier::new(rules, &self.sidecar.exclude)?
            .with_delete(self.sidecar.delete);

        if self.extractor.enabled {
            if self.extractor.program.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "extractor.program must not be empty".to_string(),
                ));
            }
            if self.extractor.timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "extractor.timeout_ms must be greater than zero".to_string(),
                ));
            }
        }

        if self.rename.dry_run && !self.rename.enabled {
            return Err(ConfigError::Invalid(
                "rename.dry_run requires rename.enabled".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            engine,
            walker: WalkerConfig {
                exclusions,
                recursive: self.recursive,
            },
            sidecars: self.sidecar.merge.then_some(classifier),
            extractor: self.extractor.clone(),
            output: self.output.clone(),
            rename: self.rename.clone(),
        })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
