//! MergeService: orchestrates sources, applies merge policy, deserializes to IndexerConfig.

use crate::config::sources::{environment, global_file};
use crate::config::IndexerConfig;
use config::{ConfigError, File, FileFormat};
use std::path::Path;

use super::merge_policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from the standard sources.
    /// Precedence: defaults (lowest) -> global file -> explicit file -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<IndexerConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = match explicit {
            Some(path) => builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(true),
            ),
            None => builder,
        };
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }

    /// Load defaults and one file, without the global file or environment.
    pub fn load_from_file(path: &Path) -> Result<IndexerConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()?
            .try_deserialize()
    }
}
