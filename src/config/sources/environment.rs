//! Environment variable source: FSDEX_* prefix with __ separator

use crate::config::ENV_PREFIX;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// `FSDEX_SIDECAR__MERGE=true` sets `sidecar.merge`; list values are comma separated.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("hashing.extra")
            .with_list_parse_key("exclusions.names")
            .with_list_parse_key("exclusions.globs")
            .with_list_parse_key("sidecar.exclude")
            .with_list_parse_key("extractor.excluded_extensions")
            .try_parsing(true),
    );
    Ok(builder)
}
