//! Base layer: built-in defaults serialized into a `config` source.

use crate::config::IndexerConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder whose lowest layer is [`IndexerConfig::default`].
///
/// Later layers replace arrays as a whole and merge tables key by key.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&IndexerConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
