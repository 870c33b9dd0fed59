//! Merge rules: defaults underneath every other source.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with the engine defaults applied
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("chain.transforms", vec!["fs"])?
        .set_default("chain.dependency_policy", "strict")?
        .set_default("logging.level", "info")
}
