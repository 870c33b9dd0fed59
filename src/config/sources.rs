//! Configuration sources: workspace file and environment.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the workspace configuration file
pub const WORKSPACE_FILE: &str = "treegen.toml";

/// Prefix of environment overrides, e.g. `TREEGEN__CHAIN__DEPENDENCY_POLICY`
pub const ENV_PREFIX: &str = "TREEGEN";

pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(WORKSPACE_FILE)
}

/// Add `<workspace>/treegen.toml` to the builder if it exists
pub fn add_workspace_file(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let path = workspace_config_path(workspace_root);
    if path.exists() {
        debug!(config_path = %path.display(), "Loading workspace configuration");
        builder.add_source(File::from(path.as_path()).required(false))
    } else {
        builder
    }
}

/// Add an explicitly named configuration file; it must exist
pub fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    Ok(builder.add_source(File::from(path).required(true)))
}

/// Add `TREEGEN__SECTION__KEY` overrides
///
/// `vars` replaces the process environment when given.
pub fn add_environment(
    builder: ConfigBuilder<DefaultState>,
    vars: Option<HashMap<String, String>>,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("chain.transforms")
            .try_parsing(true)
            .source(vars),
    )
}
