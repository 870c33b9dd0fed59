//! Configuration System
//!
//! Declarative engine configuration: the transform chain, generator and
//! scope declarations, identity persistence and logging. Loaded in layers
//! (defaults, then `treegen.toml`, then `TREEGEN__SECTION__KEY` environment
//! overrides) and applied onto a [`Registry`] before a run.

use crate::error::EngineError;
use crate::generator::{Dependency, Generator};
use crate::logging::LoggingConfig;
use crate::registry::Registry;
use crate::scope::Scope;
use crate::sorter::DependencyPolicy;
use crate::target::{AnchorPolicy, NullAnchor, TreeSync};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod merge;
mod sources;

pub use sources::{workspace_config_path, WORKSPACE_FILE};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub chain: ChainConfig,

    /// Generators declared without code; handlers still come from code
    #[serde(default)]
    pub generators: Vec<GeneratorDecl>,

    #[serde(default)]
    pub scopes: Vec<ScopeDecl>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The transform chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Transform names, run in this order
    #[serde(default = "default_transforms")]
    pub transforms: Vec<String>,

    #[serde(default)]
    pub dependency_policy: DependencyPolicy,
}

fn default_transforms() -> Vec<String> {
    vec!["fs".to_string()]
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            transforms: default_transforms(),
            dependency_policy: DependencyPolicy::default(),
        }
    }
}

/// A generator registered from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorDecl {
    pub transform: String,
    pub name: String,

    /// Bare name of the generator to run first; absent or "none" for none
    #[serde(default)]
    pub depends: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub backup: bool,

    /// Target handler strategy: "null" or "sync"
    #[serde(default = "default_anchor")]
    pub anchor: String,
}

fn default_anchor() -> String {
    "null".to_string()
}

/// A scope registered from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeDecl {
    pub transform: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Identity map persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sled database directory; no persistence when absent
    #[serde(default)]
    pub identity_path: Option<PathBuf>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Chain(String),
    Generator(String, String),
    Scope(String, String),
    Store(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Chain(msg) => write!(f, "Chain: {}", msg),
            ValidationError::Generator(name, msg) => write!(f, "Generator '{}': {}", name, msg),
            ValidationError::Scope(name, msg) => write!(f, "Scope '{}': {}", name, msg),
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Resolve a target handler strategy by its configured name
pub fn anchor_policy(name: &str) -> Option<Arc<dyn AnchorPolicy>> {
    match name {
        "null" => Some(Arc::new(NullAnchor)),
        "sync" => Some(Arc::new(TreeSync)),
        _ => None,
    }
}

fn check_segment(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", what))
    } else if value.contains('.') {
        Err(format!("{} '{}' cannot contain '.'", what, value))
    } else {
        Ok(())
    }
}

impl GeneratorDecl {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.transform, self.name)
    }

    pub fn validate(&self) -> Result<(), String> {
        check_segment(&self.transform, "Transform name")?;
        check_segment(&self.name, "Generator name")?;
        if anchor_policy(&self.anchor).is_none() {
            return Err(format!(
                "Unknown anchor '{}' (must be 'null' or 'sync')",
                self.anchor
            ));
        }
        if Dependency::parse(self.depends.as_deref()).name() == Some(self.name.as_str()) {
            return Err("Generator cannot depend on itself".to_string());
        }
        Ok(())
    }

    /// Build the generator this declaration describes
    pub fn to_generator(&self) -> Generator {
        Generator::new(
            &self.transform,
            &self.name,
            Dependency::parse(self.depends.as_deref()),
        )
        .with_description(&self.description)
        .with_backup(self.backup)
    }
}

impl ScopeDecl {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.transform, self.name)
    }

    pub fn validate(&self) -> Result<(), String> {
        check_segment(&self.transform, "Transform name")?;
        check_segment(&self.name, "Scope name")?;
        if self.tags.is_empty() {
            return Err("Scope must name at least one tag".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.chain.transforms.is_empty() {
            errors.push(ValidationError::Chain(
                "At least one transform is required".to_string(),
            ));
        }
        for transform in &self.chain.transforms {
            if let Err(e) = check_segment(transform, "Transform name") {
                errors.push(ValidationError::Chain(e));
            }
        }

        let mut generators = HashSet::new();
        for generator in &self.generators {
            let name = generator.qualified_name();
            if let Err(e) = generator.validate() {
                errors.push(ValidationError::Generator(name.clone(), e));
            }
            if !generators.insert(name.clone()) {
                errors.push(ValidationError::Generator(
                    name,
                    "Declared more than once".to_string(),
                ));
            }
        }

        let mut scopes = HashMap::new();
        for (position, scope) in self.scopes.iter().enumerate() {
            let name = scope.qualified_name();
            if let Err(e) = scope.validate() {
                errors.push(ValidationError::Scope(name.clone(), e));
            }
            if let Some(first) = scopes.insert(name.clone(), position) {
                errors.push(ValidationError::Scope(
                    name,
                    format!("Declared more than once (first at position {})", first),
                ));
            }
        }

        if let Some(path) = &self.store.identity_path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::Store(
                    "Identity path cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Register every declared generator and scope
    pub fn apply(&self, registry: &mut Registry) -> Result<(), EngineError> {
        for scope in &self.scopes {
            registry.register_scope(Scope::new(&scope.transform, &scope.name, scope.tags.iter()))?;
        }
        for generator in &self.generators {
            let anchor = anchor_policy(&generator.anchor).ok_or_else(|| {
                EngineError::ConfigError(format!(
                    "Generator '{}': unknown anchor '{}'",
                    generator.qualified_name(),
                    generator.anchor
                ))
            })?;
            registry.register_generator_with(generator.to_generator(), anchor, None)?;
        }
        Ok(())
    }

    /// Identity store directory, resolved against the workspace root
    pub fn identity_path(&self, workspace_root: &Path) -> Option<PathBuf> {
        self.store.identity_path.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                workspace_root.join(path)
            }
        })
    }
}

/// Layered configuration loading
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, `<workspace_root>/treegen.toml` and environment overrides
    pub fn load(workspace_root: &Path) -> Result<EngineConfig, EngineError> {
        Self::load_with_env(workspace_root, None)
    }

    /// Like [`ConfigLoader::load`] with an explicit environment instead of the process one
    pub fn load_with_env(
        workspace_root: &Path,
        env: Option<HashMap<String, String>>,
    ) -> Result<EngineConfig, EngineError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_workspace_file(builder, workspace_root);
        let builder = sources::add_environment(builder, env);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load defaults, the given file (which must exist) and environment overrides
    pub fn load_from_file(path: &Path) -> Result<EngineConfig, EngineError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_file(builder, path)?;
        let builder = sources::add_environment(builder, None);
        Ok(builder.build()?.try_deserialize()?)
    }
}
