//! CLI route: single route table and run context.

use crate::cli::output::{format_info, format_plan, format_run_summary};
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, EngineConfig};
use crate::controller::Controller;
use crate::error::EngineError;
use crate::flavour::mirror;
use crate::processor::Processor;
use crate::registry::Registry;
use crate::store::SledIdentityStore;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Runtime context for CLI execution: configuration and the populated registry
pub struct RunContext {
    config: EngineConfig,
    registry: Registry,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Load and validate configuration, then register the built-in flavour
    /// and every declared generator and scope
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, EngineError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: EngineConfig) -> Result<Self, EngineError> {
        if let Err(errors) = config.validate() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(EngineError::ConfigError(messages.join("; ")));
        }

        let mut registry = Registry::new();
        mirror::register(&mut registry)?;
        config.apply(&mut registry)?;

        Ok(Self {
            config,
            registry,
            workspace_root,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a command and return its printable output
    pub fn execute(&self, command: &Commands) -> Result<String, EngineError> {
        let start = Instant::now();
        let output = match command {
            Commands::Run { sources, output } => self.handle_run(sources, output),
            Commands::Plan => self.handle_plan(),
            Commands::Info => Ok(format_info(
                env!("CARGO_PKG_VERSION"),
                &self.registry.transforms().names(),
                &self.config.chain.transforms,
            )),
        }?;
        info!(duration_ms = start.elapsed().as_millis(), "Command finished");
        Ok(output)
    }

    fn handle_run(&self, sources: &[PathBuf], output: &Path) -> Result<String, EngineError> {
        let mut controller = Controller::new(&self.registry, self.config.chain.transforms.iter().cloned())
            .with_policy(self.config.chain.dependency_policy);

        if let Some(path) = self.config.identity_path(&self.workspace_root) {
            std::fs::create_dir_all(&path)?;
            controller = controller.with_identity_store(Box::new(SledIdentityStore::new(&path)?));
        }

        let tree = controller.run(sources, output)?;
        Ok(format_run_summary(&tree, output))
    }

    fn handle_plan(&self) -> Result<String, EngineError> {
        let mut sections = Vec::new();
        for transform in &self.config.chain.transforms {
            let generators = Processor::new(&self.registry, transform.as_str())
                .with_policy(self.config.chain.dependency_policy)
                .lookup_generators()?;
            sections.push(format_plan(transform, &generators));
        }
        Ok(sections.join("\n\n"))
    }
}
