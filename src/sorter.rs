//! Dependency sorter: deterministic execution order for a transform's generators.
//!
//! Generators form a forest: a generator without dependency hangs off the
//! root, every other generator hangs off the generator it depends on. The
//! execution order is the pre-order flattening of that forest with siblings
//! visited by name, so a dependency always runs before its dependents and
//! unrelated generators run in name order.

use crate::error::EngineError;
use crate::generator::{Dependency, Generator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

/// What to do with a dependency naming a generator that is not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyPolicy {
    /// Fail with `UnknownDependency`
    #[default]
    Strict,
    /// Treat the generator as having no dependency
    Promote,
}

/// Order `generators` so every dependency runs before its dependents
///
/// Generators caught in a cycle (or depending on one) can never be reached
/// from the root; they are reported as `DependencyCycle` before anything runs.
pub fn sort_generators(
    generators: Vec<Arc<Generator>>,
    policy: DependencyPolicy,
) -> Result<Vec<Arc<Generator>>, EngineError> {
    let mut by_name: BTreeMap<String, Arc<Generator>> = generators
        .into_iter()
        .map(|generator| (generator.short_name().to_string(), generator))
        .collect();

    // None is the root of the forest; vectors fill in name order
    let mut dependents: BTreeMap<Option<String>, Vec<String>> = BTreeMap::new();
    for (name, generator) in &by_name {
        let parent = match generator.depends() {
            Dependency::Root => None,
            Dependency::On(depends) if by_name.contains_key(depends) => Some(depends.clone()),
            Dependency::On(depends) => match policy {
                DependencyPolicy::Strict => {
                    return Err(EngineError::UnknownDependency {
                        generator: generator.name().to_string(),
                        depends: depends.clone(),
                    });
                }
                DependencyPolicy::Promote => {
                    warn!(
                        generator = generator.name(),
                        depends = %depends,
                        "Unknown dependency, promoting generator to root"
                    );
                    None
                }
            },
        };
        dependents.entry(parent).or_default().push(name.clone());
    }

    let mut order: Vec<String> = Vec::with_capacity(by_name.len());
    let mut stack: Vec<String> = dependents
        .get(&None)
        .map(|roots| roots.iter().rev().cloned().collect())
        .unwrap_or_default();
    while let Some(name) = stack.pop() {
        if let Some(children) = dependents.get(&Some(name.clone())) {
            stack.extend(children.iter().rev().cloned());
        }
        order.push(name);
    }

    if order.len() != by_name.len() {
        let reached: BTreeSet<&String> = order.iter().collect();
        let stranded: Vec<String> = by_name
            .values()
            .filter(|generator| !reached.contains(&generator.short_name().to_string()))
            .map(|generator| generator.name().to_string())
            .collect();
        return Err(EngineError::DependencyCycle(stranded));
    }

    Ok(order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect())
}
