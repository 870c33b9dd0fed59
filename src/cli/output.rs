//! CLI output: error mapping and plain-text summaries.

use crate::error::EngineError;
use crate::generator::Generator;
use crate::tree::walker::{TAG_DIRECTORY, TAG_FILE};
use crate::tree::Tree;
use std::path::Path;
use std::sync::Arc;

/// Map engine errors to a user-facing message
pub fn map_error(e: &EngineError) -> String {
    match e {
        EngineError::NotRegistered { .. } | EngineError::DuplicateRegistration { .. } => {
            format!("Configuration problem: {}", e)
        }
        _ => e.to_string(),
    }
}

/// One line per materialized tree, plus node counts
pub fn format_run_summary(tree: &Tree, output: &Path) -> String {
    let nodes = tree.pre_order();
    let directories = nodes.iter().filter(|id| tree.has_tag(**id, TAG_DIRECTORY)).count();
    let files = nodes.iter().filter(|id| tree.has_tag(**id, TAG_FILE)).count();
    format!(
        "Generated {} nodes ({} directories, {} files) into {}",
        nodes.len(),
        directories,
        files,
        output.display()
    )
}

/// Version banner with the registered transforms and the active chain
pub fn format_info(version: &str, transforms: &[String], chain: &[String]) -> String {
    let registered = if transforms.is_empty() {
        "(none)".to_string()
    } else {
        transforms.join(", ")
    };
    format!(
        "treegen {}\ntransforms: {}\nchain: {}",
        version,
        registered,
        chain.join(" -> ")
    )
}

/// Execution plan of one transform
pub fn format_plan(transform: &str, generators: &[Arc<Generator>]) -> String {
    let mut lines = vec![format!("{}:", transform)];
    if generators.is_empty() {
        lines.push("  (no generators, target passes through)".to_string());
    }
    for (position, generator) in generators.iter().enumerate() {
        lines.push(format!(
            "  {}. {} (depends: {})",
            position + 1,
            generator.short_name(),
            generator.depends()
        ));
        for line in generator.description().lines() {
            lines.push(format!("       {}", line));
        }
    }
    lines.join("\n")
}
