//! Mirror flavour: the `fs` transform.
//!
//! Three generators, run in dependency order:
//!
//! 1. `directories` (tree-synchronized) recreates every source directory
//!    and binds it to its source node through `finalize`.
//! 2. `files` places each source file into the target directory generated
//!    for its parent, found through the identity map, and lists it in the
//!    `fs.index` token, which starts empty on every run.
//! 3. `index` writes the collected listing to an `INDEX` file at the root.
//!
//! `INDEX` is reserved at the top level: a source file of that name directly
//! below the source root is skipped with a warning.

use crate::error::EngineError;
use crate::flavour::fs::{DirectoryTransform, ATTR_BACKUP, ATTR_CONTENT, ATTR_COPY_FROM};
use crate::generator::{Dependency, Generator};
use crate::handler::{Handler, Rank, Visit};
use crate::registry::Registry;
use crate::scope::Scope;
use crate::target::{NullAnchor, TargetHandler, TreeSync};
use crate::token::{token_name, Fields};
use crate::tree::walker::{ATTR_PATH, TAG_DIRECTORY, TAG_FILE};
use crate::tree::SourceNode;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const TRANSFORM: &str = "fs";
/// Name of the listing file written at the target root
pub const INDEX_FILE: &str = "INDEX";
/// Field of the index token holding the relative file paths
pub const INDEX_FIELD: &str = "files";

/// Name of the token collecting mirrored files
pub fn index_token() -> String {
    token_name(&[TRANSFORM, "index"])
}

/// Register the `fs` transform with its generators, scopes and handlers
pub fn register(registry: &mut Registry) -> Result<(), EngineError> {
    registry.register_transform(Arc::new(DirectoryTransform::new(TRANSFORM)))?;

    registry.register_scope(Scope::new(TRANSFORM, "directory", [TAG_DIRECTORY]))?;
    registry.register_scope(Scope::new(TRANSFORM, "file", [TAG_FILE]))?;

    registry.register_generator_with(
        Generator::new(TRANSFORM, "directories", Dependency::Root)
            .with_description("Recreate every source directory below the output directory"),
        Arc::new(TreeSync),
        None,
    )?;
    registry.register_generator_with(
        Generator::new(TRANSFORM, "files", Dependency::On("directories".to_string()))
            .with_description("Copy every source file into its mirrored directory")
            .with_backup(true),
        Arc::new(NullAnchor),
        None,
    )?;
    registry.register_generator_with(
        Generator::new(TRANSFORM, "index", Dependency::On("files".to_string()))
            .with_description("List the mirrored files in an INDEX file"),
        Arc::new(NullAnchor),
        None,
    )?;

    registry.register_handler(
        Handler::new(TRANSFORM, "directories", "mirror", mirror_directory).scoped("directory"),
    )?;
    registry.register_handler(Handler::new(TRANSFORM, "files", "reset", reset_index))?;
    registry.register_handler(
        Handler::new(TRANSFORM, "files", "place", place_file)
            .scoped("file")
            .ranked(Rank::At(0)),
    )?;
    registry.register_handler(
        Handler::new(TRANSFORM, "files", "record", record_file)
            .scoped("file")
            .ranked(Rank::At(1)),
    )?;
    registry.register_handler(Handler::new(TRANSFORM, "index", "write", write_index))?;

    debug!(transform = TRANSFORM, "Registered mirror flavour");
    Ok(())
}

fn mirror_directory(visit: &Visit<'_>, target: &mut TargetHandler) -> Result<(), EngineError> {
    let node = if visit.source.is_root() {
        target.target().root()
    } else {
        let node = target.add_child(visit.source.name())?;
        target.target_mut().add_tag(node, TAG_DIRECTORY);
        node
    };
    target.finalize(visit.registry, visit.source, node, true)
}

fn is_reserved(source: SourceNode<'_>) -> bool {
    source.name() == INDEX_FILE && source.parent().is_some_and(|parent| parent.is_root())
}

fn empty_index() -> Fields {
    let mut fields = Fields::new();
    fields.insert(INDEX_FIELD.to_string(), Value::Array(Vec::new()));
    fields
}

fn reset_index(visit: &Visit<'_>, _target: &mut TargetHandler) -> Result<(), EngineError> {
    if visit.source.is_root() {
        visit
            .registry
            .tokens()
            .token(&index_token(), true, true, empty_index())?;
    }
    Ok(())
}

fn place_file(visit: &Visit<'_>, target: &mut TargetHandler) -> Result<(), EngineError> {
    if is_reserved(visit.source) {
        warn!(
            path = %visit.source.path().join("/"),
            "Skipping source file, the name is reserved for the generated index"
        );
        return Ok(());
    }
    let parent = visit
        .source
        .parent()
        .ok_or_else(|| EngineError::handler(visit.handler, "a file cannot be the source root"))?;
    let directory = target.resolve(visit.registry, parent).ok_or_else(|| {
        EngineError::handler(
            visit.handler,
            format!("no directory was generated for {}", parent.path().join("/")),
        )
    })?;
    let copy_from = visit
        .source
        .attribute(ATTR_PATH)
        .cloned()
        .ok_or_else(|| EngineError::handler(visit.handler, "file node has no path"))?;
    let backup = visit
        .registry
        .generators()
        .get(&format!("{}.files", TRANSFORM))?
        .backup();

    let tree = target.target_mut();
    let node = tree.add_child(directory, visit.source.name())?;
    tree.add_tag(node, TAG_FILE);
    tree.set_attribute(node, ATTR_COPY_FROM, copy_from);
    tree.set_attribute(node, ATTR_BACKUP, backup);
    target.finalize(visit.registry, visit.source, node, false)
}

fn record_file(visit: &Visit<'_>, _target: &mut TargetHandler) -> Result<(), EngineError> {
    if is_reserved(visit.source) {
        return Ok(());
    }
    let token = visit
        .registry
        .tokens()
        .token(&index_token(), true, false, empty_index())?;
    let relative = visit.source.path()[1..].join("/");
    let mut token = token.lock();
    if let Some(Value::Array(files)) = token.get_mut(INDEX_FIELD) {
        files.push(Value::String(relative));
    }
    Ok(())
}

fn write_index(visit: &Visit<'_>, target: &mut TargetHandler) -> Result<(), EngineError> {
    if !visit.source.is_root() {
        return Ok(());
    }

    let mut files: Vec<String> = Vec::new();
    if let Ok(token) = visit.registry.tokens().lookup(&index_token()) {
        let token = token.lock();
        if let Some(Value::Array(listed)) = token.get(INDEX_FIELD) {
            files.extend(listed.iter().filter_map(Value::as_str).map(str::to_string));
        }
    }

    let mut content = files.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    let root = target.target().root();
    let tree = target.target_mut();
    let node = match tree.child(root, INDEX_FILE) {
        Some(existing) => existing,
        None => tree.add_child(root, INDEX_FILE)?,
    };
    tree.add_tag(node, TAG_FILE);
    tree.set_attribute(node, ATTR_CONTENT, content);
    debug!(files = files.len(), "Index written");
    Ok(())
}
