//! End-to-end tests for the directory mirror flavour

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use treegen::cli::{Commands, RunContext};
use treegen::config::EngineConfig;
use treegen::flavour::mirror;
use treegen::store::{IdentityStore, SledIdentityStore};
use treegen::{Controller, Registry};

fn sample_source(root: &std::path::Path) -> PathBuf {
    let source = root.join("project");
    fs::create_dir_all(source.join("src").join("nested")).unwrap();
    fs::create_dir_all(source.join("empty")).unwrap();
    fs::write(source.join("README.md"), "readme").unwrap();
    fs::write(source.join("src").join("main.rs"), "fn main() {}").unwrap();
    fs::write(source.join("src").join("nested").join("deep.txt"), "deep").unwrap();
    source
}

#[test]
fn test_mirror_copies_tree_and_writes_index() {
    let temp_dir = TempDir::new().unwrap();
    let source = sample_source(temp_dir.path());
    let output = temp_dir.path().join("out");

    let mut registry = Registry::new();
    mirror::register(&mut registry).unwrap();
    Controller::new(&registry, [mirror::TRANSFORM])
        .run(&[source], &output)
        .unwrap();

    assert!(output.join("empty").is_dir());
    assert_eq!(fs::read_to_string(output.join("README.md")).unwrap(), "readme");
    assert_eq!(
        fs::read_to_string(output.join("src").join("main.rs")).unwrap(),
        "fn main() {}"
    );
    assert_eq!(
        fs::read_to_string(output.join("src").join("nested").join("deep.txt")).unwrap(),
        "deep"
    );
    assert_eq!(
        fs::read_to_string(output.join(mirror::INDEX_FILE)).unwrap(),
        "README.md\nsrc/main.rs\nsrc/nested/deep.txt\n"
    );
}

#[test]
fn test_rerun_keeps_backups_of_overwritten_files() {
    let temp_dir = TempDir::new().unwrap();
    let source = sample_source(temp_dir.path());
    let output = temp_dir.path().join("out");

    let mut registry = Registry::new();
    mirror::register(&mut registry).unwrap();
    Controller::new(&registry, [mirror::TRANSFORM])
        .run(&[source.clone()], &output)
        .unwrap();

    fs::write(source.join("README.md"), "changed").unwrap();
    let mut registry = Registry::new();
    mirror::register(&mut registry).unwrap();
    Controller::new(&registry, [mirror::TRANSFORM])
        .run(&[source], &output)
        .unwrap();

    assert_eq!(fs::read_to_string(output.join("README.md")).unwrap(), "changed");
    assert_eq!(fs::read_to_string(output.join("README.md.bak")).unwrap(), "readme");
}

#[test]
fn test_identity_store_persists_mappings() {
    let temp_dir = TempDir::new().unwrap();
    let source = sample_source(temp_dir.path());
    let output = temp_dir.path().join("out");
    let store_path = temp_dir.path().join("identities");

    let mut registry = Registry::new();
    mirror::register(&mut registry).unwrap();
    Controller::new(&registry, [mirror::TRANSFORM])
        .with_identity_store(Box::new(SledIdentityStore::new(&store_path).unwrap()))
        .run(&[source], &output)
        .unwrap();
    drop(registry);

    let store = SledIdentityStore::new(&store_path).unwrap();
    let map = store.load().unwrap();
    // root, src, nested, empty and three files
    assert_eq!(map.len(), 7);
}

#[test]
fn test_run_context_executes_run_and_plan() {
    let temp_dir = TempDir::new().unwrap();
    let source = sample_source(temp_dir.path());
    let output = temp_dir.path().join("out");

    let context = RunContext::with_config(temp_dir.path().to_path_buf(), EngineConfig::default())
        .unwrap();

    let plan = context.execute(&Commands::Plan).unwrap();
    assert!(plan.starts_with("fs:\n  1. directories (depends: none)"));
    assert!(plan.contains("2. files (depends: directories)"));
    assert!(plan.contains("3. index (depends: files)"));

    let summary = context
        .execute(&Commands::Run {
            sources: vec![source],
            output: output.clone(),
        })
        .unwrap();
    assert!(summary.starts_with("Generated 8 nodes (4 directories, 4 files)"));
    assert!(output.join(mirror::INDEX_FILE).is_file());
}

#[test]
fn test_missing_source_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    mirror::register(&mut registry).unwrap();
    let err = Controller::new(&registry, [mirror::TRANSFORM])
        .run(&[temp_dir.path().join("nope")], &temp_dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, treegen::EngineError::StorageError(_)));
}

#[test]
fn test_repeated_runs_on_one_context_list_each_file_once() {
    let temp_dir = TempDir::new().unwrap();
    let source = sample_source(temp_dir.path());
    let output = temp_dir.path().join("out");

    let context = RunContext::with_config(temp_dir.path().to_path_buf(), EngineConfig::default())
        .unwrap();
    let run = Commands::Run {
        sources: vec![source],
        output: output.clone(),
    };
    context.execute(&run).unwrap();
    context.execute(&run).unwrap();

    assert_eq!(
        fs::read_to_string(output.join(mirror::INDEX_FILE)).unwrap(),
        "README.md\nsrc/main.rs\nsrc/nested/deep.txt\n"
    );
}

#[test]
fn test_top_level_index_file_does_not_abort_run() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("project");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join(mirror::INDEX_FILE), "hand written").unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();
    let output = temp_dir.path().join("out");

    let mut registry = Registry::new();
    mirror::register(&mut registry).unwrap();
    Controller::new(&registry, [mirror::TRANSFORM])
        .run(&[source], &output)
        .unwrap();

    assert_eq!(fs::read_to_string(output.join("a.txt")).unwrap(), "a");
    assert_eq!(
        fs::read_to_string(output.join(mirror::INDEX_FILE)).unwrap(),
        "a.txt\n"
    );
}

#[test]
fn test_identity_store_drops_deleted_sources() {
    let temp_dir = TempDir::new().unwrap();
    let source = sample_source(temp_dir.path());
    let output = temp_dir.path().join("out");
    let store_path = temp_dir.path().join("identities");

    let run = |source: &PathBuf| {
        let mut registry = Registry::new();
        mirror::register(&mut registry).unwrap();
        Controller::new(&registry, [mirror::TRANSFORM])
            .with_identity_store(Box::new(SledIdentityStore::new(&store_path).unwrap()))
            .run(&[source.clone()], &output)
            .unwrap();
    };

    run(&source);
    fs::remove_file(source.join("src").join("nested").join("deep.txt")).unwrap();
    run(&source);

    let store = SledIdentityStore::new(&store_path).unwrap();
    // root, src, nested, empty, README.md and main.rs
    assert_eq!(store.load().unwrap().len(), 6);
}

#[test]
fn test_info_lists_version_and_transforms() {
    let temp_dir = TempDir::new().unwrap();
    let context = RunContext::with_config(temp_dir.path().to_path_buf(), EngineConfig::default())
        .unwrap();

    let info = context.execute(&Commands::Info).unwrap();
    assert!(info.starts_with(&format!("treegen {}\n", env!("CARGO_PKG_VERSION"))));
    assert!(info.contains("transforms: fs"));
    assert!(info.ends_with("chain: fs"));
}
