//! Integration tests for configuration loading and application

use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;
use treegen::cli::{Commands, RunContext};
use treegen::config::{workspace_config_path, ConfigLoader};
use treegen::{DependencyPolicy, EngineError};

#[test]
fn test_workspace_file_declarations_reach_the_plan() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        workspace_config_path(temp_dir.path()),
        r#"
[chain]
transforms = ["fs"]

[[generators]]
transform = "fs"
name = "checksums"
depends = "files"
description = "Write a checksum next to every mirrored file"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_with_env(temp_dir.path(), Some(HashMap::new())).unwrap();
    assert_eq!(config.generators.len(), 1);

    let context = RunContext::with_config(temp_dir.path().to_path_buf(), config).unwrap();
    let plan = context.execute(&Commands::Plan).unwrap();
    let order: Vec<&str> = plan
        .lines()
        .filter(|line| line.trim_start().chars().next().is_some_and(|c| c.is_ascii_digit()))
        .collect();
    assert_eq!(
        order,
        vec![
            "  1. directories (depends: none)",
            "  2. files (depends: directories)",
            "  3. checksums (depends: files)",
            "  4. index (depends: files)",
        ]
    );
}

#[test]
fn test_invalid_configuration_is_rejected_with_every_problem() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("broken.toml");
    fs::write(
        &config_file,
        r#"
[[generators]]
transform = "fs"
name = "loop"
depends = "loop"

[[scopes]]
transform = "fs"
name = "nothing"
"#,
    )
    .unwrap();

    let err = RunContext::new(temp_dir.path().to_path_buf(), Some(config_file)).err().unwrap();
    match err {
        EngineError::ConfigError(message) => {
            assert!(message.contains("Generator 'fs.loop'"));
            assert!(message.contains("Scope 'fs.nothing'"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_declaration_clashing_with_flavour_is_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        workspace_config_path(temp_dir.path()),
        "[[scopes]]\ntransform = \"fs\"\nname = \"file\"\ntags = [\"file\"]\n",
    )
    .unwrap();
    let config = ConfigLoader::load_with_env(temp_dir.path(), Some(HashMap::new())).unwrap();
    let err = RunContext::with_config(temp_dir.path().to_path_buf(), config).err().unwrap();
    assert!(matches!(err, EngineError::DuplicateRegistration { .. }));
}

#[test]
fn test_environment_selects_dependency_policy() {
    let temp_dir = TempDir::new().unwrap();
    let mut env = HashMap::new();
    env.insert(
        "TREEGEN__CHAIN__DEPENDENCY_POLICY".to_string(),
        "promote".to_string(),
    );
    let config = ConfigLoader::load_with_env(temp_dir.path(), Some(env)).unwrap();
    assert_eq!(config.chain.dependency_policy, DependencyPolicy::Promote);
    assert_eq!(config.chain.transforms, vec!["fs"]);
}
