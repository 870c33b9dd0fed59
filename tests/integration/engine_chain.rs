//! Integration tests for running transform chains end to end

use super::test_utils::{new_log, record, xy_tree, CountingMaterializer, MockTransform};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use treegen::registry::Kind;
use treegen::token::fields;
use treegen::{
    Controller, Dependency, DependencyPolicy, EngineError, Generator, Handler, Rank, Registry,
};

#[test]
fn test_traversal_is_pre_order_with_dispatch_before_children() {
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("model", Some(xy_tree()))))
        .unwrap();
    registry
        .register_generator(Generator::new("model", "walk", Dependency::Root))
        .unwrap();
    let log = new_log();
    record(&mut registry, &log, "model", "walk", "late", Rank::Unordered);
    record(&mut registry, &log, "model", "walk", "early", Rank::At(0));

    Controller::new(&registry, ["model"])
        .run(&[], Path::new("out"))
        .unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "early:root", "late:root", "early:x", "late:x", "early:x1", "late:x1", "early:y",
            "late:y",
        ]
    );
}

#[test]
fn test_zero_generator_stage_passes_target_to_next_stage() {
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("first", Some(xy_tree()))))
        .unwrap();
    registry
        .register_transform(Arc::new(MockTransform::new("second", None)))
        .unwrap();
    registry
        .register_generator(Generator::new("second", "inspect", Dependency::Root))
        .unwrap();
    let log = new_log();
    record(&mut registry, &log, "second", "inspect", "seen", Rank::Unordered);

    let out = Controller::new(&registry, ["first", "second"])
        .run(&[], Path::new("out"))
        .unwrap();

    // the first stage's target (a bare root) is the second stage's source
    assert_eq!(*log.lock(), vec!["seen:out"]);
    assert_eq!(out.label(), "second-target");
    assert_eq!(out.len(), 1);
}

#[test]
fn test_later_stage_consumes_generated_tree() {
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("first", Some(xy_tree()))))
        .unwrap();
    registry
        .register_transform(Arc::new(MockTransform::new("second", None)))
        .unwrap();
    registry
        .register_generator(Generator::new("first", "copy", Dependency::Root))
        .unwrap();
    registry
        .register_handler(Handler::new("first", "copy", "leaf", |visit, target| {
            if visit.source.children().next().is_none() {
                let root = target.target().root();
                target.target_mut().add_child(root, visit.source.name())?;
            }
            Ok(())
        }))
        .unwrap();
    registry
        .register_generator(Generator::new("second", "walk", Dependency::Root))
        .unwrap();
    let log = new_log();
    record(&mut registry, &log, "second", "walk", "seen", Rank::Unordered);

    Controller::new(&registry, ["first", "second"])
        .run(&[], Path::new("out"))
        .unwrap();

    assert_eq!(*log.lock(), vec!["seen:out", "seen:x1", "seen:y"]);
}

#[test]
fn test_handler_error_propagates_intact() {
    let materializer = Arc::new(CountingMaterializer::default());
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(
            MockTransform::new("model", Some(xy_tree())).materialized_by(Arc::clone(&materializer)),
        ))
        .unwrap();
    registry
        .register_generator(Generator::new("model", "walk", Dependency::Root))
        .unwrap();
    registry
        .register_handler(Handler::new("model", "walk", "fail_on_x1", |visit, _| {
            if visit.source.name() == "x1" {
                return Err(EngineError::handler(visit.handler, "x1 is not allowed"));
            }
            Ok(())
        }))
        .unwrap();
    let log = new_log();
    record(&mut registry, &log, "model", "walk", "after", Rank::Unordered);

    let err = Controller::new(&registry, ["model"])
        .run(&[], Path::new("out"))
        .unwrap_err();

    match err {
        EngineError::Handler { handler, message } => {
            assert_eq!(handler, "model.walk.fail_on_x1");
            assert_eq!(message, "x1 is not allowed");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // y is never visited and nothing is materialized
    assert_eq!(*log.lock(), vec!["after:root", "after:x"]);
    assert_eq!(*materializer.count.lock(), 0);
}

#[test]
fn test_final_target_materialized_once_per_run() {
    let materializer = Arc::new(CountingMaterializer::default());
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("first", Some(xy_tree()))))
        .unwrap();
    registry
        .register_transform(Arc::new(
            MockTransform::new("second", None).materialized_by(Arc::clone(&materializer)),
        ))
        .unwrap();

    Controller::new(&registry, ["first", "second"])
        .run(&[], Path::new("out"))
        .unwrap();
    assert_eq!(*materializer.count.lock(), 1);
}

#[test]
fn test_unknown_dependency_policies() {
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("model", Some(xy_tree()))))
        .unwrap();
    registry
        .register_generator(Generator::new(
            "model",
            "orphan",
            Dependency::On("absent".to_string()),
        ))
        .unwrap();
    let log = new_log();
    record(&mut registry, &log, "model", "orphan", "ran", Rank::Unordered);

    let err = Controller::new(&registry, ["model"])
        .run(&[], Path::new("out"))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownDependency { .. }));
    assert!(log.lock().is_empty());

    Controller::new(&registry, ["model"])
        .with_policy(DependencyPolicy::Promote)
        .run(&[], Path::new("out"))
        .unwrap();
    assert_eq!(log.lock().len(), 4);
}

#[test]
fn test_tokens_connect_decoupled_handlers() {
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("model", Some(xy_tree()))))
        .unwrap();
    registry
        .register_generator(Generator::new("model", "count", Dependency::Root))
        .unwrap();
    registry
        .register_generator(Generator::new(
            "model",
            "report",
            Dependency::On("count".to_string()),
        ))
        .unwrap();
    registry
        .register_handler(Handler::new("model", "count", "tally", |visit, _| {
            let token = visit
                .registry
                .tokens()
                .token("model.stats", true, false, fields(json!({ "nodes": 0 })))?;
            let mut token = token.lock();
            let nodes = token.get("nodes").and_then(Value::as_u64).unwrap_or(0);
            token.set("nodes", nodes + 1);
            Ok(())
        }))
        .unwrap();
    registry
        .register_handler(Handler::new("model", "report", "emit", |visit, target| {
            if visit.source.is_root() {
                let token = visit.registry.tokens().lookup("model.stats")?;
                let nodes = token.lock().get("nodes").cloned().unwrap_or(Value::Null);
                let root = target.target().root();
                target.target_mut().set_attribute(root, "nodes", nodes);
            }
            Ok(())
        }))
        .unwrap();

    let out = Controller::new(&registry, ["model"])
        .run(&[], Path::new("out"))
        .unwrap();
    assert_eq!(out.attribute(out.root(), "nodes"), Some(&json!(4)));
}

#[test]
fn test_lookup_failures_surface_kind() {
    let mut registry = Registry::new();
    registry
        .register_transform(Arc::new(MockTransform::new("model", Some(xy_tree()))))
        .unwrap();
    registry
        .register_generator(Generator::new("model", "walk", Dependency::Root))
        .unwrap();
    registry
        .register_handler(Handler::new("model", "walk", "needs_token", |visit, _| {
            visit.registry.tokens().lookup("never.created")?;
            Ok(())
        }))
        .unwrap();

    let err = Controller::new(&registry, ["model"])
        .run(&[], Path::new("out"))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotRegistered { kind: Kind::Token, .. }));
}
