//! Integration tests for the tree-synchronized target handler

use std::sync::Arc;
use treegen::target::lookup_identity;
use treegen::{
    Dependency, EngineError, Generator, Handler, Processor, Rank, Registry, Scope, Tree, TreeSync,
};

/// root/{pkg/{sub/{Class}}, other, Helper}; packages and classes tagged
fn model() -> Tree {
    let mut tree = Tree::new("source", "model");
    let root = tree.root();
    tree.add_tag(root, "package");
    let pkg = tree.add_child(root, "pkg").unwrap();
    tree.add_tag(pkg, "package");
    let sub = tree.add_child(pkg, "sub").unwrap();
    tree.add_tag(sub, "package");
    let class = tree.add_child(sub, "Class").unwrap();
    tree.add_tag(class, "class");
    let other = tree.add_child(root, "other").unwrap();
    tree.add_tag(other, "package");
    let helper = tree.add_child(root, "Helper").unwrap();
    tree.add_tag(helper, "class");
    tree
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_scope(Scope::new("uml", "packages", ["package"]))
        .unwrap();
    registry
        .register_scope(Scope::new("uml", "classes", ["class"]))
        .unwrap();
    registry
        .register_generator_with(
            Generator::new("uml", "modules", Dependency::Root),
            Arc::new(TreeSync),
            None,
        )
        .unwrap();
    registry
        .register_handler(
            Handler::new("uml", "modules", "package", |visit, target| {
                let node = if visit.source.is_root() {
                    target.target().root()
                } else {
                    target.add_child(visit.source.name())?
                };
                target.finalize(visit.registry, visit.source, node, true)?;

                let recorded = target.target().source_path(target.anchor()).len();
                if recorded != visit.source.path_len() {
                    return Err(EngineError::handler(visit.handler, "anchor depth out of sync"));
                }
                Ok(())
            })
            .scoped("packages")
            .ranked(Rank::At(0)),
        )
        .unwrap();
    registry
        .register_handler(
            Handler::new("uml", "modules", "class", |visit, target| {
                let node = target.add_child(format!("{}.py", visit.source.name()))?;
                target.finalize(visit.registry, visit.source, node, false)
            })
            .scoped("classes"),
        )
        .unwrap();
    registry
}

#[test]
fn test_target_mirrors_packages_and_places_classes() {
    let registry = registry();
    let source = model();
    let out = Processor::new(&registry, "uml")
        .run(&source, Tree::new("target", "out"))
        .unwrap();

    let names = |id| out.children(id).map(|c| out.name(c).to_string()).collect::<Vec<_>>();
    let root = out.root();
    assert_eq!(names(root), vec!["pkg", "other", "Helper.py"]);
    let pkg = out.child(root, "pkg").unwrap();
    assert_eq!(names(pkg), vec!["sub"]);
    let sub = out.child(pkg, "sub").unwrap();
    assert_eq!(names(sub), vec!["Class.py"]);
    assert!(names(out.child(root, "other").unwrap()).is_empty());
}

#[test]
fn test_identity_map_links_source_and_target() {
    let registry = registry();
    let source = model();
    let out = Processor::new(&registry, "uml")
        .run(&source, Tree::new("target", "out"))
        .unwrap();

    let pkg = source.child(source.root(), "pkg").unwrap();
    let sub = source.child(pkg, "sub").unwrap();
    let class = source.child(sub, "Class").unwrap();

    let target_identity = lookup_identity(&registry, &source.identity(class)).unwrap();
    let generated = out.find_by_identity(&target_identity).unwrap();
    assert_eq!(out.path(generated), vec!["out", "pkg", "sub", "Class.py"]);
    assert_eq!(out.source_path(generated), ["model", "pkg", "sub", "Class"]);
}

#[test]
fn test_identities_are_stable_across_runs() {
    let first = Processor::new(&registry(), "uml")
        .run(&model(), Tree::new("target", "out"))
        .unwrap();
    let second = Processor::new(&registry(), "uml")
        .run(&model(), Tree::new("target", "out"))
        .unwrap();

    let identities = |tree: &Tree| {
        tree.pre_order()
            .into_iter()
            .map(|id| tree.identity(id))
            .collect::<Vec<_>>()
    };
    assert_eq!(identities(&first), identities(&second));
}

#[test]
fn test_duplicate_target_child_aborts() {
    let mut registry = registry();
    registry
        .register_handler(
            Handler::new("uml", "modules", "again", |visit, target| {
                if visit.source.name() == "pkg" {
                    let parent = target.target().parent(target.anchor()).unwrap_or(target.anchor());
                    target.target_mut().add_child(parent, "pkg")?;
                }
                Ok(())
            })
            .scoped("packages")
            .ranked(Rank::At(1)),
        )
        .unwrap();

    let err = Processor::new(&registry, "uml")
        .run(&model(), Tree::new("target", "out"))
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateChild { .. }));
}
