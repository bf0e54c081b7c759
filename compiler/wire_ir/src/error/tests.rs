use super::*;
use pretty_assertions::assert_eq;

#[test]
fn cyclic_dependency_renders_path() {
    let a = TargetId::next();
    let b = TargetId::next();
    let err = ResolveError::CyclicDependency {
        target: a,
        path: vec![a, b, a],
    };
    let expected = format!("cyclic dependency detected at target {a}: {a} -> {b} -> {a}");
    assert_eq!(err.to_string(), expected);
}

#[test]
fn ambiguous_best_match_lists_candidates() {
    let err = ResolveError::AmbiguousBestMatch {
        requested: "IHandler<int>".into(),
        candidates: vec!["Handler<int>".into(), "Handler<long>".into()],
    };
    assert_eq!(
        err.to_string(),
        "ambiguous match for `IHandler<int>`: Handler<int>, Handler<long>"
    );
}

#[test]
fn compile_errors_are_classified() {
    let compile = ResolveError::NoApplicableConstructor { ty: "Foo".into() };
    let runtime = ResolveError::MissingDependency { ty: "Bar".into() };
    assert!(compile.is_compile_error());
    assert!(!runtime.is_compile_error());
    assert!(!ResolveError::ScopeDisposed.is_compile_error());
}

#[test]
fn activation_constructor() {
    let err = ResolveError::activation("Foo", "boom");
    assert_eq!(err.to_string(), "activation of `Foo` failed: boom");
}
