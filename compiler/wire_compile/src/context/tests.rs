use super::*;
use pretty_assertions::assert_eq;
use wire_graph::Target;
use wire_ir::{TypeDef, TypePool};

fn types() -> (TypeId, TypeId) {
    let pool = TypePool::new();
    let a = pool.simple(pool.define(TypeDef::class("A")));
    let b = pool.simple(pool.define(TypeDef::class("B")));
    (a, b)
}

#[test]
fn reentering_same_target_and_type_is_cyclic() {
    let (a, _) = types();
    let state = CompileState::new(16);
    let ctx = CompileContext::root(a, &state);
    let first = TargetId::next();
    let second = TargetId::next();

    let _g1 = ctx.push_compile_stack(first).unwrap();
    let child = ctx.new_context(a);
    let _g2 = child.push_compile_stack(second).unwrap();
    let grandchild = child.new_context(a);
    let err = grandchild.push_compile_stack(first).unwrap_err();
    assert_eq!(
        err,
        ResolveError::CyclicDependency {
            target: first,
            path: vec![first, second, first],
        }
    );
}

#[test]
fn same_target_for_another_type_is_allowed() {
    let (a, b) = types();
    let state = CompileState::new(16);
    let ctx = CompileContext::root(a, &state);
    let target = TargetId::next();
    let _g1 = ctx.push_compile_stack(target).unwrap();
    let other = ctx.new_context(b);
    assert!(other.push_compile_stack(target).is_ok());
}

#[test]
fn guard_pops_on_drop() {
    let (a, _) = types();
    let state = CompileState::new(16);
    let ctx = CompileContext::root(a, &state);
    let target = TargetId::next();
    {
        let _guard = ctx.push_compile_stack(target).unwrap();
        assert_eq!(state.depth(), 1);
    }
    assert_eq!(state.depth(), 0);
    assert!(ctx.push_compile_stack(target).is_ok());
}

#[test]
fn max_depth_is_enforced() {
    let (a, _) = types();
    let state = CompileState::new(2);
    let ctx = CompileContext::root(a, &state);
    let _g1 = ctx.push_compile_stack(TargetId::next()).unwrap();
    let _g2 = ctx.push_compile_stack(TargetId::next()).unwrap();
    let err = ctx.push_compile_stack(TargetId::next()).unwrap_err();
    assert!(matches!(err, ResolveError::CyclicDependency { .. }));
}

#[test]
fn nested_state_shares_stack_not_fragments() {
    let (a, _) = types();
    let state = CompileState::new(16);
    let ctx = CompileContext::root(a, &state);
    let target = TargetId::next();
    let key = FragmentKey {
        kind: "scope",
        name: "active",
        owner: None,
    };
    ctx.get_or_add_shared_fragment(key, || LocalInit::ActiveScope);
    let _guard = ctx.push_compile_stack(target).unwrap();

    let nested = state.nested();
    let nested_ctx = CompileContext::root(a, &nested);
    assert!(nested_ctx.push_compile_stack(target).is_err());
    assert!(nested.into_locals().is_empty());
}

#[test]
fn shared_fragments_are_memoized() {
    let (a, _) = types();
    let state = CompileState::new(16);
    let ctx = CompileContext::root(a, &state);
    let active = FragmentKey {
        kind: "scope",
        name: "active",
        owner: None,
    };
    let root = FragmentKey {
        name: "root",
        ..active
    };
    let x = ctx.get_or_add_shared_fragment(active, || LocalInit::ActiveScope);
    let y = ctx
        .new_context(a)
        .get_or_add_shared_fragment(active, || LocalInit::RootScope);
    let z = ctx.get_or_add_shared_fragment(root, || LocalInit::RootScope);
    assert_eq!(x, y);
    assert_ne!(x, z);
    assert_eq!(
        state.into_locals(),
        vec![LocalInit::ActiveScope, LocalInit::RootScope]
    );
}

#[test]
fn dependency_overrides_are_inherited_scope_overrides_are_not() {
    let (a, b) = types();
    let state = CompileState::new(16);
    let target = Target::construct(b).shared();
    let ctx = CompileContext::root(a, &state)
        .with_dependency(b, TargetRef::clone(&target))
        .with_scope_behaviour(ScopeBehaviour::Explicit);
    let child = ctx.new_context(b);
    let grandchild = child.new_context(a);

    assert!(TargetRef::ptr_eq(&grandchild.dependency(b).unwrap(), &target));
    assert!(grandchild.dependency(a).is_none());
    assert_eq!(ctx.scope_behaviour(), Some(ScopeBehaviour::Explicit));
    assert_eq!(child.scope_behaviour(), None);
}

#[test]
fn nested_root_takes_the_nearest_dependency_overrides() {
    let (a, b) = types();
    let state = CompileState::new(16);
    let outer = Target::construct(a).shared();
    let inner = Target::construct(b).shared();
    let ctx = CompileContext::root(a, &state)
        .with_dependency(a, TargetRef::clone(&outer))
        .with_dependency(b, TargetRef::clone(&outer));
    let child = ctx
        .new_context(b)
        .with_dependency(b, TargetRef::clone(&inner))
        .with_scope_owner(inner.id());

    let nested_state = state.nested();
    let nested = CompileContext::root(b, &nested_state).with_dependencies_of(&child);
    assert!(TargetRef::ptr_eq(&nested.dependency(a).unwrap(), &outer));
    assert!(TargetRef::ptr_eq(&nested.dependency(b).unwrap(), &inner));
    assert_eq!(child.scope_owner(), Some(inner.id()));
    assert_eq!(nested.scope_owner(), None);
    assert_eq!(child.new_context(a).scope_owner(), None);
}
