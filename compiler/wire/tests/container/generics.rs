//! Open generic registrations and variance lookups.

use pretty_assertions::assert_eq;
use wire::{Container, Parameter, ResolveError, Target, TypeDef};

use crate::common::{built, class, ctor, leaf};

#[test]
fn open_definition_serves_a_request_for_its_base() {
    let container = Container::default();
    let pool = container.pool();
    let int = leaf(&container, "int");
    let string = leaf(&container, "string");
    let base = pool.define(TypeDef::interface("Base").with_param("A").with_param("B"));
    let swapped = pool.named(base, &[pool.param(1), pool.param(0)]);
    let derived = pool.define(
        TypeDef::class("Derived")
            .with_param("T")
            .with_param("U")
            .implements(swapped)
            .with_constructor(ctor("derived", Vec::new())),
    );
    container.register_as(pool.generic(base), Target::generic(pool.generic(derived)));

    let request = pool.named(base, &[string, int]);
    let instance = container.get(request).unwrap();
    assert_eq!(pool.display(instance.ty()), "Derived<int, string>");
    assert_eq!(built(&instance).tag, "derived");

    let flipped = container.get(pool.named(base, &[int, string])).unwrap();
    assert_eq!(pool.display(flipped.ty()), "Derived<string, int>");
}

#[test]
fn open_definition_closes_its_constructor_parameters() {
    let container = Container::default();
    let pool = container.pool();
    let int = leaf(&container, "int");
    let holder = pool.define(
        TypeDef::class("Holder")
            .with_param("T")
            .with_constructor(ctor("holder", vec![Parameter::new("value", pool.param(0))])),
    );
    container.register(Target::construct(int));
    container.register(Target::generic(pool.generic(holder)));

    let instance = container.get(pool.named(holder, &[int])).unwrap();
    let arg = &built(&instance).args[0];
    assert_eq!(arg.ty(), int);
    assert_eq!(built(arg).tag, "int");
}

#[test]
fn unrelated_closed_request_is_rejected() {
    let container = Container::default();
    let pool = container.pool();
    let int = leaf(&container, "int");
    let base = pool.define(TypeDef::interface("Base").with_param("A"));
    let other = pool.define(TypeDef::interface("Other").with_param("A"));
    let derived = pool.define(
        TypeDef::class("Derived")
            .with_param("T")
            .implements(pool.named(other, &[pool.param(0)]))
            .with_constructor(ctor("derived", Vec::new())),
    );
    container.register_as(pool.generic(base), Target::generic(pool.generic(derived)));

    let err = container.get(pool.named(base, &[int])).unwrap_err();
    assert!(
        matches!(err, ResolveError::TypeMismatch { .. }),
        "unexpected error: {err:?}"
    );
}

#[test]
fn covariant_request_is_served_by_a_narrower_registration() {
    let container = Container::default();
    let pool = container.pool();
    let animal = class(&container, TypeDef::interface("Animal"));
    let cat = class(&container, TypeDef::class("Cat").implements(animal));
    let cats = pool.enumerable(cat);
    let shelter = class(
        &container,
        TypeDef::class("Shelter")
            .implements(cats)
            .with_constructor(ctor("shelter", Vec::new())),
    );
    container.register_as(cats, Target::construct(shelter));

    let animals = pool.enumerable(animal);
    let instance = container.get(animals).unwrap();
    assert_eq!(instance.ty(), shelter);
    assert!(pool.is_assignable(instance.ty(), animals));

    // Invariant lists are not matched.
    assert!(container.factory(pool.list(animal)).unwrap().is_none());
}
