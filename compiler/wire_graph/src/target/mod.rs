//! Resolution targets: the nodes of the target graph.
//!
//! A `Target` describes how to produce an instance of a type. Targets are
//! built once at registration time, shared through `TargetRef`, and never
//! mutated afterwards; wrappers own their inner node by reference count, so
//! a node may be shared by several parents (the graph is a DAG). A real cycle
//! is only discovered when compiling and is reported as `CyclicDependency`.
//!
//! # Identity
//!
//! Every target receives a fresh `TargetId` on creation. The singleton cache
//! and explicit scope caching key on `(requested type, id)`, so two targets
//! that look identical are still two different cache entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use wire_ir::{
    Constructor, Delegate, Instance, ScopeBehaviour, ScopePreference, TargetId, TypeId, TypePool,
};

/// Shared handle to an immutable target.
pub type TargetRef = Arc<Target>;

/// Which members to assign after construction.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum MemberBinding {
    #[default]
    None,
    /// Every member whose type is registered.
    All,
    /// Exactly these members, by name.
    Explicit(Vec<String>),
}

/// Payload of `Construct` and `GenericConstruct` targets.
#[derive(Clone, Debug, Default)]
pub struct ConstructTarget {
    /// Constructor to use instead of overload selection.
    pub ctor: Option<Constructor>,
    /// Argument nodes for parameters, by parameter name.
    pub named_args: Vec<(String, TargetRef)>,
    /// Member binding; `None` defers to the compile options.
    pub members: Option<MemberBinding>,
}

impl ConstructTarget {
    #[must_use]
    pub fn with_ctor(mut self, ctor: Constructor) -> Self {
        self.ctor = Some(ctor);
        self
    }

    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, target: TargetRef) -> Self {
        self.named_args.push((name.into(), target));
        self
    }

    #[must_use]
    pub fn with_members(mut self, members: MemberBinding) -> Self {
        self.members = Some(members);
        self
    }

    /// The named argument node for `name`, if any.
    pub fn named_arg(&self, name: &str) -> Option<&TargetRef> {
        self.named_args
            .iter()
            .find_map(|(n, target)| (n == name).then_some(target))
    }
}

/// Shape of a collection target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionFlavor {
    Array,
    List,
    Enumerable,
}

impl CollectionFlavor {
    /// The collection type for elements of type `element`.
    pub fn collection_type(self, pool: &TypePool, element: TypeId) -> TypeId {
        match self {
            CollectionFlavor::Array => pool.array(element),
            CollectionFlavor::List => pool.list(element),
            CollectionFlavor::Enumerable => pool.enumerable(element),
        }
    }
}

/// Coarse traits of a target kind, used to pick a fallback builder.
///
/// Ordered most specific first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Produces whatever its single inner node produces.
    Wrapper,
    /// Invokes a constructor or factory.
    Construction,
    /// Assembles several nodes into one sequence.
    Collection,
    /// Carries a ready-made value.
    DirectValue,
}

/// A target kind defined outside this crate.
///
/// Custom kinds are compiled by a builder registered for their Rust type, or
/// failing that by the builder registered for one of their capabilities.
pub trait CustomTarget: Any + Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &[Capability] {
        &[]
    }

    /// The wrapped node, for `Capability::Wrapper` kinds.
    fn inner(&self) -> Option<&TargetRef> {
        None
    }

    /// The carried value, for `Capability::DirectValue` kinds.
    fn direct_value(&self) -> Option<Instance> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// The variant-specific part of a target.
pub enum TargetKind {
    Construct(ConstructTarget),
    /// Construction of an open generic definition, closed per request.
    GenericConstruct(ConstructTarget),
    Object(Instance),
    /// Whatever is registered for the target's type, else the fallback.
    Resolved {
        fallback: Option<TargetRef>,
    },
    Singleton(TargetRef),
    /// Forces explicit (per-scope) caching of the inner node.
    Scoped(TargetRef),
    /// Disables scoping of the inner node.
    Unscoped(TargetRef),
    /// Compiles `decorator` with requests for `decorated_type` redirected to
    /// `decorated`.
    Decorator {
        decorator: TargetRef,
        decorated: TargetRef,
        decorated_type: TypeId,
    },
    Collection {
        flavor: CollectionFlavor,
        element: TypeId,
        items: Vec<TargetRef>,
    },
    Delegate(Delegate),
    /// The inner node, produced as the target's declared type.
    ChangeType(TargetRef),
    /// A registration for `registered` serving a variance-compatible request.
    VarianceMatch {
        inner: TargetRef,
        registered: TypeId,
    },
    Custom(Arc<dyn CustomTarget>),
}

/// Lookup key of a target kind in the builder registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KindKey {
    Construct,
    GenericConstruct,
    Object,
    Resolved,
    Singleton,
    Scoped,
    Unscoped,
    Decorator,
    Collection,
    Delegate,
    ChangeType,
    VarianceMatch,
    /// A custom kind, by the Rust type implementing `CustomTarget`.
    Custom(std::any::TypeId),
}

impl KindKey {
    /// Key for the custom kind implemented by `T`.
    pub fn custom<T: CustomTarget>() -> Self {
        KindKey::Custom(std::any::TypeId::of::<T>())
    }

    pub fn name(self) -> &'static str {
        match self {
            KindKey::Construct => "construct",
            KindKey::GenericConstruct => "generic-construct",
            KindKey::Object => "object",
            KindKey::Resolved => "resolved",
            KindKey::Singleton => "singleton",
            KindKey::Scoped => "scoped",
            KindKey::Unscoped => "unscoped",
            KindKey::Decorator => "decorator",
            KindKey::Collection => "collection",
            KindKey::Delegate => "delegate",
            KindKey::ChangeType => "change-type",
            KindKey::VarianceMatch => "variance-match",
            KindKey::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for KindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the target graph.
pub struct Target {
    id: TargetId,
    declared_type: TypeId,
    scope_behaviour: ScopeBehaviour,
    scope_preference: ScopePreference,
    use_fallback: bool,
    kind: TargetKind,
}

impl Target {
    /// Create a target with the kind's default scope behaviour.
    pub fn new(declared_type: TypeId, kind: TargetKind) -> Self {
        let scope_behaviour = match kind {
            TargetKind::Construct(_) | TargetKind::GenericConstruct(_) | TargetKind::Delegate(_) => {
                ScopeBehaviour::Implicit
            }
            _ => ScopeBehaviour::None,
        };
        Target {
            id: TargetId::next(),
            declared_type,
            scope_behaviour,
            scope_preference: ScopePreference::Current,
            use_fallback: false,
            kind,
        }
    }

    // Kind constructors

    /// Construct the closed type `ty`, selecting a constructor by overload.
    pub fn construct(ty: TypeId) -> Self {
        Target::construct_with(ty, ConstructTarget::default())
    }

    pub fn construct_with(ty: TypeId, spec: ConstructTarget) -> Self {
        Target::new(ty, TargetKind::Construct(spec))
    }

    /// Construct the open generic definition `open`, closed per request.
    pub fn generic(open: TypeId) -> Self {
        Target::generic_with(open, ConstructTarget::default())
    }

    pub fn generic_with(open: TypeId, spec: ConstructTarget) -> Self {
        Target::new(open, TargetKind::GenericConstruct(spec))
    }

    /// A ready-made instance.
    pub fn object(value: Instance) -> Self {
        Target::new(value.ty(), TargetKind::Object(value))
    }

    pub fn resolved(ty: TypeId, fallback: Option<TargetRef>) -> Self {
        Target::new(ty, TargetKind::Resolved { fallback })
    }

    pub fn singleton(inner: TargetRef) -> Self {
        Target::new(inner.declared_type, TargetKind::Singleton(inner))
    }

    pub fn scoped(inner: TargetRef) -> Self {
        Target::new(inner.declared_type, TargetKind::Scoped(inner))
    }

    pub fn unscoped(inner: TargetRef) -> Self {
        Target::new(inner.declared_type, TargetKind::Unscoped(inner))
    }

    pub fn decorator(decorator: TargetRef, decorated: TargetRef, decorated_type: TypeId) -> Self {
        Target::new(
            decorator.declared_type,
            TargetKind::Decorator {
                decorator,
                decorated,
                decorated_type,
            },
        )
    }

    pub fn collection(
        pool: &TypePool,
        flavor: CollectionFlavor,
        element: TypeId,
        items: Vec<TargetRef>,
    ) -> Self {
        Target::new(
            flavor.collection_type(pool, element),
            TargetKind::Collection {
                flavor,
                element,
                items,
            },
        )
    }

    pub fn delegate(delegate: Delegate) -> Self {
        Target::new(delegate.return_type, TargetKind::Delegate(delegate))
    }

    pub fn change_type(inner: TargetRef, ty: TypeId) -> Self {
        Target::new(ty, TargetKind::ChangeType(inner))
    }

    /// `inner`, registered for `registered`, serving requests for `requested`.
    pub fn variance_match(inner: TargetRef, registered: TypeId, requested: TypeId) -> Self {
        Target::new(requested, TargetKind::VarianceMatch { inner, registered })
    }

    pub fn custom(declared_type: TypeId, custom: Arc<dyn CustomTarget>) -> Self {
        Target::new(declared_type, TargetKind::Custom(custom))
    }

    // Attribute overrides

    #[must_use]
    pub fn with_scope_behaviour(mut self, behaviour: ScopeBehaviour) -> Self {
        self.scope_behaviour = behaviour;
        self
    }

    #[must_use]
    pub fn with_scope_preference(mut self, preference: ScopePreference) -> Self {
        self.scope_preference = preference;
        self
    }

    /// Mark the target as a fallback: only used when nothing else is
    /// registered for its type.
    #[must_use]
    pub fn as_fallback(mut self) -> Self {
        self.use_fallback = true;
        self
    }

    #[inline]
    pub fn shared(self) -> TargetRef {
        Arc::new(self)
    }

    // Accessors

    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    #[inline]
    pub fn declared_type(&self) -> TypeId {
        self.declared_type
    }

    #[inline]
    pub fn scope_behaviour(&self) -> ScopeBehaviour {
        self.scope_behaviour
    }

    #[inline]
    pub fn scope_preference(&self) -> ScopePreference {
        self.scope_preference
    }

    #[inline]
    pub fn use_fallback(&self) -> bool {
        self.use_fallback
    }

    #[inline]
    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    pub fn kind_key(&self) -> KindKey {
        match &self.kind {
            TargetKind::Construct(_) => KindKey::Construct,
            TargetKind::GenericConstruct(_) => KindKey::GenericConstruct,
            TargetKind::Object(_) => KindKey::Object,
            TargetKind::Resolved { .. } => KindKey::Resolved,
            TargetKind::Singleton(_) => KindKey::Singleton,
            TargetKind::Scoped(_) => KindKey::Scoped,
            TargetKind::Unscoped(_) => KindKey::Unscoped,
            TargetKind::Decorator { .. } => KindKey::Decorator,
            TargetKind::Collection { .. } => KindKey::Collection,
            TargetKind::Delegate(_) => KindKey::Delegate,
            TargetKind::ChangeType(_) => KindKey::ChangeType,
            TargetKind::VarianceMatch { .. } => KindKey::VarianceMatch,
            TargetKind::Custom(custom) => KindKey::Custom(custom.as_any().type_id()),
        }
    }

    /// Human-readable kind name; custom kinds report their own name.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            TargetKind::Custom(custom) => custom.name(),
            _ => self.kind_key().name(),
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        match &self.kind {
            TargetKind::Singleton(_)
            | TargetKind::Scoped(_)
            | TargetKind::Unscoped(_)
            | TargetKind::Decorator { .. }
            | TargetKind::ChangeType(_)
            | TargetKind::VarianceMatch { .. } => &[Capability::Wrapper],
            TargetKind::Construct(_) | TargetKind::GenericConstruct(_) | TargetKind::Delegate(_) => {
                &[Capability::Construction]
            }
            TargetKind::Collection { .. } => &[Capability::Collection],
            TargetKind::Object(_) => &[Capability::DirectValue],
            TargetKind::Resolved { .. } => &[],
            TargetKind::Custom(custom) => custom.capabilities(),
        }
    }

    /// The single wrapped node of wrapper kinds.
    pub fn inner(&self) -> Option<&TargetRef> {
        match &self.kind {
            TargetKind::Singleton(inner)
            | TargetKind::Scoped(inner)
            | TargetKind::Unscoped(inner)
            | TargetKind::ChangeType(inner)
            | TargetKind::VarianceMatch { inner, .. } => Some(inner),
            TargetKind::Decorator { decorator, .. } => Some(decorator),
            TargetKind::Custom(custom) => custom.inner(),
            _ => None,
        }
    }

    /// The carried value of direct-value kinds.
    pub fn direct_value(&self) -> Option<Instance> {
        match &self.kind {
            TargetKind::Object(value) => Some(value.clone()),
            TargetKind::Custom(custom) => custom.direct_value(),
            _ => None,
        }
    }

    /// Returns `true` if this target can produce an instance of `requested`.
    ///
    /// Generic constructions match a closed request whose definition is
    /// their own or that of one of their supertypes. Transparent wrappers ask
    /// their inner node. Everything else matches when the declared type is
    /// assignable to the request.
    pub fn supports_type(&self, pool: &TypePool, requested: TypeId) -> bool {
        match &self.kind {
            TargetKind::GenericConstruct(_) => {
                let Some(want) = pool.def_of(requested) else {
                    return false;
                };
                pool.def_of(self.declared_type) == Some(want)
                    || pool
                        .supertypes(self.declared_type)
                        .into_iter()
                        .any(|sup| pool.def_of(sup) == Some(want))
            }
            TargetKind::Singleton(inner) | TargetKind::Scoped(inner) | TargetKind::Unscoped(inner) => {
                inner.supports_type(pool, requested)
            }
            TargetKind::Decorator { decorator, .. } => decorator.supports_type(pool, requested),
            TargetKind::Custom(custom) => match custom.inner() {
                Some(inner) => inner.supports_type(pool, requested),
                None => pool.is_assignable(self.declared_type, requested),
            },
            _ => pool.is_assignable(self.declared_type, requested),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("kind", &self.kind_name())
            .field("declared_type", &self.declared_type)
            .field("scope_behaviour", &self.scope_behaviour)
            .field("use_fallback", &self.use_fallback)
            .finish()
    }
}
