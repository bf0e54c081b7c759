//! Type definitions.
//!
//! A `TypeDef` is the registered shape of a named type: its generic
//! parameters, what it derives from and implements, how it is constructed and
//! which members can be assigned after construction. Signatures are expressed
//! over `TypePool::param(i)` placeholders and closed per request.

use bitflags::bitflags;

use crate::callable::{Constructor, Member};
use crate::TypeId;

bitflags! {
    /// Structural flags of a type definition.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Interface: never constructed directly.
        const INTERFACE = 1 << 0;
        /// Abstract class: never constructed directly.
        const ABSTRACT = 1 << 1;
    }
}

impl TypeFlags {
    /// Whether instances of this definition can be constructed.
    #[inline]
    pub fn is_constructible(self) -> bool {
        !self.intersects(TypeFlags::INTERFACE | TypeFlags::ABSTRACT)
    }
}

/// Variance of a generic parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    /// `out T`: `Gen<Derived>` is assignable to `Gen<Base>`.
    Covariant,
    /// `in T`: `Gen<Base>` is assignable to `Gen<Derived>`.
    Contravariant,
}

/// A generic parameter of a definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericParam {
    pub name: String,
    pub variance: Variance,
}

/// A registered type definition.
#[derive(Clone, Debug)]
pub struct TypeDef {
    pub name: String,
    pub params: Vec<GenericParam>,
    pub flags: TypeFlags,
    /// Base class, expressed over this definition's parameters.
    pub base: Option<TypeId>,
    /// Implemented interfaces, expressed over this definition's parameters.
    pub interfaces: Vec<TypeId>,
    pub constructors: Vec<Constructor>,
    pub members: Vec<Member>,
}

impl TypeDef {
    /// A constructible class definition.
    pub fn class(name: impl Into<String>) -> Self {
        TypeDef {
            name: name.into(),
            params: Vec::new(),
            flags: TypeFlags::empty(),
            base: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            members: Vec::new(),
        }
    }

    /// An interface definition.
    pub fn interface(name: impl Into<String>) -> Self {
        TypeDef {
            flags: TypeFlags::INTERFACE,
            ..TypeDef::class(name)
        }
    }

    /// Mark the definition abstract.
    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        self.flags |= TypeFlags::ABSTRACT;
        self
    }

    /// Add an invariant generic parameter.
    #[must_use]
    pub fn with_param(self, name: impl Into<String>) -> Self {
        self.with_variant_param(name, Variance::Invariant)
    }

    /// Add a generic parameter with the given variance.
    #[must_use]
    pub fn with_variant_param(mut self, name: impl Into<String>, variance: Variance) -> Self {
        self.params.push(GenericParam {
            name: name.into(),
            variance,
        });
        self
    }

    /// Set the base class.
    #[must_use]
    pub fn extends(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a constructor.
    #[must_use]
    pub fn with_constructor(mut self, ctor: Constructor) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Add a settable member.
    #[must_use]
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Number of generic parameters.
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }
}
