//! Sharded type pool: interned types plus the definition table.
//!
//! `TypeId` is a compact handle to an interned `TypeData`. Equality of two
//! handles is equality of the types they denote, so the binder, the mapper and
//! the singleton cache compare and hash types in O(1).
//!
//! # Layout
//!
//! Types are interned into 16 shards selected by hash, each behind its own
//! `RwLock`. A `TypeId` packs the shard index into its high 4 bits and the
//! shard-local index into the low 28 bits, so lookups never touch a global
//! lock. `TypeId::OBJECT` is pre-interned at shard 0, local 0.
//!
//! Definitions (`TypeDef`) live in an append-only table indexed by `DefId`.
//! `Enumerable<out T>` and `List<T> : Enumerable<T>` are pre-registered at
//! fixed ids.
//!
//! # Generic Signatures
//!
//! A definition's base, interfaces, constructor parameters and members are
//! written over `Param(i)`, the i-th parameter of that definition. Asking the
//! pool for the supertypes or constructors of a closed type substitutes the
//! closed arguments into those signatures.

use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::callable::{Constructor, Member};
use crate::def::{TypeDef, Variance};

/// Number of shards for type interning.
const NUM_SHARDS: usize = 16;

/// Bits reserved for the shard-local index.
const LOCAL_BITS: u32 = 28;

const LOCAL_MASK: u32 = (1 << LOCAL_BITS) - 1;

/// Handle to an interned type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// The top type. Every type is assignable to it.
    pub const OBJECT: TypeId = TypeId::from_shard_local(0, 0);

    #[inline]
    pub const fn from_shard_local(shard: u32, local: u32) -> Self {
        TypeId((shard << LOCAL_BITS) | (local & LOCAL_MASK))
    }

    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> LOCAL_BITS) as usize
    }

    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & LOCAL_MASK) as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({}:{})", self.shard(), self.local())
    }
}

/// Index of a registered `TypeDef`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct DefId(u32);

impl DefId {
    /// `Enumerable<out T>`.
    pub const ENUMERABLE: DefId = DefId(0);
    /// `List<T> : Enumerable<T>`.
    pub const LIST: DefId = DefId(1);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structure of an interned type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    /// The top type.
    Object,
    /// An instantiation of a definition. Open when any argument is open.
    Named {
        def: DefId,
        args: SmallVec<[TypeId; 2]>,
    },
    /// The i-th generic parameter of the enclosing definition.
    Param(u32),
    /// A covariant array, viewed as `Enumerable<T>`.
    Array(TypeId),
}

/// Error when interning a type fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeInternError {
    /// Shard exceeded capacity (over 268 million types per shard).
    #[error("type pool shard {shard_idx} exceeded its capacity")]
    ShardOverflow { shard_idx: usize },
}

/// Per-shard storage for interned types.
struct TypeShard {
    map: FxHashMap<TypeData, u32>,
    types: Vec<TypeData>,
}

impl TypeShard {
    fn new() -> Self {
        TypeShard {
            map: FxHashMap::default(),
            types: Vec::with_capacity(64),
        }
    }

    /// Shard 0 starts with `Object` at local index 0.
    fn with_object() -> Self {
        let mut shard = TypeShard::new();
        shard.map.insert(TypeData::Object, 0);
        shard.types.push(TypeData::Object);
        shard
    }
}

/// Interned types and registered definitions.
///
/// # Thread Safety
/// Interning takes a per-shard `RwLock`: lookups of existing types only take
/// the read lock, with a double-checked write on miss. The definition table
/// is append-only. Share the pool across threads with `SharedPool`.
pub struct TypePool {
    shards: [RwLock<TypeShard>; NUM_SHARDS],
    defs: RwLock<Vec<Arc<TypeDef>>>,
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TypePool {
    /// Create a pool with `Object`, `Enumerable<out T>` and `List<T>`.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(TypeShard::with_object())
            } else {
                RwLock::new(TypeShard::new())
            }
        });
        let pool = TypePool {
            shards,
            defs: RwLock::new(Vec::new()),
        };

        let enumerable =
            pool.define(TypeDef::interface("Enumerable").with_variant_param("T", Variance::Covariant));
        let enumerable_t = pool.named(enumerable, &[pool.param(0)]);
        let list = pool.define(TypeDef::class("List").with_param("T").implements(enumerable_t));
        debug_assert_eq!(enumerable, DefId::ENUMERABLE);
        debug_assert_eq!(list, DefId::LIST);

        pool
    }

    // Definitions

    /// Register a definition.
    pub fn define(&self, def: TypeDef) -> DefId {
        let mut defs = self.defs.write();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "definition count never approaches u32::MAX"
        )]
        let id = DefId(defs.len() as u32);
        tracing::trace!(name = %def.name, id = id.0, "define type");
        defs.push(Arc::new(def));
        id
    }

    /// Look up a definition.
    ///
    /// # Panics
    /// Panics if the `DefId` was not created by this pool.
    pub fn def(&self, id: DefId) -> Arc<TypeDef> {
        Arc::clone(&self.defs.read()[id.index()])
    }

    // Interning

    #[inline]
    fn shard_for(data: &TypeData) -> usize {
        let mut hasher = rustc_hash::FxHasher::default();
        data.hash(&mut hasher);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "truncation is fine for hash-based shard selection"
        )]
        let hash = hasher.finish() as usize;
        hash % NUM_SHARDS
    }

    /// Try to intern a type, returning its `TypeId` or an error on overflow.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "shard_idx is bounded by NUM_SHARDS (16)"
    )]
    pub fn try_intern(&self, data: TypeData) -> Result<TypeId, TypeInternError> {
        if matches!(data, TypeData::Object) {
            return Ok(TypeId::OBJECT);
        }

        let shard_idx = Self::shard_for(&data);
        let shard = &self.shards[shard_idx];

        {
            let guard = shard.read();
            if let Some(&local) = guard.map.get(&data) {
                return Ok(TypeId::from_shard_local(shard_idx as u32, local));
            }
        }

        let mut guard = shard.write();
        if let Some(&local) = guard.map.get(&data) {
            return Ok(TypeId::from_shard_local(shard_idx as u32, local));
        }

        let local = u32::try_from(guard.types.len())
            .ok()
            .filter(|&local| local <= LOCAL_MASK)
            .ok_or(TypeInternError::ShardOverflow { shard_idx })?;
        guard.types.push(data.clone());
        guard.map.insert(data, local);

        Ok(TypeId::from_shard_local(shard_idx as u32, local))
    }

    /// Intern a type.
    ///
    /// # Panics
    /// Panics if a shard exceeds capacity. Use `try_intern` for fallible
    /// interning.
    pub fn intern(&self, data: TypeData) -> TypeId {
        self.try_intern(data).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up the structure of a type.
    ///
    /// # Panics
    /// Panics if the `TypeId` was not created by this pool.
    pub fn data(&self, id: TypeId) -> TypeData {
        self.shards[id.shard()].read().types[id.local()].clone()
    }

    // Constructors for common shapes

    /// `def<args...>`.
    pub fn named(&self, def: DefId, args: &[TypeId]) -> TypeId {
        self.intern(TypeData::Named {
            def,
            args: args.iter().copied().collect(),
        })
    }

    /// A non-generic named type.
    pub fn simple(&self, def: DefId) -> TypeId {
        self.named(def, &[])
    }

    /// The open generic definition type `def<T0, T1, ...>`.
    pub fn generic(&self, def: DefId) -> TypeId {
        let arity = self.def(def).arity();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "generic arity is tiny"
        )]
        let params: SmallVec<[TypeId; 2]> = (0..arity).map(|i| self.param(i as u32)).collect();
        self.named(def, &params)
    }

    /// The i-th generic parameter placeholder.
    pub fn param(&self, index: u32) -> TypeId {
        self.intern(TypeData::Param(index))
    }

    /// `elem[]`.
    pub fn array(&self, elem: TypeId) -> TypeId {
        self.intern(TypeData::Array(elem))
    }

    /// `Enumerable<elem>`.
    pub fn enumerable(&self, elem: TypeId) -> TypeId {
        self.named(DefId::ENUMERABLE, &[elem])
    }

    /// `List<elem>`.
    pub fn list(&self, elem: TypeId) -> TypeId {
        self.named(DefId::LIST, &[elem])
    }

    // Queries

    /// The definition of a named type.
    pub fn def_of(&self, ty: TypeId) -> Option<DefId> {
        match self.data(ty) {
            TypeData::Named { def, .. } => Some(def),
            _ => None,
        }
    }

    /// Generic arguments of a named type (empty otherwise).
    pub fn args(&self, ty: TypeId) -> SmallVec<[TypeId; 2]> {
        match self.data(ty) {
            TypeData::Named { args, .. } => args,
            _ => SmallVec::new(),
        }
    }

    /// Returns `true` if the type mentions any generic parameter.
    pub fn is_open(&self, ty: TypeId) -> bool {
        match self.data(ty) {
            TypeData::Object => false,
            TypeData::Param(_) => true,
            TypeData::Named { args, .. } => args.iter().any(|&a| self.is_open(a)),
            TypeData::Array(elem) => self.is_open(elem),
        }
    }

    /// The open definition type of a generic instantiation, e.g.
    /// `Handler<int>` to `Handler<T>`.
    pub fn generic_definition(&self, ty: TypeId) -> Option<TypeId> {
        match self.data(ty) {
            TypeData::Named { def, args } if !args.is_empty() => Some(self.generic(def)),
            _ => None,
        }
    }

    /// Replace every `Param(i)` in `ty` with `args[i]`.
    ///
    /// Parameters without a corresponding argument are left in place.
    pub fn substitute(&self, ty: TypeId, args: &[TypeId]) -> TypeId {
        if args.is_empty() {
            return ty;
        }
        match self.data(ty) {
            TypeData::Object => ty,
            TypeData::Param(i) => args.get(i as usize).copied().unwrap_or(ty),
            TypeData::Named { def, args: own } => {
                let closed: SmallVec<[TypeId; 2]> =
                    own.iter().map(|&a| self.substitute(a, args)).collect();
                if closed == own {
                    ty
                } else {
                    self.intern(TypeData::Named { def, args: closed })
                }
            }
            TypeData::Array(elem) => {
                let closed = self.substitute(elem, args);
                if closed == elem {
                    ty
                } else {
                    self.array(closed)
                }
            }
        }
    }

    /// Base type then interfaces of `ty`, closed over its arguments.
    pub fn direct_supertypes(&self, ty: TypeId) -> SmallVec<[TypeId; 4]> {
        match self.data(ty) {
            TypeData::Named { def, args } => {
                let def = self.def(def);
                def.base
                    .iter()
                    .chain(def.interfaces.iter())
                    .map(|&sup| self.substitute(sup, &args))
                    .collect()
            }
            TypeData::Array(elem) => smallvec::smallvec![self.enumerable(elem)],
            TypeData::Object | TypeData::Param(_) => SmallVec::new(),
        }
    }

    /// Every proper supertype of `ty`, breadth first, without duplicates.
    ///
    /// `Object` is implied and not listed.
    pub fn supertypes(&self, ty: TypeId) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut queue: VecDeque<TypeId> = self.direct_supertypes(ty).into_iter().collect();
        seen.insert(ty);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            queue.extend(self.direct_supertypes(next));
        }
        out
    }

    /// Returns `true` if a value of type `from` can stand in for `to`.
    ///
    /// Identity, the top type, and any supertype of `from` whose arguments
    /// agree with `to` under the definition's declared variance. Arrays are
    /// covariant and implement `Enumerable<T>`.
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || to == TypeId::OBJECT {
            return true;
        }
        if let (TypeData::Array(a), TypeData::Array(b)) = (self.data(from), self.data(to)) {
            return self.is_assignable(a, b);
        }
        let TypeData::Named { def: to_def, args: to_args } = self.data(to) else {
            return false;
        };

        std::iter::once(from)
            .chain(self.supertypes(from))
            .any(|candidate| match self.data(candidate) {
                TypeData::Named { def, args } if def == to_def => {
                    self.args_compatible(def, &args, &to_args)
                }
                _ => false,
            })
    }

    fn args_compatible(&self, def: DefId, from: &[TypeId], to: &[TypeId]) -> bool {
        if from.len() != to.len() {
            return false;
        }
        let def = self.def(def);
        from.iter().zip(to).enumerate().all(|(i, (&f, &t))| {
            let variance = def.params.get(i).map(|p| p.variance).unwrap_or_default();
            match variance {
                Variance::Invariant => f == t,
                Variance::Covariant => self.is_assignable(f, t),
                Variance::Contravariant => self.is_assignable(t, f),
            }
        })
    }

    /// Returns `true` for interface types.
    pub fn is_interface(&self, ty: TypeId) -> bool {
        self.def_of(ty).is_some_and(|d| self.def(d).is_interface())
    }

    /// Returns `true` for interfaces and abstract classes.
    pub fn is_abstract(&self, ty: TypeId) -> bool {
        self.def_of(ty)
            .is_some_and(|d| !self.def(d).flags.is_constructible())
    }

    /// Constructors of a named type with parameter types closed over its
    /// arguments.
    pub fn constructors(&self, ty: TypeId) -> Vec<Constructor> {
        let TypeData::Named { def, args } = self.data(ty) else {
            return Vec::new();
        };
        self.def(def)
            .constructors
            .iter()
            .map(|ctor| ctor.close(|p| self.substitute(p, &args)))
            .collect()
    }

    /// Settable members of a named type, closed over its arguments.
    pub fn members(&self, ty: TypeId) -> Vec<Member> {
        let TypeData::Named { def, args } = self.data(ty) else {
            return Vec::new();
        };
        self.def(def)
            .members
            .iter()
            .map(|m| m.close(|p| self.substitute(p, &args)))
            .collect()
    }

    /// Render a type for diagnostics: `Handler<int>`, `T`, `Plugin[]`.
    pub fn display(&self, ty: TypeId) -> String {
        let mut out = String::new();
        self.write_type(ty, None, &mut out);
        out
    }

    fn write_type(&self, ty: TypeId, owner: Option<&TypeDef>, out: &mut String) {
        match self.data(ty) {
            TypeData::Object => out.push_str("object"),
            TypeData::Param(i) => {
                match owner.and_then(|d| d.params.get(i as usize)) {
                    Some(param) => out.push_str(&param.name),
                    None => {
                        out.push('T');
                        out.push_str(&i.to_string());
                    }
                }
            }
            TypeData::Array(elem) => {
                self.write_type(elem, owner, out);
                out.push_str("[]");
            }
            TypeData::Named { def, args } => {
                let def = self.def(def);
                out.push_str(&def.name);
                if !args.is_empty() {
                    out.push('<');
                    for (i, &arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write_type(arg, Some(owner.unwrap_or(def.as_ref())), out);
                    }
                    out.push('>');
                }
            }
        }
    }
}

/// Shared handle to a `TypePool`.
#[derive(Clone, Default)]
pub struct SharedPool(Arc<TypePool>);

impl SharedPool {
    pub fn new(pool: TypePool) -> Self {
        SharedPool(Arc::new(pool))
    }
}

impl Deref for SharedPool {
    type Target = TypePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPool").finish_non_exhaustive()
    }
}
