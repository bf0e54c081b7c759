//! Shared fixtures: a generic "built" value and disposal loggers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use wire::{Constructor, Container, Dispose, Instance, Parameter, TypeDef, TypeId};

/// What every fixture constructor produces.
pub struct Built {
    pub tag: &'static str,
    pub args: Vec<Instance>,
}

pub fn built(instance: &Instance) -> &Built {
    instance
        .downcast_ref::<Built>()
        .expect("instance was not produced by a fixture constructor")
}

/// Tags of `instance`'s constructor arguments.
pub fn arg_tags(instance: &Instance) -> Vec<&'static str> {
    built(instance).args.iter().map(|a| built(a).tag).collect()
}

pub fn ctor(tag: &'static str, params: Vec<Parameter>) -> Constructor {
    Constructor::new(params, move |act| {
        Ok(Instance::new(
            act.ty,
            Built {
                tag,
                args: act.args.to_vec(),
            },
        ))
    })
}

/// A constructor that counts its calls.
pub fn counting_ctor(tag: &'static str, params: Vec<Parameter>, calls: &Arc<AtomicUsize>) -> Constructor {
    let calls = Arc::clone(calls);
    Constructor::new(params, move |act| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Instance::new(
            act.ty,
            Built {
                tag,
                args: act.args.to_vec(),
            },
        ))
    })
}

pub fn class(container: &Container, def: TypeDef) -> TypeId {
    let pool = container.pool();
    pool.simple(pool.define(def))
}

/// A class with a single parameterless constructor tagged with its name.
pub fn leaf(container: &Container, name: &'static str) -> TypeId {
    class(container, TypeDef::class(name).with_constructor(ctor(name, Vec::new())))
}

/// Records its name into a shared log when disposed.
pub struct Logged {
    pub name: &'static str,
    pub log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Logged {
    fn dispose(&self) {
        self.log.lock().push(self.name);
    }
}

/// A class whose instances log `name` when disposed.
pub fn logged(container: &Container, name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> TypeId {
    let log = Arc::clone(log);
    class(
        container,
        TypeDef::class(name).with_constructor(Constructor::new(Vec::new(), move |act| {
            Ok(Instance::disposable(
                act.ty,
                Logged {
                    name,
                    log: Arc::clone(&log),
                },
            ))
        })),
    )
}
