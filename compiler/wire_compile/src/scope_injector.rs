//! Scope injection.
//!
//! Wraps a compiled fragment so its result goes through the active lifetime
//! scope. The effective behaviour and preference are the context's override
//! if set, else the node's own. At run time the wrapped fragment evaluates
//! its body directly when no scope is active; otherwise the scope decides:
//! `Implicit` creates and tracks a new instance per call, `Explicit` caches
//! one instance per `(scope, key)`. The key's node is the context's scope
//! owner when a `Scoped` wrapper set one, so two wrappers around one inner
//! node cache separately.

use wire_graph::Target;
use wire_ir::{InstanceKey, ScopePreference};

use crate::context::{CompileContext, FragmentKey};
use crate::expr::{Expr, LocalInit};

const ACTIVE_SCOPE: FragmentKey = FragmentKey {
    kind: "scope",
    name: "active",
    owner: None,
};

const ROOT_SCOPE: FragmentKey = FragmentKey {
    kind: "scope",
    name: "root",
    owner: None,
};

/// Wrap `expr`, compiled for `target` in `ctx`, with its scope handling.
pub fn inject(expr: Expr, target: &Target, ctx: &CompileContext<'_>) -> Expr {
    let behaviour = ctx
        .scope_behaviour()
        .unwrap_or_else(|| target.scope_behaviour());
    if !behaviour.is_scoped() {
        return expr;
    }

    let preference = ctx
        .scope_preference()
        .unwrap_or_else(|| target.scope_preference());
    let scope = match preference {
        ScopePreference::Current => {
            ctx.get_or_add_shared_fragment(ACTIVE_SCOPE, || LocalInit::ActiveScope)
        }
        ScopePreference::Root => ctx.get_or_add_shared_fragment(ROOT_SCOPE, || LocalInit::RootScope),
    };

    Expr::Scoped {
        body: Box::new(expr),
        behaviour,
        scope,
        key: InstanceKey::new(
            ctx.requested(),
            ctx.scope_owner().unwrap_or_else(|| target.id()),
        ),
    }
}
