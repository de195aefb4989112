//! # Scope Module
//!
//! Named, reusable query fragments. A model gets its scopes from
//! [`Model::boot`] (static definitions) and from the database's
//! [`ScopeRegistry`] (runtime definitions).
//!
//! Named scopes are applied explicitly with `QueryBuilder::scope`; global
//! scopes are applied to every query of the model. Global scopes are keyed by
//! name, so registering the same name twice replaces the earlier scope
//! instead of filtering twice.

use heck::ToSnakeCase;
use std::{
    any::TypeId,
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{model::Model, query_builder::Query, value::Value};

/// A scope body: receives the query and the invocation arguments.
pub type ScopeFn = Arc<dyn Fn(Query, &[Value]) -> Query + Send + Sync>;

/// Normalizes a scope name: `scopePublishedAfter`, `PublishedAfter` and
/// `published_after` all become `published_after`.
pub fn scope_name(name: &str) -> String {
    let snake = name.to_snake_case();
    match snake.strip_prefix("scope_") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => snake,
    }
}

// ============================================================================
// ScopeSet
// ============================================================================

/// The scopes of one model.
#[derive(Clone, Default)]
pub struct ScopeSet {
    named: HashMap<String, ScopeFn>,
    global: Vec<(String, ScopeFn)>,
}

impl fmt::Debug for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<&str> = self.named.keys().map(String::as_str).collect();
        named.sort_unstable();
        f.debug_struct("ScopeSet").field("named", &named).field("global", &self.global_names()).finish()
    }
}

impl ScopeSet {
    /// Defines a named scope.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// scopes.define("popular", |q, _| q.filter("views", Op::Gt, 1000));
    /// scopes.define("published_after", |q, args| match args.first() {
    ///     Some(date) => q.filter("published_at", Op::Gt, date.clone()),
    ///     None => q,
    /// });
    /// ```
    pub fn define<F>(&mut self, name: &str, scope: F) -> &mut Self
    where
        F: Fn(Query, &[Value]) -> Query + Send + Sync + 'static,
    {
        self.named.insert(scope_name(name), Arc::new(scope));
        self
    }

    /// Registers a global scope. Registering an existing name replaces it.
    pub fn add_global<F>(&mut self, name: &str, scope: F) -> &mut Self
    where
        F: Fn(Query, &[Value]) -> Query + Send + Sync + 'static,
    {
        let name = scope_name(name);
        let scope: ScopeFn = Arc::new(scope);
        match self.global.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                log::warn!("global scope `{}` registered twice; keeping the latest definition", name);
                entry.1 = scope;
            }
            None => self.global.push((name, scope)),
        }
        self
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named.contains_key(&scope_name(name))
    }

    pub fn has_global(&self, name: &str) -> bool {
        let name = scope_name(name);
        self.global.iter().any(|(existing, _)| *existing == name)
    }

    pub fn global_names(&self) -> Vec<&str> {
        self.global.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub(crate) fn named(&self, name: &str) -> Option<&ScopeFn> {
        self.named.get(&scope_name(name))
    }

    pub(crate) fn globals(&self) -> impl Iterator<Item = (&str, &ScopeFn)> {
        self.global.iter().map(|(name, scope)| (name.as_str(), scope))
    }
}

// ============================================================================
// ScopeRegistry
// ============================================================================

/// Per-database store of every model's [`ScopeSet`].
///
/// A model's set is booted from [`Model::boot`] the first time it is needed.
#[derive(Default)]
pub struct ScopeRegistry {
    sets: RwLock<HashMap<TypeId, Arc<ScopeSet>>>,
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let booted = self.sets.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("ScopeRegistry").field("booted_models", &booted).finish()
    }
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the scopes of `M`, booting them if needed.
    pub fn for_model<M: Model>(&self) -> Arc<ScopeSet> {
        if let Some(set) = self.sets.read().unwrap_or_else(PoisonError::into_inner).get(&TypeId::of::<M>()) {
            return set.clone();
        }
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        sets.entry(TypeId::of::<M>()).or_insert_with(|| Arc::new(boot::<M>())).clone()
    }

    /// Defines a named scope for `M` at runtime.
    pub fn define<M, F>(&self, name: &str, scope: F)
    where
        M: Model,
        F: Fn(Query, &[Value]) -> Query + Send + Sync + 'static,
    {
        self.update::<M>(|set| {
            set.define(name, scope);
        });
    }

    /// Registers a global scope for `M` at runtime. Idempotent per name.
    pub fn add_global<M, F>(&self, name: &str, scope: F)
    where
        M: Model,
        F: Fn(Query, &[Value]) -> Query + Send + Sync + 'static,
    {
        self.update::<M>(|set| {
            set.add_global(name, scope);
        });
    }

    fn update<M: Model>(&self, change: impl FnOnce(&mut ScopeSet)) {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let set = sets.entry(TypeId::of::<M>()).or_insert_with(|| Arc::new(boot::<M>()));
        change(Arc::make_mut(set));
    }
}

fn boot<M: Model>() -> ScopeSet {
    let mut set = ScopeSet::default();
    M::boot(&mut set);
    log::debug!("booted scopes for `{}`: {:?}", M::config().table(), set);
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_converted() {
        assert_eq!(scope_name("scopePopular"), "popular");
        assert_eq!(scope_name("Popular"), "popular");
        assert_eq!(scope_name("publishedAfter"), "published_after");
        assert_eq!(scope_name("scope"), "scope");
    }

    #[test]
    fn global_registration_is_idempotent() {
        let mut set = ScopeSet::default();
        set.add_global("published", |q, _| q.equals("published", true));
        set.add_global("Published", |q, _| q.equals("published", true));
        assert_eq!(set.global_names(), vec!["published"]);
    }
}
