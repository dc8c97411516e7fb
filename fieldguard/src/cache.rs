//! Process-wide plan cache keyed by `TypeId`.
//!
//! Plans are compiled on first request and kept for the life of the process.
//! Readers share a read lock; a miss takes the write lock and re-checks
//! before compiling, so concurrent first uses compile once.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use once_cell::sync::Lazy;

use crate::{error::CompileError, plan::TypePlans, schema::Guarded};

type PlanMap = HashMap<TypeId, Arc<TypePlans>>;

static PLAN_CACHE: Lazy<RwLock<PlanMap>> = Lazy::new(|| RwLock::new(PlanMap::new()));

/// Returns the shared plans for `T`, compiling them on first use.
///
/// Compilation failures are not cached.
pub(crate) fn plans_for<T: Guarded>() -> Result<Arc<TypePlans>, CompileError> {
    let type_id = TypeId::of::<T>();
    {
        let cache = PLAN_CACHE.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(plans) = cache.get(&type_id) {
            return Ok(Arc::clone(plans));
        }
    }

    let mut cache = PLAN_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(plans) = cache.get(&type_id) {
        return Ok(Arc::clone(plans));
    }
    let plans = Arc::new(TypePlans::compile(&T::schema())?);
    cache.insert(type_id, Arc::clone(&plans));
    Ok(plans)
}

/// Number of record types with compiled plans.
#[must_use]
pub fn plan_cache_len() -> usize {
    PLAN_CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}

/// Drops every compiled plan. Existing processors keep their plans.
///
/// For test isolation only.
#[cfg(any(test, feature = "testing"))]
pub fn reset_plan_cache() {
    PLAN_CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;
    use crate::{
        boundary::Action,
        schema::{FieldAccess, FieldMeta, FieldSlot, RawDirective, Schema, Shape},
    };

    // Tests that reset the cache must not interleave. Other modules may add
    // entries concurrently, so assertions look at specific types only.
    static CACHE_LOCK: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        CACHE_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached<T: Guarded>() -> bool {
        PLAN_CACHE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    #[derive(Clone)]
    struct Token {
        value: String,
    }

    impl FieldAccess for Token {
        fn field_mut(&mut self, index: usize) -> Option<FieldSlot<'_>> {
            match index {
                0 => Some(FieldSlot::Text(&mut self.value)),
                _ => None,
            }
        }
    }

    impl Guarded for Token {
        fn schema() -> Schema {
            Schema::new::<Self>(
                "Token",
                vec![FieldMeta::leaf(0, "value", Shape::Text, vec![RawDirective::new(Action::Hash, "sha256")])],
            )
        }
    }

    #[derive(Clone)]
    struct Broken;

    impl FieldAccess for Broken {
        fn field_mut(&mut self, _index: usize) -> Option<FieldSlot<'_>> {
            None
        }
    }

    impl Guarded for Broken {
        fn schema() -> Schema {
            Schema::new::<Self>(
                "Broken",
                vec![FieldMeta::leaf(0, "value", Shape::Text, vec![RawDirective::new(Action::Hash, "md5")])],
            )
        }
    }

    #[test]
    fn plans_are_compiled_once_and_shared() {
        let _guard = serial();
        reset_plan_cache();

        let first = plans_for::<Token>().unwrap();
        let second = plans_for::<Token>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cached::<Token>());
        assert!(plan_cache_len() >= 1);
    }

    #[test]
    fn reset_forces_recompilation() {
        let _guard = serial();
        reset_plan_cache();

        let first = plans_for::<Token>().unwrap();
        reset_plan_cache();
        assert!(!cached::<Token>());
        let second = plans_for::<Token>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn failures_are_not_cached() {
        let _guard = serial();
        reset_plan_cache();

        assert!(plans_for::<Broken>().is_err());
        assert!(!cached::<Broken>());
    }

    #[test]
    fn concurrent_first_use_compiles_one_bundle() {
        let _guard = serial();
        reset_plan_cache();

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| plans_for::<Token>().unwrap()))
            .collect();
        let bundles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for bundle in &bundles[1..] {
            assert!(Arc::ptr_eq(&bundles[0], bundle));
        }
    }
}
