//! Change notification for property writes
//!
//! A [`ChangeRouter`] is an explicit per-worker handler table. It cannot
//! leave the thread that created it, so handlers registered by one worker
//! never fire for writes made on another. An observer that needs to see
//! writes from several workers registers on each worker's router.
//!
//! Handlers are keyed by the unbound generic form of a type, so a handler
//! registered for `CArray<CName>` (or `CArray`) sees writes of every
//! `CArray<T>` value.

use crate::class::RedClass;
use crate::registry::TypeRegistry;
use crate::value::RedValue;
use crate::TypeName;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

/// A property write that changed a value
#[derive(Debug)]
pub struct ObjectChanged<'a> {
    /// The object that was written
    pub sender: &'a RedClass,
    /// External name of the written property
    pub red_name: &'a str,
    pub old_value: &'a RedValue,
    pub new_value: &'a RedValue,
}

/// Callback invoked for a changed property
pub type ChangeHandler = Arc<dyn Fn(&ObjectChanged<'_>) + Send + Sync>;

/// Wrap a closure as a [`ChangeHandler`]
pub fn change_handler<F>(f: F) -> ChangeHandler
where
    F: Fn(&ObjectChanged<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-worker table of change handlers
pub struct ChangeRouter<'r> {
    registry: &'r TypeRegistry,
    handlers: HashMap<TypeName, Vec<ChangeHandler>>,
    // Keeps the router on the thread that created it
    _thread_bound: PhantomData<Rc<()>>,
}

impl<'r> ChangeRouter<'r> {
    /// Create an empty router for the current thread
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            _thread_bound: PhantomData,
        }
    }

    /// Register a handler for writes of values of `declared_type`
    ///
    /// Returns `false` and registers nothing if the registry does not
    /// know the type.
    pub fn register_handler(&mut self, declared_type: &TypeName, handler: ChangeHandler) -> bool {
        if !self.registry.is_red_type(declared_type) {
            return false;
        }
        self.handlers
            .entry(declared_type.normalized())
            .or_default()
            .push(handler);
        true
    }

    /// Remove a previously registered handler
    ///
    /// Handlers are matched by identity. Removing a handler that was never
    /// registered does nothing; `false` is only returned for unknown types.
    pub fn remove_handler(&mut self, declared_type: &TypeName, handler: &ChangeHandler) -> bool {
        if !self.registry.is_red_type(declared_type) {
            return false;
        }
        let key = declared_type.normalized();
        if let Some(list) = self.handlers.get_mut(&key) {
            if let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) {
                list.remove(pos);
            }
            if list.is_empty() {
                self.handlers.remove(&key);
            }
        }
        true
    }

    /// Number of handlers registered for a type
    pub fn handler_count(&self, declared_type: &TypeName) -> usize {
        self.handlers
            .get(&declared_type.normalized())
            .map_or(0, Vec::len)
    }

    /// Notify handlers about a write, returning how many were invoked
    ///
    /// The key is the runtime type of the new value, or of the old value
    /// when the new one is null. Nothing fires if the value is unchanged.
    pub(crate) fn dispatch(
        &self,
        sender: &RedClass,
        red_name: &str,
        old_value: &RedValue,
        new_value: &RedValue,
    ) -> usize {
        let Some(red_type) = new_value.red_type().or_else(|| old_value.red_type()) else {
            return 0;
        };
        let Some(handlers) = self.handlers.get(&red_type.normalized()) else {
            return 0;
        };
        if old_value == new_value {
            return 0;
        }

        trace!(
            "Dispatching change of {}.{} to {} handlers",
            sender.class_type(),
            red_name,
            handlers.len()
        );
        let event = ObjectChanged {
            sender,
            red_name,
            old_value,
            new_value,
        };
        for handler in handlers {
            handler(&event);
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClassDecl, PropertyInfo};
    use crate::value::{ArrayKind, RedArray};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry
            .register(
                ClassDecl::new("gameStats")
                    .with_property(PropertyInfo::new("Health", "health", "CInt32"))
                    .with_property(PropertyInfo::new("Tags", "tags", "CArray<CName>")),
            )
            .unwrap();
        registry
    }

    type Log = Arc<Mutex<Vec<(String, RedValue, RedValue)>>>;

    fn recorder() -> (ChangeHandler, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let handler = change_handler(move |e| {
            sink.lock().push((
                e.red_name.to_string(),
                e.old_value.clone(),
                e.new_value.clone(),
            ));
        });
        (handler, log)
    }

    #[test]
    fn test_fires_only_on_change() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        assert!(router.register_handler(&TypeName::new("CInt32"), handler));

        let mut stats = RedClass::new("gameStats");
        stats.init_class(&registry);

        stats.set_notify("health", 0i32, &router);
        assert!(log.lock().is_empty());

        stats.set_notify("health", 100i32, &router);
        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![("health".to_string(), RedValue::Int32(0), RedValue::Int32(100))]
        );
    }

    #[test]
    fn test_plain_set_does_not_notify() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        router.register_handler(&TypeName::new("CInt32"), handler);

        let mut stats = RedClass::new("gameStats");
        stats.set("health", 5i32);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_only_matching_type_fires() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        router.register_handler(&TypeName::new("CFloat"), handler);

        let mut stats = RedClass::new("gameStats");
        stats.set_notify("health", 3i32, &router);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_generic_types_share_handlers() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        assert!(router.register_handler(&TypeName::new("CArray<CName>"), handler));
        assert_eq!(router.handler_count(&TypeName::new("CArray")), 1);
        assert_eq!(router.handler_count(&TypeName::new("CArray<CInt32>")), 1);

        let mut stats = RedClass::new("gameStats");
        let mut values = RedArray::new(ArrayKind::Dynamic, "CInt32");
        values.push(1i32).unwrap();
        stats.set_notify("values", values, &router);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_null_write_keys_on_old_value() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        router.register_handler(&TypeName::new("CInt32"), handler);

        let mut stats = RedClass::new("gameStats");
        stats.set("health", 10i32);
        stats.set_notify("health", RedValue::Null, &router);
        assert_eq!(log.lock()[0].2, RedValue::Null);

        stats.set_notify("health", RedValue::Null, &router);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, _) = recorder();
        assert!(!router.register_handler(&TypeName::new("NotARedType"), Arc::clone(&handler)));
        assert!(!router.remove_handler(&TypeName::new("NotARedType"), &handler));
        assert!(router.register_handler(&TypeName::new("gameStats"), handler));
    }

    #[test]
    fn test_remove_handler() {
        let registry = registry();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        let (other, _) = recorder();
        let int = TypeName::new("CInt32");

        // removing something never registered is a no-op
        assert!(router.remove_handler(&int, &other));

        router.register_handler(&int, Arc::clone(&handler));
        router.register_handler(&int, Arc::clone(&other));
        assert!(router.remove_handler(&int, &other));
        assert_eq!(router.handler_count(&int), 1);
        assert!(router.remove_handler(&int, &handler));
        assert_eq!(router.handler_count(&int), 0);

        let mut stats = RedClass::new("gameStats");
        stats.set_notify("health", 1i32, &router);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_routers_are_isolated_per_thread() {
        let registry = Arc::new(registry());
        let fired = Arc::new(AtomicUsize::new(0));

        let mut router = ChangeRouter::new(&registry);
        let counter = Arc::clone(&fired);
        let handler = change_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        router.register_handler(&TypeName::new("CInt32"), Arc::clone(&handler));

        let worker_registry = Arc::clone(&registry);
        thread::spawn(move || {
            let worker_router = ChangeRouter::new(&worker_registry);
            let mut stats = RedClass::new("gameStats");
            stats.set_notify("health", 50i32, &worker_router);
        })
        .join()
        .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // the same observer registered on the worker's own router does fire
        let worker_registry = Arc::clone(&registry);
        thread::spawn(move || {
            let mut worker_router = ChangeRouter::new(&worker_registry);
            worker_router.register_handler(&TypeName::new("CInt32"), handler);
            let mut stats = RedClass::new("gameStats");
            stats.set_notify("health", 50i32, &worker_router);
        })
        .join()
        .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let mut stats = RedClass::new("gameStats");
        stats.set_notify("health", 7i32, &router);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_nested_class_change_uses_structural_equality() {
        let mut registry = registry();
        registry
            .register(
                ClassDecl::new("Wrapper")
                    .with_property(PropertyInfo::new("Stats", "stats", "gameStats")),
            )
            .unwrap();
        let mut router = ChangeRouter::new(&registry);
        let (handler, log) = recorder();
        router.register_handler(&TypeName::new("gameStats"), handler);

        let mut wrapper = RedClass::new("Wrapper");
        wrapper.init_class(&registry);
        let same = wrapper.try_get("stats").unwrap().deep_copy();
        wrapper.set_notify("stats", same, &router);
        assert!(log.lock().is_empty());

        let mut changed = RedClass::new("gameStats");
        changed.init_class(&registry);
        changed.set("health", 1i32);
        wrapper.set_notify("stats", changed, &router);
        assert_eq!(log.lock().len(), 1);
    }
}
