//! Lazily created singletons that are deleted at shutdown.
//!
//! A [`ShutdownSingleton`] lives in a `static`. The first `get_or_init` call
//! creates the instance and registers it with a shutdown registry; the sweep
//! later deletes it, newest singleton first. Because `init` runs before the
//! new instance is registered, a singleton that uses another one while being
//! built is registered after it and therefore deleted before it.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{Registration, ShutdownRegistry};

struct Slot<T> {
    instance: Arc<T>,
    _registration: Registration,
}

/// A `static` holder for one instance of `T`, deleted by `teardown_all`.
///
/// # Examples
///
/// ```
/// use shutdown_registry::{ShutdownRegistry, ShutdownSingleton};
///
/// struct Settings {
///     verbose: bool,
/// }
///
/// static REGISTRY: ShutdownRegistry = ShutdownRegistry::new();
/// static SETTINGS: ShutdownSingleton<Settings> = ShutdownSingleton::new();
///
/// let settings = SETTINGS.get_or_init_in(&REGISTRY, || Settings { verbose: true });
/// assert!(settings.verbose);
/// assert_eq!(REGISTRY.len(), 1);
///
/// REGISTRY.teardown_all();
/// assert!(!SETTINGS.is_initialized());
/// ```
pub struct ShutdownSingleton<T> {
    slot: Mutex<Option<Slot<T>>>,
}

impl<T: Send + Sync + 'static> ShutdownSingleton<T> {
    pub const fn new() -> Self {
        ShutdownSingleton {
            slot: Mutex::new(None),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<Slot<T>>> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Returns the instance, creating it and registering it with the
    /// process-wide registry on first use.
    pub fn get_or_init(&'static self, init: impl FnOnce() -> T) -> Arc<T> {
        self.get_or_init_in(crate::global(), init)
    }

    /// Returns the instance, creating it and registering it with `registry`
    /// on first use.
    ///
    /// `init` runs with no lock held, so it may obtain other singletons. When
    /// two threads race, the first instance stored wins and the other one is
    /// dropped.
    pub fn get_or_init_in(
        &'static self,
        registry: &'static ShutdownRegistry,
        init: impl FnOnce() -> T,
    ) -> Arc<T> {
        if let Some(instance) = self.get() {
            return instance;
        }

        let created = Arc::new(init());
        let registration = registry.track_arc(
            std::any::type_name::<T>(),
            Arc::new(move || {
                self.delete_instance();
            }),
        );

        let mut slot = self.lock_slot();
        if let Some(existing) = slot.as_ref() {
            let existing = existing.instance.clone();
            drop(slot);

            tracing::debug!(
                type_name = std::any::type_name::<T>(),
                "lost singleton creation race"
            );
            drop(registration);
            drop(created);
            return existing;
        }

        *slot = Some(Slot {
            instance: created.clone(),
            _registration: registration,
        });

        created
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.lock_slot().as_ref().map(|s| s.instance.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Releases the instance and removes it from its registry.
    ///
    /// Returns `false` if there was no instance. Outstanding `Arc<T>` clones
    /// stay valid; `T` is dropped with the last of them. The instance is
    /// released after the slot lock, so its `Drop` may use this singleton again.
    pub fn delete_instance(&self) -> bool {
        let taken = self.lock_slot().take();
        let existed = taken.is_some();
        drop(taken);
        existed
    }
}

impl<T: Send + Sync + 'static> Default for ShutdownSingleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ShutdownSingleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSingleton")
            .field("type_name", &std::any::type_name::<T>())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_init_once() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();
        static VALUE: ShutdownSingleton<String> = ShutdownSingleton::new();

        let first = VALUE.get_or_init_in(&REG, || "first".to_string());
        let second = VALUE.get_or_init_in(&REG, || "second".to_string());

        assert_eq!(&*first, "first");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(REG.len(), 1);
    }

    #[test]
    fn test_delete_instance_deregisters() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();
        static VALUE: ShutdownSingleton<u32> = ShutdownSingleton::new();

        VALUE.get_or_init_in(&REG, || 7);
        assert!(VALUE.delete_instance());
        assert!(!VALUE.delete_instance());
        assert!(REG.is_empty());
        assert!(VALUE.get().is_none());
    }

    #[test]
    fn test_recreated_after_delete_gets_new_handle() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();
        static VALUE: ShutdownSingleton<u32> = ShutdownSingleton::new();

        VALUE.get_or_init_in(&REG, || 1);
        let first = REG.handles();
        VALUE.delete_instance();

        let value = VALUE.get_or_init_in(&REG, || 2);
        assert_eq!(*value, 2);
        assert_ne!(REG.handles(), first);
        assert_eq!(REG.len(), 1);
    }

    #[test]
    fn test_outstanding_arc_survives_teardown() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();
        static VALUE: ShutdownSingleton<Vec<u8>> = ShutdownSingleton::new();

        let held = VALUE.get_or_init_in(&REG, || vec![1, 2, 3]);
        let report = REG.teardown_all();

        assert_eq!(report.destroyed.len(), 1);
        assert!(report.is_clean());
        assert!(!VALUE.is_initialized());
        assert_eq!(*held, vec![1, 2, 3]);
    }

    #[test]
    fn test_dependency_is_deleted_after_dependent() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();
        static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

        struct Named(&'static str);

        impl Drop for Named {
            fn drop(&mut self) {
                ORDER.lock().unwrap().push(self.0);
            }
        }

        struct Service {
            _database: Arc<Named>,
            _name: Named,
        }

        static DATABASE: ShutdownSingleton<Named> = ShutdownSingleton::new();
        static SERVICE: ShutdownSingleton<Service> = ShutdownSingleton::new();

        SERVICE.get_or_init_in(&REG, || Service {
            _database: DATABASE.get_or_init_in(&REG, || Named("database")),
            _name: Named("service"),
        });

        let report = REG.teardown_all();
        assert_eq!(report.destroyed.len(), 2);
        assert_eq!(*ORDER.lock().unwrap(), vec!["service", "database"]);
    }

    #[test]
    #[serial]
    fn test_get_or_init_uses_global() {
        static VALUE: ShutdownSingleton<i64> = ShutdownSingleton::new();
        crate::global().clear();

        VALUE.get_or_init(|| -5);
        assert_eq!(crate::global().len(), 1);

        crate::teardown_all();
        assert!(!VALUE.is_initialized());
    }

    #[test]
    fn test_debug_format() {
        static VALUE: ShutdownSingleton<u8> = ShutdownSingleton::new();
        assert_eq!(
            format!("{:?}", VALUE),
            "ShutdownSingleton { type_name: \"u8\", initialized: false }"
        );
    }
}
