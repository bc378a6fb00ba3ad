//! Macros for declaring isolated shutdown registries.

/// Declares a module holding its own static shutdown registry.
///
/// The macro generates a module containing:
/// - A private `static` [`ShutdownRegistry`](crate::ShutdownRegistry)
/// - `registry()` returning it
/// - Free functions mirroring the process-wide ones
///
/// # Examples
///
/// ```rust
/// use shutdown_registry::define_shutdown_registry;
/// use std::sync::{Arc, Mutex};
///
/// define_shutdown_registry!(audio);
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let (a, b) = (log.clone(), log.clone());
/// audio::register(move || a.lock().unwrap().push("device manager"));
/// audio::register(move || b.lock().unwrap().push("mixer"));
///
/// audio::teardown_all();
/// assert_eq!(*log.lock().unwrap(), ["mixer", "device manager"]);
/// ```
///
/// # Multiple Registries
///
/// Each invocation is completely isolated:
///
/// ```rust
/// use shutdown_registry::define_shutdown_registry;
///
/// define_shutdown_registry!(plugins);
/// define_shutdown_registry!(services);
///
/// let handle = plugins::register(|| {});
/// assert!(plugins::contains(handle));
/// assert!(services::registry().is_empty());
/// ```
#[macro_export]
macro_rules! define_shutdown_registry {
    ($name:ident) => {
        pub mod $name {
            // Storage for tracked objects (module-private)
            static REGISTRY: $crate::ShutdownRegistry = $crate::ShutdownRegistry::new();

            /// The registry declared by this module.
            pub fn registry() -> &'static $crate::ShutdownRegistry {
                &REGISTRY
            }

            /// Register an object for deletion at shutdown.
            pub fn register<D: $crate::Destroy>(destroy: D) -> $crate::TrackedHandle {
                REGISTRY.register(destroy)
            }

            /// Register an object and return its RAII token.
            pub fn track<D: $crate::Destroy>(destroy: D) -> $crate::Registration {
                REGISTRY.track(destroy)
            }

            /// Remove an object from the registry.
            pub fn deregister(handle: $crate::TrackedHandle) -> bool {
                REGISTRY.deregister(handle)
            }

            /// Check whether an object is still registered.
            pub fn contains(handle: $crate::TrackedHandle) -> bool {
                REGISTRY.contains(handle)
            }

            /// Delete every registered object, newest first.
            pub fn teardown_all() -> $crate::TeardownReport {
                REGISTRY.teardown_all()
            }

            /// Set a tracing callback for registry operations.
            pub fn set_trace_callback(
                callback: impl Fn(&$crate::ShutdownEvent) + Send + Sync + 'static,
            ) {
                REGISTRY.set_trace_callback(callback)
            }

            /// Clear the tracing callback.
            pub fn clear_trace_callback() {
                REGISTRY.clear_trace_callback()
            }
        }
    };
}
