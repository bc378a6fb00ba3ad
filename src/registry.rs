//! The shutdown registry: a list of live objects that are deleted, newest
//! first, when the host calls [`ShutdownRegistry::teardown_all`].
//!
//! Objects register a destroyer when they are created and deregister when they
//! are dropped, whichever way that happens. The registry never owns the
//! objects themselves.
//!
//! # Examples
//!
//! ```
//! use shutdown_registry::ShutdownRegistry;
//! use std::sync::{Arc, Mutex};
//!
//! static REGISTRY: ShutdownRegistry = ShutdownRegistry::new();
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! for name in ["config", "database", "cache"] {
//!     let log = log.clone();
//!     REGISTRY.register(move || log.lock().unwrap().push(name));
//! }
//!
//! let report = REGISTRY.teardown_all();
//! assert_eq!(*log.lock().unwrap(), ["cache", "database", "config"]);
//! assert_eq!(report.destroyed.len(), 3);
//! ```

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use crate::{DestroyFailure, Registration, ShutdownEvent, TeardownReport};

/// Opaque identity of one tracked object within a registry.
///
/// Handles are allocated from a per-registry counter starting at 1 and are
/// never reused, so a stale handle can never alias a newer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackedHandle(u64);

impl TrackedHandle {
    /// Rebuilds a handle from its raw value (tests, diagnostics).
    pub const fn from_raw(raw: u64) -> Self {
        TrackedHandle(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The "destroy yourself" capability of a tracked object.
///
/// Called at most once per registration, by `teardown_all`. The entry is
/// already out of the registry when `destroy` runs, so dropping the object's
/// [`Registration`] from inside it is harmless.
pub trait Destroy: Send + Sync + 'static {
    fn destroy(&self);
}

impl<F> Destroy for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn destroy(&self) {
        self()
    }
}

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a `ShutdownEvent` every time the
/// registry changes or the sweep makes progress. It is invoked without any of
/// the registry's locks held.
pub type TraceCallback = dyn Fn(&ShutdownEvent) + Send + Sync + 'static;

#[derive(Clone)]
struct Entry {
    handle: TrackedHandle,
    type_name: &'static str,
    destroy: Arc<dyn Destroy>,
}

/// A registry of objects to delete at shutdown.
///
/// `new` is `const`, so a registry can sit in a `static` and be used from
/// any point of the program's life, including before `main`.
pub struct ShutdownRegistry {
    entries: Mutex<Vec<Entry>>,
    next_handle: AtomicU64,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl ShutdownRegistry {
    pub const fn new() -> Self {
        ShutdownRegistry {
            entries: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            trace: Mutex::new(None),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Tracing
    // ---------------------------------------------------------------------------------------------

    /// Sets a tracing callback for this registry, replacing any previous one.
    ///
    /// # Lock Poisoning Recovery
    ///
    /// If the trace lock is poisoned, the inner value is recovered; tracing is
    /// non-critical and replacing the callback is idempotent.
    pub fn set_trace_callback(&self, callback: impl Fn(&ShutdownEvent) + Send + Sync + 'static) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    /// Clears the tracing callback.
    pub fn clear_trace_callback(&self) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    fn emit_event(&self, event: ShutdownEvent) {
        // Cloned out so the callback may use this registry.
        let callback = self
            .trace
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();

        if let Some(callback) = callback {
            callback(&event);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------------------------------

    // A destroyer that panicked may have poisoned the lock; the list itself is
    // never left half-modified, so the poison is ignored.
    fn lock_entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Registers an object for deletion at shutdown and returns its handle.
    ///
    /// The caller is responsible for calling [`deregister`](Self::deregister)
    /// when the object goes away; [`track`](Self::track) does that
    /// automatically.
    pub fn register<D: Destroy>(&self, destroy: D) -> TrackedHandle {
        self.register_arc(std::any::type_name::<D>(), Arc::new(destroy))
    }

    pub(crate) fn register_arc(
        &self,
        type_name: &'static str,
        destroy: Arc<dyn Destroy>,
    ) -> TrackedHandle {
        let handle = {
            let mut entries = self.lock_entries();
            // Allocated under the lock so list order and handle order agree.
            let handle = TrackedHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
            entries.push(Entry {
                handle,
                type_name,
                destroy,
            });
            handle
        };

        tracing::debug!(%handle, type_name, "registered for shutdown");
        self.emit_event(ShutdownEvent::Register { handle, type_name });

        handle
    }

    /// Registers an object and returns a token that deregisters it when dropped.
    ///
    /// Embed the returned [`Registration`] in the tracked object so that
    /// dropping the object, by user code or by the destroyer, removes it.
    pub fn track<D: Destroy>(&'static self, destroy: D) -> Registration {
        let handle = self.register(destroy);
        Registration::new(self, handle)
    }

    pub(crate) fn track_arc(
        &'static self,
        type_name: &'static str,
        destroy: Arc<dyn Destroy>,
    ) -> Registration {
        let handle = self.register_arc(type_name, destroy);
        Registration::new(self, handle)
    }

    /// Removes the first entry matching `handle`, keeping the order of the rest.
    ///
    /// Returns `false` if the handle is not registered, which is expected when
    /// the object is being destroyed by [`teardown_all`](Self::teardown_all)
    /// or after [`clear`](Self::clear).
    pub fn deregister(&self, handle: TrackedHandle) -> bool {
        let found = self.remove_entry(handle).is_some();

        tracing::debug!(%handle, found, "deregistered");
        self.emit_event(ShutdownEvent::Deregister { handle, found });

        found
    }

    // The removed entry is returned so its destroyer drops outside the lock.
    fn remove_entry(&self, handle: TrackedHandle) -> Option<Entry> {
        let mut entries = self.lock_entries();
        let index = entries.iter().position(|e| e.handle == handle)?;
        Some(entries.remove(index))
    }

    /// Checks whether `handle` is still registered.
    pub fn contains(&self, handle: TrackedHandle) -> bool {
        self.lock_entries().iter().any(|e| e.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Registered handles, oldest first.
    pub fn handles(&self) -> Vec<TrackedHandle> {
        self.lock_entries().iter().map(|e| e.handle).collect()
    }

    /// Destroys every registered object, newest first.
    ///
    /// The entry list is copied up front, so destroyers may register or
    /// deregister objects freely. Before each destroyer runs the entry is
    /// looked up in the live list and removed from it; objects already
    /// destroyed as a side effect of an earlier destroyer are skipped. A
    /// panicking destroyer is recorded in the report and does not stop the
    /// sweep.
    ///
    /// Objects registered during the sweep are not destroyed by it. They are
    /// logged as a warning, listed in [`TeardownReport::residual`] and dropped
    /// from the registry.
    ///
    /// Call this once, late in shutdown. Concurrent calls are not supported.
    pub fn teardown_all(&self) -> TeardownReport {
        let snapshot: Vec<Entry> = self.lock_entries().clone();
        let mut report = TeardownReport::default();

        tracing::info!(count = snapshot.len(), "deleting objects at shutdown");
        self.emit_event(ShutdownEvent::TeardownBegin {
            count: snapshot.len(),
        });

        for entry in snapshot.iter().rev() {
            let handle = entry.handle;

            // Checking and removing under one lock means no other path can
            // destroy this entry again; the destroyer's own deregister is a no-op.
            if self.remove_entry(handle).is_none() {
                tracing::debug!(%handle, "already deleted, skipping");
                self.emit_event(ShutdownEvent::Skip { handle });
                report.skipped.push(handle);
                continue;
            }

            tracing::debug!(%handle, type_name = entry.type_name, "deleting");
            self.emit_event(ShutdownEvent::Destroy {
                handle,
                type_name: entry.type_name,
            });

            match panic::catch_unwind(AssertUnwindSafe(|| entry.destroy.destroy())) {
                Ok(()) => report.destroyed.push(handle),
                Err(payload) => {
                    let failure = DestroyFailure::from_panic(handle, entry.type_name, payload);
                    tracing::warn!(
                        %handle,
                        type_name = entry.type_name,
                        message = %failure.message,
                        "destroyer panicked during shutdown"
                    );
                    self.emit_event(ShutdownEvent::DestroyFailed {
                        handle,
                        type_name: entry.type_name,
                        message: failure.message.clone(),
                    });
                    report.failures.push(failure);
                }
            }
        }

        // The snapshot holds the last references to some destroyers.
        drop(snapshot);

        let residual = std::mem::take(&mut *self.lock_entries());
        report.residual = residual.iter().map(|e| e.handle).collect();

        if !report.residual.is_empty() {
            tracing::warn!(
                count = report.residual.len(),
                handles = ?report.residual,
                "objects were registered during shutdown and survived it"
            );
        }

        // Destroyers of residual entries drop outside the lock.
        drop(residual);

        tracing::info!(
            destroyed = report.destroyed.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            residual = report.residual.len(),
            "shutdown deletion finished"
        );
        self.emit_event(ShutdownEvent::TeardownEnd {
            destroyed: report.destroyed.len(),
            skipped: report.skipped.len(),
            failed: report.failures.len(),
            residual: report.residual.len(),
        });

        report
    }

    /// Forgets every entry without destroying anything.
    ///
    /// This method is primarily intended for testing. Objects that are still
    /// alive keep their [`Registration`]; dropping it later is a no-op.
    #[doc(hidden)]
    pub fn clear(&self) {
        self.emit_event(ShutdownEvent::Clear {});

        let entries = std::mem::take(&mut *self.lock_entries());
        drop(entries);
    }
}

impl Default for ShutdownRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownRegistry")
            .field("handles", &self.handles())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Process-wide registry
// -------------------------------------------------------------------------------------------------

static GLOBAL: ShutdownRegistry = ShutdownRegistry::new();

/// The process-wide registry used by the free functions and by
/// [`ShutdownSingleton::get_or_init`](crate::ShutdownSingleton::get_or_init).
pub fn global() -> &'static ShutdownRegistry {
    &GLOBAL
}

/// Registers an object in the process-wide registry.
pub fn register<D: Destroy>(destroy: D) -> TrackedHandle {
    GLOBAL.register(destroy)
}

/// Registers an object in the process-wide registry and returns its RAII token.
pub fn track<D: Destroy>(destroy: D) -> Registration {
    GLOBAL.track(destroy)
}

/// Removes an object from the process-wide registry.
pub fn deregister(handle: TrackedHandle) -> bool {
    GLOBAL.deregister(handle)
}

/// Checks whether `handle` is registered in the process-wide registry.
pub fn contains(handle: TrackedHandle) -> bool {
    GLOBAL.contains(handle)
}

/// Deletes every object in the process-wide registry, newest first.
///
/// Call once from the host, after the last piece of application work and
/// before the process exits.
pub fn teardown_all() -> TeardownReport {
    GLOBAL.teardown_all()
}

/// Sets a tracing callback on the process-wide registry.
pub fn set_trace_callback(callback: impl Fn(&ShutdownEvent) + Send + Sync + 'static) {
    GLOBAL.set_trace_callback(callback)
}

/// Clears the tracing callback of the process-wide registry.
pub fn clear_trace_callback() {
    GLOBAL.clear_trace_callback()
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
