use std::fmt;

use crate::{ShutdownRegistry, TrackedHandle};

/// Membership of one object in a shutdown registry.
///
/// Returned by [`ShutdownRegistry::track`]. Keep it as a field of the tracked
/// object: when the object is dropped, whether by user code or by its
/// destroyer during `teardown_all`, the registration drops with it and the
/// entry is removed.
///
/// ```
/// use shutdown_registry::{Registration, ShutdownRegistry};
///
/// static REGISTRY: ShutdownRegistry = ShutdownRegistry::new();
///
/// struct Connection {
///     _registration: Registration,
/// }
///
/// let conn = Connection { _registration: REGISTRY.track(|| {}) };
/// assert_eq!(REGISTRY.len(), 1);
///
/// drop(conn);
/// assert!(REGISTRY.is_empty());
/// ```
#[must_use = "dropping a Registration deregisters the object immediately"]
pub struct Registration {
    registry: &'static ShutdownRegistry,
    handle: TrackedHandle,
}

impl Registration {
    pub(crate) fn new(registry: &'static ShutdownRegistry, handle: TrackedHandle) -> Self {
        Registration { registry, handle }
    }

    pub fn handle(&self) -> TrackedHandle {
        self.handle
    }

    /// `false` once the sweep or a `clear` has already removed the entry.
    pub fn is_registered(&self) -> bool {
        self.registry.contains(self.handle)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.handle);
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_deregisters() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();

        let registration = REG.track(|| {});
        let handle = registration.handle();
        assert!(registration.is_registered());
        assert!(REG.contains(handle));

        drop(registration);
        assert!(!REG.contains(handle));
    }

    #[test]
    fn test_drop_after_clear_is_noop() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();

        let registration = REG.track(|| {});
        let other = REG.track(|| {});
        REG.clear();
        assert!(!registration.is_registered());

        let late = REG.track(|| {});
        drop(registration);
        drop(other);
        assert_eq!(REG.handles(), vec![late.handle()]);
    }

    #[test]
    fn test_debug_format() {
        static REG: ShutdownRegistry = ShutdownRegistry::new();

        let registration = REG.track(|| {});
        assert_eq!(
            format!("{:?}", registration),
            "Registration { handle: TrackedHandle(1) }"
        );
    }
}
