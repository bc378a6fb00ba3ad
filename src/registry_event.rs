use crate::TrackedHandle;

/// Events emitted by a shutdown registry.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use shutdown_registry::{ShutdownEvent, TrackedHandle};
///
/// let event = ShutdownEvent::Skip { handle: TrackedHandle::from_raw(3) };
/// assert_eq!(event.to_string(), "skip { handle: #3 }");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownEvent {
    /// An object was registered for deletion at shutdown.
    Register {
        handle: TrackedHandle,
        /// Type name of the destroyer (or the singleton's value type).
        type_name: &'static str,
    },

    /// An object removed itself from the registry.
    Deregister {
        handle: TrackedHandle,
        /// Whether the handle was still present
        found: bool,
    },

    /// `teardown_all` took its snapshot.
    TeardownBegin {
        /// Number of entries in the snapshot
        count: usize,
    },

    /// A snapshot entry was already gone when the sweep reached it.
    Skip { handle: TrackedHandle },

    /// A live entry is about to be destroyed.
    Destroy {
        handle: TrackedHandle,
        type_name: &'static str,
    },

    /// Destroying an entry panicked; the sweep carried on.
    DestroyFailed {
        handle: TrackedHandle,
        type_name: &'static str,
        message: String,
    },

    /// `teardown_all` finished.
    TeardownEnd {
        destroyed: usize,
        skipped: usize,
        failed: usize,
        /// Entries still registered after the sweep (registered during it)
        residual: usize,
    },

    /// The registry was cleared without destroying anything.
    Clear {},
}

impl std::fmt::Display for ShutdownEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownEvent::Register { handle, type_name } => {
                write!(f, "register {{ handle: {}, type_name: {} }}", handle, type_name)
            }
            ShutdownEvent::Deregister { handle, found } => {
                write!(f, "deregister {{ handle: {}, found: {} }}", handle, found)
            }
            ShutdownEvent::TeardownBegin { count } => {
                write!(f, "teardown begin {{ count: {} }}", count)
            }
            ShutdownEvent::Skip { handle } => write!(f, "skip {{ handle: {} }}", handle),
            ShutdownEvent::Destroy { handle, type_name } => {
                write!(f, "destroy {{ handle: {}, type_name: {} }}", handle, type_name)
            }
            ShutdownEvent::DestroyFailed {
                handle,
                type_name,
                message,
            } => write!(
                f,
                "destroy failed {{ handle: {}, type_name: {}, message: {} }}",
                handle, type_name, message
            ),
            ShutdownEvent::TeardownEnd {
                destroyed,
                skipped,
                failed,
                residual,
            } => write!(
                f,
                "teardown end {{ destroyed: {}, skipped: {}, failed: {}, residual: {} }}",
                destroyed, skipped, failed, residual
            ),
            ShutdownEvent::Clear {} => write!(f, "Clearing the Registry"),
        }
    }
}
