//! # Shutdown Registry
//!
//! A process-wide list of long-lived objects that must all be deleted at one
//! well-defined point during shutdown, newest first, instead of relying on
//! the order in which statics happen to go away.
//!
//! Objects register a destroyer when they are created and deregister when
//! they are dropped. At shutdown the host calls [`teardown_all`] once; every
//! object still registered is destroyed in reverse registration order.
//!
//! ## Quick Start
//!
//! ```rust
//! use shutdown_registry::ShutdownSingleton;
//!
//! struct Cache {
//!     entries: usize,
//! }
//!
//! static CACHE: ShutdownSingleton<Cache> = ShutdownSingleton::new();
//!
//! let cache = CACHE.get_or_init(|| Cache { entries: 16 });
//! assert_eq!(cache.entries, 16);
//!
//! // Late in shutdown:
//! let report = shutdown_registry::teardown_all();
//! assert!(report.is_clean());
//! assert!(!CACHE.is_initialized());
//! ```
//!
//! ## Features
//!
//! - **Re-entrant teardown**: destroyers may create or delete other tracked
//!   objects; the sweep works on a snapshot and re-checks each entry first
//! - **Fault containment**: a panicking destroyer is recorded and the sweep continues
//! - **Static-friendly**: registries and singletons are `const`-constructible
//! - **Isolated registries**: [`define_shutdown_registry!`] or a plain
//!   `static ShutdownRegistry` for tests and subsystems
//! - **Observability**: `tracing` logs plus an optional per-registry event callback
//!
//! ## Main Functions
//!
//! - [`register`] / [`track`] - Add an object to the process-wide registry
//! - [`deregister`] - Remove it again (idempotent)
//! - [`teardown_all`] - Delete everything, newest first
//! - [`set_trace_callback`] - Observe registry events

mod macros;
mod registration;
mod registry;
mod registry_error;
mod registry_event;
mod singleton;

pub use registration::Registration;
pub use registry::{
    clear_trace_callback, contains, deregister, global, register, set_trace_callback,
    teardown_all, track, Destroy, ShutdownRegistry, TraceCallback, TrackedHandle,
};
pub use registry_error::{DestroyFailure, TeardownError, TeardownReport};
pub use registry_event::ShutdownEvent;
pub use singleton::ShutdownSingleton;
