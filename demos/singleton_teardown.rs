//! Singletons deleted at shutdown.
//!
//! Demonstrates:
//! - `ShutdownSingleton` statics created on first use
//! - A singleton that depends on another one being deleted before it
//! - A destructor that panics without stopping the sweep
//! - Watching the sweep through the trace callback
//!
//! Run with: `cargo run --example singleton_teardown`

use shutdown_registry::{set_trace_callback, teardown_all, ShutdownSingleton};
use std::sync::Arc;

struct DeviceManager;

impl Drop for DeviceManager {
    fn drop(&mut self) {
        println!("   closing audio devices");
    }
}

struct Mixer {
    _devices: Arc<DeviceManager>,
}

impl Drop for Mixer {
    fn drop(&mut self) {
        println!("   stopping mixer");
    }
}

struct PluginHost;

impl Drop for PluginHost {
    fn drop(&mut self) {
        panic!("plugin refused to unload");
    }
}

static DEVICES: ShutdownSingleton<DeviceManager> = ShutdownSingleton::new();
static MIXER: ShutdownSingleton<Mixer> = ShutdownSingleton::new();
static PLUGINS: ShutdownSingleton<PluginHost> = ShutdownSingleton::new();

fn mixer() -> Arc<Mixer> {
    MIXER.get_or_init(|| Mixer {
        _devices: DEVICES.get_or_init(|| DeviceManager),
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== shutdown-registry: Singletons ===\n");

    set_trace_callback(|event| println!("   [shutdown-trace] {}", event));

    println!("1. Creating singletons...");
    PLUGINS.get_or_init(|| PluginHost);
    let _ = mixer();

    println!("\n2. Shutting down...");
    let report = teardown_all();

    println!("\n3. Report");
    println!("   destroyed: {}", report.destroyed.len());
    for failure in &report.failures {
        println!("   failed: {}", failure);
    }
}
