//! Basic usage example for shutdown-registry.
//!
//! Demonstrates:
//! - Tracking long-lived objects with a `Registration`
//! - Destroying one of them early
//! - Deleting the rest, newest first, with `teardown_all()`
//! - Reading the `TeardownReport`
//!
//! Run with: `cargo run --example basic_shutdown`
//! (set `RUST_LOG=debug` to see the registry's own log lines)

use shutdown_registry::{define_shutdown_registry, Registration};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Create an isolated registry for this example
define_shutdown_registry!(app);

type Services = Arc<Mutex<HashMap<&'static str, Service>>>;

struct Service {
    name: &'static str,
    _registration: Registration,
}

impl Drop for Service {
    fn drop(&mut self) {
        println!("   dropping {}", self.name);
    }
}

fn start(services: &Services, name: &'static str) {
    let weak = Arc::downgrade(services);
    let registration = app::track(move || {
        if let Some(services) = weak.upgrade() {
            let taken = services.lock().unwrap().remove(name);
            drop(taken);
        }
    });

    println!("   started {} as {}", name, registration.handle());
    services.lock().unwrap().insert(
        name,
        Service {
            name,
            _registration: registration,
        },
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== shutdown-registry: Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Start services in dependency order
    // -------------------------------------------------------------------------
    println!("1. Starting services...");

    let services: Services = Arc::new(Mutex::new(HashMap::new()));
    for name in ["config", "database", "metrics", "http"] {
        start(&services, name);
    }

    // -------------------------------------------------------------------------
    // 2. Stop one service early
    // -------------------------------------------------------------------------
    println!("\n2. Stopping metrics early...");

    let taken = services.lock().unwrap().remove("metrics");
    drop(taken);
    println!("   registry now tracks {} objects", app::registry().len());

    // -------------------------------------------------------------------------
    // 3. Shut down
    // -------------------------------------------------------------------------
    println!("\n3. Deleting everything at shutdown...");

    let report = app::teardown_all();

    println!("\n   destroyed: {:?}", report.destroyed);
    println!("   clean: {}", report.is_clean());

    match report.into_result() {
        Ok(_) => println!("\n=== Done ==="),
        Err(err) => println!("\n=== Shutdown problem: {} ===", err),
    }
}
