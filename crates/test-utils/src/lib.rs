pub mod builders;
pub mod fake_service;

use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::{fmt, EnvFilter};

use stageflow::{Deferred, Result};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=stageflow=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Perform a deferred and return its result, which must be available
/// synchronously.
pub fn resolve_now<T: Send + 'static>(deferred: Deferred<T>) -> Result<T> {
    try_resolve_now(deferred).expect("deferred did not resolve synchronously")
}

/// Perform a deferred; `None` if it did not resolve before `perform` returned.
pub fn try_resolve_now<T: Send + 'static>(deferred: Deferred<T>) -> Option<Result<T>> {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    deferred.perform(move |result| *sink.lock().unwrap() = Some(result));
    let result = slot.lock().unwrap().take();
    result
}

/// Perform a deferred and keep a handle on where the result will land.
pub fn capture<T: Send + 'static>(deferred: Deferred<T>) -> Arc<Mutex<Option<Result<T>>>> {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    deferred.perform(move |result| *sink.lock().unwrap() = Some(result));
    slot
}
