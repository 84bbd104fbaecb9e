//! Shared helpers for integration tests.
//!
//! Store selection and scheduling defaults are read from process-wide
//! environment variables (`REPOSITORY_TYPE`, `DATABASE_URL`,
//! `DEFAULT_BOOKING_MINUTES`, ...). Tests in one binary run in parallel, so
//! every test that touches those variables goes through
//! [`with_scoped_env`], which holds one global lock for the duration.

use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with the given variables set (`Some`) or removed (`None`), then
/// put the previous values back, also when `f` panics.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // A panicking test poisons the lock; the guard below has already
    // restored the environment by then.
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _restore = EnvRestore::apply(changes);
    f()
}

/// Previous values of the variables a test changed, restored on drop.
struct EnvRestore {
    saved: Vec<(String, Option<String>)>,
}

impl EnvRestore {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let mut saved: Vec<(String, Option<String>)> = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            if !saved.iter().any(|(k, _)| k == key) {
                saved.push((key.to_string(), std::env::var(key).ok()));
            }
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
