//! Serialization of read-modify-write sequences on shared parents.
//!
//! Several resources mutate the same remote parent by fetching it, changing an
//! embedded map or list, and writing the whole parent back (project scopes of a
//! deployment freeze, variables of a project). The API offers no optimistic
//! concurrency token, so two such sequences running in parallel would lose one
//! of the writes. Every such sequence runs inside [`MutationGuard::with_lock`].
//!
//! ```
//! use octopus_provider_core::guard::MutationGuard;
//!
//! # tokio_test::block_on(async {
//! let result = MutationGuard::global()
//!     .with_lock(|| async { 40 + 2 })
//!     .await;
//! assert_eq!(result, 42);
//! # });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::Mutex;
use tracing::trace;

static GLOBAL_GUARD: MutationGuard = MutationGuard::new();

/// An exclusive lock around asynchronous critical sections.
///
/// The lock is held by a guard value that lives for the duration of the
/// wrapped future, so it is released on every exit path: normal return,
/// early `?` return, cancellation of the future, and unwinding panics.
#[derive(Debug)]
pub struct MutationGuard {
    lock: Mutex<()>,
}

impl MutationGuard {
    /// Create an independent guard.
    pub const fn new() -> Self {
        Self {
            lock: Mutex::const_new(()),
        }
    }

    /// The process-wide guard shared by all resources.
    pub fn global() -> &'static MutationGuard {
        &GLOBAL_GUARD
    }

    /// Run `f` while holding the lock.
    pub async fn with_lock<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _held = self.lock.lock().await;
        trace!("mutation guard acquired");
        let output = f().await;
        trace!("mutation guard released");
        output
    }
}

impl Default for MutationGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive locks keyed by parent id, created on demand.
///
/// Sequences touching different parents run in parallel; sequences touching
/// the same parent are serialized. A key's entry is dropped once nobody holds
/// or waits for its lock.
#[derive(Debug, Default)]
pub struct KeyedGuard {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// A reference to one key's lock; evicts the entry on drop when it was the last.
struct Lease<'g> {
    guard: &'g KeyedGuard,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut locks = self.guard.map();
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
            trace!(key = %self.key, "keyed guard evicted");
        }
    }
}

impl KeyedGuard {
    /// Create an empty keyed guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = self.lease(key);
        let _held = lease.lock.lock().await;
        trace!(key, "keyed guard acquired");
        f().await
    }

    /// Number of keys currently held or waited for.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether no key is held or waited for.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lease(&self, key: &str) -> Lease<'_> {
        let lock = Arc::clone(self.map().entry(key.to_string()).or_default());
        Lease {
            guard: self,
            key: key.to_string(),
            lock,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        // Entries are only inserted or removed whole, so a poisoned map is still valid.
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
