//! Submission store with deferred digest materialization.
//!
//! # Responsibilities
//! - Issue unique, strictly increasing identifiers (starting at 1)
//! - Schedule the digest of each submission after a fixed delay
//! - Serve digests once committed, telling pending ids apart from unknown ones
//! - Provide a join point (`drain`) for graceful shutdown
//!
//! # Concurrency
//! - The id counter is a lock-free atomic; the digest map sits behind one mutex
//! - The outstanding count lives in a `watch` channel: incremented before a task
//!   is spawned, decremented after its digest is in the map, so `drain` can
//!   await zero without polling

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::hashing::digest::digest;
use crate::observability::metrics;

/// Delay applied by [`SubmissionStore::default`].
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Identifier handed back for every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(u64);

impl SubmissionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubmissionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of looking up an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The digest has been committed.
    Ready(String),
    /// The id was issued but its digest is still being computed.
    Pending,
    /// The id was never issued by this store.
    Unknown,
}


#[derive(Debug)]
struct StoreInner {
    /// Last identifier handed out; 0 until the first submission.
    last_issued: AtomicU64,
    digests: Mutex<HashMap<SubmissionId, String>>,
    outstanding: watch::Sender<usize>,
    delay: Duration,
}

impl StoreInner {
    fn lock_digests(&self) -> MutexGuard<'_, HashMap<SubmissionId, String>> {
        // Writers only insert, so a panic mid-write cannot leave the map torn.
        self.digests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory store of submitted secrets and their deferred digests.
///
/// Cheap to clone; clones share the same counter, map and outstanding set.
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    inner: Arc<StoreInner>,
}

impl SubmissionStore {
    /// Create an empty store that hashes each submission after `delay`.
    pub fn new(delay: Duration) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                last_issued: AtomicU64::new(0),
                digests: Mutex::new(HashMap::new()),
                outstanding,
                delay,
            }),
        }
    }

    /// The delay applied by [`submit`](Self::submit).
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Accept a secret and return its identifier without waiting for the digest.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime; the digest task is spawned on it.
    pub fn submit(&self, secret: impl Into<String>) -> SubmissionId {
        self.schedule(secret.into(), self.inner.delay)
    }

    /// Like [`submit`](Self::submit) but with no delay before hashing.
    pub fn submit_immediate(&self, secret: impl Into<String>) -> SubmissionId {
        self.schedule(secret.into(), Duration::ZERO)
    }

    fn schedule(&self, secret: String, delay: Duration) -> SubmissionId {
        let guard = OutstandingGuard::register(Arc::clone(&self.inner));
        let id = SubmissionId(self.inner.last_issued.fetch_add(1, Ordering::AcqRel) + 1);

        metrics::record_submission();
        tracing::debug!(id = %id, delay_ms = delay.as_millis() as u64, "Submission accepted");

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let hash = digest(&secret);
            guard.inner.lock_digests().insert(id, hash);

            metrics::record_commit();
            tracing::debug!(id = %id, "Digest committed");
            drop(guard);
        });

        id
    }

    /// Look up the digest for `id`.
    pub fn fetch(&self, id: SubmissionId) -> Lookup {
        if let Some(hash) = self.inner.lock_digests().get(&id) {
            return Lookup::Ready(hash.clone());
        }

        if id.get() >= 1 && id.get() <= self.last_issued() {
            Lookup::Pending
        } else {
            Lookup::Unknown
        }
    }

    /// Highest identifier issued so far (0 if none).
    pub fn last_issued(&self) -> u64 {
        self.inner.last_issued.load(Ordering::Acquire)
    }

    /// Number of submissions whose digest has not been committed yet.
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.borrow()
    }

    /// Wait until every outstanding submission has committed its digest.
    ///
    /// Submissions registered while waiting extend the wait. New submissions
    /// are never blocked by a drain in progress.
    pub async fn drain(&self) {
        let mut outstanding = self.inner.outstanding.subscribe();
        let pending = *outstanding.borrow();
        if pending > 0 {
            tracing::info!(outstanding = pending, "Waiting for pending digests");
        }

        // The sender lives in `self`, so this only resolves once the count is zero.
        let _ = outstanding.wait_for(|count| *count == 0).await;
    }
}

impl Default for SubmissionStore {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

/// Marks one submission as outstanding for as long as it is alive.
struct OutstandingGuard {
    inner: Arc<StoreInner>,
}

impl OutstandingGuard {
    fn register(inner: Arc<StoreInner>) -> Self {
        inner.outstanding.send_modify(|count| *count += 1);
        metrics::set_outstanding(*inner.outstanding.borrow());
        Self { inner }
    }
}

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.inner.outstanding.send_modify(|count| *count -= 1);
        metrics::set_outstanding(*self.inner.outstanding.borrow());
    }
}
