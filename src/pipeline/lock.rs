//! Per-conversation request serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Holds the lock for one conversation key; dropping it releases the lock.
#[derive(Debug)]
pub struct RequestLockGuard {
    _permit: OwnedSemaphorePermit,
}

/// Registry of per-conversation-key locks.
///
/// Locks are created on first use and live for the registry's lifetime; the
/// key space is bounded by joined conversations, so entries are never
/// evicted. Keys are fully independent.
#[derive(Default)]
pub struct RequestLockRegistry {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl RequestLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<Semaphore> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Acquire the lock for `key`, waiting until it is free or `cancel`
    /// fires. Returns `None` on cancellation; losing the race never leaves
    /// the lock held.
    pub async fn acquire(&self, key: &str, cancel: &CancellationToken) -> Option<RequestLockGuard> {
        let semaphore = self.lock_for(key);
        tracing::debug!(conversation = %key, "lock_acquiring");
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(conversation = %key, "lock_timeout");
                None
            }
            permit = semaphore.acquire_owned() => match permit {
                Ok(permit) => {
                    tracing::debug!(conversation = %key, "lock_acquired");
                    Some(RequestLockGuard { _permit: permit })
                }
                // The semaphore is never closed.
                Err(_) => None,
            }
        }
    }

    /// Number of keys seen so far.
    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
