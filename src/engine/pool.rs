//! Folder pool allocation.
//!
//! Pools are named, capacity-bounded seat counters shared by every host
//! resolution in the process. This module owns the acquire/release contract
//! and is the *only* place that mutates seat counts:
//!
//! ```text
//! folder_pool outcome hits ──┬─ host already locked ──▶ sticky reuse (no seat)
//!                            └─ otherwise            ──▶ acquire (seat += 1)
//!
//! no folder_pool outcome hit but host locked ──▶ release (seat -= 1, clear lock)
//! ```
//!
//! Acquire scans the *enabled* pools in name-ascending order and takes the
//! first free seat; when none qualifies the host fails with
//! [`EngineError::PoolExhausted`] and no partial mutation is left behind.
//! Release floors at zero and treats an already-deleted pool as an
//! explicit, logged no-op.
//!
//! All seat mutation happens under the allocator's own lock so that
//! `seats_taken <= capacity` holds even when many hosts resolve
//! concurrently. The store behind it only needs plain `get`/`save`.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::store::PoolStore;

/// Normalize a folder path segment: single leading slash, no trailing
/// slash, lowercase.
pub(crate) fn normalize_folder(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    format!("/{}", trimmed.to_lowercase())
}

/// Serialized front door for all pool seat mutation.
pub struct PoolAllocator {
    store: Arc<dyn PoolStore>,
    gate: Mutex<()>,
}

impl PoolAllocator {
    pub fn new(store: Arc<dyn PoolStore>) -> Self {
        PoolAllocator { store, gate: Mutex::new(()) }
    }

    pub fn store(&self) -> &dyn PoolStore {
        self.store.as_ref()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take one seat from the first enabled pool with free capacity
    /// (name-ascending scan) and return its normalized folder.
    pub fn acquire(&self, hostname: &str) -> Result<String> {
        let _gate = self.guard();

        let mut pools = self.store.list();
        pools.retain(|p| p.enabled);
        pools.sort_by(|a, b| a.name.cmp(&b.name));

        for mut pool in pools {
            if !pool.has_free_seat() {
                continue;
            }
            pool.seats_taken += 1;
            let folder = normalize_folder(&pool.name);
            debug!(pool = %pool.name, seats = pool.seats_taken, capacity = pool.capacity, host = %hostname, "pool seat acquired");
            self.store.save(pool);
            return Ok(folder);
        }

        Err(EngineError::PoolExhausted { hostname: hostname.to_string() })
    }

    /// Return the seat backing `locked_folder` and report whether a pool
    /// was found. A missing pool (deleted since the seat was taken) is an
    /// explicit no-op, surfaced through the log rather than an error.
    pub fn release(&self, hostname: &str, locked_folder: &str) -> bool {
        let _gate = self.guard();

        let owner = self.store.list().into_iter().find(|p| normalize_folder(&p.name) == locked_folder);
        match owner {
            Some(mut pool) => {
                pool.seats_taken = pool.seats_taken.saturating_sub(1);
                debug!(pool = %pool.name, seats = pool.seats_taken, host = %hostname, "pool seat released");
                self.store.save(pool);
                true
            }
            None => {
                warn!(folder = %locked_folder, host = %hostname, "release into missing pool, nothing to do");
                false
            }
        }
    }
}
