//! Collaborator store seams.
//!
//! The engine owns no persistence. Pool inventories and host records live
//! in whatever backend the surrounding application uses; the engine only
//! needs narrow `get`/`save` operations, expressed here as traits. The
//! in-memory implementations back the debug CLI and the test suite.
//!
//! Implementations must be safe to share across worker threads — batch
//! inventory builds resolve thousands of hosts concurrently. The in-memory
//! stores guard their maps with a mutex; the allocator additionally
//! serializes its read-modify-write cycles (see `engine/pool.rs`), so a
//! store does not need compare-and-swap semantics of its own.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::model::{FolderPool, HostContext};

/// Read/write access to the folder pool inventory.
pub trait PoolStore: Send + Sync {
    /// All pools, in no particular order.
    fn list(&self) -> Vec<FolderPool>;
    fn get(&self, name: &str) -> Option<FolderPool>;
    /// Insert or overwrite a pool record, keyed by name.
    fn save(&self, pool: FolderPool);
}

/// Read/write access to host records.
pub trait HostStore: Send + Sync {
    fn get(&self, hostname: &str) -> Option<HostContext>;
    fn save(&self, host: HostContext);
    /// Persist a host's sticky pool assignment (or clear it with `None`).
    fn save_lock(&self, hostname: &str, locked_folder: Option<String>);
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mutex-guarded in-memory pool store.
#[derive(Debug, Default)]
pub struct MemoryPoolStore {
    pools: Mutex<BTreeMap<String, FolderPool>>,
}

impl MemoryPoolStore {
    pub fn new(pools: Vec<FolderPool>) -> Self {
        let map = pools.into_iter().map(|p| (p.name.clone(), p)).collect();
        MemoryPoolStore { pools: Mutex::new(map) }
    }

    /// Remove a pool record. Used to exercise the "release into a deleted
    /// pool" branch.
    pub fn remove(&self, name: &str) -> Option<FolderPool> {
        lock(&self.pools).remove(name)
    }
}

impl PoolStore for MemoryPoolStore {
    fn list(&self) -> Vec<FolderPool> {
        lock(&self.pools).values().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<FolderPool> {
        lock(&self.pools).get(name).cloned()
    }

    fn save(&self, pool: FolderPool) {
        lock(&self.pools).insert(pool.name.clone(), pool);
    }
}

/// Mutex-guarded in-memory host store.
#[derive(Debug, Default)]
pub struct MemoryHostStore {
    hosts: Mutex<BTreeMap<String, HostContext>>,
}

impl MemoryHostStore {
    pub fn new(hosts: Vec<HostContext>) -> Self {
        let map = hosts.into_iter().map(|h| (h.hostname.clone(), h)).collect();
        MemoryHostStore { hosts: Mutex::new(map) }
    }
}

impl HostStore for MemoryHostStore {
    fn get(&self, hostname: &str) -> Option<HostContext> {
        lock(&self.hosts).get(hostname).cloned()
    }

    fn save(&self, host: HostContext) {
        lock(&self.hosts).insert(host.hostname.clone(), host);
    }

    fn save_lock(&self, hostname: &str, locked_folder: Option<String>) {
        if let Some(host) = lock(&self.hosts).get_mut(hostname) {
            host.locked_folder = locked_folder;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_store_roundtrip() {
        let store = MemoryPoolStore::new(vec![FolderPool {
            name: "pool_a".to_string(),
            capacity: 3,
            seats_taken: 0,
            enabled: true,
        }]);

        let mut pool = store.get("pool_a").unwrap();
        pool.seats_taken = 2;
        store.save(pool);

        assert_eq!(store.get("pool_a").unwrap().seats_taken, 2);
        assert_eq!(store.list().len(), 1);
        assert!(store.remove("pool_a").is_some());
        assert!(store.get("pool_a").is_none());
    }

    #[test]
    fn host_store_lock_updates() {
        let store = MemoryHostStore::new(vec![HostContext::new("web01")]);
        store.save_lock("web01", Some("/pool/a".to_string()));
        assert_eq!(store.get("web01").unwrap().locked_folder.as_deref(), Some("/pool/a"));
        store.save_lock("web01", None);
        assert_eq!(store.get("web01").unwrap().locked_folder, None);
    }
}
