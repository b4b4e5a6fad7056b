//! Per-path advisory locking (§4.3 "Per-path advisory mutex prevents
//! intra-process races"). Backed by a `DashMap` shard so unrelated paths
//! never contend on the same lock.

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct PathLocks {
    shards: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex guarding `path`, creating it if this is the first
    /// writer to touch it.
    pub fn shard_for(&self, path: &std::path::Path) -> Arc<Mutex<()>> {
        self.shards
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops shards with no other outstanding reference. Called
    /// periodically by the cleanup worker so the map doesn't grow
    /// unbounded across the lifetime of a long-running process.
    pub fn evict_idle(&self) {
        self.shards.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn evict_idle_drops_unreferenced_shards() {
        let locks = PathLocks::new();
        {
            let _held = locks.shard_for(Path::new("/tmp/a"));
            locks.evict_idle();
            assert_eq!(locks.len(), 1);
        }
        locks.evict_idle();
        assert_eq!(locks.len(), 0);
    }
}
