//! Configuration for the persistence layer, matching the `persistence`
//! section of the platform's top-level config (§6).

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Root directory. Records land under `<base>/<category>/<date>/`.
    pub base_dir: PathBuf,
    /// Whether the embedded index is enabled. With the `index` feature
    /// compiled out, this is ignored and directory scans are always used.
    pub index_enabled: bool,
    /// Payloads at or above this size (bytes) are gzip-compressed before
    /// the atomic write; the on-disk filename gains a `.gz` suffix.
    pub compression_threshold_bytes: u64,
    /// Age at which a date partition becomes eligible for `cleanup`.
    pub retention: Duration,
    /// Interval between scheduled `backup` runs.
    pub backup_interval: Duration,
    /// Interval between scheduled `cleanup` runs.
    pub cleanup_interval: Duration,
    /// Size of the background worker pool used for `backup`/`cleanup`.
    pub worker_pool_size: usize,
    /// Whether `store` calls `fsync` after the write before renaming.
    pub fsync_on_write: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            index_enabled: true,
            compression_threshold_bytes: 64 * 1024,
            retention: Duration::from_secs(30 * 24 * 3600),
            backup_interval: Duration::from_secs(6 * 3600),
            cleanup_interval: Duration::from_secs(24 * 3600),
            worker_pool_size: 2,
            fsync_on_write: false,
        }
    }
}
