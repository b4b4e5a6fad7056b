//! Rolling metrics exposed by the persistence layer (§4.3 "Metrics exposed").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PersistenceMetrics {
    total_writes: AtomicU64,
    total_reads: AtomicU64,
    compressed_writes: AtomicU64,
    errors: AtomicU64,
    backup_count: AtomicU64,
    write_millis_total: AtomicU64,
    read_millis_total: AtomicU64,
    storage_bytes: AtomicU64,
}

impl PersistenceMetrics {
    pub fn record_write(&self, millis: u64, compressed: bool, bytes: u64) {
        self.total_writes.fetch_add(1, Ordering::Relaxed);
        self.write_millis_total.fetch_add(millis, Ordering::Relaxed);
        self.storage_bytes.fetch_add(bytes, Ordering::Relaxed);
        if compressed {
            self.compressed_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_read(&self, millis: u64) {
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        self.read_millis_total.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backup(&self) {
        self.backup_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes_freed(&self, bytes: u64) {
        self.storage_bytes.fetch_sub(bytes.min(self.storage_bytes.load(Ordering::Relaxed)), Ordering::Relaxed);
    }

    /// Snapshot as a flat map, suitable for folding into `SystemHealth.metrics`.
    pub fn snapshot(&self) -> HashMap<String, f64> {
        let writes = self.total_writes.load(Ordering::Relaxed);
        let reads = self.total_reads.load(Ordering::Relaxed);
        let avg_write_ms = if writes > 0 {
            self.write_millis_total.load(Ordering::Relaxed) as f64 / writes as f64
        } else {
            0.0
        };
        let avg_read_ms = if reads > 0 {
            self.read_millis_total.load(Ordering::Relaxed) as f64 / reads as f64
        } else {
            0.0
        };
        HashMap::from([
            ("total_writes".into(), writes as f64),
            ("total_reads".into(), reads as f64),
            ("compressed_writes".into(), self.compressed_writes.load(Ordering::Relaxed) as f64),
            ("avg_write_ms".into(), avg_write_ms),
            ("avg_read_ms".into(), avg_read_ms),
            ("errors".into(), self.errors.load(Ordering::Relaxed) as f64),
            ("storage_bytes".into(), self.storage_bytes.load(Ordering::Relaxed) as f64),
            ("backup_count".into(), self.backup_count.load(Ordering::Relaxed) as f64),
        ])
    }
}
