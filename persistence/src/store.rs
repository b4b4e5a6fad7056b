//! The durable store itself: `store`, `load`, `query`, `backup`, `cleanup`
//! (§4.3). Two-tier storage — a JSON file per record plus an optional
//! embedded index row — with an atomic write protocol (tmpfile + rename)
//! and a per-path advisory lock guarding intra-process races.

use crate::config::PersistenceConfig;
use crate::error::{PersistenceError, Result};
use crate::index::{NullIndex, RecordIndex};
use crate::lock::PathLocks;
use crate::metrics::PersistenceMetrics;
use chrono::{DateTime, NaiveDate, Utc};
use confluence_core::{Record, RecordCategory};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Manifest written alongside every backup (§4.3 "self-describing").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BackupManifest {
    pub created_at: DateTime<Utc>,
    pub source_base_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
}

/// Result of a `cleanup` pass.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CleanupReport {
    pub partitions_removed: usize,
    pub files_removed: usize,
    pub bytes_freed: u64,
}

pub struct PersistenceStore {
    config: PersistenceConfig,
    locks: PathLocks,
    index: Box<dyn RecordIndex>,
    metrics: PersistenceMetrics,
}

impl std::fmt::Debug for PersistenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceStore")
            .field("base_dir", &self.config.base_dir)
            .field("index_enabled", &self.index.is_enabled())
            .finish()
    }
}

impl PersistenceStore {
    /// Builds a store using the sqlite index when `index` feature is
    /// compiled in and `config.index_enabled` is set; falls back to the
    /// directory-scan-only `NullIndex` otherwise.
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        let index: Box<dyn RecordIndex> = Self::build_index(&config)?;
        Ok(Self {
            config,
            locks: PathLocks::new(),
            index,
            metrics: PersistenceMetrics::default(),
        })
    }

    #[cfg(feature = "index")]
    fn build_index(config: &PersistenceConfig) -> Result<Box<dyn RecordIndex>> {
        if config.index_enabled {
            let index_path = config.base_dir.join("index.sqlite3");
            Ok(Box::new(crate::index::SqliteIndex::open(&index_path)?))
        } else {
            Ok(Box::new(NullIndex))
        }
    }

    #[cfg(not(feature = "index"))]
    fn build_index(_config: &PersistenceConfig) -> Result<Box<dyn RecordIndex>> {
        Ok(Box::new(NullIndex))
    }

    pub fn metrics(&self) -> &PersistenceMetrics {
        &self.metrics
    }

    fn category_dir(&self, category: &RecordCategory) -> PathBuf {
        self.config.base_dir.join(category.as_str())
    }

    fn partition_dir(&self, category: &RecordCategory, date: NaiveDate) -> PathBuf {
        self.category_dir(category).join(date.format("%Y-%m-%d").to_string())
    }

    fn record_filename(id: &str, timestamp: DateTime<Utc>, compressed: bool) -> String {
        let suffix = if compressed { ".json.gz" } else { ".json" };
        format!("{id}_{}{suffix}", timestamp.format("%H%M%S_%3f"))
    }

    /// Atomic write: serialize → write to a tmpfile in the final directory
    /// → optional fsync → rename into place. The rename is what makes a
    /// concurrent reader see either the old or the fully-written new file,
    /// never a partial one.
    async fn write_atomic(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| PersistenceError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let final_path = dir.join(filename);
        let tmp_path = dir.join(format!(".{filename}.tmp-{}", confluence_core::mint_id("w")));

        let shard = self.locks.shard_for(&final_path);
        let _guard = shard.lock().await;

        {
            let mut file = tokio::fs::File::create(&tmp_path).await.map_err(|e| PersistenceError::Io {
                path: tmp_path.display().to_string(),
                source: e,
            })?;
            if let Err(e) = tokio::io::AsyncWriteExt::write_all(&mut file, bytes).await {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(PersistenceError::Io { path: tmp_path.display().to_string(), source: e });
            }
            if self.config.fsync_on_write {
                if let Err(e) = file.sync_all().await {
                    let _ = tokio::fs::remove_file(&tmp_path).await;
                    return Err(PersistenceError::Io { path: tmp_path.display().to_string(), source: e });
                }
            }
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(PersistenceError::Io { path: final_path.display().to_string(), source: e });
        }

        Ok(final_path)
    }

    /// `Store(id, category, payload, metadata?) -> bool` (§4.3).
    pub async fn store(&self, record: Record) -> Result<bool> {
        let started = Instant::now();
        let date = record.timestamp.date_naive();
        let dir = self.partition_dir(&record.category, date);

        let body = serde_json::to_vec(&record)?;
        let compress = body.len() as u64 >= self.config.compression_threshold_bytes;
        let bytes = if compress {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&body).map_err(|e| PersistenceError::Io {
                path: "<gzip buffer>".into(),
                source: e,
            })?;
            encoder.finish().map_err(|e| PersistenceError::Io {
                path: "<gzip buffer>".into(),
                source: e,
            })?
        } else {
            body
        };

        let filename = Self::record_filename(&record.id, record.timestamp, compress);
        let result = self.write_atomic(&dir, &filename, &bytes).await;
        let final_path = match result {
            Ok(path) => path,
            Err(e) => {
                self.metrics.record_error();
                return Err(e);
            }
        };

        if let Err(e) = self.index.upsert(&record, &final_path) {
            self.metrics.record_error();
            return Err(e);
        }

        self.metrics.record_write(
            started.elapsed().as_millis() as u64,
            compress,
            bytes.len() as u64,
        );
        Ok(true)
    }

    fn read_record_file(path: &Path) -> Result<Record> {
        let raw = std::fs::read(path).map_err(|e| PersistenceError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let json = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            let mut decoder = GzDecoder::new(&raw[..]);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(|e| PersistenceError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            out
        } else {
            raw
        };
        serde_json::from_slice(&json).map_err(|e| {
            PersistenceError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Directory-scan fallback, walking date partitions most-recent-first,
    /// used both when the index is disabled and as a safety net if an
    /// index lookup misses (e.g. index rebuilt from an older backup).
    fn scan_category_for_id(&self, category: &RecordCategory, id: &str) -> Result<Option<PathBuf>> {
        let dir = self.category_dir(category);
        let mut partitions = Self::list_partitions(&dir)?;
        partitions.sort_unstable_by(|a, b| b.cmp(a));
        for date in partitions {
            let partition = dir.join(date.format("%Y-%m-%d").to_string());
            if let Some(found) = Self::find_id_in_partition(&partition, id)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn find_id_in_partition(partition: &Path, id: &str) -> Result<Option<PathBuf>> {
        let Ok(entries) = std::fs::read_dir(partition) else {
            return Ok(None);
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&format!("{id}_")) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn list_partitions(category_dir: &Path) -> Result<Vec<NaiveDate>> {
        let Ok(entries) = std::fs::read_dir(category_dir) else {
            return Ok(Vec::new());
        };
        let mut dates = Vec::new();
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(date) = NaiveDate::parse_from_str(name, "%Y-%m-%d") {
                    dates.push(date);
                }
            }
        }
        Ok(dates)
    }

    /// `Load(id, category?) -> record?` (§4.3): index lookup first, falling
    /// back to a descending directory scan of recent date partitions.
    pub async fn load(&self, id: &str, category: &RecordCategory) -> Result<Option<Record>> {
        let started = Instant::now();
        let result = if self.index.is_enabled() {
            match self.index.lookup(id, category)? {
                Some(indexed) if indexed.file_path.exists() => Ok(Some(indexed.record)),
                _ => self
                    .scan_category_for_id(category, id)?
                    .map(|p| Self::read_record_file(&p))
                    .transpose(),
            }
        } else {
            self.scan_category_for_id(category, id)?
                .map(|p| Self::read_record_file(&p))
                .transpose()
        };
        self.metrics.record_read(started.elapsed().as_millis() as u64);
        result
    }

    /// `Query(category, since?, until?, limit) -> list<record>` (§4.3).
    pub async fn query(
        &self,
        category: &RecordCategory,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let started = Instant::now();
        let records = if self.index.is_enabled() {
            self.index
                .query(category, since, until, limit)?
                .into_iter()
                .map(|indexed| indexed.record)
                .collect()
        } else {
            self.query_by_scan(category, since, until, limit)?
        };
        self.metrics.record_read(started.elapsed().as_millis() as u64);
        Ok(records)
    }

    fn query_by_scan(
        &self,
        category: &RecordCategory,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let dir = self.category_dir(category);
        let mut partitions = Self::list_partitions(&dir)?;
        partitions.sort_unstable_by(|a, b| b.cmp(a));

        let mut out = Vec::new();
        'outer: for date in partitions {
            let partition = dir.join(date.format("%Y-%m-%d").to_string());
            let Ok(entries) = std::fs::read_dir(&partition) else {
                continue;
            };
            let mut files: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
            files.sort_unstable();
            files.reverse();
            for path in files {
                let record = Self::read_record_file(&path)?;
                if since.is_some_and(|s| record.timestamp < s) {
                    continue;
                }
                if until.is_some_and(|u| record.timestamp > u) {
                    continue;
                }
                out.push(record);
                if out.len() >= limit {
                    break 'outer;
                }
            }
        }
        Ok(out)
    }

    /// `Backup()` (§4.3): copies the data directory and index into
    /// `backup/backup_<ts>/`, writes a manifest, returns it.
    pub async fn backup(&self) -> Result<BackupManifest> {
        let now = Utc::now();
        let backup_root = self.config.base_dir.join("backup").join(format!(
            "backup_{}",
            now.format("%Y%m%dT%H%M%S")
        ));
        tokio::fs::create_dir_all(&backup_root).await.map_err(|e| PersistenceError::Io {
            path: backup_root.display().to_string(),
            source: e,
        })?;

        let (file_count, total_bytes) = self.copy_tree(&self.config.base_dir, &backup_root).await?;

        let manifest = BackupManifest {
            created_at: now,
            source_base_dir: self.config.base_dir.clone(),
            backup_dir: backup_root.clone(),
            file_count,
            total_bytes,
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;
        tokio::fs::write(backup_root.join("manifest.json"), manifest_json)
            .await
            .map_err(|e| PersistenceError::Io {
                path: backup_root.display().to_string(),
                source: e,
            })?;

        self.metrics.record_backup();
        Ok(manifest)
    }

    async fn copy_tree(&self, src: &Path, dst: &Path) -> Result<(usize, u64)> {
        let mut file_count = 0usize;
        let mut total_bytes = 0u64;
        let mut stack = vec![src.to_path_buf()];
        while let Some(dir) = stack.pop() {
            // Never back up the backup directory into itself.
            if dir.starts_with(dst) {
                continue;
            }
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| PersistenceError::Io {
                path: dir.display().to_string(),
                source: e,
            })? {
                let path = entry.path();
                let relative = path.strip_prefix(src).unwrap_or(&path);
                let target = dst.join(relative);
                if path.is_dir() {
                    if path.file_name().and_then(|n| n.to_str()) == Some("backup") {
                        continue;
                    }
                    tokio::fs::create_dir_all(&target).await.ok();
                    stack.push(path);
                } else {
                    if let Some(parent) = target.parent() {
                        tokio::fs::create_dir_all(parent).await.ok();
                    }
                    let bytes = tokio::fs::copy(&path, &target).await.map_err(|e| PersistenceError::Io {
                        path: path.display().to_string(),
                        source: e,
                    })?;
                    file_count += 1;
                    total_bytes += bytes;
                }
            }
        }
        Ok((file_count, total_bytes))
    }

    /// `Cleanup(category?)` (§4.3): deletes date partitions older than
    /// `retention`, also pruning index rows for the affected records.
    pub async fn cleanup(&self, category: Option<&RecordCategory>, now: DateTime<Utc>) -> Result<CleanupReport> {
        let cutoff = now - chrono::Duration::from_std(self.config.retention).unwrap_or_default();
        let categories = match category {
            Some(c) => vec![c.clone()],
            None => self.list_categories()?,
        };

        let mut report = CleanupReport::default();
        for category in &categories {
            let dir = self.category_dir(category);
            let partitions = Self::list_partitions(&dir)?;
            for date in partitions {
                if date >= cutoff.date_naive() {
                    continue;
                }
                let partition = dir.join(date.format("%Y-%m-%d").to_string());
                let bytes = Self::dir_size(&partition);
                let files = Self::count_files(&partition);
                if tokio::fs::remove_dir_all(&partition).await.is_ok() {
                    report.partitions_removed += 1;
                    report.files_removed += files;
                    report.bytes_freed += bytes;
                }
            }
        }

        if let Ok(pruned_paths) = self.index.prune(cutoff) {
            report.files_removed = report.files_removed.max(pruned_paths.len());
        }
        self.metrics.record_bytes_freed(report.bytes_freed);
        self.locks.evict_idle();
        Ok(report)
    }

    fn list_categories(&self) -> Result<Vec<RecordCategory>> {
        let Ok(entries) = std::fs::read_dir(&self.config.base_dir) else {
            return Ok(Vec::new());
        };
        let mut categories = Vec::new();
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if name != "backup" {
                        categories.push(RecordCategory::new(name));
                    }
                }
            }
        }
        Ok(categories)
    }

    fn dir_size(dir: &Path) -> u64 {
        std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).into_iter().flatten().count()
    }
}

/// Convenience constructor used by callers that want the index disabled
/// regardless of feature flags (e.g. a short-lived analysis tool scanning
/// an existing data directory).
pub fn store_without_index(config: PersistenceConfig) -> Arc<PersistenceStore> {
    let mut config = config;
    config.index_enabled = false;
    Arc::new(PersistenceStore::new(config).expect("NullIndex construction never fails"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_core::RecordCategory as Cat;

    fn test_store() -> (tempfile::TempDir, PersistenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = PersistenceConfig {
            base_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        (dir, PersistenceStore::new(config).unwrap())
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let (_dir, store) = test_store();
        let now = Utc::now();
        let record = Record::new("sig-1", Cat::new(Cat::SIGNALS), now, serde_json::json!({"x": 1}));
        assert!(store.store(record.clone()).await.unwrap());

        let loaded = store.load("sig-1", &record.category).await.unwrap().unwrap();
        assert_eq!(loaded.id, "sig-1");
        assert_eq!(loaded.payload, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn store_is_upsert_within_category() {
        let (_dir, store) = test_store();
        let now = Utc::now();
        let category = Cat::new(Cat::HEALTH);
        let record_v1 = Record::new("h-1", category.clone(), now, serde_json::json!({"v": 1}));
        let record_v2 = Record::new("h-1", category.clone(), now, serde_json::json!({"v": 2}));

        store.store(record_v1).await.unwrap();
        store.store(record_v2).await.unwrap();

        let loaded = store.load("h-1", &category).await.unwrap().unwrap();
        assert_eq!(loaded.payload, serde_json::json!({"v": 2}));
    }

    #[tokio::test]
    async fn query_orders_by_timestamp_descending() {
        let (_dir, store) = test_store();
        let category = Cat::new(Cat::PATTERNS);
        let base = Utc::now();
        for i in 0..3 {
            let record = Record::new(
                format!("p-{i}"),
                category.clone(),
                base + chrono::Duration::seconds(i),
                serde_json::json!({"i": i}),
            );
            store.store(record).await.unwrap();
        }

        let results = store.query(&category, None, None, 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "p-2");
        assert_eq!(results[2].id, "p-0");
    }

    #[tokio::test]
    async fn cleanup_removes_partitions_older_than_retention() {
        let (_dir, store) = test_store();
        let category = Cat::new(Cat::RECOVERY);
        let old_time = Utc::now() - chrono::Duration::days(40);
        let record = Record::new("old-rec", category.clone(), old_time, serde_json::json!({}));
        store.store(record).await.unwrap();

        let report = store.cleanup(Some(&category), Utc::now()).await.unwrap();
        assert_eq!(report.partitions_removed, 1);
        assert!(store.load("old-rec", &category).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn backup_writes_manifest_alongside_copied_tree() {
        let (_dir, store) = test_store();
        let category = Cat::new(Cat::SIGNALS);
        let record = Record::new("sig-a", category, Utc::now(), serde_json::json!({}));
        store.store(record).await.unwrap();

        let manifest = store.backup().await.unwrap();
        assert!(manifest.file_count >= 1);
        assert!(manifest.backup_dir.join("manifest.json").exists());
    }
}
