//! The embedded relational index over stored records (§4.3 storage model,
//! part (b)): `(id PK, category, timestamp, payload_json, metadata_json,
//! file_path)`. Optional by design — when disabled, `Load`/`Query` fall
//! back to date-partitioned directory scans.

use crate::error::Result;
use chrono::{DateTime, Utc};
use confluence_core::{Record, RecordCategory};
use std::path::{Path, PathBuf};

/// A row the index tracks alongside the record it describes.
#[derive(Debug, Clone)]
pub struct IndexedPath {
    pub record: Record,
    pub file_path: PathBuf,
}

/// Abstraction over the embedded index so the rest of the store doesn't
/// care whether it's backed by sqlite or not present at all.
pub trait RecordIndex: Send + Sync {
    fn upsert(&self, record: &Record, file_path: &Path) -> Result<()>;
    fn lookup(&self, id: &str, category: &RecordCategory) -> Result<Option<IndexedPath>>;
    fn query(
        &self,
        category: &RecordCategory,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<IndexedPath>>;
    fn delete(&self, id: &str, category: &RecordCategory) -> Result<()>;
    /// Removes every row whose `timestamp` predates `older_than`, returning
    /// the file paths so the caller can unlink them too.
    fn prune(&self, older_than: DateTime<Utc>) -> Result<Vec<PathBuf>>;
    fn is_enabled(&self) -> bool;
}

/// No-op index: `Load`/`Query` always fall back to directory scans. The
/// real "index disabled" code path from §8's boundary behavior list.
#[derive(Debug, Default)]
pub struct NullIndex;

impl RecordIndex for NullIndex {
    fn upsert(&self, _record: &Record, _file_path: &Path) -> Result<()> {
        Ok(())
    }

    fn lookup(&self, _id: &str, _category: &RecordCategory) -> Result<Option<IndexedPath>> {
        Ok(None)
    }

    fn query(
        &self,
        _category: &RecordCategory,
        _since: Option<DateTime<Utc>>,
        _until: Option<DateTime<Utc>>,
        _limit: usize,
    ) -> Result<Vec<IndexedPath>> {
        Ok(Vec::new())
    }

    fn delete(&self, _id: &str, _category: &RecordCategory) -> Result<()> {
        Ok(())
    }

    fn prune(&self, _older_than: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(feature = "index")]
pub use sqlite::SqliteIndex;

#[cfg(feature = "index")]
mod sqlite {
    use super::*;
    use crate::error::PersistenceError;
    use parking_lot::Mutex;
    use rusqlite::{params, Connection};

    /// Single-connection sqlite-backed index. Access is serialized behind
    /// one lock per §4.3 "Index access is serialized via a single
    /// connection-wide lock" — this is an embedded file index, not a
    /// high-throughput OLTP store, so one writer at a time is sufficient.
    pub struct SqliteIndex {
        conn: Mutex<Connection>,
    }

    impl std::fmt::Debug for SqliteIndex {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SqliteIndex").finish_non_exhaustive()
        }
    }

    impl SqliteIndex {
        pub fn open(path: &Path) -> Result<Self> {
            let conn = Connection::open(path)?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS records (
                    id TEXT NOT NULL,
                    category TEXT NOT NULL,
                    timestamp_millis INTEGER NOT NULL,
                    payload_json TEXT NOT NULL,
                    metadata_json TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    PRIMARY KEY (id, category)
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_records_category_ts
                 ON records (category, timestamp_millis DESC)",
                [],
            )?;
            Ok(Self { conn: Mutex::new(conn) })
        }

        pub fn open_in_memory() -> Result<Self> {
            Self::open(Path::new(":memory:"))
        }

        fn row_to_indexed(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexedPath> {
            let id: String = row.get(0)?;
            let category: String = row.get(1)?;
            let millis: i64 = row.get(2)?;
            let payload_json: String = row.get(3)?;
            let metadata_json: String = row.get(4)?;
            let file_path: String = row.get(5)?;

            let timestamp = DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now);
            let payload: serde_json::Value = serde_json::from_str(&payload_json)
                .unwrap_or(serde_json::Value::Null);
            let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

            Ok(IndexedPath {
                record: Record {
                    id,
                    category: RecordCategory::new(category),
                    timestamp,
                    payload,
                    metadata,
                },
                file_path: PathBuf::from(file_path),
            })
        }
    }

    impl RecordIndex for SqliteIndex {
        fn upsert(&self, record: &Record, file_path: &Path) -> Result<()> {
            let payload_json = serde_json::to_string(&record.payload)?;
            let metadata_json = serde_json::to_string(&record.metadata)?;
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO records (id, category, timestamp_millis, payload_json, metadata_json, file_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id, category) DO UPDATE SET
                    timestamp_millis = excluded.timestamp_millis,
                    payload_json = excluded.payload_json,
                    metadata_json = excluded.metadata_json,
                    file_path = excluded.file_path",
                params![
                    record.id,
                    record.category.as_str(),
                    record.timestamp.timestamp_millis(),
                    payload_json,
                    metadata_json,
                    file_path.to_string_lossy(),
                ],
            ).map_err(PersistenceError::from)?;
            Ok(())
        }

        fn lookup(&self, id: &str, category: &RecordCategory) -> Result<Option<IndexedPath>> {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, category, timestamp_millis, payload_json, metadata_json, file_path
                 FROM records WHERE id = ?1 AND category = ?2",
            )?;
            let mut rows = stmt.query(params![id, category.as_str()])?;
            match rows.next()? {
                Some(row) => Ok(Some(Self::row_to_indexed(row)?)),
                None => Ok(None),
            }
        }

        fn query(
            &self,
            category: &RecordCategory,
            since: Option<DateTime<Utc>>,
            until: Option<DateTime<Utc>>,
            limit: usize,
        ) -> Result<Vec<IndexedPath>> {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, category, timestamp_millis, payload_json, metadata_json, file_path
                 FROM records
                 WHERE category = ?1
                   AND timestamp_millis >= ?2
                   AND timestamp_millis <= ?3
                 ORDER BY timestamp_millis DESC
                 LIMIT ?4",
            )?;
            let since_millis = since.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN);
            let until_millis = until.map(|t| t.timestamp_millis()).unwrap_or(i64::MAX);
            let rows = stmt.query_map(
                params![category.as_str(), since_millis, until_millis, limit as i64],
                Self::row_to_indexed,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(PersistenceError::from)
        }

        fn delete(&self, id: &str, category: &RecordCategory) -> Result<()> {
            let conn = self.conn.lock();
            conn.execute(
                "DELETE FROM records WHERE id = ?1 AND category = ?2",
                params![id, category.as_str()],
            )?;
            Ok(())
        }

        fn prune(&self, older_than: DateTime<Utc>) -> Result<Vec<PathBuf>> {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT file_path FROM records WHERE timestamp_millis < ?1",
            )?;
            let paths: Vec<PathBuf> = stmt
                .query_map(params![older_than.timestamp_millis()], |row| {
                    row.get::<_, String>(0).map(PathBuf::from)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            conn.execute(
                "DELETE FROM records WHERE timestamp_millis < ?1",
                params![older_than.timestamp_millis()],
            )?;
            Ok(paths)
        }

        fn is_enabled(&self) -> bool {
            true
        }
    }
}

#[cfg(all(test, feature = "index"))]
mod tests {
    use super::*;

    #[test]
    fn sqlite_index_round_trips_upsert_and_lookup() {
        let index = SqliteIndex::open_in_memory().unwrap();
        let record = Record::new(
            "sig-1",
            RecordCategory::new(RecordCategory::SIGNALS),
            Utc::now(),
            serde_json::json!({"symbol": "EURUSD"}),
        );
        index.upsert(&record, Path::new("data/signals/2026-07-27/sig-1.json")).unwrap();

        let found = index.lookup("sig-1", &record.category).unwrap().unwrap();
        assert_eq!(found.record.id, "sig-1");

        // upsert is idempotent on conflict
        index.upsert(&record, Path::new("data/signals/2026-07-27/sig-1.json")).unwrap();
        let rows = index
            .query(&record.category, None, None, 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn sqlite_index_prune_returns_and_removes_old_rows() {
        let index = SqliteIndex::open_in_memory().unwrap();
        let old_time = Utc::now() - chrono::Duration::days(40);
        let record = Record::new(
            "old-1",
            RecordCategory::new(RecordCategory::HEALTH),
            old_time,
            serde_json::json!({}),
        );
        index.upsert(&record, Path::new("data/health/old/old-1.json")).unwrap();

        let pruned = index.prune(Utc::now() - chrono::Duration::days(30)).unwrap();
        assert_eq!(pruned.len(), 1);
        assert!(index.lookup("old-1", &record.category).unwrap().is_none());
    }
}
