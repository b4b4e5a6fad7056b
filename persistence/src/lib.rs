#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Persistence
//!
//! Durable, categorized, indexed storage for records of any category,
//! safe under concurrent writers/readers, with bounded retention and
//! backup.
//!
//! Every record lands in two places: a JSON file under
//! `base/<category>/<YYYY-MM-DD>/<id>_<HHMMSS_mmm>.json[.gz]`, and
//! (unless the embedded index is disabled) a row in a small sqlite index
//! keyed by `(id, category)`. Writes are atomic — serialize, write to a
//! tmpfile, optionally fsync, rename — so a concurrent reader only ever
//! observes a fully-written file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use confluence_persistence::{PersistenceConfig, PersistenceStore};
//! use confluence_core::{Record, RecordCategory};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PersistenceStore::new(PersistenceConfig::default())?;
//! let record = Record::new("sig-1", RecordCategory::new(RecordCategory::SIGNALS), chrono::Utc::now(), serde_json::json!({}));
//! store.store(record).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod lock;
pub mod metrics;
pub mod store;
pub mod worker;

pub use config::PersistenceConfig;
pub use error::{PersistenceError, Result};
pub use index::{NullIndex, RecordIndex};
pub use metrics::PersistenceMetrics;
pub use store::{store_without_index, BackupManifest, CleanupReport, PersistenceStore};
pub use worker::spawn_background_workers;

#[cfg(feature = "index")]
pub use index::SqliteIndex;
