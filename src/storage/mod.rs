//! SQLite persistence for products, runs and the visited ledger
//!
//! Everything the crawler writes goes through here:
//! - schema creation on first open
//! - idempotent product upserts keyed by site, name and number
//! - The day-scoped visited ledger
//! - Run tracking

mod schema;
mod sink;
mod sqlite;
mod traits;

pub use sink::StorageSink;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::product::ProductRecord;
use crate::PartcrawlError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(PartcrawlError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, PartcrawlError> {
    SqliteStorage::new(path)
}

/// A product row together with its database bookkeeping
#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub id: i64,
    pub product: ProductRecord,
    pub updated_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub totals: RunTotals,
}

/// Counters stored on a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub pages_scraped: u64,
    pub inserted: u64,
    pub updated: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
