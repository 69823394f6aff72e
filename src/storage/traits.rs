//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::UpsertSummary;
use crate::product::ProductRecord;
use crate::storage::{RunRecord, RunTotals, StoredProduct};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Everything the crawler and the read-side CLI need from the database.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed and stores its totals
    fn complete_run(&mut self, run_id: i64, totals: &RunTotals) -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Products =====

    /// Inserts new products and updates the mutable fields of known ones
    ///
    /// Products are identified by `(site, name, number)`. Name, number,
    /// link, country and the first scrape date are never overwritten.
    /// The whole batch is written in one transaction.
    fn upsert_products(&mut self, records: &[ProductRecord]) -> StorageResult<UpsertSummary>;

    /// Updates price and availability of already known products only
    ///
    /// Unknown products are ignored; `inserted` is always zero.
    fn refresh_products(&mut self, records: &[ProductRecord]) -> StorageResult<UpsertSummary>;

    /// Looks a product up by its uniqueness key
    fn get_product(
        &self,
        site: &str,
        name: &str,
        number: Option<&str>,
    ) -> StorageResult<Option<StoredProduct>>;

    /// Most recently updated products first
    fn list_products(&self, limit: usize) -> StorageResult<Vec<StoredProduct>>;

    /// Case-insensitive substring search over name, number, price, site and
    /// OEM numbers
    fn search_products(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredProduct>>;

    fn count_products(&self) -> StorageResult<u64>;

    /// Product counts per site, sorted by site name
    fn count_products_by_site(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Visited Ledger =====

    /// Whether the URL was recorded as visited on the given day
    fn is_visited_on(&self, url: &str, day: NaiveDate) -> StorageResult<bool>;

    /// Records the URL as visited on the given day, replacing older entries
    fn mark_visited(&mut self, url: &str, day: NaiveDate) -> StorageResult<()>;

    /// Number of URLs visited on the given day
    fn count_visited_on(&self, day: NaiveDate) -> StorageResult<u64>;
}
