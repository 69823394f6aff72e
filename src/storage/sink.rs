//! Adapts `SqliteStorage` to the engine's sink and ledger interfaces

use crate::config::PersistMode;
use crate::crawler::{ProductSink, UpsertSummary, VisitedLedger};
use crate::product::ProductRecord;
use crate::storage::{SqliteStorage, Storage, StorageError};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle on the run's database
///
/// Writes are serialized by the mutex; each batch is one transaction.
/// "Today" is the current UTC date.
#[derive(Clone)]
pub struct StorageSink {
    storage: Arc<Mutex<SqliteStorage>>,
    mode: PersistMode,
}

impl StorageSink {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, mode: PersistMode) -> Self {
        Self { storage, mode }
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, SqliteStorage>, StorageError> {
        self.storage.lock().map_err(|_| StorageError::Poisoned)
    }
}

#[async_trait]
impl ProductSink for StorageSink {
    async fn upsert_batch(&self, records: Vec<ProductRecord>) -> Result<UpsertSummary> {
        let mut storage = self.lock()?;
        let summary = match self.mode {
            PersistMode::Upsert => storage.upsert_products(&records)?,
            PersistMode::Refresh => storage.refresh_products(&records)?,
        };
        Ok(summary)
    }
}

#[async_trait]
impl VisitedLedger for StorageSink {
    async fn is_visited_today(&self, url: &str) -> Result<bool> {
        let storage = self.lock()?;
        Ok(storage.is_visited_on(url, Utc::now().date_naive())?)
    }

    async fn mark_visited_today(&self, url: &str) -> Result<()> {
        let mut storage = self.lock()?;
        storage.mark_visited(url, Utc::now().date_naive())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(mode: PersistMode) -> StorageSink {
        let storage = SqliteStorage::new_in_memory().unwrap();
        StorageSink::new(Arc::new(Mutex::new(storage)), mode)
    }

    fn bolt(price: &str) -> ProductRecord {
        let mut record = ProductRecord::new("Bolt", "https://x.fi/bolt", "X");
        record.number = Some("123".to_string());
        record.price = Some(price.to_string());
        record
    }

    #[tokio::test]
    async fn test_upsert_mode_inserts_then_updates() {
        let sink = sink(PersistMode::Upsert);

        let first = sink.upsert_batch(vec![bolt("10")]).await.unwrap();
        let second = sink.upsert_batch(vec![bolt("12")]).await.unwrap();

        assert_eq!(first, UpsertSummary { inserted: 1, updated: 0 });
        assert_eq!(second, UpsertSummary { inserted: 0, updated: 1 });
    }

    #[tokio::test]
    async fn test_refresh_mode_never_inserts() {
        let sink = sink(PersistMode::Refresh);

        let summary = sink.upsert_batch(vec![bolt("10")]).await.unwrap();
        assert_eq!(summary, UpsertSummary::default());

        let storage = sink.storage.lock().unwrap();
        assert_eq!(storage.count_products().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let sink = sink(PersistMode::Upsert);
        let summary = sink.upsert_batch(Vec::new()).await.unwrap();
        assert_eq!(summary, UpsertSummary::default());
    }

    #[tokio::test]
    async fn test_ledger_marks_today() {
        let sink = sink(PersistMode::Upsert);
        let url = "https://www.ikh.fi/fi/suodattimet";

        assert!(!sink.is_visited_today(url).await.unwrap());
        sink.mark_visited_today(url).await.unwrap();
        assert!(sink.is_visited_today(url).await.unwrap());
        assert!(!sink.is_visited_today("https://www.ikh.fi/fi/other").await.unwrap());
    }
}
