//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::UpsertSummary;
use crate::product::{Compatibility, ProductRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunTotals, StoredProduct};
use crate::PartcrawlError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;

const PRODUCT_COLUMNS: &str = "id, site, name, number, link, price, oem_numbers, compatible,
     availability, category, country, scraped_date, updated_at";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, pages_scraped, inserted, updated";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(PartcrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, PartcrawlError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, PartcrawlError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the connection, surfacing any error SQLite reports on close
    pub fn close(self) -> Result<(), PartcrawlError> {
        self.conn.close().map_err(|(_, e)| PartcrawlError::Database(e))
    }

    fn query_products(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<StoredProduct>> {
        let sql = format!("SELECT {} FROM products {}", PRODUCT_COLUMNS, where_clause);
        let mut stmt = self.conn.prepare(&sql)?;
        let products = stmt
            .query_map(params, product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, totals: &RunTotals) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_scraped = ?3,
             inserted = ?4, updated = ?5 WHERE id = ?6",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                totals.pages_scraped as i64,
                totals.inserted as i64,
                totals.updated as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Failed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Products =====

    fn upsert_products(&mut self, records: &[ProductRecord]) -> StorageResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO products
                 (site, name, number, link, price, oem_numbers, compatible, availability,
                  category, country, scraped_date, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            let mut update = tx.prepare_cached(
                "UPDATE products SET price = ?1, availability = ?2, oem_numbers = ?3,
                 compatible = ?4, category = COALESCE(?5, category), updated_at = ?6
                 WHERE site = ?7 AND name = ?8 AND number = ?9",
            )?;

            for record in records {
                let oem_numbers = record
                    .oem_numbers
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                let compatible = serde_json::to_string(&record.compatible)?;

                let inserted = insert.execute(params![
                    record.site,
                    record.name,
                    record.number_key(),
                    record.link,
                    record.price,
                    oem_numbers,
                    compatible,
                    record.availability,
                    record.category,
                    serde_json::to_string(&record.country)?,
                    record.scraped_date.to_rfc3339(),
                    now,
                ])?;

                if inserted == 1 {
                    summary.inserted += 1;
                } else {
                    update.execute(params![
                        record.price,
                        record.availability,
                        oem_numbers,
                        compatible,
                        record.category,
                        now,
                        record.site,
                        record.name,
                        record.number_key(),
                    ])?;
                    summary.updated += 1;
                }
            }
        }
        tx.commit()?;

        Ok(summary)
    }

    fn refresh_products(&mut self, records: &[ProductRecord]) -> StorageResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            // Rows whose price and availability are unchanged are left alone
            let mut update = tx.prepare_cached(
                "UPDATE products SET price = ?1, availability = ?2, updated_at = ?3
                 WHERE site = ?4 AND name = ?5 AND number = ?6
                   AND (price IS NOT ?1 OR availability IS NOT ?2)",
            )?;

            for record in records {
                let changed = update.execute(params![
                    record.price,
                    record.availability,
                    now,
                    record.site,
                    record.name,
                    record.number_key(),
                ])?;
                summary.updated += changed as u64;
            }
        }
        tx.commit()?;

        Ok(summary)
    }

    fn get_product(
        &self,
        site: &str,
        name: &str,
        number: Option<&str>,
    ) -> StorageResult<Option<StoredProduct>> {
        let number = number.unwrap_or("");
        let mut products = self.query_products(
            "WHERE site = ?1 AND name = ?2 AND number = ?3",
            &[&site, &name, &number],
        )?;
        Ok(products.pop())
    }

    fn list_products(&self, limit: usize) -> StorageResult<Vec<StoredProduct>> {
        let limit = limit as i64;
        self.query_products("ORDER BY updated_at DESC, id DESC LIMIT ?1", &[&limit])
    }

    fn search_products(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredProduct>> {
        let pattern = like_pattern(query);
        let limit = limit as i64;
        self.query_products(
            "WHERE name LIKE ?1 ESCAPE '\\'
                OR number LIKE ?1 ESCAPE '\\'
                OR price LIKE ?1 ESCAPE '\\'
                OR site LIKE ?1 ESCAPE '\\'
                OR oem_numbers LIKE ?1 ESCAPE '\\'
             ORDER BY site, name LIMIT ?2",
            &[&pattern, &limit],
        )
    }

    fn count_products(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_products_by_site(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT site, COUNT(*) FROM products GROUP BY site ORDER BY site")?;

        let rows = stmt.query_map([], |row| {
            let site: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((site, count as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    // ===== Visited Ledger =====

    fn is_visited_on(&self, url: &str, day: NaiveDate) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visited_links WHERE url = ?1 AND visited_on = ?2",
            params![url, day.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn mark_visited(&mut self, url: &str, day: NaiveDate) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO visited_links (url, visited_on) VALUES (?1, ?2)
             ON CONFLICT(url) DO UPDATE SET visited_on = excluded.visited_on",
            params![url, day.to_string()],
        )?;
        Ok(())
    }

    fn count_visited_on(&self, day: NaiveDate) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visited_links WHERE visited_on = ?1",
            params![day.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Builds a LIKE pattern matching `query` anywhere, with wildcards escaped
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        totals: RunTotals {
            pages_scraped: row.get::<_, i64>(5)? as u64,
            inserted: row.get::<_, i64>(6)? as u64,
            updated: row.get::<_, i64>(7)? as u64,
        },
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<StoredProduct> {
    let number: String = row.get(3)?;
    let oem_numbers: Option<String> = row.get(6)?;
    let oem_numbers = match oem_numbers {
        Some(json) => Some(parse_json::<Vec<String>>(6, &json)?),
        None => None,
    };
    let compatible: Vec<Compatibility> = parse_json(7, &row.get::<_, String>(7)?)?;
    let country: Vec<String> = parse_json(10, &row.get::<_, String>(10)?)?;

    let scraped_date: String = row.get(11)?;
    let scraped_date = DateTime::parse_from_rfc3339(&scraped_date)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(StoredProduct {
        id: row.get(0)?,
        product: ProductRecord {
            site: row.get(1)?,
            name: row.get(2)?,
            number: if number.is_empty() { None } else { Some(number) },
            link: row.get(4)?,
            price: row.get(5)?,
            oem_numbers,
            compatible,
            availability: row.get(8)?,
            category: row.get(9)?,
            country,
            scraped_date,
        },
        updated_at: row.get(12)?,
    })
}

fn parse_json<T: DeserializeOwned>(idx: usize, json: &str) -> rusqlite::Result<T> {
    serde_json::from_str(json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
