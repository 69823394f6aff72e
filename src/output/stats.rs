//! Statistics generation from the product database
//!
//! This module provides functionality for extracting and displaying
//! product and run statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::PartcrawlError;
use chrono::{NaiveDate, Utc};

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct ProductStatistics {
    /// Total number of stored products
    pub total_products: u64,

    /// Product counts per site, sorted by site name
    pub products_by_site: Vec<(String, u64)>,

    /// URLs recorded in the visited ledger for `day`
    pub visited_today: u64,

    pub day: NaiveDate,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage for the current UTC day
pub fn load_statistics(storage: &dyn Storage) -> Result<ProductStatistics, PartcrawlError> {
    load_statistics_on(storage, Utc::now().date_naive())
}

/// Loads statistics from storage with the visited count taken for `day`
pub fn load_statistics_on(
    storage: &dyn Storage,
    day: NaiveDate,
) -> Result<ProductStatistics, PartcrawlError> {
    Ok(ProductStatistics {
        total_products: storage.count_products()?,
        products_by_site: storage.count_products_by_site()?,
        visited_today: storage.count_visited_on(day)?,
        day,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ProductStatistics) {
    print!("{}", format_statistics(stats));
}

pub fn format_statistics(stats: &ProductStatistics) -> String {
    let mut out = String::from("=== Product Statistics ===\n\n");

    out.push_str(&format!("Total products: {}\n", stats.total_products));
    if !stats.products_by_site.is_empty() {
        out.push_str("\nProducts by Site:\n");
        for (site, count) in &stats.products_by_site {
            let percentage = if stats.total_products > 0 {
                (*count as f64 / stats.total_products as f64) * 100.0
            } else {
                0.0
            };
            out.push_str(&format!("  {}: {} ({:.1}%)\n", site, count, percentage));
        }
    }

    out.push_str(&format!(
        "\nVisited ledger ({}): {} URLs\n",
        stats.day, stats.visited_today
    ));

    match &stats.latest_run {
        Some(run) => {
            out.push_str(&format!(
                "\nLatest run #{} ({}):\n",
                run.id,
                run.status.to_db_string()
            ));
            out.push_str(&format!("  Started: {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                out.push_str(&format!("  Finished: {}\n", finished));
            }
            out.push_str(&format!(
                "  Pages scraped: {}, inserted: {}, updated: {}\n",
                run.totals.pages_scraped, run.totals.inserted, run.totals.updated
            ));
        }
        None => out.push_str("\nNo crawl runs recorded yet\n"),
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductRecord;
    use crate::storage::{RunTotals, SqliteStorage};

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

        storage
            .upsert_products(&[
                ProductRecord::new("Bolt", "https://x.fi/bolt", "X"),
                ProductRecord::new("Nut", "https://x.fi/nut", "X"),
                ProductRecord::new("Hihna", "https://y.fi/hihna", "Y"),
            ])
            .unwrap();
        storage.mark_visited("https://x.fi/bolt", day).unwrap();
        let run_id = storage.create_run("hash").unwrap();
        storage
            .complete_run(
                run_id,
                &RunTotals {
                    pages_scraped: 4,
                    inserted: 3,
                    updated: 0,
                },
            )
            .unwrap();

        let stats = load_statistics_on(&storage, day).unwrap();

        assert_eq!(stats.total_products, 3);
        assert_eq!(
            stats.products_by_site,
            vec![("X".to_string(), 2), ("Y".to_string(), 1)]
        );
        assert_eq!(stats.visited_today, 1);
        assert_eq!(stats.latest_run.as_ref().map(|r| r.id), Some(run_id));

        let text = format_statistics(&stats);
        assert!(text.contains("Total products: 3"));
        assert!(text.contains("X: 2 (66.7%)"));
        assert!(text.contains("Pages scraped: 4, inserted: 3, updated: 0"));
    }

    #[test]
    fn test_format_empty_database() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();

        let text = format_statistics(&stats);
        assert!(text.contains("Total products: 0"));
        assert!(text.contains("No crawl runs recorded yet"));
    }
}
