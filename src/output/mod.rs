//! Output module for reporting crawl results
//!
//! This module handles:
//! - Printing the summary of a finished crawl run
//! - Printing product search results
//! - Database statistics

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, ProductStatistics};

use crate::crawler::RunSummary;
use crate::storage::StoredProduct;

/// Products printed at most by `--search`
pub const SEARCH_LIMIT: usize = 50;

/// Prints a finished run's per-site and total counters
pub fn print_run_summary(summary: &RunSummary) {
    print!("{}", format_run_summary(summary));
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = format!("=== Run #{} ===\n\n", summary.run_id);

    for site in &summary.sites {
        let r = &site.report;
        out.push_str(&format!(
            "{}: {} pages in {} batches, {} failed, {} skipped; {} products ({} new, {} updated)\n",
            site.site,
            r.pages_scraped,
            r.batches,
            r.pages_failed,
            r.pages_skipped,
            r.records_extracted,
            r.inserted,
            r.updated
        ));
        if r.sink_failures > 0 {
            out.push_str(&format!(
                "  {} batch(es) could not be saved\n",
                r.sink_failures
            ));
        }
    }

    let total = &summary.total;
    out.push_str(&format!(
        "\nTotal pages scraped: {}\nProducts inserted: {}, updated: {}\n",
        total.pages_scraped, total.inserted, total.updated
    ));
    out
}

/// Prints search results one product per line
pub fn print_search_results(query: &str, products: &[StoredProduct]) {
    print!("{}", format_search_results(query, products));
}

pub fn format_search_results(query: &str, products: &[StoredProduct]) -> String {
    if products.is_empty() {
        return format!("No products match '{}'\n", query);
    }

    let mut out = format!("{} product(s) matching '{}':\n\n", products.len(), query);
    for stored in products {
        let p = &stored.product;
        out.push_str(&format!(
            "[{}] {}{} | {}\n",
            p.site,
            p.name,
            p.number
                .as_deref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default(),
            p.price.as_deref().unwrap_or("-")
        ));
        if let Some(oem) = &p.oem_numbers {
            out.push_str(&format!("    OEM: {}\n", oem.join(", ")));
        }
        out.push_str(&format!("    {}\n", p.link));
    }
    out
}
