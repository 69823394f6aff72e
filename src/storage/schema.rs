//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Partcrawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_scraped INTEGER NOT NULL DEFAULT 0,
    inserted INTEGER NOT NULL DEFAULT 0,
    updated INTEGER NOT NULL DEFAULT 0
);

-- Extracted products, unique per site
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site TEXT NOT NULL,
    name TEXT NOT NULL,
    number TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL,
    price TEXT,
    oem_numbers TEXT,
    compatible TEXT NOT NULL DEFAULT '[]',
    availability TEXT,
    category TEXT,
    country TEXT NOT NULL DEFAULT '[]',
    scraped_date TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site, name, number)
);

CREATE INDEX IF NOT EXISTS idx_products_site ON products(site);
CREATE INDEX IF NOT EXISTS idx_products_updated ON products(updated_at);

-- Day-scoped record of processed URLs
CREATE TABLE IF NOT EXISTS visited_links (
    url TEXT PRIMARY KEY,
    visited_on TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_visited_on ON visited_links(visited_on);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
