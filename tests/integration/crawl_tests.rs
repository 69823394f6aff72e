//! Integration tests for the crawler
//!
//! These tests serve a small tractor-parts shop from wiremock and run the
//! full crawl cycle against a temporary SQLite database.

use partcrawl::config::{
    Config, CrawlerConfig, LinkRules, OutputConfig, PersistMode, ProductSelectors, SiteConfig,
    UserAgentConfig, WaitStrategy,
};
use partcrawl::crawler::crawl;
use partcrawl::storage::{RunStatus, SqliteStorage, Storage};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth: 2,
            batch_size: 5,
            inter_batch_delay: 100,
            fetch_timeout: 5,
            wait_strategy: WaitStrategy::Load,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            mode: PersistMode::Upsert,
        },
        sites: vec![SiteConfig {
            name: "Mockshop".to_string(),
            seeds: vec![format!("{}/varaosat/", base_url)],
            country: vec!["FIN".to_string()],
            use_visited_ledger: false,
            links: LinkRules::default(),
            product: ProductSelectors {
                page_markers: vec!["div.product-view".to_string()],
                item: None,
                name: "h1.product-name".to_string(),
                number: Some("span.sku".to_string()),
                price: vec!["span.price".to_string()],
                link: None,
                oem: Some("li.oem".to_string()),
                oem_strip_prefix: Some("OEM:".to_string()),
                availability: Some("p.stock".to_string()),
                category: None,
                compatible: None,
                detail: None,
            },
        }],
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn listing_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">tuote</a>", href))
        .collect();
    format!(
        "<html><body><h2>Suodattimet</h2>{}<a href=\"https://other.example/x\">ulkoinen</a></body></html>",
        anchors
    )
}

fn product_page(name: &str, sku: &str, price: &str, extra_links: &[&str]) -> String {
    let anchors: String = extra_links
        .iter()
        .map(|href| format!("<a href=\"{}\">lisää</a>", href))
        .collect();
    format!(
        r#"<html><body><div class="product-view">
            <h1 class="product-name">{}</h1>
            <span class="sku">{}</span>
            <span class="price">{} €</span>
            <ul><li class="oem">OEM: AL{}</li></ul>
            <p class="stock">Varastossa</p>
            {}
        </div></body></html>"#,
        name, sku, price, sku, anchors
    )
}

async fn mount_shop(server: &MockServer, filter_price: &str) {
    Mock::given(method("GET"))
        .and(path("/varaosat/"))
        .respond_with(html(listing_page(&[
            "/tuote/suodatin",
            "/tuote/hihna",
            "/tuote/rikki",
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tuote/suodatin"))
        .respond_with(html(product_page("Öljynsuodatin", "1001", filter_price, &[])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tuote/hihna"))
        .respond_with(html(product_page("Kiilahihna", "1002", "8,50", &[])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tuote/rikki"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn open_db(db_path: &str) -> SqliteStorage {
    SqliteStorage::new(std::path::Path::new(db_path)).expect("Failed to open database")
}

#[tokio::test]
async fn test_full_crawl_stores_products() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server, "12,90").await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("parts.db");
    let db_path = db_path.to_str().unwrap();

    let config = create_test_config(&mock_server.uri(), db_path);
    let summary = crawl(config, "hash-1", None)
        .await
        .expect("Crawl should succeed");

    assert_eq!(summary.sites.len(), 1);
    let report = summary.total;
    // listing + two products + the broken page
    assert_eq!(report.pages_scraped, 4);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.records_extracted, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.updated, 0);

    let storage = open_db(db_path);
    assert_eq!(storage.count_products().unwrap(), 2);

    let filter = storage
        .get_product("Mockshop", "Öljynsuodatin", Some("1001"))
        .unwrap()
        .expect("Filter should be stored");
    assert_eq!(filter.product.price.as_deref(), Some("12.90"));
    assert_eq!(filter.product.availability.as_deref(), Some("Varastossa"));
    assert_eq!(
        filter.product.oem_numbers,
        Some(vec!["AL1001".to_string()])
    );
    assert_eq!(filter.product.country, vec!["FIN".to_string()]);
    assert_eq!(
        filter.product.link,
        format!("{}/tuote/suodatin", mock_server.uri())
    );

    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.totals.inserted, 2);
}

#[tokio::test]
async fn test_second_run_updates_without_duplicates() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server, "12,90").await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("parts.db");
    let db_path = db_path.to_str().unwrap();

    crawl(create_test_config(&mock_server.uri(), db_path), "hash-1", None)
        .await
        .expect("First crawl should succeed");

    mock_server.reset().await;
    mount_shop(&mock_server, "11,50").await;

    let summary = crawl(create_test_config(&mock_server.uri(), db_path), "hash-1", None)
        .await
        .expect("Second crawl should succeed");

    assert_eq!(summary.total.inserted, 0);
    assert_eq!(summary.total.updated, 2);

    let storage = open_db(db_path);
    assert_eq!(storage.count_products().unwrap(), 2);
    let filter = storage
        .get_product("Mockshop", "Öljynsuodatin", Some("1001"))
        .unwrap()
        .unwrap();
    assert_eq!(filter.product.price.as_deref(), Some("11.50"));

    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.id, summary.run_id);
}

#[tokio::test]
async fn test_depth_limit_stops_descent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/varaosat/"))
        .respond_with(html(listing_page(&["/tuote/suodatin"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tuote/suodatin"))
        .respond_with(html(product_page(
            "Öljynsuodatin",
            "1001",
            "12,90",
            &["/tuote/liian-syva"],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tuote/liian-syva"))
        .respond_with(html(product_page("Syvä", "9999", "1,00", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("parts.db");
    let mut config = create_test_config(&base_url, db_path.to_str().unwrap());
    config.crawler.max_depth = 1;

    let summary = crawl(config, "hash-depth", None).await.unwrap();

    assert_eq!(summary.total.pages_scraped, 2);
    assert_eq!(summary.total.pruned, 1);
    assert_eq!(summary.total.inserted, 1);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_sends_user_agent_and_stays_on_host() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/varaosat/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(html(listing_page(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("parts.db");
    let config = create_test_config(&mock_server.uri(), db_path.to_str().unwrap());

    let summary = crawl(config, "hash-ua", None).await.unwrap();

    // the off-host link on the listing is never queued
    assert_eq!(summary.total.pages_scraped, 1);
    assert_eq!(summary.total.pages_failed, 0);
    assert_eq!(summary.total.records_extracted, 0);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_visited_ledger_skips_products_on_same_day() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server, "12,90").await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("parts.db");
    let db_path = db_path.to_str().unwrap();

    let ledger_config = || {
        let mut config = create_test_config(&mock_server.uri(), db_path);
        config.sites[0].use_visited_ledger = true;
        config
    };

    let first = crawl(ledger_config(), "hash-ledger", None).await.unwrap();
    assert_eq!(first.total.inserted, 2);
    assert_eq!(first.total.pages_skipped, 0);

    let second = crawl(ledger_config(), "hash-ledger", None).await.unwrap();
    // products are fetched for links only; the listing and the broken page are scraped
    assert_eq!(second.total.pages_skipped, 2);
    assert_eq!(second.total.pages_scraped, 2);
    assert_eq!(second.total.records_extracted, 0);

    let storage = open_db(db_path);
    assert_eq!(storage.count_products().unwrap(), 2);
}

#[tokio::test]
async fn test_unknown_site_marks_run_failed() {
    let mock_server = MockServer::start().await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("parts.db");
    let db_path = db_path.to_str().unwrap();
    let config = create_test_config(&mock_server.uri(), db_path);

    let result = crawl(config, "hash-missing", Some("Nosuchshop")).await;
    assert!(result.is_err());

    let storage = open_db(db_path);
    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Failed);
}
