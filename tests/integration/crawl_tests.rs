//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing portal and run the
//! full crawl cycle end-to-end: pagination, retries, region isolation,
//! cancellation, aggregation and persistence.

use listing_harvest::config::{
    Config, CrawlerConfig, DelayRange, ListingKind, OutputConfig, SessionConfig,
};
use listing_harvest::crawler::{run_crawl, Coordinator};
use listing_harvest::output::write_dataset;
use listing_harvest::RegionStatus;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no pacing delays
fn create_test_config(base_url: &str, regions: &[&str], output: &str) -> Config {
    Config {
        regions: regions.iter().map(|r| r.to_string()).collect(),
        crawler: CrawlerConfig {
            base_url: base_url.to_string(),
            listing: ListingKind::Deal,
            max_concurrent_regions: 3,
            request_timeout_secs: 5,
            max_attempts: 3,
            request_delay: DelayRange::zero(),
            page_delay: DelayRange::zero(),
            retry_backoff: DelayRange::zero(),
        },
        session: SessionConfig::default(),
        output: OutputConfig {
            path: output.to_string(),
        },
    }
}

/// Renders a deal listing page with `count` items numbered from `first`
fn deal_page(first: usize, count: usize, pager: Option<(u32, u32)>) -> String {
    let items: String = (first..first + count)
        .map(|i| {
            format!(
                r#"<li>
                    <a class="img" href="https://sx.ke.com/chengjiao/{i}.html"></a>
                    <div class="title"><a href="https://sx.ke.com/chengjiao/{i}.html">listing {i}</a></div>
                    <div class="dealDate">2024.05.{day:02}</div>
                    <div class="totalPrice"><span class="number">{price}</span>万</div>
                    <div class="dealCycleeInfo"><span>挂牌{price}万</span><span>成交周期30天</span></div>
                </li>"#,
                i = i,
                day = i % 28 + 1,
                price = 100 + i
            )
        })
        .collect();

    let pager = pager
        .map(|(total, current)| {
            format!(
                r#"<div class="page-box house-lst-page-box" comp-module="page" page-data='{{"totalPage":{},"curPage":{}}}'></div>"#,
                total, current
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html><html><head><title>成交</title></head><body>
        <ul class="listContent">{}</ul>
        {}
        </body></html>"#,
        items, pager
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_two_regions() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/chengjiao/alpha/", deal_page(0, 30, Some((2, 1)))).await;
    mount_page(&mock_server, "/chengjiao/alpha/pg2", deal_page(30, 10, Some((2, 2)))).await;
    mount_page(&mock_server, "/chengjiao/beta/", deal_page(0, 0, None)).await;

    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("deals.xlsx");
    let config = create_test_config(
        &mock_server.uri(),
        &["alpha", "beta"],
        &output_path.display().to_string(),
    );

    let output = run_crawl(config, &CancellationToken::new())
        .await
        .expect("Crawl failed");

    // 30 + 10 records, all from alpha, in page order
    assert_eq!(output.dataset.len(), 40);
    assert!(output.dataset.rows().iter().all(|row| row.region == "alpha"));

    let titles: Vec<String> = output
        .dataset
        .rows()
        .iter()
        .map(|row| row.record.get("title").unwrap_or_default().to_string())
        .collect();
    let expected: Vec<String> = (0..40).map(|i| format!("listing {}", i)).collect();
    assert_eq!(titles, expected);

    // Schema column order is preserved behind the region column
    let keys = output.dataset.keys();
    assert_eq!(
        keys,
        vec![
            "region",
            "title",
            "deal_date",
            "total_price",
            "unit_price",
            "house_info",
            "position_info",
            "listing_price",
            "deal_cycle",
            "detail_link"
        ]
    );

    let first = &output.dataset.rows()[0].record;
    assert_eq!(first.get("listing_price"), Some("挂牌100万"));
    assert_eq!(first.get("deal_cycle"), Some("成交周期30天"));
    assert_eq!(first.get("unit_price"), Some("暂无数据"));

    let alpha = output.report.summary_for("alpha").unwrap();
    assert_eq!(alpha.status, RegionStatus::Complete);
    assert_eq!(alpha.pages_total, 2);
    assert_eq!(alpha.pages_attempted, 2);
    assert_eq!(alpha.pages_succeeded, 2);

    let beta = output.report.summary_for("beta").unwrap();
    assert_eq!(beta.status, RegionStatus::NoData);
    assert_eq!(output.report.empty_regions(), vec!["beta"]);
    assert_eq!(output.report.total_records, 40);

    let written = write_dataset(&output.dataset, &output_path).expect("Write failed");
    assert_eq!(written, output_path);
    assert!(output_path.is_file());
}

#[tokio::test]
async fn test_first_page_is_fetched_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/"))
        .respond_with(html(deal_page(0, 5, Some((1, 1)))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.dataset.len(), 5);
}

#[tokio::test]
async fn test_request_carries_timestamp_and_source_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/"))
        .and(query_param("srcid", "source-123"))
        .respond_with(html(deal_page(0, 2, None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    config.session.source_id = Some("source-123".to_string());

    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();
    assert_eq!(output.dataset.len(), 2);

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().any(|(k, _)| k == "_t"));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;

    // Two server errors, then the page
    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/chengjiao/alpha/", deal_page(0, 3, None)).await;

    let config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.dataset.len(), 3);
    let alpha = output.report.summary_for("alpha").unwrap();
    assert_eq!(alpha.status, RegionStatus::Complete);
    assert_eq!(alpha.pages_exhausted, 0);
}

#[tokio::test]
async fn test_non_html_body_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errno": 1}"#))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/chengjiao/alpha/", deal_page(0, 4, None)).await;

    let config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.dataset.len(), 4);
}

#[tokio::test]
async fn test_exhausted_page_does_not_stop_region() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/chengjiao/alpha/", deal_page(0, 30, Some((3, 1)))).await;
    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/pg2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/chengjiao/alpha/pg3", deal_page(60, 7, Some((3, 3)))).await;

    let config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    assert_eq!(output.dataset.len(), 37);

    let alpha = output.report.summary_for("alpha").unwrap();
    assert_eq!(alpha.status, RegionStatus::Incomplete);
    assert_eq!(alpha.pages_attempted, 3);
    assert_eq!(alpha.pages_succeeded, 2);
    assert_eq!(alpha.pages_exhausted, 1);
    assert_eq!(output.report.incomplete_regions(), vec!["alpha"]);
}

#[tokio::test]
async fn test_exhausted_first_page_is_incomplete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    let alpha = output.report.summary_for("alpha").unwrap();
    assert_eq!(alpha.status, RegionStatus::Incomplete);
    assert_eq!(alpha.records, 0);
    assert_eq!(alpha.pages_attempted, 1);
    assert_eq!(alpha.pages_succeeded, 0);
}

#[tokio::test]
async fn test_rejected_region_is_isolated() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/chengjiao/a/", deal_page(0, 2, None)).await;
    Mock::given(method("GET"))
        .and(path("/chengjiao/b/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/chengjiao/c/", deal_page(10, 3, None)).await;

    let config = create_test_config(&mock_server.uri(), &["a", "b", "c"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    let regions: Vec<&str> = output
        .dataset
        .rows()
        .iter()
        .map(|row| row.region.as_str())
        .collect();
    assert_eq!(regions, vec!["a", "a", "c", "c", "c"]);

    assert_eq!(output.report.failed_regions(), vec!["b"]);
    let b = output.report.summary_for("b").unwrap();
    assert!(b.error.as_deref().unwrap().contains("403"));
}

#[tokio::test]
async fn test_fatal_failure_keeps_partial_records() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/chengjiao/alpha/", deal_page(0, 30, Some((3, 1)))).await;
    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/pg2"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/pg3"))
        .respond_with(html(deal_page(60, 5, None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &["alpha"], "./unused.xlsx");
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    let alpha = output.report.summary_for("alpha").unwrap();
    assert_eq!(alpha.status, RegionStatus::Failed);
    assert_eq!(alpha.records, 30);
    assert_eq!(output.dataset.len(), 30);
}

#[tokio::test]
async fn test_dataset_follows_configured_order() {
    let mock_server = MockServer::start().await;

    // The first configured region answers last
    Mock::given(method("GET"))
        .and(path("/chengjiao/slow/"))
        .respond_with(html(deal_page(0, 2, None)).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/chengjiao/fast/", deal_page(100, 1, None)).await;
    mount_page(&mock_server, "/chengjiao/medium/", deal_page(200, 1, None)).await;

    let config = create_test_config(
        &mock_server.uri(),
        &["slow", "fast", "medium"],
        "./unused.xlsx",
    );
    let output = run_crawl(config, &CancellationToken::new()).await.unwrap();

    let regions: Vec<&str> = output
        .dataset
        .rows()
        .iter()
        .map(|row| row.region.as_str())
        .collect();
    assert_eq!(regions, vec!["slow", "slow", "fast", "medium"]);
}

#[tokio::test]
async fn test_cancellation_drains_and_skips_pending_regions() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/chengjiao/alpha/", deal_page(0, 30, Some((3, 1)))).await;
    Mock::given(method("GET"))
        .and(path("/chengjiao/alpha/pg2"))
        .respond_with(html(deal_page(30, 30, Some((3, 2)))))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chengjiao/beta/"))
        .respond_with(html(deal_page(0, 1, None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &["alpha", "beta"], "./unused.xlsx");
    config.crawler.max_concurrent_regions = 1;
    config.crawler.page_delay = DelayRange::new(30_000, 30_000);
    let regions = config.regions.clone();

    let coordinator = Coordinator::new(config).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    // The long inter-page pause must be cut short by the cancellation
    let results = tokio::time::timeout(Duration::from_secs(10), coordinator.run(&regions, &cancel))
        .await
        .expect("cancellation should end the run promptly");

    let alpha = results.iter().find(|r| r.region == "alpha").unwrap();
    assert_eq!(alpha.status(), RegionStatus::Interrupted);
    assert_eq!(alpha.records.len(), 30);
    assert_eq!(alpha.pages_succeeded, 1);

    let beta = results.iter().find(|r| r.region == "beta").unwrap();
    assert_eq!(beta.status(), RegionStatus::Interrupted);
    assert_eq!(beta.pages_attempted, 0);
}
