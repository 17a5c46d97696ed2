//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with session cookies and headers
//! - Resolving region/page pairs to listing URLs
//! - Pacing every request with a randomized pre-request delay
//! - Classifying each response into a `FetchOutcome`
//!
//! A single call performs exactly one network attempt. Retries live in the
//! `retry` module.

use crate::config::{Config, CrawlerConfig};
use crate::{ConfigError, HarvestError};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One listing page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Region key the page belongs to
    pub region: String,

    /// 1-based page number
    pub page: u32,

    /// Fully resolved listing URL (without query parameters)
    pub url: Url,
}

/// Result of a single fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page body received and looks like an HTML document
    Success(String),

    /// Transient failure; the page may be retried
    RetryableFailure(String),

    /// Failure that retrying cannot fix (e.g. the session was rejected)
    FatalFailure(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Builds the HTTP client shared by every region worker
///
/// Session cookies go into a cookie jar scoped to the portal host; locale,
/// referer and user agent are sent with every request.
pub fn build_http_client(config: &Config) -> Result<Client, HarvestError> {
    let base_url = Url::parse(&config.crawler.base_url)?;

    let jar = Jar::default();
    for (name, value) in &config.session.cookies {
        jar.add_cookie_str(&format!("{}={}", name, value), &base_url);
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("accept-language", &config.session.accept_language)?,
    );
    headers.insert(REFERER, header_value("referer", &referer(&config.crawler)?)?);

    let client = Client::builder()
        .user_agent(config.session.user_agent.as_str())
        .default_headers(headers)
        .cookie_provider(Arc::new(jar))
        .timeout(config.crawler.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HarvestError> {
    HeaderValue::from_str(value).map_err(|e| {
        HarvestError::Config(ConfigError::Validation(format!(
            "invalid {} header value: {}",
            name, e
        )))
    })
}

/// Referer sent with every request: the root of the listing section
pub fn referer(crawler: &CrawlerConfig) -> Result<String, HarvestError> {
    let mut url = Url::parse(&crawler.base_url)?;
    url.set_path(&format!("/{}/", crawler.listing.path_segment()));
    url.set_query(None);
    Ok(url.to_string())
}

/// Resolves the listing URL of a region page
///
/// Page 1 is the region root (`/chengjiao/{region}/`), later pages append
/// `pg{n}`. Every `/`-separated part of the region key is percent-encoded
/// on its own, so keys such as `keqiaoqu/lc1` or `rs碧桂园翡翠湾` work as is.
pub fn page_url(crawler: &CrawlerConfig, region: &str, page: u32) -> Result<Url, HarvestError> {
    let mut url = Url::parse(&crawler.base_url)?;
    url.set_query(None);

    {
        let mut segments = url.path_segments_mut().map_err(|_| HarvestError::PageUrl {
            region: region.to_string(),
            message: format!("base URL '{}' cannot carry a path", crawler.base_url),
        })?;

        segments.pop_if_empty().push(crawler.listing.path_segment());
        for part in region.split('/').filter(|p| !p.trim().is_empty()) {
            segments.push(part.trim());
        }

        if page > 1 {
            segments.push(&format!("pg{}", page));
        } else {
            segments.push("");
        }
    }

    Ok(url)
}

/// Issues single, paced requests for listing pages
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    client: Client,
    config: Arc<Config>,
}

impl FetchExecutor {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Builds the request for one page of a region
    pub fn page_request(&self, region: &str, page: u32) -> Result<PageRequest, HarvestError> {
        Ok(PageRequest {
            region: region.to_string(),
            page,
            url: page_url(&self.config.crawler, region, page)?,
        })
    }

    /// Performs one paced attempt at fetching a page
    ///
    /// # Request Flow
    ///
    /// 1. Sleep a random duration from the request-delay range
    /// 2. GET the page URL with `_t` (epoch millis) and `srcid` query parameters
    /// 3. Classify the response
    ///
    /// # Classification
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | HTTP 401 / 403 | FatalFailure |
    /// | Other non-2xx | RetryableFailure |
    /// | Timeout / connection error | RetryableFailure |
    /// | Body unreadable or not HTML | RetryableFailure |
    /// | Otherwise | Success |
    pub async fn fetch(&self, request: &PageRequest) -> FetchOutcome {
        let pause = self.config.crawler.request_delay.sample();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let mut query = vec![("_t", chrono::Utc::now().timestamp_millis().to_string())];
        if let Some(source_id) = &self.config.session.source_id {
            query.push(("srcid", source_id.clone()));
        }

        tracing::debug!("GET {} (page {})", request.url, request.page);

        let response = match self
            .client
            .get(request.url.clone())
            .query(&query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status();
        if let Some(outcome) = classify_status(status) {
            return outcome;
        }

        match response.text().await {
            Ok(body) if looks_like_html(&body) => FetchOutcome::Success(body),
            Ok(body) => FetchOutcome::RetryableFailure(format!(
                "malformed body ({} bytes, not an HTML document)",
                body.len()
            )),
            Err(e) => FetchOutcome::RetryableFailure(format!("failed to read body: {}", e)),
        }
    }
}

/// Maps a non-2xx status to its outcome; None for success statuses
fn classify_status(status: StatusCode) -> Option<FetchOutcome> {
    if status.is_success() {
        return None;
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(FetchOutcome::FatalFailure(format!(
            "session rejected (HTTP {})",
            status.as_u16()
        )));
    }

    Some(FetchOutcome::RetryableFailure(format!(
        "HTTP {}",
        status.as_u16()
    )))
}

fn classify_transport_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::RetryableFailure("request timeout".to_string())
    } else if e.is_connect() {
        FetchOutcome::RetryableFailure(format!("connection failed: {}", e))
    } else {
        FetchOutcome::RetryableFailure(e.to_string())
    }
}

/// Loose structural check that a body is an HTML document
fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(2048).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with('<') && (head.contains("<html") || head.contains("<body"))
}
