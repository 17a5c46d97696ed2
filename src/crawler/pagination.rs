//! Page-count discovery from a region's first listing page
//!
//! The portal embeds a JSON descriptor on the pager container:
//!
//! ```html
//! <div class="page-box" comp-module="page" page-data='{"totalPage":5,"curPage":1}'></div>
//! ```

use crate::decoder::PageDecoder;
use scraper::{Html, Selector};
use serde::Deserialize;

const PAGER_SELECTOR: &str = r#"div[comp-module="page"]"#;
const PAGER_ATTR: &str = "page-data";

/// Pagination descriptor carried by the pager container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageData {
    #[serde(rename = "totalPage", default = "first_page")]
    pub total_page: u32,

    #[serde(rename = "curPage", default = "first_page")]
    pub cur_page: u32,
}

fn first_page() -> u32 {
    1
}

/// What the first page says about pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationInfo {
    /// Descriptor found and decoded
    Present(PageData),

    /// Descriptor attribute present but not decodable
    Malformed(String),

    /// No pager container with a descriptor on the page
    Absent,
}

/// Reads the pagination descriptor from a page body
pub fn read_pagination(html: &str) -> PaginationInfo {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(PAGER_SELECTOR) else {
        return PaginationInfo::Absent;
    };

    let Some(raw) = document
        .select(&selector)
        .find_map(|el| el.value().attr(PAGER_ATTR))
    else {
        return PaginationInfo::Absent;
    };

    match serde_json::from_str::<PageData>(raw) {
        Ok(data) => PaginationInfo::Present(data),
        Err(e) => PaginationInfo::Malformed(format!("{} (raw: {})", e, raw)),
    }
}

/// Determines how many listing pages a region has
///
/// - descriptor present: its `totalPage`, at least 1 if the page has listings
/// - descriptor absent: 1 if the page has listings, otherwise 0 (no data)
/// - descriptor malformed: 1, so the first page's listings are still kept
pub fn resolve_page_count(region: &str, html: &str, decoder: &dyn PageDecoder) -> u32 {
    match read_pagination(html) {
        PaginationInfo::Present(data) => {
            tracing::info!(
                "Region {} has {} pages (current page {})",
                region,
                data.total_page,
                data.cur_page
            );
            if data.total_page == 0 && decoder.count_listings(html) > 0 {
                tracing::warn!(
                    "Region {}: pagination reports no pages but the first page has listings, crawling it alone",
                    region
                );
                return 1;
            }
            data.total_page
        }
        PaginationInfo::Malformed(reason) => {
            tracing::warn!(
                "Region {}: malformed pagination data, crawling first page only: {}",
                region,
                reason
            );
            1
        }
        PaginationInfo::Absent => {
            if decoder.count_listings(html) > 0 {
                tracing::info!("Region {} has a single page of listings", region);
                1
            } else {
                tracing::info!("Region {} has no listings", region);
                0
            }
        }
    }
}
