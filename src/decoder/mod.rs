//! Page decoders turning listing HTML into records
//!
//! A decoder is a pure function of the page text: no network access and no
//! shared state. One decoder exists per listing kind, each with its own
//! fixed column schema.
//!
//! Individual listings that cannot be decoded are skipped and logged; a bad
//! listing never fails the rest of its page.

mod deal;
mod onsale;

pub use deal::{DealDecoder, DEAL_SCHEMA};
pub use onsale::{OnSaleDecoder, ON_SALE_SCHEMA};

use crate::config::ListingKind;
use crate::dataset::{Record, Schema};
use scraper::{ElementRef, Selector};
use std::sync::Arc;
use thiserror::Error;

/// Reasons a single listing item is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("listing item has neither a title nor a detail link")]
    MissingIdentity,

    #[error("malformed {field}: '{value}'")]
    MalformedField { field: &'static str, value: String },
}

/// Converts the text of one listing page into records
pub trait PageDecoder: Send + Sync {
    /// Column schema of the records this decoder produces
    fn schema(&self) -> Schema;

    /// Decodes every listing on the page, in page order
    fn decode(&self, html: &str) -> Vec<Record>;

    /// Number of listing items present on the page, decodable or not
    fn count_listings(&self, html: &str) -> usize;
}

/// Returns the decoder for a listing kind
pub fn decoder_for(kind: ListingKind) -> Arc<dyn PageDecoder> {
    match kind {
        ListingKind::Deal => Arc::new(DealDecoder),
        ListingKind::OnSale => Arc::new(OnSaleDecoder),
    }
}

/// Text of the first element matching `css` below `element`, trimmed
///
/// Returns None when nothing matches or the text is blank.
pub(crate) fn select_text(element: &ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;

    element
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Attribute of the first element matching `css` below `element`
pub(crate) fn select_attr(element: &ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;

    element
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trimmed text of every element matching `css` below `element`
pub(crate) fn select_all_text(element: &ElementRef<'_>, css: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };

    element
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// True if any element matches `css` below `element`
pub(crate) fn has_match(element: &ElementRef<'_>, css: &str) -> bool {
    Selector::parse(css)
        .map(|selector| element.select(&selector).next().is_some())
        .unwrap_or(false)
}
