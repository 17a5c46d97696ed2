//! Region worker state definitions
//!
//! A region moves through `Init -> ResolvingPages -> FetchingPage(n) -> Done`,
//! or ends early in `NoData` when the first page holds no listings.

use std::fmt;

/// Represents the current phase of a region worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionState {
    // ===== Active States =====
    /// Worker created, nothing fetched yet
    Init,

    /// First page fetched, page count being determined
    ResolvingPages,

    /// Fetching the given 1-based page
    FetchingPage(u32),

    // ===== Terminal States =====
    /// All pages handled, or the region stopped early
    Done,

    /// The region has no listings at all
    NoData,
}

impl RegionState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::NoData)
    }

    /// Returns true if the worker may move from this state to `next`
    ///
    /// Any active state may jump straight to `Done`, which is how failures
    /// and cancellation end a region.
    pub fn can_transition_to(&self, next: RegionState) -> bool {
        match (self, next) {
            (Self::Init, Self::ResolvingPages) => true,
            (Self::ResolvingPages, Self::FetchingPage(1)) => true,
            (Self::ResolvingPages, Self::NoData) => true,
            (Self::FetchingPage(n), Self::FetchingPage(m)) => m == n + 1,
            (current, Self::Done) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Short name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ResolvingPages => "resolving_pages",
            Self::FetchingPage(_) => "fetching_page",
            Self::Done => "done",
            Self::NoData => "no_data",
        }
    }
}

impl fmt::Display for RegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchingPage(n) => write!(f, "fetching_page({})", n),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
