//! Pagination metadata attached to list responses.

use serde::{Deserialize, Serialize};

/// A navigable link as described by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    pub host: String,
    pub route: String,
    pub base_url: String,
    pub common_url: String,
    pub link: String,
}

/// `ResultPaginationType` from the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total number of records.
    #[serde(default)]
    pub total: u64,
    /// Number of pages.
    #[serde(default)]
    pub page_num: u32,
    /// Page this response holds (1-based).
    #[serde(default)]
    pub active_page: u32,
    #[serde(default)]
    pub previous_link: Option<PageLink>,
    #[serde(default)]
    pub next_link: Option<PageLink>,
}

impl Pagination {
    /// Whether the server advertised another page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next_link.is_some()
    }

    /// Page number to request next, if any.
    #[must_use]
    pub const fn next_page(&self) -> Option<u32> {
        if self.has_next() {
            Some(self.active_page.saturating_add(1))
        } else {
            None
        }
    }
}
