//! List query descriptor and paginated envelope.
//!
//! [`EmailListParams::matches`] and [`PaginatedResponse::from_window`] are the
//! single definition of the filtering and pagination policy; the fixture
//! backend uses them directly so it stays interchangeable with the live API.

use serde::{Deserialize, Serialize};

use super::EmailWithAnalysis;

/// Page size used when a query does not specify one.
pub const DEFAULT_LIMIT: u64 = 50;

/// Query for the email list. Every field is optional; `None` means no
/// constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
}

impl EmailListParams {
    /// Creates an unconstrained query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to one account.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of matching records to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the free-text search.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Filters on analysis category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filters on analysis sentiment.
    pub fn sentiment(mut self, sentiment: impl Into<String>) -> Self {
        self.sentiment = Some(sentiment.into());
        self
    }

    /// Filters on the processed flag.
    pub fn processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    /// Effective page size. Zero is treated as unset.
    pub fn effective_limit(&self) -> u64 {
        self.limit.filter(|&l| l > 0).unwrap_or(DEFAULT_LIMIT)
    }

    /// Effective offset.
    pub fn effective_offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Search text, if it constrains anything.
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns whether `email` satisfies every constraint of this query.
    ///
    /// Search is a case-insensitive substring match over subject, sender and
    /// body. Category and sentiment are exact matches against the analysis;
    /// an unanalyzed record never matches either. `account` is scoped by the
    /// server and has no counterpart on the record itself.
    pub fn matches(&self, email: &EmailWithAnalysis) -> bool {
        if let Some(needle) = self.search_text() {
            let needle = needle.to_lowercase();
            let hit = [
                email.email.subject.as_str(),
                email.email.from_addr.as_str(),
                email.email.raw_body.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(category) = self.category.as_deref() {
            if email.category() != Some(category) {
                return false;
            }
        }

        if let Some(sentiment) = self.sentiment.as_deref() {
            if email.sentiment() != Some(sentiment) {
                return false;
            }
        }

        if let Some(processed) = self.processed {
            if email.email.processed != processed {
                return false;
            }
        }

        true
    }
}

/// One page of a filtered collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(rename = "data")]
    pub items: Vec<T>,
    /// Number of records matching the query across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u64,
    pub limit: u64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// Slices `matching` to the window described by `offset` and `limit`.
    ///
    /// `limit` must be non-zero.
    pub fn from_window(matching: Vec<T>, offset: u64, limit: u64) -> Self {
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();

        Self {
            items,
            total,
            page: (offset / limit).saturating_add(1),
            limit,
            has_more: offset.saturating_add(limit) < total,
        }
    }

    /// Returns whether the envelope agrees with the offset it was requested at.
    pub fn is_consistent_with(&self, offset: u64) -> bool {
        self.limit > 0
            && self.page == (offset / self.limit).saturating_add(1)
            && self.has_more == (offset.saturating_add(self.limit) < self.total)
            && self.items.len() as u64 <= self.limit
    }
}
