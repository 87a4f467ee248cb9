//! Inbox filter state.
//!
//! [`InboxFilters`] is the owned filter state behind the inbox list. Every
//! user intent is a [`FilterIntent`] applied through [`InboxFilters::apply`];
//! the intent also says how the resulting list request should be sent.

use crate::domain::{AccountId, EmailListParams};

/// How a list request triggered by an intent is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Wait until input settles.
    Debounced,
    /// Send right away.
    Immediate,
}

/// A change to the inbox filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterIntent {
    /// The search box text changed.
    Search(String),
    /// A category chip was clicked. Clicking the active one clears it.
    ToggleCategory(String),
    /// A sentiment chip was clicked. Clicking the active one clears it.
    ToggleSentiment(String),
    /// A processed chip was clicked. Clicking the active one clears it.
    ToggleProcessed(bool),
    /// Reset every filter.
    Clear,
}

impl FilterIntent {
    /// Dispatch mode for the list request this intent triggers.
    pub fn dispatch(&self) -> Dispatch {
        match self {
            FilterIntent::Search(_) => Dispatch::Debounced,
            _ => Dispatch::Immediate,
        }
    }
}

/// Current inbox filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxFilters {
    pub search: String,
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub processed: Option<bool>,
}

impl InboxFilters {
    /// Returns the filters after `intent`.
    pub fn apply(self, intent: FilterIntent) -> Self {
        match intent {
            FilterIntent::Search(search) => Self { search, ..self },
            FilterIntent::ToggleCategory(category) => Self {
                category: toggle(self.category, category),
                ..self
            },
            FilterIntent::ToggleSentiment(sentiment) => Self {
                sentiment: toggle(self.sentiment, sentiment),
                ..self
            },
            FilterIntent::ToggleProcessed(processed) => Self {
                processed: toggle(self.processed, processed),
                ..self
            },
            FilterIntent::Clear => Self::default(),
        }
    }

    /// Returns whether no filter is active.
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.category.is_none()
            && self.sentiment.is_none()
            && self.processed.is_none()
    }

    /// Builds list parameters scoped to `account`.
    pub fn to_params(&self, account: Option<&AccountId>) -> EmailListParams {
        let search = self.search.trim();
        EmailListParams {
            account: account.map(|id| id.0.clone()),
            search: (!search.is_empty()).then(|| search.to_string()),
            category: self.category.clone(),
            sentiment: self.sentiment.clone(),
            processed: self.processed,
            ..EmailListParams::default()
        }
    }
}

fn toggle<T: PartialEq>(current: Option<T>, clicked: T) -> Option<T> {
    match current {
        Some(active) if active == clicked => None,
        _ => Some(clicked),
    }
}
