//! Log search criteria
//!
//! Criteria are evaluated against events already held client-side; a change
//! of criteria never queries the filtering engine again.

use crate::types::{FilteringEvent, RequestTypes};
use crate::url::contains_ignore_case;

/// Operator-entered search filters for the log table.
///
/// All filters combine conjunctively. The default value accepts every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Case-insensitive substring of the request URL
    pub free_text: Option<String>,
    /// Accepted request types; empty means any type
    pub types: RequestTypes,
    /// Only third-party requests
    pub third_party_only: bool,
    /// Only requests cancelled by a blocking rule
    pub blocked_only: bool,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text filter. Input is trimmed; blank input clears it.
    pub fn set_free_text(&mut self, text: &str) {
        let text = text.trim();
        self.free_text = if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    /// True when no filter is active.
    pub fn is_default(&self) -> bool {
        self.free_text.as_deref().map_or(true, str::is_empty)
            && self.types.is_empty()
            && !self.third_party_only
            && !self.blocked_only
    }

    /// Evaluate the criteria against one event.
    pub fn matches(&self, event: &FilteringEvent) -> bool {
        self.matches_text(event)
            && self.matches_type(event)
            && (!self.third_party_only || event.request_third_party)
            && (!self.blocked_only || event.is_blocked())
    }

    fn matches_text(&self, event: &FilteringEvent) -> bool {
        match self.free_text.as_deref() {
            None | Some("") => true,
            Some(text) => contains_ignore_case(&event.request_url, text),
        }
    }

    fn matches_type(&self, event: &FilteringEvent) -> bool {
        self.types.is_empty() || self.types.has(event.request_type)
    }
}
