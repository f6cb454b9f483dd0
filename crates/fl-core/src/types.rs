//! Core type definitions for the filtering log
//!
//! These types mirror the records the filtering engine reports for every
//! browser tab. Field names serialize in camelCase so notification payloads
//! coming from the extension background page decode without a mapping layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error type for core value parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),
}

// =============================================================================
// Identifiers
// =============================================================================

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filter list identifier.
///
/// Two ids are reserved for pseudo-filters; every other id names a
/// read-only subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(pub u32);

impl FilterId {
    /// Editable custom rules.
    pub const USER_FILTER: FilterId = FilterId(0);
    /// Domain exceptions created from the popup.
    pub const WHITE_LIST: FilterId = FilterId(100);

    #[inline]
    pub fn is_user_filter(self) -> bool {
        self == Self::USER_FILTER
    }

    #[inline]
    pub fn is_white_list(self) -> bool {
        self == Self::WHITE_LIST
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Resource kind of a filtered request, as named by the filtering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(rename = "DOCUMENT")]
    Document,
    #[serde(rename = "SUBDOCUMENT")]
    Subdocument,
    #[serde(rename = "STYLESHEET")]
    Stylesheet,
    #[serde(rename = "SCRIPT")]
    Script,
    #[serde(rename = "XMLHTTPREQUEST")]
    XmlHttpRequest,
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "OBJECT")]
    Object,
    #[serde(rename = "OBJECT-SUBREQUEST")]
    ObjectSubrequest,
    #[serde(rename = "OTHER")]
    Other,
}

impl RequestType {
    /// Every request type, in vocabulary order.
    pub const ALL: [RequestType; 9] = [
        Self::Document,
        Self::Subdocument,
        Self::Stylesheet,
        Self::Script,
        Self::XmlHttpRequest,
        Self::Image,
        Self::Object,
        Self::ObjectSubrequest,
        Self::Other,
    ];

    /// Engine name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::Subdocument => "SUBDOCUMENT",
            Self::Stylesheet => "STYLESHEET",
            Self::Script => "SCRIPT",
            Self::XmlHttpRequest => "XMLHTTPREQUEST",
            Self::Image => "IMAGE",
            Self::Object => "OBJECT",
            Self::ObjectSubrequest => "OBJECT-SUBREQUEST",
            Self::Other => "OTHER",
        }
    }

    /// Parse an engine type name. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    /// Label shown in the type column. Document and object kinds collapse
    /// into a single label each.
    pub fn label(self) -> &'static str {
        match self {
            Self::Document | Self::Subdocument => "HTML",
            Self::Stylesheet => "CSS",
            Self::Script => "JavaScript",
            Self::XmlHttpRequest => "Ajax",
            Self::Image => "Image",
            Self::Object | Self::ObjectSubrequest => "Media",
            Self::Other => "Other",
        }
    }

    /// Single-bit mask for this type.
    pub fn mask(self) -> RequestTypes {
        match self {
            Self::Document => RequestTypes::DOCUMENT,
            Self::Subdocument => RequestTypes::SUBDOCUMENT,
            Self::Stylesheet => RequestTypes::STYLESHEET,
            Self::Script => RequestTypes::SCRIPT,
            Self::XmlHttpRequest => RequestTypes::XMLHTTPREQUEST,
            Self::Image => RequestTypes::IMAGE,
            Self::Object => RequestTypes::OBJECT,
            Self::ObjectSubrequest => RequestTypes::OBJECT_SUBREQUEST,
            Self::Other => RequestTypes::OTHER,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of request types, used by the type filter of the log search.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestTypes: u16 {
        const DOCUMENT = 1 << 0;
        const SUBDOCUMENT = 1 << 1;
        const STYLESHEET = 1 << 2;
        const SCRIPT = 1 << 3;
        const XMLHTTPREQUEST = 1 << 4;
        const IMAGE = 1 << 5;
        const OBJECT = 1 << 6;
        const OBJECT_SUBREQUEST = 1 << 7;
        const OTHER = 1 << 8;

        /// Everything labelled "HTML"
        const HTML = Self::DOCUMENT.bits() | Self::SUBDOCUMENT.bits();
        /// Everything labelled "Media"
        const MEDIA = Self::OBJECT.bits() | Self::OBJECT_SUBREQUEST.bits();
        /// All request types
        const ALL = 0x01FF;
    }
}

impl Default for RequestTypes {
    fn default() -> Self {
        Self::empty()
    }
}

impl RequestTypes {
    /// Parse a comma-separated list of engine type names
    /// (`"DOCUMENT,SUBDOCUMENT"`). An empty list yields the empty set.
    pub fn parse_list(list: &str) -> Result<Self, CoreError> {
        let mut types = Self::empty();
        for name in list.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let request_type = RequestType::from_name(name)
                .ok_or_else(|| CoreError::UnknownRequestType(name.to_string()))?;
            types |= request_type.mask();
        }
        Ok(types)
    }

    /// Check whether a single type is a member of the set.
    #[inline]
    pub fn has(self, request_type: RequestType) -> bool {
        self.contains(request_type.mask())
    }
}

// =============================================================================
// Filtering Records
// =============================================================================

/// Rule that decided a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRule {
    pub rule_text: String,
    pub filter_id: FilterId,
    /// Exception (`@@`) rule rather than a blocking one
    #[serde(default)]
    pub white_list_rule: bool,
}

/// One filtering decision observed on a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringEvent {
    pub request_url: String,
    pub request_type: RequestType,
    #[serde(default)]
    pub request_third_party: bool,
    /// Domain of the frame that issued the request
    #[serde(default)]
    pub frame_domain: String,
    #[serde(default)]
    pub request_rule: Option<MatchedRule>,
}

impl FilteringEvent {
    /// Request was cancelled by a blocking rule.
    pub fn is_blocked(&self) -> bool {
        self.request_rule
            .as_ref()
            .is_some_and(|rule| !rule.white_list_rule)
    }

    /// Request was let through by an exception rule.
    pub fn is_allowed(&self) -> bool {
        self.request_rule
            .as_ref()
            .is_some_and(|rule| rule.white_list_rule)
    }
}

/// Tab metadata kept next to the tab's events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub tab_id: TabId,
    #[serde(default)]
    pub title: String,
    pub is_http: bool,
    /// Tab traffic is intercepted by the desktop application rather than
    /// the extension itself
    #[serde(default)]
    pub adguard_detected: bool,
}

impl TabInfo {
    pub fn new(tab_id: TabId, title: impl Into<String>, is_http: bool) -> Self {
        Self {
            tab_id,
            title: title.into(),
            is_http,
            adguard_detected: false,
        }
    }
}
