//! Engine-side collaborators
//!
//! The controllers never reach into the filtering engine directly. Each
//! operation they need is one of these traits, injected at construction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fl_core::types::{FilterId, FilteringEvent, TabId, TabInfo};

/// Open tab together with the events recorded so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    #[serde(flatten)]
    pub info: TabInfo,
    #[serde(default)]
    pub filtering_events: Vec<FilteringEvent>,
}

/// The engine's filtering log.
pub trait LogSource {
    /// Tabs currently open, with their recorded events.
    fn open_tabs(&self) -> Vec<TabSnapshot>;

    /// A log page started listening.
    fn on_log_page_opened(&self) {}

    /// A log page stopped listening.
    fn on_log_page_closed(&self) {}

    fn reload_tab(&self, tab_id: TabId);

    /// Ask the engine to drop a tab's events. The page learns about it
    /// through a tab-reset notification.
    fn clear_events(&self, tab_id: TabId);
}

/// Where a rule is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallRoute {
    /// The extension's own user filter
    UserFilter,
    /// The desktop application filtering the tab
    Application,
}

impl InstallRoute {
    /// Rules for a tab intercepted by the desktop application go there.
    pub fn for_frame(frame: &TabInfo) -> Self {
        if frame.adguard_detected {
            Self::Application
        } else {
            Self::UserFilter
        }
    }
}

/// Accepts rule changes. Calls are fire-and-forget; success is reported by
/// the engine through its own channels.
pub trait RuleInstaller {
    fn add_rule(&self, route: InstallRoute, rule_text: &str);

    fn remove_rule(&self, route: InstallRoute, rule_text: &str);

    /// Drop the whitelist entry covering a frame.
    fn unwhitelist_frame(&self, frame: &TabInfo);
}

/// Subscription metadata lookup.
pub trait FilterMetadata {
    fn filter_name(&self, filter_id: FilterId) -> Option<String>;
}

impl FilterMetadata for HashMap<FilterId, String> {
    fn filter_name(&self, filter_id: FilterId) -> Option<String> {
        self.get(&filter_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_route_follows_detection() {
        let mut frame = TabInfo::new(TabId(1), "t", true);
        assert_eq!(InstallRoute::for_frame(&frame), InstallRoute::UserFilter);
        frame.adguard_detected = true;
        assert_eq!(InstallRoute::for_frame(&frame), InstallRoute::Application);
    }

    #[test]
    fn test_snapshot_decodes_flat_tab() {
        let json = r#"{"tabId":3,"title":"Docs","isHttp":true,"filteringEvents":[
            {"requestUrl":"https://example.com/app.js","requestType":"SCRIPT"}
        ]}"#;
        let snapshot: TabSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.info.tab_id, TabId(3));
        assert_eq!(snapshot.filtering_events.len(), 1);
    }
}
