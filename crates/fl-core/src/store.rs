//! Per-tab filtering event store
//!
//! Holds tab metadata and the append-only sequence of filtering events for
//! every live HTTP tab. The store is plain data: it neither renders nor
//! notifies, and every mutator reports what it did so the caller can decide
//! whether a re-render is needed.

use std::collections::HashMap;

use log::debug;

use crate::types::{FilteringEvent, TabId, TabInfo};

/// Outcome of a tab registration or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    /// Tab was not known and is now registered
    Added,
    /// Known tab had its metadata replaced in place
    Updated,
    /// Tab left the store (it stopped being an HTTP tab)
    Removed,
    /// Nothing changed (non-HTTP tab that was never registered)
    Ignored,
}

#[derive(Debug)]
struct TabEntry {
    info: TabInfo,
    events: Vec<FilteringEvent>,
}

/// Tab metadata and event sequences keyed by tab id.
#[derive(Debug, Default)]
pub struct TabEventStore {
    tabs: HashMap<TabId, TabEntry>,
    /// Registration order, for stable display
    order: Vec<TabId>,
}

impl TabEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an HTTP tab. Non-HTTP tabs are never entered.
    ///
    /// Registering an id that is already live replaces its metadata and
    /// keeps its events and display position.
    pub fn add_tab(&mut self, info: TabInfo) -> StoreChange {
        if !info.is_http {
            debug!("ignoring non-http tab {}", info.tab_id);
            return StoreChange::Ignored;
        }

        if let Some(entry) = self.tabs.get_mut(&info.tab_id) {
            entry.info = info;
            return StoreChange::Updated;
        }

        self.order.push(info.tab_id);
        self.tabs.insert(
            info.tab_id,
            TabEntry {
                info,
                events: Vec::new(),
            },
        );
        StoreChange::Added
    }

    /// Update a tab's title and detection flag.
    ///
    /// A tab that stopped being HTTP is removed; an unknown tab is added.
    pub fn update_tab(&mut self, info: TabInfo) -> StoreChange {
        if !info.is_http {
            return if self.remove_tab(info.tab_id) {
                StoreChange::Removed
            } else {
                StoreChange::Ignored
            };
        }

        match self.tabs.get_mut(&info.tab_id) {
            Some(entry) => {
                entry.info.title = info.title;
                entry.info.adguard_detected = info.adguard_detected;
                StoreChange::Updated
            }
            None => self.add_tab(info),
        }
    }

    /// Delete a tab and its events. Returns `false` for unknown tabs.
    pub fn remove_tab(&mut self, tab_id: TabId) -> bool {
        if self.tabs.remove(&tab_id).is_none() {
            debug!("remove for unknown tab {}", tab_id);
            return false;
        }
        self.order.retain(|id| *id != tab_id);
        true
    }

    /// Clear a tab's events, keeping the tab. Returns `false` for unknown tabs.
    pub fn reset_events(&mut self, tab_id: TabId) -> bool {
        match self.tabs.get_mut(&tab_id) {
            Some(entry) => {
                entry.events.clear();
                true
            }
            None => {
                debug!("reset for unknown tab {}", tab_id);
                false
            }
        }
    }

    /// Append an event to a tab. Events for unknown tabs are dropped; they
    /// can arrive after the tab was closed.
    pub fn append_event(&mut self, tab_id: TabId, event: FilteringEvent) -> bool {
        match self.tabs.get_mut(&tab_id) {
            Some(entry) => {
                entry.events.push(event);
                true
            }
            None => {
                debug!("dropping event for unknown tab {}: {}", tab_id, event.request_url);
                false
            }
        }
    }

    pub fn get_tab(&self, tab_id: TabId) -> Option<&TabInfo> {
        self.tabs.get(&tab_id).map(|entry| &entry.info)
    }

    /// Events of a tab in append order.
    pub fn get_events(&self, tab_id: TabId) -> Option<&[FilteringEvent]> {
        self.tabs.get(&tab_id).map(|entry| entry.events.as_slice())
    }

    /// Live tabs in registration order.
    pub fn list_tabs(&self) -> impl Iterator<Item = &TabInfo> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.tabs.get(id).map(|entry| &entry.info))
    }

    /// First tab in registration order.
    pub fn first_tab(&self) -> Option<&TabInfo> {
        self.order.first().and_then(|id| self.get_tab(*id))
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Drop every tab.
    pub fn clear(&mut self) {
        self.tabs.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestType;

    fn tab(id: i32, title: &str) -> TabInfo {
        TabInfo::new(TabId(id), title, true)
    }

    fn event(url: &str) -> FilteringEvent {
        FilteringEvent {
            request_url: url.to_string(),
            request_type: RequestType::Script,
            request_third_party: false,
            frame_domain: "example.com".to_string(),
            request_rule: None,
        }
    }

    #[test]
    fn test_non_http_tab_is_ignored() {
        let mut store = TabEventStore::new();
        let info = TabInfo::new(TabId(1), "Settings", false);
        assert_eq!(store.add_tab(info), StoreChange::Ignored);
        assert!(store.is_empty());
        assert!(!store.append_event(TabId(1), event("http://a.com/x.js")));
    }

    #[test]
    fn test_list_tabs_in_registration_order() {
        let mut store = TabEventStore::new();
        store.add_tab(tab(7, "seven"));
        store.add_tab(tab(3, "three"));
        store.add_tab(tab(5, "five"));
        store.update_tab(tab(3, "three again"));

        let ids: Vec<i32> = store.list_tabs().map(|t| t.tab_id.0).collect();
        assert_eq!(ids, vec![7, 3, 5]);
        assert_eq!(store.get_tab(TabId(3)).unwrap().title, "three again");
        assert_eq!(store.first_tab().unwrap().tab_id, TabId(7));
    }

    #[test]
    fn test_update_unknown_tab_adds_it() {
        let mut store = TabEventStore::new();
        assert_eq!(store.update_tab(tab(1, "one")), StoreChange::Added);
        assert!(store.contains(TabId(1)));
    }

    #[test]
    fn test_update_to_non_http_removes() {
        let mut store = TabEventStore::new();
        store.add_tab(tab(1, "one"));
        store.append_event(TabId(1), event("http://a.com/1"));

        let mut info = tab(1, "chrome://newtab");
        info.is_http = false;
        assert_eq!(store.update_tab(info.clone()), StoreChange::Removed);
        assert!(store.get_events(TabId(1)).is_none());
        assert_eq!(store.update_tab(info), StoreChange::Ignored);
    }

    #[test]
    fn test_update_keeps_events() {
        let mut store = TabEventStore::new();
        store.add_tab(tab(1, "one"));
        store.append_event(TabId(1), event("http://a.com/1"));

        let mut info = tab(1, "renamed");
        info.adguard_detected = true;
        assert_eq!(store.update_tab(info), StoreChange::Updated);

        let stored = store.get_tab(TabId(1)).unwrap();
        assert_eq!(stored.title, "renamed");
        assert!(stored.adguard_detected);
        assert_eq!(store.get_events(TabId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_event_count_tracks_accepted_appends() {
        let mut store = TabEventStore::new();
        store.add_tab(tab(1, "one"));

        let mut accepted = 0;
        for i in 0..10 {
            let target = if i % 3 == 0 { TabId(99) } else { TabId(1) };
            if store.append_event(target, event(&format!("http://a.com/{i}"))) {
                accepted += 1;
            }
            assert_eq!(store.get_events(TabId(1)).unwrap().len(), accepted);
        }
        assert_eq!(accepted, 6);

        let urls: Vec<&str> = store
            .get_events(TabId(1))
            .unwrap()
            .iter()
            .map(|e| e.request_url.as_str())
            .collect();
        assert_eq!(urls[0], "http://a.com/1");
        assert_eq!(urls[5], "http://a.com/8");
    }

    #[test]
    fn test_reset_is_idempotent_and_keeps_tab() {
        let mut store = TabEventStore::new();
        store.add_tab(tab(1, "one"));
        store.append_event(TabId(1), event("http://a.com/1"));
        store.append_event(TabId(1), event("http://a.com/2"));

        assert!(store.reset_events(TabId(1)));
        assert!(store.reset_events(TabId(1)));
        assert_eq!(store.get_events(TabId(1)), Some(&[][..]));
        assert!(store.contains(TabId(1)));
        assert!(!store.reset_events(TabId(2)));
    }

    #[test]
    fn test_remove_tab() {
        let mut store = TabEventStore::new();
        store.add_tab(tab(1, "one"));
        store.add_tab(tab(2, "two"));

        assert!(store.remove_tab(TabId(1)));
        assert!(!store.remove_tab(TabId(1)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.first_tab().unwrap().tab_id, TabId(2));

        store.clear();
        assert!(store.first_tab().is_none());
    }
}
