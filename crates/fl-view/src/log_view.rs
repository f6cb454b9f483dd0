//! Filtering log view controller
//!
//! Applies engine notifications to the [`TabEventStore`], tracks which tab
//! the operator is looking at, and maintains the projection of that tab's
//! events as table rows. Every change to the projection is pushed to a
//! [`LogRenderer`]; the renderer never holds state the controller needs.
//!
//! Selection is either nothing or one live tab. When the selected tab goes
//! away the first remaining tab (in registration order) takes its place.

use log::debug;

use fl_core::notifier::LogEvent;
use fl_core::search::SearchCriteria;
use fl_core::store::{StoreChange, TabEventStore};
use fl_core::types::{FilteringEvent, RequestTypes, TabId, TabInfo};

use crate::collab::TabSnapshot;
use crate::labels::Labels;

// =============================================================================
// Projection
// =============================================================================

/// Decision shown by a row's color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// No rule matched
    Neutral,
    /// Cancelled by a blocking rule
    Blocked,
    /// Let through by an exception rule
    Allowed,
}

impl RowStatus {
    pub fn of(event: &FilteringEvent) -> Self {
        match &event.request_rule {
            None => Self::Neutral,
            Some(rule) if rule.white_list_rule => Self::Allowed,
            Some(_) => Self::Blocked,
        }
    }
}

/// One rendered log table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub event: FilteringEvent,
    pub status: RowStatus,
    pub type_label: &'static str,
    /// Rule column text
    pub rule_label: String,
    /// Passes the current search criteria
    pub visible: bool,
}

/// Header of the log page for the selected tab.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabHeader {
    pub tab_id: Option<TabId>,
    pub title: String,
    /// Selects the "intercepted by the application" logo
    pub adguard_detected: bool,
}

/// Current tab selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    NoTabSelected,
    TabSelected(TabId),
}

/// Receives projection changes.
pub trait LogRenderer {
    /// Tab selector entries, in display order.
    fn render_tabs(&mut self, tabs: &[TabInfo]);

    fn render_header(&mut self, header: &TabHeader);

    fn clear_rows(&mut self);

    /// Rows appended at the end of the table.
    fn append_rows(&mut self, rows: &[LogRow]);

    fn set_row_visible(&mut self, index: usize, visible: bool);

    /// Switch between the table and the "no events" placeholder.
    fn set_empty(&mut self, empty: bool);
}

fn build_row(event: &FilteringEvent, criteria: &SearchCriteria, labels: &Labels) -> LogRow {
    let rule_label = match &event.request_rule {
        Some(rule) if rule.filter_id.is_white_list() => labels.in_whitelist.clone(),
        Some(rule) => rule.rule_text.clone(),
        None => String::new(),
    };

    LogRow {
        event: event.clone(),
        status: RowStatus::of(event),
        type_label: event.request_type.label(),
        rule_label,
        visible: criteria.matches(event),
    }
}

// =============================================================================
// Controller
// =============================================================================

pub struct LogViewController<R: LogRenderer> {
    store: TabEventStore,
    selection: Selection,
    criteria: SearchCriteria,
    rows: Vec<LogRow>,
    empty: bool,
    labels: Labels,
    renderer: R,
    closed: bool,
}

impl<R: LogRenderer> LogViewController<R> {
    pub fn new(renderer: R, labels: Labels) -> Self {
        Self {
            store: TabEventStore::new(),
            selection: Selection::NoTabSelected,
            criteria: SearchCriteria::default(),
            rows: Vec::new(),
            empty: true,
            labels,
            renderer,
            closed: false,
        }
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    /// Apply one engine notification. Ignored once the view is closed.
    pub fn handle(&mut self, event: &LogEvent) {
        if self.closed {
            debug!("log view closed, dropping {:?}", event.kind());
            return;
        }

        match event {
            LogEvent::TabAdded { tab } => self.on_tab_added(tab.clone()),
            LogEvent::TabUpdated { tab } => self.on_tab_updated(tab.clone()),
            LogEvent::TabClosed { tab } => self.on_tab_closed(tab.tab_id),
            LogEvent::TabReset { tab } => self.on_tab_reset(tab.tab_id),
            LogEvent::EventAdded { tab, event } => self.on_event_added(tab.tab_id, event.clone()),
        }
    }

    /// Load the engine's open tabs and select `initial_tab`, or the first
    /// tab when it is absent or unknown.
    pub fn synchronize(&mut self, tabs: Vec<TabSnapshot>, initial_tab: Option<TabId>) {
        for snapshot in tabs {
            let tab_id = snapshot.info.tab_id;
            if self.store.add_tab(snapshot.info) == StoreChange::Ignored {
                continue;
            }
            for event in snapshot.filtering_events {
                self.store.append_event(tab_id, event);
            }
        }
        self.render_tabs();
        self.select_tab(initial_tab);
    }

    pub fn on_tab_added(&mut self, info: TabInfo) {
        let tab_id = info.tab_id;
        match self.store.add_tab(info) {
            StoreChange::Ignored | StoreChange::Removed => {}
            StoreChange::Added => {
                self.render_tabs();
                if self.selection == Selection::NoTabSelected {
                    self.select_tab(None);
                }
            }
            StoreChange::Updated => {
                self.render_tabs();
                if self.is_selected(tab_id) {
                    self.render_header();
                }
            }
        }
    }

    pub fn on_tab_updated(&mut self, info: TabInfo) {
        let tab_id = info.tab_id;
        match self.store.update_tab(info) {
            StoreChange::Ignored => {}
            StoreChange::Removed => self.after_tab_removed(tab_id),
            StoreChange::Added => {
                self.render_tabs();
                if self.selection == Selection::NoTabSelected {
                    self.select_tab(None);
                }
            }
            StoreChange::Updated => {
                self.render_tabs();
                if self.is_selected(tab_id) {
                    self.render_header();
                }
            }
        }
    }

    pub fn on_tab_closed(&mut self, tab_id: TabId) {
        if self.store.remove_tab(tab_id) {
            self.after_tab_removed(tab_id);
        }
    }

    pub fn on_tab_reset(&mut self, tab_id: TabId) {
        if self.store.reset_events(tab_id) && self.is_selected(tab_id) {
            self.rows.clear();
            self.renderer.clear_rows();
            self.update_empty(true);
        }
    }

    pub fn on_event_added(&mut self, tab_id: TabId, event: FilteringEvent) {
        if !self.is_selected(tab_id) {
            self.store.append_event(tab_id, event);
            return;
        }

        let row = build_row(&event, &self.criteria, &self.labels);
        if self.store.append_event(tab_id, event) {
            self.push_rows(vec![row]);
        }
    }

    fn after_tab_removed(&mut self, tab_id: TabId) {
        self.render_tabs();
        if self.is_selected(tab_id) {
            self.selection = Selection::NoTabSelected;
            self.select_tab(None);
        }
    }

    // -------------------------------------------------------------------------
    // Operator input
    // -------------------------------------------------------------------------

    /// Select a tab. Unknown or absent ids fall back to the first tab.
    pub fn select_tab(&mut self, tab_id: Option<TabId>) {
        let target = tab_id
            .filter(|id| self.store.contains(*id))
            .or_else(|| self.store.first_tab().map(|tab| tab.tab_id));

        self.selection = match target {
            Some(id) => Selection::TabSelected(id),
            None => Selection::NoTabSelected,
        };
        debug!("selected tab {:?}", self.selection);

        self.render_header();
        self.render_selected_rows();
    }

    pub fn set_free_text(&mut self, text: &str) {
        self.criteria.set_free_text(text);
        self.apply_criteria();
    }

    pub fn set_types(&mut self, types: RequestTypes) {
        self.criteria.types = types;
        self.apply_criteria();
    }

    pub fn set_third_party_only(&mut self, enabled: bool) {
        self.criteria.third_party_only = enabled;
        self.apply_criteria();
    }

    pub fn set_blocked_only(&mut self, enabled: bool) {
        self.criteria.blocked_only = enabled;
        self.apply_criteria();
    }

    pub fn set_criteria(&mut self, criteria: SearchCriteria) {
        self.criteria = criteria;
        self.apply_criteria();
    }

    /// Frame info and event behind a row, for the rule wizard.
    ///
    /// `None` when the row does not exist or the selected tab's frame info
    /// is gone.
    pub fn request_target(&self, row: usize) -> Option<(TabInfo, FilteringEvent)> {
        let tab_id = self.selected_tab()?;
        let frame = self.store.get_tab(tab_id)?;
        let row = self.rows.get(row)?;
        Some((frame.clone(), row.event.clone()))
    }

    /// Stop reacting to notifications.
    pub fn close(&mut self) {
        self.closed = true;
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_tab(&self) -> Option<TabId> {
        match self.selection {
            Selection::TabSelected(id) => Some(id),
            Selection::NoTabSelected => None,
        }
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &LogRow> + '_ {
        self.rows.iter().filter(|row| row.visible)
    }

    /// The "no events" placeholder is shown.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn store(&self) -> &TabEventStore {
        &self.store
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn is_selected(&self, tab_id: TabId) -> bool {
        self.selection == Selection::TabSelected(tab_id)
    }

    fn render_tabs(&mut self) {
        let tabs: Vec<TabInfo> = self.store.list_tabs().cloned().collect();
        self.renderer.render_tabs(&tabs);
    }

    fn render_header(&mut self) {
        let header = self
            .selected_tab()
            .and_then(|id| self.store.get_tab(id))
            .map(|tab| TabHeader {
                tab_id: Some(tab.tab_id),
                title: tab.title.clone(),
                adguard_detected: tab.adguard_detected,
            })
            .unwrap_or_default();
        self.renderer.render_header(&header);
    }

    fn render_selected_rows(&mut self) {
        self.rows.clear();
        self.renderer.clear_rows();

        let rows: Vec<LogRow> = match self.selected_tab().and_then(|id| self.store.get_events(id)) {
            Some(events) => events
                .iter()
                .map(|event| build_row(event, &self.criteria, &self.labels))
                .collect(),
            None => Vec::new(),
        };
        self.push_rows(rows);
    }

    fn push_rows(&mut self, rows: Vec<LogRow>) {
        if rows.is_empty() {
            self.update_empty(self.rows.is_empty());
            return;
        }
        self.renderer.append_rows(&rows);
        self.rows.extend(rows);
        self.update_empty(false);
    }

    fn apply_criteria(&mut self) {
        let show_all = self.criteria.is_default();
        for (index, row) in self.rows.iter_mut().enumerate() {
            let visible = show_all || self.criteria.matches(&row.event);
            if row.visible != visible {
                row.visible = visible;
                self.renderer.set_row_visible(index, visible);
            }
        }
    }

    fn update_empty(&mut self, empty: bool) {
        if self.empty != empty {
            self.empty = empty;
            self.renderer.set_empty(empty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::types::{FilterId, MatchedRule, RequestType};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Tabs(Vec<i32>),
        Header(Option<i32>, String, bool),
        Clear,
        Append(usize),
        Visible(usize, bool),
        Empty(bool),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Recorder {
        fn take(&mut self) -> Vec<Op> {
            std::mem::take(&mut self.ops)
        }
    }

    impl LogRenderer for Recorder {
        fn render_tabs(&mut self, tabs: &[TabInfo]) {
            self.ops.push(Op::Tabs(tabs.iter().map(|t| t.tab_id.0).collect()));
        }
        fn render_header(&mut self, header: &TabHeader) {
            self.ops.push(Op::Header(
                header.tab_id.map(|id| id.0),
                header.title.clone(),
                header.adguard_detected,
            ));
        }
        fn clear_rows(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn append_rows(&mut self, rows: &[LogRow]) {
            self.ops.push(Op::Append(rows.len()));
        }
        fn set_row_visible(&mut self, index: usize, visible: bool) {
            self.ops.push(Op::Visible(index, visible));
        }
        fn set_empty(&mut self, empty: bool) {
            self.ops.push(Op::Empty(empty));
        }
    }

    fn controller() -> LogViewController<Recorder> {
        LogViewController::new(Recorder::default(), Labels::default())
    }

    fn tab(id: i32, title: &str) -> TabInfo {
        TabInfo::new(TabId(id), title, true)
    }

    fn event(url: &str, request_type: RequestType, third_party: bool, rule: Option<MatchedRule>) -> FilteringEvent {
        FilteringEvent {
            request_url: url.to_string(),
            request_type,
            request_third_party: third_party,
            frame_domain: "news.example.org".to_string(),
            request_rule: rule,
        }
    }

    fn rule(text: &str, filter: FilterId, white_list_rule: bool) -> MatchedRule {
        MatchedRule {
            rule_text: text.to_string(),
            filter_id: filter,
            white_list_rule,
        }
    }

    #[test]
    fn test_first_tab_is_auto_selected() {
        let mut view = controller();
        assert_eq!(view.selection(), Selection::NoTabSelected);

        view.on_tab_added(tab(4, "four"));
        assert_eq!(view.selection(), Selection::TabSelected(TabId(4)));

        view.on_tab_added(tab(5, "five"));
        assert_eq!(view.selected_tab(), Some(TabId(4)));
    }

    #[test]
    fn test_non_http_tab_never_selected() {
        let mut view = controller();
        view.on_tab_added(TabInfo::new(TabId(1), "chrome://settings", false));
        assert_eq!(view.selection(), Selection::NoTabSelected);
        assert!(view.renderer().ops.is_empty());
    }

    #[test]
    fn test_removing_selected_tab_falls_back() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_tab_added(tab(2, "two"));
        view.on_tab_added(tab(3, "three"));
        view.select_tab(Some(TabId(2)));

        view.on_tab_closed(TabId(2));
        assert_eq!(view.selected_tab(), Some(TabId(1)));

        view.on_tab_closed(TabId(3));
        assert_eq!(view.selected_tab(), Some(TabId(1)));

        view.on_tab_closed(TabId(1));
        assert_eq!(view.selection(), Selection::NoTabSelected);
    }

    #[test]
    fn test_tab_turning_non_http_is_removed() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_tab_added(tab(2, "two"));

        let mut info = tab(1, "about:blank");
        info.is_http = false;
        view.on_tab_updated(info);

        assert!(!view.store().contains(TabId(1)));
        assert_eq!(view.selected_tab(), Some(TabId(2)));
    }

    #[test]
    fn test_update_of_selected_tab_renders_header_only() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_event_added(TabId(1), event("http://a.com/x.js", RequestType::Script, false, None));
        view.renderer_mut().take();

        let mut info = tab(1, "renamed");
        info.adguard_detected = true;
        view.on_tab_updated(info);

        assert_eq!(
            view.renderer_mut().take(),
            vec![Op::Tabs(vec![1]), Op::Header(Some(1), "renamed".to_string(), true)]
        );
        assert_eq!(view.rows().len(), 1);
    }

    #[test]
    fn test_update_of_unknown_tab_adds_it() {
        let mut view = controller();
        view.on_tab_updated(tab(9, "nine"));
        assert_eq!(view.selected_tab(), Some(TabId(9)));
    }

    #[test]
    fn test_event_rendered_incrementally_for_selected_tab() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_tab_added(tab(2, "two"));
        view.renderer_mut().take();

        view.on_event_added(TabId(1), event("http://a.com/1.js", RequestType::Script, false, None));
        view.on_event_added(TabId(1), event("http://a.com/2.js", RequestType::Script, false, None));
        assert_eq!(
            view.renderer_mut().take(),
            vec![Op::Append(1), Op::Empty(false), Op::Append(1)]
        );

        view.on_event_added(TabId(2), event("http://b.com/1.js", RequestType::Script, false, None));
        assert!(view.renderer_mut().take().is_empty());
        assert_eq!(view.store().get_events(TabId(2)).unwrap().len(), 1);

        view.select_tab(Some(TabId(2)));
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].event.request_url, "http://b.com/1.js");
    }

    #[test]
    fn test_event_for_unknown_tab_is_dropped() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_tab_closed(TabId(1));
        view.renderer_mut().take();

        view.on_event_added(TabId(1), event("http://a.com/late.js", RequestType::Script, false, None));
        assert!(view.renderer_mut().take().is_empty());
        assert!(view.rows().is_empty());
    }

    #[test]
    fn test_new_row_respects_active_search() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.set_third_party_only(true);

        view.on_event_added(TabId(1), event("http://a.com/1p.js", RequestType::Script, false, None));
        view.on_event_added(TabId(1), event("http://cdn.net/3p.js", RequestType::Script, true, None));

        let visible: Vec<&str> = view.visible_rows().map(|r| r.event.request_url.as_str()).collect();
        assert_eq!(visible, vec!["http://cdn.net/3p.js"]);
    }

    #[test]
    fn test_criteria_change_refilters_rendered_rows() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_event_added(TabId(1), event("http://a.com/app.js", RequestType::Script, false, None));
        view.on_event_added(
            TabId(1),
            event("http://ads.net/b.png", RequestType::Image, true, Some(rule("||ads.net^", FilterId(2), false))),
        );
        view.on_event_added(
            TabId(1),
            event("http://cdn.net/f.swf", RequestType::ObjectSubrequest, true, Some(rule("@@||cdn.net^", FilterId(2), true))),
        );
        view.renderer_mut().take();

        view.set_blocked_only(true);
        assert_eq!(
            view.renderer_mut().take(),
            vec![Op::Visible(0, false), Op::Visible(2, false)]
        );

        view.set_blocked_only(false);
        view.set_types(RequestTypes::MEDIA);
        let visible: Vec<usize> = view
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.visible)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(visible, vec![2]);

        view.set_types(RequestTypes::empty());
        view.set_free_text("  ADS.NET ");
        assert_eq!(view.visible_rows().count(), 1);

        view.set_criteria(SearchCriteria::default());
        assert_eq!(view.visible_rows().count(), 3);
    }

    #[test]
    fn test_reset_clears_selected_rows() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_event_added(TabId(1), event("http://a.com/1.js", RequestType::Script, false, None));
        assert!(!view.is_empty());
        view.renderer_mut().take();

        view.on_tab_reset(TabId(1));
        assert!(view.rows().is_empty());
        assert!(view.is_empty());
        assert_eq!(view.renderer_mut().take(), vec![Op::Clear, Op::Empty(true)]);

        view.on_tab_reset(TabId(1));
        assert_eq!(view.renderer_mut().take(), vec![Op::Clear]);
        assert_eq!(view.store().get_events(TabId(1)).unwrap().len(), 0);
    }

    #[test]
    fn test_row_projection() {
        let mut view = controller();
        view.on_tab_added(tab(1, "one"));
        view.on_event_added(
            TabId(1),
            event("http://a.com/", RequestType::Subdocument, false, Some(rule("@@||a.com^$document", FilterId::WHITE_LIST, true))),
        );
        view.on_event_added(
            TabId(1),
            event("http://ads.net/x.js", RequestType::Script, true, Some(rule("||ads.net^", FilterId(2), false))),
        );
        view.on_event_added(TabId(1), event("http://a.com/s.css", RequestType::Stylesheet, false, None));

        let rows = view.rows();
        assert_eq!(rows[0].status, RowStatus::Allowed);
        assert_eq!(rows[0].rule_label, "In whitelist");
        assert_eq!(rows[0].type_label, "HTML");
        assert_eq!(rows[1].status, RowStatus::Blocked);
        assert_eq!(rows[1].rule_label, "||ads.net^");
        assert_eq!(rows[2].status, RowStatus::Neutral);
        assert_eq!(rows[2].rule_label, "");
        assert_eq!(rows[2].type_label, "CSS");
    }

    #[test]
    fn test_synchronize_selects_requested_tab() {
        let mut view = controller();
        let snapshot = |id: i32, urls: &[&str]| TabSnapshot {
            info: tab(id, "t"),
            filtering_events: urls
                .iter()
                .map(|u| event(u, RequestType::Image, false, None))
                .collect(),
        };
        let mut hidden = snapshot(7, &["http://x.com/a.png"]);
        hidden.info.is_http = false;

        view.synchronize(
            vec![snapshot(1, &["http://a.com/1.png"]), snapshot(2, &["http://b.com/1.png", "http://b.com/2.png"]), hidden],
            Some(TabId(2)),
        );
        assert_eq!(view.selected_tab(), Some(TabId(2)));
        assert_eq!(view.rows().len(), 2);
        assert!(!view.store().contains(TabId(7)));

        let mut other = controller();
        other.synchronize(vec![snapshot(1, &[]), snapshot(2, &[])], Some(TabId(42)));
        assert_eq!(other.selected_tab(), Some(TabId(1)));
        assert!(other.is_empty());
    }

    #[test]
    fn test_request_target() {
        let mut view = controller();
        assert!(view.request_target(0).is_none());

        view.on_tab_added(tab(1, "one"));
        view.on_event_added(TabId(1), event("http://a.com/1.js", RequestType::Script, false, None));
        let (frame, event) = view.request_target(0).unwrap();
        assert_eq!(frame.tab_id, TabId(1));
        assert_eq!(event.request_url, "http://a.com/1.js");
        assert!(view.request_target(1).is_none());
    }

    #[test]
    fn test_closed_view_ignores_notifications() {
        let mut view = controller();
        view.close();
        view.handle(&LogEvent::TabAdded { tab: tab(1, "one") });
        assert!(view.store().is_empty());
        assert!(view.is_closed());
    }
}
