//! Plain-text log table.

use log::debug;

use fl_core::types::TabInfo;
use fl_view::{LogRenderer, LogRow, RowStatus, TabHeader};

/// Mirrors what the log page would show and prints it on demand.
#[derive(Debug, Default)]
pub struct TextRenderer {
    tabs: Vec<TabInfo>,
    header: TabHeader,
    rows: Vec<LogRow>,
    empty: bool,
}

impl LogRenderer for TextRenderer {
    fn render_tabs(&mut self, tabs: &[TabInfo]) {
        self.tabs = tabs.to_vec();
    }

    fn render_header(&mut self, header: &TabHeader) {
        debug!("header -> {:?}", header.tab_id);
        self.header = header.clone();
    }

    fn clear_rows(&mut self) {
        self.rows.clear();
    }

    fn append_rows(&mut self, rows: &[LogRow]) {
        self.rows.extend_from_slice(rows);
    }

    fn set_row_visible(&mut self, index: usize, visible: bool) {
        if let Some(row) = self.rows.get_mut(index) {
            row.visible = visible;
        }
    }

    fn set_empty(&mut self, empty: bool) {
        self.empty = empty;
    }
}

impl TextRenderer {
    pub fn print(&self) {
        println!("Tabs:");
        for tab in &self.tabs {
            let marker = if Some(tab.tab_id) == self.header.tab_id { "*" } else { " " };
            println!("  {marker} [{}] {}", tab.tab_id, tab.title);
        }
        println!();

        let Some(tab_id) = self.header.tab_id else {
            println!("No tab selected");
            return;
        };
        let intercepted = if self.header.adguard_detected {
            " (filtered by the desktop application)"
        } else {
            ""
        };
        println!("Tab {tab_id}: {}{intercepted}", self.header.title);

        if self.empty || self.rows.is_empty() {
            println!("  No events");
            return;
        }

        let mut hidden = 0usize;
        for (index, row) in self.rows.iter().enumerate() {
            if !row.visible {
                hidden += 1;
                continue;
            }
            let status = match row.status {
                RowStatus::Neutral => " ",
                RowStatus::Blocked => "B",
                RowStatus::Allowed => "A",
            };
            let party = if row.event.request_third_party { "3p" } else { "  " };
            println!(
                "  {index:>4} {status} {party} {:<10} {} {}",
                row.type_label, row.event.request_url, row.rule_label
            );
        }
        if hidden > 0 {
            println!("  ({hidden} rows hidden by search)");
        }
    }
}
