//! Replay a recorded filtering log through the log page controllers.
//!
//! Input is one JSON notification per line, as emitted by the engine:
//!
//! ```text
//! {"type":"tab_added","tab":{"tabId":1,"title":"News","isHttp":true}}
//! {"type":"event_added","tab":{"tabId":1,"isHttp":true},"event":{"requestUrl":"https://ads.example.net/a.js","requestType":"SCRIPT"}}
//! ```

use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use clap::Args;
use log::{debug, info};

use fl_core::notifier::{EventNotifier, LogEvent};
use fl_core::search::SearchCriteria;
use fl_core::types::{FilterId, RequestTypes, TabId, TabInfo};
use fl_rules::UrlRuleSyntax;
use fl_view::{
    InstallRoute, Labels, LogPage, LogSource, RequestAction, RequestWizard, RuleInstaller, TabSnapshot,
};

use crate::render::TextRenderer;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines notification file
    #[arg(short, long)]
    pub input: String,

    /// JSON array of tabs open before the first notification
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Tab to show (defaults to the first tab)
    #[arg(long)]
    pub tab: Option<i32>,

    /// Only requests whose URL contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Comma-separated request types (e.g. "script,image")
    #[arg(long)]
    pub types: Option<String>,

    /// Only third-party requests
    #[arg(long)]
    pub third_party: bool,

    /// Only blocked requests
    #[arg(long)]
    pub blocked: bool,

    /// JSON object mapping filter ids to names
    #[arg(long)]
    pub filters: Option<String>,

    /// JSON file with display labels
    #[arg(long)]
    pub labels: Option<String>,

    /// Open the request wizard for this row
    #[arg(long)]
    pub inspect: Option<usize>,

    /// Candidate pattern to use when the wizard drafts a rule
    #[arg(long, default_value_t = 0)]
    pub pattern: usize,
}

/// Engine stand-in serving the recorded snapshot.
struct ReplaySource {
    tabs: Vec<TabSnapshot>,
}

impl LogSource for ReplaySource {
    fn open_tabs(&self) -> Vec<TabSnapshot> {
        self.tabs.clone()
    }

    fn reload_tab(&self, tab_id: TabId) {
        info!("reload requested for tab {tab_id}");
    }

    fn clear_events(&self, tab_id: TabId) {
        info!("clear requested for tab {tab_id}");
    }
}

/// Prints rule changes instead of installing them.
struct PrintInstaller;

impl RuleInstaller for PrintInstaller {
    fn add_rule(&self, route: InstallRoute, rule_text: &str) {
        println!("Add rule ({}): {rule_text}", route_name(route));
    }

    fn remove_rule(&self, route: InstallRoute, rule_text: &str) {
        println!("Remove rule ({}): {rule_text}", route_name(route));
    }

    fn unwhitelist_frame(&self, frame: &TabInfo) {
        println!("Remove whitelist entry for tab {} ({})", frame.tab_id, frame.title);
    }
}

fn route_name(route: InstallRoute) -> &'static str {
    match route {
        InstallRoute::UserFilter => "user filter",
        InstallRoute::Application => "desktop application",
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in '{}': {}", path, e))
}

pub fn parse_events(content: &str) -> Result<Vec<LogEvent>, String> {
    let mut events = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: LogEvent =
            serde_json::from_str(line).map_err(|e| format!("Line {}: {}", index + 1, e))?;
        events.push(event);
    }
    Ok(events)
}

pub fn build_criteria(args: &ReplayArgs) -> Result<SearchCriteria, String> {
    let mut criteria = SearchCriteria::new();
    if let Some(text) = &args.search {
        criteria.set_free_text(text);
    }
    if let Some(types) = &args.types {
        criteria.types = RequestTypes::parse_list(types).map_err(|e| e.to_string())?;
    }
    criteria.third_party_only = args.third_party;
    criteria.blocked_only = args.blocked;
    Ok(criteria)
}

pub fn cmd_replay(args: &ReplayArgs) -> Result<(), String> {
    let content =
        fs::read_to_string(&args.input).map_err(|e| format!("Failed to read '{}': {}", args.input, e))?;
    let events = parse_events(&content)?;

    let tabs: Vec<TabSnapshot> = match &args.snapshot {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let filters: HashMap<FilterId, String> = match &args.filters {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };
    let labels: Labels = match &args.labels {
        Some(path) => read_json(path)?,
        None => Labels::default(),
    };
    let criteria = build_criteria(args)?;
    let initial_tab = args.tab.map(TabId);

    let notifier = EventNotifier::new();
    let source = Rc::new(ReplaySource { tabs });
    let mut page = LogPage::open(
        Rc::new(notifier.clone()),
        source,
        TextRenderer::default(),
        labels.clone(),
        initial_tab,
    );

    let mut delivered = 0usize;
    for event in &events {
        delivered += notifier.notify(event);
    }
    debug!("delivered {delivered} of {} notifications", events.len());

    {
        let mut controller = page.controller_mut();
        if initial_tab.is_some() && controller.selected_tab() != initial_tab {
            controller.select_tab(initial_tab);
        }
        controller.set_criteria(criteria);
        controller.renderer().print();
    }

    if let Some(row) = args.inspect {
        let target = page.controller().request_target(row);
        let (frame, event) = target.ok_or_else(|| format!("No row {} in the selected tab", row))?;
        inspect(frame, event, filters, labels, args.pattern)?;
    }

    page.close();
    Ok(())
}

fn inspect(
    frame: TabInfo,
    event: fl_core::types::FilteringEvent,
    filters: HashMap<FilterId, String>,
    labels: Labels,
    pattern: usize,
) -> Result<(), String> {
    let mut wizard = RequestWizard::new(
        Rc::new(PrintInstaller),
        Rc::new(UrlRuleSyntax),
        Rc::new(filters),
        labels,
    );

    let info = wizard
        .show_request_info(Some(frame), event)
        .ok_or_else(|| "Request info unavailable".to_string())?;

    println!();
    println!("Request: {}", info.event.request_url);
    println!("  Type:    {}", info.type_label);
    println!("  Frame:   {}", info.event.frame_domain);
    if let Some(rule) = &info.rule_text {
        println!("  Rule:    {rule}");
    }
    if let Some(name) = &info.filter_name {
        println!("  Filter:  {name}");
    }
    let Some(action) = info.action else {
        println!("  No action available");
        return Ok(());
    };
    println!("  Action:  {action:?}");

    wizard.perform(action).map_err(|e| e.to_string())?;
    if !matches!(action, RequestAction::Block | RequestAction::Unblock) {
        return Ok(());
    }

    wizard.select_pattern(pattern).map_err(|e| e.to_string())?;
    if let Some(draft) = wizard.draft() {
        println!();
        println!("Candidate patterns:");
        for (index, candidate) in draft.patterns().iter().enumerate() {
            let marker = if index == draft.selected() { "*" } else { " " };
            println!("  {marker} {index}: {candidate}");
        }
    }
    wizard.create_rule().map_err(|e| e.to_string())?;
    Ok(())
}
