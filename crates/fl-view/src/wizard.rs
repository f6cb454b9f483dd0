//! Request info and rule creation dialogs
//!
//! The wizard has at most one dialog open. Clicking a log row opens the
//! request-info dialog, which offers at most one action for the request.
//! Blocking or unblocking continues in the create-rule dialog, where the
//! operator picks a candidate pattern and modifiers and confirms the
//! composed rule text.

use std::rc::Rc;

use log::{debug, warn};
use thiserror::Error;

use fl_core::types::{FilterId, FilteringEvent, TabInfo};
use fl_rules::{compose_rule, generate_patterns, RuleKind, RuleModifiers, RuleSyntaxError, RuleValidator};

use crate::collab::{FilterMetadata, InstallRoute, RuleInstaller};
use crate::labels::Labels;

/// Error type for wizard operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("No request info dialog is open")]
    NoRequestInfo,
    #[error("No rule is being created")]
    NoRuleDraft,
    #[error("Pattern index {index} out of range ({len} candidates)")]
    PatternOutOfRange { index: usize, len: usize },
    #[error("Action is not available for this request")]
    ActionUnavailable,
    #[error("Malformed rule: {0}")]
    MalformedRule(#[from] RuleSyntaxError),
}

// =============================================================================
// Request Info
// =============================================================================

/// What the operator can do about a logged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    /// Create a blocking rule
    Block,
    /// Create an exception rule
    Unblock,
    /// Drop the whitelist entry that let the request through
    RemoveWhitelistDomain,
    /// Delete the user rule that matched
    RemoveUserRule,
}

impl RequestAction {
    /// The single action offered for an event, if any.
    pub fn available_for(event: &FilteringEvent) -> Option<Self> {
        let rule = match &event.request_rule {
            None => return Some(Self::Block),
            Some(rule) => rule,
        };

        if rule.filter_id.is_user_filter() {
            Some(Self::RemoveUserRule)
        } else if rule.filter_id.is_white_list() {
            Some(Self::RemoveWhitelistDomain)
        } else if !rule.white_list_rule {
            Some(Self::Unblock)
        } else {
            None
        }
    }
}

/// Contents of the request-info dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub frame: TabInfo,
    pub event: FilteringEvent,
    pub type_label: &'static str,
    /// Matched rule text; hidden for whitelist entries
    pub rule_text: Option<String>,
    pub filter_name: Option<String>,
    pub action: Option<RequestAction>,
}

// =============================================================================
// Rule Draft
// =============================================================================

/// State of the create-rule dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDraft {
    frame: TabInfo,
    kind: RuleKind,
    /// Value of the `domain=` option
    domain: String,
    patterns: Vec<String>,
    selected: usize,
    modifiers: RuleModifiers,
    rule_text: String,
}

impl RuleDraft {
    /// Start a draft for an event. The broadest pattern is selected and the
    /// rule is scoped to the frame's domain when it has one.
    pub fn new(frame: TabInfo, event: &FilteringEvent, kind: RuleKind) -> Self {
        let patterns = generate_patterns(&event.request_url, kind.pattern_prefix());

        let mut modifiers = RuleModifiers::empty();
        modifiers.set(RuleModifiers::DOMAIN, !event.frame_domain.is_empty());
        modifiers.set(RuleModifiers::THIRD_PARTY, event.request_third_party);

        let mut draft = Self {
            frame,
            kind,
            domain: event.frame_domain.clone(),
            patterns,
            selected: 0,
            modifiers,
            rule_text: String::new(),
        };
        draft.recompose();
        draft
    }

    pub fn select_pattern(&mut self, index: usize) -> Result<(), WizardError> {
        if index >= self.patterns.len() {
            return Err(WizardError::PatternOutOfRange {
                index,
                len: self.patterns.len(),
            });
        }
        self.selected = index;
        self.recompose();
        Ok(())
    }

    pub fn set_modifier(&mut self, modifier: RuleModifiers, enabled: bool) {
        self.modifiers.set(modifier, enabled);
        self.recompose();
    }

    /// Replace the rule text by hand. The next pattern or modifier change
    /// overwrites it.
    pub fn edit_rule_text(&mut self, text: impl Into<String>) {
        self.rule_text = text.into();
    }

    fn recompose(&mut self) {
        let pattern = self.selected_pattern().unwrap_or_default();
        self.rule_text = compose_rule(pattern, &self.domain, self.modifiers);
    }

    pub fn frame(&self) -> &TabInfo {
        &self.frame
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_pattern(&self) -> Option<&str> {
        self.patterns.get(self.selected).map(String::as_str)
    }

    pub fn modifiers(&self) -> RuleModifiers {
        self.modifiers
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }
}

// =============================================================================
// Wizard
// =============================================================================

/// Open dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    RequestInfo(RequestInfo),
    CreateRule(RuleDraft),
}

pub struct RequestWizard {
    installer: Rc<dyn RuleInstaller>,
    validator: Rc<dyn RuleValidator>,
    metadata: Rc<dyn FilterMetadata>,
    labels: Labels,
    dialog: Option<Dialog>,
}

impl RequestWizard {
    pub fn new(
        installer: Rc<dyn RuleInstaller>,
        validator: Rc<dyn RuleValidator>,
        metadata: Rc<dyn FilterMetadata>,
        labels: Labels,
    ) -> Self {
        Self {
            installer,
            validator,
            metadata,
            labels,
            dialog: None,
        }
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn request_info(&self) -> Option<&RequestInfo> {
        match &self.dialog {
            Some(Dialog::RequestInfo(info)) => Some(info),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&RuleDraft> {
        match &self.dialog {
            Some(Dialog::CreateRule(draft)) => Some(draft),
            _ => None,
        }
    }

    /// Display name of a filter.
    pub fn filter_name(&self, filter_id: FilterId) -> String {
        if filter_id.is_user_filter() {
            return self.labels.user_filter.clone();
        }
        if filter_id.is_white_list() {
            return self.labels.whitelist.clone();
        }
        self.metadata.filter_name(filter_id).unwrap_or_default()
    }

    /// Open the request-info dialog for a row.
    ///
    /// Without frame info (the tab went away) nothing opens.
    pub fn show_request_info(&mut self, frame: Option<TabInfo>, event: FilteringEvent) -> Option<&RequestInfo> {
        let Some(frame) = frame else {
            debug!("no frame info for {}, request info not shown", event.request_url);
            return None;
        };

        let (rule_text, filter_name) = match &event.request_rule {
            Some(rule) => {
                let text = (!rule.filter_id.is_white_list()).then(|| rule.rule_text.clone());
                (text, Some(self.filter_name(rule.filter_id)))
            }
            None => (None, None),
        };

        let info = RequestInfo {
            type_label: event.request_type.label(),
            action: RequestAction::available_for(&event),
            frame,
            event,
            rule_text,
            filter_name,
        };
        self.dialog = Some(Dialog::RequestInfo(info));
        self.request_info()
    }

    /// Run the action offered by the open request-info dialog.
    pub fn perform(&mut self, action: RequestAction) -> Result<(), WizardError> {
        let info = self.request_info().ok_or(WizardError::NoRequestInfo)?;
        if info.action != Some(action) {
            return Err(WizardError::ActionUnavailable);
        }
        let frame = info.frame.clone();
        let event = info.event.clone();

        match action {
            RequestAction::Block => self.show_create_rule(frame, &event, RuleKind::Block),
            RequestAction::Unblock => self.show_create_rule(frame, &event, RuleKind::Exception),
            RequestAction::RemoveWhitelistDomain => {
                self.installer.unwhitelist_frame(&frame);
                self.close();
            }
            RequestAction::RemoveUserRule => {
                if let Some(rule) = &event.request_rule {
                    self.installer
                        .remove_rule(InstallRoute::for_frame(&frame), &rule.rule_text);
                }
                self.close();
            }
        }
        Ok(())
    }

    /// Open the create-rule dialog directly.
    pub fn show_create_rule(&mut self, frame: TabInfo, event: &FilteringEvent, kind: RuleKind) {
        self.dialog = Some(Dialog::CreateRule(RuleDraft::new(frame, event, kind)));
    }

    pub fn select_pattern(&mut self, index: usize) -> Result<(), WizardError> {
        self.draft_mut()?.select_pattern(index)
    }

    pub fn set_modifier(&mut self, modifier: RuleModifiers, enabled: bool) -> Result<(), WizardError> {
        self.draft_mut()?.set_modifier(modifier, enabled);
        Ok(())
    }

    pub fn edit_rule_text(&mut self, text: impl Into<String>) -> Result<(), WizardError> {
        self.draft_mut()?.edit_rule_text(text);
        Ok(())
    }

    /// Validate and install the drafted rule.
    ///
    /// A malformed rule leaves the dialog open and installs nothing.
    pub fn create_rule(&mut self) -> Result<String, WizardError> {
        let draft = self.draft().ok_or(WizardError::NoRuleDraft)?;
        let route = InstallRoute::for_frame(draft.frame());

        let rule_text = match self.validator.validate(draft.rule_text()) {
            Ok(text) => text,
            Err(e) => {
                warn!("not installing {:?}: {}", draft.rule_text(), e);
                return Err(e.into());
            }
        };

        self.installer.add_rule(route, &rule_text);
        self.close();
        Ok(rule_text)
    }

    pub fn close(&mut self) {
        self.dialog = None;
    }

    fn draft_mut(&mut self) -> Result<&mut RuleDraft, WizardError> {
        match &mut self.dialog {
            Some(Dialog::CreateRule(draft)) => Ok(draft),
            _ => Err(WizardError::NoRuleDraft),
        }
    }
}
