//! Network rule grammar
//!
//! Rules built by the wizard follow
//! `[@@][||]<pattern>[$option(,option)*]`. This module names the grammar
//! tokens and validates rule text before it is handed to the filtering
//! engine; it does not match rules against requests.

use log::debug;

use fl_core::types::RequestTypes;

// =============================================================================
// Grammar Tokens
// =============================================================================

/// Exception rule marker.
pub const MASK_WHITE_LIST: &str = "@@";
/// Hostname anchor.
pub const MASK_START_URL: &str = "||";
/// Any sequence of characters.
pub const MASK_ANY_SYMBOL: &str = "*";
/// Separator character (end of host, `/`, `?`, end of URL, ...).
pub const MASK_SEPARATOR: &str = "^";
/// Start of the option list.
pub const OPTIONS_DELIMITER: &str = "$";

pub const DOMAIN_OPTION: &str = "domain";
pub const MATCH_CASE_OPTION: &str = "match-case";
pub const THIRD_PARTY_OPTION: &str = "third-party";

/// Kind of rule the wizard creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Blocks the request (`||`)
    Block,
    /// Lets the request through (`@@||`)
    Exception,
}

impl RuleKind {
    /// Text prepended to every candidate pattern. Both kinds anchor the
    /// pattern to the request host.
    pub fn pattern_prefix(self) -> &'static str {
        match self {
            Self::Block => MASK_START_URL,
            Self::Exception => "@@||",
        }
    }
}

// =============================================================================
// Parsed Rule
// =============================================================================

/// Error type for rule validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSyntaxError {
    #[error("Rule text is empty")]
    Empty,
    #[error("Comment lines are not rules")]
    Comment,
    #[error("Cosmetic rules are not supported")]
    Cosmetic,
    #[error("Rule has no URL pattern")]
    EmptyPattern,
    #[error("Invalid hostname anchor: {0}")]
    InvalidHostAnchor(String),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Option requires a value: {0}")]
    EmptyOptionValue(String),
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    #[error("Options exclude every request: {0}")]
    ContradictoryOptions(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorType {
    #[default]
    None,
    Left,
    Hostname,
}

/// Options of a network rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleOptions {
    /// Sites the rule applies on
    pub permitted_domains: Vec<String>,
    /// Sites the rule is disabled on (`~domain`)
    pub restricted_domains: Vec<String>,
    pub match_case: bool,
    /// `Some(true)` third-party only, `Some(false)` first-party only
    pub third_party: Option<bool>,
    /// Request types the rule applies to; empty means all
    pub types: RequestTypes,
    pub important: bool,
}

/// Network rule that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    /// Trimmed rule text, as it should be installed
    pub text: String,
    pub whitelist: bool,
    pub anchor_type: AnchorType,
    /// Pattern without markers and options
    pub pattern: String,
    pub options: RuleOptions,
}

/// Parse and validate a network rule.
pub fn parse_rule(text: &str) -> Result<ParsedRule, RuleSyntaxError> {
    let line = text.trim();
    if line.is_empty() {
        return Err(RuleSyntaxError::Empty);
    }
    if is_comment_line(line) {
        return Err(RuleSyntaxError::Comment);
    }
    if is_cosmetic_line(line) {
        return Err(RuleSyntaxError::Cosmetic);
    }

    let (whitelist, body) = match line.strip_prefix(MASK_WHITE_LIST) {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let (pattern_part, options_text) = split_rule_options(body);
    let options = match options_text {
        Some(options_text) => parse_options(options_text)?,
        None => RuleOptions::default(),
    };

    let (anchor_type, pattern) = parse_pattern(pattern_part)?;

    Ok(ParsedRule {
        text: line.to_string(),
        whitelist,
        anchor_type,
        pattern: pattern.to_string(),
        options,
    })
}

/// Validates rule text on behalf of the filtering engine.
pub trait RuleValidator {
    /// Check rule text; on success return the text to install.
    fn validate(&self, rule_text: &str) -> Result<String, RuleSyntaxError>;
}

/// Validator backed by [`parse_rule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlRuleSyntax;

impl RuleValidator for UrlRuleSyntax {
    fn validate(&self, rule_text: &str) -> Result<String, RuleSyntaxError> {
        match parse_rule(rule_text) {
            Ok(rule) => Ok(rule.text),
            Err(e) => {
                debug!("rejected rule {:?}: {}", rule_text, e);
                Err(e)
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[')
}

fn is_cosmetic_line(line: &str) -> bool {
    line.contains("##") || line.contains("#@#") || line.contains("#?#") || line.contains("#$#")
}

/// Options start at the last `$`; request URLs may contain `$` themselves.
fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.rfind(OPTIONS_DELIMITER) {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

fn parse_pattern(pattern: &str) -> Result<(AnchorType, &str), RuleSyntaxError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(RuleSyntaxError::EmptyPattern);
    }

    if let Some(rest) = pattern.strip_prefix(MASK_START_URL) {
        let host_end = rest
            .find(|c: char| matches!(c, '/' | '^' | '*' | '?' | '#' | ':' | '|'))
            .unwrap_or(rest.len());
        let host = &rest[..host_end];
        if rest.is_empty() || (host.is_empty() && !rest.starts_with('*')) {
            return Err(RuleSyntaxError::InvalidHostAnchor(pattern.to_string()));
        }
        if !host.is_empty() && normalize_domain(host).is_none() {
            return Err(RuleSyntaxError::InvalidHostAnchor(pattern.to_string()));
        }
        return Ok((AnchorType::Hostname, rest));
    }

    if let Some(rest) = pattern.strip_prefix('|') {
        if rest.is_empty() {
            return Err(RuleSyntaxError::EmptyPattern);
        }
        return Ok((AnchorType::Left, rest));
    }

    Ok((AnchorType::None, pattern))
}

fn parse_options(text: &str) -> Result<RuleOptions, RuleSyntaxError> {
    let mut options = RuleOptions::default();
    let mut type_include = RequestTypes::empty();
    let mut type_exclude = RequestTypes::empty();
    let mut third_party: Option<bool> = None;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(options);
    }

    for raw in trimmed.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_lowercase();
        let raw_lower = raw_lower.as_str();

        if raw_lower == "important" {
            options.important = true;
            continue;
        }

        if raw_lower == MATCH_CASE_OPTION {
            options.match_case = true;
            continue;
        }

        if let Some(value) = raw_lower.strip_prefix(DOMAIN_OPTION) {
            if let Some(value) = value.strip_prefix('=') {
                parse_domain_option(value, &mut options)?;
                continue;
            }
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };

        if let Some(party) = party_option(name) {
            let wants_third_party = party != negated;
            if third_party.is_some_and(|current| current != wants_third_party) {
                return Err(RuleSyntaxError::ContradictoryOptions(trimmed.to_string()));
            }
            third_party = Some(wants_third_party);
            continue;
        }

        if let Some(mask) = request_type_mask(name) {
            if negated {
                type_exclude |= mask;
            } else {
                type_include |= mask;
            }
            continue;
        }

        return Err(RuleSyntaxError::UnknownOption(raw.to_string()));
    }

    options.third_party = third_party;
    options.types = finalize_type_mask(type_include, type_exclude)
        .ok_or_else(|| RuleSyntaxError::ContradictoryOptions(trimmed.to_string()))?;
    Ok(options)
}

fn parse_domain_option(value: &str, options: &mut RuleOptions) -> Result<(), RuleSyntaxError> {
    let mut any = false;
    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let domain = normalize_domain(domain_raw)
            .ok_or_else(|| RuleSyntaxError::InvalidDomain(domain_raw.to_string()))?;
        if is_exclude {
            options.restricted_domains.push(domain);
        } else {
            options.permitted_domains.push(domain);
        }
        any = true;
    }

    if !any {
        return Err(RuleSyntaxError::EmptyOptionValue(DOMAIN_OPTION.to_string()));
    }
    Ok(())
}

/// Returns the included set, or `None` if the options exclude every type.
/// An unrestricted rule yields the empty set.
fn finalize_type_mask(include: RequestTypes, exclude: RequestTypes) -> Option<RequestTypes> {
    let mut mask = if include.is_empty() {
        RequestTypes::ALL - exclude
    } else {
        include - exclude
    };
    if mask.is_empty() {
        return None;
    }
    if mask == RequestTypes::ALL {
        mask = RequestTypes::empty();
    }
    Some(mask)
}

fn request_type_mask(name: &str) -> Option<RequestTypes> {
    match name {
        "document" => Some(RequestTypes::DOCUMENT),
        "subdocument" => Some(RequestTypes::SUBDOCUMENT),
        "stylesheet" => Some(RequestTypes::STYLESHEET),
        "script" => Some(RequestTypes::SCRIPT),
        "xmlhttprequest" => Some(RequestTypes::XMLHTTPREQUEST),
        "image" => Some(RequestTypes::IMAGE),
        "object" => Some(RequestTypes::OBJECT),
        "object-subrequest" => Some(RequestTypes::OBJECT_SUBREQUEST),
        "media" => Some(RequestTypes::MEDIA),
        "other" => Some(RequestTypes::OTHER),
        _ => None,
    }
}

/// `Some(true)` for third-party names, `Some(false)` for first-party names.
fn party_option(name: &str) -> Option<bool> {
    match name {
        THIRD_PARTY_OPTION | "3p" => Some(true),
        "first-party" | "1p" => Some(false),
        _ => None,
    }
}

fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == '*')
    {
        return None;
    }

    Some(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wizard_output_is_valid() {
        let rule = parse_rule("||example.com^$domain=example.com,match-case,third-party").unwrap();
        assert!(!rule.whitelist);
        assert_eq!(rule.anchor_type, AnchorType::Hostname);
        assert_eq!(rule.pattern, "example.com^");
        assert_eq!(rule.options.permitted_domains, vec!["example.com"]);
        assert!(rule.options.match_case);
        assert_eq!(rule.options.third_party, Some(true));
        assert!(rule.options.types.is_empty());
    }

    #[test]
    fn test_exception_rule() {
        let rule = parse_rule("  @@||cdn.example.net/lib/*  ").unwrap();
        assert!(rule.whitelist);
        assert_eq!(rule.text, "@@||cdn.example.net/lib/*");
        assert_eq!(rule.pattern, "cdn.example.net/lib/*");
    }

    #[test]
    fn test_plain_pattern_without_options() {
        let rule = parse_rule("example.com/ads/banner.js").unwrap();
        assert_eq!(rule.anchor_type, AnchorType::None);
        assert_eq!(rule.options, RuleOptions::default());
    }

    #[test]
    fn test_dollar_inside_url_pattern() {
        let rule = parse_rule("example.com/buy?price=$5$domain=shop.org").unwrap();
        assert_eq!(rule.pattern, "example.com/buy?price=$5");
        assert_eq!(rule.options.permitted_domains, vec!["shop.org"]);
    }

    #[test]
    fn test_dollar_in_query_needs_an_option() {
        use crate::compose::{compose_rule, RuleModifiers};
        use crate::patterns::generate_patterns;

        let patterns = generate_patterns("http://shop.example.com/buy?price=$5", RuleKind::Block.pattern_prefix());
        let full = patterns.last().unwrap();
        assert_eq!(full, "||shop.example.com/buy?price=$5");

        // Without options the text after the last `$` is read as an option list
        let bare = compose_rule(full, "", RuleModifiers::empty());
        assert_eq!(parse_rule(&bare), Err(RuleSyntaxError::UnknownOption("5".to_string())));

        let scoped = compose_rule(full, "", RuleModifiers::THIRD_PARTY);
        let rule = parse_rule(&scoped).unwrap();
        assert_eq!(rule.pattern, "shop.example.com/buy?price=$5");
        assert_eq!(rule.options.third_party, Some(true));
    }

    #[test]
    fn test_rejects_non_network_lines() {
        assert_eq!(parse_rule("   "), Err(RuleSyntaxError::Empty));
        assert_eq!(parse_rule("! comment"), Err(RuleSyntaxError::Comment));
        assert_eq!(parse_rule("[Adblock Plus 2.0]"), Err(RuleSyntaxError::Comment));
        assert_eq!(parse_rule("example.com##.banner"), Err(RuleSyntaxError::Cosmetic));
        assert_eq!(parse_rule("@@$third-party"), Err(RuleSyntaxError::EmptyPattern));
    }

    #[test]
    fn test_rejects_bad_options() {
        assert_eq!(
            parse_rule("||a.com^$bogus"),
            Err(RuleSyntaxError::UnknownOption("bogus".to_string()))
        );
        assert_eq!(
            parse_rule("||a.com^$domain="),
            Err(RuleSyntaxError::EmptyOptionValue("domain".to_string()))
        );
        assert_eq!(
            parse_rule("||a.com^$domain=bad domain"),
            Err(RuleSyntaxError::InvalidDomain("bad domain".to_string()))
        );
        assert!(matches!(
            parse_rule("||a.com^$third-party,~third-party"),
            Err(RuleSyntaxError::ContradictoryOptions(_))
        ));
        assert!(matches!(
            parse_rule("||a.com^$image,~image"),
            Err(RuleSyntaxError::ContradictoryOptions(_))
        ));
    }

    #[test]
    fn test_type_and_domain_options() {
        let rule = parse_rule("||a.com^$script,~third-party,domain=Site.org|~sub.site.org").unwrap();
        assert_eq!(rule.options.types, RequestTypes::SCRIPT);
        assert_eq!(rule.options.third_party, Some(false));
        assert_eq!(rule.options.permitted_domains, vec!["site.org"]);
        assert_eq!(rule.options.restricted_domains, vec!["sub.site.org"]);
    }

    #[test]
    fn test_invalid_host_anchor() {
        assert!(matches!(parse_rule("||^"), Err(RuleSyntaxError::InvalidHostAnchor(_))));
        assert!(matches!(parse_rule("||"), Err(RuleSyntaxError::InvalidHostAnchor(_))));
        assert!(parse_rule("||*.example.com^").is_ok());
    }

    #[test]
    fn test_validator_returns_trimmed_text() {
        let validator = UrlRuleSyntax;
        assert_eq!(validator.validate(" ||a.com^ ").unwrap(), "||a.com^");
        assert!(validator.validate("##.ad").is_err());
    }

    #[test]
    fn test_rule_kind_prefix() {
        assert_eq!(RuleKind::Block.pattern_prefix(), MASK_START_URL);
        assert_eq!(
            RuleKind::Exception.pattern_prefix(),
            format!("{MASK_WHITE_LIST}{MASK_START_URL}")
        );
    }
}
